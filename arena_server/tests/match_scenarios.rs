//! Integration tests for a few of the worked scenarios in spec.md §8
//! (S1-S4), driven end-to-end through `match_engine::spawn` against the
//! in-memory `FakeOutboundChannel`, the same way `match_engine`'s and
//! `session`'s own unit tests do. Coordinates follow this crate's own
//! `Direction` convention rather than the scenario's literal axis labeling
//! (see DESIGN.md, "Axis convention for worked scenarios").

use arena_protocol::ids::{Direction, MatchId, UserId};
use arena_protocol::messages::{CharacterState, OutboundMessage};
use arena_server::board::level::LEVEL_1;
use arena_server::collaborators::{FakeOutboundChannel, FakeUserStore};
use arena_server::match_engine::{empty_channel_slot, spawn, ChannelSlot, PlayerMessage, PlayerOp};
use arena_server::Config;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

async fn wire(slot: &ChannelSlot) -> Arc<FakeOutboundChannel> {
    let fake = Arc::new(FakeOutboundChannel::default());
    *slot.write().await = Some(fake.clone());
    fake
}

fn fast_config() -> Config {
    Config {
        match_time_seconds: 300,
        timer_speed_ms: 60_000,
        enemies_speed_ms: 60_000,
        match_time_out_seconds: 60,
    }
}

fn user_store() -> Arc<FakeUserStore> {
    Arc::new(FakeUserStore::default())
}

/// S1: a basic move fans an `update-move` out to both sockets.
#[tokio::test]
async fn s1_basic_move_fans_out_to_both_players() {
    let host = UserId(Uuid::new_v4());
    let guest = UserId(Uuid::new_v4());
    let host_slot = empty_channel_slot();
    let guest_slot = empty_channel_slot();
    let host_fake = wire(&host_slot).await;
    let guest_fake = wire(&guest_slot).await;

    let handle = spawn(MatchId(Uuid::new_v4()), &LEVEL_1, host, guest, host_slot, guest_slot, fast_config(), user_store());
    handle.dispatch(host, PlayerMessage::Op(PlayerOp::Move(Direction::Left))).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    for fake in [&host_fake, &guest_fake] {
        let sent = fake.sent.lock().unwrap();
        assert!(sent.iter().any(|m| matches!(m, OutboundMessage::UpdateMove(_))));
    }
}

/// S2: moving into Level 1's rock at (9,2) replies `blocked-cell` only to
/// the player who attempted it, and never reaches the other player.
#[tokio::test]
async fn s2_move_into_rock_is_blocked_cell_error_to_sender_only() {
    let host = UserId(Uuid::new_v4());
    let guest = UserId(Uuid::new_v4());
    let host_slot = empty_channel_slot();
    let guest_slot = empty_channel_slot();
    let host_fake = wire(&host_slot).await;
    let guest_fake = wire(&guest_slot).await;

    let handle = spawn(MatchId(Uuid::new_v4()), &LEVEL_1, host, guest, host_slot, guest_slot, fast_config(), user_store());
    // Host spawns at (9,1); the rock sits at (9,2), one step Down.
    handle.dispatch(host, PlayerMessage::Op(PlayerOp::Move(Direction::Down))).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let host_sent = host_fake.sent.lock().unwrap();
    let guest_sent = guest_fake.sent.lock().unwrap();
    assert!(host_sent.iter().any(|m| matches!(m, OutboundMessage::Error(_))));
    assert!(!host_sent.iter().any(|m| matches!(m, OutboundMessage::UpdateMove(_))));
    assert!(guest_sent.is_empty());
}

/// S3: `exec-power` fans out `update-frozen-cells` to both sockets.
#[tokio::test]
async fn s3_exec_power_fans_out_frozen_cells_to_both_players() {
    let host = UserId(Uuid::new_v4());
    let guest = UserId(Uuid::new_v4());
    let host_slot = empty_channel_slot();
    let guest_slot = empty_channel_slot();
    let host_fake = wire(&host_slot).await;
    let guest_fake = wire(&guest_slot).await;

    let handle = spawn(MatchId(Uuid::new_v4()), &LEVEL_1, host, guest, host_slot, guest_slot, fast_config(), user_store());
    handle.dispatch(host, PlayerMessage::Op(PlayerOp::ExecPower)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    for fake in [&host_fake, &guest_fake] {
        let sent = fake.sent.lock().unwrap();
        assert!(sent.iter().any(|m| matches!(m, OutboundMessage::UpdateFrozenCells(_))));
    }
}

/// S4: once the clock reaches zero, the match ends in a loss even though
/// neither player has died.
#[tokio::test]
async fn s4_clock_expiry_ends_match_in_loss() {
    let host = UserId(Uuid::new_v4());
    let guest = UserId(Uuid::new_v4());
    let host_slot = empty_channel_slot();
    let guest_slot = empty_channel_slot();
    let host_fake = wire(&host_slot).await;
    let guest_fake = wire(&guest_slot).await;

    let config = Config {
        match_time_seconds: 1,
        timer_speed_ms: 20,
        enemies_speed_ms: 60_000,
        match_time_out_seconds: 60,
    };
    let _handle = spawn(MatchId(Uuid::new_v4()), &LEVEL_1, host, guest, host_slot, guest_slot, config, user_store());
    tokio::time::sleep(Duration::from_millis(120)).await;

    for fake in [&host_fake, &guest_fake] {
        let sent = fake.sent.lock().unwrap();
        assert!(sent.iter().any(|m| matches!(
            m,
            OutboundMessage::End(arena_protocol::messages::EndPayload {
                result: arena_protocol::messages::MatchResult::Lose
            })
        )));
    }
}

async fn walk(handle: &arena_server::match_engine::MatchHandle, user: UserId, path: &[Direction]) {
    for &dir in path {
        handle.dispatch(user, PlayerMessage::Op(PlayerOp::Move(dir))).unwrap();
    }
}

/// S5: clearing every fruit in a round advances to the next one and fans
/// out `update-fruits` with the new round number and upcoming fruit type.
/// Level 1's round-1 fruit spots are (3,3), (3,4) and (12,12); the host
/// walks onto all three, routing around the guest's spawn cell at (6,1)
/// and Level 1's rock at (9,2).
#[tokio::test]
async fn s5_clearing_a_round_advances_fruits() {
    let host = UserId(Uuid::new_v4());
    let guest = UserId(Uuid::new_v4());
    let host_slot = empty_channel_slot();
    let guest_slot = empty_channel_slot();
    let host_fake = wire(&host_slot).await;
    let guest_fake = wire(&guest_slot).await;

    let handle = spawn(MatchId(Uuid::new_v4()), &LEVEL_1, host, guest, host_slot, guest_slot, fast_config(), user_store());

    use Direction::{Down, Left, Right, Up};
    // (9,1) -> (3,0) -> (3,3): first fruit.
    walk(&handle, host, &[Up]).await;
    walk(&handle, host, &[Left; 6]).await;
    walk(&handle, host, &[Down; 3]).await;
    // (3,3) -> (3,4): second fruit.
    walk(&handle, host, &[Down]).await;
    // (3,4) -> (3,12) -> (12,12): third fruit, clears round 1.
    walk(&handle, host, &[Down; 8]).await;
    walk(&handle, host, &[Right; 9]).await;

    tokio::time::sleep(Duration::from_millis(100)).await;

    for fake in [&host_fake, &guest_fake] {
        let sent = fake.sent.lock().unwrap();
        assert!(sent.iter().any(|m| matches!(
            m,
            OutboundMessage::UpdateFruits(arena_protocol::messages::UpdateFruitsPayload {
                current_round: 2,
                next_fruit_type: Some(next),
            }) if next == "banana"
        )));
    }
}

/// S6: an enemy's own tick killing a player fans out `update-enemy` for its
/// step and `update-state` marking the player dead, exercising
/// `handle_enemy_tick`'s kill path rather than a player-initiated move.
/// The host is walked to (2,13), one step above Level 1's Cow spawn at
/// (2,14), so the Cow's very first tick steps onto it.
#[tokio::test]
async fn s6_enemy_kill_fans_out_update_state_dead() {
    let host = UserId(Uuid::new_v4());
    let guest = UserId(Uuid::new_v4());
    let host_slot = empty_channel_slot();
    let guest_slot = empty_channel_slot();
    let host_fake = wire(&host_slot).await;
    let guest_fake = wire(&guest_slot).await;

    let handle = spawn(MatchId(Uuid::new_v4()), &LEVEL_1, host, guest, host_slot, guest_slot, fast_config(), user_store());

    use Direction::{Down, Left, Up};
    walk(&handle, host, &[Up]).await;
    walk(&handle, host, &[Left; 7]).await;
    walk(&handle, host, &[Down; 13]).await;

    // Level 1's Cow ticks every 800ms; give its first tick time to land.
    tokio::time::sleep(Duration::from_millis(950)).await;

    for fake in [&host_fake, &guest_fake] {
        let sent = fake.sent.lock().unwrap();
        assert!(sent.iter().any(|m| matches!(m, OutboundMessage::UpdateEnemy(_))));
        assert!(sent.iter().any(|m| matches!(
            m,
            OutboundMessage::UpdateState(arena_protocol::messages::UpdateStatePayload {
                state: CharacterState::Dead,
                ..
            })
        )));
    }
}
