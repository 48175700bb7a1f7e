//! Property-based checks for the board invariants (spec.md §8, items
//! 1, 2, 3, 6 and 8). Invariants 4, 5 and 7 already have direct unit-test
//! coverage next to the code they describe (`grid::tests`, `graph::tests`,
//! `board::tests::capture_restore_round_trips`).

use arena_protocol::ids::Direction;
use arena_server::board::{Board, Level, HOST};
use arena_server::character::Character;
use arena_protocol::CharacterId;
use proptest::prelude::*;

fn directions() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Up),
        Just(Direction::Down),
        Just(Direction::Left),
        Just(Direction::Right),
    ]
}

fn fresh_board() -> (Board, CharacterId, CharacterId) {
    let host_id = CharacterId::new();
    let guest_id = CharacterId::new();
    let board = Board::new(Level::by_number(1), host_id, guest_id);
    (board, host_id, guest_id)
}

/// Invariant 1: every alive character's own coordinate is the cell that
/// actually carries its id in the grid's back-reference.
fn assert_back_references_consistent(board: &Board) {
    for player in board.players() {
        if player.is_alive() {
            assert_eq!(
                board.grid().cell(player.coord()).character,
                Some(player.id()),
                "alive player's cell does not carry its own id"
            );
        }
    }
    for enemy in board.enemies().values() {
        if enemy.is_alive() {
            assert_eq!(
                board.grid().cell(enemy.coord()).character,
                Some(enemy.id()),
                "alive enemy's cell does not carry its own id"
            );
        }
    }
}

/// Invariant 2: `fruitsNumber` equals the number of fruit-bearing cells.
fn assert_fruit_count_consistent(board: &Board) {
    let fruit_cells = board
        .grid()
        .iter()
        .filter(|(_, cell)| matches!(cell.item, Some(arena_server::grid::Item::Fruit(_))))
        .count() as u32;
    assert_eq!(board.fruits_number(), fruit_cells);
}

/// Invariant 3: a frozen cell carries neither a character nor a blocking
/// item — freezing and occupying/blocking a cell are mutually exclusive.
fn assert_frozen_cells_clear(board: &Board) {
    for (coord, cell) in board.grid().iter() {
        if cell.frozen {
            assert!(cell.character.is_none(), "frozen cell {coord:?} has a character");
            assert!(!cell.blocked(), "frozen cell {coord:?} carries a blocking item");
        }
    }
}

/// Invariant 6: no two alive characters ever share a cell.
fn assert_no_alive_characters_share_a_cell(board: &Board) {
    let mut occupied = std::collections::HashSet::new();
    for player in board.players() {
        if player.is_alive() {
            assert!(occupied.insert(player.coord()), "two alive characters share a cell");
        }
    }
    for enemy in board.enemies().values() {
        if enemy.is_alive() {
            assert!(occupied.insert(enemy.coord()), "two alive characters share a cell");
        }
    }
}

/// Invariant 8: `checkWin` and `checkLose` are mutually exclusive.
fn assert_win_lose_mutually_exclusive(board: &Board) {
    assert!(!(board.check_win() && board.check_lose()));
}

fn assert_all_invariants(board: &Board) {
    assert_back_references_consistent(board);
    assert_fruit_count_consistent(board);
    assert_frozen_cells_clear(board);
    assert_no_alive_characters_share_a_cell(board);
    assert_win_lose_mutually_exclusive(board);
}

proptest! {
    #[test]
    fn invariants_hold_through_random_host_moves(moves in prop::collection::vec(directions(), 0..40)) {
        let (mut board, host_id, _guest_id) = fresh_board();
        assert_all_invariants(&board);
        for dir in moves {
            // Errors (blocked cell, frozen cell, off-grid) are expected and
            // simply leave the board unchanged; only the resulting state
            // matters here, not whether every move succeeds.
            let _ = board.move_player(host_id, dir);
            assert_all_invariants(&board);
        }
    }

    #[test]
    fn invariants_hold_through_interleaved_player_moves(
        moves in prop::collection::vec((any::<bool>(), directions()), 0..40)
    ) {
        let (mut board, host_id, guest_id) = fresh_board();
        for (use_host, dir) in moves {
            let actor = if use_host { host_id } else { guest_id };
            let _ = board.move_player(actor, dir);
            assert_all_invariants(&board);
        }
    }

    #[test]
    fn invariants_hold_through_enemy_ticks(ticks in prop::collection::vec(0usize..8, 0..20)) {
        let (mut board, _host_id, _guest_id) = fresh_board();
        let enemy_ids: Vec<_> = board.enemies().keys().copied().collect();
        for idx in ticks {
            if let Some(&enemy_id) = enemy_ids.get(idx % enemy_ids.len().max(1)) {
                let _ = board.tick_enemy(enemy_id);
                assert_all_invariants(&board);
            }
        }
    }
}

#[test]
fn host_move_updates_its_own_back_reference() {
    let (mut board, host_id, _guest_id) = fresh_board();
    let _ = board.move_player(host_id, Direction::Left);
    assert_eq!(board.grid().cell(board.player(HOST).coord()).character, Some(host_id));
}
