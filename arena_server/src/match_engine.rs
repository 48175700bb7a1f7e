//! One running match: owns its `Board`, its clock ticker and one ticker
//! per enemy (spec.md §4.5). Per the Design Notes' recommended
//! concurrency shape, each match is a single-threaded event loop task
//! selecting over a command channel — there is no `Mutex<Board>` anywhere,
//! because only the loop task itself ever touches the board.

use crate::board::Board;
use crate::character::Character;
use crate::collaborators::{OutboundChannel, UserRecord, UserStore};
use crate::config::Config;
use crate::grid::{CellDelta, Item};
use crate::snapshot::MatchStorage;
use arena_protocol::ids::{CharacterId, Coord, Direction, MatchId, UserId};
use arena_protocol::messages::{
    CellDto, CharacterState, EndPayload, EnemySnapshotDto, ItemDto, MatchResult, OutboundMessage, PausedPayload,
    PlayerSnapshotDto, PlayerUpdatePayload, UpdateAllPayload, UpdateEnemyPayload, UpdateFrozenCellsPayload,
    UpdateFruitsPayload, UpdateMovePayload, UpdateSpecialFruitPayload, UpdateStatePayload, UpdateTimePayload,
};
use arena_protocol::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};

/// A channel slot that `SessionRouter` swaps on connect/reconnect/drop
/// without needing to restart the owning match.
pub type ChannelSlot = Arc<RwLock<Option<Arc<dyn OutboundChannel>>>>;

pub fn empty_channel_slot() -> ChannelSlot {
    Arc::new(RwLock::new(None))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerOp {
    Move(Direction),
    Rotate(Direction),
    ExecPower,
    Pause,
    Resume,
    UpdateAll,
}

/// `set-color`'s payload is a string the wire layer already validated, kept
/// out of `PlayerOp`'s `Copy`-friendly variants by carrying it alongside.
#[derive(Debug, Clone)]
pub enum PlayerMessage {
    Op(PlayerOp),
    SetColor(String),
}

pub enum MatchCommand {
    PlayerOp {
        user_id: UserId,
        message: PlayerMessage,
    },
    ClockTick,
    EnemyTick {
        enemy_id: CharacterId,
    },
    Stop,
    Snapshot {
        reply: oneshot::Sender<MatchStorage>,
    },
}

struct MatchState {
    id: MatchId,
    board: Board,
    seconds_left: u64,
    paused: bool,
    running: bool,
    host_user: UserId,
    guest_user: UserId,
    host_character: CharacterId,
    guest_character: CharacterId,
    host_channel: ChannelSlot,
    guest_channel: ChannelSlot,
    match_timeout: Duration,
    user_store: Arc<dyn UserStore>,
}

impl MatchState {
    fn character_of(&self, user_id: UserId) -> Option<CharacterId> {
        if user_id == self.host_user {
            Some(self.host_character)
        } else if user_id == self.guest_user {
            Some(self.guest_character)
        } else {
            None
        }
    }

    fn channel_of(&self, user_id: UserId) -> Option<&ChannelSlot> {
        if user_id == self.host_user {
            Some(&self.host_channel)
        } else if user_id == self.guest_user {
            Some(&self.guest_channel)
        } else {
            None
        }
    }

    async fn notify_players(&self, message: OutboundMessage) {
        for slot in [&self.host_channel, &self.guest_channel] {
            let guard = slot.read().await;
            if let Some(channel) = guard.as_ref() {
                if let Err(err) = channel.send_async(message.clone()).await {
                    tracing::warn!(match_id = %self.id, ?err, "dropping outbound message for closed channel");
                }
            }
        }
    }

    async fn reply_to(&self, user_id: UserId, message: OutboundMessage) {
        if let Some(slot) = self.channel_of(user_id) {
            let guard = slot.read().await;
            if let Some(channel) = guard.as_ref() {
                let _ = channel.send_async(message).await;
            }
        }
    }

    fn cell_dto(coord: Coord, item: Option<&Item>, frozen: bool, character_id: Option<CharacterId>) -> CellDto {
        CellDto {
            coordinate: coord,
            frozen,
            item: item.map(|item| match item {
                Item::Fruit(kind) => ItemDto::Fruit {
                    fruit_type: kind.0.clone(),
                },
                Item::SpecialFruit => ItemDto::SpecialFruit,
                Item::Rock => ItemDto::Rock,
            }),
            character_id,
        }
    }

    fn build_update_all(&self) -> UpdateAllPayload {
        let cells = self
            .board
            .grid()
            .iter()
            .filter(|(_, cell)| cell.item.is_some() || cell.frozen || cell.character.is_some())
            .map(|(coord, cell)| Self::cell_dto(coord, cell.item.as_ref(), cell.frozen, cell.character))
            .collect();

        let players = self
            .board
            .players()
            .iter()
            .map(|player| PlayerSnapshotDto {
                id: player.id(),
                color: player.color().to_owned(),
                coordinates: player.coord(),
                direction: player.orientation(),
                state: character_state(player.is_alive()),
                status: player.status(),
            })
            .collect();

        let enemies = self
            .board
            .enemies()
            .values()
            .map(|enemy| EnemySnapshotDto {
                id: enemy.id(),
                kind: enemy.kind().as_str().to_owned(),
                coordinates: enemy.coord(),
                direction: enemy.orientation(),
                enemy_state: enemy.state(),
            })
            .collect();

        UpdateAllPayload {
            cells,
            players,
            enemies,
            current_round: self.board.current_round(),
            fruits_number: self.board.fruits_number(),
            seconds_left: self.seconds_left as u32,
            paused: self.paused,
            level: self.board.level(),
            map: self.board.map().to_owned(),
        }
    }

    fn deltas_to_dtos(&self, deltas: &[CellDelta]) -> Vec<CellDto> {
        deltas
            .iter()
            .map(|delta| {
                let cell = self.board.grid().cell(delta.coord);
                Self::cell_dto(delta.coord, cell.item.as_ref(), delta.frozen, cell.character)
            })
            .collect()
    }

    /// Resolves the "checkLose should fire immediately" open question
    /// (DESIGN.md): every state-mutating command checks terminal
    /// conditions before returning control to the select loop, not only
    /// the clock ticker.
    async fn check_terminal(&mut self) -> Option<MatchResult> {
        if !self.running {
            return None;
        }
        let result = if self.board.check_lose() || self.seconds_left == 0 {
            MatchResult::Lose
        } else if self.board.check_win() {
            MatchResult::Win
        } else {
            return None;
        };
        self.notify_players(OutboundMessage::End(EndPayload { result })).await;
        self.running = false;
        Some(result)
    }

    fn snapshot(&self) -> MatchStorage {
        MatchStorage {
            board: self.board.capture(),
            seconds_left: self.seconds_left,
            paused: self.paused,
        }
    }

    /// Returns `true` when the error just handled is fatal to the match
    /// (spec.md §7: `UserNotDefined` "stop tickers"), telling `run` to stop
    /// the event loop instead of replying and continuing.
    async fn handle_player_message(&mut self, user_id: UserId, message: PlayerMessage) -> bool {
        let Some(character_id) = self.character_of(user_id) else {
            return false;
        };

        // A dead player's operation is dropped; they get an immediate
        // `update-state` instead. `update-all` is the one exception — a
        // reconnecting dead player still needs the board to render its own
        // death rather than nothing at all.
        let is_dead = self
            .board
            .players()
            .iter()
            .any(|p| p.id() == character_id && !p.is_alive());
        if is_dead && !matches!(message, PlayerMessage::Op(PlayerOp::UpdateAll)) {
            self.reply_to(
                user_id,
                OutboundMessage::UpdateState(UpdateStatePayload {
                    id: character_id,
                    state: CharacterState::Dead,
                }),
            )
            .await;
            return false;
        }

        match message {
            PlayerMessage::Op(PlayerOp::Move(dir)) => match self.board.move_player(character_id, dir) {
                Ok(outcome) => {
                    self.notify_players(OutboundMessage::UpdateMove(UpdateMovePayload {
                        id: outcome.id,
                        coordinates: outcome.coord,
                        direction: outcome.direction,
                        state: character_state(outcome.alive),
                        id_item_consumed: outcome.item_consumed,
                        number_of_fruits: outcome.fruits_number,
                    }))
                    .await;
                    if !outcome.alive {
                        self.notify_players(OutboundMessage::UpdateState(UpdateStatePayload {
                            id: outcome.id,
                            state: CharacterState::Dead,
                        }))
                        .await;
                    }
                    if let Some(advance) = outcome.round_advance {
                        self.notify_players(OutboundMessage::UpdateFruits(UpdateFruitsPayload {
                            current_round: advance.current_round,
                            next_fruit_type: advance.next_fruit_type,
                        }))
                        .await;
                    }
                    if let Some(pickup) = outcome.special_fruit_revive {
                        self.notify_players(OutboundMessage::UpdateSpecialFruit(UpdateSpecialFruitPayload {
                            coordinates: pickup.coord,
                            consumed_by: outcome.id,
                        }))
                        .await;
                        if let Some(revived) = pickup.revived {
                            self.notify_players(OutboundMessage::UpdateState(UpdateStatePayload {
                                id: revived,
                                state: CharacterState::Alive,
                            }))
                            .await;
                        }
                    }
                }
                Err(err) => return self.fail(user_id, err).await,
            },
            PlayerMessage::Op(PlayerOp::Rotate(dir)) => match self.board.rotate_player(character_id, dir) {
                Ok(outcome) => {
                    self.notify_players(OutboundMessage::UpdateMove(UpdateMovePayload {
                        id: outcome.id,
                        coordinates: outcome.coord,
                        direction: outcome.direction,
                        state: character_state(outcome.alive),
                        id_item_consumed: None,
                        number_of_fruits: None,
                    }))
                    .await;
                }
                Err(err) => return self.fail(user_id, err).await,
            },
            PlayerMessage::Op(PlayerOp::ExecPower) => match self.board.exec_power(character_id) {
                Ok(deltas) if !deltas.is_empty() => {
                    let direction = self
                        .board
                        .players()
                        .iter()
                        .find(|p| p.id() == character_id)
                        .map(|p| p.orientation())
                        .unwrap_or(Direction::Down);
                    self.notify_players(OutboundMessage::UpdateFrozenCells(UpdateFrozenCellsPayload {
                        cells: self.deltas_to_dtos(&deltas),
                        direction,
                    }))
                    .await;
                }
                Ok(_) => {}
                Err(err) => return self.fail(user_id, err).await,
            },
            PlayerMessage::SetColor(color) => {
                let mut name = String::new();
                if let Some(player) = self
                    .board
                    .players_mut()
                    .iter_mut()
                    .find(|p| p.id() == character_id)
                {
                    player.set_color(color.clone());
                    name = player.name().to_owned();
                }
                let record = UserRecord {
                    color: color.clone(),
                    name,
                };
                if let Err(err) = self.user_store.update(user_id, record).await {
                    tracing::warn!(match_id = %self.id, ?err, "failed to persist color change");
                }
                // `update-state`'s schema carries only id/alive-state, not
                // color; `player-update` is the shape that actually fits
                // (DESIGN.md resolves this wire-schema mismatch).
                self.notify_players(OutboundMessage::PlayerUpdate(PlayerUpdatePayload {
                    id: character_id,
                    color: Some(color),
                    name: None,
                }))
                .await;
            }
            PlayerMessage::Op(PlayerOp::Pause) => {
                if !self.paused {
                    self.paused = true;
                    self.notify_players(OutboundMessage::Paused(PausedPayload { paused: true })).await;
                }
            }
            PlayerMessage::Op(PlayerOp::Resume) => {
                if self.paused {
                    self.paused = false;
                    self.notify_players(OutboundMessage::Paused(PausedPayload { paused: false })).await;
                }
            }
            PlayerMessage::Op(PlayerOp::UpdateAll) => {
                self.reply_to(user_id, OutboundMessage::UpdateAll(self.build_update_all())).await;
            }
        }
        false
    }

    /// Replies the error envelope to the offending user, then reports
    /// whether `run` should stop the match over it.
    async fn fail(&self, user_id: UserId, err: Error) -> bool {
        let fatal = err.is_fatal_to_match();
        self.reply_to(user_id, OutboundMessage::error(&err)).await;
        fatal
    }

    async fn handle_clock_tick(&mut self) {
        if self.paused || self.seconds_left == 0 {
            return;
        }
        self.seconds_left -= 1;
        self.notify_players(OutboundMessage::UpdateTime(UpdateTimePayload {
            minutes_left: (self.seconds_left / 60) as u32,
            seconds_left: (self.seconds_left % 60) as u32,
        }))
        .await;
    }

    async fn handle_enemy_tick(&mut self, enemy_id: CharacterId) {
        if self.paused {
            return;
        }
        let Some(outcome) = self.board.tick_enemy(enemy_id) else {
            return;
        };

        if !outcome.power_deltas.is_empty() {
            let direction = self
                .board
                .enemies()
                .get(&enemy_id)
                .map(|enemy| enemy.orientation())
                .unwrap_or(Direction::Down);
            self.notify_players(OutboundMessage::UpdateFrozenCells(UpdateFrozenCellsPayload {
                cells: self.deltas_to_dtos(&outcome.power_deltas),
                direction,
            }))
            .await;
        }

        for step in &outcome.steps {
            self.notify_players(OutboundMessage::UpdateEnemy(UpdateEnemyPayload {
                enemy_id,
                coordinates: step.coord,
                direction: step.direction,
                enemy_state: step.enemy_state,
            }))
            .await;
        }

        if let Some(player_id) = outcome.killed_player {
            self.notify_players(OutboundMessage::UpdateState(UpdateStatePayload {
                id: player_id,
                state: CharacterState::Dead,
            }))
            .await;
        }
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<MatchCommand>) {
        let mut terminal: Option<MatchResult> = None;
        while let Some(command) = receiver.recv().await {
            match command {
                MatchCommand::PlayerOp { user_id, message } => {
                    if self.handle_player_message(user_id, message).await {
                        self.running = false;
                        break;
                    }
                }
                MatchCommand::ClockTick => self.handle_clock_tick().await,
                MatchCommand::EnemyTick { enemy_id } => self.handle_enemy_tick(enemy_id).await,
                MatchCommand::Stop => {
                    self.notify_players(OutboundMessage::End(EndPayload {
                        result: MatchResult::EndGame,
                    }))
                    .await;
                    self.running = false;
                    terminal = Some(MatchResult::EndGame);
                }
                MatchCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                    continue;
                }
            }
            if terminal.is_some() {
                break;
            }
            if let Some(result) = self.check_terminal().await {
                terminal = Some(result);
                break;
            }
        }

        // A win keeps the match answering `Snapshot` for a grace period
        // (spec.md §7: "drop match from router after MATCH_TIME_OUT_SECONDS")
        // instead of disappearing the instant the last fruit is cleared.
        if terminal == Some(MatchResult::Win) {
            self.drain_grace_period(receiver).await;
        }
    }

    async fn drain_grace_period(&self, mut receiver: mpsc::UnboundedReceiver<MatchCommand>) {
        let deadline = tokio::time::sleep(self.match_timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                command = receiver.recv() => {
                    match command {
                        Some(MatchCommand::Snapshot { reply }) => {
                            let _ = reply.send(self.snapshot());
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
            }
        }
    }
}

fn character_state(alive: bool) -> CharacterState {
    if alive {
        CharacterState::Alive
    } else {
        CharacterState::Dead
    }
}

/// Handle to a running match's command channel. `Match` methods are async
/// because the loop task may be momentarily busy; sending never blocks on
/// an unbounded channel, but `get_match_storage` awaits a reply.
#[derive(Clone)]
pub struct MatchHandle {
    id: MatchId,
    sender: mpsc::UnboundedSender<MatchCommand>,
}

impl MatchHandle {
    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn dispatch(&self, user_id: UserId, message: PlayerMessage) -> Result<(), Error> {
        self.sender
            .send(MatchCommand::PlayerOp { user_id, message })
            .map_err(|_| Error::ChannelClosed)
    }

    pub fn stop_game(&self) -> Result<(), Error> {
        self.sender.send(MatchCommand::Stop).map_err(|_| Error::ChannelClosed)
    }

    pub async fn get_match_storage(&self) -> Result<MatchStorage, Error> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(MatchCommand::Snapshot { reply })
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }
}

/// Spawns a match's event-loop task plus its clock ticker and one ticker
/// per enemy, returning a handle the session router dispatches through.
pub fn spawn(
    id: MatchId,
    level: &'static crate::board::Level,
    host_user: UserId,
    guest_user: UserId,
    host_channel: ChannelSlot,
    guest_channel: ChannelSlot,
    config: Config,
    user_store: Arc<dyn UserStore>,
) -> MatchHandle {
    let host_character = CharacterId::new();
    let guest_character = CharacterId::new();
    let board = Board::new(level, host_character, guest_character);
    spawn_state(
        id,
        level,
        board,
        host_user,
        guest_user,
        host_character,
        guest_character,
        host_channel,
        guest_channel,
        config,
        config.match_time_seconds,
        false,
        user_store,
    )
}

/// Rebuilds a match's event loop from a persisted `MatchStorage` instead of
/// a fresh `Board` — the session router's restore-on-miss path (spec.md
/// §6), used when a reconnect lands after the loop task has gone away but
/// the snapshot cache still holds its last state.
pub fn resume(
    id: MatchId,
    host_user: UserId,
    guest_user: UserId,
    host_channel: ChannelSlot,
    guest_channel: ChannelSlot,
    config: Config,
    storage: MatchStorage,
    user_store: Arc<dyn UserStore>,
) -> MatchHandle {
    let seconds_left = storage.seconds_left;
    let paused = storage.paused;
    let board = Board::restore(storage.board);
    let level = crate::board::Level::by_number(board.level());
    let host_character = board.player(crate::board::HOST).id();
    let guest_character = board.player(crate::board::GUEST).id();
    spawn_state(
        id,
        level,
        board,
        host_user,
        guest_user,
        host_character,
        guest_character,
        host_channel,
        guest_channel,
        config,
        seconds_left,
        paused,
        user_store,
    )
}

#[allow(clippy::too_many_arguments)]
fn spawn_state(
    id: MatchId,
    level: &'static crate::board::Level,
    board: Board,
    host_user: UserId,
    guest_user: UserId,
    host_character: CharacterId,
    guest_character: CharacterId,
    host_channel: ChannelSlot,
    guest_channel: ChannelSlot,
    config: Config,
    seconds_left: u64,
    paused: bool,
    user_store: Arc<dyn UserStore>,
) -> MatchHandle {
    let enemy_ticks: Vec<(CharacterId, Duration)> = board
        .enemies()
        .iter()
        .map(|(id, enemy)| (*id, Duration::from_millis(level.enemy_tick_ms(enemy.kind()))))
        .collect();

    let (tx, rx) = mpsc::unbounded_channel();

    let state = MatchState {
        id,
        board,
        seconds_left,
        paused,
        running: true,
        host_user,
        guest_user,
        host_character,
        guest_character,
        host_channel,
        guest_channel,
        match_timeout: config.match_time_out(),
        user_store,
    };
    tokio::spawn(state.run(rx));

    spawn_ticker(tx.clone(), config.timer_speed(), || MatchCommand::ClockTick);
    for (enemy_id, period) in enemy_ticks {
        spawn_ticker(tx.clone(), period, move || MatchCommand::EnemyTick { enemy_id });
    }

    MatchHandle { id, sender: tx }
}

fn spawn_ticker(
    sender: mpsc::UnboundedSender<MatchCommand>,
    period: Duration,
    mut command: impl FnMut() -> MatchCommand + Send + 'static,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            if sender.send(command()).is_err() {
                break;
            }
        }
    });
}
