//! Level layout, fruit lifecycle, win/lose predicates and the enemy
//! best-direction query (spec.md §4.3). `Board` is the sole owner of the
//! `Grid`, the two `Player`s and every `Enemy`; all cross-character
//! mutation (a move that ends in a kill, a power that freezes a neighbor)
//! happens here rather than on the characters themselves, because only the
//! board can see both halves of a contact between two characters.

pub mod level;

pub use level::Level;

use crate::character::{spawn_enemy, Character, Enemy, EnemyTickContext, Player, PowerKind};
use crate::graph::{Graph, WalkPolicy};
use crate::grid::{CellDelta, FruitKind, Grid, Item};
use crate::snapshot::{BoardSnapshot, CellSnapshot, EnemySnapshot, ItemSnapshot, PlayerSnapshot};
use arena_protocol::ids::{CharacterId, Coord, Direction};
use arena_protocol::messages::EnemyVisibleState;
use arena_protocol::Error;
use std::collections::{HashMap, VecDeque};

pub const HOST: usize = 0;
pub const GUEST: usize = 1;

/// Round-advance side effect of a fruit pickup, consumed by `Match` to
/// build the `update-fruits` event.
#[derive(Debug, Clone)]
pub struct RoundAdvance {
    pub current_round: u32,
    pub next_fruit_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub id: CharacterId,
    pub coord: Coord,
    pub direction: Direction,
    pub alive: bool,
    pub item_consumed: Option<String>,
    /// Per the resolved "numberOfFruits" open question (see DESIGN.md):
    /// only set when this move actually consumed an item.
    pub fruits_number: Option<u32>,
    pub round_advance: Option<RoundAdvance>,
    /// Set when this move consumed the special fruit, carrying the
    /// revived teammate's id if a dead one was brought back.
    pub special_fruit_revive: Option<SpecialFruitPickup>,
}

/// `update-special-fruit`'s payload ingredients, reported up to `Match`.
#[derive(Debug, Clone, Copy)]
pub struct SpecialFruitPickup {
    pub coord: Coord,
    pub revived: Option<CharacterId>,
}

#[derive(Debug, Clone)]
pub struct EnemyStep {
    pub coord: Coord,
    pub direction: Direction,
    pub enemy_state: EnemyVisibleState,
}

#[derive(Debug, Clone, Default)]
pub struct EnemyTickOutcome {
    pub power_deltas: Vec<CellDelta>,
    pub steps: Vec<EnemyStep>,
    pub killed_player: Option<CharacterId>,
}

pub struct Board {
    grid: Grid,
    players: [Player; 2],
    enemies: HashMap<CharacterId, Box<dyn Enemy>>,
    fruit_spawns: Vec<Coord>,
    fruit_queue: VecDeque<FruitKind>,
    current_round: u32,
    fruits_number: u32,
    level: u32,
    map: String,
}

impl Board {
    pub fn new(level: &Level, host_id: CharacterId, guest_id: CharacterId) -> Self {
        let mut grid = Grid::new();
        for &coord in level.rocks {
            grid.place_item(coord, Item::Rock);
        }
        for &coord in level.pre_frozen {
            grid.set_frozen(coord, true);
        }
        if let Some(coord) = level.special_fruit_spawn {
            grid.place_item(coord, Item::SpecialFruit);
        }

        let mut enemies: HashMap<CharacterId, Box<dyn Enemy>> = HashMap::new();
        for &(kind, coord) in level.enemy_spawns {
            let id = CharacterId::new();
            let enemy = spawn_enemy(kind, id, coord);
            grid.set_character(coord, Some(id));
            enemies.insert(id, enemy);
        }

        let [host_spawn, guest_spawn] = level.player_spawns;
        let host = Player::new(host_id, host_spawn, "host");
        let guest = Player::new(guest_id, guest_spawn, "guest");
        grid.set_character(host_spawn, Some(host_id));
        grid.set_character(guest_spawn, Some(guest_id));

        let mut board = Self {
            grid,
            players: [host, guest],
            enemies,
            fruit_spawns: level.fruit_spawns.to_vec(),
            fruit_queue: level.fruit_queue().into(),
            current_round: 0,
            fruits_number: 0,
            level: level.number,
            map: level.map.to_owned(),
        };
        board.set_up_fruits();
        board
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self, slot: usize) -> &Player {
        &self.players[slot]
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player; 2] {
        &mut self.players
    }

    pub fn enemies(&self) -> &HashMap<CharacterId, Box<dyn Enemy>> {
        &self.enemies
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn map(&self) -> &str {
        &self.map
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn fruits_number(&self) -> u32 {
        self.fruits_number
    }

    fn slot_of(&self, id: CharacterId) -> Option<usize> {
        self.players.iter().position(|p| p.id() == id)
    }

    fn is_enemy(&self, id: CharacterId) -> bool {
        self.enemies.contains_key(&id)
    }

    /// `BoardItem::kill()` dispatch for whatever currently occupies a cell.
    fn occupant_kill(&self, id: CharacterId) -> bool {
        self.is_enemy(id)
    }

    // -- Fruit lifecycle -------------------------------------------------

    /// `setUpFruits`: consumes the head of the fruit-type queue, places one
    /// fruit per configured coordinate unless a non-killable character
    /// (a player) already stands there, and advances the round counters.
    fn set_up_fruits(&mut self) {
        let Some(kind) = self.fruit_queue.pop_front() else {
            return;
        };
        self.current_round += 1;
        let mut placed = 0;
        for &coord in &self.fruit_spawns.clone() {
            let occupied_by_player = self
                .grid
                .cell(coord)
                .character
                .is_some_and(|id| !self.occupant_kill(id));
            if occupied_by_player {
                continue;
            }
            self.grid.place_item(coord, Item::Fruit(kind.clone()));
            placed += 1;
        }
        self.fruits_number = placed;
    }

    /// After a fruit is picked: if the round's fruits are exhausted and
    /// another round is queued, stage it and report the advance so `Match`
    /// can fan out `update-fruits`.
    fn maybe_advance_round(&mut self) -> Option<RoundAdvance> {
        if self.fruits_number != 0 {
            return None;
        }
        if self.fruit_queue.is_empty() {
            return None;
        }
        let next_fruit_type = self.fruit_queue.front().map(|k| k.0.clone());
        self.set_up_fruits();
        Some(RoundAdvance {
            current_round: self.current_round,
            next_fruit_type,
        })
    }

    /// Returns the consumed-item label (for `update-move`'s
    /// `id_item_consumed`), any round advance, and whether the item was
    /// the special fruit specifically (reborn handling lives in the
    /// caller, which alone knows which slot is the mover's teammate).
    fn pick_item_at(&mut self, coord: Coord) -> (Option<String>, Option<RoundAdvance>, bool) {
        match self.grid.pick_item(coord) {
            Some(Item::Fruit(kind)) => {
                self.fruits_number = self.fruits_number.saturating_sub(1);
                let advance = self.maybe_advance_round();
                (Some(kind.0), advance, false)
            }
            Some(Item::SpecialFruit) => (Some("special".to_owned()), None, true),
            Some(Item::Rock) | None => (None, None, false),
        }
    }

    // -- Win/lose ----------------------------------------------------------

    /// `checkWin`.
    pub fn check_win(&self) -> bool {
        self.fruits_number == 0
            && self.fruit_queue.is_empty()
            && (self.players[HOST].is_alive() || self.players[GUEST].is_alive())
    }

    /// `checkLose` (board half; the match additionally treats
    /// `secondsLeft == 0` as lose).
    pub fn check_lose(&self) -> bool {
        !self.players[HOST].is_alive() && !self.players[GUEST].is_alive()
    }

    // -- Pathing -------------------------------------------------------

    /// `bestDirectionToPlayers`: shortest-path direction from `from` to
    /// whichever alive player is closer, ties favoring host. Built with
    /// `canWalkOverPlayers = true` since enemies may step onto a player's
    /// cell to kill it.
    pub fn best_direction_to_players(&self, from: Coord, can_break_frozen: bool) -> Option<Direction> {
        let policy = WalkPolicy {
            can_break_frozen,
            can_walk_over_players: true,
        };
        let graph = Graph::build(&self.grid, policy, |id| self.occupant_kill(id));

        let mut best: Option<(u32, Direction)> = None;
        for player in &self.players {
            if !player.is_alive() {
                continue;
            }
            let result = graph.shortest_path(from, player.coord());
            let Some(distance) = result.distance else {
                continue;
            };
            let Some(dir) = result.first_step() else {
                continue;
            };
            let better = match best {
                Some((best_d, _)) => distance < best_d,
                None => true,
            };
            if better {
                best = Some((distance, dir));
            }
        }
        best.map(|(_, dir)| dir)
    }

    fn best_path_to_players(&self, from: Coord, can_break_frozen: bool) -> Vec<Coord> {
        let policy = WalkPolicy {
            can_break_frozen,
            can_walk_over_players: true,
        };
        let graph = Graph::build(&self.grid, policy, |id| self.occupant_kill(id));

        let mut best: Option<(u32, Vec<Coord>)> = None;
        for player in &self.players {
            if !player.is_alive() {
                continue;
            }
            let result = graph.shortest_path(from, player.coord());
            let Some(distance) = result.distance else {
                continue;
            };
            let better = match &best {
                Some((best_d, _)) => distance < *best_d,
                None => true,
            };
            if better {
                best = Some((distance, result.path));
            }
        }
        best.map(|(_, path)| path).unwrap_or_default()
    }

    /// The axis-aligned prefix of the shortest path to a player, expressed
    /// as a sequence of single-step directions — LogMan's roll length.
    fn straight_run(&self, from: Coord, can_break_frozen: bool) -> Vec<Direction> {
        let path = self.best_path_to_players(from, can_break_frozen);
        let mut run = Vec::new();
        let mut axis: Option<Direction> = None;
        for pair in path.windows(2) {
            let [a, b] = pair else { break };
            let Some(dir) = Direction::ALL.into_iter().find(|d| a.stepped(*d) == Some(*b)) else {
                break;
            };
            match axis {
                None => axis = Some(dir),
                Some(a) if a != dir => break,
                _ => {}
            }
            run.push(dir);
        }
        run
    }

    // -- Player movement -------------------------------------------------

    /// `Player.move`/`moveUp`/etc — validates, mutates, resolves contact
    /// with whatever occupied the target cell, and reports the resulting
    /// outbound payload fields.
    pub fn move_player(&mut self, id: CharacterId, dir: Direction) -> Result<MoveOutcome, Error> {
        let slot = self.slot_of(id).ok_or(Error::UserNotDefined)?;
        let from = self.players[slot].coord();
        let target = from.stepped(dir).ok_or(Error::NullCell)?;

        let target_cell = self.grid.cell(target);
        if target_cell.blocked() || target_cell.frozen {
            return Err(Error::BlockedCell);
        }
        let occupant = target_cell.character;
        if let Some(occ_id) = occupant {
            if !self.occupant_kill(occ_id) {
                // another non-killable character (the other player)
                return Err(Error::BlockedCell);
            }
        }

        self.grid.set_character(from, None);
        self.players[slot].set_orientation(dir);
        self.players[slot].set_coord(target);

        let (item_consumed, round_advance, was_special) = if occupant.is_none() {
            self.grid.set_character(target, Some(id));
            self.pick_item_at(target)
        } else {
            // Cross-kill contact: the enemy already occupying `target`
            // keeps its registration there; the player's own coordinate
            // still updates so the death renders at the contact point.
            (None, None, false)
        };

        if let Some(occ_id) = occupant {
            debug_assert!(self.occupant_kill(occ_id));
            self.players[slot].die();
        }

        // Special fruit: reborn the teammate if (and only if) they are
        // currently dead (spec.md §4.4 `reborn()`).
        let special_fruit_revive = if was_special {
            let teammate_slot = 1 - slot;
            let teammate_id = self.players[teammate_slot].id();
            let mut revived = None;
            if !self.players[teammate_slot].is_alive() {
                self.reborn_player(teammate_id)?;
                revived = Some(teammate_id);
            }
            Some(SpecialFruitPickup { coord: target, revived })
        } else {
            None
        };

        let fruits_number = item_consumed.is_some().then_some(self.fruits_number);
        Ok(MoveOutcome {
            id,
            coord: self.players[slot].coord(),
            direction: dir,
            alive: self.players[slot].is_alive(),
            item_consumed,
            fruits_number,
            round_advance,
            special_fruit_revive,
        })
    }

    /// `changeOrientation` — pure, no cell mutation.
    pub fn rotate_player(&mut self, id: CharacterId, dir: Direction) -> Result<MoveOutcome, Error> {
        let slot = self.slot_of(id).ok_or(Error::UserNotDefined)?;
        self.players[slot].set_orientation(dir);
        Ok(MoveOutcome {
            id,
            coord: self.players[slot].coord(),
            direction: dir,
            alive: self.players[slot].is_alive(),
            item_consumed: None,
            fruits_number: None,
            special_fruit_revive: None,
            round_advance: None,
        })
    }

    /// `execPower` — fires the freeze/unfreeze chain from the player's
    /// cell along its current orientation.
    pub fn exec_power(&mut self, id: CharacterId) -> Result<Vec<CellDelta>, Error> {
        let slot = self.slot_of(id).ok_or(Error::UserNotDefined)?;
        let player = &self.players[slot];
        Ok(self.grid.execute_power(player.coord(), player.orientation(), true))
    }

    pub fn reborn_player(&mut self, id: CharacterId) -> Result<(), Error> {
        let slot = self.slot_of(id).ok_or(Error::UserNotDefined)?;
        self.players[slot].reborn();
        Ok(())
    }

    // -- Enemy ticks -------------------------------------------------------

    /// One enemy's tick: apply its power (if any), compute the AI context
    /// from the live board, then let it decide and perform its movement.
    pub fn tick_enemy(&mut self, id: CharacterId) -> Option<EnemyTickOutcome> {
        let mut enemy = self.enemies.remove(&id)?;
        if !enemy.is_alive() {
            self.enemies.insert(id, enemy);
            return None;
        }

        let mut outcome = EnemyTickOutcome::default();

        if let Some(power) = enemy.power_before_move() {
            let deltas = match power {
                PowerKind::Unfreeze => self.grid.unfreeze_cells_around(enemy.coord()),
                PowerKind::Freeze => self.grid.freeze_cells_around(enemy.coord()),
            };
            outcome.power_deltas = deltas;
        }

        let best_direction = self.best_direction_to_players(enemy.coord(), enemy.can_break_frozen());
        let straight = self.straight_run(enemy.coord(), enemy.can_break_frozen());
        let ctx = EnemyTickContext::build(enemy.orientation(), best_direction, straight);

        let mut steps: Vec<EnemyStep> = Vec::new();
        let mut killed_player: Option<CharacterId> = None;
        {
            let board = &mut *self;
            let mut try_step = |dir: Direction| -> bool {
                let Some(target) = enemy.coord().stepped(dir) else {
                    return false;
                };
                let target_cell = board.grid.cell(target);
                if target_cell.blocked() {
                    return false;
                }
                if target_cell.frozen && !enemy.can_break_frozen() {
                    return false;
                }
                let occupant = target_cell.character;
                if let Some(occ_id) = occupant {
                    if board.is_enemy(occ_id) {
                        return false;
                    }
                }

                let from = enemy.coord();
                board.grid.set_character(from, None);
                enemy.set_orientation(dir);
                enemy.set_coord(target);
                board.grid.set_character(target, Some(enemy.id()));

                if let Some(player_id) = occupant {
                    if let Some(slot) = board.slot_of(player_id) {
                        board.players[slot].die();
                        killed_player = Some(player_id);
                    }
                }

                steps.push(EnemyStep {
                    coord: enemy.coord(),
                    direction: enemy.orientation(),
                    enemy_state: enemy.state(),
                });
                true
            };
            enemy.calculate_movement(&ctx, &mut try_step);
        }

        // Reflect the enemy's final visible state on its last recorded
        // step (its state often settles — e.g. Troll to `stopped` — only
        // after `calculate_movement` returns).
        if let Some(last) = steps.last_mut() {
            last.enemy_state = enemy.state();
        } else {
            steps.push(EnemyStep {
                coord: enemy.coord(),
                direction: enemy.orientation(),
                enemy_state: enemy.state(),
            });
        }

        outcome.steps = steps;
        outcome.killed_player = killed_player;

        self.enemies.insert(id, enemy);
        Some(outcome)
    }

    // -- Snapshot ----------------------------------------------------------

    /// `getMatchStorage`'s board half: every field needed to reconstruct
    /// this board exactly via `restore`.
    pub fn capture(&self) -> BoardSnapshot {
        let mut cells = Vec::new();
        for (coord, cell) in self.grid.iter() {
            if cell.item.is_none() && !cell.frozen && cell.character.is_none() {
                continue;
            }
            cells.push(CellSnapshot {
                coord,
                frozen: cell.frozen,
                item: cell.item.as_ref().map(|item| match item {
                    Item::Fruit(kind) => ItemSnapshot::Fruit(kind.0.clone()),
                    Item::SpecialFruit => ItemSnapshot::SpecialFruit,
                    Item::Rock => ItemSnapshot::Rock,
                }),
                character_id: cell.character,
            });
        }

        let players = std::array::from_fn(|i| PlayerSnapshot {
            id: self.players[i].id(),
            color: self.players[i].color().to_owned(),
            name: self.players[i].name().to_owned(),
            coord: self.players[i].coord(),
            direction: self.players[i].orientation(),
            alive: self.players[i].is_alive(),
            status: self.players[i].status(),
        });

        let enemies = self
            .enemies
            .values()
            .map(|enemy| EnemySnapshot {
                id: enemy.id(),
                kind: enemy.kind(),
                coord: enemy.coord(),
                direction: enemy.orientation(),
                alive: enemy.is_alive(),
            })
            .collect();

        BoardSnapshot {
            cells,
            fruit_spawns: self.fruit_spawns.clone(),
            fruit_queue: self.fruit_queue.iter().map(|k| k.0.clone()).collect(),
            fruits_number: self.fruits_number,
            current_round: self.current_round,
            players,
            enemies,
            level: self.level,
            map: self.map.clone(),
        }
    }

    /// `loadBoard(snapshot, host, guest)` — reconstructs the grid and
    /// re-instantiates players and enemies from the snapshot's per-cell
    /// and per-character data.
    pub fn restore(snapshot: BoardSnapshot) -> Self {
        let mut grid = Grid::new();
        for cell in &snapshot.cells {
            if let Some(item) = &cell.item {
                let item = match item {
                    ItemSnapshot::Fruit(kind) => Item::Fruit(FruitKind(kind.clone())),
                    ItemSnapshot::SpecialFruit => Item::SpecialFruit,
                    ItemSnapshot::Rock => Item::Rock,
                };
                grid.place_item(cell.coord, item);
            }
            if cell.frozen {
                grid.set_frozen(cell.coord, true);
            }
            if let Some(character_id) = cell.character_id {
                grid.set_character(cell.coord, Some(character_id));
            }
        }

        let [host_snap, guest_snap] = &snapshot.players;
        let mut players = [
            Player::new(host_snap.id, host_snap.coord, host_snap.name.clone()),
            Player::new(guest_snap.id, guest_snap.coord, guest_snap.name.clone()),
        ];
        for (player, snap) in players.iter_mut().zip(&snapshot.players) {
            player.set_orientation(snap.direction);
            player.set_alive(snap.alive);
            player.set_color(snap.color.clone());
            player.set_status(snap.status);
        }

        let mut enemies: HashMap<CharacterId, Box<dyn Enemy>> = HashMap::new();
        for snap in &snapshot.enemies {
            let mut enemy = spawn_enemy(snap.kind, snap.id, snap.coord);
            enemy.set_orientation(snap.direction);
            enemy.set_alive(snap.alive);
            enemies.insert(snap.id, enemy);
        }

        Self {
            grid,
            players,
            enemies,
            fruit_spawns: snapshot.fruit_spawns,
            fruit_queue: snapshot.fruit_queue.into_iter().map(FruitKind).collect(),
            current_round: snapshot.current_round,
            fruits_number: snapshot.fruits_number,
            level: snapshot.level,
            map: snapshot.map,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_board() -> Board {
        Board::new(Level::by_number(1), CharacterId::new(), CharacterId::new())
    }

    #[test]
    fn fresh_board_stages_round_one() {
        let board = new_board();
        assert_eq!(board.current_round(), 1);
        assert!(board.fruits_number() > 0);
        assert!(!board.check_win());
        assert!(!board.check_lose());
    }

    #[test]
    fn move_player_into_rock_is_blocked_cell() {
        let mut board = new_board();
        let host_id = board.player(HOST).id();
        // Level 1's rock sits one step below host spawn (9,1) -> (9,2).
        let result = board.move_player(host_id, Direction::Down);
        assert!(matches!(result, Err(Error::BlockedCell)));
    }

    #[test]
    fn move_player_updates_coordinate_and_orientation() {
        let mut board = new_board();
        let host_id = board.player(HOST).id();
        let before = board.player(HOST).coord();
        let outcome = board.move_player(host_id, Direction::Left).unwrap();
        assert_eq!(outcome.direction, Direction::Left);
        assert_eq!(board.player(HOST).coord(), before.stepped(Direction::Left).unwrap());
    }

    #[test]
    fn check_lose_when_both_players_dead() {
        let mut board = new_board();
        let host_id = board.player(HOST).id();
        let guest_id = board.player(GUEST).id();
        board.players[board.slot_of(host_id).unwrap()].set_alive(false);
        board.players[board.slot_of(guest_id).unwrap()].set_alive(false);
        assert!(board.check_lose());
        assert!(!board.check_win());
    }

    #[test]
    fn capture_restore_round_trips() {
        let board = new_board();
        let snapshot = board.capture();
        let restored = Board::restore(snapshot.clone());
        assert_eq!(restored.capture(), snapshot);
    }
}
