//! The five enemy AI strategies (spec.md §4.4). Each is a small struct
//! implementing `Enemy`; `spawn_enemy` is the one factory function Design
//! Notes calls for in place of five subclasses.

use super::{Character, Enemy};
use arena_protocol::ids::{CharacterId, Coord, Direction};
use arena_protocol::messages::EnemyVisibleState;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    Troll,
    Cow,
    LogMan,
    SquidGreen,
    SquidBlue,
}

impl EnemyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EnemyKind::Troll => "troll",
            EnemyKind::Cow => "cow",
            EnemyKind::LogMan => "log-man",
            EnemyKind::SquidGreen => "squid-green",
            EnemyKind::SquidBlue => "squid-blue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerKind {
    Freeze,
    Unfreeze,
}

/// Everything a `calculate_movement` call needs that only the `Board` can
/// compute: the next hop of the shortest path to the nearer alive player,
/// the axis-aligned prefix of that same path (LogMan's roll length), and a
/// pre-shuffled retry order (Troll) so the trait itself never needs an RNG.
#[derive(Debug, Clone)]
pub struct EnemyTickContext {
    pub best_direction: Option<Direction>,
    pub straight_run: Vec<Direction>,
    pub retry_order: [Direction; 3],
}

impl EnemyTickContext {
    pub fn build(orientation: Direction, best_direction: Option<Direction>, straight_run: Vec<Direction>) -> Self {
        let mut retry_order = orientation.others();
        retry_order.shuffle(&mut rand::thread_rng());
        Self {
            best_direction,
            straight_run,
            retry_order,
        }
    }
}

fn base(id: CharacterId, spawn: Coord) -> EnemyBase {
    EnemyBase {
        id,
        coord: spawn,
        orientation: Direction::Down,
        alive: true,
        state: EnemyVisibleState::Walking,
    }
}

#[derive(Debug, Clone)]
struct EnemyBase {
    id: CharacterId,
    coord: Coord,
    orientation: Direction,
    alive: bool,
    state: EnemyVisibleState,
}

macro_rules! impl_character_for_base {
    ($t:ty) => {
        impl Character for $t {
            fn id(&self) -> CharacterId {
                self.base.id
            }
            fn coord(&self) -> Coord {
                self.base.coord
            }
            fn set_coord(&mut self, coord: Coord) {
                self.base.coord = coord;
            }
            fn orientation(&self) -> Direction {
                self.base.orientation
            }
            fn set_orientation(&mut self, dir: Direction) {
                self.base.orientation = dir;
            }
            fn is_alive(&self) -> bool {
                self.base.alive
            }
            fn set_alive(&mut self, alive: bool) {
                self.base.alive = alive;
            }
            fn kill(&self) -> bool {
                true
            }
        }
    };
}

/// Persistent-direction mover: keeps walking in its current orientation
/// until a move fails, then retries the other three directions in random
/// order until one succeeds or all fail.
#[derive(Debug, Clone)]
pub struct Troll {
    base: EnemyBase,
}

impl Troll {
    pub fn new(id: CharacterId, spawn: Coord) -> Self {
        Self { base: base(id, spawn) }
    }
}

impl_character_for_base!(Troll);

impl Enemy for Troll {
    fn kind(&self) -> EnemyKind {
        EnemyKind::Troll
    }
    fn state(&self) -> EnemyVisibleState {
        self.base.state
    }
    fn set_state(&mut self, state: EnemyVisibleState) {
        self.base.state = state;
    }
    fn can_break_frozen(&self) -> bool {
        false
    }

    fn calculate_movement(&mut self, ctx: &EnemyTickContext, try_step: &mut dyn FnMut(Direction) -> bool) {
        if try_step(self.orientation()) {
            self.set_state(EnemyVisibleState::Walking);
            return;
        }
        for dir in ctx.retry_order {
            if try_step(dir) {
                self.set_state(EnemyVisibleState::Walking);
                return;
            }
        }
        self.set_state(EnemyVisibleState::Stopped);
    }
}

/// Chases the nearer alive player along the shortest walkable path.
#[derive(Debug, Clone)]
pub struct Cow {
    base: EnemyBase,
}

impl Cow {
    pub fn new(id: CharacterId, spawn: Coord) -> Self {
        Self { base: base(id, spawn) }
    }
}

impl_character_for_base!(Cow);

impl Enemy for Cow {
    fn kind(&self) -> EnemyKind {
        EnemyKind::Cow
    }
    fn state(&self) -> EnemyVisibleState {
        self.base.state
    }
    fn set_state(&mut self, state: EnemyVisibleState) {
        self.base.state = state;
    }
    fn can_break_frozen(&self) -> bool {
        false
    }

    fn calculate_movement(&mut self, ctx: &EnemyTickContext, try_step: &mut dyn FnMut(Direction) -> bool) {
        // No path to either player: fall back to the current orientation
        // and move one step rather than freezing in place.
        let dir = ctx.best_direction.unwrap_or_else(|| self.orientation());
        if try_step(dir) {
            self.set_state(EnemyVisibleState::Walking);
        } else {
            self.set_state(EnemyVisibleState::Stopped);
        }
    }
}

/// Rolls several cells in a single tick along the axis-aligned prefix of
/// its path to the nearer player, stopping early the first time a step
/// fails.
#[derive(Debug, Clone)]
pub struct LogMan {
    base: EnemyBase,
}

impl LogMan {
    pub fn new(id: CharacterId, spawn: Coord) -> Self {
        Self { base: base(id, spawn) }
    }
}

impl_character_for_base!(LogMan);

impl Enemy for LogMan {
    fn kind(&self) -> EnemyKind {
        EnemyKind::LogMan
    }
    fn state(&self) -> EnemyVisibleState {
        self.base.state
    }
    fn set_state(&mut self, state: EnemyVisibleState) {
        self.base.state = state;
    }
    fn can_break_frozen(&self) -> bool {
        false
    }

    fn calculate_movement(&mut self, ctx: &EnemyTickContext, try_step: &mut dyn FnMut(Direction) -> bool) {
        self.set_state(EnemyVisibleState::Rolling);
        // No path to either player: use the current orientation once
        // instead of the path's axis-aligned prefix.
        let fallback = [self.orientation()];
        let run: &[Direction] = if ctx.straight_run.is_empty() { &fallback } else { &ctx.straight_run };
        for &dir in run {
            if !try_step(dir) {
                break;
            }
        }
        if self.is_alive() {
            self.set_state(EnemyVisibleState::Stopped);
        }
    }
}

/// Unfreezes the cells around it, then chases like `Cow` but may cross
/// frozen cells.
#[derive(Debug, Clone)]
pub struct SquidGreen {
    base: EnemyBase,
}

impl SquidGreen {
    pub fn new(id: CharacterId, spawn: Coord) -> Self {
        Self { base: base(id, spawn) }
    }
}

impl_character_for_base!(SquidGreen);

impl Enemy for SquidGreen {
    fn kind(&self) -> EnemyKind {
        EnemyKind::SquidGreen
    }
    fn state(&self) -> EnemyVisibleState {
        self.base.state
    }
    fn set_state(&mut self, state: EnemyVisibleState) {
        self.base.state = state;
    }
    fn can_break_frozen(&self) -> bool {
        true
    }
    fn power_before_move(&self) -> Option<PowerKind> {
        Some(PowerKind::Unfreeze)
    }

    fn calculate_movement(&mut self, ctx: &EnemyTickContext, try_step: &mut dyn FnMut(Direction) -> bool) {
        match ctx.best_direction {
            Some(dir) if try_step(dir) => self.set_state(EnemyVisibleState::Walking),
            _ => self.set_state(EnemyVisibleState::Stopped),
        }
    }
}

/// Freezes the cells around it, then chases like `Cow` but may cross
/// frozen cells.
#[derive(Debug, Clone)]
pub struct SquidBlue {
    base: EnemyBase,
}

impl SquidBlue {
    pub fn new(id: CharacterId, spawn: Coord) -> Self {
        Self { base: base(id, spawn) }
    }
}

impl_character_for_base!(SquidBlue);

impl Enemy for SquidBlue {
    fn kind(&self) -> EnemyKind {
        EnemyKind::SquidBlue
    }
    fn state(&self) -> EnemyVisibleState {
        self.base.state
    }
    fn set_state(&mut self, state: EnemyVisibleState) {
        self.base.state = state;
    }
    fn can_break_frozen(&self) -> bool {
        true
    }
    fn power_before_move(&self) -> Option<PowerKind> {
        Some(PowerKind::Freeze)
    }

    fn calculate_movement(&mut self, ctx: &EnemyTickContext, try_step: &mut dyn FnMut(Direction) -> bool) {
        match ctx.best_direction {
            Some(dir) if try_step(dir) => self.set_state(EnemyVisibleState::Walking),
            _ => self.set_state(EnemyVisibleState::Stopped),
        }
    }
}

pub fn spawn_enemy(kind: EnemyKind, id: CharacterId, spawn: Coord) -> Box<dyn Enemy> {
    match kind {
        EnemyKind::Troll => Box::new(Troll::new(id, spawn)),
        EnemyKind::Cow => Box::new(Cow::new(id, spawn)),
        EnemyKind::LogMan => Box::new(LogMan::new(id, spawn)),
        EnemyKind::SquidGreen => Box::new(SquidGreen::new(id, spawn)),
        EnemyKind::SquidBlue => Box::new(SquidBlue::new(id, spawn)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn troll_retries_other_directions_on_failure() {
        let mut troll = Troll::new(CharacterId::new(), Coord::new(5, 5));
        troll.set_orientation(Direction::Up);
        let ctx = EnemyTickContext::build(Direction::Up, None, Vec::new());
        let mut attempts = Vec::new();
        let mut try_step = |dir: Direction| -> bool {
            attempts.push(dir);
            dir == Direction::Right
        };
        troll.calculate_movement(&ctx, &mut try_step);
        assert_eq!(attempts[0], Direction::Up);
        assert!(attempts.contains(&Direction::Right));
        assert_eq!(troll.state(), EnemyVisibleState::Walking);
    }

    #[test]
    fn troll_stops_when_every_direction_fails() {
        let mut troll = Troll::new(CharacterId::new(), Coord::new(5, 5));
        let ctx = EnemyTickContext::build(Direction::Up, None, Vec::new());
        let mut try_step = |_: Direction| false;
        troll.calculate_movement(&ctx, &mut try_step);
        assert_eq!(troll.state(), EnemyVisibleState::Stopped);
    }

    #[test]
    fn cow_follows_best_direction() {
        let mut cow = Cow::new(CharacterId::new(), Coord::new(5, 5));
        let ctx = EnemyTickContext::build(Direction::Down, Some(Direction::Left), Vec::new());
        let mut try_step = |dir: Direction| dir == Direction::Left;
        cow.calculate_movement(&ctx, &mut try_step);
        assert_eq!(cow.state(), EnemyVisibleState::Walking);
    }

    #[test]
    fn cow_falls_back_to_orientation_when_no_path() {
        let mut cow = Cow::new(CharacterId::new(), Coord::new(5, 5));
        cow.set_orientation(Direction::Up);
        let ctx = EnemyTickContext::build(Direction::Up, None, Vec::new());
        let mut attempted = None;
        let mut try_step = |dir: Direction| {
            attempted = Some(dir);
            true
        };
        cow.calculate_movement(&ctx, &mut try_step);
        assert_eq!(attempted, Some(Direction::Up));
        assert_eq!(cow.state(), EnemyVisibleState::Walking);
    }

    #[test]
    fn logman_falls_back_to_orientation_once_when_no_path() {
        let mut logman = LogMan::new(CharacterId::new(), Coord::new(0, 0));
        logman.set_orientation(Direction::Left);
        let ctx = EnemyTickContext::build(Direction::Left, None, Vec::new());
        let mut attempts = Vec::new();
        let mut try_step = |dir: Direction| {
            attempts.push(dir);
            true
        };
        logman.calculate_movement(&ctx, &mut try_step);
        assert_eq!(attempts, vec![Direction::Left]);
    }

    #[test]
    fn logman_rolls_the_full_straight_run() {
        let mut logman = LogMan::new(CharacterId::new(), Coord::new(0, 0));
        let run = vec![Direction::Right, Direction::Right, Direction::Right];
        let ctx = EnemyTickContext::build(Direction::Right, Some(Direction::Right), run);
        let mut steps = 0;
        let mut try_step = |_: Direction| {
            steps += 1;
            true
        };
        logman.calculate_movement(&ctx, &mut try_step);
        assert_eq!(steps, 3);
    }

    #[test]
    fn logman_stops_after_a_failed_step() {
        let mut logman = LogMan::new(CharacterId::new(), Coord::new(0, 0));
        let run = vec![Direction::Right, Direction::Right];
        let ctx = EnemyTickContext::build(Direction::Right, Some(Direction::Right), run);
        let mut count = 0;
        let mut try_step = |_: Direction| {
            count += 1;
            count == 1
        };
        logman.calculate_movement(&ctx, &mut try_step);
        assert_eq!(count, 2);
        assert_eq!(logman.state(), EnemyVisibleState::Stopped);
    }

    #[test]
    fn squids_report_their_power_and_break_frozen() {
        let green = SquidGreen::new(CharacterId::new(), Coord::new(0, 0));
        let blue = SquidBlue::new(CharacterId::new(), Coord::new(0, 0));
        assert_eq!(green.power_before_move(), Some(PowerKind::Unfreeze));
        assert_eq!(blue.power_before_move(), Some(PowerKind::Freeze));
        assert!(green.can_break_frozen());
        assert!(blue.can_break_frozen());
    }

    #[test]
    fn all_enemies_are_killable() {
        let troll = Troll::new(CharacterId::new(), Coord::new(0, 0));
        assert!(troll.kill());
    }
}
