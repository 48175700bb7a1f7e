use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const GRID_SIZE: i8 = 16;

/// User identity as handed to us by the matchmaking/auth collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// Identity of a running match, assigned by the matchmaking collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(pub Uuid);

/// Identity of a single character (player or enemy) within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tile coordinate on the 16x16 board. `x`/`y` are kept signed so
/// neighbor arithmetic (`x - 1`) can be checked against the grid bounds
/// without wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: i8,
    pub y: i8,
}

impl Coord {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(self) -> bool {
        (0..GRID_SIZE).contains(&self.x) && (0..GRID_SIZE).contains(&self.y)
    }

    /// Row-major index into a flattened 16x16 arena. Panics if out of bounds;
    /// callers are expected to check `in_bounds` first (all internal callers
    /// do, since the grid only ever hands out in-bounds coordinates).
    pub fn index(self) -> usize {
        debug_assert!(self.in_bounds());
        self.y as usize * GRID_SIZE as usize + self.x as usize
    }

    pub fn from_index(idx: usize) -> Self {
        let size = GRID_SIZE as usize;
        Coord::new((idx % size) as i8, (idx / size) as i8)
    }

    pub fn stepped(self, dir: Direction) -> Option<Coord> {
        let (dx, dy) = dir.delta();
        let next = Coord::new(self.x + dx, self.y + dy);
        next.in_bounds().then_some(next)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i8, i8) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// The other three directions, used by the troll's retry policy.
    pub fn others(self) -> [Direction; 3] {
        let mut out = [Direction::Up; 3];
        let mut i = 0;
        for d in Direction::ALL {
            if d != self {
                out[i] = d;
                i += 1;
            }
        }
        out
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_index_round_trips() {
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                let c = Coord::new(x, y);
                assert_eq!(Coord::from_index(c.index()), c);
            }
        }
    }

    #[test]
    fn edge_neighbor_is_absent() {
        let corner = Coord::new(0, 0);
        assert_eq!(corner.stepped(Direction::Up), None);
        assert_eq!(corner.stepped(Direction::Left), None);
        assert_eq!(corner.stepped(Direction::Right), Some(Coord::new(1, 0)));
    }

    #[test]
    fn opposite_is_involution() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
    }
}
