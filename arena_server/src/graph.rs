//! Graph snapshot and single-pair shortest path over walkable cells
//! (spec.md §4.2).
//!
//! The graph is rebuilt from the current `Grid` on every query rather than
//! incrementally maintained — at 256 cells this is cheap, and it avoids a
//! whole class of staleness bugs an incrementally-updated graph would
//! invite. Nodes are cells identified by `Coord`; spec.md's "x,y" string
//! node ids are available via `Coord::to_string` for anything that needs to
//! render them, but internal traversal stays on the cheaper `Coord`/array
//! index representation.

use crate::grid::{Grid, CELL_COUNT};
use arena_protocol::ids::{Coord, Direction};
use arena_protocol::CharacterId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// The two traversal flags spec.md's graph construction takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkPolicy {
    pub can_break_frozen: bool,
    pub can_walk_over_players: bool,
}

impl WalkPolicy {
    pub const fn enemy_default() -> Self {
        Self {
            can_break_frozen: false,
            can_walk_over_players: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    walkable: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResult {
    pub distance: Option<u32>,
    pub path: Vec<Coord>,
}

impl PathResult {
    pub fn unreachable() -> Self {
        Self {
            distance: None,
            path: Vec::new(),
        }
    }

    /// Direction of the first hop, or `None` for a zero-length or
    /// unreachable path.
    pub fn first_step(&self) -> Option<Direction> {
        let [from, to, ..] = self.path[..] else {
            return None;
        };
        for dir in Direction::ALL {
            if from.stepped(dir) == Some(to) {
                return Some(dir);
            }
        }
        None
    }
}

impl Graph {
    /// Build a walkability snapshot. `is_killable` answers, for an occupied
    /// cell's character, whether it is the kind of character a player can
    /// kill by walking over it (enemies: yes, players: no) — it is only
    /// consulted when `can_walk_over_players` is false.
    pub fn build(
        grid: &Grid,
        policy: WalkPolicy,
        is_killable: impl Fn(CharacterId) -> bool,
    ) -> Self {
        let mut walkable = vec![false; CELL_COUNT];
        for (coord, cell) in grid.iter() {
            if cell.blocked() {
                continue;
            }
            if cell.frozen && !policy.can_break_frozen {
                continue;
            }
            if let Some(occupant) = cell.character {
                if !policy.can_walk_over_players && !is_killable(occupant) {
                    continue;
                }
            }
            walkable[coord.index()] = true;
        }
        Self { walkable }
    }

    pub fn is_walkable(&self, coord: Coord) -> bool {
        self.walkable[coord.index()]
    }

    /// Dijkstra with uniform edge weight 1, ties on the priority queue
    /// broken by insertion order via a monotonic sequence counter. Weight
    /// is kept as an implicit parameter (always 1 today) per spec.md's note
    /// that it is "kept as a parameter for future extensions".
    pub fn shortest_path(&self, source: Coord, target: Coord) -> PathResult {
        if !self.is_walkable(source) || !self.is_walkable(target) {
            return PathResult::unreachable();
        }
        if source == target {
            return PathResult {
                distance: Some(0),
                path: vec![source],
            };
        }

        let mut dist = vec![u32::MAX; CELL_COUNT];
        let mut prev: Vec<Option<Coord>> = vec![None; CELL_COUNT];
        let mut heap: BinaryHeap<Reverse<(u32, u64, Coord)>> = BinaryHeap::new();
        let mut seq: u64 = 0;

        dist[source.index()] = 0;
        heap.push(Reverse((0, seq, source)));

        while let Some(Reverse((d, _, coord))) = heap.pop() {
            if d > dist[coord.index()] {
                continue;
            }
            if coord == target {
                break;
            }
            for dir in Direction::ALL {
                let Some(next) = coord.stepped(dir) else {
                    continue;
                };
                if !self.is_walkable(next) {
                    continue;
                }
                let nd = d + 1;
                if nd < dist[next.index()] {
                    dist[next.index()] = nd;
                    prev[next.index()] = Some(coord);
                    seq += 1;
                    heap.push(Reverse((nd, seq, next)));
                }
            }
        }

        if dist[target.index()] == u32::MAX {
            return PathResult::unreachable();
        }

        let mut path = vec![target];
        let mut cur = target;
        while let Some(p) = prev[cur.index()] {
            path.push(p);
            cur = p;
        }
        path.reverse();

        PathResult {
            distance: Some(dist[target.index()]),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Item;

    fn coord(x: i8, y: i8) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn straight_line_distance_matches_manhattan() {
        let grid = Grid::new();
        let graph = Graph::build(&grid, WalkPolicy::enemy_default(), |_| true);
        let result = graph.shortest_path(coord(0, 0), coord(3, 0));
        assert_eq!(result.distance, Some(3));
        assert_eq!(result.path.first(), Some(&coord(0, 0)));
        assert_eq!(result.path.last(), Some(&coord(3, 0)));
        for pair in result.path.windows(2) {
            let [a, b] = pair else { unreachable!() };
            assert!(Direction::ALL.iter().any(|d| a.stepped(*d) == Some(*b)));
        }
        assert_eq!(result.path.len() as u32, result.distance.unwrap() + 1);
    }

    #[test]
    fn rock_wall_makes_target_unreachable() {
        let mut grid = Grid::new();
        for y in 0..16 {
            grid.place_item(coord(5, y), Item::Rock);
        }
        let graph = Graph::build(&grid, WalkPolicy::enemy_default(), |_| true);
        let result = graph.shortest_path(coord(0, 0), coord(10, 0));
        assert_eq!(result.distance, None);
        assert!(result.path.is_empty());
    }

    #[test]
    fn frozen_cell_blocks_unless_can_break_frozen() {
        let mut grid = Grid::new();
        for y in 0..16 {
            if y != 8 {
                grid.set_frozen(coord(5, y), true);
            }
        }
        grid.set_frozen(coord(5, 8), true);
        let policy = WalkPolicy {
            can_break_frozen: false,
            can_walk_over_players: false,
        };
        let graph = Graph::build(&grid, policy, |_| true);
        assert_eq!(graph.shortest_path(coord(0, 0), coord(10, 0)).distance, None);

        let breaker = WalkPolicy {
            can_break_frozen: true,
            can_walk_over_players: false,
        };
        let graph = Graph::build(&grid, breaker, |_| true);
        assert!(graph.shortest_path(coord(0, 0), coord(10, 0)).distance.is_some());
    }
}
