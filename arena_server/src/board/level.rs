//! Level data table (spec.md §4.3, Design Notes "Level differences become
//! data"). Three levels are supplied, matching the scenarios in §8 and the
//! Level 3 LogMan speed override named in §4.5.

use crate::character::EnemyKind;
use crate::grid::FruitKind;
use arena_protocol::ids::Coord;

pub struct Level {
    pub number: u32,
    pub map: &'static str,
    pub rocks: &'static [Coord],
    pub pre_frozen: &'static [Coord],
    pub player_spawns: [Coord; 2],
    pub enemy_spawns: &'static [(EnemyKind, Coord)],
    pub fruit_spawns: &'static [Coord],
    pub special_fruit_spawn: Option<Coord>,
    pub fruit_queue: &'static [&'static str],
    pub enemy_tick_base_ms: u64,
    pub enemy_tick_overrides: &'static [(EnemyKind, u64)],
}

impl Level {
    pub fn enemy_tick_ms(&self, kind: EnemyKind) -> u64 {
        self.enemy_tick_overrides
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, ms)| *ms)
            .unwrap_or(self.enemy_tick_base_ms)
    }

    pub fn fruit_queue(&self) -> Vec<FruitKind> {
        self.fruit_queue.iter().map(|s| FruitKind((*s).to_owned())).collect()
    }

    pub fn by_number(number: u32) -> &'static Level {
        match number {
            1 => &LEVEL_1,
            2 => &LEVEL_2,
            _ => &LEVEL_3,
        }
    }
}

pub static LEVEL_1: Level = Level {
    number: 1,
    map: "icefield",
    rocks: &[Coord::new(9, 2)],
    pre_frozen: &[],
    player_spawns: [Coord::new(9, 1), Coord::new(6, 1)],
    enemy_spawns: &[(EnemyKind::Cow, Coord::new(2, 14))],
    fruit_spawns: &[Coord::new(3, 3), Coord::new(3, 4), Coord::new(12, 12)],
    special_fruit_spawn: Some(Coord::new(12, 3)),
    fruit_queue: &["cherry", "banana"],
    enemy_tick_base_ms: 800,
    enemy_tick_overrides: &[],
};

pub static LEVEL_2: Level = Level {
    number: 2,
    map: "glacier",
    rocks: &[Coord::new(5, 5), Coord::new(5, 6), Coord::new(5, 7)],
    pre_frozen: &[Coord::new(1, 1)],
    player_spawns: [Coord::new(9, 1), Coord::new(6, 1)],
    enemy_spawns: &[
        (EnemyKind::Troll, Coord::new(2, 4)),
        (EnemyKind::SquidGreen, Coord::new(13, 2)),
    ],
    fruit_spawns: &[Coord::new(7, 7), Coord::new(8, 8), Coord::new(9, 9), Coord::new(10, 10)],
    special_fruit_spawn: Some(Coord::new(2, 10)),
    fruit_queue: &["cherry", "banana", "melon"],
    enemy_tick_base_ms: 700,
    enemy_tick_overrides: &[],
};

pub static LEVEL_3: Level = Level {
    number: 3,
    map: "crevasse",
    rocks: &[Coord::new(8, 0), Coord::new(8, 1), Coord::new(8, 2)],
    pre_frozen: &[],
    player_spawns: [Coord::new(1, 8), Coord::new(14, 8)],
    enemy_spawns: &[
        (EnemyKind::LogMan, Coord::new(7, 8)),
        (EnemyKind::SquidBlue, Coord::new(3, 3)),
        (EnemyKind::Troll, Coord::new(12, 12)),
    ],
    fruit_spawns: &[Coord::new(2, 2), Coord::new(13, 13), Coord::new(2, 13), Coord::new(13, 2)],
    special_fruit_spawn: Some(Coord::new(7, 2)),
    fruit_queue: &["cherry", "banana", "melon", "grape"],
    enemy_tick_base_ms: 700,
    enemy_tick_overrides: &[(EnemyKind::LogMan, 1200)],
};
