use super::Character;
use arena_protocol::ids::{CharacterId, Coord, Direction};
use arena_protocol::messages::PlayerStatus;

/// The host or guest avatar. Movement, power execution and kill resolution
/// are board-level operations (they need to see the occupant of the target
/// cell and the other player), so `Player` itself is just the state a
/// `Board` drives through those operations.
#[derive(Debug, Clone)]
pub struct Player {
    id: CharacterId,
    coord: Coord,
    orientation: Direction,
    alive: bool,
    color: String,
    name: String,
    status: PlayerStatus,
}

impl Player {
    pub fn new(id: CharacterId, spawn: Coord, name: impl Into<String>) -> Self {
        Self {
            id,
            coord: spawn,
            orientation: Direction::Down,
            alive: true,
            color: "default".to_owned(),
            name: name.into(),
            status: PlayerStatus::Waiting,
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn set_status(&mut self, status: PlayerStatus) {
        self.status = status;
    }
}

impl Character for Player {
    fn id(&self) -> CharacterId {
        self.id
    }

    fn coord(&self) -> Coord {
        self.coord
    }

    fn set_coord(&mut self, coord: Coord) {
        self.coord = coord;
    }

    fn orientation(&self) -> Direction {
        self.orientation
    }

    fn set_orientation(&mut self, dir: Direction) {
        self.orientation = dir;
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
    }

    fn kill(&self) -> bool {
        false
    }

    fn reborn(&mut self) {
        self.alive = true;
        self.status = PlayerStatus::Playing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_spawns_alive_and_waiting() {
        let p = Player::new(CharacterId::new(), Coord::new(1, 1), "host");
        assert!(p.is_alive());
        assert_eq!(p.status(), PlayerStatus::Waiting);
        assert!(!p.kill());
    }

    #[test]
    fn reborn_resets_alive_and_status() {
        let mut p = Player::new(CharacterId::new(), Coord::new(1, 1), "host");
        p.set_alive(false);
        p.reborn();
        assert!(p.is_alive());
        assert_eq!(p.status(), PlayerStatus::Playing);
    }
}
