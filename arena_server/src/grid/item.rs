//! Board items. A closed enum stands in for the source's item class
//! hierarchy (Design Notes "Polymorphism": `BoardItem: blocked, pick,
//! getDTO` with variants `{Fruit, SpecialFruit, Rock}`).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FruitKind(pub String);

impl fmt::Display for FruitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Fruit(FruitKind),
    SpecialFruit,
    Rock,
}

impl Item {
    /// Rocks block freeze and traversal; fruits and the special fruit do
    /// not.
    pub fn blocks(&self) -> bool {
        matches!(self, Item::Rock)
    }

    pub fn is_fruit(&self) -> bool {
        matches!(self, Item::Fruit(_))
    }
}
