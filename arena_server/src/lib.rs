//! The authoritative match runtime for a two-player cooperative arena game
//! (spec.md). Owns grid topology, character state, enemy AI, match timing
//! and event fan-out; everything around it — transport, matchmaking,
//! authentication, persistence — is modeled here only as the collaborator
//! traits in `collaborators` and lives outside this crate.

pub mod board;
pub mod character;
pub mod collaborators;
pub mod config;
pub mod grid;
pub mod graph;
pub mod match_engine;
pub mod session;
pub mod snapshot;

pub use board::Board;
pub use config::Config;
pub use match_engine::{MatchCommand, MatchHandle, PlayerMessage, PlayerOp};
pub use session::SessionRouter;
