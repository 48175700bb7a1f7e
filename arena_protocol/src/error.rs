use crate::ids::{MatchId, UserId};
use thiserror::Error;

/// Crate-wide error kinds. Most variants map directly onto an outbound
/// `error` envelope and never tear down the match; a few are fatal to the
/// owning match and stop its tickers (see `is_fatal_to_match`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("move target is off the grid")]
    NullCell,

    #[error("move target is blocked, frozen, or occupied")]
    BlockedCell,

    #[error("unrecognized inbound message type")]
    InvalidMessageType,

    #[error("movement payload was not a valid direction")]
    InvalidMove,

    #[error("rotate payload was not a valid direction")]
    InvalidRotation,

    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    #[error("player {0} not found")]
    PlayerNotFound(UserId),

    #[error("outbound channel for {0} is not open")]
    SocketClosed(UserId),

    #[error("match {0} has already started")]
    MatchAlreadyStarted(MatchId),

    #[error("board queried before players were set up")]
    UserNotDefined,

    #[error("internal command channel closed")]
    ChannelClosed,
}

impl Error {
    /// Corresponds to spec.md's per-kind "surfaced how" column. Kinds not
    /// listed here are recoverable: the handler replies with an `error`
    /// envelope (or silently drops an outbound message) and the match
    /// keeps running.
    pub fn is_fatal_to_match(&self) -> bool {
        matches!(self, Error::UserNotDefined)
    }

    /// The literal string the outbound `error` envelope carries. Most kinds
    /// use the wording spec.md's scenarios spell out verbatim (S2: "Invalid
    /// move"); unrecognized/malformed inbound messages get "Bad Request".
    pub fn outbound_message(&self) -> &'static str {
        match self {
            Error::NullCell | Error::BlockedCell => "Invalid move",
            Error::InvalidMessageType | Error::InvalidMove | Error::InvalidRotation => {
                "Bad Request"
            }
            Error::MatchNotFound(_) => "Match not found",
            Error::PlayerNotFound(_) => "Player not found",
            Error::SocketClosed(_) => "Socket closed",
            Error::MatchAlreadyStarted(_) => "Match already started",
            Error::UserNotDefined => "Internal error",
            Error::ChannelClosed => "Internal error",
        }
    }
}
