use crate::bomb::FuseOutOfRange;
use crate::roster::RosterError;
use thiserror::Error;
use uuid::Uuid;

/// Why a turn-gated event was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Denied {
    #[error("no game is running")]
    NotRunning,
    #[error("connection {conn} does not hold seat {seat}")]
    NotYourTurn { conn: Uuid, seat: usize },
}

/// Reasons an inbound event is dropped. None of these reach the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Denied(#[from] Denied),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Fuse(#[from] FuseOutOfRange),
    #[error("no room has been created")]
    NoRoom,
    #[error("a game is already running")]
    GameInProgress,
    #[error("seat {0} is not occupied")]
    SeatOutOfRange(usize),
    #[error("seat {0} cannot face itself")]
    SameSeat(usize),
    #[error("the hot potato is not armed")]
    BombIdle,
    #[error("invalid payload: {0}")]
    InvalidPayload(&'static str),
}
