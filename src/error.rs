//! Simulation errors
//!
//! Everything here is an invariant violation: a match instance that returns one
//! is in a state the simulation cannot reason about and should be discarded.
//! "No answer" cases such as an ineligible player are not errors, see
//! [`crate::sim::Eligibility`].

use thiserror::Error;

use crate::sim::PlayerId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("clock moved backwards: current time {current}, requested {requested}")]
    ClockWentBackwards { current: f64, requested: f64 },

    #[error("player {player} has_ball={has_ball} but ball owner is {ball_owner:?}")]
    OwnershipMismatch {
        player: PlayerId,
        has_ball: bool,
        ball_owner: Option<PlayerId>,
    },

    #[error("player {player} does not own the ball (owner: {ball_owner:?})")]
    NotBallOwner {
        player: PlayerId,
        ball_owner: Option<PlayerId>,
    },

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("duplicate player id {0}")]
    DuplicatePlayer(PlayerId),

    #[error("player {0} cannot slide while holding the ball")]
    SlideWithBall(PlayerId),

    #[error("snapshot mismatch: expected {expected}, found {found}")]
    SnapshotMismatch { expected: String, found: String },

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl SimError {
    /// True for errors raised before any state was mutated, so the match can keep running
    pub fn is_recoverable(&self) -> bool {
        match self {
            SimError::UnknownPlayer(_) => true,
            SimError::SlideWithBall(_) => true,
            SimError::Config(_) => true,
            SimError::SnapshotMismatch { .. } => true,
            SimError::ClockWentBackwards { .. } => false,
            SimError::OwnershipMismatch { .. } => false,
            SimError::NotBallOwner { .. } => false,
            SimError::DuplicatePlayer(_) => false,
        }
    }
}
