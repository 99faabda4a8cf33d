//! Ball mutations requested by players
//!
//! A player never touches the ball directly. Its possession-changing actions
//! return the commands below and the match state applies them to the ball, so
//! every ownership change goes through one place and can be logged or replayed.

use serde::{Deserialize, Serialize};

use super::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallCommand {
    /// New owner, `None` releases the ball
    PossessionChange { owner: Option<PlayerId> },
    /// Nobody may gain possession for `duration` seconds
    InteractionLock { duration: f64 },
    /// Launch along `angle` with the given planar and vertical speeds
    Kick {
        speed: f32,
        vertical_speed: f32,
        angle: f32,
    },
}
