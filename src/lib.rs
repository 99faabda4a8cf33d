//! Pitch Sim - authoritative gameplay core for a multiplayer soccer match
//!
//! Core modules:
//! - `sim`: Timer-driven ball and player state machines plus the tick driver
//! - `tuning`: Data-driven gameplay constants
//! - `error`: Invariant violations surfaced at step boundaries
//!
//! Rendering, input capture and networking live outside this crate. They read
//! entity state (or a [`sim::MatchSnapshot`]) and drive it through
//! [`sim::TickInput`].

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::SimError;
pub use tuning::{BallTuning, MatchTuning, PlayerTuning};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep used by the headless driver (60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;

    /// World scale unit; every distance and speed in [`crate::tuning`] is a multiple of it
    pub const GAUGE: f32 = 0.01;

    /// Default turn rate for players and the ball (radians per unit of speed per second)
    pub const TURN_RATE: f32 = 4.0 * std::f32::consts::PI;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Signed shortest rotation taking `from` onto `to`, in [-π, π)
#[inline]
pub fn shortest_turn(from: f32, to: f32) -> f32 {
    normalize_angle(normalize_angle(to) - normalize_angle(from))
}

/// Unit vector on the ground plane for heading `angle`
#[inline]
pub fn planar_direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
