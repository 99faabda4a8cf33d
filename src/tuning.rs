//! Gameplay tuning
//!
//! Every constant the state machines read lives here so a host can rebalance a
//! match from JSON without touching the simulation. Missing fields keep their
//! defaults.

use serde::{Deserialize, Serialize};

use crate::consts::{GAUGE, TURN_RATE};
use crate::error::SimError;

/// Ball physics and interaction windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallTuning {
    /// Resting height of the ball's center above the pitch
    pub default_height: f32,
    /// Vertical deceleration (scaled by 10 during integration)
    pub gravity: f32,
    /// Below this planar speed the ball stops; below this rebound speed it settles
    pub min_speed: f32,
    /// Planar speed lost per second while rolling
    pub ground_friction: f32,
    /// Planar speed lost on every ground contact
    pub ground_hit_slowdown: f32,
    /// Fraction of vertical speed lost on every bounce
    pub restitution_loss: f32,
    /// Grace window after a possession change during which the ball is loose (seconds)
    pub loose_ball_grace: f64,
    /// Interaction lock after a shot (seconds)
    pub shot_interaction_lock: f64,
    /// Interaction lock after a slide tackle (seconds)
    pub slide_interaction_lock: f64,
    pub turn_rate: f32,
}

impl Default for BallTuning {
    fn default() -> Self {
        Self {
            default_height: GAUGE * 10.0,
            gravity: GAUGE * 2.3,
            min_speed: GAUGE,
            ground_friction: 0.05,
            ground_hit_slowdown: 0.02,
            restitution_loss: 0.3,
            loose_ball_grace: 0.1,
            shot_interaction_lock: 0.7,
            slide_interaction_lock: 0.45,
            turn_rate: TURN_RATE,
        }
    }
}

/// Per-player constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Reach above the player's current height within which the ball can be controlled
    pub tallness: f32,
    pub running_speed: f32,
    /// Running speed while holding the ball
    pub possession_running_speed: f32,
    pub gravity: f32,
    /// Grounded height
    pub default_height: f32,
    pub jump_cooldown: f64,
    pub pass_cooldown: f64,
    /// Length of the fast phase of a slide (seconds)
    pub slide_duration: f64,
    /// Length of the slow recovery after the fast phase (seconds)
    pub slide_slowdown_duration: f64,
    pub slide_speed: f32,
    pub slide_slowdown_speed: f32,
    /// Maximum distance between possession anchor and ball for control
    pub possession_range: f32,
    /// Distance of the possession anchor in front of the player
    pub possession_offset: f32,
    /// Repossession lock after losing the ball to a tackle or contest (seconds)
    pub dispossess_lock: f64,
    /// Repossession lock after shooting (seconds)
    pub shot_lock: f64,
    /// Slowdown applied to a tackled player (seconds)
    pub tackled_slowdown: f64,
    /// Cooldown configured on the generic slowdown key at creation (seconds)
    pub default_slowdown: f64,
    pub turn_rate: f32,
}

impl PlayerTuning {
    /// Full slide cycle: fast phase plus recovery
    pub fn slide_cooldown(&self) -> f64 {
        self.slide_duration + self.slide_slowdown_duration
    }
}

impl Default for PlayerTuning {
    fn default() -> Self {
        let running_speed = GAUGE * 290.0;
        Self {
            tallness: GAUGE * 100.0,
            running_speed,
            possession_running_speed: GAUGE * 200.0,
            gravity: GAUGE * 2.3,
            default_height: GAUGE * 0.01,
            jump_cooldown: 3.0,
            pass_cooldown: 2.0,
            slide_duration: 0.7,
            slide_slowdown_duration: 1.8,
            slide_speed: GAUGE * 400.0,
            slide_slowdown_speed: 0.5 * running_speed,
            possession_range: GAUGE * 100.0,
            possession_offset: GAUGE * 60.0,
            dispossess_lock: 1.45,
            shot_lock: 0.9,
            tackled_slowdown: 0.95,
            default_slowdown: 1.0,
            turn_rate: TURN_RATE,
        }
    }
}

/// Complete match tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchTuning {
    pub ball: BallTuning,
    pub player: PlayerTuning,
    /// Planar speed of a driver-level pass
    pub pass_speed: f32,
    /// Reach of a fast slide against an opposing ball carrier
    pub tackle_range: f32,
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            ball: BallTuning::default(),
            player: PlayerTuning::default(),
            pass_speed: GAUGE * 500.0,
            tackle_range: GAUGE * 100.0,
        }
    }
}

impl MatchTuning {
    /// Parse tuning overrides; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let tuning = serde_json::from_str(json)?;
        log::info!("Loaded match tuning overrides");
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_gauge() {
        let tuning = MatchTuning::default();
        assert!((tuning.player.possession_range - 1.0).abs() < 1e-6);
        assert!((tuning.ball.default_height - 0.1).abs() < 1e-6);
        assert!((tuning.player.slide_cooldown() - 2.5).abs() < 1e-9);
        assert!(
            (tuning.player.slide_slowdown_speed - tuning.player.running_speed / 2.0).abs() < 1e-6
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning =
            MatchTuning::from_json(r#"{ "player": { "jump_cooldown": 1.5 }, "pass_speed": 7.0 }"#)
                .unwrap();
        assert_eq!(tuning.player.jump_cooldown, 1.5);
        assert_eq!(tuning.pass_speed, 7.0);
        assert_eq!(tuning.player.pass_cooldown, 2.0);
        assert_eq!(tuning.ball, BallTuning::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = MatchTuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_json_round_trip() {
        let tuning = MatchTuning::default();
        let json = tuning.to_json().unwrap();
        assert_eq!(MatchTuning::from_json(&json).unwrap(), tuning);
    }
}
