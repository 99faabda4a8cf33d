//! Ball state machine
//!
//! Ownership, the loose-ball grace window and the interaction lock are timed on
//! the ball's own clock. While free or loose the ball rolls, flies and bounces
//! on its own; while secured by a player the tick driver carries it.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::clock::{ClockKey, ClockState, EventClock};
use super::command::BallCommand;
use super::motion::MotionUnit;
use super::player::PlayerId;
use crate::error::SimError;
use crate::tuning::BallTuning;

/// Timed windows tracked by the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallEvent {
    /// Last possession change; gates the loose-ball grace period
    PossessionBegin,
    /// Last interaction lock
    InteractionLock,
}

impl ClockKey for BallEvent {
    fn index(self) -> usize {
        self as usize
    }
}

pub type BallClock = EventClock<BallEvent, 2>;

/// Ground contact during an idle step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// Hit the ground and rebounded upwards
    Bounced,
    /// Rebound too weak, ball now rolls
    Settled,
}

#[derive(Debug, Clone)]
pub struct Ball {
    pub unit: MotionUnit,
    pub clock: BallClock,
    pub tuning: BallTuning,
    current_owner: Option<PlayerId>,
    pub last_touched: Option<PlayerId>,
    pub is_in_air: bool,
    pub vertical_speed: f32,
    /// Vertical speed the ball last left the ground with; caps the next rebound
    pub launch_speed: f32,
}

/// Every replicated ball field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub unit: MotionUnit,
    pub clock: ClockState,
    pub current_owner: Option<PlayerId>,
    pub last_touched: Option<PlayerId>,
    pub is_in_air: bool,
    pub vertical_speed: f32,
    pub launch_speed: f32,
}

impl Ball {
    /// A resting ball at `spot`, free and interactable, clock started at `start_time`
    pub fn new(tuning: BallTuning, spot: Vec2, start_time: f64) -> Self {
        let mut clock = BallClock::new(start_time);
        clock.set_cooldown(BallEvent::PossessionBegin, tuning.loose_ball_grace);
        clock.set_cooldown(BallEvent::InteractionLock, 0.0);
        clock.expire(BallEvent::InteractionLock);

        let unit = MotionUnit::new(spot.extend(tuning.default_height), tuning.turn_rate);
        Self {
            unit,
            clock,
            tuning,
            current_owner: None,
            last_touched: None,
            is_in_air: false,
            vertical_speed: 0.0,
            launch_speed: 0.0,
        }
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.current_owner
    }

    pub fn position(&self) -> Vec3 {
        self.unit.position
    }

    pub fn reset_height(&mut self) {
        self.unit.set_height(self.tuning.default_height);
    }

    /// Change owner; marks the start of a possession and the last toucher
    pub(crate) fn set_owner(&mut self, new_owner: Option<PlayerId>) {
        if self.current_owner == new_owner {
            return;
        }
        self.current_owner = new_owner;
        if let Some(owner) = new_owner {
            self.clock.mark(BallEvent::PossessionBegin);
            self.last_touched = Some(owner);
        }
    }

    /// Owned, but the possession is too fresh to be secured
    pub fn is_loose(&self) -> bool {
        self.current_owner.is_some() && !self.clock.is_ready(BallEvent::PossessionBegin)
    }

    /// Owned and past the grace window
    pub fn is_secured(&self) -> bool {
        self.current_owner.is_some() && !self.is_loose()
    }

    pub fn disable_interaction(&mut self, duration: f64) {
        self.clock.mark(BallEvent::InteractionLock);
        self.clock.set_cooldown(BallEvent::InteractionLock, duration);
    }

    pub fn can_interact(&self) -> bool {
        self.clock.is_ready(BallEvent::InteractionLock)
    }

    /// Launch the ball. Ownership and interaction lock are separate commands.
    /// A kick without upward speed puts the ball on the ground, wherever it was.
    pub(crate) fn kick(&mut self, speed: f32, vertical_speed: f32, angle: f32) {
        self.unit.face(angle);
        self.unit.facing_direction = angle;
        self.unit.moving_speed = speed;
        if vertical_speed > 0.0 {
            self.is_in_air = true;
            self.vertical_speed = vertical_speed;
            self.launch_speed = vertical_speed;
        } else {
            self.is_in_air = false;
            self.vertical_speed = 0.0;
            self.launch_speed = 0.0;
            self.reset_height();
        }
    }

    pub(crate) fn apply(&mut self, command: &BallCommand) {
        log::debug!("ball <- {command:?}");
        match *command {
            BallCommand::PossessionChange { owner } => self.set_owner(owner),
            BallCommand::InteractionLock { duration } => self.disable_interaction(duration),
            BallCommand::Kick {
                speed,
                vertical_speed,
                angle,
            } => self.kick(speed, vertical_speed, angle),
        }
    }

    /// Free-flight / rolling step for the frame the clock just advanced over
    pub fn idle(&mut self) -> Option<Landing> {
        if self.is_secured() {
            return None;
        }
        let dt = self.clock.frame_delta() as f32;
        let mut landing = None;

        if self.unit.moving_speed < self.tuning.min_speed {
            self.unit.stop();
            self.unit.moving_speed = self.tuning.min_speed;
        } else {
            let ahead = self.unit.point_offset(1.0).truncate();
            self.unit.move_to(ahead);
        }

        if self.is_in_air {
            if self.vertical_speed < 0.0 && self.unit.height() <= self.tuning.default_height {
                self.unit.moving_speed -= self.tuning.ground_hit_slowdown;
                self.reset_height();
                // Discrete steps overshoot the ground; never rebound faster than the last launch
                let impact = self.vertical_speed.abs().min(self.launch_speed);
                if impact < self.tuning.min_speed {
                    self.is_in_air = false;
                    self.vertical_speed = 0.0;
                    self.launch_speed = 0.0;
                    landing = Some(Landing::Settled);
                } else {
                    self.vertical_speed = impact - self.tuning.restitution_loss * impact;
                    self.launch_speed = self.vertical_speed;
                    landing = Some(Landing::Bounced);
                }
            } else {
                self.unit
                    .step_arc(dt, &mut self.vertical_speed, self.tuning.gravity);
            }
        } else {
            self.unit.moving_speed -= self.tuning.ground_friction * dt;
            self.reset_height();
        }

        self.unit.step(dt);
        landing
    }

    pub fn snapshot(&self) -> BallSnapshot {
        BallSnapshot {
            unit: self.unit.clone(),
            clock: self.clock.state(),
            current_owner: self.current_owner,
            last_touched: self.last_touched,
            is_in_air: self.is_in_air,
            vertical_speed: self.vertical_speed,
            launch_speed: self.launch_speed,
        }
    }

    /// Overwrite every replicated field. Ownership consistency with the players
    /// is checked by the match state.
    pub(crate) fn restore(&mut self, snapshot: &BallSnapshot) -> Result<(), SimError> {
        if let Some(slot) = snapshot.clock.first_unmarked() {
            return Err(SimError::SnapshotMismatch {
                expected: "every ball clock slot marked".to_string(),
                found: format!("slot {slot} unmarked"),
            });
        }
        self.clock.restore(&snapshot.clock)?;
        self.unit = snapshot.unit.clone();
        self.current_owner = snapshot.current_owner;
        self.last_touched = snapshot.last_touched;
        self.is_in_air = snapshot.is_in_air;
        self.vertical_speed = snapshot.vertical_speed;
        self.launch_speed = snapshot.launch_speed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 64.0;

    fn ball() -> Ball {
        Ball::new(BallTuning::default(), Vec2::ZERO, 0.0)
    }

    fn advance(ball: &mut Ball, dt: f64) -> Option<Landing> {
        let now = ball.clock.current_time() + dt;
        ball.clock.advance(now).unwrap();
        ball.idle()
    }

    #[test]
    fn test_new_ball_is_free_and_interactable() {
        let ball = ball();
        assert_eq!(ball.owner(), None);
        assert!(!ball.is_loose());
        assert!(ball.can_interact());
        assert!((ball.position().z - ball.tuning.default_height).abs() < 1e-6);
    }

    #[test]
    fn test_set_owner_same_owner_marks_once() {
        let mut ball = ball();
        ball.clock.advance(1.0).unwrap();
        ball.set_owner(Some(PlayerId(3)));
        assert_eq!(ball.clock.last_marked(BallEvent::PossessionBegin), Some(1.0));

        ball.clock.advance(2.0).unwrap();
        ball.set_owner(Some(PlayerId(3)));
        assert_eq!(ball.clock.last_marked(BallEvent::PossessionBegin), Some(1.0));
        assert_eq!(ball.last_touched, Some(PlayerId(3)));
    }

    #[test]
    fn test_release_keeps_last_touched() {
        let mut ball = ball();
        ball.set_owner(Some(PlayerId(1)));
        ball.clock.advance(0.5).unwrap();
        ball.set_owner(None);
        assert_eq!(ball.owner(), None);
        assert_eq!(ball.last_touched, Some(PlayerId(1)));
        // Releasing does not restart the possession window
        assert_eq!(ball.clock.last_marked(BallEvent::PossessionBegin), Some(0.0));
    }

    #[test]
    fn test_loose_window_after_possession_change() {
        let mut ball = ball();
        ball.clock.advance(1.0).unwrap();
        ball.set_owner(Some(PlayerId(0)));
        assert!(ball.is_loose());
        assert!(!ball.is_secured());

        ball.clock.advance(1.0 + 0.0625).unwrap();
        assert!(ball.is_loose());
        ball.clock.advance(1.125).unwrap();
        assert!(!ball.is_loose());
        assert!(ball.is_secured());
    }

    #[test]
    fn test_interaction_lock() {
        let mut ball = ball();
        ball.clock.advance(2.0).unwrap();
        ball.disable_interaction(0.5);
        assert!(!ball.can_interact());
        ball.clock.advance(2.5).unwrap();
        assert!(!ball.can_interact());
        ball.clock.advance(2.5 + DT).unwrap();
        assert!(ball.can_interact());
    }

    #[test]
    fn test_kick_launches_into_air() {
        let mut ball = ball();
        ball.apply(&BallCommand::Kick {
            speed: 3.0,
            vertical_speed: 0.2,
            angle: 1.0,
        });
        assert!(ball.is_in_air);
        assert_eq!(ball.unit.moving_speed, 3.0);
        assert_eq!(ball.unit.facing_direction, 1.0);
        assert_eq!(ball.unit.facing_target, 1.0);

        let mut grounder = self::ball();
        grounder.kick(3.0, 0.0, 0.0);
        assert!(!grounder.is_in_air);
    }

    #[test]
    fn test_flat_kick_grounds_airborne_ball() {
        let mut ball = ball();
        ball.kick(2.0, 0.4, 0.0);
        ball.unit.set_height(0.5);
        ball.vertical_speed = -0.1;

        ball.kick(5.0, 0.0, 1.0);
        assert!(!ball.is_in_air);
        assert_eq!(ball.vertical_speed, 0.0);
        assert_eq!(ball.launch_speed, 0.0);
        assert!((ball.position().z - ball.tuning.default_height).abs() < 1e-6);

        // Rolls from here on, no phantom landing
        assert_eq!(advance(&mut ball, DT), None);
        assert!(!ball.is_in_air);
    }

    #[test]
    fn test_rolling_ball_slows_and_moves_forward() {
        let mut ball = ball();
        ball.kick(1.0, 0.0, 0.0);
        advance(&mut ball, 0.5);
        assert!((ball.unit.moving_speed - (1.0 - 0.05 * 0.5)).abs() < 1e-5);
        assert!(ball.position().x > 0.4);
        assert!(ball.position().y.abs() < 1e-5);
        assert!((ball.position().z - ball.tuning.default_height).abs() < 1e-6);
    }

    #[test]
    fn test_slow_ball_is_pinned_to_min_speed() {
        let mut ball = ball();
        ball.unit.moving_speed = 0.0;
        advance(&mut ball, DT);
        // Pinned to the minimum, then rolling friction for this frame
        let expected = ball.tuning.min_speed - ball.tuning.ground_friction * DT as f32;
        assert!((ball.unit.moving_speed - expected).abs() < 1e-6);
        assert_eq!(ball.position().truncate(), Vec2::ZERO);
    }

    #[test]
    fn test_bounces_damp_and_settle() {
        let mut ball = ball();
        ball.kick(10.0, 5.0, 0.0);

        let mut contacts: Vec<(f32, f32)> = Vec::new();
        let mut settled = false;
        for _ in 0..200_000 {
            let before = ball.unit.moving_speed;
            match advance(&mut ball, DT) {
                Some(Landing::Bounced) => contacts.push((before, ball.unit.moving_speed)),
                Some(Landing::Settled) => {
                    settled = true;
                    break;
                }
                None => {}
            }
        }

        assert!(settled, "ball never settled");
        assert!(!ball.is_in_air);
        assert_eq!(ball.vertical_speed, 0.0);
        assert!(contacts.len() >= 5 && contacts.len() < 40);
        // Airborne speed only changes on contact, by the fixed slowdown
        for (before, after) in &contacts {
            assert!((before - after - ball.tuning.ground_hit_slowdown).abs() < 1e-4);
        }
    }

    #[test]
    fn test_bounce_damps_vertical_speed() {
        let mut ball = ball();
        ball.is_in_air = true;
        ball.vertical_speed = -2.0;
        ball.launch_speed = 2.5;
        ball.reset_height();
        assert_eq!(advance(&mut ball, DT), Some(Landing::Bounced));
        assert!((ball.vertical_speed - 1.4).abs() < 1e-5);
        assert!((ball.position().z - ball.tuning.default_height).abs() < 1e-6);
    }

    #[test]
    fn test_secured_ball_does_not_move_itself() {
        let mut ball = ball();
        ball.kick(2.0, 0.0, 0.0);
        ball.set_owner(Some(PlayerId(0)));
        ball.clock.advance(1.0).unwrap();
        assert!(ball.is_secured());
        assert_eq!(ball.idle(), None);
        assert_eq!(ball.position().truncate(), Vec2::ZERO);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut ball = ball();
        ball.clock.advance(0.75).unwrap();
        ball.kick(2.0, 1.0, 0.3);
        ball.set_owner(Some(PlayerId(4)));
        let snapshot = ball.snapshot();

        let mut copy = self::ball();
        copy.restore(&snapshot).unwrap();
        assert_eq!(copy.snapshot(), snapshot);
        assert_eq!(copy.owner(), Some(PlayerId(4)));
    }

    #[test]
    fn test_restore_rejects_unmarked_slot() {
        let mut snapshot = ball().snapshot();
        snapshot.clock.events[BallEvent::InteractionLock.index()] = None;

        let mut copy = ball();
        copy.clock.advance(1.0).unwrap();
        assert!(matches!(
            copy.restore(&snapshot),
            Err(SimError::SnapshotMismatch { .. })
        ));
        assert_eq!(copy.clock.current_time(), 1.0);
        assert!(copy.can_interact());
    }
}
