//! Player state machine
//!
//! Movement mode (running, carrying, sliding, slowed), the jump arc and every
//! cooldown-gated action are driven by the player's own clock. Actions that
//! change who owns the ball return [`BallCommand`]s instead of touching the
//! ball; the match state applies them.

use std::fmt;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::ball::Ball;
use super::clock::{ClockKey, ClockState, EventClock};
use super::command::BallCommand;
use super::motion::MotionUnit;
use crate::error::SimError;
use crate::tuning::PlayerTuning;

/// Stable per-match player identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

/// Timed windows tracked by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Dispossessed,
    GotBall,
    Jump,
    Slide,
    SlowedDown,
    Pass,
}

impl ClockKey for PlayerEvent {
    fn index(self) -> usize {
        self as usize
    }
}

pub type PlayerClock = EventClock<PlayerEvent, 6>;

/// Whether a player may take control of the ball, and how close it is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eligibility {
    /// Planar distance from the possession anchor to the ball
    Eligible(f32),
    Ineligible,
}

impl Eligibility {
    pub fn distance(self) -> Option<f32> {
        match self {
            Eligibility::Eligible(distance) => Some(distance),
            Eligibility::Ineligible => None,
        }
    }

    pub fn is_eligible(self) -> bool {
        matches!(self, Eligibility::Eligible(_))
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub team: Team,
    pub unit: MotionUnit,
    pub clock: PlayerClock,
    pub tuning: PlayerTuning,
    has_ball: bool,
    pub is_in_air: bool,
    pub vertical_speed: f32,
}

/// Every replicated player field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub team: Team,
    pub unit: MotionUnit,
    pub clock: ClockState,
    pub has_ball: bool,
    pub is_in_air: bool,
    pub vertical_speed: f32,
}

impl Player {
    /// A grounded player at `position`. Jump, pass and the kickoff slowdown start
    /// their cooldowns at `start_time`; the slide cooldown is already run out.
    pub fn new(
        id: PlayerId,
        team: Team,
        position: Vec2,
        tuning: PlayerTuning,
        start_time: f64,
    ) -> Self {
        let mut clock = PlayerClock::new(start_time);
        clock.mark(PlayerEvent::GotBall);
        clock.mark(PlayerEvent::Dispossessed);
        clock.set_cooldown(PlayerEvent::Jump, tuning.jump_cooldown);
        clock.set_cooldown(PlayerEvent::SlowedDown, tuning.default_slowdown);
        clock.set_cooldown(PlayerEvent::Pass, tuning.pass_cooldown);
        // A slide marked now would start a fast slide at kickoff
        clock.set_cooldown(PlayerEvent::Slide, tuning.slide_cooldown());
        clock.expire(PlayerEvent::Slide);

        let unit = MotionUnit::new(position.extend(tuning.default_height), tuning.turn_rate);
        Self {
            id,
            team,
            unit,
            clock,
            tuning,
            has_ball: false,
            is_in_air: false,
            vertical_speed: 0.0,
        }
    }

    pub fn has_ball(&self) -> bool {
        self.has_ball
    }

    /// Per-tick update for the frame the clock just advanced over
    pub fn idle(&mut self) {
        let dt = self.clock.frame_delta() as f32;
        self.idle_speed();
        self.idle_jump(dt);
        self.unit.step(dt);
    }

    fn idle_speed(&mut self) {
        self.unit.moving_speed = if self.is_sliding_fast() {
            self.tuning.slide_speed
        } else if self.is_sliding_slowdown() || self.is_slowed_down() {
            self.tuning.slide_slowdown_speed
        } else if self.has_ball {
            self.tuning.possession_running_speed
        } else {
            self.tuning.running_speed
        };
    }

    fn idle_jump(&mut self, dt: f32) {
        if !self.is_in_air {
            self.unit.set_height(self.tuning.default_height);
            return;
        }
        if self.vertical_speed > 0.0 || self.unit.height() > self.tuning.default_height {
            self.unit
                .step_arc(dt, &mut self.vertical_speed, self.tuning.gravity);
        } else {
            self.unit.set_height(self.tuning.default_height);
            self.vertical_speed = 0.0;
            self.is_in_air = false;
        }
    }

    // === Jump ===

    pub fn can_jump(&self) -> bool {
        self.clock.is_ready(PlayerEvent::Jump)
    }

    pub fn is_jumping(&self) -> bool {
        self.is_in_air
    }

    pub fn is_going_up(&self) -> bool {
        self.is_in_air && self.vertical_speed > 0.0
    }

    pub fn is_landing(&self) -> bool {
        self.is_in_air && self.vertical_speed < 0.0
    }

    /// Start a jump. An attempt while sliding or slowed uses up the cooldown
    /// without leaving the ground. Returns whether the player took off.
    pub fn jump(&mut self, vertical_speed: f32) -> bool {
        if !self.can_jump() {
            return false;
        }
        self.clock.mark(PlayerEvent::Jump);
        if self.is_sliding() || self.is_slowed_down() || self.is_in_air {
            return false;
        }
        self.is_in_air = true;
        self.vertical_speed = vertical_speed;
        true
    }

    // === Possession ===

    /// Whether this player owns `ball`, cross-checked against `has_ball`
    pub fn is_owner(&self, ball: &Ball) -> Result<bool, SimError> {
        let owns = ball.owner() == Some(self.id);
        if owns != self.has_ball {
            return Err(SimError::OwnershipMismatch {
                player: self.id,
                has_ball: self.has_ball,
                ball_owner: ball.owner(),
            });
        }
        Ok(owns)
    }

    pub fn can_possess(&self) -> bool {
        self.clock.is_ready(PlayerEvent::Dispossessed)
    }

    /// Where a held ball sits: ahead of the player, or on the player while rising in a jump
    pub fn possession_point(&self) -> Vec3 {
        if self.is_going_up() {
            return self.unit.position;
        }
        self.unit.point_offset(self.tuning.possession_offset)
    }

    /// Take the ball. It must be free or already ours.
    #[must_use = "the command must be applied to the ball"]
    pub(crate) fn give_ball(&mut self, ball: &Ball) -> Result<BallCommand, SimError> {
        if ball.owner().is_some_and(|owner| owner != self.id) {
            return Err(SimError::OwnershipMismatch {
                player: self.id,
                has_ball: self.has_ball,
                ball_owner: ball.owner(),
            });
        }
        self.has_ball = true;
        self.clock.mark(PlayerEvent::GotBall);
        Ok(BallCommand::PossessionChange {
            owner: Some(self.id),
        })
    }

    /// Release the ball and block repossession for `lock_for` seconds
    #[must_use = "the command must be applied to the ball"]
    pub(crate) fn take_ball_away(&mut self, ball: &Ball, lock_for: f64) -> Result<BallCommand, SimError> {
        if !self.is_owner(ball)? {
            return Err(SimError::NotBallOwner {
                player: self.id,
                ball_owner: ball.owner(),
            });
        }
        self.has_ball = false;
        self.clock.mark(PlayerEvent::Dispossessed);
        self.clock.set_cooldown(PlayerEvent::Dispossessed, lock_for);
        Ok(BallCommand::PossessionChange { owner: None })
    }

    /// Distance to the ball if nothing prevents this player from controlling it
    pub fn eligibility(&self, ball: &Ball) -> Eligibility {
        let height = self.unit.height();
        let ball_height = ball.unit.height();
        if !ball.can_interact()
            || !self.can_possess()
            || ball_height <= height
            || height + self.tuning.tallness <= ball_height
            || self.is_sliding_slowdown()
            || self.is_slowed_down()
        {
            return Eligibility::Ineligible;
        }
        let anchor = self.possession_point().truncate();
        Eligibility::Eligible(anchor.distance(ball.unit.planar()))
    }

    /// Eligibility limited to the possession range; the ranking metric for contests
    pub fn control_potential(&self, ball: &Ball) -> Eligibility {
        match self.eligibility(ball) {
            Eligibility::Eligible(range) if range <= self.tuning.possession_range => {
                Eligibility::Eligible(range)
            }
            _ => Eligibility::Ineligible,
        }
    }

    /// Shoot: the ball is launched, the shooter loses it and nobody can touch it for a while.
    /// Commands are returned in the order they must be applied.
    #[must_use = "the commands must be applied to the ball"]
    pub(crate) fn kick_the_ball(
        &mut self,
        ball: &Ball,
        speed: f32,
        vertical_speed: f32,
        angle: f32,
    ) -> Result<[BallCommand; 3], SimError> {
        let release = self.take_ball_away(ball, self.tuning.shot_lock)?;
        Ok([
            BallCommand::Kick {
                speed,
                vertical_speed,
                angle,
            },
            release,
            BallCommand::InteractionLock {
                duration: ball.tuning.shot_interaction_lock,
            },
        ])
    }

    // === Pass ===

    pub fn can_pass(&self) -> bool {
        self.clock.is_ready(PlayerEvent::Pass)
    }

    /// Consume the pass gate. Returns false while on cooldown.
    pub fn pass(&mut self) -> bool {
        if !self.can_pass() {
            return false;
        }
        self.clock.mark(PlayerEvent::Pass);
        true
    }

    // === Slide ===

    pub fn can_slide(&self) -> bool {
        !self.is_jumping() && self.clock.is_ready(PlayerEvent::Slide)
    }

    pub fn is_sliding(&self) -> bool {
        !self.clock.is_ready(PlayerEvent::Slide)
    }

    pub fn is_sliding_fast(&self) -> bool {
        self.is_sliding() && self.clock.elapsed(PlayerEvent::Slide) < self.tuning.slide_duration
    }

    pub fn is_sliding_slowdown(&self) -> bool {
        self.is_sliding() && !self.is_sliding_fast()
    }

    /// Start a slide. Returns false while airborne or on cooldown.
    pub fn slide(&mut self) -> Result<bool, SimError> {
        if self.has_ball {
            return Err(SimError::SlideWithBall(self.id));
        }
        if !self.can_slide() {
            return Ok(false);
        }
        self.clock.mark(PlayerEvent::Slide);
        Ok(true)
    }

    // === Slowdown ===

    pub fn is_slowed_down(&self) -> bool {
        !self.clock.is_ready(PlayerEvent::SlowedDown)
    }

    pub fn slowdown(&mut self, duration: f64) {
        self.clock.mark(PlayerEvent::SlowedDown);
        self.clock.set_cooldown(PlayerEvent::SlowedDown, duration);
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            team: self.team,
            unit: self.unit.clone(),
            clock: self.clock.state(),
            has_ball: self.has_ball,
            is_in_air: self.is_in_air,
            vertical_speed: self.vertical_speed,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: &PlayerSnapshot) -> Result<(), SimError> {
        if snapshot.id != self.id {
            return Err(SimError::SnapshotMismatch {
                expected: self.id.to_string(),
                found: snapshot.id.to_string(),
            });
        }
        if let Some(slot) = snapshot.clock.first_unmarked() {
            return Err(SimError::SnapshotMismatch {
                expected: format!("every clock slot of player {} marked", self.id),
                found: format!("slot {slot} unmarked"),
            });
        }
        self.clock.restore(&snapshot.clock)?;
        self.team = snapshot.team;
        self.unit = snapshot.unit.clone();
        self.has_ball = snapshot.has_ball;
        self.is_in_air = snapshot.is_in_air;
        self.vertical_speed = snapshot.vertical_speed;
        Ok(())
    }
}
