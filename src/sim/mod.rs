//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only enters through [`tick`]
//! - Stable iteration order (by player id)
//! - No rendering, input or network dependencies
//!
//! Entities keep their own [`EventClock`]. Players never touch the ball
//! directly; ownership changes travel as [`BallCommand`]s applied by
//! [`MatchState`].

pub mod ball;
pub mod clock;
pub mod command;
pub mod motion;
pub mod player;
pub mod possession;
pub mod state;
pub mod tick;

pub use ball::{Ball, BallClock, BallEvent, BallSnapshot, Landing};
pub use clock::{ClockKey, ClockState, EventClock};
pub use command::BallCommand;
pub use motion::MotionUnit;
pub use player::{Eligibility, Player, PlayerClock, PlayerEvent, PlayerId, PlayerSnapshot, Team};
pub use possession::{Candidate, IncumbentWins, NearestWins, PossessionPolicy};
pub use state::{MatchSnapshot, MatchState};
pub use tick::{MatchEvent, PlayerAction, TickInput, tick};
