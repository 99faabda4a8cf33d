//! Possession contention policies
//!
//! Players only report their own control potential. Which of several eligible
//! players actually wins the ball is decided here, by a policy the host picks.

use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// An eligible player and its distance to the ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub player: PlayerId,
    pub distance: f32,
}

/// Chooses who ends up with a contested ball
pub trait PossessionPolicy {
    /// `candidates` holds only eligible players, in player id order.
    /// Returning `None` leaves the ball with `current_owner`.
    fn select(&self, current_owner: Option<PlayerId>, candidates: &[Candidate]) -> Option<PlayerId>;
}

/// Closest anchor wins; equal distances go to the lower player id
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestWins;

impl PossessionPolicy for NearestWins {
    fn select(&self, _current_owner: Option<PlayerId>, candidates: &[Candidate]) -> Option<PlayerId> {
        nearest(candidates)
    }
}

/// The current owner keeps a loose ball while still eligible; otherwise nearest wins
#[derive(Debug, Clone, Copy, Default)]
pub struct IncumbentWins;

impl PossessionPolicy for IncumbentWins {
    fn select(&self, current_owner: Option<PlayerId>, candidates: &[Candidate]) -> Option<PlayerId> {
        if let Some(owner) = current_owner {
            if candidates.iter().any(|c| c.player == owner) {
                return Some(owner);
            }
        }
        nearest(candidates)
    }
}

fn nearest(candidates: &[Candidate]) -> Option<PlayerId> {
    candidates
        .iter()
        .min_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.player.cmp(&b.player))
        })
        .map(|c| c.player)
}
