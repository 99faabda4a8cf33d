//! Match state and snapshots
//!
//! `MatchState` owns the ball and every player and is the only place where
//! ball commands are applied, so the ownership invariant
//! (`ball.owner() == Some(p)` iff `p.has_ball()`) is checked where it can break.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ball::{Ball, BallSnapshot};
use super::command::BallCommand;
use super::player::{Player, PlayerId, PlayerSnapshot, Team};
use crate::error::SimError;
use crate::tuning::MatchTuning;

/// Complete match state (single simulation instance)
#[derive(Debug, Clone)]
pub struct MatchState {
    pub tuning: MatchTuning,
    /// Simulation time of the last tick
    pub time: f64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub ball: Ball,
    /// Sorted by id for deterministic iteration
    players: Vec<Player>,
}

/// Everything needed to restore a match exactly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub time: f64,
    pub time_ticks: u64,
    pub ball: BallSnapshot,
    pub players: Vec<PlayerSnapshot>,
}

impl MatchState {
    /// Empty pitch with the ball on the centre spot at time zero
    pub fn new(tuning: MatchTuning) -> Self {
        let ball = Ball::new(tuning.ball.clone(), Vec2::ZERO, 0.0);
        Self {
            tuning,
            time: 0.0,
            time_ticks: 0,
            ball,
            players: Vec::new(),
        }
    }

    pub fn add_player(&mut self, id: PlayerId, team: Team, position: Vec2) -> Result<(), SimError> {
        if self.players.iter().any(|p| p.id == id) {
            return Err(SimError::DuplicatePlayer(id));
        }
        let player = Player::new(id, team, position, self.tuning.player.clone(), self.time);
        self.players.push(player);
        self.players.sort_by_key(|p| p.id);
        log::info!("Player {id} joined {team:?} at ({:.2}, {:.2})", position.x, position.y);
        Ok(())
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub(crate) fn players_mut(&mut self) -> &mut [Player] {
        &mut self.players
    }

    pub(crate) fn index_of(&self, id: PlayerId) -> Result<usize, SimError> {
        self.players
            .binary_search_by_key(&id, |p| p.id)
            .map_err(|_| SimError::UnknownPlayer(id))
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, SimError> {
        Ok(&self.players[self.index_of(id)?])
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, SimError> {
        let index = self.index_of(id)?;
        Ok(&mut self.players[index])
    }

    pub fn ball_owner(&self) -> Option<PlayerId> {
        self.ball.owner()
    }

    fn apply(&mut self, command: &BallCommand) {
        self.ball.apply(command);
    }

    /// Give the ball to `id`. The ball must be free or already theirs.
    pub fn give_ball(&mut self, id: PlayerId) -> Result<(), SimError> {
        let index = self.index_of(id)?;
        let command = self.players[index].give_ball(&self.ball)?;
        self.apply(&command);
        log::info!("Player {id} gained possession");
        Ok(())
    }

    /// Take the ball from its owner `id`, who cannot regain it for `lock_for` seconds
    pub fn take_ball_away(&mut self, id: PlayerId, lock_for: f64) -> Result<(), SimError> {
        let index = self.index_of(id)?;
        let command = self.players[index].take_ball_away(&self.ball, lock_for)?;
        self.apply(&command);
        log::info!("Player {id} lost possession");
        Ok(())
    }

    /// Owner `id` shoots; afterwards nobody owns the ball and nobody can touch it
    pub fn kick_the_ball(
        &mut self,
        id: PlayerId,
        speed: f32,
        vertical_speed: f32,
        angle: f32,
    ) -> Result<(), SimError> {
        let index = self.index_of(id)?;
        let commands = self.players[index].kick_the_ball(&self.ball, speed, vertical_speed, angle)?;
        for command in &commands {
            self.apply(command);
        }
        log::info!(
            "Player {id} kicked the ball (speed {speed:.2}, vertical {vertical_speed:.2}, angle {angle:.2})"
        );
        Ok(())
    }

    /// Verify the cross-entity ownership invariant
    pub fn check_invariants(&self) -> Result<(), SimError> {
        for player in &self.players {
            player.is_owner(&self.ball)?;
        }
        if let Some(owner) = self.ball.owner() {
            self.index_of(owner)?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            time: self.time,
            time_ticks: self.time_ticks,
            ball: self.ball.snapshot(),
            players: self.players.iter().map(Player::snapshot).collect(),
        }
    }

    /// Restore from a snapshot of a match with the same roster.
    /// The state is left untouched if the snapshot is rejected.
    pub fn restore(&mut self, snapshot: &MatchSnapshot) -> Result<(), SimError> {
        let ours: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        let theirs: Vec<PlayerId> = snapshot.players.iter().map(|p| p.id).collect();
        if ours != theirs {
            return Err(SimError::SnapshotMismatch {
                expected: format!("{ours:?}"),
                found: format!("{theirs:?}"),
            });
        }

        let clock_times = std::iter::once(snapshot.ball.clock.current_time)
            .chain(snapshot.players.iter().map(|p| p.clock.current_time));
        for clock_time in clock_times {
            if clock_time > snapshot.time {
                return Err(SimError::SnapshotMismatch {
                    expected: format!("clocks at or before t={}", snapshot.time),
                    found: format!("clock at t={clock_time}"),
                });
            }
        }

        let mut restored = self.clone();
        restored.time = snapshot.time;
        restored.time_ticks = snapshot.time_ticks;
        restored.ball.restore(&snapshot.ball)?;
        for (player, state) in restored.players.iter_mut().zip(&snapshot.players) {
            player.restore(state)?;
        }
        restored.check_invariants()?;

        *self = restored;
        log::debug!("Restored match state at t={:.3}", self.time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_match() -> MatchState {
        let mut state = MatchState::new(MatchTuning::default());
        state
            .add_player(PlayerId(1), Team::Blue, Vec2::new(2.0, 0.0))
            .unwrap();
        state
            .add_player(PlayerId(0), Team::Red, Vec2::new(-2.0, 0.0))
            .unwrap();
        state
    }

    #[test]
    fn test_players_sorted_and_unique() {
        let mut state = two_player_match();
        let ids: Vec<_> = state.players().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PlayerId(0), PlayerId(1)]);
        assert!(matches!(
            state.add_player(PlayerId(1), Team::Red, Vec2::ZERO),
            Err(SimError::DuplicatePlayer(_))
        ));
        assert!(matches!(
            state.player(PlayerId(5)),
            Err(SimError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn test_give_then_kick_keeps_invariant() {
        let mut state = two_player_match();
        state.give_ball(PlayerId(0)).unwrap();
        state.check_invariants().unwrap();
        assert!(state.player(PlayerId(0)).unwrap().has_ball());

        // Someone else cannot be handed an owned ball
        assert!(state.give_ball(PlayerId(1)).is_err());

        state.kick_the_ball(PlayerId(0), 4.0, 0.0, 0.0).unwrap();
        state.check_invariants().unwrap();
        assert_eq!(state.ball_owner(), None);
        assert!(!state.player(PlayerId(0)).unwrap().has_ball());
        assert!(!state.ball.can_interact());
    }

    #[test]
    fn test_kick_without_ball_is_rejected() {
        let mut state = two_player_match();
        assert!(matches!(
            state.kick_the_ball(PlayerId(1), 4.0, 0.0, 0.0),
            Err(SimError::NotBallOwner { .. })
        ));
    }

    #[test]
    fn test_snapshot_round_trip_through_json() {
        let mut state = two_player_match();
        state.give_ball(PlayerId(1)).unwrap();
        state.time = 3.25;
        let snapshot = state.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: MatchSnapshot = serde_json::from_str(&json).unwrap();

        let mut other = two_player_match();
        other.restore(&decoded).unwrap();
        assert_eq!(other.snapshot(), snapshot);
        assert_eq!(other.ball_owner(), Some(PlayerId(1)));
    }

    #[test]
    fn test_restore_rejects_broken_ownership() {
        let mut state = two_player_match();
        let mut snapshot = state.snapshot();
        snapshot.players[0].has_ball = true;
        assert!(matches!(
            state.restore(&snapshot),
            Err(SimError::OwnershipMismatch { .. })
        ));
        // Rejected snapshot leaves the match untouched
        assert!(!state.player(PlayerId(0)).unwrap().has_ball());
    }

    #[test]
    fn test_restore_rejects_unreadable_clock() {
        let mut state = two_player_match();
        let mut snapshot = state.snapshot();
        snapshot.players[0].clock.events[0] = None;
        assert!(matches!(
            state.restore(&snapshot),
            Err(SimError::SnapshotMismatch { .. })
        ));
        // Every slot still marked, so the next tick can read them
        for player in state.players() {
            assert_eq!(player.snapshot().clock.first_unmarked(), None);
        }
    }

    #[test]
    fn test_restore_rejects_clock_ahead_of_match() {
        let mut state = two_player_match();
        let mut snapshot = state.snapshot();
        snapshot.players[1].clock.current_time = 5.0;
        assert!(matches!(
            state.restore(&snapshot),
            Err(SimError::SnapshotMismatch { .. })
        ));
        assert_eq!(state.player(PlayerId(1)).unwrap().clock.current_time(), 0.0);
    }

    #[test]
    fn test_restore_rejects_other_roster() {
        let mut state = two_player_match();
        let mut other = MatchState::new(MatchTuning::default());
        other
            .add_player(PlayerId(4), Team::Red, Vec2::ZERO)
            .unwrap();
        assert!(matches!(
            state.restore(&other.snapshot()),
            Err(SimError::SnapshotMismatch { .. })
        ));
    }
}
