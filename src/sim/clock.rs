//! Per-entity event clock
//!
//! Every ball and player owns one clock. The driver advances it once per tick
//! before anything reads a cooldown; gameplay code marks events and asks
//! whether their cooldown has run out.
//!
//! Keys are a closed enum per entity, stored in fixed slots, so looking up a
//! key can never fail. A slot that was never marked is still a programming
//! error to read (see [`EventClock::elapsed`]).

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// How far past its cooldown a backdated key is placed (seconds)
const EXPIRED_MARGIN: f64 = 1.0;

/// A closed set of timed gameplay windows for one entity kind
pub trait ClockKey: Copy + fmt::Debug + PartialEq {
    /// Slot index, must be below the clock's slot count
    fn index(self) -> usize;
}

/// Cooldown/timestamp tracker with `N` event slots keyed by `K`
#[derive(Debug, Clone, PartialEq)]
pub struct EventClock<K: ClockKey, const N: usize> {
    previous_time: f64,
    current_time: f64,
    events: [Option<f64>; N],
    timeouts: [f64; N],
    _key: PhantomData<K>,
}

/// Serializable copy of every clock field, for replication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockState {
    pub previous_time: f64,
    pub current_time: f64,
    /// Last mark per slot (`None` = never marked)
    pub events: Vec<Option<f64>>,
    /// Cooldown per slot
    pub timeouts: Vec<f64>,
}

impl ClockState {
    /// Index of the first slot that was never marked
    pub fn first_unmarked(&self) -> Option<usize> {
        self.events.iter().position(Option::is_none)
    }
}

impl<K: ClockKey, const N: usize> EventClock<K, N> {
    /// A clock whose current (and previous) time is `start_time`, nothing marked
    pub fn new(start_time: f64) -> Self {
        Self {
            previous_time: start_time,
            current_time: start_time,
            events: [None; N],
            timeouts: [0.0; N],
            _key: PhantomData,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn previous_time(&self) -> f64 {
        self.previous_time
    }

    /// Move the clock to `new_time`. Time never runs backwards.
    pub fn advance(&mut self, new_time: f64) -> Result<(), SimError> {
        if new_time < self.current_time {
            return Err(SimError::ClockWentBackwards {
                current: self.current_time,
                requested: new_time,
            });
        }
        self.previous_time = self.current_time;
        self.current_time = new_time;
        Ok(())
    }

    /// Time covered by the last [`advance`](Self::advance)
    pub fn frame_delta(&self) -> f64 {
        self.current_time - self.previous_time
    }

    /// Record `key` as happening now
    pub fn mark(&mut self, key: K) {
        self.events[key.index()] = Some(self.current_time);
    }

    /// Record `key` at an explicit time (restoring or backdating)
    pub fn mark_at(&mut self, key: K, time: f64) {
        self.events[key.index()] = Some(time);
    }

    pub fn last_marked(&self, key: K) -> Option<f64> {
        self.events[key.index()]
    }

    /// Seconds since `key` was marked, `None` if it never was
    pub fn try_elapsed(&self, key: K) -> Option<f64> {
        self.events[key.index()].map(|t| self.current_time - t)
    }

    /// Seconds since `key` was marked
    ///
    /// # Panics
    ///
    /// Panics if `key` was never marked. Entities mark every key they read at
    /// construction, so reaching this is a bug in the caller.
    pub fn elapsed(&self, key: K) -> f64 {
        match self.try_elapsed(key) {
            Some(elapsed) => elapsed,
            None => panic!("clock key {key:?} read before it was ever marked"),
        }
    }

    /// Configure the cooldown of `key`; an unmarked key starts its cooldown now
    pub fn set_cooldown(&mut self, key: K, duration: f64) {
        if self.events[key.index()].is_none() {
            self.mark(key);
        }
        self.timeouts[key.index()] = duration;
    }

    pub fn cooldown(&self, key: K) -> f64 {
        self.timeouts[key.index()]
    }

    /// True once strictly more than the cooldown has elapsed since the last mark
    pub fn is_ready(&self, key: K) -> bool {
        self.elapsed(key) > self.timeouts[key.index()]
    }

    /// Backdate `key` so its current cooldown has already run out
    pub fn expire(&mut self, key: K) {
        let at = self.current_time - self.timeouts[key.index()] - EXPIRED_MARGIN;
        self.mark_at(key, at);
    }

    pub fn state(&self) -> ClockState {
        ClockState {
            previous_time: self.previous_time,
            current_time: self.current_time,
            events: self.events.to_vec(),
            timeouts: self.timeouts.to_vec(),
        }
    }

    /// Overwrite every field from a snapshot with the same slot count
    pub fn restore(&mut self, state: &ClockState) -> Result<(), SimError> {
        if state.events.len() != N || state.timeouts.len() != N {
            return Err(SimError::SnapshotMismatch {
                expected: format!("{N} clock slots"),
                found: format!(
                    "{} events / {} timeouts",
                    state.events.len(),
                    state.timeouts.len()
                ),
            });
        }
        self.previous_time = state.previous_time;
        self.current_time = state.current_time;
        self.events.copy_from_slice(&state.events);
        self.timeouts.copy_from_slice(&state.timeouts);
        Ok(())
    }
}
