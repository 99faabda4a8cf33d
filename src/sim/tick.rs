//! Simulation tick
//!
//! Advances one match instance to a new simulation time. Clocks are always
//! advanced first so no cooldown is read against last tick's time.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ball::Landing;
use super::command::BallCommand;
use super::player::PlayerId;
use super::possession::{Candidate, PossessionPolicy};
use super::state::MatchState;
use crate::error::SimError;

/// A discrete input for one player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    MoveTo(Vec2),
    Stop,
    Jump { vertical_speed: f32 },
    Slide,
    Shoot {
        speed: f32,
        vertical_speed: f32,
        angle: f32,
    },
    Pass { target: Vec2 },
}

/// Input commands for a single tick, applied in order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    pub actions: Vec<(PlayerId, PlayerAction)>,
}

impl TickInput {
    pub fn push(&mut self, player: PlayerId, action: PlayerAction) {
        self.actions.push((player, action));
    }
}

/// What happened during a tick, for presentation and replication layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MatchEvent {
    PossessionGained { player: PlayerId },
    Dispossessed { player: PlayerId },
    Kicked { player: PlayerId, angle: f32 },
    Passed { player: PlayerId, target: Vec2 },
    Tackled { tackler: PlayerId, victim: PlayerId },
    Jumped { player: PlayerId },
    Slid { player: PlayerId },
    BallBounced,
    BallSettled,
}

/// Advance the match to simulation time `now`
pub fn tick(
    state: &mut MatchState,
    input: &TickInput,
    now: f64,
    policy: &dyn PossessionPolicy,
) -> Result<Vec<MatchEvent>, SimError> {
    // Reject bad input before anything moves
    if now < state.time {
        return Err(SimError::ClockWentBackwards {
            current: state.time,
            requested: now,
        });
    }
    let clock_times = std::iter::once(state.ball.clock.current_time())
        .chain(state.players().iter().map(|p| p.clock.current_time()));
    for current in clock_times {
        if now < current {
            return Err(SimError::ClockWentBackwards {
                current,
                requested: now,
            });
        }
    }
    for (id, _) in &input.actions {
        state.index_of(*id)?;
    }

    state.ball.clock.advance(now)?;
    for player in state.players_mut() {
        player.clock.advance(now)?;
    }
    state.time = now;
    state.time_ticks += 1;

    let mut events = Vec::new();
    for (id, action) in &input.actions {
        apply_action(state, *id, *action, &mut events)?;
    }

    for player in state.players_mut() {
        player.idle();
    }
    match state.ball.idle() {
        Some(Landing::Bounced) => events.push(MatchEvent::BallBounced),
        Some(Landing::Settled) => {
            log::info!("Ball settled at {:?}", state.ball.position().truncate());
            events.push(MatchEvent::BallSettled);
        }
        None => {}
    }

    carry_ball(state)?;
    resolve_tackles(state, &mut events)?;
    resolve_possession(state, policy, &mut events)?;

    if cfg!(debug_assertions) {
        state.check_invariants()?;
    }
    Ok(events)
}

fn apply_action(
    state: &mut MatchState,
    id: PlayerId,
    action: PlayerAction,
    events: &mut Vec<MatchEvent>,
) -> Result<(), SimError> {
    match action {
        PlayerAction::MoveTo(point) => state.player_mut(id)?.unit.move_to(point),
        PlayerAction::Stop => state.player_mut(id)?.unit.stop(),
        PlayerAction::Jump { vertical_speed } => {
            if state.player_mut(id)?.jump(vertical_speed) {
                events.push(MatchEvent::Jumped { player: id });
            }
        }
        PlayerAction::Slide => {
            let player = state.player_mut(id)?;
            match player.slide() {
                Ok(true) => {
                    let reach = player.tuning.slide_speed * player.tuning.slide_duration as f32;
                    let end = player.unit.point_offset(reach).truncate();
                    player.unit.move_to(end);
                    events.push(MatchEvent::Slid { player: id });
                }
                Ok(false) => {}
                Err(err) if err.is_recoverable() => log::warn!("Ignoring slide: {err}"),
                Err(err) => return Err(err),
            }
        }
        PlayerAction::Shoot {
            speed,
            vertical_speed,
            angle,
        } => {
            if !state.player(id)?.has_ball() {
                log::warn!("Ignoring shot from player {id} without the ball");
                return Ok(());
            }
            state.kick_the_ball(id, speed, vertical_speed, angle)?;
            events.push(MatchEvent::Kicked { player: id, angle });
            events.push(MatchEvent::Dispossessed { player: id });
        }
        PlayerAction::Pass { target } => {
            let pass_speed = state.tuning.pass_speed;
            let player = state.player_mut(id)?;
            if !player.has_ball() {
                log::warn!("Ignoring pass from player {id} without the ball");
                return Ok(());
            }
            if !player.pass() {
                return Ok(());
            }
            let angle = player.unit.facing_angle(target);
            state.kick_the_ball(id, pass_speed, 0.0, angle)?;
            events.push(MatchEvent::Passed { player: id, target });
            events.push(MatchEvent::Dispossessed { player: id });
        }
    }
    Ok(())
}

/// A secured ball travels at its owner's possession anchor
fn carry_ball(state: &mut MatchState) -> Result<(), SimError> {
    if !state.ball.is_secured() {
        return Ok(());
    }
    let Some(owner) = state.ball.owner() else {
        return Ok(());
    };
    let carrier = state.player(owner)?;
    let anchor = carrier.possession_point().truncate();
    let facing_direction = carrier.unit.facing_direction;
    let facing_target = carrier.unit.facing_target;
    // A standing carrier's ball rolls nowhere once released
    let moving_speed = if carrier.unit.is_moving() {
        carrier.unit.moving_speed
    } else {
        0.0
    };

    let ball = &mut state.ball;
    ball.unit.position = anchor.extend(ball.tuning.default_height);
    ball.unit.facing_direction = facing_direction;
    ball.unit.facing_target = facing_target;
    ball.unit.moving_speed = moving_speed;
    ball.unit.stop();
    ball.is_in_air = false;
    ball.vertical_speed = 0.0;
    Ok(())
}

/// A fast slide reaching an opposing carrier knocks the ball loose
fn resolve_tackles(state: &mut MatchState, events: &mut Vec<MatchEvent>) -> Result<(), SimError> {
    let Some(owner) = state.ball.owner() else {
        return Ok(());
    };
    let victim = state.player(owner)?;
    let victim_team = victim.team;
    let victim_position = victim.unit.planar();
    let tackle_range = state.tuning.tackle_range;

    let tackler = state
        .players()
        .iter()
        .filter(|p| p.id != owner && p.team != victim_team && p.is_sliding_fast())
        .find(|p| p.possession_point().truncate().distance(victim_position) <= tackle_range)
        .map(|p| p.id);
    let Some(tackler) = tackler else {
        return Ok(());
    };

    let dispossess_lock = state.tuning.player.dispossess_lock;
    let tackled_slowdown = state.tuning.player.tackled_slowdown;
    let slide_lock = state.tuning.ball.slide_interaction_lock;

    state.take_ball_away(owner, dispossess_lock)?;
    state.player_mut(owner)?.slowdown(tackled_slowdown);
    state.ball.apply(&BallCommand::InteractionLock {
        duration: slide_lock,
    });

    log::info!("Player {tackler} tackled player {owner}");
    events.push(MatchEvent::Tackled {
        tackler,
        victim: owner,
    });
    events.push(MatchEvent::Dispossessed { player: owner });
    Ok(())
}

/// Hand a free or loose ball to the player the policy picks
fn resolve_possession(
    state: &mut MatchState,
    policy: &dyn PossessionPolicy,
    events: &mut Vec<MatchEvent>,
) -> Result<(), SimError> {
    if state.ball.is_secured() {
        return Ok(());
    }
    let current_owner = state.ball.owner();
    let candidates: Vec<Candidate> = state
        .players()
        .iter()
        .filter_map(|p| {
            p.control_potential(&state.ball)
                .distance()
                .map(|distance| Candidate {
                    player: p.id,
                    distance,
                })
        })
        .collect();

    let Some(winner) = policy.select(current_owner, &candidates) else {
        return Ok(());
    };
    if Some(winner) == current_owner {
        return Ok(());
    }

    if let Some(previous) = current_owner {
        let lock = state.tuning.player.dispossess_lock;
        state.take_ball_away(previous, lock)?;
        events.push(MatchEvent::Dispossessed { player: previous });
    }
    state.give_ball(winner)?;
    events.push(MatchEvent::PossessionGained { player: winner });
    Ok(())
}
