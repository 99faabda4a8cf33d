//! Pitch Sim headless driver
//!
//! Runs a seeded 2v2 match at a fixed timestep with random player input and
//! prints the final snapshot as JSON.
//!
//! Usage: `pitch-sim [tuning.json] [seed]`

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use pitch_sim::consts::SIM_DT;
use pitch_sim::sim::{
    MatchEvent, MatchState, NearestWins, PlayerAction, PlayerId, Team, TickInput, tick,
};
use pitch_sim::{MatchTuning, SimError};

/// Simulated match length (seconds)
const MATCH_SECONDS: f64 = 90.0;
/// Pitch half extents
const HALF_LENGTH: f32 = 10.0;
const HALF_WIDTH: f32 = 6.0;
/// Chance per tick that a player gets a new command
const ACTION_CHANCE: f64 = 0.04;

fn main() {
    env_logger::init();
    log::info!("Pitch Sim (headless) starting...");

    if let Err(err) = run() {
        log::error!("Simulation aborted: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), SimError> {
    let mut args = std::env::args().skip(1);
    let tuning = match args.next() {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => MatchTuning::from_json(&json)?,
            Err(err) => {
                log::warn!("Could not read tuning file {path}: {err}, using defaults");
                MatchTuning::default()
            }
        },
        None => MatchTuning::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42u64);
    log::info!("Match initialized with seed: {seed}");

    let mut state = MatchState::new(tuning);
    for (id, team, x, y) in [
        (0, Team::Red, -3.0, -1.5),
        (1, Team::Red, -3.0, 1.5),
        (2, Team::Blue, 3.0, -1.5),
        (3, Team::Blue, 3.0, 1.5),
    ] {
        state.add_player(PlayerId(id), team, Vec2::new(x, y))?;
    }

    let mut rng = Pcg32::seed_from_u64(seed);
    let policy = NearestWins;
    let total_ticks = (MATCH_SECONDS / SIM_DT).round() as u64;
    let mut kicks = 0u32;
    let mut tackles = 0u32;
    let mut possession_changes = 0u32;

    for step in 1..=total_ticks {
        let input = random_input(&state, &mut rng);
        let now = step as f64 * SIM_DT;
        for event in tick(&mut state, &input, now, &policy)? {
            match event {
                MatchEvent::Kicked { .. } | MatchEvent::Passed { .. } => kicks += 1,
                MatchEvent::Tackled { .. } => tackles += 1,
                MatchEvent::PossessionGained { .. } => possession_changes += 1,
                _ => {}
            }
            log::debug!("t={now:.3} {event:?}");
        }
    }

    log::info!(
        "Full time after {} ticks: {possession_changes} possessions, {kicks} kicks, {tackles} tackles",
        state.time_ticks
    );
    let snapshot = serde_json::to_string_pretty(&state.snapshot())?;
    println!("{snapshot}");
    Ok(())
}

/// Occasional commands: carriers shoot or pass, everyone else chases, jumps or slides
fn random_input(state: &MatchState, rng: &mut Pcg32) -> TickInput {
    let mut input = TickInput::default();
    let ball = state.ball.position().truncate();

    for player in state.players() {
        if !rng.random_bool(ACTION_CHANCE) {
            continue;
        }
        let action = if player.has_ball() {
            let goal_x = match player.team {
                Team::Red => HALF_LENGTH,
                Team::Blue => -HALF_LENGTH,
            };
            if rng.random_bool(0.5) {
                let target = Vec2::new(goal_x, rng.random_range(-1.0..1.0));
                PlayerAction::Shoot {
                    speed: rng.random_range(3.0..8.0),
                    vertical_speed: rng.random_range(0.0..0.4),
                    angle: player.unit.facing_angle(target),
                }
            } else {
                let mate = state
                    .players()
                    .iter()
                    .find(|p| p.team == player.team && p.id != player.id);
                match mate {
                    Some(mate) => PlayerAction::Pass {
                        target: mate.unit.planar(),
                    },
                    None => PlayerAction::MoveTo(Vec2::new(goal_x, 0.0)),
                }
            }
        } else {
            match rng.random_range(0..10) {
                0 => PlayerAction::Jump {
                    vertical_speed: rng.random_range(0.05..0.15),
                },
                1 => PlayerAction::Slide,
                2 => PlayerAction::Stop,
                3 => PlayerAction::MoveTo(Vec2::new(
                    rng.random_range(-HALF_LENGTH..HALF_LENGTH),
                    rng.random_range(-HALF_WIDTH..HALF_WIDTH),
                )),
                _ => PlayerAction::MoveTo(ball),
            }
        };
        input.push(player.id, action);
    }
    input
}
