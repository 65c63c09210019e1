//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::detection::hazards_in_scan_range;
use super::hazard::{HazardSignal, HazardState};
use super::state::{GameEvent, GamePhase, GameState, RunOutcome, Steer};
use crate::consts::*;
use crate::error::ConfigError;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Lane change request
    pub steer: Option<Steer>,
    pub accelerate: bool,
    pub brake: bool,
    /// Fire the detector
    pub scan: bool,
    /// Pause toggle
    pub pause: bool,
    /// Idle/demo mode - AI drives the vehicle
    pub autopilot: bool,
}

/// Advance the game state by `dt_ms` of game time
///
/// Fails only when a spawn names a hazard type the table does not define.
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: u64) -> Result<(), ConfigError> {
    state.events.clear();

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                log::info!("Paused at {}ms", state.clock_ms);
                return Ok(());
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                log::info!("Resumed at {}ms", state.clock_ms);
            }
            GamePhase::GameOver => {}
        }
    }

    // Clock stays frozen while paused or after game over
    if state.phase != GamePhase::Playing {
        return Ok(());
    }

    let mut input = input.clone();
    if input.autopilot {
        autopilot(state, &mut input);
    }

    state.clock_ms += dt_ms;
    let dt = dt_ms as f32 / 1000.0;

    // Spawns
    let requests = state
        .spawner
        .update(dt_ms, state.run.distance_traveled, &state.hazards, &state.tuning);
    for request in requests {
        state.spawn_hazard(request.kind, request.lane)?;
    }

    // Speed and travel
    update_speed(state, &input, dt);
    let travel = state.run.speed() * dt;
    state.run.advance_distance(travel);
    state.scoring.add_distance(travel);

    // Vehicle
    if let Some(steer) = input.steer {
        state.vehicle.steer(steer);
    }
    state.vehicle.update(dt_ms);

    advance_hazards(state, travel);
    clear_finished_hazards(state);
    refresh_detection(state);

    if input.scan {
        perform_scan(state);
    }

    check_run_end(state);
    Ok(())
}

/// Accelerate, brake, or drift back toward cruise speed
fn update_speed(state: &mut GameState, input: &TickInput, dt: f32) {
    let speed = state.run.speed();
    let cruise = state.cruise_speed;
    let drift = ACCELERATION * 0.5 * dt;

    let next = if input.brake {
        speed - BRAKE_POWER * dt
    } else if input.accelerate {
        speed + ACCELERATION * dt
    } else if speed < cruise {
        (speed + drift).min(cruise)
    } else {
        (speed - drift).max(cruise)
    };
    state.run.set_speed(next);
}

/// Scroll hazards toward the vehicle and evaluate their transitions
fn advance_hazards(state: &mut GameState, travel: f32) {
    let vehicle_pos = state.vehicle.pos();
    let speed = state.run.speed();
    let now = state.clock_ms;

    for hazard in state.hazards.iter_mut() {
        hazard.pos.y += travel;

        let distance = hazard.pos.distance(vehicle_pos);
        let before = hazard.state();
        let signal = hazard.advance(now, distance, speed);
        let after = hazard.state();
        if before != after && !after.is_terminal() {
            state.events.push(GameEvent::HazardStateChanged {
                id: hazard.id,
                kind: hazard.kind(),
                from: before,
                to: after,
            });
        }

        let Some(signal) = signal else {
            continue;
        };
        state.run.record_detonation(signal);
        match signal {
            HazardSignal::Detonated => {
                log::info!("{} detonated - casualty", hazard.kind().display_name());
                state.events.push(GameEvent::HazardDetonated {
                    id: hazard.id,
                    kind: hazard.kind(),
                });
            }
            HazardSignal::Catastrophic => {
                log::info!("{} detonated - catastrophic", hazard.kind().display_name());
                state.events.push(GameEvent::HazardCatastrophic {
                    id: hazard.id,
                    kind: hazard.kind(),
                });
            }
            HazardSignal::Neutralized => {}
        }
    }
}

/// Drop terminal hazards and report active ones leaving the field as bypasses
fn clear_finished_hazards(state: &mut GameState) {
    let exit_y = FIELD_HEIGHT + EXIT_MARGIN;
    let hazards = std::mem::take(&mut state.hazards);

    for hazard in hazards {
        if hazard.is_terminal() {
            continue;
        }
        if hazard.pos.y > exit_y {
            state.run.record_bypass();
            log::info!(
                "{} left behind in {:?} (blue falcon {})",
                hazard.kind().display_name(),
                hazard.state(),
                state.run.blue_falcon_count
            );
            state.events.push(GameEvent::HazardBypassed {
                id: hazard.id,
                kind: hazard.kind(),
                state: hazard.state(),
            });
            continue;
        }
        state.hazards.push(hazard);
    }
}

fn refresh_detection(state: &mut GameState) {
    let scan_range = state.resolver.params().scan_range;
    state.detection.update(
        state.vehicle.pos(),
        state.vehicle.detector(),
        &state.hazards,
        scan_range,
    );
}

/// Resolve a scan request, honoring the cooldown
fn perform_scan(state: &mut GameState) {
    if !state.scan_ready() {
        return;
    }
    state.last_scan_ms = Some(state.clock_ms);

    let detector = state.vehicle.detector();
    let speed = state.run.speed();
    let outcome = state
        .resolver
        .resolve(detector, &mut state.hazards, speed, &mut state.run);
    let awards = state.scoring.apply_scan(&outcome, &mut state.run);

    for hazard in &outcome.neutralized {
        state.events.push(GameEvent::HazardNeutralized {
            id: hazard.id,
            kind: hazard.kind(),
        });
    }
    for (id, points) in awards {
        state.events.push(GameEvent::PointsAwarded { id, points });
    }

    if !outcome.neutralized.is_empty() {
        if let Some(best) = outcome.best_rating() {
            log::info!("Scan: {} neutralized, {}", outcome.neutralized.len(), best.rating.label());
        }
        state.events.push(GameEvent::ScanResolved {
            neutralized: outcome.neutralized.len(),
            blocked: outcome.blocked.len(),
        });
    } else if !outcome.blocked.is_empty() {
        state.events.push(GameEvent::ScanBlocked {
            blocked: outcome.blocked.len(),
        });
    } else {
        state.events.push(GameEvent::ScanMissed);
    }

    state.hazards.retain(|h| h.is_active());
    state.last_scan = Some(outcome);
    refresh_detection(state);
}

fn check_run_end(state: &mut GameState) {
    let outcome = state.run.outcome(&state.rules).or_else(|| {
        (state.spawner.is_exhausted() && state.hazards.is_empty()).then_some(RunOutcome::ChallengeComplete)
    });
    let Some(outcome) = outcome else {
        return;
    };

    state.phase = GamePhase::GameOver;
    state.outcome = Some(outcome);
    state.events.push(GameEvent::RunEnded { outcome });
    log::info!(
        "Run ended: {} (score {}, {:.0}m, {} neutralized)",
        outcome.message(),
        state.score(),
        state.run.distance_traveled,
        state.run.neutralized_count
    );
}

/// Idle/demo mode driver
///
/// Lines up with the nearest hazard ahead, brakes for pressure plates and
/// scans once an eligible hazard is at or inside the ideal distance.
fn autopilot(state: &GameState, input: &mut TickInput) {
    let vehicle_pos = state.vehicle.pos();
    let detector = state.vehicle.detector();
    let speed = state.run.speed();
    let params = state.resolver.params();

    input.accelerate = false;
    input.brake = false;
    input.steer = None;

    // Steer toward the nearest hazard still ahead
    let target = state
        .hazards
        .iter()
        .filter(|h| h.is_active() && h.pos.y < vehicle_pos.y)
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y));
    if let Some(hazard) = target {
        if hazard.lane < state.vehicle.lane {
            input.steer = Some(Steer::Left);
        } else if hazard.lane > state.vehicle.lane {
            input.steer = Some(Steer::Right);
        }
    }

    // Slow down under any speed ceiling ahead
    input.brake = state.hazards.iter().any(|h| {
        h.is_active()
            && h.pos.y < vehicle_pos.y
            && h.pos.distance(vehicle_pos) < h.config().detection_range
            && h.config().max_speed_to_scan.is_some_and(|limit| speed > limit)
    });

    if !state.scan_ready() {
        return;
    }
    let optimal = params.optimal_distance(speed);
    input.scan = hazards_in_scan_range(detector, &state.hazards, params.scan_range)
        .into_iter()
        .map(|i| &state.hazards[i])
        .any(|h| {
            h.can_be_scanned(speed)
                && (h.pos.distance(detector) <= optimal || h.state() == HazardState::Critical)
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::Challenge;
    use crate::sim::hazard::Hazard;
    use crate::tuning::{HazardKind, HazardTypeConfig, RunRules, Tuning};
    use glam::Vec2;
    use std::sync::Arc;

    const DT: u64 = FRAME_MS;

    fn new_state(seed: u64) -> GameState {
        GameState::new(seed, Arc::new(Tuning::default()))
    }

    /// No scheduled spawns; tests place hazards by hand
    fn quiet_state() -> GameState {
        let mut tuning = Tuning::default();
        tuning.spawn.initial_delay_ms = u64::MAX;
        GameState::new(1, Arc::new(tuning))
    }

    fn place(state: &mut GameState, config: HazardTypeConfig, lane: usize, y: f32) -> u32 {
        let id = state.next_hazard_id();
        let pos = Vec2::new(crate::lane_x(lane), y);
        state.hazards.push(Hazard::new(id, config, lane, pos, state.clock_ms));
        id
    }

    #[test]
    fn test_tick_pause() {
        let mut state = quiet_state();
        tick(&mut state, &TickInput::default(), DT).unwrap();
        assert_eq!(state.clock_ms, DT);

        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &pause, DT).unwrap();
        assert_eq!(state.phase, GamePhase::Paused);

        // Clock and hazards frozen while paused
        place(&mut state, HazardTypeConfig::cwied(), 1, 500.0);
        for _ in 0..100 {
            tick(&mut state, &TickInput::default(), DT).unwrap();
        }
        assert_eq!(state.clock_ms, DT);
        assert_eq!(state.hazards[0].pos.y, 500.0);

        tick(&mut state, &pause, DT).unwrap();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.clock_ms, 2 * DT);
    }

    #[test]
    fn test_speed_controls() {
        let mut state = quiet_state();
        let accelerate = TickInput {
            accelerate: true,
            ..Default::default()
        };
        for _ in 0..200 {
            tick(&mut state, &accelerate, DT).unwrap();
        }
        assert_eq!(state.run.speed(), MAX_SPEED);

        // Drifts back to cruise without overshooting
        for _ in 0..200 {
            tick(&mut state, &TickInput::default(), DT).unwrap();
        }
        assert_eq!(state.run.speed(), CRUISE_SPEED);

        let brake = TickInput {
            brake: true,
            ..Default::default()
        };
        for _ in 0..200 {
            tick(&mut state, &brake, DT).unwrap();
        }
        assert_eq!(state.run.speed(), MIN_SPEED);
        assert_eq!(state.run.lowest_speed(), MIN_SPEED);
    }

    #[test]
    fn test_distance_and_score_from_travel() {
        let mut state = quiet_state();
        // 100 ticks of 16ms at 150 px/s = 240 px
        for _ in 0..100 {
            tick(&mut state, &TickInput::default(), DT).unwrap();
        }
        assert!((state.run.distance_traveled - 24.0).abs() < 0.01);
        assert!((23..=24).contains(&state.score()));
    }

    #[test]
    fn test_scan_neutralizes_and_scores() {
        let mut state = quiet_state();
        let detector_y = state.vehicle.detector().y;
        let id = place(&mut state, HazardTypeConfig::cwied(), DEFAULT_LANE, detector_y - 100.0);

        let scan = TickInput {
            scan: true,
            ..Default::default()
        };
        tick(&mut state, &scan, DT).unwrap();

        assert!(state.hazards.is_empty());
        assert_eq!(state.run.neutralized_count, 1);
        assert!(state.events.contains(&GameEvent::HazardNeutralized {
            id,
            kind: HazardKind::Cwied
        }));
        // perfect timing at cruise: 100 * 1.3 * 2
        assert!(state.events.contains(&GameEvent::PointsAwarded { id, points: 260 }));
        assert_eq!(state.score(), 260);
        assert_eq!(state.run.perfect_streak, 1);
    }

    #[test]
    fn test_scan_cooldown() {
        let mut state = quiet_state();
        let scan = TickInput {
            scan: true,
            ..Default::default()
        };
        tick(&mut state, &scan, DT).unwrap();
        assert_eq!(state.events, vec![GameEvent::ScanMissed]);

        tick(&mut state, &scan, DT).unwrap();
        assert!(state.events.is_empty());

        for _ in 0..62 {
            tick(&mut state, &TickInput::default(), DT).unwrap();
        }
        tick(&mut state, &scan, DT).unwrap();
        assert_eq!(state.events, vec![GameEvent::ScanMissed]);
    }

    #[test]
    fn test_blocked_scan_reported() {
        let mut state = quiet_state();
        let detector_y = state.vehicle.detector().y;
        place(&mut state, HazardTypeConfig::ppied(), DEFAULT_LANE, detector_y - 120.0);
        let scan = TickInput {
            scan: true,
            ..Default::default()
        };
        tick(&mut state, &scan, DT).unwrap();
        assert!(state.events.contains(&GameEvent::ScanBlocked { blocked: 1 }));
        assert_eq!(state.hazards.len(), 1);
        assert_eq!(state.run.neutralized_count, 0);
    }

    #[test]
    fn test_bypass_reported_once() {
        let mut state = quiet_state();
        let exit_y = FIELD_HEIGHT + EXIT_MARGIN;
        let id = place(&mut state, HazardTypeConfig::cwied(), 0, exit_y - 1.0);
        state.hazards[0].advance(0, 200.0, CRUISE_SPEED);
        assert_eq!(state.hazards[0].state(), HazardState::Warning);

        tick(&mut state, &TickInput::default(), DT).unwrap();
        let bypasses: Vec<_> = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::HazardBypassed { .. }))
            .collect();
        assert_eq!(
            bypasses,
            vec![&GameEvent::HazardBypassed {
                id,
                kind: HazardKind::Cwied,
                state: HazardState::Warning
            }]
        );
        assert!(state.hazards.is_empty());
        assert_eq!(state.run.blue_falcon_count, 1);
        assert_eq!(state.run.neutralized_count, 0);
        assert_eq!(state.run.casualty_count, 0);

        tick(&mut state, &TickInput::default(), DT).unwrap();
        assert_eq!(state.run.blue_falcon_count, 1);
    }

    #[test]
    fn test_blue_falcon_limit_ends_run() {
        let mut state = quiet_state();
        let exit_y = FIELD_HEIGHT + EXIT_MARGIN;
        for lane in 0..3 {
            place(&mut state, HazardTypeConfig::cwied(), lane, exit_y - 1.0);
        }
        tick(&mut state, &TickInput::default(), DT).unwrap();
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.outcome, Some(RunOutcome::BlueFalcon));
        assert!(state.events.contains(&GameEvent::RunEnded {
            outcome: RunOutcome::BlueFalcon
        }));
    }

    #[test]
    fn test_detonation_ends_run() {
        let mut state = quiet_state();
        let vehicle_y = state.vehicle.pos().y;
        place(&mut state, HazardTypeConfig::cwied(), DEFAULT_LANE, vehicle_y - 50.0);

        tick(&mut state, &TickInput::default(), DT).unwrap();
        assert_eq!(state.hazards[0].state(), HazardState::Critical);

        let mut ticks = 0;
        while state.phase == GamePhase::Playing && ticks < 500 {
            tick(&mut state, &TickInput::default(), DT).unwrap();
            ticks += 1;
        }
        assert_eq!(state.outcome, Some(RunOutcome::Casualties));
        assert_eq!(state.run.casualty_count, 1);
        // 1500ms critical window
        assert!((93..=95).contains(&ticks), "ticks {}", ticks);

        // Game over freezes the run
        let clock = state.clock_ms;
        tick(&mut state, &TickInput::default(), DT).unwrap();
        assert_eq!(state.clock_ms, clock);
    }

    #[test]
    fn test_catastrophic_overrides_casualty_limit() {
        let mut state = quiet_state();
        state.rules = RunRules {
            max_casualties: 5,
            blue_falcon_limit: 5,
        };
        let vehicle_y = state.vehicle.pos().y;
        place(&mut state, HazardTypeConfig::vbied(), DEFAULT_LANE, vehicle_y - 50.0);

        let mut ticks = 0;
        while state.phase == GamePhase::Playing && ticks < 500 {
            tick(&mut state, &TickInput::default(), DT).unwrap();
            ticks += 1;
        }
        assert_eq!(state.outcome, Some(RunOutcome::Catastrophic));
        assert!(state.run.catastrophic);
    }

    #[test]
    fn test_missing_type_fails_spawn() {
        let mut tuning = Tuning::default();
        tuning.hazards = crate::tuning::HazardTable::new(vec![HazardTypeConfig::ppied()]);
        let mut state = GameState::new(3, Arc::new(tuning));
        let mut result = Ok(());
        for _ in 0..200 {
            result = tick(&mut state, &TickInput::default(), DT);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(
            result,
            Err(ConfigError::MissingHazardType(HazardKind::Cwied))
        ));
    }

    #[test]
    fn test_determinism() {
        let mut state1 = new_state(99999);
        let mut state2 = new_state(99999);
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        for _ in 0..3000 {
            tick(&mut state1, &input, DT).unwrap();
            tick(&mut state2, &input, DT).unwrap();
        }
        assert_eq!(state1.clock_ms, state2.clock_ms);
        assert_eq!(state1.score(), state2.score());
        assert_eq!(state1.summary(), state2.summary());
    }

    #[test]
    fn test_autopilot_clears_hazards() {
        let mut state = new_state(2024);
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        for _ in 0..3600 {
            tick(&mut state, &input, DT).unwrap();
        }
        assert!(state.run.neutralized_count > 0);
        assert!(state.run.total_perfects > 0);
    }

    #[test]
    fn test_autopilot_brakes_for_pressure_plate() {
        let mut state = quiet_state();
        let vehicle_y = state.vehicle.pos().y;
        place(&mut state, HazardTypeConfig::ppied(), DEFAULT_LANE, vehicle_y - 200.0);
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        tick(&mut state, &input, DT).unwrap();
        assert!(state.run.speed() < CRUISE_SPEED);
    }

    #[test]
    fn test_challenge_run_completes() {
        let tuning = Arc::new(Tuning::default());
        let challenge = Challenge::find("basic_training").unwrap();
        let mut state = GameState::challenge(7, tuning, &challenge).unwrap();
        let input = TickInput {
            autopilot: true,
            ..Default::default()
        };
        let mut ticks = 0;
        while state.phase == GamePhase::Playing && ticks < 20_000 {
            tick(&mut state, &input, DT).unwrap();
            ticks += 1;
        }
        assert_eq!(state.outcome, Some(RunOutcome::ChallengeComplete));
        assert_eq!(state.run.neutralized_count, 10);
    }
}
