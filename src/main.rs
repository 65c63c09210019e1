//! Route Clear entry point
//!
//! Runs a headless autopilot session on the fixed 60 Hz timestep, records the
//! result to the local data directory and prints a debrief.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;

use route_clear::achievements::{Stats, Unlocked};
use route_clear::challenge::{Challenge, ChallengeProgress};
use route_clear::consts::FRAME_MS;
use route_clear::highscores::HighScoreEntry;
use route_clear::persistence::FileStore;
use route_clear::sim::{GameEvent, GamePhase, GameState, RunMode, TickInput, tick};
use route_clear::{HighScores, Tuning};

#[derive(Parser)]
#[command(name = "route-clear")]
#[command(about = "Headless Route Clear autopilot session")]
struct Args {
    /// Run seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Play a challenge instead of an endless run
    #[arg(long)]
    challenge: Option<String>,

    /// Game-time limit in seconds
    #[arg(long, default_value_t = 120)]
    seconds: u64,

    /// Where high scores, stats and progress are kept
    #[arg(long, default_value = "route-clear-data")]
    data_dir: PathBuf,

    /// Tuning override (JSON)
    #[arg(long)]
    tuning: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::info!("Route Clear (native) starting...");

    let tuning = match &args.tuning {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading tuning file {}", path.display()))?;
            Tuning::from_json(&json)?
        }
        None => Tuning::default(),
    };
    let tuning = Arc::new(tuning);

    let mut store = FileStore::new(&args.data_dir);
    let mut progress = ChallengeProgress::load(&store);

    let challenge = match &args.challenge {
        Some(id) => {
            let challenge = Challenge::by_id(id)?;
            if !progress.is_unlocked(&challenge) {
                log::warn!("{} is still locked; playing it anyway", challenge.name);
            }
            Some(challenge)
        }
        None => None,
    };

    let mut state = match &challenge {
        Some(c) => GameState::challenge(args.seed, tuning, c)?,
        None => GameState::new(args.seed, tuning),
    };

    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    let limit_ms = args.seconds.saturating_mul(1000);
    while state.phase == GamePhase::Playing && state.clock_ms < limit_ms {
        tick(&mut state, &input, FRAME_MS)?;
        for event in &state.events {
            match event {
                GameEvent::HazardSpawned { .. } | GameEvent::HazardStateChanged { .. } => {
                    log::debug!("{:?}", event)
                }
                _ => log::info!("[{:>6}ms] {:?}", state.clock_ms, event),
            }
        }
    }

    let summary = state.summary();

    println!();
    println!("=== DEBRIEF ===");
    match &summary.mode {
        RunMode::Endless => println!("  Mode:         Endless"),
        RunMode::Challenge { id } => println!("  Mode:         Challenge ({})", id),
    }
    match summary.outcome {
        Some(outcome) => println!("  Result:       {}", outcome.message()),
        None => println!("  Result:       Time limit reached"),
    }
    println!("  Score:        {}", summary.score);
    println!("  Distance:     {}m", summary.distance);
    println!("  Neutralized:  {}", summary.neutralized);
    println!("  Perfects:     {} (best streak {})", summary.perfects, summary.best_perfect_streak);
    println!("  Best streak:  {}", summary.best_streak);
    println!("  Casualties:   {}", summary.casualties);
    println!("  Blue falcons: {}", summary.blue_falcons);

    if let Some(c) = &challenge {
        let result = c.evaluate(&summary);
        if result.completed {
            let medal = result.medal.map_or("none", |m| m.as_str());
            println!("  Challenge:    COMPLETE (medal: {})", medal);
        } else {
            println!("  Challenge:    FAILED {:?}", result.failures);
        }
        progress.record(c, &result, summary.score);
        progress.save(&mut store)?;
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let mut high_scores = HighScores::load(&store);
    let rank = high_scores.add(HighScoreEntry {
        score: summary.score,
        distance: summary.distance,
        neutralized: summary.neutralized,
        timestamp,
    });
    if let Some(rank) = rank {
        println!("  NEW HIGH SCORE - rank #{}", rank);
        high_scores.save(&mut store)?;
    }

    let mut stats = Stats::load(&store);
    stats.record_run(&summary);
    stats.sync_challenges(&progress);
    stats.save(&mut store)?;

    let mut unlocked = Unlocked::load(&store);
    for achievement in unlocked.check(&stats) {
        println!("  ACHIEVEMENT:  {} - {}", achievement.name, achievement.description);
    }
    unlocked.save(&mut store)?;

    Ok(())
}
