// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use rep_tracker::recording::load_recording;
use rep_tracker::{parse_target, ExerciseSession, ManualClock, TrackerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Replays a recorded landmark stream through the exercise tracker and prints the result.
#[derive(Debug, Parser)]
#[command(name = "rep_tracker", version)]
struct Args {
    /// Exercise name, e.g. "Squats" or "Hold plank"
    exercise: String,

    /// CSV recording with columns timestamp_ms,landmark,x,y,z,visibility
    recording: PathBuf,

    /// JSON tracker configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Prescription such as "10-12 reps" or "Hold 30s"
    #[arg(long)]
    target: Option<String>,
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout carries only the result
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    let frames = load_recording(&args.recording)
        .with_context(|| format!("reading recording {}", args.recording.display()))?;
    tracing::info!(frames = frames.len(), "replaying {}", args.recording.display());

    // Replay time follows the capture timestamps rather than how fast we read the file
    let clock = ManualClock::new();
    let mut session = ExerciseSession::with_clock(config, clock.clone())?;
    session.set_target(args.target.as_deref().and_then(parse_target));
    session.start(&args.exercise)?;

    let origin = frames.first().map(|f| f.timestamp).unwrap_or(Duration::ZERO);
    let mut reps = 0;
    for frame in &frames {
        clock.advance_to(frame.timestamp.saturating_sub(origin));
        let report = session.process_frame(frame)?;

        if report.metrics.rep_count != reps {
            reps = report.metrics.rep_count;
            tracing::info!(
                reps,
                score = report.metrics.current_form_score.round(),
                progress = ?report.metrics.progress,
                "rep"
            );
        }
    }

    let result = session.finish()?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
