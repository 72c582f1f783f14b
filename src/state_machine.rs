// src/state_machine.rs - Per-frame phase transitions, rep counting and hold timing
use crate::config::TrackerConfig;
use crate::profile::{CountingStrategy, ExerciseProfile};
use crate::scoring;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Up,
    Down,
    Holding,
    AdjustingForm,
    /// No session is running.
    Idle,
}

impl Phase {
    pub fn initial_for(profile: &ExerciseProfile) -> Self {
        if profile.is_hold() {
            Phase::Holding
        } else {
            Phase::Up
        }
    }
}

/// Everything one running session owns. Only `advance` and the session mutate it.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub(crate) phase: Phase,
    /// Never decreases while the session is active.
    pub(crate) rep_count: u32,
    /// Append-only, each value in [0, 100].
    pub(crate) score_samples: Vec<f64>,
    pub(crate) started_at: Instant,
    /// Most recent instantaneous score, for live display.
    pub(crate) live_score: f64,
    pub(crate) last_angle: Option<f64>,
    /// Deepest angle seen in the current `Down` phase.
    peak_angle: Option<f64>,
    /// Qualifying time accumulated in `Holding`.
    pub(crate) hold_time: Duration,
    last_frame_at: Option<Duration>,
    next_tick_at: Option<Duration>,
    /// Consecutive frames without a usable angle.
    pub(crate) missed_frames: u32,
    pub(crate) loss_reported: bool,
}

impl SessionState {
    pub fn new(profile: &ExerciseProfile, started_at: Instant) -> Self {
        Self {
            phase: Phase::initial_for(profile),
            rep_count: 0,
            score_samples: Vec::with_capacity(64),
            started_at,
            live_score: 0.0,
            last_angle: None,
            peak_angle: None,
            hold_time: Duration::ZERO,
            last_frame_at: None,
            next_tick_at: None,
            missed_frames: 0,
            loss_reported: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn score_samples(&self) -> &[f64] {
        &self.score_samples
    }

    pub fn live_score(&self) -> f64 {
        self.live_score
    }

    pub fn last_angle(&self) -> Option<f64> {
        self.last_angle
    }

    pub fn hold_time(&self) -> Duration {
        self.hold_time
    }

    /// Credits the interval after the last frame when the session ends mid-hold.
    pub(crate) fn close_hold(&mut self, open: Duration) {
        if self.phase == Phase::Holding && self.last_frame_at.is_some() {
            self.hold_time += open;
        }
    }

    fn enter(&mut self, phase: Phase, at: Duration) {
        tracing::debug!(from = ?self.phase, to = ?phase, at_ms = at.as_millis() as u64, "phase change");
        self.phase = phase;
    }

    fn push_sample(&mut self, sample: f64) {
        self.score_samples.push(sample.clamp(0.0, scoring::MAX_SCORE));
    }
}

/// What one accepted angle did to the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub rep_completed: bool,
    /// Advisory text for the user, at most one per frame.
    pub feedback: Option<String>,
}

/// Feeds one measured angle captured at `at` into the session state.
pub fn advance(
    profile: &ExerciseProfile,
    config: &TrackerConfig,
    state: &mut SessionState,
    angle: f64,
    at: Duration,
) -> StepOutcome {
    let outcome = match profile.strategy {
        CountingStrategy::AngleCycle { contracted, extended } => {
            advance_cycle(profile, config, state, angle, at, contracted, extended)
        }
        CountingStrategy::HoldDuration { band } => {
            advance_hold(profile, config, state, angle, at, band.contains(angle))
        }
    };
    state.last_angle = Some(angle);
    state.last_frame_at = Some(at);
    outcome
}

fn advance_cycle(
    profile: &ExerciseProfile,
    config: &TrackerConfig,
    state: &mut SessionState,
    angle: f64,
    at: Duration,
    contracted: f64,
    extended: f64,
) -> StepOutcome {
    let mut outcome = StepOutcome::default();

    match state.phase {
        Phase::Up => {
            if angle < contracted {
                state.enter(Phase::Down, at);
                state.peak_angle = Some(angle);
                state.live_score = scoring::score(angle, &profile.ideal);
            }
        }
        Phase::Down => {
            let peak = state.peak_angle.map_or(angle, |p| p.min(angle));
            state.peak_angle = Some(peak);
            state.live_score = scoring::score(peak, &profile.ideal);

            if angle > extended {
                let sample = scoring::score(peak, &profile.ideal);
                state.enter(Phase::Up, at);
                state.rep_count += 1;
                state.push_sample(sample);
                state.live_score = sample;
                state.peak_angle = None;
                outcome.rep_completed = true;
                tracing::debug!(reps = state.rep_count, peak, score = sample, "rep completed");

                if sample < config.low_score_threshold {
                    outcome.feedback = Some(profile.cue.clone());
                }
            }
        }
        // hold phases never occur for a cycle profile; treat as a fresh start
        Phase::Holding | Phase::AdjustingForm | Phase::Idle => {
            state.enter(Phase::Up, at);
        }
    }

    outcome
}

fn advance_hold(
    profile: &ExerciseProfile,
    config: &TrackerConfig,
    state: &mut SessionState,
    angle: f64,
    at: Duration,
    in_band: bool,
) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let instant_score = scoring::score(angle, &profile.ideal);
    state.live_score = instant_score;

    // an in-band frame holds until the next frame arrives
    if let (Phase::Holding, Some(prev)) = (state.phase, state.last_frame_at) {
        state.hold_time += at.saturating_sub(prev);
    }

    if in_band {
        if state.phase != Phase::Holding {
            state.enter(Phase::Holding, at);
        }
    } else if state.phase != Phase::AdjustingForm {
        state.enter(Phase::AdjustingForm, at);
        outcome.feedback = Some(profile.cue.clone());
    }

    // one sample per tick of capture time, no backfill across gaps
    let tick = config.hold_tick();
    let due = state.next_tick_at.map_or(true, |next| at >= next);
    if due {
        state.push_sample(instant_score);
        state.next_tick_at = Some(match state.next_tick_at {
            Some(next) if at < next + tick => next + tick,
            _ => at + tick,
        });
    }

    outcome
}
