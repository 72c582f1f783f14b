// src/session.rs - Session lifecycle: start, per-frame processing, finish
use crate::config::TrackerConfig;
use crate::error::{Result, TrackingError};
use crate::landmarks::LandmarkFrame;
use crate::profile::{ExerciseProfile, ProfileRegistry, Target};
use crate::scoring;
use crate::state_machine::{advance, Phase, SessionState};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const TRACKING_LOST_MESSAGE: &str = "Move fully into the camera view so tracking can resume";

/// Wall-clock source for session durations.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Moves forward to `elapsed` since creation; never moves backwards.
    pub fn advance_to(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_max(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

/// Readable after every frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMetrics {
    pub rep_count: u32,
    pub current_form_score: f64,
    pub elapsed_seconds: u64,
    pub phase: Phase,
    pub hold_seconds: u64,
    /// Percent of the target reached, when a target is set.
    pub progress: Option<f64>,
}

impl LiveMetrics {
    fn idle() -> Self {
        Self {
            rep_count: 0,
            current_form_score: 0.0,
            elapsed_seconds: 0,
            phase: Phase::Idle,
            hold_seconds: 0,
            progress: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub metrics: LiveMetrics,
    /// `None` when the frame was skipped for lack of tracking.
    pub angle: Option<f64>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseResult {
    pub session_id: Uuid,
    pub exercise: String,
    pub reps: u32,
    /// Rounded mean of all samples, 0 when none were collected.
    pub form_score: f64,
    pub duration_seconds: u64,
    pub hold_seconds: u64,
    pub feedback: Vec<String>,
    pub started_at: DateTime<Local>,
}

struct ActiveSession {
    id: Uuid,
    profile: ExerciseProfile,
    state: SessionState,
    started_wall: DateTime<Local>,
    feedback: Vec<String>,
    /// Clock reading at the last frame with a usable angle.
    last_measured: Option<Instant>,
}

enum Lifecycle {
    Idle,
    Active(Box<ActiveSession>),
    Finished(ExerciseResult),
}

/// One tracking context. Holds at most one session at a time.
pub struct ExerciseSession<C: Clock = SystemClock> {
    config: TrackerConfig,
    registry: ProfileRegistry,
    clock: C,
    target: Option<Target>,
    lifecycle: Lifecycle,
}

impl ExerciseSession<SystemClock> {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ExerciseSession<C> {
    pub fn with_clock(config: TrackerConfig, clock: C) -> Result<Self> {
        let registry = config.registry()?;
        Ok(Self {
            config,
            registry,
            clock,
            target: None,
            lifecycle: Lifecycle::Idle,
        })
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn set_target(&mut self, target: Option<Target>) {
        self.target = target;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Active(_))
    }

    /// The profile of the running session.
    pub fn profile(&self) -> Option<&ExerciseProfile> {
        match &self.lifecycle {
            Lifecycle::Active(active) => Some(&active.profile),
            _ => None,
        }
    }

    pub fn last_result(&self) -> Option<&ExerciseResult> {
        match &self.lifecycle {
            Lifecycle::Finished(result) => Some(result),
            _ => None,
        }
    }

    /// Begins a session. A session already in progress is discarded without a result.
    pub fn start(&mut self, exercise: &str) -> Result<()> {
        let profile = self.registry.resolve(exercise)?.clone();

        if let Lifecycle::Active(previous) = &self.lifecycle {
            tracing::warn!(session = %previous.id, "starting over, discarding unfinished session");
        }

        let id = Uuid::new_v4();
        tracing::info!(session = %id, exercise = %profile.key, "session started");
        let state = SessionState::new(&profile, self.clock.now());
        self.lifecycle = Lifecycle::Active(Box::new(ActiveSession {
            id,
            profile,
            state,
            started_wall: Local::now(),
            feedback: Vec::new(),
            last_measured: None,
        }));
        Ok(())
    }

    /// Feeds one frame. Frames without a usable angle are absorbed and leave
    /// reps, phase and score samples untouched.
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> Result<FrameReport> {
        let active = active_session(&mut self.lifecycle, "process_frame")?;
        let config = &self.config;

        let (angle, feedback) = match active.profile.measure(frame, config.min_visibility) {
            Ok(angle) => {
                active.state.missed_frames = 0;
                active.state.loss_reported = false;
                active.last_measured = Some(self.clock.now());
                let outcome = advance(&active.profile, config, &mut active.state, angle, frame.timestamp);
                (Some(angle), outcome.feedback)
            }
            Err(TrackingError::AngleUnavailable) => {
                active.state.missed_frames = active.state.missed_frames.saturating_add(1);
                tracing::trace!(
                    session = %active.id,
                    missed = active.state.missed_frames,
                    "frame skipped, landmarks not usable"
                );
                let lost = active.state.missed_frames >= config.tracking_lost_frames.max(1);
                if lost && !active.state.loss_reported {
                    active.state.loss_reported = true;
                    (None, Some(TRACKING_LOST_MESSAGE.to_string()))
                } else {
                    (None, None)
                }
            }
            Err(other) => return Err(other),
        };

        if let Some(message) = &feedback {
            tracing::info!(session = %active.id, feedback = %message, "advisory");
            active.feedback.push(message.clone());
        }

        Ok(FrameReport {
            metrics: self.metrics(),
            angle,
            feedback,
        })
    }

    pub fn metrics(&self) -> LiveMetrics {
        match &self.lifecycle {
            Lifecycle::Idle => LiveMetrics::idle(),
            Lifecycle::Finished(result) => LiveMetrics {
                rep_count: result.reps,
                current_form_score: result.form_score,
                elapsed_seconds: result.duration_seconds,
                phase: Phase::Idle,
                hold_seconds: result.hold_seconds,
                progress: None,
            },
            Lifecycle::Active(active) => {
                let state = &active.state;
                LiveMetrics {
                    rep_count: state.rep_count(),
                    current_form_score: state.live_score(),
                    elapsed_seconds: self.clock.now().saturating_duration_since(state.started_at).as_secs(),
                    phase: state.phase(),
                    hold_seconds: state.hold_time().as_secs(),
                    progress: self.target.map(|target| progress(target, state)),
                }
            }
        }
    }

    /// Ends the session and produces its result. A second call is an error and
    /// leaves the first result in place.
    pub fn finish(&mut self) -> Result<ExerciseResult> {
        match &self.lifecycle {
            Lifecycle::Idle => {
                tracing::warn!("finish called with no session started");
                return Err(TrackingError::SessionNotStarted);
            }
            Lifecycle::Finished(_) => {
                tracing::warn!("finish called on a finished session");
                return Err(TrackingError::SessionAlreadyFinished);
            }
            Lifecycle::Active(_) => {}
        }

        let ended_at = self.clock.now();
        let Lifecycle::Active(active) = std::mem::replace(&mut self.lifecycle, Lifecycle::Idle) else {
            return Err(TrackingError::SessionNotStarted);
        };
        let ActiveSession {
            id,
            profile,
            mut state,
            started_wall,
            feedback,
            last_measured,
        } = *active;

        if let Some(measured) = last_measured {
            state.close_hold(ended_at.saturating_duration_since(measured));
        }
        let duration = ended_at.saturating_duration_since(state.started_at);
        let result = ExerciseResult {
            session_id: id,
            exercise: profile.key,
            reps: state.rep_count(),
            form_score: scoring::session_score(state.score_samples()),
            duration_seconds: duration.as_secs_f64().round() as u64,
            hold_seconds: state.hold_time().as_secs_f64().round() as u64,
            feedback,
            started_at: started_wall,
        };

        tracing::info!(
            session = %id,
            reps = result.reps,
            form_score = result.form_score,
            duration_s = result.duration_seconds,
            "session finished"
        );
        self.lifecycle = Lifecycle::Finished(result.clone());
        Ok(result)
    }

    /// Restarts the running session from its initial phase.
    pub fn reset(&mut self) -> Result<()> {
        let now = self.clock.now();
        let active = active_session(&mut self.lifecycle, "reset")?;
        active.state = SessionState::new(&active.profile, now);
        active.feedback.clear();
        active.last_measured = None;
        tracing::info!(session = %active.id, "session reset");
        Ok(())
    }

    /// Drops the running session without producing a result.
    pub fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.lifecycle, Lifecycle::Idle) {
            Lifecycle::Active(active) => {
                tracing::info!(session = %active.id, "session cancelled");
                true
            }
            other => {
                self.lifecycle = other;
                false
            }
        }
    }
}

fn active_session<'a>(lifecycle: &'a mut Lifecycle, operation: &str) -> Result<&'a mut ActiveSession> {
    match lifecycle {
        Lifecycle::Active(active) => Ok(active.as_mut()),
        Lifecycle::Idle => {
            tracing::warn!(operation, "no session started");
            Err(TrackingError::SessionNotStarted)
        }
        Lifecycle::Finished(_) => {
            tracing::warn!(operation, "session already finished");
            Err(TrackingError::SessionAlreadyFinished)
        }
    }
}

fn progress(target: Target, state: &SessionState) -> f64 {
    let ratio = match target {
        Target::Reps(0) => 1.0,
        Target::Reps(reps) => f64::from(state.rep_count()) / f64::from(reps),
        Target::Hold(goal) if goal.is_zero() => 1.0,
        Target::Hold(goal) => state.hold_time().as_secs_f64() / goal.as_secs_f64(),
    };
    (ratio * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{LandmarkPoint, PoseLandmark};

    fn session() -> (ExerciseSession<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let session = ExerciseSession::with_clock(TrackerConfig::default(), clock.clone()).unwrap();
        (session, clock)
    }

    /// A frame whose left knee is bent to `degrees`.
    fn knee_frame(degrees: f64, at: Duration) -> LandmarkFrame {
        let rad = degrees.to_radians();
        let knee = (0.5, 0.6);
        LandmarkFrame::new(at)
            .with(PoseLandmark::LeftHip, LandmarkPoint::new(knee.0, knee.1 - 0.2, 0.0, 0.9))
            .with(PoseLandmark::LeftKnee, LandmarkPoint::new(knee.0, knee.1, 0.0, 0.9))
            .with(
                PoseLandmark::LeftAnkle,
                LandmarkPoint::new(knee.0 + 0.2 * rad.sin(), knee.1 - 0.2 * rad.cos(), 0.0, 0.9),
            )
    }

    #[test]
    fn frames_before_start_are_rejected() {
        let (mut s, _) = session();
        let err = s.process_frame(&knee_frame(170.0, Duration::ZERO)).unwrap_err();
        assert!(matches!(err, TrackingError::SessionNotStarted));
        assert!(err.is_lifecycle_misuse());
        assert!(matches!(s.finish(), Err(TrackingError::SessionNotStarted)));
        assert!(matches!(s.reset(), Err(TrackingError::SessionNotStarted)));
    }

    #[test]
    fn knee_frame_produces_requested_angle() {
        let (mut s, _) = session();
        s.start("squat").unwrap();
        let report = s.process_frame(&knee_frame(75.0, Duration::ZERO)).unwrap();
        assert!((report.angle.unwrap() - 75.0).abs() < 1e-6);
    }

    #[test]
    fn counts_reps_and_reports_live_metrics() {
        let (mut s, clock) = session();
        s.start("Squats").unwrap();
        for (i, deg) in [170.0, 80.0, 170.0].iter().enumerate() {
            clock.advance(Duration::from_millis(500));
            s.process_frame(&knee_frame(*deg, Duration::from_millis(i as u64 * 500))).unwrap();
        }
        let metrics = s.metrics();
        assert_eq!(metrics.rep_count, 1);
        assert_eq!(metrics.phase, Phase::Up);
        assert_eq!(metrics.elapsed_seconds, 1);
        assert_eq!(metrics.current_form_score, 100.0);
    }

    #[test]
    fn finish_twice_is_an_error_and_keeps_the_result() {
        let (mut s, clock) = session();
        s.start("squat").unwrap();
        clock.advance(Duration::from_secs(5));
        let first = s.finish().unwrap();
        assert_eq!(first.duration_seconds, 5);

        clock.advance(Duration::from_secs(5));
        assert!(matches!(s.finish(), Err(TrackingError::SessionAlreadyFinished)));
        assert_eq!(s.last_result(), Some(&first));
        assert!(matches!(
            s.process_frame(&knee_frame(80.0, Duration::ZERO)),
            Err(TrackingError::SessionAlreadyFinished)
        ));
        assert!(matches!(s.reset(), Err(TrackingError::SessionAlreadyFinished)));
    }

    #[test]
    fn low_visibility_frames_leave_state_untouched() {
        let (mut s, _) = session();
        s.start("squat").unwrap();
        s.process_frame(&knee_frame(170.0, Duration::ZERO)).unwrap();
        s.process_frame(&knee_frame(80.0, Duration::from_millis(100))).unwrap();
        s.process_frame(&knee_frame(170.0, Duration::from_millis(200))).unwrap();
        s.process_frame(&knee_frame(85.0, Duration::from_millis(300))).unwrap();

        let snapshot = |s: &ExerciseSession<ManualClock>| match &s.lifecycle {
            Lifecycle::Active(active) => (
                active.state.rep_count,
                active.state.phase,
                active.state.score_samples.clone(),
            ),
            _ => panic!("session should be active"),
        };
        let before = snapshot(&s);

        let mut hidden = knee_frame(170.0, Duration::from_millis(400));
        let mut knee = *hidden.get(PoseLandmark::LeftKnee);
        knee.visibility = 0.1;
        hidden.set(PoseLandmark::LeftKnee, knee);
        let report = s.process_frame(&hidden).unwrap();

        assert_eq!(report.angle, None);
        assert_eq!(snapshot(&s), before);
        assert_eq!(before.1, Phase::Down);
    }

    #[test]
    fn empty_session_scores_zero() {
        let (mut s, _) = session();
        s.start("plank").unwrap();
        let result = s.finish().unwrap();
        assert_eq!(result.form_score, 0.0);
        assert_eq!(result.reps, 0);
        assert!(result.feedback.is_empty());
    }

    #[test]
    fn reset_returns_to_initial_phase() {
        let (mut s, _) = session();
        s.start("squat").unwrap();
        s.process_frame(&knee_frame(170.0, Duration::ZERO)).unwrap();
        s.process_frame(&knee_frame(80.0, Duration::from_millis(100))).unwrap();
        assert_eq!(s.metrics().phase, Phase::Down);

        s.reset().unwrap();
        assert_eq!(s.metrics().phase, Phase::Up);
        assert_eq!(s.metrics().rep_count, 0);
    }

    #[test]
    fn cancel_discards_without_result() {
        let (mut s, _) = session();
        assert!(!s.cancel());
        s.start("squat").unwrap();
        assert!(s.cancel());
        assert!(s.last_result().is_none());
        assert_eq!(s.metrics(), LiveMetrics::idle());
        assert!(matches!(s.finish(), Err(TrackingError::SessionNotStarted)));
    }

    #[test]
    fn unknown_exercise_falls_back() {
        let (mut s, _) = session();
        s.start("burpees").unwrap();
        assert_eq!(s.profile().unwrap().key, crate::profile::DEFAULT_PROFILE);
    }

    #[test]
    fn prolonged_tracking_loss_warns_once() {
        let config = TrackerConfig {
            tracking_lost_frames: 3,
            ..TrackerConfig::default()
        };
        let mut s = ExerciseSession::with_clock(config, ManualClock::new()).unwrap();
        s.start("squat").unwrap();
        let blank = LandmarkFrame::new(Duration::ZERO);
        let advisories: Vec<_> = (0..10)
            .filter_map(|_| s.process_frame(&blank).unwrap().feedback)
            .collect();
        assert_eq!(advisories, vec![TRACKING_LOST_MESSAGE.to_string()]);
        assert_eq!(s.metrics().rep_count, 0);
        assert_eq!(s.metrics().phase, Phase::Up);
    }

    #[test]
    fn progress_tracks_rep_target() {
        let mut s = ExerciseSession::with_clock(TrackerConfig::default(), ManualClock::new())
            .unwrap()
            .with_target(Target::Reps(2));
        s.start("squat").unwrap();
        for (i, deg) in [170.0, 80.0, 170.0].iter().enumerate() {
            s.process_frame(&knee_frame(*deg, Duration::from_millis(i as u64 * 100))).unwrap();
        }
        assert_eq!(s.metrics().progress, Some(50.0));
    }

    #[test]
    fn restart_while_active_discards_previous() {
        let (mut s, _) = session();
        s.start("squat").unwrap();
        s.process_frame(&knee_frame(170.0, Duration::ZERO)).unwrap();
        s.process_frame(&knee_frame(80.0, Duration::from_millis(100))).unwrap();
        s.process_frame(&knee_frame(170.0, Duration::from_millis(200))).unwrap();
        s.start("plank").unwrap();
        assert_eq!(s.metrics().rep_count, 0);
        assert_eq!(s.metrics().phase, Phase::Holding);
    }

    #[test]
    fn result_serializes_camel_case() {
        let (mut s, _) = session();
        s.start("squat").unwrap();
        let result = s.finish().unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("formScore").is_some());
        assert!(json.get("durationSeconds").is_some());
        assert_eq!(json["exercise"], "squat");
    }
}
