// src/lib.rs
//! Exercise tracking from pose landmarks: joint angles in, rep counts, form
//! scores and a session summary out.
//!
//! Frames flow `LandmarkFrame -> angle -> state_machine + scoring -> session`.
//! The pose estimator and any rendering live outside this crate.

pub mod angle;
pub mod config;
pub mod error;
pub mod landmarks;
pub mod profile;
pub mod recording;
pub mod scoring;
pub mod session;
pub mod state_machine;

pub use angle::joint_angle;
pub use config::TrackerConfig;
pub use error::{Result, TrackingError};
pub use landmarks::{LandmarkFrame, LandmarkPoint, PoseLandmark, POSE_LANDMARK_COUNT};
pub use profile::{
    normalize_name, parse_target, AngleRange, CountingStrategy, ExerciseProfile, JointTriple,
    ProfileRegistry, SideMode, Target,
};
pub use session::{
    Clock, ExerciseResult, ExerciseSession, FrameReport, LiveMetrics, ManualClock, SystemClock,
};
pub use state_machine::{Phase, SessionState};
