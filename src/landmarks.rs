// src/landmarks.rs - Pose landmark frame as delivered by the pose estimator
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of keypoints in a MediaPipe pose frame.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// MediaPipe pose keypoints, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseLandmark {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl PoseLandmark {
    pub const ALL: [PoseLandmark; POSE_LANDMARK_COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEyeInner => "left_eye_inner",
            Self::LeftEye => "left_eye",
            Self::LeftEyeOuter => "left_eye_outer",
            Self::RightEyeInner => "right_eye_inner",
            Self::RightEye => "right_eye",
            Self::RightEyeOuter => "right_eye_outer",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::MouthLeft => "mouth_left",
            Self::MouthRight => "mouth_right",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftPinky => "left_pinky",
            Self::RightPinky => "right_pinky",
            Self::LeftIndex => "left_index",
            Self::RightIndex => "right_index",
            Self::LeftThumb => "left_thumb",
            Self::RightThumb => "right_thumb",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::LeftHeel => "left_heel",
            Self::RightHeel => "right_heel",
            Self::LeftFootIndex => "left_foot_index",
            Self::RightFootIndex => "right_foot_index",
        }
    }

    /// Accepts both `left_knee` and `LEFT_KNEE` spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|lm| lm.name() == wanted)
    }

    /// The same joint on the other side of the body. Midline points map to themselves.
    pub fn mirrored(self) -> Self {
        match self {
            Self::Nose => Self::Nose,
            Self::LeftEyeInner => Self::RightEyeInner,
            Self::RightEyeInner => Self::LeftEyeInner,
            Self::LeftEye => Self::RightEye,
            Self::RightEye => Self::LeftEye,
            Self::LeftEyeOuter => Self::RightEyeOuter,
            Self::RightEyeOuter => Self::LeftEyeOuter,
            Self::LeftEar => Self::RightEar,
            Self::RightEar => Self::LeftEar,
            Self::MouthLeft => Self::MouthRight,
            Self::MouthRight => Self::MouthLeft,
            Self::LeftShoulder => Self::RightShoulder,
            Self::RightShoulder => Self::LeftShoulder,
            Self::LeftElbow => Self::RightElbow,
            Self::RightElbow => Self::LeftElbow,
            Self::LeftWrist => Self::RightWrist,
            Self::RightWrist => Self::LeftWrist,
            Self::LeftPinky => Self::RightPinky,
            Self::RightPinky => Self::LeftPinky,
            Self::LeftIndex => Self::RightIndex,
            Self::RightIndex => Self::LeftIndex,
            Self::LeftThumb => Self::RightThumb,
            Self::RightThumb => Self::LeftThumb,
            Self::LeftHip => Self::RightHip,
            Self::RightHip => Self::LeftHip,
            Self::LeftKnee => Self::RightKnee,
            Self::RightKnee => Self::LeftKnee,
            Self::LeftAnkle => Self::RightAnkle,
            Self::RightAnkle => Self::LeftAnkle,
            Self::LeftHeel => Self::RightHeel,
            Self::RightHeel => Self::LeftHeel,
            Self::LeftFootIndex => Self::RightFootIndex,
            Self::RightFootIndex => Self::LeftFootIndex,
        }
    }
}

/// One keypoint in normalized image space. `visibility` is the estimator's confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    /// Image-plane position; depth is ignored.
    pub fn planar(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn is_visible(&self, min_visibility: f64) -> bool {
        self.visibility >= min_visibility
            && self.x.is_finite()
            && self.y.is_finite()
    }
}

/// A full pose snapshot. Missing keypoints carry zero visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    /// Capture time relative to the start of the stream.
    pub timestamp: Duration,
    points: [LandmarkPoint; POSE_LANDMARK_COUNT],
}

impl LandmarkFrame {
    /// An empty frame: every keypoint present but invisible.
    pub fn new(timestamp: Duration) -> Self {
        Self {
            timestamp,
            points: [LandmarkPoint::default(); POSE_LANDMARK_COUNT],
        }
    }

    /// Wraps a full estimator output, indexed in MediaPipe order.
    pub fn from_points(timestamp: Duration, points: [LandmarkPoint; POSE_LANDMARK_COUNT]) -> Self {
        Self { timestamp, points }
    }

    pub fn get(&self, landmark: PoseLandmark) -> &LandmarkPoint {
        &self.points[landmark.index()]
    }

    pub fn set(&mut self, landmark: PoseLandmark, point: LandmarkPoint) {
        self.points[landmark.index()] = point;
    }

    pub fn with(mut self, landmark: PoseLandmark, point: LandmarkPoint) -> Self {
        self.set(landmark, point);
        self
    }

    pub fn all_visible(&self, landmarks: &[PoseLandmark], min_visibility: f64) -> bool {
        landmarks.iter().all(|lm| self.get(*lm).is_visible(min_visibility))
    }
}
