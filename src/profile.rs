// src/profile.rs - Static exercise table and name resolution
use crate::angle::frame_angle;
use crate::error::{Result, TrackingError};
use crate::landmarks::{LandmarkFrame, PoseLandmark};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Profile used when a name cannot be resolved.
pub const DEFAULT_PROFILE: &str = "pushup";

/// Outer point, vertex, outer point. The angle is measured at the vertex.
pub type JointTriple = [PoseLandmark; 3];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub low: f64,
    pub high: f64,
}

impl AngleRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn center(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    pub fn half_width(&self) -> f64 {
        (self.high - self.low) / 2.0
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.low && angle <= self.high
    }
}

/// How a profile turns angles into progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CountingStrategy {
    /// Discrete reps. Going below `contracted` enters the bottom phase, rising
    /// above `extended` completes the rep. The gap between them is the hysteresis band.
    #[serde(rename_all = "camelCase")]
    AngleCycle { contracted: f64, extended: f64 },
    /// Sustained hold. Time inside `band` counts, time outside triggers a correction.
    #[serde(rename_all = "camelCase")]
    HoldDuration { band: AngleRange },
}

/// Which side(s) of the body the joint triple is measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SideMode {
    #[default]
    Left,
    Right,
    /// Average of both sides.
    Mean,
    /// The more flexed of the two sides.
    Either,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProfile {
    pub key: String,
    pub display_name: String,
    /// Outer, vertex, outer; written for the left side and mirrored as needed.
    pub joint: JointTriple,
    #[serde(default)]
    pub side: SideMode,
    pub strategy: CountingStrategy,
    /// Target range for scoring: bottom-of-rep depth for cycles, the hold band for holds.
    pub ideal: AngleRange,
    /// Coaching hint shown for poor reps or broken holds.
    pub cue: String,
    /// All of these must appear in a normalized name for keyword matching.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ExerciseProfile {
    fn left_joint(&self) -> JointTriple {
        self.joint.map(|lm| {
            if lm.name().starts_with("right_") {
                lm.mirrored()
            } else {
                lm
            }
        })
    }

    fn right_joint(&self) -> JointTriple {
        self.left_joint().map(PoseLandmark::mirrored)
    }

    pub fn required_landmarks(&self) -> Vec<PoseLandmark> {
        match self.side {
            SideMode::Left => self.left_joint().to_vec(),
            SideMode::Right => self.right_joint().to_vec(),
            SideMode::Mean | SideMode::Either => {
                let mut all = self.left_joint().to_vec();
                all.extend(self.right_joint());
                all
            }
        }
    }

    /// The profile's joint angle for this frame.
    pub fn measure(&self, frame: &LandmarkFrame, min_visibility: f64) -> Result<f64> {
        match self.side {
            SideMode::Left => frame_angle(frame, self.left_joint(), min_visibility),
            SideMode::Right => frame_angle(frame, self.right_joint(), min_visibility),
            SideMode::Mean => {
                let left = frame_angle(frame, self.left_joint(), min_visibility)?;
                let right = frame_angle(frame, self.right_joint(), min_visibility)?;
                Ok((left + right) / 2.0)
            }
            SideMode::Either => {
                let left = frame_angle(frame, self.left_joint(), min_visibility)?;
                let right = frame_angle(frame, self.right_joint(), min_visibility)?;
                Ok(left.min(right))
            }
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self.strategy, CountingStrategy::HoldDuration { .. })
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| TrackingError::InvalidProfile {
            name: self.key.clone(),
            reason: reason.to_string(),
        };

        if normalize_name(&self.key).is_empty() {
            return Err(invalid("key must contain letters or digits"));
        }
        if !(self.ideal.low < self.ideal.high) {
            return Err(invalid("ideal range must have low < high"));
        }
        match self.strategy {
            CountingStrategy::AngleCycle { contracted, extended } => {
                if !(extended > contracted) {
                    return Err(invalid("extended threshold must exceed contracted threshold"));
                }
                if contracted < 0.0 || extended > 180.0 {
                    return Err(invalid("thresholds must lie within 0..=180 degrees"));
                }
            }
            CountingStrategy::HoldDuration { band } => {
                if !(band.low < band.high) {
                    return Err(invalid("hold band must have low < high"));
                }
            }
        }
        Ok(())
    }
}

/// Lower-case and strip everything that is not a letter or digit.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub struct ProfileRegistry {
    profiles: Vec<ExerciseProfile>,
    default_key: String,
}

static BUILTIN: Lazy<ProfileRegistry> = Lazy::new(|| ProfileRegistry {
    profiles: builtin_profiles(),
    default_key: DEFAULT_PROFILE.to_string(),
});

impl ProfileRegistry {
    /// The fixed table, built once per process.
    pub fn builtin() -> &'static ProfileRegistry {
        &BUILTIN
    }

    pub fn new(profiles: Vec<ExerciseProfile>, default_key: &str) -> Result<Self> {
        for profile in &profiles {
            profile.validate()?;
        }
        Ok(Self {
            profiles,
            default_key: normalize_name(default_key),
        })
    }

    /// A copy of this registry with `extra` profiles added. Same-key profiles are replaced.
    pub fn with_overrides(&self, extra: impl IntoIterator<Item = ExerciseProfile>) -> Result<Self> {
        let mut profiles = self.profiles.clone();
        for profile in extra {
            profile.validate()?;
            let key = normalize_name(&profile.key);
            match profiles.iter_mut().find(|p| normalize_name(&p.key) == key) {
                Some(existing) => *existing = profile,
                None => profiles.push(profile),
            }
        }
        Ok(Self {
            profiles,
            default_key: self.default_key.clone(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&ExerciseProfile> {
        let key = normalize_name(key);
        self.profiles.iter().find(|p| normalize_name(&p.key) == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.key.as_str())
    }

    pub fn default_profile(&self) -> Option<&ExerciseProfile> {
        self.get(&self.default_key)
    }

    /// Exact key match first, then keyword match in table order.
    pub fn lookup(&self, name: &str) -> Result<&ExerciseProfile> {
        let normalized = normalize_name(name);
        if let Some(profile) = self.get(&normalized) {
            return Ok(profile);
        }

        self.profiles
            .iter()
            .find(|p| {
                !p.keywords.is_empty()
                    && p.keywords.iter().all(|k| normalized.contains(&normalize_name(k)))
            })
            .ok_or_else(|| TrackingError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Like `lookup`, but unknown names degrade to the default profile.
    pub fn resolve(&self, name: &str) -> Result<&ExerciseProfile> {
        match self.lookup(name) {
            Ok(profile) => Ok(profile),
            Err(_) => {
                let fallback = self.default_profile().ok_or_else(|| {
                    TrackingError::ProfileNotFound {
                        name: name.to_string(),
                    }
                })?;
                tracing::warn!(
                    requested = name,
                    fallback = %fallback.key,
                    "unknown exercise, using default profile"
                );
                Ok(fallback)
            }
        }
    }
}

fn builtin_profiles() -> Vec<ExerciseProfile> {
    use PoseLandmark::*;

    let profile = |key: &str,
                   display_name: &str,
                   joint: JointTriple,
                   side: SideMode,
                   strategy: CountingStrategy,
                   ideal: AngleRange,
                   cue: &str,
                   keywords: &[&str]| ExerciseProfile {
        key: key.to_string(),
        display_name: display_name.to_string(),
        joint,
        side,
        strategy,
        ideal,
        cue: cue.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    };

    vec![
        profile(
            "march_in_place",
            "March in Place",
            [LeftShoulder, LeftHip, LeftKnee],
            SideMode::Either,
            CountingStrategy::AngleCycle { contracted: 120.0, extended: 160.0 },
            AngleRange::new(70.0, 110.0),
            "Drive your knees up toward hip height",
            &["march"],
        ),
        profile(
            "pushup",
            "Push-ups",
            [LeftShoulder, LeftElbow, LeftWrist],
            SideMode::Mean,
            CountingStrategy::AngleCycle { contracted: 85.0, extended: 150.0 },
            AngleRange::new(60.0, 90.0),
            "Lower your chest further before pushing back up",
            &["push"],
        ),
        profile(
            "squat",
            "Squats",
            [LeftHip, LeftKnee, LeftAnkle],
            SideMode::Left,
            CountingStrategy::AngleCycle { contracted: 90.0, extended: 160.0 },
            AngleRange::new(60.0, 100.0),
            "Sit deeper, bring your hips toward knee level",
            &["squat"],
        ),
        profile(
            "plank",
            "Plank",
            [LeftShoulder, LeftHip, LeftKnee],
            SideMode::Left,
            CountingStrategy::HoldDuration { band: AngleRange::new(160.0, 180.0) },
            AngleRange::new(160.0, 180.0),
            "Keep your hips in line with your shoulders",
            &["plank"],
        ),
        profile(
            "lunge",
            "Lunges",
            [LeftHip, LeftKnee, LeftAnkle],
            SideMode::Left,
            CountingStrategy::AngleCycle { contracted: 90.0, extended: 160.0 },
            AngleRange::new(75.0, 105.0),
            "Bend the front knee to about 90 degrees",
            &["lunge"],
        ),
        profile(
            "arm_circles",
            "Arm Circles",
            [LeftShoulder, LeftElbow, LeftWrist],
            SideMode::Left,
            CountingStrategy::AngleCycle { contracted: 30.0, extended: 160.0 },
            AngleRange::new(0.0, 40.0),
            "Make the circles fuller",
            &["arm", "circle"],
        ),
    ]
}

/// Workout prescription parsed from plan text such as "10-12 reps" or "Hold 30s".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    Reps(u32),
    Hold(Duration),
}

/// Takes the lower bound of a range ("10-12 reps" -> 10). Minutes are converted to seconds.
pub fn parse_target(text: &str) -> Option<Target> {
    let lower = text.to_lowercase();
    let value: u32 = lower
        .split(|c: char| !c.is_ascii_digit())
        .find(|digits| !digits.is_empty())?
        .parse()
        .ok()?;

    if lower.contains("rep") || lower.contains("step") {
        Some(Target::Reps(value))
    } else if lower.contains("min") {
        Some(Target::Hold(Duration::from_secs(u64::from(value) * 60)))
    } else if lower.contains("sec") || lower.contains(&format!("{}s", value)) {
        Some(Target::Hold(Duration::from_secs(u64::from(value))))
    } else {
        None
    }
}
