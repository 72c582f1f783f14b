// src/scoring.rs - Form quality relative to an ideal angle range
use crate::profile::AngleRange;

pub const MAX_SCORE: f64 = 100.0;

/// Score awarded at the edges of the ideal range. Everything inside scores at least this.
pub const ACCEPTABLE_FLOOR: f64 = 70.0;

/// Points lost per degree away from the range center, scaled so the
/// range edges land exactly on `ACCEPTABLE_FLOOR`.
pub fn slope_for(range: &AngleRange) -> f64 {
    let half = range.half_width();
    if half <= f64::EPSILON {
        // zero-width range: any deviation drops to the floor within one degree
        return MAX_SCORE - ACCEPTABLE_FLOOR;
    }
    (MAX_SCORE - ACCEPTABLE_FLOOR) / half
}

/// Instantaneous quality in [0, 100]: `100 - k * |angle - center|`, clamped.
pub fn score(angle: f64, ideal: &AngleRange) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let raw = MAX_SCORE - slope_for(ideal) * (angle - ideal.center()).abs();
    raw.clamp(0.0, MAX_SCORE)
}

/// Mean of the collected samples, `None` when nothing was collected.
pub fn mean_score(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Final session score: rounded mean, 0 when no samples exist.
pub fn session_score(samples: &[f64]) -> f64 {
    mean_score(samples)
        .map(|m| m.clamp(0.0, MAX_SCORE).round())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(low: f64, high: f64) -> AngleRange {
        AngleRange::new(low, high)
    }

    #[test]
    fn center_scores_full_marks() {
        assert_eq!(score(80.0, &range(60.0, 100.0)), 100.0);
    }

    #[test]
    fn whole_range_is_acceptable() {
        let ideal = range(160.0, 180.0);
        for tenth in 1600..=1800 {
            let angle = tenth as f64 / 10.0;
            assert!(score(angle, &ideal) >= ACCEPTABLE_FLOOR - 1e-9, "angle {}", angle);
        }
    }

    #[test]
    fn outside_range_scores_below_floor() {
        let ideal = range(160.0, 180.0);
        assert!(score(150.0, &ideal) < ACCEPTABLE_FLOOR);
        assert_eq!(score(20.0, &ideal), 0.0);
    }

    #[test]
    fn score_is_bounded_for_any_input() {
        let ranges = [range(0.0, 180.0), range(60.0, 100.0), range(170.0, 170.0)];
        for ideal in &ranges {
            for deg in -360..=540 {
                let s = score(deg as f64, ideal);
                assert!((0.0..=100.0).contains(&s));
            }
            assert_eq!(score(f64::NAN, ideal), 0.0);
            assert_eq!(score(f64::INFINITY, ideal), 0.0);
        }
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean_score(&[]), None);
        assert_eq!(session_score(&[]), 0.0);
    }

    #[test]
    fn session_score_rounds_mean() {
        assert_eq!(mean_score(&[100.0, 92.5, 92.5]), Some(95.0));
        assert_eq!(session_score(&[90.0, 85.0]), 88.0);
    }
}
