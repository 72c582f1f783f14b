// src/angle.rs - Joint angle from three landmarks
use crate::error::{Result, TrackingError};
use crate::landmarks::{LandmarkFrame, LandmarkPoint, PoseLandmark};

/// Segments shorter than this are treated as coincident points.
const MIN_SEGMENT_LENGTH: f64 = 1e-6;

/// Angle at `b` formed by the segments `b->a` and `b->c`, in degrees within [0, 180].
///
/// Works in the image plane only, so noisy depth estimates do not leak into the result.
/// Returns `AngleUnavailable` when any point is below `min_visibility`, non-finite, or
/// when `b` coincides with one of its neighbours.
pub fn joint_angle(
    a: &LandmarkPoint,
    b: &LandmarkPoint,
    c: &LandmarkPoint,
    min_visibility: f64,
) -> Result<f64> {
    if ![a, b, c].iter().all(|p| p.is_visible(min_visibility)) {
        return Err(TrackingError::AngleUnavailable);
    }

    let ba = a.planar() - b.planar();
    let bc = c.planar() - b.planar();
    if ba.norm() < MIN_SEGMENT_LENGTH || bc.norm() < MIN_SEGMENT_LENGTH {
        return Err(TrackingError::AngleUnavailable);
    }

    let radians = bc.y.atan2(bc.x) - ba.y.atan2(ba.x);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }

    Ok(angle.clamp(0.0, 180.0))
}

/// Looks up the triple in `frame` and measures the angle at the middle landmark.
pub fn frame_angle(
    frame: &LandmarkFrame,
    triple: [PoseLandmark; 3],
    min_visibility: f64,
) -> Result<f64> {
    let [a, b, c] = triple;
    joint_angle(frame.get(a), frame.get(b), frame.get(c), min_visibility)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> LandmarkPoint {
        LandmarkPoint::new(x, y, 0.0, 1.0)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn right_angle() {
        let angle = joint_angle(&pt(0.5, 0.2), &pt(0.5, 0.5), &pt(0.8, 0.5), 0.5).unwrap();
        assert!(close(angle, 90.0));
    }

    #[test]
    fn straight_limb_is_180() {
        let angle = joint_angle(&pt(0.2, 0.5), &pt(0.5, 0.5), &pt(0.8, 0.5), 0.5).unwrap();
        assert!(close(angle, 180.0));
    }

    #[test]
    fn folded_limb_is_zero() {
        let angle = joint_angle(&pt(0.8, 0.5), &pt(0.5, 0.5), &pt(0.9, 0.5), 0.5).unwrap();
        assert!(close(angle, 0.0));
    }

    #[test]
    fn reflex_difference_folds_into_range() {
        // arms at 170 and -100 degrees: raw atan2 difference is -270
        let (ta, tc) = (170f64.to_radians(), (-100f64).to_radians());
        let a = pt(0.5 + 0.2 * ta.cos(), 0.5 + 0.2 * ta.sin());
        let c = pt(0.5 + 0.2 * tc.cos(), 0.5 + 0.2 * tc.sin());
        let angle = joint_angle(&a, &pt(0.5, 0.5), &c, 0.5).unwrap();
        assert!((angle - 90.0).abs() < 1e-6);
    }

    #[test]
    fn order_of_outer_points_does_not_matter() {
        let a = pt(0.31, 0.12);
        let b = pt(0.47, 0.55);
        let c = pt(0.83, 0.61);
        let forward = joint_angle(&a, &b, &c, 0.5).unwrap();
        let backward = joint_angle(&c, &b, &a, 0.5).unwrap();
        assert!(close(forward, backward));
    }

    #[test]
    fn depth_is_ignored() {
        let a = LandmarkPoint::new(0.5, 0.2, -0.7, 1.0);
        let c = LandmarkPoint::new(0.8, 0.5, 0.9, 1.0);
        let angle = joint_angle(&a, &pt(0.5, 0.5), &c, 0.5).unwrap();
        assert!(close(angle, 90.0));
    }

    #[test]
    fn always_within_bounds() {
        let b = pt(0.5, 0.5);
        for i in 0..36 {
            for j in 0..36 {
                let ta = (i as f64 * 10.0).to_radians();
                let tc = (j as f64 * 10.0 + 3.0).to_radians();
                let a = pt(0.5 + 0.3 * ta.cos(), 0.5 + 0.3 * ta.sin());
                let c = pt(0.5 + 0.2 * tc.cos(), 0.5 + 0.2 * tc.sin());
                let angle = joint_angle(&a, &b, &c, 0.5).unwrap();
                assert!((0.0..=180.0).contains(&angle), "angle {} out of range", angle);
            }
        }
    }

    #[test]
    fn low_visibility_is_unavailable() {
        let hidden = LandmarkPoint::new(0.5, 0.2, 0.0, 0.2);
        let result = joint_angle(&hidden, &pt(0.5, 0.5), &pt(0.8, 0.5), 0.5);
        assert!(matches!(result, Err(TrackingError::AngleUnavailable)));
    }

    #[test]
    fn coincident_points_are_unavailable() {
        let result = joint_angle(&pt(0.5, 0.5), &pt(0.5, 0.5), &pt(0.8, 0.5), 0.5);
        assert!(matches!(result, Err(TrackingError::AngleUnavailable)));
    }

    #[test]
    fn frame_lookup_uses_named_landmarks() {
        let frame = LandmarkFrame::new(std::time::Duration::ZERO)
            .with(PoseLandmark::LeftHip, pt(0.5, 0.2))
            .with(PoseLandmark::LeftKnee, pt(0.5, 0.5))
            .with(PoseLandmark::LeftAnkle, pt(0.8, 0.5));
        let triple = [PoseLandmark::LeftHip, PoseLandmark::LeftKnee, PoseLandmark::LeftAnkle];
        assert!(close(frame_angle(&frame, triple, 0.5).unwrap(), 90.0));

        let mirrored = [PoseLandmark::RightHip, PoseLandmark::RightKnee, PoseLandmark::RightAnkle];
        assert!(frame_angle(&frame, mirrored, 0.5).is_err());
    }
}
