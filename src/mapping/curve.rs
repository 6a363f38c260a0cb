//! Axis response curves (deadzone, S-curve, control points, saturation)
//!
//! Processing order for one raw sample:
//! 1. Deadzone: the center band collapses to 0, values beyond the outer
//!    boundaries saturate, the rest is rescaled to fill `[-1.0, 1.0]`.
//! 2. Shaping by curve kind.
//! 3. Scaling by saturation, then clamping to `[-1.0, 1.0]`.

use crate::profile::{AxisCurve, CurveKind, DeadzoneBounds};

/// Transform a raw axis sample through a response curve
///
/// # Arguments
/// * `raw` - Raw axis value (-1.0 to 1.0); out-of-range values are clamped
/// * `curve` - Curve configuration
///
/// # Returns
/// Shaped value in range -1.0 to 1.0
pub fn evaluate(raw: f32, curve: &AxisCurve) -> f32 {
    if raw.is_nan() {
        return 0.0;
    }
    let raw = raw.clamp(-1.0, 1.0);

    let shaped = if curve.symmetric {
        // Shape the magnitude, then restore sign
        let deadzone = curve.deadzone.clamp(0.0, 0.999);
        let magnitude = raw.abs();
        if magnitude <= deadzone {
            return 0.0;
        }
        let t = ((magnitude - deadzone) / (1.0 - deadzone)).min(1.0);
        raw.signum() * shape_magnitude(t, curve)
    } else {
        let t = rescale(raw, &curve.bounds);
        if t == 0.0 {
            return 0.0;
        }
        shape_signed(t, curve)
    };

    (shaped * curve.saturation.clamp(0.0, 1.0)).clamp(-1.0, 1.0)
}

/// Map a raw value through four deadzone boundaries onto `[-1.0, 1.0]`
fn rescale(x: f32, b: &DeadzoneBounds) -> f32 {
    if x >= b.high {
        1.0
    } else if x <= b.low {
        -1.0
    } else if x > b.center_high {
        (x - b.center_high) / (b.high - b.center_high)
    } else if x < b.center_low {
        -(b.center_low - x) / (b.center_low - b.low)
    } else {
        0.0
    }
}

/// Shaping on the positive half `[0.0, 1.0]`, mirrored by the caller
fn shape_magnitude(t: f32, curve: &AxisCurve) -> f32 {
    match curve.kind {
        CurveKind::Linear => t,
        CurveKind::SCurve => s_curve(t, curve.curvature),
        CurveKind::ControlPoints => interpolate(&curve.control_points, t),
    }
}

/// Shaping over the full signed range
fn shape_signed(t: f32, curve: &AxisCurve) -> f32 {
    match curve.kind {
        CurveKind::Linear => t,
        CurveKind::SCurve => t.signum() * s_curve(t.abs(), curve.curvature),
        CurveKind::ControlPoints => interpolate(&curve.control_points, t),
    }
}

/// S-curve on `[0.0, 1.0]`
///
/// Positive curvature flattens the center (`(1 - c)·t + c·t³`), negative
/// curvature mirrors it to steepen the center. Curvature 0 is the identity.
pub fn s_curve(t: f32, curvature: f32) -> f32 {
    let c = curvature.clamp(-1.0, 1.0);
    if c >= 0.0 {
        (1.0 - c) * t + c * t * t * t
    } else {
        let k = -c;
        let u = 1.0 - t;
        1.0 - ((1.0 - k) * u + k * u * u * u)
    }
}

/// Monotone piecewise cubic interpolation (PCHIP tangents)
///
/// Points must be sorted by input. Inputs outside the defined domain clamp to
/// the first/last output. Fewer than two points degrade gracefully: none is
/// the identity, one is a constant.
pub fn interpolate(points: &[(f32, f32)], x: f32) -> f32 {
    let n = points.len();
    match n {
        0 => return x,
        1 => return points[0].1,
        _ => {}
    }
    if x <= points[0].0 {
        return points[0].1;
    }
    if x >= points[n - 1].0 {
        return points[n - 1].1;
    }

    let i = points
        .windows(2)
        .position(|w| x < w[1].0)
        .unwrap_or(n - 2);

    let (x0, y0) = points[i];
    let (x1, y1) = points[i + 1];
    let h = x1 - x0;
    let m0 = tangent(points, i);
    let m1 = tangent(points, i + 1);

    let t = (x - x0) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1
}

/// Slope of segment `i` → `i + 1`
fn secant(points: &[(f32, f32)], i: usize) -> f32 {
    let (x0, y0) = points[i];
    let (x1, y1) = points[i + 1];
    (y1 - y0) / (x1 - x0)
}

/// Fritsch–Butland tangent at point `k`
///
/// Interior tangents are a weighted harmonic mean of neighbouring secants
/// (zero at local extrema), which keeps each segment monotone.
fn tangent(points: &[(f32, f32)], k: usize) -> f32 {
    let last = points.len() - 1;
    if k == 0 {
        return secant(points, 0);
    }
    if k == last {
        return secant(points, last - 1);
    }

    let d0 = secant(points, k - 1);
    let d1 = secant(points, k);
    if d0 * d1 <= 0.0 {
        return 0.0;
    }
    let h0 = points[k].0 - points[k - 1].0;
    let h1 = points[k + 1].0 - points[k].0;
    let w0 = 2.0 * h1 + h0;
    let w1 = h1 + 2.0 * h0;
    (w0 + w1) / (w0 / d0 + w1 / d1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-5;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_linear_identity() {
        let curve = AxisCurve::linear();
        for x in [-1.0, -0.37, 0.0, 0.37, 1.0] {
            assert!(approx(evaluate(x, &curve), x));
        }
    }

    #[test]
    fn test_symmetric_deadzone_rescales() {
        let curve = AxisCurve::linear().with_deadzone(0.2);

        assert_eq!(evaluate(0.1, &curve), 0.0);
        assert_eq!(evaluate(-0.2, &curve), 0.0);
        assert!(approx(evaluate(0.6, &curve), 0.5));
        assert!(approx(evaluate(-0.6, &curve), -0.5));
        assert!(approx(evaluate(1.0, &curve), 1.0));
    }

    #[test]
    fn test_bounds_deadzone() {
        let curve = AxisCurve::linear().with_bounds(DeadzoneBounds {
            low: -0.9,
            center_low: -0.1,
            center_high: 0.2,
            high: 0.8,
        });

        assert_eq!(evaluate(0.0, &curve), 0.0);
        assert_eq!(evaluate(0.15, &curve), 0.0);
        assert_eq!(evaluate(-0.1, &curve), 0.0);
        assert_eq!(evaluate(0.85, &curve), 1.0);
        assert_eq!(evaluate(-0.95, &curve), -1.0);
        assert!(approx(evaluate(0.5, &curve), 0.5));
        assert!(approx(evaluate(-0.5, &curve), -0.5));
    }

    #[test]
    fn test_saturation_caps_output() {
        let curve = AxisCurve::linear().with_saturation(0.5);
        assert!(approx(evaluate(1.0, &curve), 0.5));
        assert!(approx(evaluate(-0.5, &curve), -0.25));
    }

    #[test]
    fn test_s_curve_shapes() {
        // Positive curvature: softer center, same endpoints
        assert!(s_curve(0.5, 0.6) < 0.5);
        assert!(approx(s_curve(1.0, 0.6), 1.0));
        // Negative curvature: steeper center
        assert!(s_curve(0.5, -0.6) > 0.5);
        assert!(approx(s_curve(0.0, -0.6), 0.0));
        assert!(approx(s_curve(1.0, -0.6), 1.0));
    }

    #[test]
    fn test_s_curve_is_odd() {
        let curve = AxisCurve::s_curve(0.4);
        for x in [0.1, 0.5, 0.9] {
            assert!(approx(evaluate(-x, &curve), -evaluate(x, &curve)));
        }
    }

    #[test]
    fn test_control_points_clamp_outside_domain() {
        let mut curve = AxisCurve::control_points(vec![(-0.5, -0.8), (0.0, 0.0), (0.5, 0.8)]);
        curve.symmetric = false;

        assert!(approx(evaluate(0.9, &curve), 0.8));
        assert!(approx(evaluate(-0.9, &curve), -0.8));
        assert!(approx(evaluate(0.0, &curve), 0.0));
    }

    #[test]
    fn test_control_points_collinear_is_linear() {
        let points = vec![(0.0, 0.0), (0.25, 0.25), (0.5, 0.5), (1.0, 1.0)];
        for x in [0.1, 0.3, 0.7, 0.95] {
            assert!(approx(interpolate(&points, x), x));
        }
    }

    #[test]
    fn test_control_points_symmetric_mirror() {
        let curve = AxisCurve::control_points(vec![(0.0, 0.0), (0.5, 0.2), (1.0, 1.0)]);

        let pos = evaluate(0.5, &curve);
        assert!(approx(pos, 0.2));
        assert!(approx(evaluate(-0.5, &curve), -pos));
    }

    #[test]
    fn test_control_points_flat_segment_stays_flat() {
        let points = vec![(0.0, 0.0), (0.3, 0.5), (0.7, 0.5), (1.0, 1.0)];
        for x in [0.35, 0.5, 0.65] {
            assert!(approx(interpolate(&points, x), 0.5));
        }
    }

    #[test]
    fn test_degenerate_point_lists() {
        assert_eq!(interpolate(&[], 0.3), 0.3);
        assert_eq!(interpolate(&[(0.0, 0.7)], 0.3), 0.7);
    }

    #[test]
    fn test_nan_is_centered() {
        assert_eq!(evaluate(f32::NAN, &AxisCurve::linear()), 0.0);
    }

    proptest! {
        #[test]
        fn prop_deadzone_band_is_zero(dz in 0.0f32..0.9, frac in -1.0f32..=1.0) {
            let curve = AxisCurve::s_curve(0.5).with_deadzone(dz);
            prop_assert_eq!(evaluate(frac * dz, &curve), 0.0);
        }

        #[test]
        fn prop_zero_curvature_is_identity(x in -1.0f32..=1.0) {
            let curve = AxisCurve::s_curve(0.0);
            prop_assert!((evaluate(x, &curve) - x).abs() < 1e-5);
        }

        #[test]
        fn prop_output_in_range(x in -2.0f32..2.0, c in -1.0f32..=1.0, dz in 0.0f32..0.5) {
            let curve = AxisCurve::s_curve(c).with_deadzone(dz);
            let y = evaluate(x, &curve);
            prop_assert!((-1.0..=1.0).contains(&y));
        }

        #[test]
        fn prop_s_curve_monotonic(a in -1.0f32..=1.0, b in -1.0f32..=1.0, c in -1.0f32..=1.0) {
            let curve = AxisCurve::s_curve(c);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(evaluate(lo, &curve) <= evaluate(hi, &curve) + 1e-6);
        }

        #[test]
        fn prop_control_points_monotonic(a in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let points = vec![(0.0, 0.0), (0.2, 0.05), (0.5, 0.5), (0.6, 0.9), (1.0, 1.0)];
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(interpolate(&points, lo) <= interpolate(&points, hi) + 1e-5);
        }
    }
}
