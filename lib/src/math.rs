//! Math utilities.
use std::f64::consts;

use nalgebra::Vector2;

pub const TAU: f64 = 2.0 * consts::PI;

/// Build a vector from polar coordinates.
pub fn from_polar(r: f64, angle: f64) -> Vector2<f64> {
    Vector2::new(r * libm::cos(angle), r * libm::sin(angle))
}

/// Rotate `v` counterclockwise by `angle` radians.
pub fn rotate(v: Vector2<f64>, angle: f64) -> Vector2<f64> {
    let (s, c) = libm::sincos(angle);
    Vector2::new(v[0] * c - v[1] * s, v[0] * s + v[1] * c)
}

pub fn rotate_mut(v: &mut Vector2<f64>, angle: f64) {
    *v = rotate(*v, angle);
}

/// The z component of the 3D cross product of two planar vectors.
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_signed(angle: f64) -> f64 {
    let wrapped = wrap_angle(angle);
    if wrapped > consts::PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Find `x` in `[lo, hi]` such that `f(x) = target` for a monotone `f`.
///
/// The direction of monotonicity is taken from the bracket endpoints.
/// Iteration stops once the residual or the bracket width drops below
/// `tol`, or after `max_iter` halvings; the last midpoint is returned.
pub fn bisect(
    f: impl Fn(f64) -> f64,
    lo: f64,
    hi: f64,
    target: f64,
    tol: f64,
    max_iter: u64,
) -> f64 {
    let increasing = f(lo) <= f(hi);
    let mut l = lo;
    let mut r = hi;
    let mut m = (l + r) / 2.0;
    for _ in 0..max_iter {
        m = (l + r) / 2.0;
        let residual = f(m) - target;

        if residual.abs() < tol || (r - l).abs() < tol {
            break;
        }

        if (residual < 0.0) == increasing {
            l = m;
        } else {
            r = m;
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_counterclockwise() {
        let v = rotate(Vector2::new(1.0, 0.0), consts::FRAC_PI_2);
        assert!((v[0]).abs() < 1e-15);
        assert!((v[1] - 1.0).abs() < 1e-15);

        let mut w = Vector2::new(3.0, 4.0);
        rotate_mut(&mut w, consts::PI);
        assert!((w + Vector2::new(3.0, 4.0)).norm() < 1e-12);
    }

    #[test]
    fn angle_wrapping() {
        assert!((wrap_angle(-consts::FRAC_PI_2) - 1.5 * consts::PI).abs() < 1e-12);
        assert!((wrap_angle(5.0 * consts::PI) - consts::PI).abs() < 1e-12);
        assert!(wrap_angle(-1e-300) < TAU);
        assert!((wrap_signed(1.5 * consts::PI) + consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn bisect_handles_both_directions() {
        let up = bisect(|x| x * x, 0.0, 4.0, 2.0, 1e-12, 200);
        assert!((up - consts::SQRT_2).abs() < 1e-9);

        let down = bisect(|x| 10.0 - x, 0.0, 10.0, 3.0, 1e-12, 200);
        assert!((down - 7.0).abs() < 1e-9);
    }
}
