//! Vector and angle helpers shared by the derivation stages.

use glam::{Mat4, Quat, Vec4};

/// Wrap `x` into `[-half_range, half_range]` with period `2 * half_range`.
#[inline]
pub fn loop_angle_rad(x: f32, half_range: f32) -> f32 {
    if half_range <= 0.0 || !x.is_finite() {
        return 0.0;
    }
    let span = 2.0 * half_range;
    (x + half_range).rem_euclid(span) - half_range
}

/// Sign of `x` as -1, 0, or 1. Unlike `f32::signum`, zero maps to zero.
#[inline]
pub(crate) fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// `acos` over a dot product, clamped against rounding drift outside
/// `[-1, 1]`.
#[inline]
pub(crate) fn acos_clamped(dot: f32) -> f32 {
    dot.clamp(-1.0, 1.0).acos()
}

/// Zero when `x` is NaN or infinite.
#[inline]
pub(crate) fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

/// The rotation block of `transform` with the translation zeroed.
#[inline]
pub(crate) fn rotation_only(transform: &Mat4) -> Mat4 {
    Mat4::from_cols(
        transform.x_axis,
        transform.y_axis,
        transform.z_axis,
        Vec4::W,
    )
}

/// Unit quaternion for the rotation block, falling back to identity when
/// the matrix degenerates into something non-finite.
#[inline]
pub(crate) fn rotation_quat(rotation: &Mat4) -> Quat {
    let q = Quat::from_mat4(rotation);
    if q.is_finite() && q.length_squared() > f32::EPSILON {
        q.normalize()
    } else {
        Quat::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_loop_angle_identity_inside_range() {
        assert!((loop_angle_rad(0.3, FRAC_PI_2) - 0.3).abs() < 1e-6);
        assert!((loop_angle_rad(-1.2, FRAC_PI_2) - (-1.2)).abs() < 1e-6);
    }

    #[test]
    fn test_loop_angle_wraps() {
        // Just past the positive edge comes back in from the negative edge.
        let wrapped = loop_angle_rad(FRAC_PI_2 + 0.1, FRAC_PI_2);
        assert!((wrapped - (-FRAC_PI_2 + 0.1)).abs() < 1e-5);

        let wrapped = loop_angle_rad(-PI, FRAC_PI_2);
        assert!(wrapped.abs() < 1e-5);
    }

    #[test]
    fn test_loop_angle_non_finite() {
        assert_eq!(loop_angle_rad(f32::NAN, FRAC_PI_2), 0.0);
        assert_eq!(loop_angle_rad(1.0, 0.0), 0.0);
    }

    #[test]
    fn test_sign_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(3.5), 1.0);
        assert_eq!(sign(-0.1), -1.0);
    }

    #[test]
    fn test_acos_clamped_tolerates_drift() {
        assert_eq!(acos_clamped(1.0 + 1e-6), 0.0);
        assert!((acos_clamped(-1.0 - 1e-6) - PI).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_quat_degenerate_matrix() {
        let broken = Mat4::from_cols(
            glam::Vec4::splat(f32::NAN),
            glam::Vec4::Y,
            glam::Vec4::Z,
            glam::Vec4::W,
        );
        assert_eq!(rotation_quat(&broken), Quat::IDENTITY);
    }
}
