//! State interpolation.
//!
//! Pure routines that blend a remote copy's locally observed state toward
//! the last authoritative snapshot. Ported behavior notes:
//!
//! - Scalar blending snaps to the target once the two values are within
//!   [`SNAP_THRESHOLD`], so near-converged values never creep
//!   asymptotically.
//! - Vector equality compares per-axis *magnitudes*
//!   (`||a| - |b|| <= eps`), so opposite-signed components of equal
//!   magnitude are treated as equal. Legacy semantics, kept verbatim.
//! - Quaternion blending is component-wise by default and does not
//!   preserve unit norm. A proper spherical interpolation is available
//!   via [`QuatBlend::Spherical`].

use serde::{Deserialize, Serialize};

use crate::math::{Quat, Vec3};

/// Below this absolute difference a scalar blend snaps to the target.
pub const SNAP_THRESHOLD: f32 = 0.1;

/// Quaternion blending mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QuatBlend {
    /// Blend x/y/z/w independently. Does not preserve unit length.
    #[default]
    ComponentWise,
    /// Norm-preserving spherical interpolation.
    Spherical,
}

/// Tuning knobs for the correction step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterpParams {
    /// Blend weight toward the authoritative state per step.
    pub factor: f32,
    /// Per-axis magnitude threshold for treating vectors as equal.
    pub precision: f32,
    pub quat_blend: QuatBlend,
}

impl Default for InterpParams {
    fn default() -> Self {
        Self {
            factor: 0.01,
            precision: 1.0,
            quat_blend: QuatBlend::default(),
        }
    }
}

/// Blends `a` toward `b` by `t`, snapping when already close.
pub fn blend_scalar(a: f32, b: f32, t: f32) -> f32 {
    if (b - a).abs() < SNAP_THRESHOLD {
        b
    } else {
        (1.0 - t) * a + b * t
    }
}

/// Component-wise [`blend_scalar`] over x/y/z.
pub fn blend_vector(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    Vec3::new(
        blend_scalar(a.x, b.x, t),
        blend_scalar(a.y, b.y, t),
        blend_scalar(a.z, b.z, t),
    )
}

/// Component-wise [`blend_scalar`] over x/y/z/w.
pub fn blend_quat_component_wise(a: Quat, b: Quat, t: f32) -> Quat {
    Quat::new(
        blend_scalar(a.x, b.x, t),
        blend_scalar(a.y, b.y, t),
        blend_scalar(a.z, b.z, t),
        blend_scalar(a.w, b.w, t),
    )
}

/// Norm-preserving spherical interpolation between unit quaternions.
pub fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let t = t.clamp(0.0, 1.0);
    let mut cos_half = a.dot(b);
    // Take the short arc.
    let b = if cos_half < 0.0 {
        cos_half = -cos_half;
        Quat::new(-b.x, -b.y, -b.z, -b.w)
    } else {
        b
    };

    if cos_half > 0.9995 {
        // Nearly parallel: fall back to a normalized lerp.
        return Quat::new(
            a.x + (b.x - a.x) * t,
            a.y + (b.y - a.y) * t,
            a.z + (b.z - a.z) * t,
            a.w + (b.w - a.w) * t,
        )
        .normalized();
    }

    let half_angle = cos_half.clamp(-1.0, 1.0).acos();
    let sin_half = half_angle.sin();
    let wa = ((1.0 - t) * half_angle).sin() / sin_half;
    let wb = (t * half_angle).sin() / sin_half;
    Quat::new(
        a.x * wa + b.x * wb,
        a.y * wa + b.y * wb,
        a.z * wa + b.z * wb,
        a.w * wa + b.w * wb,
    )
}

/// Blends a rotation using the mode selected in `params`.
pub fn blend_quat(a: Quat, b: Quat, t: f32, mode: QuatBlend) -> Quat {
    match mode {
        QuatBlend::ComponentWise => blend_quat_component_wise(a, b, t),
        QuatBlend::Spherical => slerp(a, b, t),
    }
}

/// Per-axis magnitude comparison. When `with_precision` is false the
/// tolerance is exactly zero.
pub fn vectors_equal(a: Vec3, b: Vec3, epsilon: f32, with_precision: bool) -> bool {
    let tol = if with_precision { epsilon } else { 0.0 };
    (a.x.abs() - b.x.abs()).abs() <= tol
        && (a.y.abs() - b.y.abs()).abs() <= tol
        && (a.z.abs() - b.z.abs()).abs() <= tol
}

/// Velocity that would carry a body from `from` to `to` at the given
/// blend rate. Zero when the points already compare equal.
pub fn reconstruct_velocity(from: Vec3, to: Vec3, blend: f32, epsilon: f32) -> Vec3 {
    if !vectors_equal(from, to, epsilon, true) {
        (to - from) / (1.0 / blend)
    } else {
        Vec3::ZERO
    }
}

/// A body state sample fed into the correction step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

/// Corrected rotation and velocity for one smoothing step.
///
/// Position is deliberately absent: the remote body is steered by the
/// reconstructed velocity rather than warped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub rotation: Quat,
    pub velocity: Vec3,
}

/// One smoothing step of the observed state toward the authoritative one.
///
/// The corrected velocity is the blended velocity plus a velocity
/// reconstructed from the positional error. If every axis of that result
/// is at or below `precision`, the reconstructed term alone is used so a
/// stalled body still closes the gap.
pub fn correct(observed: &Sample, target: &Sample, params: &InterpParams) -> Correction {
    let rotation = blend_quat(
        observed.rotation,
        target.rotation,
        params.factor,
        params.quat_blend,
    );

    let mut velocity = blend_vector(observed.velocity, target.velocity, params.factor)
        + reconstruct_velocity(observed.position, target.position, 1.0, params.precision);

    if velocity.x <= params.precision
        && velocity.y <= params.precision
        && velocity.z <= params.precision
    {
        velocity = reconstruct_velocity(observed.position, target.position, 1.0, params.precision);
    }

    Correction { rotation, velocity }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_scalar_snaps_when_close() {
        // |b - a| < 0.1 returns b exactly, regardless of t.
        assert_eq!(blend_scalar(1.0, 1.05, 0.0), 1.05);
        assert_eq!(blend_scalar(1.0, 1.05, 1.0), 1.05);
        assert_eq!(blend_scalar(-0.04, 0.04, 0.3), 0.04);
    }

    #[test]
    fn blend_scalar_lerps_when_far() {
        assert_eq!(blend_scalar(0.0, 10.0, 0.25), 2.5);
        assert_eq!(blend_scalar(10.0, 0.0, 0.25), 7.5);
    }

    #[test]
    fn vectors_equal_is_reflexive() {
        let v = Vec3::new(3.0, -7.5, 0.125);
        assert!(vectors_equal(v, v, 1.0, true));
        assert!(vectors_equal(v, v, 0.0, false));
    }

    #[test]
    fn vectors_equal_compares_magnitudes() {
        // Legacy semantics: opposite-signed components of equal magnitude
        // compare equal even with zero tolerance.
        let a = Vec3::new(5.0, -2.0, 1.0);
        let b = Vec3::new(-5.0, 2.0, -1.0);
        assert!(vectors_equal(a, b, 0.0, false));
        assert!(!vectors_equal(a, Vec3::new(5.0, 4.0, 1.0), 1.0, true));
    }

    #[test]
    fn reconstruct_velocity_zero_on_equal_points() {
        let a = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(reconstruct_velocity(a, a, 0.5, 1.0), Vec3::ZERO);
    }

    #[test]
    fn reconstruct_velocity_scales_delta() {
        let from = Vec3::ZERO;
        let to = Vec3::new(10.0, 0.0, 0.0);
        let v = reconstruct_velocity(from, to, 0.5, 1.0);
        assert_eq!(v, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn component_blend_does_not_preserve_norm() {
        let a = Quat::IDENTITY;
        let b = Quat::new(0.0, 0.0, (0.5f32).sqrt(), (0.5f32).sqrt());
        let blended = blend_quat_component_wise(a, b, 0.5);
        assert!((blended.length() - 1.0).abs() > 1e-3);

        let spherical = slerp(a, b, 0.5);
        assert!((spherical.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn correct_reconstructs_velocity_from_position_error() {
        let observed = Sample {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
        };
        let target = Sample {
            position: Vec3::new(10.0, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
        };
        let c = correct(&observed, &target, &InterpParams::default());
        assert_eq!(c.velocity, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn correct_falls_back_when_every_axis_is_slow() {
        // Positions already compare equal, so the reconstructed term is
        // zero; the blended velocity sits below precision on every axis
        // and is discarded in favor of the reconstructed one.
        let observed = Sample {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::new(0.5, 0.5, 0.5),
        };
        let target = Sample {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::new(0.5, 0.5, 0.5),
        };
        let c = correct(&observed, &target, &InterpParams::default());
        assert_eq!(c.velocity, Vec3::ZERO);
    }
}
