//! Uniform Catmull-Rom segment evaluation.
//!
//! `p0` and `p3` only shape the tangents; the curve runs from `p1` (t = 0) to `p2` (t = 1).

use glam::Vec3;

/// Point on the segment at local parameter `t ∈ [0, 1]`.
pub fn catmull_rom_point(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Derivative of [`catmull_rom_point`] with respect to `t`. Not normalized.
pub fn catmull_rom_tangent(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    0.5 * (-p0 + p2)
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * (1.5 * t2)
}
