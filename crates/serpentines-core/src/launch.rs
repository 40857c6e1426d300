//! Pull-to-throw launch math: the velocity shown by the preview is the velocity the
//! object is thrown with.

use glam::Vec3;

use crate::config::LaunchConfig;

/// Clamps `pointer` to within `max_distance` of the pull start, keeping the pointer's z.
pub fn clamp_pull(start: Vec3, pointer: Vec3, max_distance: f32) -> Vec3 {
    let offset = pointer - start;
    if offset.length() <= max_distance {
        return pointer;
    }
    let clamped = start + offset.normalize_or_zero() * max_distance;
    Vec3::new(clamped.x, clamped.y, pointer.z)
}

/// Launch velocity for a pull from `start` to `handle`.
///
/// The throw goes opposite the pull and scales with the pull distance, so speed
/// grows quadratically with how far the handle is dragged. Only x and y are driven.
pub fn launch_velocity(start: Vec3, handle: Vec3, config: &LaunchConfig) -> Vec3 {
    let pull = start - handle;
    let distance = start.distance(handle);
    let scale = config.throw_speed * distance * config.helper_coefficient;
    Vec3::new(pull.x * scale, pull.y * scale, 0.0)
}
