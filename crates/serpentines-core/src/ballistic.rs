//! Constant-gravity trajectory preview.

use glam::Vec3;
use serpentines_platform::PolylineSink;

use crate::config::PreviewConfig;
use crate::error::{Result, TrailError};

/// `count` positions `time_step` seconds apart, starting at `origin`.
pub fn sample_trajectory(
    origin: Vec3,
    velocity: Vec3,
    gravity: Vec3,
    count: usize,
    time_step: f32,
) -> Vec<Vec3> {
    let mut points = Vec::with_capacity(count);
    sample_into(&mut points, origin, velocity, gravity, count, time_step);
    points
}

/// Like [`sample_trajectory`], reusing `points`' allocation.
pub fn sample_into(
    points: &mut Vec<Vec3>,
    origin: Vec3,
    velocity: Vec3,
    gravity: Vec3,
    count: usize,
    time_step: f32,
) {
    points.clear();
    points.extend((0..count).map(|i| match i {
        0 => origin,
        _ => {
            let t = i as f32 * time_step;
            origin + velocity * t + 0.5 * gravity * (t * t)
        }
    }));
}

/// Stateful preview: owns the polyline buffer and the scrolling material offset.
#[derive(Debug, Clone)]
pub struct TrajectoryPreview {
    config: PreviewConfig,
    points: Vec<Vec3>,
    texture_offset: f32,
    visible: bool,
}

impl TrajectoryPreview {
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            points: Vec::with_capacity(config.sample_count),
            config,
            texture_offset: 0.0,
            visible: false,
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn texture_offset(&self) -> f32 {
        self.texture_offset
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Resamples from `origin` with `velocity` and pushes the polyline to `sink`.
    pub fn update(
        &mut self,
        origin: Vec3,
        velocity: Vec3,
        sink: &mut dyn PolylineSink,
    ) -> Result<()> {
        let PreviewConfig {
            sample_count,
            time_step,
            gravity,
            texture_scroll_step,
            plane_depth,
        } = self.config;
        sample_into(&mut self.points, origin, velocity, gravity, sample_count, time_step);
        if let Some(z) = plane_depth {
            for point in &mut self.points {
                point.z = z;
            }
        }
        self.texture_offset += texture_scroll_step;
        self.visible = true;
        sink.show(&self.points, self.texture_offset).map_err(TrailError::Sink)
    }

    pub fn hide(&mut self, sink: &mut dyn PolylineSink) -> Result<()> {
        self.visible = false;
        self.points.clear();
        sink.hide().map_err(TrailError::Sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serpentines_platform::TracingPolylineSink;

    #[test]
    fn three_sample_arc() {
        let points = sample_trajectory(
            Vec3::ZERO,
            Vec3::new(5.0, 10.0, 0.0),
            Vec3::new(0.0, -9.8, 0.0),
            3,
            0.1,
        );
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Vec3::ZERO);
        assert_relative_eq!(points[1].x, 0.5, epsilon = 1e-2);
        assert_relative_eq!(points[1].y, 0.951, epsilon = 1e-2);
        assert_relative_eq!(points[2].x, 1.0, epsilon = 1e-2);
        assert_relative_eq!(points[2].y, 1.804, epsilon = 1e-2);
        assert_eq!(points[2].z, 0.0);
    }

    #[test]
    fn zero_velocity_only_falls() {
        let points = sample_trajectory(Vec3::ONE, Vec3::ZERO, Vec3::new(0.0, -10.0, 0.0), 4, 0.5);
        assert!(points.iter().all(|p| p.x == 1.0 && p.z == 1.0));
        assert_relative_eq!(points[3].y, 1.0 - 0.5 * 10.0 * 1.5 * 1.5);
    }

    #[test]
    fn empty_and_single_sample() {
        assert!(sample_trajectory(Vec3::ONE, Vec3::X, Vec3::ZERO, 0, 0.1).is_empty());
        assert_eq!(sample_trajectory(Vec3::ONE, Vec3::X, Vec3::ZERO, 1, 0.1), vec![Vec3::ONE]);
    }

    #[test]
    fn preview_scrolls_and_pins_depth() {
        let mut preview = TrajectoryPreview::new(PreviewConfig {
            plane_depth: Some(-2.0),
            ..PreviewConfig::default()
        });
        let mut sink = TracingPolylineSink::default();
        preview.update(Vec3::ZERO, Vec3::new(1.0, 4.0, 3.0), &mut sink).unwrap();
        preview.update(Vec3::ZERO, Vec3::new(1.0, 4.0, 3.0), &mut sink).unwrap();

        assert_eq!(sink.points.len(), 13);
        assert!(sink.points.iter().all(|p| p.z == -2.0));
        assert_relative_eq!(sink.texture_offset, 0.02, epsilon = 1e-6);
        assert!(sink.visible);

        preview.hide(&mut sink).unwrap();
        assert!(!sink.visible);
        assert!(!preview.is_visible());
        assert!(preview.points().is_empty());
    }
}
