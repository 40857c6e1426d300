//! Arc-length parametrized Catmull-Rom spline.
//!
//! Knots are kept in curve order. Four consecutive knots `[i, i + 3]` define segment
//! `i`, which runs from knot `i + 1` to knot `i + 2`; the very first and very last
//! knots are phantom tangent controls and are never rendered. Each segment is
//! tessellated into `sub_segments` linear pieces whose cumulative lengths are cached
//! on the knot the segment ends at (`i + 2`), so lookups by distance never touch the
//! cubic again.

use glam::Vec3;

use crate::curve::{catmull_rom_point, catmull_rom_tangent};

pub const DEFAULT_SUB_SEGMENTS: usize = 10;

/// Knots needed before the first segment exists.
pub const MIN_KNOTS: usize = 4;

/// Offset from a segment index to the knot that owns its sub-samples.
const SEGMENT_OWNER_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubSample {
    /// Cumulative arc-length from the start of the spline.
    pub length: f32,
    pub position: Vec3,
    /// Unit tangent, or zero where the curve is degenerate.
    pub tangent: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Knot {
    pub position: Vec3,
    /// `None` until the segment ending at this knot has been parametrized.
    arc_length: Option<f32>,
    sub_samples: Vec<SubSample>,
}

impl Knot {
    fn new(position: Vec3, sub_segments: usize) -> Self {
        Self {
            position,
            arc_length: None,
            sub_samples: vec![SubSample::default(); sub_segments + 1],
        }
    }

    pub fn arc_length(&self) -> Option<f32> {
        self.arc_length
    }

    pub fn sub_samples(&self) -> &[SubSample] {
        &self.sub_samples
    }

    /// Marks the knot unparametrized. Sub-samples are left in place and overwritten
    /// on the next parametrization.
    pub fn invalidate(&mut self) {
        self.arc_length = None;
    }
}

/// Resumable cursor into the sub-sample table.
///
/// A marker is a plain index handle. It stays meaningful across spline mutation only
/// if the caller knows the referenced segment is still there; reads through a stale
/// marker return zero vectors rather than panicking.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Marker {
    pub segment: usize,
    pub lower: usize,
    pub upper: usize,
    /// Interpolation ratio between `lower` and `upper`, in `[0, 1]`.
    pub ratio: f32,
}

#[derive(Debug, Clone)]
pub struct Spline {
    knots: Vec<Knot>,
    sub_segments: usize,
}

impl Default for Spline {
    fn default() -> Self {
        Self::new(DEFAULT_SUB_SEGMENTS)
    }
}

impl Spline {
    pub fn new(sub_segments: usize) -> Self {
        Self {
            knots: Vec::new(),
            sub_segments: sub_segments.max(1),
        }
    }

    pub fn sub_segments(&self) -> usize {
        self.sub_segments
    }

    pub fn knots(&self) -> &[Knot] {
        &self.knots
    }

    pub fn knot_count(&self) -> usize {
        self.knots.len()
    }

    pub fn last_position(&self) -> Option<Vec3> {
        self.knots.last().map(|k| k.position)
    }

    pub fn append(&mut self, position: Vec3) {
        self.knots.push(Knot::new(position, self.sub_segments));
    }

    pub fn clear(&mut self) {
        self.knots.clear();
    }

    /// Replaces every knot with `count` knots stacked on `position`.
    pub fn reseed(&mut self, position: Vec3, count: usize) {
        self.clear();
        for _ in 0..count {
            self.append(position);
        }
    }

    /// Drags the phantom tail knot and the newest rendered knot onto `position`.
    ///
    /// Invalidates the segments those two knots shape so they are re-integrated on
    /// the next parametrization.
    pub fn move_tail(&mut self, position: Vec3) {
        let n = self.knots.len();
        for knot in &mut self.knots[n.saturating_sub(2)..] {
            knot.position = position;
        }
        // Knot n-2 shapes segments n-5 and n-4, owned by knots n-3 and n-2.
        for knot in &mut self.knots[n.saturating_sub(3)..] {
            knot.invalidate();
        }
    }

    pub fn segment_count(&self) -> usize {
        self.knots.len().saturating_sub(MIN_KNOTS - 1)
    }

    /// Cached cumulative length at the end of `segment`, if parametrized.
    pub fn segment_length(&self, segment: usize) -> Option<f32> {
        self.owner(segment).and_then(|k| k.arc_length)
    }

    pub fn total_length(&self) -> f32 {
        match self.segment_count() {
            0 => 0.0,
            n => self.segment_length(n - 1).unwrap_or(0.0).max(0.0),
        }
    }

    fn owner(&self, segment: usize) -> Option<&Knot> {
        if segment >= self.segment_count() {
            return None;
        }
        self.knots.get(segment + SEGMENT_OWNER_OFFSET)
    }

    fn sub_samples(&self, segment: usize) -> Option<&[SubSample]> {
        self.owner(segment).map(|k| k.sub_samples.as_slice())
    }

    fn control_points(&self, segment: usize) -> [Vec3; 4] {
        let k = &self.knots[segment..segment + MIN_KNOTS];
        [k[0].position, k[1].position, k[2].position, k[3].position]
    }

    pub fn parametrize_all(&mut self) {
        let n = self.segment_count();
        if n > 0 {
            self.parametrize(0, n - 1);
        }
    }

    /// Re-integrates segments `from..=to` (clamped to the valid range).
    ///
    /// The running total is seeded from the segment before `from`; if that one has
    /// never been parametrized the range is widened backwards until it is.
    pub fn parametrize(&mut self, from: usize, to: usize) {
        let n = self.segment_count();
        if n == 0 {
            return;
        }
        let to = to.min(n - 1);
        let mut from = from.min(to);
        while from > 0 && self.segment_length(from - 1).is_none() {
            from -= 1;
        }

        let mut total = match from {
            0 => 0.0,
            _ => self.segment_length(from - 1).unwrap_or(0.0),
        };
        let step = 1.0 / self.sub_segments as f32;

        for segment in from..=to {
            let [p0, p1, p2, p3] = self.control_points(segment);
            let owner = &mut self.knots[segment + SEGMENT_OWNER_OFFSET];
            let mut previous = p1;
            for (j, sample) in owner.sub_samples.iter_mut().enumerate() {
                let t = j as f32 * step;
                let position = catmull_rom_point(p0, p1, p2, p3, t);
                total += position.distance(previous);
                *sample = SubSample {
                    length: total,
                    position,
                    tangent: catmull_rom_tangent(p0, p1, p2, p3, t).normalize_or_zero(),
                };
                previous = position;
            }
            owner.arc_length = Some(total);
        }
    }

    /// Locates the sub-sample bracket containing `distance`.
    ///
    /// Passing the marker from a previous call with a smaller or equal distance
    /// resumes the scan from there, which makes a forward walk O(1) amortized.
    /// Returns `None` when the spline has no segments.
    pub fn place_marker(&self, distance: f32, from: Option<&Marker>) -> Option<Marker> {
        let n = self.segment_count();
        if n == 0 {
            return None;
        }
        let last_upper = self.sub_segments;

        if distance.is_nan() || distance <= 0.0 {
            return Some(Marker {
                segment: 0,
                lower: 0,
                upper: 1,
                ratio: 0.0,
            });
        }
        let clamp_end = Marker {
            segment: n - 1,
            lower: last_upper - 1,
            upper: last_upper,
            ratio: 1.0,
        };
        if distance >= self.total_length() {
            return Some(clamp_end);
        }

        let (mut start_segment, mut start_sample) = match from {
            Some(m) if m.segment < n => (m.segment, m.lower.clamp(1, last_upper)),
            _ => (0, 1),
        };
        if start_segment > 0 && !self.reached(start_segment - 1, distance) {
            start_segment = 0;
            start_sample = 1;
        }

        for segment in start_segment..n {
            match self.segment_length(segment) {
                Some(end) if distance <= end => {}
                _ => continue,
            }
            let samples = self.sub_samples(segment)?;
            let first = if segment == start_segment { start_sample } else { 1 };
            let first = if samples[first - 1].length < distance {
                first
            } else {
                1
            };
            let upper = (first..samples.len())
                .find(|&j| distance <= samples[j].length)
                .unwrap_or(last_upper);
            return Some(Marker {
                segment,
                lower: upper - 1,
                upper,
                ratio: bracket_ratio(samples[upper - 1].length, samples[upper].length, distance),
            });
        }

        Some(clamp_end)
    }

    /// `true` once the cumulative length at the end of `segment` is below `distance`.
    fn reached(&self, segment: usize, distance: f32) -> bool {
        matches!(self.segment_length(segment), Some(end) if end < distance)
    }

    /// Re-places `marker` at `distance`, resuming from its current position.
    pub fn move_marker(&self, marker: &mut Marker, distance: f32) -> bool {
        match self.place_marker(distance, Some(marker)) {
            Some(placed) => {
                *marker = placed;
                true
            }
            None => false,
        }
    }

    pub fn position(&self, marker: &Marker) -> Vec3 {
        self.bracket(marker)
            .map(|(a, b)| a.position.lerp(b.position, marker.ratio))
            .unwrap_or(Vec3::ZERO)
    }

    /// Interpolated tangent. Not renormalized between sub-samples.
    pub fn tangent(&self, marker: &Marker) -> Vec3 {
        self.bracket(marker)
            .map(|(a, b)| a.tangent.lerp(b.tangent, marker.ratio))
            .unwrap_or(Vec3::ZERO)
    }

    fn bracket(&self, marker: &Marker) -> Option<(&SubSample, &SubSample)> {
        let samples = self.sub_samples(marker.segment)?;
        Some((samples.get(marker.lower)?, samples.get(marker.upper)?))
    }

    pub fn position_at(&self, distance: f32) -> Vec3 {
        self.place_marker(distance, None)
            .map(|m| self.position(&m))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn tangent_at(&self, distance: f32) -> Vec3 {
        self.place_marker(distance, None)
            .map(|m| self.tangent(&m))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn binormal(tangent: Vec3, normal: Vec3) -> Vec3 {
        tangent.cross(normal).normalize_or_zero()
    }
}

/// `1 - (hi - d) / (hi - lo)`, with zero-width brackets snapping to an end.
fn bracket_ratio(lo: f32, hi: f32, distance: f32) -> f32 {
    let span = hi - lo;
    if span <= f32::EPSILON {
        return if distance >= hi { 1.0 } else { 0.0 };
    }
    (1.0 - (hi - distance) / span).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight(count: usize) -> Spline {
        let mut spline = Spline::default();
        for i in 0..count {
            spline.append(Vec3::new(i as f32, 0.0, 0.0));
        }
        spline.parametrize_all();
        spline
    }

    fn wavy(count: usize) -> Spline {
        let mut spline = Spline::default();
        for i in 0..count {
            let x = i as f32 * 0.7;
            spline.append(Vec3::new(x, (x * 1.3).sin() * 2.0, (x * 0.4).cos()));
        }
        spline.parametrize_all();
        spline
    }

    #[test]
    fn straight_line_scenario() {
        let spline = straight(5);
        assert_eq!(spline.segment_count(), 2);
        assert_relative_eq!(spline.total_length(), 2.0, epsilon = 1e-4);
        let p = spline.position_at(1.5);
        assert_relative_eq!(p.x, 2.5, epsilon = 1e-4);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_splines_return_neutral_values() {
        for count in 0..MIN_KNOTS {
            let spline = straight(count);
            assert_eq!(spline.segment_count(), 0);
            assert_eq!(spline.total_length(), 0.0);
            assert!(spline.place_marker(1.0, None).is_none());
            assert_eq!(spline.position_at(0.5), Vec3::ZERO);
            assert_eq!(spline.tangent_at(0.5), Vec3::ZERO);
            assert_eq!(spline.position(&Marker::default()), Vec3::ZERO);
        }
    }

    #[test]
    fn marker_clamps_at_both_ends() {
        let spline = wavy(8);
        let start = spline.place_marker(0.0, None).unwrap();
        assert_eq!((start.segment, start.lower, start.upper), (0, 0, 1));
        assert_eq!(start.ratio, 0.0);
        assert_eq!(spline.position(&start), spline.knots()[1].position);

        let end = spline.place_marker(spline.total_length(), None).unwrap();
        assert_eq!(end.segment, spline.segment_count() - 1);
        assert_eq!((end.lower, end.upper), (9, 10));
        assert_eq!(end.ratio, 1.0);
        let last = spline.knots()[spline.knot_count() - 2].position;
        assert!((spline.position(&end) - last).length() < 1e-4);

        let negative = spline.place_marker(-3.0, None).unwrap();
        assert_eq!(negative, start);
        let nan = spline.place_marker(f32::NAN, None).unwrap();
        assert_eq!(nan, start);
    }

    #[test]
    fn sub_sample_lengths_are_monotonic() {
        let spline = wavy(12);
        let mut previous = 0.0;
        for segment in 0..spline.segment_count() {
            for sample in spline.sub_samples(segment).unwrap() {
                assert!(sample.length >= previous);
                previous = sample.length;
            }
        }
        assert_eq!(spline.total_length(), previous);
    }

    #[test]
    fn resumed_marker_matches_fresh_search() {
        let spline = wavy(12);
        let total = spline.total_length();
        let mut marker = spline.place_marker(0.0, None).unwrap();
        let mut d = 0.0;
        while d < total + 0.5 {
            let fresh = spline.place_marker(d, None).unwrap();
            assert!(spline.move_marker(&mut marker, d));
            assert_eq!(
                (marker.segment, marker.lower, marker.upper),
                (fresh.segment, fresh.lower, fresh.upper)
            );
            assert_relative_eq!(marker.ratio, fresh.ratio, epsilon = 1e-6);
            d += 0.137;
        }
    }

    #[test]
    fn backwards_move_falls_back_to_full_scan() {
        let spline = wavy(12);
        let far = spline.place_marker(spline.total_length() * 0.9, None).unwrap();
        let near = spline.place_marker(0.4, Some(&far)).unwrap();
        assert_eq!(near, spline.place_marker(0.4, None).unwrap());
    }

    #[test]
    fn stale_marker_reads_zero() {
        let spline = straight(5);
        let stale = Marker {
            segment: 40,
            lower: 3,
            upper: 4,
            ratio: 0.5,
        };
        assert_eq!(spline.position(&stale), Vec3::ZERO);
        assert_eq!(spline.tangent(&stale), Vec3::ZERO);
        // Resuming from it must not read out of bounds either.
        assert!(spline.place_marker(1.0, Some(&stale)).is_some());
    }

    #[test]
    fn zero_width_bracket_snaps_without_nan() {
        assert_eq!(bracket_ratio(1.0, 1.0, 1.0), 1.0);
        assert_eq!(bracket_ratio(1.0, 1.0, 0.5), 0.0);
        let mut spline = Spline::default();
        spline.reseed(Vec3::ONE, 5);
        spline.parametrize_all();
        assert_eq!(spline.total_length(), 0.0);
        let m = spline.place_marker(0.0, None).unwrap();
        assert!(!m.ratio.is_nan());
        assert_eq!(spline.position(&m), Vec3::ONE);
    }

    #[test]
    fn partial_parametrize_extends_over_unparametrized_predecessors() {
        let mut spline = Spline::default();
        for i in 0..10 {
            spline.append(Vec3::new(i as f32, 0.0, 0.0));
        }
        spline.parametrize(5, 6);
        assert!(spline.segment_length(0).is_some());
        assert_relative_eq!(spline.total_length(), 7.0, epsilon = 1e-4);
    }

    #[test]
    fn trailing_window_matches_full_parametrization() {
        let mut incremental = Spline::default();
        let mut full = Spline::default();
        for i in 0..15 {
            let p = Vec3::new(i as f32 * 0.5, (i as f32).sin(), 0.0);
            incremental.append(p);
            full.append(p);
            let n = incremental.segment_count();
            incremental.parametrize(n.saturating_sub(3), n);
        }
        full.parametrize_all();
        assert_relative_eq!(incremental.total_length(), full.total_length(), epsilon = 1e-4);
    }

    #[test]
    fn move_tail_invalidates_and_moves_last_two() {
        let mut spline = straight(6);
        spline.move_tail(Vec3::new(9.0, 0.0, 0.0));
        let knots = spline.knots();
        assert_eq!(knots[5].position.x, 9.0);
        assert_eq!(knots[4].position.x, 9.0);
        assert_eq!(knots[3].position.x, 3.0);
        assert!(knots[3].arc_length().is_none());
        assert!(knots[2].arc_length().is_some());
    }

    #[test]
    fn binormal_is_unit_and_perpendicular() {
        let b = Spline::binormal(Vec3::new(2.0, 0.0, 0.0), Vec3::Z);
        assert_relative_eq!(b.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(b.y, -1.0, epsilon = 1e-6);
        assert_eq!(Spline::binormal(Vec3::Z, Vec3::Z), Vec3::ZERO);
    }
}
