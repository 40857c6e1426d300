//! Quad-strip ribbon following a [`Spline`].
//!
//! Buffers are an arena sized in quads: `allocated_quads` is the capacity, the drawn
//! range is recomputed every frame from the spline length. Only the newest
//! `redraw_length` of the ribbon is rewritten per frame; everything before
//! `last_starting_quad` is frozen in place.

use glam::{Vec2, Vec3};
use serpentines_platform::MeshUpload;
use tracing::{debug, info, warn};

use crate::config::{MeshBudget, TrailPreset};
use crate::spline::Spline;

pub const VERTICES_PER_QUAD: usize = 4;
pub const TRIANGLE_INDICES_PER_QUAD: usize = 6;

const QUAD_UVS: [Vec2; VERTICES_PER_QUAD] = [
    Vec2::new(0.0, 1.0),
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
];

/// Parallel vertex, UV and triangle-index buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RibbonMesh {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub triangles: Vec<u32>,
}

impl RibbonMesh {
    fn with_quads(quads: usize) -> Self {
        Self {
            positions: vec![Vec3::ZERO; quads * VERTICES_PER_QUAD],
            uvs: vec![Vec2::ZERO; quads * VERTICES_PER_QUAD],
            triangles: vec![0; quads * TRIANGLE_INDICES_PER_QUAD],
        }
    }

    /// Grows to `quads`, keeping existing contents at their indices.
    fn reallocate(&mut self, quads: usize) {
        self.positions.resize(quads * VERTICES_PER_QUAD, Vec3::ZERO);
        self.uvs.resize(quads * VERTICES_PER_QUAD, Vec2::ZERO);
        self.triangles.resize(quads * TRIANGLE_INDICES_PER_QUAD, 0);
    }

    /// Moves quads `[from, to)` to the front and re-bases their triangle indices.
    fn shift_to_front(&mut self, from: usize, to: usize) {
        if to <= from {
            return;
        }
        let (v0, v1) = (from * VERTICES_PER_QUAD, to * VERTICES_PER_QUAD);
        self.positions.copy_within(v0..v1, 0);
        self.uvs.copy_within(v0..v1, 0);

        let (t0, t1) = (from * TRIANGLE_INDICES_PER_QUAD, to * TRIANGLE_INDICES_PER_QUAD);
        self.triangles.copy_within(t0..t1, 0);
        let rebase = v0 as u32;
        for index in &mut self.triangles[..t1 - t0] {
            *index = index.saturating_sub(rebase);
        }
    }

    /// Vertex positions of quad `quad`.
    pub fn quad(&self, quad: usize) -> &[Vec3] {
        let start = quad * VERTICES_PER_QUAD;
        &self.positions[start..start + VERTICES_PER_QUAD]
    }
}

/// What [`RibbonBuilder::grow`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    Fits,
    /// Capacity went from `from` to `to` quads after sliding `compacted` quads off the front.
    Grown {
        from: usize,
        to: usize,
        compacted: usize,
    },
    /// The vertex index ceiling was hit and the builder was cleared.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RibbonFrame {
    pub visible_length: f32,
    pub drawn_quads: usize,
    pub first_redrawn_quad: usize,
    pub growth: Growth,
}

#[derive(Debug, Clone)]
pub struct RibbonBuilder {
    preset: TrailPreset,
    budget: MeshBudget,
    seed_knots: usize,
    mesh: RibbonMesh,
    allocated_quads: usize,
    last_starting_quad: usize,
    quad_offset: usize,
    max_triangle_indices: usize,
    drawn_quads: usize,
}

impl RibbonBuilder {
    /// `seed_knots` is how many knots the spline is reseeded with when the
    /// index ceiling forces a reset.
    pub fn new(preset: TrailPreset, budget: MeshBudget, seed_knots: usize) -> Self {
        let mut builder = Self {
            preset,
            budget,
            seed_knots,
            mesh: RibbonMesh::default(),
            allocated_quads: 0,
            last_starting_quad: 0,
            quad_offset: 0,
            max_triangle_indices: 0,
            drawn_quads: 0,
        };
        builder.reset_buffers();
        builder
    }

    pub fn preset(&self) -> &TrailPreset {
        &self.preset
    }

    pub fn mesh(&self) -> &RibbonMesh {
        &self.mesh
    }

    pub fn allocated_quads(&self) -> usize {
        self.allocated_quads
    }

    pub fn drawn_quads(&self) -> usize {
        self.drawn_quads
    }

    pub fn last_starting_quad(&self) -> usize {
        self.last_starting_quad
    }

    pub fn quad_offset(&self) -> usize {
        self.quad_offset
    }

    pub fn upload(&self) -> MeshUpload<'_> {
        MeshUpload {
            positions: &self.mesh.positions,
            uvs: &self.mesh.uvs,
            triangles: &self.mesh.triangles,
            drawn_quads: self.drawn_quads,
        }
    }

    /// Drops all geometry and returns to the base allocation.
    pub fn clear(&mut self) {
        info!("clearing ribbon ({} quads allocated)", self.allocated_quads);
        self.reset_buffers();
    }

    fn reset_buffers(&mut self) {
        self.allocated_quads = self.budget.base_quads;
        self.mesh = RibbonMesh::with_quads(self.allocated_quads);
        self.last_starting_quad = 0;
        self.quad_offset = 0;
        self.max_triangle_indices = 0;
        self.drawn_quads = 0;
    }

    /// Brings the mesh up to date with `spline`.
    ///
    /// Re-integrates the trailing segments, grows the buffers if needed and redraws
    /// the quads from `last_starting_quad` onwards. A ceiling reset also reseeds the
    /// spline at its newest knot.
    pub fn rebuild(&mut self, spline: &mut Spline) -> RibbonFrame {
        self.reparametrize(spline);
        let (mut length, mut target) = self.measure(spline);

        let mut growth = Growth::Fits;
        if self.allocated_quads < target {
            growth = self.grow(target);
            if growth == Growth::Reset {
                let anchor = spline.last_position().unwrap_or(Vec3::ZERO);
                spline.reseed(anchor, self.seed_knots);
                spline.parametrize_all();
            }
            (length, target) = self.measure(spline);
        }

        let start = self.last_starting_quad;
        let end = target.saturating_sub(1);
        self.max_triangle_indices = self
            .max_triangle_indices
            .max(end * TRIANGLE_INDICES_PER_QUAD);

        self.draw(spline, start, end, length);

        // Stale quads from a longer frame would otherwise keep rendering.
        if end * TRIANGLE_INDICES_PER_QUAD < self.max_triangle_indices {
            self.mesh.triangles[end * TRIANGLE_INDICES_PER_QUAD..self.max_triangle_indices]
                .fill(0);
        }

        let redraw_quads = (self.budget.redraw_length / self.preset.quad_width) as usize
            + self.budget.redraw_margin;
        self.last_starting_quad = target.saturating_sub(redraw_quads);
        self.drawn_quads = end;

        RibbonFrame {
            visible_length: length,
            drawn_quads: end,
            first_redrawn_quad: start,
            growth,
        }
    }

    fn reparametrize(&self, spline: &mut Spline) {
        match self.budget.reparametrize_window {
            0 => spline.parametrize_all(),
            window => {
                let n = spline.segment_count();
                spline.parametrize(n.saturating_sub(window), n);
            }
        }
    }

    /// Visible length and the quad count it needs, in buffer (post-offset) units.
    fn measure(&self, spline: &Spline) -> (f32, usize) {
        let length = (spline.total_length() - self.preset.trim_epsilon).max(0.0);
        let quads = (length / self.preset.quad_width) as usize + 1;
        (length, quads.saturating_sub(self.quad_offset))
    }

    fn draw(&mut self, spline: &Spline, start: usize, end: usize, length: f32) {
        if start >= end {
            return;
        }
        let width = self.preset.quad_width;
        let normal = self.preset.normal;
        let offset = self.quad_offset;
        let distance_of = move |quad: usize| (quad + offset) as f32 * width;

        let Some(mut marker) = spline.place_marker(distance_of(start), None) else {
            return;
        };
        let mut last_position = spline.position(&marker);
        let mut last_tangent = spline.tangent(&marker);
        let mut last_binormal = Spline::binormal(last_tangent, normal);

        for quad in start..end {
            let last_distance = distance_of(quad);
            spline.move_marker(&mut marker, distance_of(quad + 1));
            let position = spline.position(&marker);
            let tangent = spline.tangent(&marker);
            let binormal = Spline::binormal(tangent, normal);

            // The continuous fade only gates visibility: any positive multiplier draws
            // at full height. Whether a smooth taper was intended is still open.
            let fade = fade_multiplier(
                last_distance,
                length,
                self.preset.fade_band,
                self.preset.fade_start_offset,
            );
            let half_height = if fade > 0.0 { self.preset.quad_height * 0.5 } else { 0.0 };

            let base = last_position + last_tangent * (width * -0.5);
            let side = last_binormal * half_height;
            let along = last_tangent * width;

            let v = quad * VERTICES_PER_QUAD;
            self.mesh.positions[v..v + VERTICES_PER_QUAD].copy_from_slice(&[
                base + side,
                base - side,
                base + along + side,
                base + along - side,
            ]);
            self.mesh.uvs[v..v + VERTICES_PER_QUAD].copy_from_slice(&QUAD_UVS);

            let t = quad * TRIANGLE_INDICES_PER_QUAD;
            let i = v as u32;
            self.mesh.triangles[t..t + TRIANGLE_INDICES_PER_QUAD]
                .copy_from_slice(&[i, i + 1, i + 2, i + 2, i + 1, i + 3]);

            last_position = position;
            last_tangent = tangent;
            last_binormal = binormal;
        }
    }

    /// Makes room for `target_quads` quads (buffer units).
    ///
    /// With `compact_on_grow`, the frozen prefix before `last_starting_quad` is
    /// discarded first by sliding the live window to index 0. Remaining shortfall is
    /// covered in `quad_increment` steps; if that would cross the vertex index
    /// ceiling the builder is cleared instead and [`Growth::Reset`] is returned.
    pub fn grow(&mut self, target_quads: usize) -> Growth {
        let mut compacted = 0;
        if self.budget.compact_on_grow && self.last_starting_quad > 0 {
            compacted = self.last_starting_quad;
            self.mesh
                .shift_to_front(compacted, target_quads.min(self.allocated_quads));
            self.quad_offset += compacted;
            self.last_starting_quad = 0;
            debug!(
                "compacted ribbon by {compacted} quads (offset now {})",
                self.quad_offset
            );
        }

        let needed = target_quads.saturating_sub(compacted);
        let from = self.allocated_quads;
        let mut quads = from;
        while quads < needed {
            let next = quads + self.budget.quad_increment;
            if next * VERTICES_PER_QUAD > self.budget.max_vertex_index {
                warn!(
                    "ribbon needs {needed} quads, past the {} vertex ceiling; restarting trail",
                    self.budget.max_vertex_index
                );
                self.clear();
                return Growth::Reset;
            }
            quads = next;
        }

        if quads > from {
            self.mesh.reallocate(quads);
            self.allocated_quads = quads;
            debug!("ribbon grown from {from} to {quads} quads");
        }
        if quads == from && compacted == 0 {
            return Growth::Fits;
        }
        Growth::Grown {
            from,
            to: quads,
            compacted,
        }
    }
}

/// Two-sided fade: zero at the oldest visible point and at the newest point, ramping
/// to one over `fade_band`. The oldest visible point sits `fade_start_offset` behind
/// the newest.
pub fn fade_multiplier(distance: f32, length: f32, fade_band: f32, fade_start_offset: f32) -> f32 {
    let head = ((distance - (length - fade_start_offset).max(0.0)) / fade_band).clamp(0.0, 1.0);
    let tail = ((length - distance) / fade_band).clamp(0.0, 1.0);
    head.min(tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(spline: &mut Spline, from: usize, to: usize) {
        for i in from..to {
            spline.append(Vec3::new(i as f32, 0.0, 0.0));
        }
    }

    fn builder(budget: MeshBudget) -> RibbonBuilder {
        RibbonBuilder::new(TrailPreset::default(), budget, 5)
    }

    #[test]
    fn seeded_spline_draws_nothing() {
        let mut spline = Spline::default();
        spline.reseed(Vec3::new(2.0, 3.0, 0.0), 5);
        let mut ribbon = builder(MeshBudget::default());
        let frame = ribbon.rebuild(&mut spline);
        assert_eq!(frame.drawn_quads, 0);
        assert_eq!(frame.growth, Growth::Fits);
        assert!(ribbon.mesh().triangles.iter().all(|&i| i == 0));
    }

    #[test]
    fn straight_line_quads() {
        let mut spline = Spline::default();
        line(&mut spline, 0, 13);
        let mut ribbon = builder(MeshBudget::default());
        let frame = ribbon.rebuild(&mut spline);

        assert_relative_eq!(frame.visible_length, 9.9, epsilon = 1e-3);
        assert_eq!(frame.drawn_quads, 49);

        // The oldest quad sits at zero fade and collapses.
        let first = ribbon.mesh().quad(0);
        assert_eq!(first[0], first[1]);

        let quad = ribbon.mesh().quad(5);
        assert_relative_eq!(quad[0].x, 1.9, epsilon = 1e-4);
        assert_relative_eq!(quad[2].x, 2.1, epsilon = 1e-4);
        assert_relative_eq!(quad[0].y, -0.5, epsilon = 1e-4);
        assert_relative_eq!(quad[1].y, 0.5, epsilon = 1e-4);

        let tris = &ribbon.mesh().triangles[30..36];
        assert_eq!(tris, &[20, 21, 22, 22, 21, 23]);
        assert_eq!(&ribbon.mesh().uvs[20..24], &QUAD_UVS);
        assert!(ribbon.mesh().triangles[49 * 6..].iter().all(|&i| i == 0));
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut spline = Spline::default();
        for i in 0..30 {
            let x = i as f32 * 0.8;
            spline.append(Vec3::new(x, x.sin() * 3.0, 0.0));
        }
        let mut ribbon = builder(MeshBudget {
            redraw_length: 2.0,
            ..MeshBudget::default()
        });
        ribbon.rebuild(&mut spline);
        let first = ribbon.mesh().clone();
        ribbon.rebuild(&mut spline);
        assert_eq!(ribbon.mesh(), &first);
    }

    #[test]
    fn quads_behind_the_redraw_window_stay_frozen() {
        let mut spline = Spline::default();
        line(&mut spline, 0, 40);
        let mut ribbon = builder(MeshBudget {
            redraw_length: 2.0,
            ..MeshBudget::default()
        });
        let first = ribbon.rebuild(&mut spline);
        assert_eq!(first.first_redrawn_quad, 0);
        let window = ribbon.last_starting_quad();
        assert!(window > 0);
        assert!(window < first.drawn_quads);
        let before = ribbon.mesh().clone();

        let mut lifted = Spline::default();
        for knot in spline.knots() {
            lifted.append(knot.position + Vec3::new(0.0, 5.0, 0.0));
        }
        let second = ribbon.rebuild(&mut lifted);
        assert_eq!(second.first_redrawn_quad, window);

        let frozen = window * VERTICES_PER_QUAD;
        assert_eq!(&ribbon.mesh().positions[..frozen], &before.positions[..frozen]);
        assert_ne!(ribbon.mesh().quad(window), before.quad(window));
    }

    #[test]
    fn shrinking_clears_stale_triangles() {
        let mut spline = Spline::default();
        line(&mut spline, 0, 20);
        let mut ribbon = builder(MeshBudget::default());
        let long = ribbon.rebuild(&mut spline).drawn_quads;

        let mut short = Spline::default();
        line(&mut short, 0, 8);
        let frame = ribbon.rebuild(&mut short);
        assert!(frame.drawn_quads < long);
        let cut = frame.drawn_quads * TRIANGLE_INDICES_PER_QUAD;
        assert!(ribbon.mesh().triangles[cut..].iter().all(|&i| i == 0));
    }

    #[test]
    fn growth_keeps_existing_quads() {
        let budget = MeshBudget {
            base_quads: 20,
            quad_increment: 20,
            ..MeshBudget::default()
        };
        let mut spline = Spline::default();
        line(&mut spline, 0, 6);
        let mut ribbon = builder(budget);
        let before = ribbon.rebuild(&mut spline);
        let snapshot = ribbon.mesh().clone();

        line(&mut spline, 6, 12);
        let after = ribbon.rebuild(&mut spline);
        assert_eq!(
            after.growth,
            Growth::Grown {
                from: 20,
                to: 60,
                compacted: 0
            }
        );
        assert_eq!(ribbon.allocated_quads(), 60);
        let prefix = before.drawn_quads * VERTICES_PER_QUAD;
        assert_eq!(&ribbon.mesh().positions[..prefix], &snapshot.positions[..prefix]);
        let tri_prefix = before.drawn_quads * TRIANGLE_INDICES_PER_QUAD;
        assert_eq!(&ribbon.mesh().triangles[..tri_prefix], &snapshot.triangles[..tri_prefix]);
    }

    #[test]
    fn index_ceiling_resets_trail() {
        let budget = MeshBudget {
            base_quads: 10,
            quad_increment: 10,
            max_vertex_index: 80,
            ..MeshBudget::default()
        };
        let mut spline = Spline::default();
        line(&mut spline, 0, 30);
        let mut ribbon = builder(budget);
        let frame = ribbon.rebuild(&mut spline);
        assert_eq!(frame.growth, Growth::Reset);
        assert_eq!(frame.drawn_quads, 0);
        assert_eq!(ribbon.allocated_quads(), 10);
        assert_eq!(spline.knot_count(), 5);
        assert_eq!(spline.last_position(), Some(Vec3::new(29.0, 0.0, 0.0)));
    }

    #[test]
    fn compaction_reuses_front_capacity() {
        let budget = MeshBudget {
            base_quads: 20,
            quad_increment: 20,
            compact_on_grow: true,
            redraw_length: 1.0,
            ..MeshBudget::default()
        };
        let plain_budget = MeshBudget {
            compact_on_grow: false,
            base_quads: 500,
            ..budget.clone()
        };
        let mut compact_spline = Spline::default();
        let mut plain_spline = Spline::default();
        let mut compact = builder(budget);
        let mut plain = builder(plain_budget);

        for i in 0..40 {
            let p = Vec3::new(i as f32, 0.0, 0.0);
            compact_spline.append(p);
            plain_spline.append(p);
            compact.rebuild(&mut compact_spline);
            plain.rebuild(&mut plain_spline);
        }

        assert_eq!(compact.allocated_quads(), 20);
        let offset = compact.quad_offset();
        assert!(offset > 0);
        assert_eq!(compact.drawn_quads() + offset, plain.drawn_quads());
        for logical in offset..plain.drawn_quads() {
            let a = compact.mesh().quad(logical - offset);
            let b = plain.mesh().quad(logical);
            for (va, vb) in a.iter().zip(b) {
                assert!((*va - *vb).length() < 1e-5, "quad {logical}: {va:?} vs {vb:?}");
            }
        }
    }

    #[test]
    fn fade_is_zero_at_both_ends() {
        assert_eq!(fade_multiplier(0.0, 50.0, 5.0, 100.0), 0.0);
        assert_eq!(fade_multiplier(50.0, 50.0, 5.0, 100.0), 0.0);
        assert_eq!(fade_multiplier(25.0, 50.0, 5.0, 100.0), 1.0);
        assert_relative_eq!(fade_multiplier(2.5, 50.0, 5.0, 100.0), 0.5);
        // Past the visible window the old end is gone.
        assert_eq!(fade_multiplier(10.0, 150.0, 5.0, 100.0), 0.0);
        assert_relative_eq!(fade_multiplier(51.0, 150.0, 5.0, 100.0), 0.2, epsilon = 1e-5);
    }
}
