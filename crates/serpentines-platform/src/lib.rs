//! Renderer-facing seams so `serpentines-core` never touches a graphics API.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Borrowed view of the ribbon buffers handed to a [`MeshSink`] each frame.
///
/// The slices are the full allocated arena; triangles past the drawn range are
/// zeroed so they collapse to degenerate triangles on the GPU.
#[derive(Debug, Clone, Copy)]
pub struct MeshUpload<'a> {
    pub positions: &'a [Vec3],
    pub uvs: &'a [Vec2],
    pub triangles: &'a [u32],
    pub drawn_quads: usize,
}

impl<'a> MeshUpload<'a> {
    pub fn position_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.positions)
    }

    pub fn uv_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.uvs)
    }

    pub fn triangle_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.triangles)
    }

    pub fn stats(&self) -> MeshStats {
        MeshStats {
            vertex_count: self.positions.len(),
            triangle_index_count: self.triangles.len(),
            drawn_quads: self.drawn_quads,
            byte_size: self.position_bytes().len()
                + self.uv_bytes().len()
                + self.triangle_bytes().len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub triangle_index_count: usize,
    pub drawn_quads: usize,
    pub byte_size: usize,
}

/// Receives the trail ribbon once per frame.
pub trait MeshSink {
    fn upload(&mut self, mesh: MeshUpload<'_>) -> Result<()>;
}

/// Receives the trajectory preview polyline (a line renderer with a scrolling material).
pub trait PolylineSink {
    fn show(&mut self, points: &[Vec3], texture_offset: f32) -> Result<()>;
    fn hide(&mut self) -> Result<()>;
}

/// Headless mesh sink: records the last upload's stats and traces them.
#[derive(Debug, Default)]
pub struct TracingMeshSink {
    pub last: MeshStats,
    pub uploads: u64,
}

impl MeshSink for TracingMeshSink {
    fn upload(&mut self, mesh: MeshUpload<'_>) -> Result<()> {
        self.last = mesh.stats();
        self.uploads += 1;
        debug!(
            "mesh upload #{}: {} quads drawn, {} vertices, {} bytes",
            self.uploads, self.last.drawn_quads, self.last.vertex_count, self.last.byte_size
        );
        Ok(())
    }
}

/// Headless polyline sink: keeps a copy of the shown points.
#[derive(Debug, Default)]
pub struct TracingPolylineSink {
    pub points: Vec<Vec3>,
    pub texture_offset: f32,
    pub visible: bool,
}

impl PolylineSink for TracingPolylineSink {
    fn show(&mut self, points: &[Vec3], texture_offset: f32) -> Result<()> {
        if !self.visible {
            info!("trajectory preview shown ({} points)", points.len());
        }
        self.points.clear();
        self.points.extend_from_slice(points);
        self.texture_offset = texture_offset;
        self.visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        if self.visible {
            info!("trajectory preview hidden");
        }
        self.visible = false;
        Ok(())
    }
}
