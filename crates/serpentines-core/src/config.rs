//! Construction-time configuration. Every section has serde defaults, so a config
//! file only needs to name the values it changes.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{Result, TrailError};
use crate::spline::{DEFAULT_SUB_SEGMENTS, MIN_KNOTS};

/// Look of the ribbon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailPreset {
    pub name: String,
    /// Length of one quad along the spline.
    pub quad_width: f32,
    /// Full ribbon height across the spline.
    pub quad_height: f32,
    /// Hidden length at the newest end, where the tip is still moving.
    pub trim_epsilon: f32,
    /// Length over which each end fades.
    pub fade_band: f32,
    /// Visible length behind the newest point before the old end fades out.
    pub fade_start_offset: f32,
    /// Face normal of the flat ribbon.
    pub normal: Vec3,
}

impl Default for TrailPreset {
    fn default() -> Self {
        Self {
            name: "Default".into(),
            quad_width: 0.2,
            quad_height: 1.0,
            trim_epsilon: 0.1,
            fade_band: 5.0,
            fade_start_offset: 100.0,
            normal: Vec3::Z,
        }
    }
}

/// Buffer sizing and redraw policy for the ribbon builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshBudget {
    pub base_quads: usize,
    pub quad_increment: usize,
    /// Vertex index ceiling of the target mesh format. Growth past it resets the trail.
    pub max_vertex_index: usize,
    /// Slide the live window to the front of the buffers before reallocating.
    pub compact_on_grow: bool,
    /// Trailing segments re-integrated per frame; 0 re-integrates the whole spline.
    pub reparametrize_window: usize,
    /// Length behind the newest point that is redrawn every frame.
    pub redraw_length: f32,
    /// Extra quads redrawn before the redraw window.
    pub redraw_margin: usize,
}

impl Default for MeshBudget {
    fn default() -> Self {
        Self {
            base_quads: 500,
            quad_increment: 200,
            max_vertex_index: 65_000,
            compact_on_grow: false,
            reparametrize_window: 3,
            redraw_length: 100.0,
            redraw_margin: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplineConfig {
    pub sub_segments: usize,
}

impl Default for SplineConfig {
    fn default() -> Self {
        Self {
            sub_segments: DEFAULT_SUB_SEGMENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionConfig {
    /// Minimum distance from the two newest fixed knots before a knot is emitted.
    pub emission_distance: f32,
    /// Knots stacked on the anchor after a clear.
    pub seed_knots: usize,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            emission_distance: 0.1,
            seed_knots: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub sample_count: usize,
    /// Time between preview samples, in seconds.
    pub time_step: f32,
    pub gravity: Vec3,
    /// Texture offset added per update to scroll the dotted material.
    pub texture_scroll_step: f32,
    /// Pins every sample to this z when set.
    pub plane_depth: Option<f32>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            sample_count: 13,
            // Five 0.02 s physics steps.
            time_step: 0.1,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            texture_scroll_step: 0.01,
            plane_depth: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub throw_speed: f32,
    pub max_pull_distance: f32,
    pub helper_coefficient: f32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            throw_speed: 10.0,
            max_pull_distance: 1.5,
            helper_coefficient: 1.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub spline: SplineConfig,
    pub preset: TrailPreset,
    pub budget: MeshBudget,
    pub emission: EmissionConfig,
    pub preview: PreviewConfig,
    pub launch: LaunchConfig,
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a `.toml` or `.json` file, picked by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TrailError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(TrailError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values the per-frame code cannot recover from. Failures are logged.
    pub fn validate(&self) -> Result<()> {
        self.check().inspect_err(|e| error!("rejecting engine config: {e}"))
    }

    fn check(&self) -> Result<()> {
        let positive = |field: &'static str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(TrailError::invalid(field, format!("must be positive, got {value}")))
            }
        };

        if self.spline.sub_segments == 0 {
            return Err(TrailError::invalid("spline.sub_segments", "must be at least 1"));
        }
        positive("preset.quad_width", self.preset.quad_width)?;
        positive("preset.fade_band", self.preset.fade_band)?;
        if !(self.preset.quad_height.is_finite() && self.preset.quad_height >= 0.0) {
            return Err(TrailError::invalid(
                "preset.quad_height",
                "must be finite and non-negative",
            ));
        }
        if self.preset.normal.length_squared() == 0.0 {
            return Err(TrailError::invalid("preset.normal", "must be non-zero"));
        }
        if self.budget.base_quads == 0 {
            return Err(TrailError::invalid("budget.base_quads", "must be at least 1"));
        }
        if self.budget.quad_increment == 0 {
            return Err(TrailError::invalid("budget.quad_increment", "must be at least 1"));
        }
        if self.budget.base_quads * 4 > self.budget.max_vertex_index {
            return Err(TrailError::invalid(
                "budget.base_quads",
                format!(
                    "{} quads exceed the vertex index ceiling {}",
                    self.budget.base_quads, self.budget.max_vertex_index
                ),
            ));
        }
        if self.emission.seed_knots < MIN_KNOTS {
            return Err(TrailError::invalid(
                "emission.seed_knots",
                format!("need at least {MIN_KNOTS} knots"),
            ));
        }
        positive("preview.time_step", self.preview.time_step)?;
        positive("launch.max_pull_distance", self.launch.max_pull_distance)?;
        Ok(())
    }
}
