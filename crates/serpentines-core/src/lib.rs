//! Serpentines core engine: platform-agnostic trail ribbons and trajectory previews.
//!
//! A [`TrailEngine`] turns an anchor's motion into an arc-length parametrized
//! [`Spline`] and a quad-strip [`RibbonMesh`]; a [`TrajectoryPreview`] samples the
//! ballistic arc a pull gesture would launch. Rendering stays behind the
//! `serpentines-platform` sink traits.

pub mod ballistic;
pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod launch;
pub mod ribbon;
pub mod spline;

pub use ballistic::{sample_trajectory, TrajectoryPreview};
pub use config::{
    EmissionConfig, EngineConfig, LaunchConfig, MeshBudget, PreviewConfig, SplineConfig,
    TrailPreset,
};
pub use engine::TrailEngine;
pub use error::{Result, TrailError};
pub use ribbon::{Growth, RibbonBuilder, RibbonFrame, RibbonMesh};
pub use spline::{Knot, Marker, Spline, SubSample};
