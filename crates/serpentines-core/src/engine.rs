//! Per-frame trail driver tying knot emission to ribbon rebuilds and mesh upload.

use glam::Vec3;
use serpentines_platform::MeshSink;
use tracing::{debug, info};

use crate::config::{EmissionConfig, EngineConfig};
use crate::error::{Result, TrailError};
use crate::ribbon::{RibbonBuilder, RibbonFrame};
use crate::spline::Spline;

/// Drives one trail: emits knots behind a moving anchor and keeps the ribbon in sync.
#[derive(Debug)]
pub struct TrailEngine {
    emission: EmissionConfig,
    spline: Spline,
    ribbon: RibbonBuilder,
    emitting: bool,
}

impl TrailEngine {
    /// Validates `config` and seeds the spline at `anchor`. Emission starts disabled.
    pub fn new(config: EngineConfig, anchor: Vec3) -> Result<Self> {
        config.validate()?;
        let EngineConfig {
            spline,
            preset,
            budget,
            emission,
            ..
        } = config;

        info!("trail engine using preset `{}`", preset.name);
        let mut spline = Spline::new(spline.sub_segments);
        spline.reseed(anchor, emission.seed_knots);
        Ok(Self {
            ribbon: RibbonBuilder::new(preset, budget, emission.seed_knots),
            emission,
            spline,
            emitting: false,
        })
    }

    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    pub fn ribbon(&self) -> &RibbonBuilder {
        &self.ribbon
    }

    pub fn is_emitting(&self) -> bool {
        self.emitting
    }

    pub fn set_emitting(&mut self, emitting: bool) {
        if emitting != self.emitting {
            debug!("trail emission {}", if emitting { "on" } else { "off" });
        }
        self.emitting = emitting;
    }

    /// Empties the trail back to seed knots at `anchor` and the base mesh allocation.
    pub fn clear(&mut self, anchor: Vec3) {
        info!("clearing trail at {anchor}");
        self.spline.reseed(anchor, self.emission.seed_knots);
        self.ribbon.clear();
    }

    /// One frame: follow `anchor`, rebuild the ribbon and hand it to `sink`.
    pub fn update(&mut self, anchor: Vec3, sink: &mut dyn MeshSink) -> Result<RibbonFrame> {
        if self.emitting {
            self.emit(anchor);
        }
        let frame = self.ribbon.rebuild(&mut self.spline);
        sink.upload(self.ribbon.upload()).map_err(TrailError::Sink)?;
        Ok(frame)
    }

    /// The two newest knots ride on the anchor; a new knot is fixed once the anchor
    /// is far enough from both knots before them.
    fn emit(&mut self, anchor: Vec3) {
        self.spline.move_tail(anchor);

        let knots = self.spline.knots();
        let n = knots.len();
        if n < 4 {
            return;
        }
        let min = self.emission.emission_distance;
        if knots[n - 3].position.distance(anchor) > min
            && knots[n - 4].position.distance(anchor) > min
        {
            self.spline.append(anchor);
            debug!("emitted knot {} at {anchor}", n);
        }
    }
}
