//! Scripted pull → release → flight scene wiring the core to headless sinks.

use glam::Vec3;
use serpentines_core::launch::{clamp_pull, launch_velocity};
use serpentines_core::{
    EngineConfig, LaunchConfig, Result, RibbonFrame, TrailEngine, TrajectoryPreview,
};
use serpentines_platform::{MeshSink, PolylineSink};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    Idle,
    Pulling,
    Flying,
}

/// Point mass under constant gravity, standing in for the physics engine.
#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec3,
    velocity: Vec3,
}

impl Body {
    fn step(&mut self, gravity: Vec3, dt: f32) {
        self.velocity += gravity * dt;
        self.position += self.velocity * dt;
    }
}

pub struct ThrowScene {
    launch: LaunchConfig,
    gravity: Vec3,
    state: PullState,
    rest: Vec3,
    handle: Vec3,
    body: Body,
    trail: TrailEngine,
    preview: TrajectoryPreview,
}

impl ThrowScene {
    pub fn new(config: EngineConfig, rest: Vec3) -> Result<Self> {
        let launch = config.launch.clone();
        let gravity = config.preview.gravity;
        let preview = TrajectoryPreview::new(config.preview.clone());
        Ok(Self {
            trail: TrailEngine::new(config, rest)?,
            launch,
            gravity,
            state: PullState::Idle,
            rest,
            handle: rest,
            body: Body {
                position: rest,
                velocity: Vec3::ZERO,
            },
            preview,
        })
    }

    pub fn state(&self) -> PullState {
        self.state
    }

    pub fn trail(&self) -> &TrailEngine {
        &self.trail
    }

    pub fn press(&mut self) {
        if self.state == PullState::Idle {
            self.state = PullState::Pulling;
        }
    }

    /// Moves the pull handle towards `pointer` and refreshes the preview.
    pub fn drag(&mut self, pointer: Vec3, lines: &mut dyn PolylineSink) -> Result<()> {
        if self.state != PullState::Pulling {
            return Ok(());
        }
        self.handle = clamp_pull(self.rest, pointer, self.launch.max_pull_distance);
        let velocity = launch_velocity(self.rest, self.handle, &self.launch);
        self.preview.update(self.body.position, velocity, lines)
    }

    /// Throws the body if a pull is in progress; returns the launch velocity.
    pub fn release(&mut self, lines: &mut dyn PolylineSink) -> Result<Option<Vec3>> {
        if self.state != PullState::Pulling {
            return Ok(None);
        }
        let velocity = launch_velocity(self.rest, self.handle, &self.launch);
        self.preview.hide(lines)?;
        self.body.velocity = velocity;
        self.state = PullState::Flying;
        self.trail.set_emitting(true);
        info!("thrown with velocity {velocity}");
        Ok(Some(velocity))
    }

    pub fn tick(&mut self, dt: f32, mesh: &mut dyn MeshSink) -> Result<RibbonFrame> {
        if self.state == PullState::Flying {
            self.body.step(self.gravity, dt);
        }
        self.trail.update(self.body.position, mesh)
    }

    pub fn restart(&mut self, lines: &mut dyn PolylineSink) -> Result<()> {
        info!("restarting throw");
        self.trail.set_emitting(false);
        self.body = Body {
            position: self.rest,
            velocity: Vec3::ZERO,
        };
        self.handle = self.rest;
        self.trail.clear(self.rest);
        self.state = PullState::Idle;
        self.preview.hide(lines)
    }
}
