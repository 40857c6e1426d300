use glam::Vec3;
use serpentines_core::{EngineConfig, TrailError};
use serpentines_platform::{TracingMeshSink, TracingPolylineSink};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod scene;
use crate::scene::ThrowScene;

const PHYSICS_STEP: f32 = 0.02;
const PULL_FRAMES: usize = 30;
const FLIGHT_FRAMES: usize = 150;

fn main() {
    // Init logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    info!("Serpentines starting");
    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => {
                info!("loaded config from {path}");
                config
            }
            Err(e) => {
                error!("could not load {path}: {e}");
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    if let Err(e) = run(config) {
        eprintln!("Serpentines error: {e}");
    }
}

fn run(config: EngineConfig) -> Result<(), TrailError> {
    let mut scene = ThrowScene::new(config, Vec3::ZERO)?;
    let mut lines = TracingPolylineSink::default();
    let mut mesh = TracingMeshSink::default();

    scene.press();
    let pull_target = Vec3::new(-2.0, -1.2, 0.0);
    for frame in 1..=PULL_FRAMES {
        let pointer = pull_target * (frame as f32 / PULL_FRAMES as f32);
        scene.drag(pointer, &mut lines)?;
        scene.tick(PHYSICS_STEP, &mut mesh)?;
    }
    if let Some(apex) = lines.points.iter().max_by(|a, b| a.y.total_cmp(&b.y)) {
        info!("previewed apex near {apex}");
    }

    scene.release(&mut lines)?;
    for frame in 1..=FLIGHT_FRAMES {
        let ribbon = scene.tick(PHYSICS_STEP, &mut mesh)?;
        if frame % 25 == 0 {
            info!(
                "frame {frame}: {} knots, length {:.2}, {} quads drawn, growth {:?}",
                scene.trail().spline().knot_count(),
                ribbon.visible_length,
                ribbon.drawn_quads,
                ribbon.growth
            );
        }
    }

    match serde_json::to_string(&mesh.last) {
        Ok(stats) => info!("final mesh upload: {stats}"),
        Err(e) => error!("could not encode mesh stats: {e}"),
    }

    scene.restart(&mut lines)?;
    scene.tick(PHYSICS_STEP, &mut mesh)?;
    info!("Serpentines finished after {} uploads", mesh.uploads);
    Ok(())
}
