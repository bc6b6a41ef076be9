use std::env;
use std::fs;
use std::process::ExitCode;

use kart_physics::config::{self, KartProperties};
use kart_physics::{KartControl, PhysicsWorld, VehicleResult};
use tracing::{error, info};

// Fixed timestep: 60 Hz
const DT: f32 = 1.0 / 60.0;
const STEPS: u64 = 900;
const SNAPSHOT_EVERY: u64 = 60;
const ZIPPER_TIME: f32 = 0.5; // seconds

fn load_properties(path: Option<String>) -> VehicleResult<KartProperties> {
    let Some(path) = path else {
        return Ok(config::tux());
    };
    let json = fs::read_to_string(&path).map_err(|err| kart_physics::VehicleError::Config {
        detail: format!("{path}: {err}"),
    })?;
    KartProperties::from_json_str(&json)
}

/// Scripted input: settle, accelerate, turn, zipper, drift, brake.
fn control_at(step: u64) -> KartControl {
    match step {
        0..60 => KartControl::default(),
        60..240 => KartControl { accel: 1.0, ..Default::default() },
        240..420 => KartControl { accel: 0.6, steer: 0.5, ..Default::default() },
        420..600 => KartControl { accel: 1.0, steer: -0.8, ..Default::default() },
        _ => KartControl { brake: 1.0, ..Default::default() },
    }
}

fn run(props: KartProperties) -> VehicleResult<()> {
    let mut world = PhysicsWorld::new();
    let player = world.spawn_kart(props, [0.0, 1.0, 0.0])?;
    let rival = world.spawn_kart(config::heavy(), [4.0, 1.0, 0.0])?;

    for step in 0..STEPS {
        let control = control_at(step);
        world.set_control(player, control);
        world.set_control(rival, KartControl { steer: 0.0, ..control });

        if let Some(kart) = world.kart_mut(player) {
            match step {
                300 => kart.handle_zipper(30.0, ZIPPER_TIME),
                420 => kart.vehicle_mut().set_sliding(true),
                600 => kart.vehicle_mut().set_sliding(false),
                _ => {}
            }
        }

        world.step(DT);

        if world.tick % SNAPSHOT_EVERY == 0 {
            match serde_json::to_string(&world.snapshot()) {
                Ok(json) => info!(tick = world.tick, snapshot = %json),
                Err(err) => error!(%err, "could not serialize snapshot"),
            }
        }
    }

    let rescued = world.project_kart_to_surface(player, true)?;
    info!(rescued, "final rescue");
    Ok(())
}

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("starting kart simulation");

    let result = load_properties(env::args().nth(1)).and_then(run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}
