// src/physics.rs

use rapier3d::prelude::*;
use tracing::{info, warn};

use crate::config::KartProperties;
use crate::debug::DebugOverlay;
use crate::error::{VehicleError, VehicleResult};
use crate::kart::{Kart, KartControl};
use crate::kart_vehicle::{ChassisState, RapierRaycaster};
use crate::state::{KartSnapshot, WorldSnapshot};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// How far below the chassis a rescue looks for ground (m).
const RESCUE_RAY_LENGTH: Real = 50.0;
/// Bodies further than this from the origin are considered exploded.
const WORLD_LIMIT: Real = 1_000.0;

/// The parts of the world a vehicle action reads and writes.
pub struct PhysicsScene {
    pub bodies: RigidBodySet,         // for rigid bodies
    pub colliders: ColliderSet,       // for collision shapes
    pub query_pipeline: QueryPipeline, // for raycasting
}

/// Something stepped once per world step, before integration.
pub trait VehicleAction {
    fn chassis(&self) -> RigidBodyHandle;

    /// Applies this step's impulses to the chassis.
    fn update_action(&mut self, scene: &mut PhysicsScene, dt: Real) -> VehicleResult<()>;

    /// Runs after integration.
    fn post_step(&mut self, _scene: &PhysicsScene, _dt: Real) -> VehicleResult<()> {
        Ok(())
    }
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,               // gravity vector
    pub pipeline: PhysicsPipeline,           // physics pipeline
    pub island_manager: IslandManager,       // manages islands of bodies
    pub broad_phase: DefaultBroadPhase,      // broad-phase collision detection
    pub narrow_phase: NarrowPhase,           // collision detection
    pub scene: PhysicsScene,
    pub joints: ImpulseJointSet,             // for constraints
    pub multibody_joints: MultibodyJointSet, // for articulated bodies
    pub ccd: CCDSolver,                      // continuous collision detection
    pub karts: Vec<Kart>,
    pub debug_overlay: DebugOverlay, // for debug visualization
    pub tick: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let gravity = vector![0.0, -9.81, 0.0];

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Static ground box 1000 x 0.2 x 1000 centred at y = -0.1: top face at y = 0.
        let ground_rb = RigidBodyBuilder::fixed()
            .translation(vector![0.0, -0.1, 0.0])
            .build();

        let ground_handle = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 0.1, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.0)
            .restitution(0.0)
            .build();

        colliders.insert_with_parent(ground_collider, ground_handle, &mut bodies);

        info!(
            bodies = bodies.len(),
            colliders = colliders.len(),
            "ground inserted"
        );

        Self {
            gravity,
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            scene: PhysicsScene {
                bodies,
                colliders,
                query_pipeline: QueryPipeline::new(),
            },
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            karts: Vec::new(),
            debug_overlay: DebugOverlay::default(),
            tick: 0,
        }
    }

    pub fn debug_snapshot(&self) -> DebugOverlay {
        self.debug_overlay.clone()
    }

    /// Spawns a kart chassis at `position` and returns the kart's index.
    pub fn spawn_kart(&mut self, props: KartProperties, position: [f32; 3]) -> VehicleResult<usize> {
        let [x, y, z] = position;
        let volume = props.chassis_volume();
        if !(volume > 0.0) {
            return Err(VehicleError::Config {
                detail: "chassis must have a positive volume".into(),
            });
        }
        let density = props.mass / volume; // ρ = m / V

        let rb = RigidBodyBuilder::dynamic()
            .translation(vector![x, y, z])
            .linear_damping(props.vehicle.chassis_damping)
            .angular_damping(props.angular_damping)
            .ccd_enabled(true)
            .build();

        let [hx, hy, hz] = props.chassis_half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
            .active_events(ActiveEvents::empty())
            .density(density)
            .friction(0.0) // wheels provide all the grip
            .restitution(0.0)
            .build();

        let handle = self.scene.bodies.insert(rb);
        self.scene
            .colliders
            .insert_with_parent(collider, handle, &mut self.scene.bodies);

        let kart = match Kart::new(handle, props) {
            Ok(kart) => kart,
            Err(err) => {
                self.scene.bodies.remove(
                    handle,
                    &mut self.island_manager,
                    &mut self.scene.colliders,
                    &mut self.joints,
                    &mut self.multibody_joints,
                    true,
                );
                return Err(err);
            }
        };

        info!(kart = kart.name(), ?position, ?handle, "spawned kart");
        self.karts.push(kart);
        Ok(self.karts.len() - 1)
    }

    pub fn kart(&self, index: usize) -> Option<&Kart> {
        self.karts.get(index)
    }

    pub fn kart_mut(&mut self, index: usize) -> Option<&mut Kart> {
        self.karts.get_mut(index)
    }

    pub fn set_control(&mut self, index: usize, control: KartControl) {
        if let Some(kart) = self.karts.get_mut(index) {
            kart.set_control(control);
        }
    }

    pub fn chassis_state(&self, index: usize) -> Option<ChassisState> {
        let kart = self.karts.get(index)?;
        let body = self.scene.bodies.get(kart.vehicle().chassis())?;
        Some(ChassisState::from_rigid_body(body))
    }

    /// Puts a kart back on the ground below it (along gravity), upright. Returns `Ok(false)`
    /// if there is no ground within reach.
    pub fn project_kart_to_surface(&mut self, index: usize, translate: bool) -> VehicleResult<bool> {
        let Some(kart) = self.karts.get_mut(index) else {
            return Ok(false);
        };
        let handle = kart.vehicle().chassis();
        let body = self
            .scene
            .bodies
            .get(handle)
            .ok_or(VehicleError::ChassisMissing)?;
        let mut chassis = ChassisState::from_rigid_body(body);

        self.scene.query_pipeline.update(&self.scene.colliders);
        let down = self
            .gravity
            .try_normalize(1.0e-6)
            .unwrap_or_else(|| -Vector::y())
            * RESCUE_RAY_LENGTH;
        let projected = {
            let raycaster = RapierRaycaster::new(
                &self.scene.query_pipeline,
                &self.scene.bodies,
                &self.scene.colliders,
                handle,
            );
            kart.vehicle_mut()
                .project_vehicle_to_surface(&mut chassis, &raycaster, down, translate)
        };

        if projected {
            if let Some(body) = self.scene.bodies.get_mut(handle) {
                chassis.write_back(body);
            }
            info!(kart = kart.name(), "projected kart onto the ground");
        }
        Ok(projected)
    }

    pub fn step(&mut self, dt: Real) {
        self.debug_overlay.clear();

        // 1) Vehicle actions see the colliders where the last step left them.
        self.scene.query_pipeline.update(&self.scene.colliders);
        for kart in &mut self.karts {
            if let Err(err) = kart.update_action(&mut self.scene, dt) {
                warn!(kart = kart.name(), %err, "skipping vehicle action");
            }
        }

        // 2) Integrate.
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.scene.bodies,
            &mut self.scene.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.scene.query_pipeline),
            &(),
            &(),
        );

        // 3) Wheel transforms + debug overlay from the integrated poses.
        for kart in &mut self.karts {
            if let Err(err) = kart.post_step(&self.scene, dt) {
                warn!(kart = kart.name(), %err, "skipping wheel transforms");
                continue;
            }
            if let Some(body) = self.scene.bodies.get(kart.vehicle().chassis()) {
                kart.debug_draw(&ChassisState::from_rigid_body(body), &mut self.debug_overlay);
            }
        }

        // 4) Safety: prevent bodies from exploding to insane coordinates
        for (handle, body) in self.scene.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = !pos.iter().all(|c| c.is_finite())
                || pos.iter().any(|c| c.abs() > WORLD_LIMIT);

            if bad {
                let safe = vector![0.0, 1.0, 0.0];
                body.set_translation(safe, true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                warn!(?handle, ?pos, "reset exploding body");
            }
        }

        self.tick += 1;
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            karts: self
                .karts
                .iter()
                .filter_map(|kart| KartSnapshot::capture(kart, &self.scene.bodies))
                .collect(),
        }
    }
}
