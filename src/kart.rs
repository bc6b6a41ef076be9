// src/kart.rs
//
// A kart = one KartVehicle + the KartProperties it was built from + the
// player's current controls. Controls are turned into per-wheel steering,
// engine force and brake right before each vehicle step.

use std::fmt;

use rapier3d::prelude::{Real, RigidBodyHandle, point, vector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::KartProperties;
use crate::debug::{DebugChassis, DebugOverlay};
use crate::error::{VehicleError, VehicleResult};
use crate::kart_vehicle::{
    ChassisState, KartTuning, KartVehicle, RapierRaycaster, WheelDesc,
};
use crate::physics::{PhysicsScene, VehicleAction};

/// Below this forward speed (m/s) the brake input drives backwards.
const REVERSE_THRESHOLD: Real = 0.5;

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum WheelId {
    FL,
    FR,
    RL,
    RR,
}

impl WheelId {
    /// Wheel insertion order used by every kart.
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Controls
// ============================================

/// Player input for one kart. `steer` is in [-1, 1] (positive steers
/// right), `accel` and `brake` in [0, 1].
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KartControl {
    pub steer: f32,
    pub accel: f32,
    pub brake: f32,
}

impl KartControl {
    pub fn clamped(self) -> Self {
        Self {
            steer: self.steer.clamp(-1.0, 1.0),
            accel: self.accel.clamp(0.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
        }
    }
}

impl KartTuning for KartProperties {
    fn max_speed(&self) -> Real {
        self.max_speed
    }

    fn friction_slip_override(&self) -> Option<Real> {
        self.friction_slip
    }

    fn gravity_center_shift(&self) -> Real {
        self.gravity_center_shift
    }
}

/// Chassis-local wheel description for one corner of the kart.
///
/// Facing +Z with +Y up, the kart's left side is +X.
pub fn wheel_desc(props: &KartProperties, id: WheelId) -> WheelDesc {
    let layout = &props.wheels;
    let side = if id.is_left() { 0.5 } else { -0.5 };
    let end = if id.is_front() { 0.5 } else { -0.5 };
    let (x, z) = (side * layout.track_width, end * layout.wheel_base);
    WheelDesc {
        connection_point: point![x, layout.connection_height, z],
        direction: vector![0.0, -1.0, 0.0],
        axle: vector![-1.0, 0.0, 0.0],
        suspension_rest_length: layout.suspension_rest_length,
        radius: layout.radius,
        is_front: id.is_front(),
    }
}

pub struct Kart {
    vehicle: KartVehicle,
    properties: KartProperties,
    control: KartControl,
    zipper_time_left: Real,
}

impl Kart {
    /// Builds the vehicle and its four wheels (FL, FR, RL, RR) for an existing
    /// chassis body.
    pub fn new(chassis: RigidBodyHandle, properties: KartProperties) -> VehicleResult<Self> {
        let mut vehicle = KartVehicle::new(chassis, properties.vehicle);
        for id in WheelId::ALL {
            vehicle.add_wheel(wheel_desc(&properties, id), &properties.tuning)?;
        }
        Ok(Self {
            vehicle,
            properties,
            control: KartControl::default(),
            zipper_time_left: 0.0,
        })
    }

    pub fn name(&self) -> &str {
        &self.properties.name
    }

    pub fn properties(&self) -> &KartProperties {
        &self.properties
    }

    pub fn vehicle(&self) -> &KartVehicle {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut KartVehicle {
        &mut self.vehicle
    }

    pub fn control(&self) -> KartControl {
        self.control
    }

    pub fn set_control(&mut self, control: KartControl) {
        self.control = control.clamped();
    }

    /// Starts a zipper boost towards `speed` (m/s) that ends by itself after
    /// `duration` seconds. A new zipper restarts the timer.
    pub fn handle_zipper(&mut self, speed: Real, duration: Real) {
        self.zipper_time_left = duration.max(0.0);
        self.vehicle.activate_zipper(speed);
        debug!(kart = self.name(), speed, duration, "zipper");
    }

    pub fn zipper_time_left(&self) -> Real {
        self.zipper_time_left
    }

    fn update_zipper(&mut self, dt: Real) {
        if self.vehicle.zipper_speed().is_none() {
            self.zipper_time_left = 0.0;
            return;
        }
        self.zipper_time_left -= dt;
        if self.zipper_time_left <= 0.0 {
            self.zipper_time_left = 0.0;
            self.vehicle.deactivate_zipper();
        }
    }

    /// Counts down the zipper and writes the current controls into the wheels.
    pub fn update_physics(&mut self, dt: Real) {
        self.update_zipper(dt);

        let props = &self.properties;
        let control = self.control;
        let speed = self.vehicle.current_speed();

        let steering = control.steer * props.max_steer_angle;
        let drive = props.engine_force * 0.5;

        let (engine, brake) = if control.brake > 0.0 && speed > REVERSE_THRESHOLD {
            (0.0, control.brake * props.brake_force)
        } else if control.brake > 0.0 {
            let reverse_limit = props.max_speed * props.max_speed_reverse_ratio;
            let engine = if speed > -reverse_limit {
                -control.brake * drive
            } else {
                0.0
            };
            (engine, 0.0)
        } else {
            (control.accel * drive, 0.0)
        };

        for (index, id) in WheelId::ALL.iter().enumerate() {
            if id.is_front() {
                self.vehicle.set_steering_value(steering, index);
                self.vehicle.apply_engine_force(0.0, index);
            } else {
                self.vehicle.apply_engine_force(engine, index);
            }
            self.vehicle.set_brake(brake, index);
        }
    }

    pub fn debug_draw(&self, chassis: &ChassisState, overlay: &mut DebugOverlay) {
        overlay.chassis = Some(DebugChassis::from_pose(
            chassis.position(),
            self.properties.chassis_half_extents,
        ));
        self.vehicle.debug_draw(overlay);
    }
}

impl VehicleAction for Kart {
    fn chassis(&self) -> RigidBodyHandle {
        self.vehicle.chassis()
    }

    fn update_action(&mut self, scene: &mut PhysicsScene, dt: Real) -> VehicleResult<()> {
        let handle = self.vehicle.chassis();
        let body = scene.bodies.get(handle).ok_or(VehicleError::ChassisMissing)?;
        let mut chassis = ChassisState::from_rigid_body(body);

        self.update_physics(dt);
        {
            let raycaster = RapierRaycaster::new(
                &scene.query_pipeline,
                &scene.bodies,
                &scene.colliders,
                handle,
            );
            self.vehicle
                .update_vehicle(dt, &mut chassis, &raycaster, &self.properties);
        }

        let body = scene
            .bodies
            .get_mut(handle)
            .ok_or(VehicleError::ChassisMissing)?;
        chassis.write_back(body);
        Ok(())
    }

    fn post_step(&mut self, scene: &PhysicsScene, dt: Real) -> VehicleResult<()> {
        let body = scene
            .bodies
            .get(self.vehicle.chassis())
            .ok_or(VehicleError::ChassisMissing)?;
        let chassis = ChassisState::from_rigid_body(body);
        self.vehicle.update_wheel_transforms(&chassis, dt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tux;
    use rapier3d::prelude::*;

    fn kart() -> Kart {
        let mut bodies = RigidBodySet::new();
        let handle = bodies.insert(RigidBodyBuilder::dynamic());
        Kart::new(handle, tux()).unwrap()
    }

    #[test]
    fn wheels_follow_the_layout() {
        let kart = kart();
        let vehicle = kart.vehicle();
        assert_eq!(vehicle.num_wheels(), 4);

        let fl = vehicle.wheel(0);
        assert!(fl.is_front());
        assert!((fl.connection_point().x - 0.45).abs() < 1.0e-6);
        assert!((fl.connection_point().z - 0.7).abs() < 1.0e-6);

        let rr = vehicle.wheel(3);
        assert!(!rr.is_front());
        assert!(rr.connection_point().x < 0.0 && rr.connection_point().z < 0.0);

        // Left is up x forward.
        let left = vector![0.0, 1.0, 0.0].cross(&vector![0.0, 0.0, 1.0]);
        assert!(fl.connection_point().coords.dot(&left) > 0.0);
        assert_eq!(WheelId::from_index(3), Some(WheelId::RR));
    }

    #[test]
    fn accelerating_drives_the_rear_wheels() {
        let mut kart = kart();
        kart.set_control(KartControl {
            steer: 2.0,
            accel: 1.0,
            brake: 0.0,
        });
        kart.update_physics(1.0 / 60.0);

        let v = kart.vehicle();
        assert_eq!(v.wheel(0).engine_force(), 0.0);
        assert_eq!(v.wheel(2).engine_force(), 900.0);
        assert_eq!(v.steering_value(1), tux().max_steer_angle);
        assert_eq!(v.steering_value(2), 0.0);
    }

    #[test]
    fn brake_at_standstill_reverses() {
        let mut kart = kart();
        kart.set_control(KartControl {
            steer: 0.0,
            accel: 0.0,
            brake: 1.0,
        });
        kart.update_physics(1.0 / 60.0);
        let v = kart.vehicle();
        assert!(v.wheel(3).engine_force() < 0.0);
        assert_eq!(v.wheel(3).brake(), 0.0);
    }

    #[test]
    fn timed_zipper_runs_out() {
        let dt = 1.0 / 60.0;
        let mut kart = kart();
        kart.handle_zipper(20.0, 0.1);
        for _ in 0..5 {
            kart.update_physics(dt);
        }
        assert_eq!(kart.vehicle().zipper_speed(), Some(20.0));
        assert!(kart.zipper_time_left() > 0.0);

        for _ in 0..2 {
            kart.update_physics(dt);
        }
        assert_eq!(kart.vehicle().zipper_speed(), None);
        assert_eq!(kart.zipper_time_left(), 0.0);
    }

    #[test]
    fn new_zipper_restarts_the_timer() {
        let dt = 1.0 / 60.0;
        let mut kart = kart();
        kart.handle_zipper(20.0, 0.1);
        for _ in 0..5 {
            kart.update_physics(dt);
        }
        kart.handle_zipper(25.0, 0.1);
        for _ in 0..5 {
            kart.update_physics(dt);
        }
        assert_eq!(kart.vehicle().zipper_speed(), Some(25.0));
    }

    #[test]
    fn manual_deactivation_clears_the_timer() {
        let mut kart = kart();
        kart.handle_zipper(20.0, 1.0);
        kart.vehicle_mut().deactivate_zipper();
        kart.update_physics(1.0 / 60.0);
        assert_eq!(kart.zipper_time_left(), 0.0);
    }

    #[test]
    fn properties_provide_kart_tuning() {
        let mut props = tux();
        props.friction_slip = Some(4.0);
        assert_eq!(props.friction_slip_override(), Some(4.0));
        assert_eq!(KartTuning::max_speed(&props), 22.0);
    }

    #[test]
    fn invalid_layout_is_rejected() {
        let mut props = tux();
        props.wheels.radius = 0.0;
        let mut bodies = RigidBodySet::new();
        let handle = bodies.insert(RigidBodyBuilder::dynamic());
        assert!(matches!(
            Kart::new(handle, props),
            Err(VehicleError::InvalidWheel { field: "radius", .. })
        ));
    }
}
