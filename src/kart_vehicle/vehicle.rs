// ==============================================================================
// vehicle.rs — KART VEHICLE ACTION
// ------------------------------------------------------------------------------
// KartVehicle owns its wheels and drives a chassis it does not own. One step:
//   1) refresh wheel frames + signed speed
//   2) raycast every wheel, count grounded wheels
//   3) suspension forces -> chassis impulses
//   4) sequential friction solve (zipper, sliding policy)
//   5) chassis damping
// The world then integrates the chassis, after which update_wheel_transforms()
// rebuilds the render transforms and advances wheel spin.
// ==============================================================================

use std::f32::consts::PI;

use nalgebra::{Translation3, Unit, UnitQuaternion};
use rapier3d::prelude::{Isometry, Real, RigidBodyHandle, Vector};
use tracing::debug;

use crate::config::{VehicleConfig, WheelTuning};
use crate::debug::{
    COLOR_NORMAL, COLOR_RAY_HIT, COLOR_RAY_MISS, DebugOverlay, DebugRay, DebugWheel, p3, v3,
};
use crate::error::{VehicleError, VehicleResult};
use crate::kart_vehicle::chassis::ChassisState;
use crate::kart_vehicle::friction::{self, FrictionParams};
use crate::kart_vehicle::raycast::VehicleRaycaster;
use crate::kart_vehicle::suspension;
use crate::kart_vehicle::types::{CoordinateSystem, WheelContactState};
use crate::kart_vehicle::wheel::{Wheel, WheelDesc};

/// Wheel spin decays by this factor every step while airborne.
const AIRBORNE_SPIN_DAMPING: Real = 0.99;

/// Kart-level values the vehicle looks up every step.
pub trait KartTuning {
    /// Top speed (m/s); engine force is ignored beyond it.
    fn max_speed(&self) -> Real;

    /// Replaces every wheel's friction slip when set.
    fn friction_slip_override(&self) -> Option<Real> {
        None
    }

    /// Offset of the centre of mass along chassis up used for side impulses.
    fn gravity_center_shift(&self) -> Real {
        0.0
    }
}

#[derive(Clone, Debug)]
pub struct KartVehicle {
    chassis: RigidBodyHandle,
    config: VehicleConfig,
    wheels: Vec<Wheel>,
    current_speed: Real,
    wheels_on_ground: usize,
    zipper_speed: Option<Real>,
    sliding_allowed: bool,
    stepped: bool,
}

impl KartVehicle {
    pub fn new(chassis: RigidBodyHandle, config: VehicleConfig) -> Self {
        Self {
            chassis,
            config,
            wheels: Vec::new(),
            current_speed: 0.0,
            wheels_on_ground: 0,
            zipper_speed: None,
            sliding_allowed: false,
            stepped: false,
        }
    }

    pub fn chassis(&self) -> RigidBodyHandle {
        self.chassis
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    /// Adds a wheel and returns its index. The tuning is copied.
    pub fn add_wheel(&mut self, desc: WheelDesc, tuning: &WheelTuning) -> VehicleResult<usize> {
        if self.stepped {
            return Err(VehicleError::WheelsLocked);
        }
        desc.validate()?;
        tuning.validate()?;
        self.wheels.push(Wheel::new(desc, *tuning));
        Ok(self.wheels.len() - 1)
    }

    pub fn num_wheels(&self) -> usize {
        self.wheels.len()
    }

    pub fn wheel(&self, index: usize) -> &Wheel {
        self.check_index(index);
        &self.wheels[index]
    }

    pub fn wheels(&self) -> &[Wheel] {
        &self.wheels
    }

    pub fn wheel_transform_ws(&self, index: usize) -> &Isometry<Real> {
        self.wheel(index).world_transform()
    }

    fn check_index(&self, index: usize) {
        assert!(
            index < self.wheels.len(),
            "wheel index {index} out of range ({} wheels)",
            self.wheels.len()
        );
    }

    // ---------------------------------------------------------------------
    // Controls
    // ---------------------------------------------------------------------

    pub fn set_steering_value(&mut self, steering: Real, index: usize) {
        self.check_index(index);
        self.wheels[index].steering = steering;
    }

    pub fn steering_value(&self, index: usize) -> Real {
        self.wheel(index).steering
    }

    pub fn apply_engine_force(&mut self, force: Real, index: usize) {
        self.check_index(index);
        self.wheels[index].engine_force = force;
    }

    pub fn set_brake(&mut self, brake: Real, index: usize) {
        self.check_index(index);
        self.wheels[index].brake = brake;
    }

    pub fn reset_brakes(&mut self) {
        for wheel in &mut self.wheels {
            wheel.brake = 0.0;
        }
    }

    /// Allows the wheels to slide sideways (drift) instead of gripping.
    pub fn set_sliding(&mut self, allowed: bool) {
        self.sliding_allowed = allowed;
    }

    pub fn is_sliding_allowed(&self) -> bool {
        self.sliding_allowed
    }

    /// Drives the kart to at least `speed` m/s until deactivated.
    pub fn activate_zipper(&mut self, speed: Real) {
        self.zipper_speed = Some(speed);
    }

    pub fn deactivate_zipper(&mut self) {
        self.zipper_speed = None;
    }

    pub fn zipper_speed(&self) -> Option<Real> {
        self.zipper_speed
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Signed speed measured at the start of the last step.
    pub fn current_speed(&self) -> Real {
        self.current_speed
    }

    pub fn num_wheels_on_ground(&self) -> usize {
        self.wheels_on_ground
    }

    pub fn forward_vector(&self, chassis: &ChassisState) -> Vector<Real> {
        chassis.forward_ws(&self.config.coordinate_system)
    }

    pub fn chassis_world_transform<'a>(&self, chassis: &'a ChassisState) -> &'a Isometry<Real> {
        chassis.position()
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.config.coordinate_system
    }

    pub fn set_coordinate_system(&mut self, axes: CoordinateSystem) {
        self.config.coordinate_system = axes;
    }

    pub fn damping(&self) -> Real {
        self.config.chassis_damping
    }

    // ---------------------------------------------------------------------
    // Resets
    // ---------------------------------------------------------------------

    pub fn reset_suspension(&mut self) {
        for wheel in &mut self.wheels {
            wheel.reset_suspension();
        }
    }

    /// Rest suspension, zero controls, no zipper, grip mode.
    pub fn reset(&mut self) {
        for wheel in &mut self.wheels {
            wheel.reset_suspension();
            wheel.clear_impulses();
            wheel.steering = 0.0;
            wheel.engine_force = 0.0;
            wheel.brake = 0.0;
            wheel.rotation = 0.0;
            wheel.delta_rotation = 0.0;
            wheel.suspension_force = 0.0;
            wheel.raycast_info.is_in_contact = false;
            wheel.contact_state = WheelContactState::Airborne;
        }
        self.current_speed = 0.0;
        self.wheels_on_ground = 0;
        self.zipper_speed = None;
        self.sliding_allowed = false;
    }

    // ---------------------------------------------------------------------
    // Stepping
    // ---------------------------------------------------------------------

    /// Raycasts, suspension and friction for one step of `dt` seconds.
    pub fn update_vehicle(
        &mut self,
        dt: Real,
        chassis: &mut ChassisState,
        raycaster: &dyn VehicleRaycaster,
        kart: &dyn KartTuning,
    ) {
        self.stepped = true;
        if chassis.mass() <= 0.0 || dt <= 0.0 {
            debug!(mass = chassis.mass(), dt, "skipping vehicle step");
            return;
        }

        let driven = self.zipper_speed.is_some()
            || self.wheels.iter().any(|w| w.engine_force != 0.0);
        if driven {
            chassis.request_wake();
        }

        let axes = self.config.coordinate_system;
        for wheel in &mut self.wheels {
            suspension::refresh_wheel_ws(wheel, chassis);
        }
        self.current_speed = chassis.signed_speed(&axes);

        self.wheels_on_ground = 0;
        for wheel in &mut self.wheels {
            if suspension::ray_cast(wheel, raycaster) {
                self.wheels_on_ground += 1;
            }
        }

        let mass = chassis.mass();
        for wheel in &mut self.wheels {
            suspension::update_suspension(wheel, mass, dt);
            suspension::apply_suspension(wheel, chassis, dt);
        }

        let params = FrictionParams {
            dt,
            sliding_allowed: self.sliding_allowed,
            rolling_resistance: self.config.rolling_resistance,
            roll_influence: self.config.roll_influence,
            chassis_up: chassis.up_ws(&axes),
            chassis_forward: chassis.forward_ws(&axes),
            gravity_center_shift: kart.gravity_center_shift(),
            speed: self.current_speed,
            max_speed: kart.max_speed(),
            friction_slip_override: kart.friction_slip_override(),
            zipper_speed: self.zipper_speed,
        };
        friction::update_friction(&mut self.wheels, chassis, &params);

        chassis.set_linear_damping(self.config.chassis_damping);
    }

    /// Rebuilds wheel render transforms from the integrated chassis pose and
    /// advances wheel spin.
    pub fn update_wheel_transforms(&mut self, chassis: &ChassisState, dt: Real) {
        let forward = self.forward_vector(chassis);
        for wheel in &mut self.wheels {
            suspension::refresh_wheel_ws(wheel, chassis);

            let info = wheel.raycast_info;
            if info.is_in_contact {
                let normal = info.contact_normal_ws;
                let rolling_dir = forward - normal * forward.dot(&normal);
                let vel = chassis.velocity_at_point(&info.hard_point_ws);
                wheel.delta_rotation = rolling_dir.dot(&vel) * dt / wheel.radius();
            }
            wheel.rotation += wheel.delta_rotation;
            if !info.is_in_contact {
                wheel.delta_rotation *= AIRBORNE_SPIN_DAMPING;
            }

            // Spin about the unsteered axle, then steer about up.
            let axle = (chassis.position().rotation * wheel.axle())
                .try_normalize(1.0e-6)
                .unwrap_or_else(Vector::zeros);
            let spin = match Unit::try_new(axle, 1.0e-6) {
                Some(axis) => UnitQuaternion::from_axis_angle(&axis, -wheel.rotation),
                None => UnitQuaternion::identity(),
            };
            let steer = suspension::steering_rotation(&info.wheel_direction_ws, wheel.steering);
            let center = info.hard_point_ws + info.wheel_direction_ws * info.suspension_length;

            wheel.world_transform = Isometry::from_parts(
                Translation3::from(center.coords),
                steer * spin * chassis.position().rotation,
            );
        }
    }

    // ---------------------------------------------------------------------
    // Rescue
    // ---------------------------------------------------------------------

    /// Casts `ray` from the chassis origin and, on a hit, aligns the chassis'
    /// up axis with the surface normal. With `translate`, the chassis is also
    /// moved so its lowest wheel rests on the surface. Velocities are zeroed
    /// and the suspension reset. Returns `false` (and changes nothing) if
    /// nothing was hit.
    pub fn project_vehicle_to_surface(
        &mut self,
        chassis: &mut ChassisState,
        raycaster: &dyn VehicleRaycaster,
        ray: Vector<Real>,
        translate: bool,
    ) -> bool {
        if !(ray.norm() > 1.0e-6) {
            return false;
        }
        let origin = chassis.position().translation.vector.into();
        let Some(hit) = raycaster.cast(origin, ray) else {
            return false;
        };
        let Some(normal) = hit.normal.try_normalize(1.0e-6) else {
            return false;
        };
        if !hit.point.coords.iter().all(|c| c.is_finite()) {
            return false;
        }

        let axes = self.config.coordinate_system;
        let up_ws = chassis.up_ws(&axes);
        let align = UnitQuaternion::rotation_between(&up_ws, &normal).unwrap_or_else(|| {
            // Upside down: flip about the chassis' lateral axis.
            match Unit::try_new(chassis.right_ws(&axes), 1.0e-6) {
                Some(axis) => UnitQuaternion::from_axis_angle(&axis, PI),
                None => UnitQuaternion::identity(),
            }
        });
        let rotation = align * chassis.position().rotation;

        let translation = if translate {
            let up_local = axes.up().unit();
            let offset = self
                .wheels
                .iter()
                .map(|w| {
                    let dir = w.direction().try_normalize(1.0e-6).unwrap_or_else(Vector::zeros);
                    let bottom = w.connection_point() + dir * (w.suspension_rest_length() + w.radius());
                    -up_local.dot(&bottom.coords)
                })
                .fold(None, |acc: Option<Real>, h| Some(acc.map_or(h, |a| a.max(h))))
                .unwrap_or(0.0);
            hit.point.coords + normal * offset
        } else {
            chassis.position().translation.vector
        };

        chassis.set_position(Isometry::from_parts(Translation3::from(translation), rotation));
        chassis.set_linvel(Vector::zeros());
        chassis.set_angvel(Vector::zeros());
        self.reset_suspension();
        true
    }

    // ---------------------------------------------------------------------
    // Debug
    // ---------------------------------------------------------------------

    pub fn debug_draw(&self, overlay: &mut DebugOverlay) {
        for (index, wheel) in self.wheels.iter().enumerate() {
            let info = wheel.raycast_info();
            let ray_len = suspension::ray_length(wheel);
            overlay.suspension_rays.push(DebugRay {
                origin: p3(info.hard_point_ws),
                direction: v3(info.wheel_direction_ws),
                length: ray_len,
                hit: info.is_in_contact.then(|| p3(info.contact_point_ws)),
                color: if info.is_in_contact {
                    COLOR_RAY_HIT
                } else {
                    COLOR_RAY_MISS
                },
            });
            if info.is_in_contact {
                overlay.contact_normals.push(DebugRay {
                    origin: p3(info.contact_point_ws),
                    direction: v3(info.contact_normal_ws),
                    length: 0.5,
                    hit: None,
                    color: COLOR_NORMAL,
                });
            }

            let max_len = wheel.max_suspension_length();
            let compression = if max_len > 0.0 {
                1.0 - info.suspension_length / max_len
            } else {
                0.0
            };
            overlay.wheels.push(DebugWheel {
                index,
                center: v3(wheel.world_transform().translation.vector),
                radius: wheel.radius(),
                state: wheel.contact_state(),
                compression,
                suspension_force: wheel.suspension_force(),
                steering: wheel.steering(),
                forward_impulse: wheel.forward_impulse(),
                side_impulse: wheel.side_impulse(),
                skid_info: wheel.skid_info(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kart_vehicle::raycast::testing::{FlatGround, Void};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rapier3d::prelude::*;

    const DT: Real = 1.0 / 60.0;
    const GRAVITY: Real = -9.81;

    struct Tuning {
        max_speed: Real,
    }

    impl KartTuning for Tuning {
        fn max_speed(&self) -> Real {
            self.max_speed
        }
    }

    const KART: Tuning = Tuning { max_speed: 25.0 };

    fn tuning() -> WheelTuning {
        WheelTuning {
            suspension_stiffness: 40.0,
            suspension_compression: 2.0,
            suspension_damping: 3.0,
            max_suspension_travel: 0.3,
            friction_slip: 10.5,
            max_suspension_force: 12_000.0,
        }
    }

    fn desc(x: Real, z: Real, is_front: bool) -> WheelDesc {
        WheelDesc {
            connection_point: point![x, -0.1, z],
            direction: vector![0.0, -1.0, 0.0],
            axle: vector![-1.0, 0.0, 0.0],
            suspension_rest_length: 0.2,
            radius: 0.25,
            is_front,
        }
    }

    fn kart() -> KartVehicle {
        let mut bodies = RigidBodySet::new();
        let handle = bodies.insert(RigidBodyBuilder::dynamic());
        let mut vehicle = KartVehicle::new(handle, VehicleConfig::default());
        for (x, z, front) in [(0.45, 0.7, true), (-0.45, 0.7, true), (0.45, -0.7, false), (-0.45, -0.7, false)] {
            vehicle.add_wheel(desc(x, z, front), &tuning()).unwrap();
        }
        vehicle
    }

    fn chassis_at(y: Real) -> ChassisState {
        ChassisState::cuboid(Isometry::translation(0.0, y, 0.0), 200.0, vector![0.5, 0.2, 0.9])
    }

    /// Semi-implicit Euler step standing in for the rigid-body integrator.
    fn integrate(chassis: &mut ChassisState, dt: Real) {
        chassis.set_linvel(chassis.linvel() + vector![0.0, GRAVITY * dt, 0.0]);
        let pose = *chassis.position();
        let translation = pose.translation.vector + chassis.linvel() * dt;
        let rotation = UnitQuaternion::from_scaled_axis(chassis.angvel() * dt) * pose.rotation;
        chassis.set_position(Isometry::from_parts(translation.into(), rotation));
    }

    fn step(vehicle: &mut KartVehicle, chassis: &mut ChassisState, ground: &dyn VehicleRaycaster) {
        vehicle.update_vehicle(DT, chassis, ground, &KART);
        integrate(chassis, DT);
        vehicle.update_wheel_transforms(chassis, DT);
    }

    #[test]
    fn add_wheel_keeps_parameters_verbatim() {
        let vehicle = kart();
        assert_eq!(vehicle.num_wheels(), 4);
        assert_eq!(*vehicle.wheel(2).desc(), desc(0.45, -0.7, false));
        assert_eq!(*vehicle.wheel(2).tuning(), tuning());
    }

    #[test]
    fn each_wheel_keeps_the_tuning_it_was_added_with() {
        let mut vehicle = kart();
        let stiff = WheelTuning { suspension_stiffness: 90.0, ..tuning() };
        let index = vehicle.add_wheel(desc(0.0, 0.0, false), &stiff).unwrap();

        assert_eq!(vehicle.wheel(index).tuning().suspension_stiffness, 90.0);
        for w in &vehicle.wheels()[..index] {
            assert_eq!(w.tuning().suspension_stiffness, 40.0);
        }
    }

    #[test]
    fn only_driving_input_wakes_the_chassis() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(0.5);
        vehicle.update_vehicle(DT, &mut chassis, &FlatGround::at(0.0), &KART);
        assert!(!chassis.wake_requested());

        let mut chassis = chassis_at(0.5);
        vehicle.apply_engine_force(300.0, 2);
        vehicle.update_vehicle(DT, &mut chassis, &FlatGround::at(0.0), &KART);
        assert!(chassis.wake_requested());
    }

    #[test]
    fn positive_steering_yaws_clockwise_from_above() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(0.5);
        let ground = FlatGround::at(0.0);
        for _ in 0..60 {
            step(&mut vehicle, &mut chassis, &ground);
        }

        chassis.set_linvel(vector![0.0, 0.0, 6.0]);
        for _ in 0..30 {
            vehicle.set_steering_value(0.4, 0);
            vehicle.set_steering_value(0.4, 1);
            step(&mut vehicle, &mut chassis, &ground);
        }

        // Seen from +Y, clockwise is a negative yaw rate; the kart's right is -X.
        assert!(chassis.angvel().y < 0.0, "yaw rate {}", chassis.angvel().y);
        assert!(vehicle.forward_vector(&chassis).x < 0.0);
        assert!(chassis.position().translation.vector.x < 0.0);
    }

    #[test]
    fn invalid_wheel_is_rejected() {
        let mut vehicle = kart();
        let bad = WheelDesc { radius: -1.0, ..desc(0.0, 0.0, false) };
        assert!(matches!(
            vehicle.add_wheel(bad, &tuning()),
            Err(VehicleError::InvalidWheel { field: "radius", .. })
        ));
        let bad_tuning = WheelTuning { suspension_stiffness: -1.0, ..tuning() };
        assert!(matches!(
            vehicle.add_wheel(desc(0.0, 0.0, false), &bad_tuning),
            Err(VehicleError::InvalidTuning { .. })
        ));
        assert_eq!(vehicle.num_wheels(), 4);
    }

    #[test]
    fn wheels_are_locked_after_the_first_step() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(1.0);
        vehicle.update_vehicle(DT, &mut chassis, &Void, &KART);
        assert_eq!(
            vehicle.add_wheel(desc(0.0, 0.0, false), &tuning()),
            Err(VehicleError::WheelsLocked)
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_wheel_panics() {
        let mut vehicle = kart();
        vehicle.set_brake(1.0, 4);
    }

    #[test]
    fn controls_reach_the_wheels() {
        let mut vehicle = kart();
        vehicle.set_steering_value(0.3, 0);
        vehicle.apply_engine_force(500.0, 2);
        vehicle.set_brake(100.0, 3);
        assert_eq!(vehicle.steering_value(0), 0.3);
        assert_eq!(vehicle.wheel(2).engine_force(), 500.0);
        vehicle.reset_brakes();
        assert_eq!(vehicle.wheel(3).brake(), 0.0);
    }

    #[test]
    fn airborne_vehicle_applies_no_impulse() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(3.0).with_velocity(vector![1.0, 0.0, 2.0], Vector::zeros());
        vehicle.apply_engine_force(1000.0, 2);
        vehicle.update_vehicle(DT, &mut chassis, &Void, &KART);

        assert_eq!(vehicle.num_wheels_on_ground(), 0);
        assert_eq!(chassis.linvel(), vector![1.0, 0.0, 2.0]);
        assert_eq!(chassis.angvel(), Vector::zeros());
        for w in vehicle.wheels() {
            assert_eq!(w.suspension_force(), 0.0);
            assert_eq!(w.contact_state(), WheelContactState::Airborne);
        }
    }

    #[test]
    fn kart_settles_on_flat_ground() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(0.7);
        let ground = FlatGround::at(0.0);
        for _ in 0..240 {
            step(&mut vehicle, &mut chassis, &ground);
        }
        assert_eq!(vehicle.num_wheels_on_ground(), 4);
        assert!(chassis.linvel().norm() < 0.1, "still moving: {}", chassis.linvel());
        let y = chassis.position().translation.vector.y;
        assert!(y > 0.2 && y < 0.8, "resting height {y}");
    }

    #[test]
    fn signed_speed_is_negative_in_reverse() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(0.5).with_velocity(vector![0.0, 0.0, -4.0], Vector::zeros());
        vehicle.update_vehicle(DT, &mut chassis, &FlatGround::at(0.0), &KART);
        assert!((vehicle.current_speed() + 4.0).abs() < 1.0e-4);
    }

    #[test]
    fn zipper_reaches_target_then_lets_go() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(0.5);
        let ground = FlatGround::at(0.0);
        for _ in 0..60 {
            step(&mut vehicle, &mut chassis, &ground);
        }

        vehicle.activate_zipper(15.0);
        let mut reached = false;
        for _ in 0..30 {
            vehicle.update_vehicle(DT, &mut chassis, &ground, &KART);
            if vehicle.forward_vector(&chassis).dot(&chassis.linvel()) >= 15.0 - 1.0e-3 {
                reached = true;
                break;
            }
            integrate(&mut chassis, DT);
        }
        assert!(reached, "zipper never reached its target speed");

        integrate(&mut chassis, DT);
        vehicle.deactivate_zipper();
        vehicle.update_vehicle(DT, &mut chassis, &ground, &KART);
        // No engine and no brake: nothing pushes the kart along any more.
        for w in vehicle.wheels() {
            assert_eq!(w.forward_impulse(), 0.0);
        }
    }

    #[test]
    fn projection_puts_lowest_wheel_on_the_plane() {
        let mut rng = StdRng::seed_from_u64(3);
        let height = 2.0;
        for _ in 0..20 {
            let mut vehicle = kart();
            let rotation = vector![
                rng.gen_range(-0.5..0.5),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-0.5..0.5)
            ];
            let mut chassis = ChassisState::cuboid(
                Isometry::new(vector![1.0, 6.0, -2.0], rotation),
                200.0,
                vector![0.5, 0.2, 0.9],
            )
            .with_velocity(vector![3.0, -1.0, 0.0], vector![0.5, 0.0, 0.0]);

            let hit = vehicle.project_vehicle_to_surface(
                &mut chassis,
                &FlatGround::at(height),
                vector![0.0, -10.0, 0.0],
                true,
            );
            assert!(hit);

            let lowest = vehicle
                .wheels()
                .iter()
                .map(|w| {
                    let bottom = w.connection_point()
                        + w.direction() * (w.suspension_rest_length() + w.radius());
                    (chassis.position() * bottom).y
                })
                .fold(Real::INFINITY, Real::min);
            assert!((lowest - height).abs() < 1.0e-4, "lowest wheel at {lowest}");
            assert!((chassis.up_ws(&vehicle.coordinate_system()).y - 1.0).abs() < 1.0e-4);
            assert_eq!(chassis.linvel(), Vector::zeros());
            assert_eq!(chassis.angvel(), Vector::zeros());
        }
    }

    #[test]
    fn projection_without_translation_only_rotates() {
        let mut vehicle = kart();
        let start = Isometry::new(vector![0.0, 4.0, 0.0], vector![0.3, 0.0, 0.0]);
        let mut chassis = ChassisState::cuboid(start, 200.0, vector![0.5, 0.2, 0.9]);
        assert!(vehicle.project_vehicle_to_surface(
            &mut chassis,
            &FlatGround::at(0.0),
            vector![0.0, -10.0, 0.0],
            false,
        ));
        assert_eq!(chassis.position().translation, start.translation);
        assert!((chassis.up_ws(&vehicle.coordinate_system()).y - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn projection_fails_when_nothing_is_hit() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(4.0).with_velocity(vector![1.0, 0.0, 0.0], Vector::zeros());
        let before = chassis.clone();

        assert!(!vehicle.project_vehicle_to_surface(
            &mut chassis,
            &FlatGround::at(0.0),
            vector![0.0, 10.0, 0.0],
            true,
        ));
        assert!(!vehicle.project_vehicle_to_surface(
            &mut chassis,
            &FlatGround::at(0.0),
            Vector::zeros(),
            true,
        ));
        assert_eq!(chassis, before);
    }

    #[test]
    fn reset_clears_controls_and_zipper() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(0.5);
        vehicle.apply_engine_force(800.0, 2);
        vehicle.set_steering_value(0.2, 0);
        vehicle.activate_zipper(20.0);
        vehicle.set_sliding(true);
        for _ in 0..10 {
            step(&mut vehicle, &mut chassis, &FlatGround::at(0.0));
        }

        vehicle.reset();
        assert_eq!(vehicle.zipper_speed(), None);
        assert!(!vehicle.is_sliding_allowed());
        for w in vehicle.wheels() {
            assert_eq!(w.engine_force(), 0.0);
            assert_eq!(w.steering(), 0.0);
            assert_eq!(w.rotation(), 0.0);
            assert_eq!(w.suspension_length(), w.suspension_rest_length());
        }
    }

    #[test]
    fn wheels_spin_forward_while_rolling() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(0.5).with_velocity(vector![0.0, 0.0, 5.0], Vector::zeros());
        let ground = FlatGround::at(0.0);
        step(&mut vehicle, &mut chassis, &ground);

        let wheel = vehicle.wheel(0);
        assert!(wheel.rotation() > 0.0);
        let center = wheel.world_transform().translation.vector;
        let expected = wheel.raycast_info().hard_point_ws
            + wheel.raycast_info().wheel_direction_ws * wheel.suspension_length();
        assert!((center - expected.coords).norm() < 1.0e-5);
    }

    #[test]
    fn debug_draw_reports_every_wheel() {
        let mut vehicle = kart();
        let mut chassis = chassis_at(0.5);
        step(&mut vehicle, &mut chassis, &FlatGround::at(0.0));

        let mut overlay = DebugOverlay::default();
        vehicle.debug_draw(&mut overlay);
        assert_eq!(overlay.wheels.len(), 4);
        assert_eq!(overlay.suspension_rays.len(), 4);
        assert_eq!(overlay.contact_normals.len(), 4);
        assert!(overlay.suspension_rays.iter().all(|r| r.hit.is_some()));
    }
}
