// ==============================================================================
// chassis.rs — CHASSIS SNAPSHOT + AXIS ADAPTER
// ------------------------------------------------------------------------------
// ChassisState is the vehicle's view of the chassis rigid body for one step:
// - pose, linear/angular velocity, damping
// - mass, local centre of mass, local inverse inertia
//
// Impulses are applied the same way rapier applies them:
//     Δv = J / m
//     Δω = I_world⁻¹ (r × J),   I_world⁻¹ = R I_local⁻¹ Rᵀ
//
// The physics world builds one from the chassis RigidBody before the vehicle
// step (from_rigid_body) and writes velocities/pose/damping back afterwards
// (write_back). Tests build one directly with ChassisState::new.
//
// Writing back never wakes the body by itself: a kart resting on its springs
// is allowed to fall asleep. Only request_wake() (driving input) or a moved
// pose wakes it, and a sleeping body keeps the velocities rapier gave it.
// ==============================================================================

use nalgebra::Matrix3;
use rapier3d::prelude::{Isometry, Point, Real, RigidBody, Vector};

use crate::kart_vehicle::types::{Axis, CoordinateSystem};

#[derive(Clone, Debug, PartialEq)]
pub struct ChassisState {
    position: Isometry<Real>,
    linvel: Vector<Real>,
    angvel: Vector<Real>,
    mass: Real,
    local_com: Point<Real>,
    local_inv_inertia: Matrix3<Real>,
    linear_damping: Real,
    position_changed: bool,
    wake_requested: bool,
}

impl ChassisState {
    /// Chassis with its centre of mass at the local origin and a diagonal
    /// inertia tensor.
    pub fn new(position: Isometry<Real>, mass: Real, principal_inertia: Vector<Real>) -> Self {
        let inv = |i: Real| if i > 0.0 { 1.0 / i } else { 0.0 };
        Self {
            position,
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
            mass,
            local_com: Point::origin(),
            local_inv_inertia: Matrix3::from_diagonal(&Vector::new(
                inv(principal_inertia.x),
                inv(principal_inertia.y),
                inv(principal_inertia.z),
            )),
            linear_damping: 0.0,
            position_changed: false,
            wake_requested: false,
        }
    }

    /// Inertia of a solid box with the given half extents.
    pub fn cuboid(position: Isometry<Real>, mass: Real, half_extents: Vector<Real>) -> Self {
        let [x2, y2, z2] = [
            4.0 * half_extents.x * half_extents.x,
            4.0 * half_extents.y * half_extents.y,
            4.0 * half_extents.z * half_extents.z,
        ];
        let k = mass / 12.0;
        Self::new(
            position,
            mass,
            Vector::new(k * (y2 + z2), k * (x2 + z2), k * (x2 + y2)),
        )
    }

    pub fn from_rigid_body(body: &RigidBody) -> Self {
        let mprops = &body.mass_properties().local_mprops;
        Self {
            position: *body.position(),
            linvel: *body.linvel(),
            angvel: *body.angvel(),
            mass: body.mass(),
            local_com: mprops.local_com,
            local_inv_inertia: mprops.reconstruct_inverse_inertia_matrix(),
            linear_damping: body.linear_damping(),
            position_changed: false,
            wake_requested: false,
        }
    }

    /// Pushes velocities and damping (and the pose, if it was moved) back.
    pub fn write_back(&self, body: &mut RigidBody) {
        if self.position_changed {
            body.set_position(self.position, true);
        }
        if self.wake_requested {
            body.wake_up(true);
        }
        if !body.is_sleeping() {
            body.set_linvel(self.linvel, false);
            body.set_angvel(self.angvel, false);
        }
        if body.linear_damping() != self.linear_damping {
            body.set_linear_damping(self.linear_damping);
        }
    }

    /// Marks the chassis as driven: the next `write_back` wakes the body.
    pub fn request_wake(&mut self) {
        self.wake_requested = true;
    }

    pub fn wake_requested(&self) -> bool {
        self.wake_requested
    }

    pub fn with_velocity(mut self, linvel: Vector<Real>, angvel: Vector<Real>) -> Self {
        self.linvel = linvel;
        self.angvel = angvel;
        self
    }

    pub fn position(&self) -> &Isometry<Real> {
        &self.position
    }

    pub fn set_position(&mut self, position: Isometry<Real>) {
        self.position = position;
        self.position_changed = true;
    }

    pub fn linvel(&self) -> Vector<Real> {
        self.linvel
    }

    pub fn angvel(&self) -> Vector<Real> {
        self.angvel
    }

    pub fn set_linvel(&mut self, linvel: Vector<Real>) {
        self.linvel = linvel;
    }

    pub fn set_angvel(&mut self, angvel: Vector<Real>) {
        self.angvel = angvel;
    }

    pub fn mass(&self) -> Real {
        self.mass
    }

    pub fn inv_mass(&self) -> Real {
        if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 }
    }

    pub fn linear_damping(&self) -> Real {
        self.linear_damping
    }

    pub fn set_linear_damping(&mut self, damping: Real) {
        self.linear_damping = damping;
    }

    /// World-space centre of mass.
    pub fn center_of_mass(&self) -> Point<Real> {
        self.position * self.local_com
    }

    pub fn world_inv_inertia(&self) -> Matrix3<Real> {
        let rot = self.position.rotation.to_rotation_matrix().into_inner();
        rot * self.local_inv_inertia * rot.transpose()
    }

    /// v(p) = v_com + ω × (p - com)
    pub fn velocity_at_point(&self, point: &Point<Real>) -> Vector<Real> {
        self.linvel + self.angvel.cross(&(point - self.center_of_mass()))
    }

    pub fn apply_impulse(&mut self, impulse: Vector<Real>) {
        self.linvel += impulse * self.inv_mass();
    }

    pub fn apply_impulse_at_point(&mut self, impulse: Vector<Real>, point: &Point<Real>) {
        let r = point - self.center_of_mass();
        self.linvel += impulse * self.inv_mass();
        self.angvel += self.world_inv_inertia() * r.cross(&impulse);
    }

    /// Inverse of the effective mass felt by an impulse along `dir` at `point`.
    pub fn impulse_denominator(&self, point: &Point<Real>, dir: &Vector<Real>) -> Real {
        let r = point - self.center_of_mass();
        let ang = (self.world_inv_inertia() * r.cross(dir)).cross(&r);
        self.inv_mass() + dir.dot(&ang)
    }

    /// World-space direction of a local chassis axis.
    pub fn axis_ws(&self, axis: Axis) -> Vector<Real> {
        self.position.rotation * axis.unit()
    }

    pub fn forward_ws(&self, axes: &CoordinateSystem) -> Vector<Real> {
        self.axis_ws(axes.forward())
    }

    pub fn up_ws(&self, axes: &CoordinateSystem) -> Vector<Real> {
        self.axis_ws(axes.up())
    }

    pub fn right_ws(&self, axes: &CoordinateSystem) -> Vector<Real> {
        self.axis_ws(axes.right())
    }

    /// Speed along the chassis' forward axis; negative when reversing.
    pub fn signed_speed(&self, axes: &CoordinateSystem) -> Real {
        let speed = self.linvel.norm();
        if self.forward_ws(axes).dot(&self.linvel) < 0.0 {
            -speed
        } else {
            speed
        }
    }
}
