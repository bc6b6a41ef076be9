// ==============================================================================
// suspension.rs — WHEEL RAYCAST + SPRING/DAMPER
// ------------------------------------------------------------------------------
// Per wheel, every step:
//   1) refresh_wheel_ws():   hard point / direction / axle from the chassis pose
//   2) ray_cast():           hard point -> along direction, length rest+radius+travel
//   3) update_suspension():  spring + damper force, clamped to [0, max force]
//   4) apply_suspension():   normal * force * dt at the contact point
//
// Suspension length is always kept inside [0, rest + travel]. Contacts that are
// nearly parallel to the ray (normal·dir > -0.1) or carry non-finite data are
// dropped and the wheel is treated as airborne.
// ==============================================================================

use nalgebra::{Unit, UnitQuaternion};
use rapier3d::prelude::{Real, Vector};
use tracing::debug;

use crate::kart_vehicle::chassis::ChassisState;
use crate::kart_vehicle::raycast::{RaycastHit, VehicleRaycaster};
use crate::kart_vehicle::types::{SurfaceMaterial, WheelContactState};
use crate::kart_vehicle::wheel::Wheel;

/// Contacts whose normal is closer than this to perpendicular with the
/// suspension ray are rejected.
const MIN_CONTACT_ALIGNMENT: Real = -0.1;

/// Steering rotation about the suspension direction (chassis down), so a
/// positive angle turns the wheel clockwise seen from above: to the right.
pub(crate) fn steering_rotation(direction_ws: &Vector<Real>, steering: Real) -> UnitQuaternion<Real> {
    match Unit::try_new(*direction_ws, 1.0e-6) {
        Some(up) => UnitQuaternion::from_axis_angle(&up, steering),
        None => UnitQuaternion::identity(),
    }
}

/// Updates the world-space hard point, direction and (steered) axle.
pub(crate) fn refresh_wheel_ws(wheel: &mut Wheel, chassis: &ChassisState) {
    let pose = chassis.position();
    let direction = (pose.rotation * wheel.direction())
        .try_normalize(1.0e-6)
        .unwrap_or_else(Vector::zeros);
    let axle = (pose.rotation * wheel.axle())
        .try_normalize(1.0e-6)
        .unwrap_or_else(Vector::zeros);

    let hard_point = pose * wheel.connection_point();
    let axle = steering_rotation(&direction, wheel.steering) * axle;

    let info = &mut wheel.raycast_info;
    info.hard_point_ws = hard_point;
    info.wheel_direction_ws = direction;
    info.wheel_axle_ws = axle;
}

/// Full ray length for a wheel: rest length + radius + max travel.
pub(crate) fn ray_length(wheel: &Wheel) -> Real {
    wheel.max_suspension_length() + wheel.radius()
}

fn accept_hit(wheel: &Wheel, hit: &RaycastHit) -> Option<Vector<Real>> {
    let finite = hit.fraction.is_finite()
        && hit.point.coords.iter().all(|c| c.is_finite())
        && hit.normal.iter().all(|c| c.is_finite())
        && hit.material.friction.is_finite();
    if !finite {
        debug!(fraction = hit.fraction, "dropping non-finite wheel contact");
        return None;
    }
    let normal = hit.normal.try_normalize(1.0e-6)?;
    let alignment = normal.dot(&wheel.raycast_info.wheel_direction_ws);
    if alignment > MIN_CONTACT_ALIGNMENT {
        debug!(alignment, "dropping wheel contact parallel to the suspension");
        return None;
    }
    Some(normal)
}

fn set_airborne(wheel: &mut Wheel) {
    let ray_len = ray_length(wheel);
    let max_len = wheel.max_suspension_length();
    let info = &mut wheel.raycast_info;
    info.is_in_contact = false;
    info.suspension_length = max_len;
    info.contact_normal_ws = -info.wheel_direction_ws;
    info.contact_point_ws = info.hard_point_ws + info.wheel_direction_ws * ray_len;
    info.hit_fraction = 1.0;
    info.ground_object = None;
    info.surface = SurfaceMaterial::default();

    wheel.clipped_inv_contact_dot_suspension = 1.0;
    wheel.suspension_relative_velocity = 0.0;
    wheel.contact_state = WheelContactState::Airborne;
}

/// Casts the suspension ray. Returns whether the wheel touches the ground.
pub(crate) fn ray_cast(wheel: &mut Wheel, raycaster: &dyn VehicleRaycaster) -> bool {
    let ray_len = ray_length(wheel);
    let origin = wheel.raycast_info.hard_point_ws;
    let direction = wheel.raycast_info.wheel_direction_ws;

    let Some(hit) = raycaster.cast(origin, direction * ray_len) else {
        set_airborne(wheel);
        return false;
    };
    let Some(normal) = accept_hit(wheel, &hit) else {
        set_airborne(wheel);
        return false;
    };

    let fraction = hit.fraction.clamp(0.0, 1.0);
    let length = (fraction * ray_len - wheel.radius()).clamp(0.0, wheel.max_suspension_length());
    let alignment = normal.dot(&direction);

    let info = &mut wheel.raycast_info;
    info.is_in_contact = true;
    info.hit_fraction = fraction;
    info.suspension_length = length;
    info.contact_point_ws = hit.point;
    info.contact_normal_ws = normal;
    info.ground_object = hit.collider;
    info.surface = hit.material;

    // alignment <= -0.1 here, so this stays in (0, 10].
    wheel.clipped_inv_contact_dot_suspension = -1.0 / alignment;
    true
}

/// Spring/damper force for one wheel, in newtons.
///
/// Stiffness and damping are per unit of chassis mass. The damper works on the
/// change of suspension length since the previous step, so a wheel that just
/// landed gets no damping.
pub(crate) fn update_suspension(wheel: &mut Wheel, chassis_mass: Real, dt: Real) {
    if !wheel.raycast_info.is_in_contact {
        wheel.suspension_force = 0.0;
        wheel.suspension_relative_velocity = 0.0;
        wheel.previous_length = None;
        return;
    }

    let length = wheel.raycast_info.suspension_length;
    let rate = match wheel.previous_length {
        Some(prev) if dt > 0.0 => (length - prev) / dt,
        _ => 0.0,
    };
    wheel.suspension_relative_velocity = rate;
    wheel.previous_length = Some(length);

    let tuning = *wheel.tuning();
    let spring = tuning.suspension_stiffness
        * (wheel.suspension_rest_length() - length)
        * wheel.clipped_inv_contact_dot_suspension;
    let damping = if rate < 0.0 {
        tuning.suspension_compression
    } else {
        tuning.suspension_damping
    };

    let force = (spring - damping * rate) * chassis_mass;
    wheel.suspension_force = if force.is_finite() {
        force.clamp(0.0, tuning.max_suspension_force)
    } else {
        0.0
    };
}

/// Pushes the chassis along the contact normal at the contact point.
pub(crate) fn apply_suspension(wheel: &Wheel, chassis: &mut ChassisState, dt: Real) {
    if !wheel.raycast_info.is_in_contact || wheel.suspension_force <= 0.0 {
        return;
    }
    let info = &wheel.raycast_info;
    let impulse = info.contact_normal_ws * (wheel.suspension_force * dt);
    chassis.apply_impulse_at_point(impulse, &info.contact_point_ws);
}
