// ==============================================================================
// friction.rs — SEQUENTIAL WHEEL FRICTION
// ------------------------------------------------------------------------------
// Wheels are solved one after another in the order they were added. Each
// wheel reads the chassis velocity left behind by the wheels before it, then
// applies its own impulses immediately.
//
// Per grounded wheel:
//   side    = axle projected onto the contact plane
//   forward = normal × side
//   lateral = -k (side · v) / denom(side)       k = 1.0 grip, 0.2 sliding
//   longit. = engine·dt | rolling friction clamped to ±(brake + resistance)·dt
//   cap     = suspension force · dt · friction slip · surface friction
//
// Zipper: the grounded rear wheels share the impulse that brings the chassis'
// forward speed up to the zipper target. That longitudinal part is not capped.
// ==============================================================================

use rapier3d::prelude::{Point, Real, Vector};

use crate::kart_vehicle::chassis::ChassisState;
use crate::kart_vehicle::types::WheelContactState;
use crate::kart_vehicle::wheel::Wheel;

/// Lateral damping factor while sliding is allowed.
pub const SLIDING_SIDE_DAMPING: Real = 0.2;
/// Lateral damping factor in grip mode.
pub const GRIP_SIDE_DAMPING: Real = 1.0;

/// Per-step inputs for the friction solve.
#[derive(Copy, Clone, Debug)]
pub(crate) struct FrictionParams {
    pub dt: Real,
    pub sliding_allowed: bool,
    pub rolling_resistance: Real,
    pub roll_influence: Real,
    pub chassis_up: Vector<Real>,
    pub chassis_forward: Vector<Real>,
    pub gravity_center_shift: Real,
    /// Signed speed at the start of the step.
    pub speed: Real,
    pub max_speed: Real,
    pub friction_slip_override: Option<Real>,
    pub zipper_speed: Option<Real>,
}

/// Impulse along `dir` that removes `damping` of the relative velocity at
/// `point`, ground treated as static.
fn resolve_unilateral(
    chassis: &ChassisState,
    point: &Point<Real>,
    dir: &Vector<Real>,
    damping: Real,
) -> Real {
    let denom = chassis.impulse_denominator(point, dir);
    if denom <= 0.0 {
        return 0.0;
    }
    let rel_vel = dir.dot(&chassis.velocity_at_point(point));
    -damping * rel_vel / denom
}

/// Impulse that stops the contact along `dir`, shared between the grounded
/// wheels and clamped to `max_impulse`.
fn rolling_friction(
    chassis: &ChassisState,
    point: &Point<Real>,
    dir: &Vector<Real>,
    max_impulse: Real,
    wheels_on_ground: usize,
) -> Real {
    let denom = chassis.impulse_denominator(point, dir);
    if denom <= 0.0 || wheels_on_ground == 0 {
        return 0.0;
    }
    let vrel = dir.dot(&chassis.velocity_at_point(point));
    (-vrel / denom / wheels_on_ground as Real).clamp(-max_impulse, max_impulse)
}

fn engine_impulse(wheel: &Wheel, params: &FrictionParams) -> Real {
    let force = wheel.engine_force;
    let at_limit = (force > 0.0 && params.speed >= params.max_speed)
        || (force < 0.0 && params.speed <= -params.max_speed);
    if at_limit { 0.0 } else { force * params.dt }
}

/// Clips `(longitudinal, lateral)` to a circle of radius `max`. Returns the
/// new pair and the skid factor if it had to be cut.
fn friction_circle(
    longitudinal: Real,
    lateral: Real,
    max: Real,
    sliding_allowed: bool,
) -> (Real, Real, Option<Real>) {
    let magnitude = longitudinal.hypot(lateral);
    if magnitude <= max {
        return (longitudinal, lateral, None);
    }
    let skid = if magnitude > 0.0 { max / magnitude } else { 0.0 };
    if sliding_allowed {
        (longitudinal * skid, lateral * skid, Some(skid))
    } else {
        let lat = lateral.clamp(-max, max);
        let room = (max * max - lat * lat).max(0.0).sqrt();
        (longitudinal.clamp(-room, room), lat, Some(skid))
    }
}

/// Runs the friction solve and applies its impulses to `chassis`.
pub(crate) fn update_friction(
    wheels: &mut [Wheel],
    chassis: &mut ChassisState,
    params: &FrictionParams,
) {
    let wheels_on_ground = wheels.iter().filter(|w| w.is_in_contact()).count();

    // Zipper drive is computed once, from the velocity at the start of the solve.
    let drive_wheels = wheels
        .iter()
        .filter(|w| w.is_in_contact() && !w.is_front())
        .count();
    let zipper_impulse = match params.zipper_speed {
        Some(target) if drive_wheels > 0 => {
            let deficit = (target - chassis.linvel().dot(&params.chassis_forward)).max(0.0);
            Some(deficit * chassis.mass() / drive_wheels as Real)
        }
        _ => None,
    };

    let side_damping = if params.sliding_allowed {
        SLIDING_SIDE_DAMPING
    } else {
        GRIP_SIDE_DAMPING
    };
    let com_shifted = chassis.center_of_mass() + params.chassis_up * params.gravity_center_shift;

    for wheel in wheels.iter_mut() {
        wheel.clear_impulses();
        if !wheel.is_in_contact() {
            wheel.contact_state = WheelContactState::Airborne;
            continue;
        }

        let info = wheel.raycast_info;
        let normal = info.contact_normal_ws;
        let contact = info.contact_point_ws;

        let axle = info.wheel_axle_ws;
        let side = (axle - normal * axle.dot(&normal))
            .try_normalize(1.0e-5)
            .unwrap_or_else(Vector::zeros);
        let forward = normal.cross(&side).try_normalize(1.0e-5).unwrap_or_else(Vector::zeros);
        wheel.side_ws = side;
        wheel.forward_ws = forward;

        let lateral = resolve_unilateral(chassis, &contact, &side, side_damping);

        let zipper = zipper_impulse.filter(|_| !wheel.is_front());
        let longitudinal = match zipper {
            Some(drive) => drive,
            None if wheel.engine_force != 0.0 => engine_impulse(wheel, params),
            None => {
                let max = (wheel.brake + params.rolling_resistance).max(0.0) * params.dt;
                rolling_friction(chassis, &contact, &forward, max, wheels_on_ground)
            }
        };

        let slip = params
            .friction_slip_override
            .unwrap_or(wheel.tuning().friction_slip);
        let max_impulse =
            (wheel.suspension_force * params.dt * slip * info.surface.friction).max(0.0);

        let (longitudinal, lateral, skid) = if zipper.is_some() {
            let lat = lateral.clamp(-max_impulse, max_impulse);
            let skid = (lat != lateral).then(|| {
                if lateral != 0.0 { max_impulse / lateral.abs() } else { 0.0 }
            });
            (longitudinal, lat, skid)
        } else {
            friction_circle(longitudinal, lateral, max_impulse, params.sliding_allowed)
        };

        wheel.forward_impulse = longitudinal;
        wheel.side_impulse = lateral;
        match skid {
            Some(factor) => {
                wheel.skid_info = factor;
                wheel.contact_state = WheelContactState::Sliding;
            }
            None => {
                wheel.skid_info = 1.0;
                wheel.contact_state = WheelContactState::Grip;
            }
        }

        if longitudinal != 0.0 {
            chassis.apply_impulse_at_point(forward * longitudinal, &contact);
        }
        if lateral != 0.0 {
            // Lift the application point towards the centre of mass.
            let up = params.chassis_up;
            let height = up.dot(&(contact - com_shifted));
            let point = contact - up * (height * (1.0 - params.roll_influence));
            chassis.apply_impulse_at_point(side * lateral, &point);
        }
    }
}
