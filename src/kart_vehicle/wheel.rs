// ==============================================================================
// wheel.rs — PER-WHEEL CONFIGURATION + STATE
// ------------------------------------------------------------------------------
// A Wheel bundles:
// - the static description it was added with (WheelDesc), kept verbatim
// - the tuning snapshot taken at add time (WheelTuning)
// - controls written by the game layer every frame (steering/engine/brake)
// - raycast + suspension results for the current step (RaycastInfo)
// - friction results (impulses, skid info, contact state)
// - the render transform refreshed after integration
// ==============================================================================

use rapier3d::prelude::{ColliderHandle, Isometry, Point, Real, Vector};

use crate::config::WheelTuning;
use crate::error::{VehicleError, VehicleResult};
use crate::kart_vehicle::types::{SurfaceMaterial, WheelContactState};

/// Static wheel parameters, all in the chassis' local frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WheelDesc {
    /// Where the suspension is attached to the chassis.
    pub connection_point: Point<Real>,
    /// Direction the suspension extends in (the ray direction).
    pub direction: Vector<Real>,
    /// Wheel axle; `up × axle` is the rolling direction.
    pub axle: Vector<Real>,
    pub suspension_rest_length: Real,
    pub radius: Real,
    pub is_front: bool,
}

impl WheelDesc {
    pub fn validate(&self) -> VehicleResult<()> {
        let finite = self.connection_point.coords.iter().all(|c| c.is_finite())
            && self.direction.iter().all(|c| c.is_finite())
            && self.axle.iter().all(|c| c.is_finite());
        if !finite {
            return Err(VehicleError::InvalidWheel {
                field: "geometry",
                reason: "must be finite",
            });
        }
        if !(self.radius > 0.0) || !self.radius.is_finite() {
            return Err(VehicleError::InvalidWheel {
                field: "radius",
                reason: "must be positive",
            });
        }
        if !(self.suspension_rest_length >= 0.0) || !self.suspension_rest_length.is_finite() {
            return Err(VehicleError::InvalidWheel {
                field: "suspension_rest_length",
                reason: "must not be negative",
            });
        }
        let Some(dir) = self.direction.try_normalize(1.0e-6) else {
            return Err(VehicleError::InvalidWheel {
                field: "direction",
                reason: "must not be zero",
            });
        };
        let Some(axle) = self.axle.try_normalize(1.0e-6) else {
            return Err(VehicleError::InvalidWheel {
                field: "axle",
                reason: "must not be zero",
            });
        };
        if dir.cross(&axle).norm() < 1.0e-3 {
            return Err(VehicleError::InvalidWheel {
                field: "axle",
                reason: "must not be parallel to the suspension direction",
            });
        }
        Ok(())
    }
}

/// Ground information gathered by the suspension raycast.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastInfo {
    /// World-space start of the ray (chassis connection point).
    pub hard_point_ws: Point<Real>,
    /// World-space suspension direction (unit).
    pub wheel_direction_ws: Vector<Real>,
    /// World-space axle, including steering (unit).
    pub wheel_axle_ws: Vector<Real>,
    pub contact_point_ws: Point<Real>,
    pub contact_normal_ws: Vector<Real>,
    pub suspension_length: Real,
    pub is_in_contact: bool,
    /// Hit fraction along the full ray; 1.0 on a miss.
    pub hit_fraction: Real,
    pub ground_object: Option<ColliderHandle>,
    pub surface: SurfaceMaterial,
}

impl Default for RaycastInfo {
    fn default() -> Self {
        Self {
            hard_point_ws: Point::origin(),
            wheel_direction_ws: Vector::zeros(),
            wheel_axle_ws: Vector::zeros(),
            contact_point_ws: Point::origin(),
            contact_normal_ws: Vector::zeros(),
            suspension_length: 0.0,
            is_in_contact: false,
            hit_fraction: 1.0,
            ground_object: None,
            surface: SurfaceMaterial::default(),
        }
    }
}

/// A wheel attached to a kart vehicle.
#[derive(Clone, Debug, PartialEq)]
pub struct Wheel {
    desc: WheelDesc,
    tuning: WheelTuning,

    pub(crate) steering: Real,
    pub(crate) engine_force: Real,
    pub(crate) brake: Real,

    pub(crate) raycast_info: RaycastInfo,
    /// Suspension length of the previous step while it was in contact.
    pub(crate) previous_length: Option<Real>,
    /// (length - previous length) / dt; negative while compressing.
    pub(crate) suspension_relative_velocity: Real,
    pub(crate) clipped_inv_contact_dot_suspension: Real,
    pub(crate) suspension_force: Real,

    pub(crate) forward_ws: Vector<Real>,
    pub(crate) side_ws: Vector<Real>,
    pub(crate) forward_impulse: Real,
    pub(crate) side_impulse: Real,
    pub(crate) skid_info: Real,
    pub(crate) contact_state: WheelContactState,

    pub(crate) rotation: Real,
    pub(crate) delta_rotation: Real,
    pub(crate) world_transform: Isometry<Real>,
}

impl Wheel {
    pub(crate) fn new(desc: WheelDesc, tuning: WheelTuning) -> Self {
        let mut wheel = Self {
            desc,
            tuning,
            steering: 0.0,
            engine_force: 0.0,
            brake: 0.0,
            raycast_info: RaycastInfo::default(),
            previous_length: None,
            suspension_relative_velocity: 0.0,
            clipped_inv_contact_dot_suspension: 1.0,
            suspension_force: 0.0,
            forward_ws: Vector::zeros(),
            side_ws: Vector::zeros(),
            forward_impulse: 0.0,
            side_impulse: 0.0,
            skid_info: 1.0,
            contact_state: WheelContactState::Airborne,
            rotation: 0.0,
            delta_rotation: 0.0,
            world_transform: Isometry::identity(),
        };
        wheel.raycast_info.suspension_length = desc.suspension_rest_length;
        wheel
    }

    pub fn desc(&self) -> &WheelDesc {
        &self.desc
    }

    pub fn tuning(&self) -> &WheelTuning {
        &self.tuning
    }

    pub fn connection_point(&self) -> Point<Real> {
        self.desc.connection_point
    }

    pub fn direction(&self) -> Vector<Real> {
        self.desc.direction
    }

    pub fn axle(&self) -> Vector<Real> {
        self.desc.axle
    }

    pub fn suspension_rest_length(&self) -> Real {
        self.desc.suspension_rest_length
    }

    pub fn radius(&self) -> Real {
        self.desc.radius
    }

    pub fn is_front(&self) -> bool {
        self.desc.is_front
    }

    /// Longest legal suspension length (fully extended).
    pub fn max_suspension_length(&self) -> Real {
        self.desc.suspension_rest_length + self.tuning.max_suspension_travel
    }

    pub fn raycast_info(&self) -> &RaycastInfo {
        &self.raycast_info
    }

    pub fn suspension_length(&self) -> Real {
        self.raycast_info.suspension_length
    }

    pub fn suspension_force(&self) -> Real {
        self.suspension_force
    }

    pub fn is_in_contact(&self) -> bool {
        self.raycast_info.is_in_contact
    }

    pub fn contact_state(&self) -> WheelContactState {
        self.contact_state
    }

    pub fn steering(&self) -> Real {
        self.steering
    }

    pub fn engine_force(&self) -> Real {
        self.engine_force
    }

    pub fn brake(&self) -> Real {
        self.brake
    }

    pub fn rotation(&self) -> Real {
        self.rotation
    }

    /// Longitudinal impulse applied this step (N·s).
    pub fn forward_impulse(&self) -> Real {
        self.forward_impulse
    }

    /// Lateral impulse applied this step (N·s).
    pub fn side_impulse(&self) -> Real {
        self.side_impulse
    }

    /// 1.0 while gripping; the cut-back factor while sliding.
    pub fn skid_info(&self) -> Real {
        self.skid_info
    }

    /// World transform for rendering, refreshed after integration.
    pub fn world_transform(&self) -> &Isometry<Real> {
        &self.world_transform
    }

    /// Puts the wheel back into its rest position without ground contact.
    pub(crate) fn reset_suspension(&mut self) {
        let info = &mut self.raycast_info;
        info.suspension_length = self.desc.suspension_rest_length;
        info.contact_normal_ws = -info.wheel_direction_ws;
        self.previous_length = None;
        self.suspension_relative_velocity = 0.0;
        self.clipped_inv_contact_dot_suspension = 1.0;
    }

    pub(crate) fn clear_impulses(&mut self) {
        self.forward_impulse = 0.0;
        self.side_impulse = 0.0;
        self.skid_info = 1.0;
    }
}
