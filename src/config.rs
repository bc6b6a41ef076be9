// src/config.rs
//
// Tuning values for karts. Everything here is plain data: wheel tuning is
// copied into each wheel when it is added, vehicle config is owned by the
// vehicle, and kart properties describe a whole kart for spawning.

use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

use crate::error::{VehicleError, VehicleResult};
use crate::kart_vehicle::CoordinateSystem;

/// Suspension and friction parameters captured by a wheel when it is added.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelTuning {
    /// Spring stiffness per unit of chassis mass.
    pub suspension_stiffness: Real,
    /// Damping (per unit of chassis mass) while the suspension compresses.
    pub suspension_compression: Real,
    /// Damping (per unit of chassis mass) while the suspension extends.
    pub suspension_damping: Real,
    /// How far past its rest length the suspension may extend (m).
    pub max_suspension_travel: Real,
    /// Traction multiplier; larger values grip harder before sliding.
    pub friction_slip: Real,
    /// Upper bound on the suspension force (N).
    pub max_suspension_force: Real,
}

impl Default for WheelTuning {
    fn default() -> Self {
        Self {
            suspension_stiffness: 5.88,
            suspension_compression: 0.83,
            suspension_damping: 0.88,
            max_suspension_travel: 5.0,
            friction_slip: 10.5,
            max_suspension_force: 6000.0,
        }
    }
}

impl WheelTuning {
    pub fn validate(&self) -> VehicleResult<()> {
        let fields = [
            ("suspension_stiffness", self.suspension_stiffness),
            ("suspension_compression", self.suspension_compression),
            ("suspension_damping", self.suspension_damping),
            ("max_suspension_travel", self.max_suspension_travel),
            ("friction_slip", self.friction_slip),
            ("max_suspension_force", self.max_suspension_force),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(VehicleError::InvalidTuning {
                    field,
                    reason: "must be finite",
                });
            }
            if value < 0.0 {
                return Err(VehicleError::InvalidTuning {
                    field,
                    reason: "must not be negative",
                });
            }
        }
        Ok(())
    }
}

/// Vehicle-wide parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub coordinate_system: CoordinateSystem,
    /// Linear damping written to the chassis every step.
    pub chassis_damping: Real,
    /// 0 = side impulses act at centre-of-mass height, 1 = at the contact.
    pub roll_influence: Real,
    /// Force (N) opposing rolling when neither engine nor brake acts.
    pub rolling_resistance: Real,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            coordinate_system: CoordinateSystem::default(),
            chassis_damping: 0.0,
            roll_influence: 0.1,
            rolling_resistance: 0.0,
        }
    }
}

/// Geometry shared by the four wheels of a kart.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelLayout {
    pub wheel_base: f32,          // meters (front axle to rear axle)
    pub track_width: f32,         // meters (left to right)
    pub connection_height: f32,   // chassis-local height of the hard points
    pub radius: f32,              // wheel radius
    pub suspension_rest_length: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KartProperties {
    pub name: String,
    pub mass: f32,                      // kg
    pub chassis_half_extents: [f32; 3], // [hx, hy, hz] meters
    pub engine_force: f32,              // N, split over the rear wheels
    pub brake_force: f32,               // N per wheel
    pub max_speed: f32,                 // m/s
    pub max_speed_reverse_ratio: f32,   // fraction of max_speed in reverse
    pub max_steer_angle: f32,           // radians
    pub friction_slip: Option<f32>,     // overrides the wheel tuning when set
    pub gravity_center_shift: f32,      // m, along chassis up
    pub angular_damping: f32,
    pub wheels: WheelLayout,
    pub tuning: WheelTuning,
    #[serde(default)]
    pub vehicle: VehicleConfig,
}

impl KartProperties {
    pub fn from_json_str(json: &str) -> VehicleResult<Self> {
        let props: KartProperties = serde_json::from_str(json)?;
        props.tuning.validate()?;
        if props.mass <= 0.0 || !props.mass.is_finite() {
            return Err(VehicleError::Config {
                detail: "mass must be positive".into(),
            });
        }
        Ok(props)
    }

    /// Volume of the chassis box, used to turn mass into collider density.
    pub fn chassis_volume(&self) -> f32 {
        let [hx, hy, hz] = self.chassis_half_extents;
        8.0 * hx * hy * hz
    }
}

pub fn tux() -> KartProperties {
    KartProperties {
        name: "tux".into(),
        mass: 225.0,
        chassis_half_extents: [0.5, 0.2, 0.9],
        engine_force: 1800.0,
        brake_force: 900.0,
        max_speed: 22.0,
        max_speed_reverse_ratio: 0.5,
        max_steer_angle: 0.55,
        friction_slip: None,
        gravity_center_shift: 0.0,
        angular_damping: 0.6,
        wheels: WheelLayout {
            wheel_base: 1.4,
            track_width: 0.9,
            connection_height: -0.1,
            radius: 0.25,
            suspension_rest_length: 0.2,
        },
        tuning: WheelTuning {
            suspension_stiffness: 40.0,
            suspension_compression: 2.0,
            suspension_damping: 3.0,
            max_suspension_travel: 0.3,
            friction_slip: 10.5,
            max_suspension_force: 12_000.0,
        },
        vehicle: VehicleConfig::default(),
    }
}

pub fn heavy() -> KartProperties {
    KartProperties {
        name: "heavy".into(),
        mass: 320.0,
        engine_force: 2100.0,
        brake_force: 1200.0,
        max_speed: 20.0,
        max_steer_angle: 0.45,
        gravity_center_shift: -0.05,
        angular_damping: 1.0,
        ..tux()
    }
}
