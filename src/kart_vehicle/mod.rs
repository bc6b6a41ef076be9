//! Engine-agnostic raycast kart vehicle.
//!
//! The vehicle never owns the chassis body or the world. Each step it works
//! on a [`ChassisState`] snapshot, queries the ground through a
//! [`VehicleRaycaster`], and reads kart-wide values through [`KartTuning`].

pub mod chassis;
pub mod friction;
pub mod raycast;
pub mod suspension;
pub mod types;
pub mod vehicle;
pub mod wheel;

pub use chassis::ChassisState;
pub use raycast::{RapierRaycaster, RaycastHit, VehicleRaycaster};
pub use types::{Axis, CoordinateSystem, SurfaceMaterial, WheelContactState};
pub use vehicle::{KartTuning, KartVehicle};
pub use wheel::{RaycastInfo, Wheel, WheelDesc};
