//! Raycast kart physics on top of rapier3d.
//!
//! [`kart_vehicle`] holds the engine-agnostic vehicle model (suspension,
//! friction, zipper, ground projection). [`kart`] binds it to kart properties
//! and player controls, and [`physics`] runs karts inside a rapier world.

pub mod config;
pub mod debug;
pub mod error;
pub mod kart;
pub mod kart_vehicle;
pub mod physics;
pub mod state;

pub use config::{KartProperties, VehicleConfig, WheelLayout, WheelTuning};
pub use error::{VehicleError, VehicleResult};
pub use kart::{Kart, KartControl, WheelId};
pub use kart_vehicle::{KartTuning, KartVehicle, VehicleRaycaster};
pub use physics::{PhysicsScene, PhysicsWorld, VehicleAction};
