use rapier3d::prelude::RigidBodySet;
use serde::Serialize;

use crate::debug::v3;
use crate::kart::{Kart, WheelId};
use crate::kart_vehicle::WheelContactState;

#[derive(Debug, Clone, Serialize)]
pub struct WheelSnapshot {
    pub id: WheelId,
    pub state: WheelContactState,
    pub suspension_length: f32,
    pub suspension_force: f32,
    pub steering: f32,
    pub rotation: f32,
    pub skid_info: f32,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct KartSnapshot {
    pub name: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion i, j, k, w
    pub speed: f32,
    pub wheels_on_ground: usize,
    pub zipper: Option<f32>,
    pub sliding: bool,
    pub wheels: Vec<WheelSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub karts: Vec<KartSnapshot>,
}

impl KartSnapshot {
    /// `None` if the kart's chassis is no longer in `bodies`.
    pub fn capture(kart: &Kart, bodies: &RigidBodySet) -> Option<Self> {
        let vehicle = kart.vehicle();
        let body = bodies.get(vehicle.chassis())?;
        let iso = body.position();

        let wheels = vehicle
            .wheels()
            .iter()
            .enumerate()
            .filter_map(|(index, wheel)| {
                Some(WheelSnapshot {
                    id: WheelId::from_index(index)?,
                    state: wheel.contact_state(),
                    suspension_length: wheel.suspension_length(),
                    suspension_force: wheel.suspension_force(),
                    steering: wheel.steering(),
                    rotation: wheel.rotation(),
                    skid_info: wheel.skid_info(),
                    position: v3(wheel.world_transform().translation.vector),
                })
            })
            .collect();

        Some(Self {
            name: kart.name().to_string(),
            position: v3(iso.translation.vector),
            rotation: [iso.rotation.i, iso.rotation.j, iso.rotation.k, iso.rotation.w],
            speed: vehicle.current_speed(),
            wheels_on_ground: vehicle.num_wheels_on_ground(),
            zipper: vehicle.zipper_speed(),
            sliding: vehicle.is_sliding_allowed(),
            wheels,
        })
    }
}
