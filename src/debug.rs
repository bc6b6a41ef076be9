// ==============================================================================
// debug.rs — DEBUG OVERLAY PRIMITIVES
// ------------------------------------------------------------------------------
// Serializable debug primitives filled by KartVehicle::debug_draw():
// - DebugRay: suspension rays (hard point -> contact) and contact normals
// - DebugWheel: per-wheel numeric state (contact state, compression, impulses)
// - DebugChassis: chassis box pose
//
// Purely visualization scaffolding; nothing here feeds back into the physics.
// ==============================================================================

use rapier3d::prelude::{Isometry, Point, Real, Vector};
use serde::Serialize;

use crate::kart_vehicle::WheelContactState;

pub const COLOR_RAY_HIT: [f32; 3] = [0.0, 1.0, 0.0];
pub const COLOR_RAY_MISS: [f32; 3] = [1.0, 0.0, 0.0];
pub const COLOR_NORMAL: [f32; 3] = [0.2, 0.4, 1.0];

#[inline]
pub(crate) fn v3(v: Vector<Real>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

#[inline]
pub(crate) fn p3(p: Point<Real>) -> [f32; 3] {
    [p.x, p.y, p.z]
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DebugOverlay {
    pub chassis: Option<DebugChassis>,
    pub suspension_rays: Vec<DebugRay>,
    pub contact_normals: Vec<DebugRay>,
    pub wheels: Vec<DebugWheel>,
}

impl DebugOverlay {
    pub fn clear(&mut self) {
        self.chassis = None;
        self.suspension_rays.clear();
        self.contact_normals.clear();
        self.wheels.clear();
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DebugRay {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub length: f32,
    pub hit: Option<[f32; 3]>,
    pub color: [f32; 3],
}

#[derive(Clone, Debug, Serialize)]
pub struct DebugChassis {
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion i, j, k, w
    pub half_extents: [f32; 3],
}

impl DebugChassis {
    pub fn from_pose(pose: &Isometry<Real>, half_extents: [f32; 3]) -> Self {
        let q = pose.rotation;
        Self {
            position: v3(pose.translation.vector),
            rotation: [q.i, q.j, q.k, q.w],
            half_extents,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DebugWheel {
    pub index: usize,
    pub center: [f32; 3], // in world space
    pub radius: f32,
    pub state: WheelContactState,
    /// 0 at full extension, 1 fully compressed.
    pub compression: f32,
    pub suspension_force: f32,
    pub steering: f32,
    pub forward_impulse: f32,
    pub side_impulse: f32,
    pub skid_info: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_keeps_nothing() {
        let mut overlay = DebugOverlay {
            chassis: Some(DebugChassis::from_pose(&Isometry::identity(), [0.5, 0.2, 0.9])),
            ..DebugOverlay::default()
        };
        overlay.suspension_rays.push(DebugRay {
            origin: [0.0; 3],
            direction: [0.0, -1.0, 0.0],
            length: 1.0,
            hit: None,
            color: COLOR_RAY_MISS,
        });
        overlay.clear();
        assert!(overlay.chassis.is_none());
        assert!(overlay.suspension_rays.is_empty());
    }

    #[test]
    fn chassis_serializes_quaternion_xyzw() {
        let chassis = DebugChassis::from_pose(&Isometry::translation(1.0, 2.0, 3.0), [1.0; 3]);
        let json = serde_json::to_value(&chassis).unwrap();
        assert_eq!(json["rotation"], serde_json::json!([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(json["position"], serde_json::json!([1.0, 2.0, 3.0]));
    }
}
