//! Ground queries used by the suspension.
//!
//! The vehicle only sees the [`VehicleRaycaster`] trait. [`RapierRaycaster`]
//! answers it from a rapier query pipeline, skipping the kart's own chassis.

use rapier3d::prelude::{
    ColliderHandle, ColliderSet, Point, QueryFilter, QueryPipeline, Ray, Real, RigidBodyHandle,
    RigidBodySet, Vector,
};

use crate::kart_vehicle::types::SurfaceMaterial;

/// Nearest intersection along a vehicle ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastHit {
    /// Fraction of the ray's direction vector at which the hit occurred.
    pub fraction: Real,
    pub point: Point<Real>,
    pub normal: Vector<Real>,
    pub collider: Option<ColliderHandle>,
    pub material: SurfaceMaterial,
}

/// Synchronous ray query against the current state of the physics world.
pub trait VehicleRaycaster {
    /// Casts from `origin` along `direction`; the length of `direction` is the
    /// maximum distance, and `RaycastHit::fraction` is relative to it.
    fn cast(&self, origin: Point<Real>, direction: Vector<Real>) -> Option<RaycastHit>;
}

pub struct RapierRaycaster<'a> {
    query_pipeline: &'a QueryPipeline,
    bodies: &'a RigidBodySet,
    colliders: &'a ColliderSet,
    filter: QueryFilter<'a>,
}

impl<'a> RapierRaycaster<'a> {
    /// Raycaster that ignores every collider attached to `chassis`.
    pub fn new(
        query_pipeline: &'a QueryPipeline,
        bodies: &'a RigidBodySet,
        colliders: &'a ColliderSet,
        chassis: RigidBodyHandle,
    ) -> Self {
        Self {
            query_pipeline,
            bodies,
            colliders,
            filter: QueryFilter::default().exclude_rigid_body(chassis),
        }
    }
}

impl VehicleRaycaster for RapierRaycaster<'_> {
    fn cast(&self, origin: Point<Real>, direction: Vector<Real>) -> Option<RaycastHit> {
        let ray = Ray::new(origin, direction);
        let (handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            self.bodies,
            self.colliders,
            &ray,
            1.0,
            true,
            self.filter,
        )?;

        let friction = self
            .colliders
            .get(handle)
            .map(|c| c.friction())
            .unwrap_or(1.0);

        Some(RaycastHit {
            fraction: hit.time_of_impact,
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            collider: Some(handle),
            material: SurfaceMaterial { friction },
        })
    }
}
