/// Half-space planes
use nalgebra::{Point3, Unit, Vector3};

use crate::error::GeometryError;

/// Which side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// `dot(p, n) - dist > epsilon`: outside the half-space.
    Front,
    /// `dot(p, n) - dist < -epsilon`: inside the half-space.
    Back,
    /// Within `epsilon` of the plane.
    On,
}

impl PlaneSide {
    pub fn from_distance(distance: f32, epsilon: f32) -> Self {
        if distance > epsilon {
            PlaneSide::Front
        } else if distance < -epsilon {
            PlaneSide::Back
        } else {
            PlaneSide::On
        }
    }
}

/// A plane `dot(p, normal) = dist`. The half-space it bounds is its back side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Unit<Vector3<f32>>,
    pub dist: f32,
}

impl Plane {
    /// Build a plane from any non-zero normal, normalizing it.
    pub fn new(normal: Vector3<f32>, dist: f32) -> Result<Self, GeometryError> {
        match Unit::try_new(normal, f32::EPSILON) {
            Some(normal) if normal.iter().all(|c| c.is_finite()) && dist.is_finite() => {
                Ok(Self { normal, dist })
            }
            _ => Err(GeometryError::DegenerateNormal(normal.x, normal.y, normal.z)),
        }
    }

    pub fn from_unit(normal: Unit<Vector3<f32>>, dist: f32) -> Self {
        Self { normal, dist }
    }

    #[inline]
    pub fn signed_distance(&self, point: &Point3<f32>) -> f32 {
        self.normal.dot(&point.coords) - self.dist
    }

    pub fn classify(&self, point: &Point3<f32>, epsilon: f32) -> PlaneSide {
        PlaneSide::from_distance(self.signed_distance(point), epsilon)
    }

    /// Point on the plane closest to the origin.
    pub fn origin(&self) -> Point3<f32> {
        Point3::from(self.normal.into_inner() * self.dist)
    }

    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            dist: -self.dist,
        }
    }

    /// Same orientation and offset within `epsilon`.
    pub fn approx_eq(&self, other: &Plane, epsilon: f32) -> bool {
        (self.normal.into_inner() - other.normal.into_inner()).norm() <= epsilon
            && (self.dist - other.dist).abs() <= epsilon
    }
}
