/// Rigid transforms for rolling about an edge
use nalgebra::{Isometry3, Matrix4, Point3, Translation3, Unit, UnitQuaternion, Vector3};

/// World up direction. The ground is the XY plane.
pub fn world_up() -> Vector3<f32> {
    Vector3::z()
}

/// An edge in world space that the body rotates about.
///
/// A positive angle turns counter-clockwise about `v1 - v2`, anchored at `v1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub v1: Point3<f32>,
    pub v2: Point3<f32>,
}

impl Pivot {
    pub fn new(v1: Point3<f32>, v2: Point3<f32>) -> Self {
        Self { v1, v2 }
    }

    /// A pivot with no axis; rotating about it does nothing.
    pub fn at(point: Point3<f32>) -> Self {
        Self::new(point, point)
    }

    pub fn axis(&self) -> Vector3<f32> {
        self.v1 - self.v2
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.v2, self.v1)
    }

    /// Rotation by `angle` radians about this edge.
    pub fn rotation(&self, angle: f32) -> Isometry3<f32> {
        match Unit::try_new(self.axis(), f32::EPSILON) {
            Some(axis) => Isometry3::rotation_wrt_point(UnitQuaternion::from_axis_angle(&axis, angle), self.v1),
            None => Isometry3::identity(),
        }
    }

    /// Horizontal direction the body travels while turning about this edge.
    pub fn travel_direction(&self) -> Option<Vector3<f32>> {
        self.axis().cross(&world_up()).try_normalize(f32::EPSILON)
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a translation
    pub fn translation(point: &Point3<f32>) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(point.coords), UnitQuaternion::identity())
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}
