/// Rolling animation of a polyhedron over the ground plane
///
/// The body always rests on one face. It turns about that face's leading
/// edge, the one furthest along the travel direction, until the neighboring
/// face lies flat; then that neighbor becomes the resting face and the next
/// leading edge is chosen.

use std::f32::consts::FRAC_PI_4;

use log::debug;
use nalgebra::{Isometry3, Matrix4, Point3, Vector3};

use crate::error::{AnimationError, GeometryError};
use crate::generator::{generate_polyhedron, PolyhedronConfig};
use crate::mesh::Mesh;
use crate::polyhedron::{Polyhedron, Side};
use crate::transform::{world_up, Pivot, Transform};

/// Rotation rate about the current pivot, in radians per second.
pub const ANGULAR_SPEED: f32 = FRAC_PI_4;

/// Index of the edge leaving the polygon furthest along `heading`.
///
/// The two vertices best aligned with `heading`, as seen from `center`, pick
/// the edge between them. When they are not adjacent the edge whose midpoint
/// is best aligned wins instead.
pub fn leading_edge(positions: &[Point3<f32>], center: &Point3<f32>, heading: &Vector3<f32>) -> usize {
    let n = positions.len();
    if n < 2 {
        return 0;
    }

    let alignment = |p: &Point3<f32>| {
        (p - center)
            .try_normalize(f32::EPSILON)
            .map_or(f32::MIN, |dir| dir.dot(heading))
    };
    let scores: Vec<f32> = positions.iter().map(alignment).collect();

    let mut point1 = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[point1] {
            point1 = i;
        }
    }
    let mut point2 = if point1 == 0 { 1 } else { 0 };
    for (i, score) in scores.iter().enumerate() {
        if i != point1 && *score > scores[point2] {
            point2 = i;
        }
    }

    let (low, high) = (point1.min(point2), point1.max(point2));
    if high - low == 1 {
        low
    } else if low == 0 && high == n - 1 {
        n - 1
    } else {
        debug!(
            "best aligned corners {} and {} are not adjacent, using edge midpoints",
            point1, point2
        );
        let mut best = 0;
        let mut best_score = f32::MIN;
        for i in 0..n {
            let mid = Point3::from((positions[i].coords + positions[(i + 1) % n].coords) * 0.5);
            let score = alignment(&mid);
            if score > best_score {
                best = i;
                best_score = score;
            }
        }
        best
    }
}

/// A polyhedron tumbling across the ground, one edge at a time.
#[derive(Debug, Clone)]
pub struct AnimatedPolyhedron {
    polyhedron: Polyhedron,
    mesh: Mesh,
    model_to_world: Isometry3<f32>,
    velocity: Vector3<f32>,
    pivot: Pivot,
    current_side: usize,
    current_edge: usize,
    plane_angle: f32,
    current_angle: f32,
    transitions: u64,
    stalled: bool,
}

impl AnimatedPolyhedron {
    /// Generates the polyhedron from `config` and places it at `config.origin`.
    pub fn new(config: &PolyhedronConfig) -> Result<Self, GeometryError> {
        let polyhedron = generate_polyhedron(config)?;
        Ok(Self::from_polyhedron(
            polyhedron,
            Point3::from(config.origin),
            config.initial_velocity(),
        ))
    }

    /// Starts resting on side 0 with its model origin at `origin`.
    pub fn from_polyhedron(polyhedron: Polyhedron, origin: Point3<f32>, velocity: Vector3<f32>) -> Self {
        let mesh = Mesh::from_polyhedron(&polyhedron);
        Self {
            polyhedron,
            mesh,
            model_to_world: Transform::translation(&origin),
            velocity,
            pivot: Pivot::at(origin),
            current_side: 0,
            current_edge: 0,
            plane_angle: 0.0,
            current_angle: 0.0,
            transitions: 0,
            stalled: false,
        }
    }

    /// Advances the animation by `dt` seconds.
    ///
    /// Once a face runs out of neighbors the body freezes in place: the error
    /// is returned from that call and later calls do nothing.
    pub fn update(&mut self, dt: f32) -> Result<(), AnimationError> {
        if self.stalled {
            return Ok(());
        }
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        if self.current_angle >= self.plane_angle {
            if self.plane_angle > 0.0 {
                let remaining = self.plane_angle - self.current_angle;
                self.model_to_world = self.pivot.rotation(remaining) * self.model_to_world;
                self.current_angle = self.plane_angle;
            }
            if let Err(err) = self.advance() {
                self.stalled = true;
                return Err(err);
            }
        }

        let step = ANGULAR_SPEED * dt;
        self.current_angle += step;
        self.model_to_world = self.pivot.rotation(step) * self.model_to_world;
        Ok(())
    }

    /// Moves onto the face across the leading edge of the resting face.
    fn advance(&mut self) -> Result<(), AnimationError> {
        let side = self
            .polyhedron
            .side(self.current_side)
            .ok_or(AnimationError::InvalidSide(self.current_side))?;

        let positions: Vec<_> = side.positions.iter().map(|p| self.model_to_world * p).collect();
        let center = self.model_to_world * side.center;
        let heading = self.velocity.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::x);
        let edge = leading_edge(&positions, &center, &heading);

        let neighbor = side.neighbor(edge).ok_or(AnimationError::MissingNeighbor {
            side: self.current_side,
            edge,
        })?;
        let next = self
            .polyhedron
            .side(neighbor.side)
            .ok_or(AnimationError::InvalidSide(neighbor.side))?;

        let cos = side.normal().dot(&next.normal()).clamp(-1.0, 1.0);
        self.plane_angle = cos.acos();
        self.current_angle = 0.0;
        self.pivot = self.pivot_for(next, neighbor.edge);

        if let Some(direction) = self.pivot.travel_direction() {
            self.velocity = direction * self.velocity.norm();
        }

        debug!(
            "side {} -> {} across edge {}, turning {:.3} rad",
            self.current_side, neighbor.side, edge, self.plane_angle
        );
        self.current_side = neighbor.side;
        self.current_edge = neighbor.edge;
        self.transitions += 1;
        Ok(())
    }

    /// World-space pivot on `edge` of `next`, ordered so that turning by a
    /// positive angle brings `next` down toward the ground.
    fn pivot_for(&self, next: &Side, edge: usize) -> Pivot {
        let (a, b) = next.edge(edge);
        let pivot = Pivot::new(self.model_to_world * a, self.model_to_world * b);
        let normal = self.model_to_world * next.normal();
        if pivot.axis().cross(&normal).dot(&world_up()) > 0.0 {
            pivot.reversed()
        } else {
            pivot
        }
    }

    pub fn polyhedron(&self) -> &Polyhedron {
        &self.polyhedron
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Rigid model-to-world transform.
    pub fn isometry(&self) -> &Isometry3<f32> {
        &self.model_to_world
    }

    pub fn model_to_world(&self) -> Matrix4<f32> {
        self.model_to_world.to_homogeneous()
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn pivot(&self) -> Pivot {
        self.pivot
    }

    /// The face the body currently rolls onto.
    pub fn current_side(&self) -> usize {
        self.current_side
    }

    /// Edge of [`Self::current_side`] the body turns about.
    pub fn current_edge(&self) -> usize {
        self.current_edge
    }

    /// Dihedral turn needed to finish the current pivot.
    pub fn plane_angle(&self) -> f32 {
        self.plane_angle
    }

    pub fn current_angle(&self) -> f32 {
        self.current_angle
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Model centroid in world space.
    pub fn world_centroid(&self) -> Point3<f32> {
        self.model_to_world * self.polyhedron.centroid()
    }

    /// Normal of `side` in world space.
    pub fn world_normal(&self, side: usize) -> Option<Vector3<f32>> {
        self.polyhedron
            .side(side)
            .map(|s| self.model_to_world * s.normal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::bounding_planes;
    use crate::plane::Plane;
    use crate::polyhedron::BuildOptions;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn rolling_cube() -> AnimatedPolyhedron {
        let poly = Polyhedron::from_planes(&bounding_planes(8.0), &BuildOptions::default()).unwrap();
        AnimatedPolyhedron::from_polyhedron(poly, Point3::new(0.0, 0.0, 8.0), Vector3::x())
    }

    /// Runs frames until the current pivot is complete, then lets the next
    /// update land it with a zero step.
    fn finish_pivot(anim: &mut AnimatedPolyhedron) {
        while anim.current_angle() < anim.plane_angle() {
            anim.update(0.05).unwrap();
        }
        anim.update(0.0).unwrap();
    }

    #[test]
    fn test_leading_edge_square() {
        let square = [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
        ];
        let center = Point3::origin();
        assert_eq!(leading_edge(&square, &center, &Vector3::x()), 1);
        assert_eq!(leading_edge(&square, &center, &Vector3::y()), 2);
        assert_eq!(leading_edge(&square, &center, &-Vector3::x()), 3);
        assert_eq!(leading_edge(&square, &center, &-Vector3::y()), 0);
    }

    #[test]
    fn test_leading_edge_non_adjacent_corners() {
        // Corners 0 and 2 tie toward +X with corner 1 tucked in between
        let notch = [
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.2, 1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
        ];
        assert_eq!(leading_edge(&notch, &Point3::origin(), &Vector3::x()), 1);
    }

    #[test]
    fn test_first_update_does_not_snap() {
        let mut anim = rolling_cube();
        let start = *anim.isometry();

        anim.update(0.0).unwrap();
        assert_relative_eq!(*anim.isometry(), start, epsilon = 1e-6);
        assert_eq!(anim.transitions(), 1);
        // Heading +X rolls onto the +X face
        assert_eq!(anim.current_side(), 3);
        assert_relative_eq!(anim.plane_angle(), FRAC_PI_2, epsilon = 1e-5);
        assert_eq!(anim.current_angle(), 0.0);
    }

    #[test]
    fn test_cube_rolls_one_width() {
        let mut anim = rolling_cube();
        anim.update(0.0).unwrap();
        finish_pivot(&mut anim);

        assert_eq!(anim.transitions(), 2);
        assert_relative_eq!(anim.world_centroid(), Point3::new(16.0, 0.0, 8.0), epsilon = 1e-3);
        // The +X face now rests on the ground
        let down = anim.world_normal(3).unwrap();
        assert_relative_eq!(down, -world_up(), epsilon = 1e-4);
        // and the body keeps heading +X
        assert_relative_eq!(anim.velocity(), Vector3::x(), epsilon = 1e-4);
        // onto what started as the top face
        assert_eq!(anim.current_side(), 1);
    }

    #[test]
    fn test_landed_face_is_flat_on_ground() {
        let mut anim = rolling_cube();
        anim.update(0.0).unwrap();
        for _ in 0..5 {
            let landing = anim.current_side();
            finish_pivot(&mut anim);

            assert_relative_eq!(anim.world_normal(landing).unwrap(), -world_up(), epsilon = 1e-3);
            let lowest = anim
                .polyhedron()
                .corners()
                .iter()
                .map(|p| (anim.isometry() * p).z)
                .fold(f32::MAX, f32::min);
            assert_relative_eq!(lowest, 0.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_pivot_turns_exactly_plane_angle() {
        let mut anim = rolling_cube();
        anim.update(0.0).unwrap();

        let start = *anim.isometry();
        let pivot = anim.pivot();
        let angle = anim.plane_angle();

        let dt = 0.07;
        while anim.transitions() == 1 {
            anim.update(dt).unwrap();
        }
        let next_step = anim.pivot().rotation(ANGULAR_SPEED * dt);
        let expected = next_step * pivot.rotation(angle) * start;
        assert_relative_eq!(
            anim.model_to_world(),
            expected.to_homogeneous(),
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_negative_dt_is_ignored() {
        let mut anim = rolling_cube();
        anim.update(0.0).unwrap();
        let before = *anim.isometry();
        anim.update(-1.0).unwrap();
        anim.update(f32::NAN).unwrap();
        assert_relative_eq!(*anim.isometry(), before, epsilon = 1e-6);
        assert_eq!(anim.current_angle(), 0.0);
    }

    #[test]
    fn test_missing_neighbor_stalls() {
        let floor = Plane::new(Vector3::new(0.0, 0.0, -1.0), 0.0).unwrap();
        let poly = Polyhedron::from_planes(&[floor], &BuildOptions::default()).unwrap();
        let mut anim = AnimatedPolyhedron::from_polyhedron(poly, Point3::origin(), Vector3::x());

        let before = *anim.isometry();
        let err = anim.update(0.1).unwrap_err();
        assert!(matches!(err, AnimationError::MissingNeighbor { side: 0, .. }));
        assert!(anim.is_stalled());

        assert!(anim.update(0.1).is_ok());
        assert_eq!(*anim.isometry(), before);
    }
}
