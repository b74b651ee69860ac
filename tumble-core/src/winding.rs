/// Convex polygon windings and half-space clipping
use nalgebra::{Point3, Vector2, Vector3};

use crate::error::GeometryError;
use crate::plane::{Plane, PlaneSide};

/// Half size of the quad produced by [`Winding::base_for_plane`].
pub const BASE_WINDING_EXTENT: f32 = 1024.0;

/// Texture repeat count across a base winding.
pub const BASE_WINDING_TEXTURE_SCALE: f32 = 64.0;

/// Default thickness of the "on plane" band used when chopping.
pub const ON_EPSILON: f32 = 0.01;

/// A winding corner: position plus the attributes carried through clipping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindingVertex {
    pub position: Point3<f32>,
    pub texcoord: Vector2<f32>,
    pub normal: Vector3<f32>,
}

impl WindingVertex {
    pub fn new(position: Point3<f32>, texcoord: Vector2<f32>, normal: Vector3<f32>) -> Self {
        Self {
            position,
            texcoord,
            normal,
        }
    }

    /// Interpolates position and texcoord toward `other`. The normal stays this vertex's.
    pub fn lerp_toward(&self, other: &WindingVertex, t: f32) -> Self {
        Self {
            position: self.position.lerp(&other.position, t),
            texcoord: self.texcoord.lerp(&other.texcoord, t),
            normal: self.normal,
        }
    }
}

/// Where a whole winding lies relative to a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindingSide {
    Front,
    Back,
    /// Every point is within the epsilon band.
    On,
    /// Points on both sides.
    Cross,
}

/// An ordered, cyclic, convex and planar polygon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Winding {
    pub points: Vec<WindingVertex>,
}

/// Index of the largest absolute component, `None` for a zero or non-finite vector.
pub(crate) fn major_axis(v: &Vector3<f32>) -> Option<usize> {
    let mut axis = None;
    let mut max = 0.0;
    for (i, c) in v.iter().enumerate() {
        if !c.is_finite() {
            return None;
        }
        if c.abs() > max {
            max = c.abs();
            axis = Some(i);
        }
    }
    axis
}

impl Winding {
    pub fn new(points: Vec<WindingVertex>) -> Self {
        Self { points }
    }

    /// A huge quad lying in `plane`, to be cut down by the other planes.
    ///
    /// Corners are emitted as `origin - right + up`, `origin + right + up`,
    /// `origin + right - up`, `origin - right - up` with
    /// `right = cross(up, normal)`, which is clockwise when looking at the
    /// front of the plane.
    pub fn base_for_plane(plane: &Plane) -> Result<Self, GeometryError> {
        let normal = plane.normal.into_inner();
        let seed = match major_axis(&normal) {
            Some(0) | Some(1) => Vector3::z(),
            Some(_) => Vector3::x(),
            None => return Err(GeometryError::DegenerateNormal(normal.x, normal.y, normal.z)),
        };

        let vup = (seed - normal * seed.dot(&normal)).normalize();
        let vright = vup.cross(&normal);

        let vup = vup * BASE_WINDING_EXTENT;
        let vright = vright * BASE_WINDING_EXTENT;
        let origin = plane.origin();

        let s = BASE_WINDING_TEXTURE_SCALE;
        let points = vec![
            WindingVertex::new(origin - vright + vup, Vector2::new(0.0, 0.0), normal),
            WindingVertex::new(origin + vright + vup, Vector2::new(s, 0.0), normal),
            WindingVertex::new(origin + vright - vup, Vector2::new(s, s), normal),
            WindingVertex::new(origin - vright - vup, Vector2::new(0.0, s), normal),
        ];

        Ok(Self { points })
    }

    /// Keeps the part of the winding behind `plane` (Sutherland-Hodgman).
    ///
    /// A winding with no point in front or no point behind is returned
    /// untouched, so a winding lying inside the epsilon band of a coincident
    /// plane is never truncated by it.
    pub fn chop_in_place(self, plane: &Plane, epsilon: f32) -> Winding {
        let n = self.points.len();
        let dists: Vec<f32> = self
            .points
            .iter()
            .map(|v| plane.signed_distance(&v.position))
            .collect();
        let sides: Vec<PlaneSide> = dists
            .iter()
            .map(|&d| PlaneSide::from_distance(d, epsilon))
            .collect();

        let front = sides.iter().filter(|s| **s == PlaneSide::Front).count();
        let back = sides.iter().filter(|s| **s == PlaneSide::Back).count();
        if front == 0 || back == 0 {
            return self;
        }

        let mut points = Vec::with_capacity(n + 4);
        for i in 0..n {
            let p1 = &self.points[i];

            match sides[i] {
                PlaneSide::On => {
                    points.push(*p1);
                    continue;
                }
                PlaneSide::Back => points.push(*p1),
                PlaneSide::Front => {}
            }

            let j = (i + 1) % n;
            if sides[j] == PlaneSide::On || sides[j] == sides[i] {
                continue;
            }

            // Zero crossing of the edge p1 -> p2
            let t = dists[i] / (dists[i] - dists[j]);
            points.push(p1.lerp_toward(&self.points[j], t));
        }

        Winding { points }
    }

    pub fn classify(&self, plane: &Plane, epsilon: f32) -> WindingSide {
        let mut front = false;
        let mut back = false;
        for v in &self.points {
            match plane.classify(&v.position, epsilon) {
                PlaneSide::Front => front = true,
                PlaneSide::Back => back = true,
                PlaneSide::On => {}
            }
        }

        match (front, back) {
            (true, true) => WindingSide::Cross,
            (true, false) => WindingSide::Front,
            (false, true) => WindingSide::Back,
            (false, false) => WindingSide::On,
        }
    }

    /// Welds consecutive points closer than `epsilon`, including the closing pair.
    pub fn remove_degenerate_points(mut self, epsilon: f32) -> Winding {
        let mut points: Vec<WindingVertex> = Vec::with_capacity(self.points.len());
        for v in self.points.drain(..) {
            match points.last() {
                Some(last) if (last.position - v.position).norm() <= epsilon => {}
                _ => points.push(v),
            }
        }
        while points.len() > 1 {
            let (first, last) = (points[0].position, points[points.len() - 1].position);
            if (first - last).norm() > epsilon {
                break;
            }
            points.pop();
        }
        Winding { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.points.iter().map(|v| v.position)
    }

    /// Average of the corner positions.
    pub fn center(&self) -> Point3<f32> {
        if self.points.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.position.coords);
        Point3::from(sum / self.points.len() as f32)
    }

    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let p0 = self.points[0].position;
        let mut total = Vector3::zeros();
        for pair in self.points[1..].windows(2) {
            total += (pair[0].position - p0).cross(&(pair[1].position - p0));
        }
        total.norm() * 0.5
    }
}
