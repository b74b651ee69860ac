/// Convex polyhedra built as the intersection of half-spaces
///
/// Every plane gets a base winding which is chopped against all the other
/// planes; whatever survives is that plane's face. Face corners are then welded
/// into one shared table and faces are linked through the edges they share.

use log::{debug, info, warn};
use nalgebra::{Matrix3, Point3, Vector3};

use crate::error::GeometryError;
use crate::plane::Plane;
use crate::winding::{Winding, WindingSide, WindingVertex, ON_EPSILON};

/// Tolerances used while building a [`Polyhedron`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct BuildOptions {
    /// Thickness of the "on plane" band while chopping.
    pub clip_epsilon: f32,
    /// Maximum distance between two points considered the same corner.
    pub edge_epsilon: f32,
    /// Faces with a smaller area are shrunk to a single corner.
    pub min_face_area: f32,
    /// Corners of different faces closer than this become one shared corner.
    pub weld_epsilon: f32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            clip_epsilon: ON_EPSILON,
            edge_epsilon: 0.001,
            min_face_area: 0.01,
            weld_epsilon: 0.05,
        }
    }
}

/// The face on the other side of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Neighbor {
    /// Index into [`Polyhedron::sides`].
    pub side: usize,
    /// Edge index within that side's position loop.
    pub edge: usize,
}

/// A finished face of the polyhedron.
#[derive(Debug, Clone, PartialEq)]
pub struct Side {
    pub plane: Plane,
    pub center: Point3<f32>,
    pub positions: Vec<Point3<f32>>,
    /// `neighbors[i]` is the face across `positions[i] -> positions[i + 1]`.
    pub neighbors: Vec<Option<Neighbor>>,
}

impl Side {
    fn from_winding(plane: Plane, winding: &Winding) -> Self {
        let positions: Vec<_> = winding.positions().collect();
        Self {
            plane,
            center: winding.center(),
            neighbors: vec![None; positions.len()],
            positions,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.positions.len()
    }

    /// Endpoints of edge `index`, wrapping at the end of the loop.
    pub fn edge(&self, index: usize) -> (Point3<f32>, Point3<f32>) {
        let n = self.positions.len();
        (self.positions[index % n], self.positions[(index + 1) % n])
    }

    pub fn neighbor(&self, edge: usize) -> Option<Neighbor> {
        self.neighbors.get(edge).copied().flatten()
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.plane.normal.into_inner()
    }
}

fn same_point(a: &Point3<f32>, b: &Point3<f32>, epsilon: f32) -> bool {
    (a - b).norm() <= epsilon
}

fn edges_match(
    (a, b): (Point3<f32>, Point3<f32>),
    (c, d): (Point3<f32>, Point3<f32>),
    epsilon: f32,
) -> bool {
    (same_point(&a, &c, epsilon) && same_point(&b, &d, epsilon))
        || (same_point(&a, &d, epsilon) && same_point(&b, &c, epsilon))
}

/// Weight pulling a refitted corner toward its welded position.
const REFIT_DAMPING: f32 = 1e-3;

/// Corners already this close to all their planes keep their welded position.
const REFIT_TOLERANCE: f32 = 1e-4;

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Position along `a -> b` and distance of `p` from that line.
fn segment_projection(p: &Point3<f32>, a: &Point3<f32>, b: &Point3<f32>) -> Option<(f32, f32)> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f32::EPSILON {
        return None;
    }
    let t = (p - a).dot(&ab) / len2;
    Some((t, (a + ab * t - p).norm()))
}

/// Drops repeated consecutive corners, including the closing pair.
fn dedup_loop(face: &mut Vec<(usize, WindingVertex)>) {
    face.dedup_by_key(|(id, _)| *id);
    while face.len() > 1 && face[0].0 == face[face.len() - 1].0 {
        face.pop();
    }
}

/// Least-squares point on every plane in `planes`, damped toward `start`.
fn refit_corner(start: &Point3<f32>, planes: &[Plane]) -> Point3<f32> {
    let residual = planes
        .iter()
        .map(|p| p.signed_distance(start).abs())
        .fold(0.0, f32::max);
    if residual <= REFIT_TOLERANCE {
        return *start;
    }

    let mut lhs = Matrix3::identity() * REFIT_DAMPING;
    let mut rhs = start.coords * REFIT_DAMPING;
    for plane in planes {
        let n = plane.normal.into_inner();
        lhs += n * n.transpose();
        rhs += n * plane.dist;
    }
    match lhs.lu().solve(&rhs) {
        Some(x) if x.iter().all(|c| c.is_finite()) => Point3::from(x),
        _ => *start,
    }
}

/// Mean of each point's cluster, plus the cluster index of every point.
fn cluster_corners(parent: &mut [usize], points: &[Point3<f32>]) -> (Vec<usize>, Vec<Point3<f32>>) {
    let mut corner_of_root: Vec<Option<usize>> = vec![None; points.len()];
    let mut sums: Vec<(Vector3<f32>, usize)> = Vec::new();
    let mut ids = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let root = find_root(parent, i);
        let id = *corner_of_root[root].get_or_insert_with(|| {
            sums.push((Vector3::zeros(), 0));
            sums.len() - 1
        });
        sums[id].0 += p.coords;
        sums[id].1 += 1;
        ids.push(id);
    }
    let corners = sums
        .iter()
        .map(|(sum, count)| Point3::from(sum / *count as f32))
        .collect();
    (ids, corners)
}

fn loop_area(points: &[Point3<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let p0 = points[0];
    let total = points[1..]
        .windows(2)
        .fold(Vector3::zeros(), |acc, pair| acc + (pair[0] - p0).cross(&(pair[1] - p0)));
    total.norm() * 0.5
}

/// Makes faces share their corners exactly.
///
/// Points closer than `epsilon` (transitively) become one corner, and a face
/// whose welded area is below `min_area` is shrunk to a single corner. Faces
/// left with fewer than three corners are dropped. A corner lying on another
/// face's edge is inserted into that edge, then every corner is moved onto
/// the planes of the faces using it.
fn weld_faces(faces: Vec<(Plane, Winding)>, epsilon: f32, min_area: f32) -> Vec<(Plane, Winding)> {
    let points: Vec<Point3<f32>> = faces.iter().flat_map(|(_, w)| w.positions()).collect();
    let mut ranges = Vec::with_capacity(faces.len());
    let mut start = 0;
    for (_, winding) in &faces {
        ranges.push(start..start + winding.len());
        start += winding.len();
    }

    let mut parent: Vec<usize> = (0..points.len()).collect();
    for a in 0..points.len() {
        for b in a + 1..points.len() {
            if same_point(&points[a], &points[b], epsilon) {
                let (ra, rb) = (find_root(&mut parent, a), find_root(&mut parent, b));
                parent[ra] = rb;
            }
        }
    }

    let (ids, corners) = cluster_corners(&mut parent, &points);
    let mut shrunk = false;
    for range in &ranges {
        let mut loop_ids = ids[range.clone()].to_vec();
        loop_ids.dedup();
        while loop_ids.len() > 1 && loop_ids[0] == loop_ids[loop_ids.len() - 1] {
            loop_ids.pop();
        }
        let positions: Vec<_> = loop_ids.iter().map(|&id| corners[id]).collect();
        if positions.len() >= 3 && loop_area(&positions) < min_area {
            for i in range.clone().skip(1) {
                let (ra, rb) = (find_root(&mut parent, i), find_root(&mut parent, range.start));
                parent[ra] = rb;
            }
            shrunk = true;
        }
    }
    let (ids, mut corners) = if shrunk {
        cluster_corners(&mut parent, &points)
    } else {
        (ids, corners)
    };

    let mut welded: Vec<(Plane, Vec<(usize, WindingVertex)>)> = Vec::with_capacity(faces.len());
    for ((plane, winding), range) in faces.into_iter().zip(ranges) {
        let mut face: Vec<_> = ids[range].iter().copied().zip(winding.points).collect();
        dedup_loop(&mut face);
        if face.len() < 3 {
            debug!("face of plane {:?} collapsed while welding", plane.normal);
            continue;
        }
        welded.push((plane, face));
    }

    let mut live: Vec<usize> = welded.iter().flat_map(|(_, face)| face.iter().map(|(id, _)| *id)).collect();
    live.sort_unstable();
    live.dedup();

    // T-junctions
    for (plane, face) in welded.iter_mut() {
        let mut k = 0;
        while k < face.len() {
            let next = (k + 1) % face.len();
            let (a, b) = (face[k].0, face[next].0);
            let split = live
                .iter()
                .copied()
                .filter(|c| face.iter().all(|(id, _)| id != c))
                .filter_map(|c| {
                    let (t, dist) = segment_projection(&corners[c], &corners[a], &corners[b])?;
                    (t > 0.0 && t < 1.0 && dist <= epsilon).then_some((t, c))
                })
                .min_by(|x, y| x.0.total_cmp(&y.0));
            match split {
                Some((t, c)) => {
                    debug!("corner {} splits edge {} of plane {:?}", c, k, plane.normal);
                    let vertex = face[k].1.lerp_toward(&face[next].1, t);
                    face.insert(k + 1, (c, vertex));
                }
                None => k += 1,
            }
        }
    }

    let mut incident: Vec<Vec<Plane>> = vec![Vec::new(); corners.len()];
    for (plane, face) in &welded {
        for (id, _) in face {
            incident[*id].push(*plane);
        }
    }
    for (corner, planes) in corners.iter_mut().zip(&incident) {
        if !planes.is_empty() {
            *corner = refit_corner(corner, planes);
        }
    }

    welded
        .into_iter()
        .map(|(plane, face)| {
            let points = face
                .into_iter()
                .map(|(id, mut vertex)| {
                    vertex.position = corners[id];
                    vertex
                })
                .collect();
            (plane, Winding::new(points))
        })
        .collect()
}

/// A closed convex polyhedron with face adjacency.
#[derive(Debug, Clone)]
pub struct Polyhedron {
    sides: Vec<Side>,
    faces: Vec<Winding>,
    edge_epsilon: f32,
}

impl Polyhedron {
    /// Intersects the back half-spaces of `planes`.
    ///
    /// Duplicate planes are ignored. A plane whose face falls entirely in
    /// front of another plane, or collapses below three corners once
    /// neighboring faces are welded together, contributes no face. Faces
    /// smaller than `options.min_face_area` are shrunk away the same way, so
    /// their neighbors still close up around them.
    pub fn from_planes(planes: &[Plane], options: &BuildOptions) -> Result<Self, GeometryError> {
        let mut unique: Vec<Plane> = Vec::with_capacity(planes.len());
        for plane in planes {
            if unique.iter().any(|u| u.approx_eq(plane, options.edge_epsilon)) {
                debug!("skipping duplicate plane {:?}", plane);
                continue;
            }
            unique.push(*plane);
        }

        let mut clipped = Vec::with_capacity(unique.len());

        'planes: for (i, plane) in unique.iter().enumerate() {
            let mut winding = Winding::base_for_plane(plane)?;

            for (j, other) in unique.iter().enumerate() {
                if i == j {
                    continue;
                }
                if winding.classify(other, options.clip_epsilon) == WindingSide::Front {
                    debug!("plane {} lies outside plane {}, no face", i, j);
                    continue 'planes;
                }
                winding = winding.chop_in_place(other, options.clip_epsilon);
            }

            let winding = winding.remove_degenerate_points(options.edge_epsilon);
            if winding.len() < 3 {
                debug!("dropping degenerate face of plane {} ({} points)", i, winding.len());
                continue;
            }

            clipped.push((*plane, winding));
        }

        let welded = weld_faces(
            clipped,
            options.weld_epsilon.max(options.edge_epsilon),
            options.min_face_area,
        );
        let sides: Vec<Side> = welded
            .iter()
            .map(|(plane, winding)| Side::from_winding(*plane, winding))
            .collect();
        let faces: Vec<Winding> = welded.into_iter().map(|(_, winding)| winding).collect();

        if sides.is_empty() {
            return Err(GeometryError::EmptyPolyhedron {
                planes: planes.len(),
            });
        }

        let mut polyhedron = Self {
            sides,
            faces,
            edge_epsilon: options.edge_epsilon,
        };
        polyhedron.compute_neighbors();

        info!(
            "built polyhedron: {} faces, {} corners from {} planes",
            polyhedron.sides.len(),
            polyhedron.vertex_count(),
            planes.len()
        );

        Ok(polyhedron)
    }

    /// Brute-force pass over every pair of edges of every pair of faces.
    fn compute_neighbors(&mut self) {
        let epsilon = self.edge_epsilon;
        let mut all_neighbors = Vec::with_capacity(self.sides.len());

        for (i, side) in self.sides.iter().enumerate() {
            let mut neighbors = vec![None; side.edge_count()];

            for (k, slot) in neighbors.iter_mut().enumerate() {
                let edge = side.edge(k);
                let mut matches = 0;

                for (j, other) in self.sides.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    for s in 0..other.edge_count() {
                        if edges_match(edge, other.edge(s), epsilon) {
                            if slot.is_none() {
                                *slot = Some(Neighbor { side: j, edge: s });
                            }
                            matches += 1;
                        }
                    }
                }

                if matches != 1 {
                    warn!("side {} edge {} matches {} edges, expected 1", i, k, matches);
                }
            }

            all_neighbors.push(neighbors);
        }

        for (side, neighbors) in self.sides.iter_mut().zip(all_neighbors) {
            side.neighbors = neighbors;
        }
    }

    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    pub fn side(&self, index: usize) -> Option<&Side> {
        self.sides.get(index)
    }

    /// The clipped windings, one per side, with their texture coordinates.
    pub fn faces(&self) -> &[Winding] {
        &self.faces
    }

    /// How many edges of other faces coincide with `edge` of `side`.
    pub fn edge_match_count(&self, side: usize, edge: usize) -> usize {
        let target = self.sides[side].edge(edge);
        self.sides
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != side)
            .map(|(_, other)| {
                (0..other.edge_count())
                    .filter(|s| edges_match(target, other.edge(*s), self.edge_epsilon))
                    .count()
            })
            .sum()
    }

    /// Every edge borders exactly one other face.
    pub fn is_closed(&self) -> bool {
        self.sides.iter().enumerate().all(|(i, side)| {
            (0..side.edge_count()).all(|k| self.edge_match_count(i, k) == 1)
        })
    }

    /// Distinct corners across all faces.
    pub fn corners(&self) -> Vec<Point3<f32>> {
        let mut corners: Vec<Point3<f32>> = Vec::new();
        for p in self.sides.iter().flat_map(|s| s.positions.iter()) {
            if !corners.iter().any(|c| same_point(c, p, self.edge_epsilon)) {
                corners.push(*p);
            }
        }
        corners
    }

    pub fn vertex_count(&self) -> usize {
        self.corners().len()
    }

    /// Average of the distinct corners.
    pub fn centroid(&self) -> Point3<f32> {
        let corners = self.corners();
        let sum = corners.iter().fold(Vector3::zeros(), |acc, c| acc + c.coords);
        Point3::from(sum / corners.len().max(1) as f32)
    }

    /// Distance from the centroid to the farthest corner.
    pub fn bounding_radius(&self) -> f32 {
        let centroid = self.centroid();
        self.corners()
            .iter()
            .map(|c| (c - centroid).norm())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn plane(x: f32, y: f32, z: f32, dist: f32) -> Plane {
        Plane::new(Vector3::new(x, y, z), dist).unwrap()
    }

    fn cube_planes(half: f32) -> Vec<Plane> {
        vec![
            plane(0.0, 0.0, -1.0, half),
            plane(0.0, 0.0, 1.0, half),
            plane(-1.0, 0.0, 0.0, half),
            plane(1.0, 0.0, 0.0, half),
            plane(0.0, -1.0, 0.0, half),
            plane(0.0, 1.0, 0.0, half),
        ]
    }

    #[test]
    fn test_cube_faces() {
        let cube = Polyhedron::from_planes(&cube_planes(8.0), &BuildOptions::default()).unwrap();
        assert_eq!(cube.sides().len(), 6);
        assert_eq!(cube.vertex_count(), 8);
        for side in cube.sides() {
            assert_eq!(side.positions.len(), 4);
            assert_relative_eq!(side.center.coords, side.normal() * 8.0, epsilon = 1e-3);
            for p in &side.positions {
                assert!(side.plane.signed_distance(p).abs() < 1e-3);
                assert_relative_eq!(p.x.abs(), 8.0, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_cube_neighbors() {
        let cube = Polyhedron::from_planes(&cube_planes(8.0), &BuildOptions::default()).unwrap();
        assert!(cube.is_closed());
        for (i, side) in cube.sides().iter().enumerate() {
            assert_eq!(side.neighbors.iter().flatten().count(), 4);
            for (k, neighbor) in side.neighbors.iter().enumerate() {
                let neighbor = neighbor.unwrap();
                assert_ne!(neighbor.side, i);
                // Opposite faces never touch
                assert!(side.normal().dot(&cube.sides()[neighbor.side].normal()) > -0.5);
                // The link is symmetric
                let back = cube.sides()[neighbor.side].neighbor(neighbor.edge).unwrap();
                assert_eq!(back, Neighbor { side: i, edge: k });
            }
        }
    }

    #[test]
    fn test_corner_cut() {
        let mut planes = cube_planes(1.0);
        // x + y + z = 2 shaves the (1, 1, 1) corner at the edge midpoints
        planes.push(plane(1.0, 1.0, 1.0, 2.0 / 3f32.sqrt()));
        let poly = Polyhedron::from_planes(&planes, &BuildOptions::default()).unwrap();
        assert_eq!(poly.sides().len(), 7);
        assert_eq!(poly.vertex_count(), 10);
        assert_eq!(poly.sides()[6].positions.len(), 3);
        assert!(poly.is_closed());
    }

    #[test]
    fn test_duplicate_and_outside_planes_add_no_face() {
        let mut planes = cube_planes(1.0);
        planes.push(planes[0]);
        planes.push(plane(1.0, 1.0, 0.0, 10.0));
        let poly = Polyhedron::from_planes(&planes, &BuildOptions::default()).unwrap();
        assert_eq!(poly.sides().len(), 6);
        assert!(poly.is_closed());
    }

    #[test]
    fn test_empty_intersection() {
        let planes = [plane(1.0, 0.0, 0.0, -1.0), plane(-1.0, 0.0, 0.0, -1.0)];
        let result = Polyhedron::from_planes(&planes, &BuildOptions::default());
        assert_eq!(result.unwrap_err(), GeometryError::EmptyPolyhedron { planes: 2 });
    }

    #[test]
    fn test_bounding_radius() {
        let cube = Polyhedron::from_planes(&cube_planes(2.0), &BuildOptions::default()).unwrap();
        assert_relative_eq!(cube.centroid().coords, Vector3::zeros(), epsilon = 1e-4);
        assert_relative_eq!(cube.bounding_radius(), 2.0 * 3f32.sqrt(), epsilon = 1e-3);
    }

    fn face(plane: Plane, corners: &[[f32; 3]]) -> (Plane, Winding) {
        let n = plane.normal.into_inner();
        let points = corners
            .iter()
            .map(|c| WindingVertex::new(Point3::new(c[0], c[1], c[2]), Vector2::zeros(), n))
            .collect();
        (plane, Winding::new(points))
    }

    #[test]
    fn test_weld_shares_corners_and_splits_edges() {
        let floor = face(
            plane(0.0, 0.0, -1.0, 0.0),
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.5, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        );
        // Off by a few thousandths at its first corner, and missing the floor's midpoint
        let wall = face(
            plane(1.0, 0.0, 0.0, 1.0),
            &[[1.0, 0.004, 0.003], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]],
        );

        let welded = weld_faces(vec![floor, wall], 0.05, 0.01);
        assert_eq!(welded.len(), 2);
        let floor: Vec<_> = welded[0].1.positions().collect();
        let wall: Vec<_> = welded[1].1.positions().collect();
        assert_eq!(floor.len(), 5);
        assert_eq!(wall.len(), 5);

        assert_eq!(wall[0], floor[1]);
        assert_eq!(wall[1], floor[2]);
        assert_eq!(wall[2], floor[3]);
        for p in &floor {
            assert!(p.z.abs() < 1e-5);
        }
        for p in &wall {
            assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_weld_drops_collapsed_faces() {
        let big = face(plane(0.0, 0.0, 1.0, 0.0), &[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 0.0]]);
        let tiny = face(plane(0.0, 0.0, 1.0, 0.0), &[[2.0, 2.0, 0.0], [2.01, 2.0, 0.0], [2.0, 2.01, 0.0]]);
        let welded = weld_faces(vec![big, tiny], 0.05, 0.01);
        assert_eq!(welded.len(), 1);
        assert_eq!(welded[0].1.len(), 3);
    }

    #[test]
    fn test_tiny_cap_is_shrunk_away() {
        // Shaves a cap far smaller than min_face_area off the (8, 8, -8) corner
        let mut planes = cube_planes(8.0);
        planes.push(plane(1.0, 1.0, -1.0, 24.0 / 3f32.sqrt() - 0.03));
        let poly = Polyhedron::from_planes(&planes, &BuildOptions::default()).unwrap();
        assert!(poly.is_closed());
        assert_eq!(poly.sides().len(), 6);
        assert_eq!(poly.vertex_count(), 8);
        for side in poly.sides() {
            for p in &side.positions {
                assert!(side.plane.signed_distance(p).abs() < 0.02);
            }
        }
    }
}
