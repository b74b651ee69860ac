/// Render-facing triangle meshes
use log::debug;
use nalgebra::{Point3, Vector2, Vector3};

use crate::polyhedron::Polyhedron;
use crate::winding::major_axis;

/// Material assigned to polyhedron faces.
pub const POLYHEDRON_MATERIAL: &str = "polyhedron";

/// A vertex with position, texture coordinate and tangent frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub texcoord: Vector2<f32>,
    pub normal: Vector3<f32>,
    pub tangent_s: Vector3<f32>,
    pub tangent_t: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, texcoord: Vector2<f32>, normal: Vector3<f32>) -> Self {
        Self {
            position,
            texcoord,
            normal,
            tangent_s: Vector3::zeros(),
            tangent_t: Vector3::zeros(),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Geometric normal of the counter-clockwise vertex order
    pub fn face_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).normalize()
    }
}

/// A contiguous index range drawn with one material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshGroup {
    pub start_index: u32,
    pub index_count: u32,
    pub material: String,
}

/// An indexed triangle list
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub groups: Vec<MeshGroup>,
}

/// Any unit vector perpendicular to `normal`.
fn default_tangent(normal: &Vector3<f32>) -> Vector3<f32> {
    let seed = match major_axis(normal) {
        Some(0) | Some(1) => Vector3::z(),
        Some(_) => Vector3::x(),
        None => return Vector3::x(),
    };
    (seed - normal * seed.dot(normal))
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::x)
}

impl Mesh {
    /// A single-group mesh.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, material: &str) -> Self {
        let groups = vec![MeshGroup {
            start_index: 0,
            index_count: indices.len() as u32,
            material: material.to_string(),
        }];
        Self {
            vertices,
            indices,
            groups,
        }
    }

    /// Fan-triangulates every face, one group per face, tangents included.
    ///
    /// Face windings run clockwise seen from outside, so the fan is emitted
    /// reversed to get counter-clockwise triangles.
    pub fn from_polyhedron(polyhedron: &Polyhedron) -> Self {
        let mut mesh = Self::default();

        for (side, face) in polyhedron.sides().iter().zip(polyhedron.faces()) {
            let base = mesh.vertices.len() as u32;
            let start_index = mesh.indices.len() as u32;
            let normal = side.normal();

            mesh.vertices.extend(
                face.points
                    .iter()
                    .map(|p| Vertex::new(p.position, p.texcoord, normal)),
            );

            for k in 1..face.len().saturating_sub(1) as u32 {
                mesh.indices.extend_from_slice(&[base, base + k + 1, base + k]);
            }

            mesh.groups.push(MeshGroup {
                start_index,
                index_count: mesh.indices.len() as u32 - start_index,
                material: POLYHEDRON_MATERIAL.to_string(),
            });
        }

        mesh.compute_tangents();
        mesh
    }

    /// Regular tetrahedron standing on the XY plane, smooth normals.
    pub fn tetrahedron(size: f32) -> Self {
        let sqrt3 = 3f32.sqrt();
        let sqrt6 = 6f32.sqrt();
        let vertex = |x: f32, y: f32, z: f32, u: f32, v: f32| {
            Vertex::new(Point3::new(x, y, z), Vector2::new(u, v), Vector3::zeros())
        };

        let vertices = vec![
            vertex(0.0, 0.0, 0.0, 0.0, 0.0),
            vertex(size, 0.0, 0.0, 1.0, 0.0),
            vertex(0.5 * size, sqrt3 / 2.0 * size, 0.0, 1.0, 1.0),
            vertex(0.5 * size, sqrt3 / 6.0 * size, sqrt6 / 3.0 * size, 0.5, 1.0),
        ];
        let indices = vec![0, 2, 1, 1, 2, 3, 0, 1, 3, 2, 0, 3];

        let mut mesh = Self::new(vertices, indices, "debug_checker");
        mesh.compute_vertex_normals();
        mesh.compute_tangents();
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            Triangle::new(
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            )
        })
    }

    /// Normalized sum of the face normals around each vertex.
    pub fn compute_vertex_normals(&mut self) {
        let mut sums = vec![Vector3::zeros(); self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let face = (self.vertices[b].position - self.vertices[a].position)
                .cross(&(self.vertices[c].position - self.vertices[a].position));
            for i in [a, b, c] {
                sums[i] += face;
            }
        }
        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            vertex.normal = sum.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z);
        }
    }

    /// Per-vertex tangent frames from positions and texture coordinates.
    ///
    /// Triangle tangents are summed into their vertices, then each tangent is
    /// made orthogonal to the vertex normal and `tangent_t` is rebuilt as
    /// `cross(tangent_s, normal)`. Triangles with a degenerate UV mapping
    /// contribute nothing; a vertex left without any tangent gets an arbitrary
    /// one perpendicular to its normal.
    pub fn compute_tangents(&mut self) {
        for vertex in &mut self.vertices {
            vertex.tangent_s = Vector3::zeros();
            vertex.tangent_t = Vector3::zeros();
        }

        let mut skipped = 0;
        for tri in self.indices.chunks_exact(3) {
            let [i1, i2, i3] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (v1, v2, v3) = (&self.vertices[i1], &self.vertices[i2], &self.vertices[i3]);

            let e1 = v2.position - v1.position;
            let e2 = v3.position - v1.position;

            let s1 = v2.texcoord.x - v1.texcoord.x;
            let s2 = v3.texcoord.x - v1.texcoord.x;
            let t1 = v2.texcoord.y - v1.texcoord.y;
            let t2 = v3.texcoord.y - v1.texcoord.y;

            let det = s1 * t2 - s2 * t1;
            if det.abs() < 1e-12 {
                skipped += 1;
                continue;
            }
            let r = 1.0 / det;

            let sdir = (e1 * t2 - e2 * t1) * r;
            let tdir = (e2 * s1 - e1 * s2) * r;
            if !(sdir.iter().all(|c| c.is_finite()) && tdir.iter().all(|c| c.is_finite())) {
                skipped += 1;
                continue;
            }

            for i in [i1, i2, i3] {
                self.vertices[i].tangent_s += sdir;
                self.vertices[i].tangent_t += tdir;
            }
        }

        if skipped > 0 {
            debug!("skipped {} triangles with degenerate texture mapping", skipped);
        }

        for vertex in &mut self.vertices {
            let n = vertex.normal;
            let t = vertex.tangent_s - n * n.dot(&vertex.tangent_s);
            vertex.tangent_s = t
                .try_normalize(1e-12)
                .unwrap_or_else(|| default_tangent(&n));
            vertex.tangent_t = vertex.tangent_s.cross(&n);
        }
    }
}
