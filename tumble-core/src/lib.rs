/// Tumble Core Library - Convex polyhedra that roll across the ground
///
/// This library builds convex polyhedra from half-space planes, links their
/// faces into an adjacency graph, turns them into tangent-space meshes and
/// animates them rolling edge over edge. Rendering backends plug in through
/// the traits in [`render`].

pub mod animator;
pub mod error;
pub mod generator;
pub mod mesh;
pub mod plane;
pub mod plane_file;
pub mod polyhedron;
pub mod projection;
pub mod render;
pub mod transform;
pub mod winding;

// Re-export commonly used types
pub use animator::{AnimatedPolyhedron, ANGULAR_SPEED};
pub use error::{AnimationError, GeometryError, PlaneFileError};
pub use generator::{generate_planes, generate_polyhedron, PolyhedronConfig};
pub use mesh::{Mesh, MeshGroup, Triangle, Vertex};
pub use plane::{Plane, PlaneSide};
pub use plane_file::parse_planes;
pub use polyhedron::{BuildOptions, Neighbor, Polyhedron, Side};
pub use projection::Camera;
pub use render::{draw_frame, DrawSink, FrameClock, Renderable, StaticMesh};
pub use transform::{world_up, Pivot, Transform};
pub use winding::{Winding, WindingSide, WindingVertex};
