/// Frame-driven drawing of meshes through a backend sink
use log::warn;
use nalgebra::{Isometry3, Matrix4, Point3};

use crate::animator::AnimatedPolyhedron;
use crate::mesh::Mesh;

/// Source of per-frame elapsed time.
pub trait FrameClock {
    /// Seconds since the previous frame.
    fn elapsed_time(&self) -> f32;
}

/// Backend that accepts a mesh with its model-to-world matrix.
pub trait DrawSink {
    fn submit_draw(&mut self, mesh: &Mesh, model_to_world: &Matrix4<f32>);
}

/// Anything that can be drawn once per frame.
pub trait Renderable {
    /// Called once per frame before the draw is submitted.
    fn before_draw(&mut self, _dt: f32) {}

    fn mesh(&self) -> &Mesh;

    fn model_to_world(&self) -> Matrix4<f32>;

    /// World-space point a camera should track, the model origin unless overridden.
    fn focus(&self) -> Point3<f32> {
        self.model_to_world().transform_point(&Point3::origin())
    }
}

/// A mesh with a fixed placement.
#[derive(Debug, Clone)]
pub struct StaticMesh {
    pub mesh: Mesh,
    pub transform: Isometry3<f32>,
}

impl StaticMesh {
    pub fn new(mesh: Mesh, transform: Isometry3<f32>) -> Self {
        Self { mesh, transform }
    }
}

impl Renderable for StaticMesh {
    fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    fn model_to_world(&self) -> Matrix4<f32> {
        self.transform.to_homogeneous()
    }
}

impl Renderable for AnimatedPolyhedron {
    fn before_draw(&mut self, dt: f32) {
        if let Err(err) = self.update(dt) {
            warn!("polyhedron stopped rolling: {}", err);
        }
    }

    fn mesh(&self) -> &Mesh {
        AnimatedPolyhedron::mesh(self)
    }

    fn model_to_world(&self) -> Matrix4<f32> {
        AnimatedPolyhedron::model_to_world(self)
    }

    fn focus(&self) -> Point3<f32> {
        self.world_centroid()
    }
}

/// Updates every renderable with the clock's elapsed time, then submits it.
pub fn draw_frame<C, S>(clock: &C, sink: &mut S, renderables: &mut [Box<dyn Renderable>])
where
    C: FrameClock + ?Sized,
    S: DrawSink + ?Sized,
{
    let dt = clock.elapsed_time();
    for renderable in renderables.iter_mut() {
        renderable.before_draw(dt);
        sink.submit_draw(renderable.mesh(), &renderable.model_to_world());
    }
}
