/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

use crate::transform::{world_up, Transform};

/// Camera configuration for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(-40.0, -40.0, 30.0),
            target: Point3::origin(),
            up: world_up(),
            fov: std::f32::consts::FRAC_PI_4,
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Camera `distance` behind and `height` above `target` along -Y.
    pub fn chase(target: Point3<f32>, distance: f32, height: f32, fov: f32, width: u32, height_px: u32) -> Self {
        Self {
            position: target + Vector3::new(0.0, -distance, height),
            target,
            fov,
            ..Self::new(width, height_px)
        }
    }

    /// Moves the camera with `target`, keeping its offset.
    pub fn follow(&mut self, target: Point3<f32>) {
        let offset = self.position - self.target;
        self.target = target;
        self.position = target + offset;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the perspective projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Project a model-space point to screen space.
    ///
    /// Returns `(x, y, depth)` with `depth` the NDC z in `[-1, 1]`, or `None`
    /// for points behind the camera or outside the view volume.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = Transform::mvp_matrix(model_matrix, &self.view_matrix(), &self.projection_matrix());
        self.project_clip(&(mvp * point.to_homogeneous()), width, height)
    }

    /// Like [`Self::project_to_screen`] with a precomputed model-view-projection.
    pub fn project_clip(&self, clip: &Vector4<f32>, width: u32, height: u32) -> Option<(f32, f32, f32)> {
        if clip.w <= 1e-6 {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let depth = clip.z / clip.w;

        if !(-1.0..=1.0).contains(&ndc_x) || !(-1.0..=1.0).contains(&ndc_y) || !(-1.0..=1.0).contains(&depth) {
            return None;
        }

        let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

        Some((screen_x, screen_y, depth))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}
