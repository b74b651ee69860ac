/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point3, Vector3};
use std::io::Write;
use tumble_core::{Camera, DrawSink, Mesh, Transform, Triangle};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Marker for ground grid points
const GROUND_MARK: char = '`';

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_ASPECT: f32 = 0.5;

/// Minimum brightness so faces turned away from the light stay visible
const AMBIENT: f32 = 0.15;

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    camera: Camera,
    light_dir: Vector3<f32>,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize, camera: Camera) -> Self {
        let size = width * height;
        let mut renderer = Self {
            width,
            height,
            camera,
            light_dir: Vector3::new(-0.4, -0.6, 0.7).normalize(),
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
        };
        renderer.resize(width, height);
        renderer
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.char_buffer = vec![' '; width * height];
        self.camera.aspect = width as f32 * CELL_ASPECT / height.max(1) as f32;
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Character at a cell, for inspection
    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        if x < self.width && y < self.height {
            Some(self.char_buffer[y * self.width + x])
        } else {
            None
        }
    }

    pub fn render_mesh(&mut self, mesh: &Mesh, model_matrix: &Matrix4<f32>) {
        let mvp = Transform::mvp_matrix(
            model_matrix,
            &self.camera.view_matrix(),
            &self.camera.projection_matrix(),
        );
        for triangle in mesh.triangles() {
            self.render_triangle(&triangle, model_matrix, &mvp);
        }
    }

    fn render_triangle(&mut self, triangle: &Triangle, model_matrix: &Matrix4<f32>, mvp: &Matrix4<f32>) {
        // Project vertices to screen space
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (coords, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            let clip = mvp * vertex.position.to_homogeneous();
            match self
                .camera
                .project_clip(&clip, self.width as u32, self.height as u32)
            {
                Some(projected) => *coords = projected,
                None => return, // Triangle is clipped
            }
        }

        // Shade with the world-space face normal
        let normal = model_matrix.transform_vector(&triangle.face_normal());
        let brightness = normal.dot(&self.light_dir).max(0.0) * (1.0 - AMBIENT) + AMBIENT;

        // Map brightness to character
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
        let char_index = char_index.clamp(1, LUMINOSITY_RAMP.len() - 1);
        let character = LUMINOSITY_RAMP[char_index];

        self.rasterize_triangle(&screen_coords, character);
    }

    /// Dots on the ground plane around `center`, drawn behind everything else
    pub fn render_ground(&mut self, center: &Point3<f32>, extent: f32, spacing: f32) {
        if spacing <= 0.0 {
            return;
        }
        let mvp = Transform::mvp_matrix(
            &Matrix4::identity(),
            &self.camera.view_matrix(),
            &self.camera.projection_matrix(),
        );
        let steps = (extent / spacing).ceil() as i32;
        let origin_x = (center.x / spacing).round() * spacing;
        let origin_y = (center.y / spacing).round() * spacing;

        for i in -steps..=steps {
            for j in -steps..=steps {
                let p = Point3::new(origin_x + i as f32 * spacing, origin_y + j as f32 * spacing, 0.0);
                let clip = mvp * p.to_homogeneous();
                if let Some((x, y, depth)) =
                    self.camera
                        .project_clip(&clip, self.width as u32, self.height as u32)
                {
                    let (x, y) = (x as usize, y as usize);
                    if x < self.width && y < self.height {
                        let idx = y * self.width + x;
                        if depth < self.depth_buffer[idx] {
                            self.depth_buffer[idx] = depth;
                            self.char_buffer[idx] = GROUND_MARK;
                        }
                    }
                }
            }
        }
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) = barycentric(
                    (v0.0, v0.1),
                    (v1.0, v1.1),
                    (v2.0, v2.1),
                    (px, py),
                ) {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        // Interpolate depth
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;

                        let idx = y as usize * self.width + x as usize;
                        if depth < self.depth_buffer[idx] {
                            self.depth_buffer[idx] = depth;
                            self.char_buffer[idx] = character;
                        }
                    }
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let c = self.char_buffer[idx];

                // Color based on character intensity
                let color = match c {
                    GROUND_MARK => Color::DarkGreen,
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    '#' | '%' | '@' => Color::Cyan,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl DrawSink for AsciiRenderer {
    fn submit_draw(&mut self, mesh: &Mesh, model_to_world: &Matrix4<f32>) {
        self.render_mesh(mesh, model_to_world);
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn renderer() -> AsciiRenderer {
        let camera = Camera::chase(Point3::origin(), 30.0, 20.0, 0.9, 80, 40);
        AsciiRenderer::new(80, 40, camera)
    }

    fn filled(renderer: &AsciiRenderer) -> usize {
        (0..40)
            .flat_map(|y| (0..80).map(move |x| (x, y)))
            .filter(|&(x, y)| !matches!(renderer.cell(x, y), Some(' ') | Some(GROUND_MARK)))
            .count()
    }

    #[test]
    fn test_barycentric_inside_and_outside() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert_relative_eq!(w0, 0.5, epsilon = 1e-6);
        assert_relative_eq!(w1, 0.25, epsilon = 1e-6);
        assert_relative_eq!(w2, 0.25, epsilon = 1e-6);

        // Past the hypotenuse only the weight of the opposite corner goes negative
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (5.0, 5.0)).unwrap();
        assert_relative_eq!(w0, -1.5, epsilon = 1e-6);
        assert_relative_eq!(w1, 1.25, epsilon = 1e-6);
        assert_relative_eq!(w2, 1.25, epsilon = 1e-6);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0)).is_none());
    }

    #[test]
    fn test_submit_draw_fills_cells() {
        let mut renderer = renderer();
        let mesh = Mesh::tetrahedron(8.0);
        renderer.submit_draw(&mesh, &Transform::translation(&Point3::new(-4.0, -2.0, 0.0)).to_homogeneous());
        assert!(filled(&renderer) > 10);

        renderer.clear();
        assert_eq!(filled(&renderer), 0);
    }

    #[test]
    fn test_mesh_behind_camera_is_not_drawn() {
        let mut renderer = renderer();
        let mesh = Mesh::tetrahedron(4.0);
        let behind = Transform::translation(&Point3::new(0.0, -80.0, 20.0)).to_homogeneous();
        renderer.submit_draw(&mesh, &behind);
        assert_eq!(filled(&renderer), 0);
    }

    #[test]
    fn test_ground_is_hidden_by_mesh() {
        let mut renderer = renderer();
        renderer.render_ground(&Point3::origin(), 40.0, 4.0);
        let ground_only = (0..40)
            .flat_map(|y| (0..80).map(move |x| (x, y)))
            .filter(|&(x, y)| renderer.cell(x, y) == Some(GROUND_MARK))
            .count();
        assert!(ground_only > 0);

        let mesh = Mesh::tetrahedron(8.0);
        renderer.submit_draw(&mesh, &Transform::translation(&Point3::new(-4.0, -2.0, 0.0)).to_homogeneous());
        let after = (0..40)
            .flat_map(|y| (0..80).map(move |x| (x, y)))
            .filter(|&(x, y)| renderer.cell(x, y) == Some(GROUND_MARK))
            .count();
        assert!(after < ground_only);
    }

    #[test]
    fn test_resize_keeps_cell_aspect() {
        let mut renderer = renderer();
        renderer.resize(120, 30);
        assert_relative_eq!(renderer.camera_mut().aspect, 120.0 * CELL_ASPECT / 30.0);
        assert_eq!(renderer.cell(119, 29), Some(' '));
        assert_eq!(renderer.cell(120, 0), None);
    }
}
