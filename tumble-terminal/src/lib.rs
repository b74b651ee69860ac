/// Terminal viewer for rolling polyhedra
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use nalgebra::Point3;
use std::io::{stdout, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tumble_core::{
    draw_frame, parse_planes, AnimatedPolyhedron, Camera, FrameClock, Mesh, Polyhedron,
    PolyhedronConfig, Renderable, StaticMesh, Transform,
};

pub mod config;
pub mod renderer;

pub use config::{ConfigSource, TumbleConfig};
pub use renderer::AsciiRenderer;

const TIME_SCALE_STEP: f32 = 1.25;
const MIN_TIME_SCALE: f32 = 0.125;
const MAX_TIME_SCALE: f32 = 16.0;

/// Elapsed time between frames, scaled and pausable
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_tick: Instant,
    dt: f32,
    pub time_scale: f32,
    pub paused: bool,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            dt: 0.0,
            time_scale: 1.0,
            paused: false,
        }
    }

    /// Measure the time since the previous tick
    pub fn tick(&mut self) {
        let now = Instant::now();
        let raw = (now - self.last_tick).as_secs_f32();
        self.last_tick = now;
        self.dt = if self.paused { 0.0 } else { raw * self.time_scale };
    }

    pub fn faster(&mut self) {
        self.time_scale = (self.time_scale * TIME_SCALE_STEP).min(MAX_TIME_SCALE);
    }

    pub fn slower(&mut self) {
        self.time_scale = (self.time_scale / TIME_SCALE_STEP).max(MIN_TIME_SCALE);
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for FrameTimer {
    fn elapsed_time(&self) -> f32 {
        self.dt
    }
}

/// Build the rolling shape from the plane list if one is configured, else from random planes
pub fn build_polyhedron(config: &TumbleConfig) -> Result<AnimatedPolyhedron> {
    let polyhedron = &config.polyhedron;
    match &config.planes_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read plane list {}", path.display()))?;
            let planes = parse_planes(&text)
                .with_context(|| format!("Failed to parse plane list {}", path.display()))?;
            let shape = Polyhedron::from_planes(&planes, &polyhedron.build)
                .with_context(|| format!("Plane list {} does not form a polyhedron", path.display()))?;
            Ok(AnimatedPolyhedron::from_polyhedron(
                shape,
                Point3::from(polyhedron.origin),
                polyhedron.initial_velocity(),
            ))
        }
        None => AnimatedPolyhedron::new(polyhedron).context("Failed to generate polyhedron"),
    }
}

/// Small tetrahedron marking the world origin
pub fn origin_marker() -> StaticMesh {
    StaticMesh::new(Mesh::tetrahedron(3.0), Transform::translation(&Point3::new(-1.5, -1.0, 0.0)))
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    config: TumbleConfig,
    shape: usize,
    renderables: Vec<Box<dyn Renderable>>,
    renderer: AsciiRenderer,
    timer: FrameTimer,
    running: bool,
    last_fps_update: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: TumbleConfig) -> Result<Self> {
        let (width, height) = terminal::size().context("Failed to query terminal size")?;
        let shape = build_polyhedron(&config)?;
        let focus = shape.world_centroid();
        let camera = Camera::chase(
            focus,
            config.camera.distance,
            config.camera.height,
            config.camera.fov_degrees.to_radians(),
            width as u32,
            height as u32,
        );

        info!(
            "rolling {} faces, {} corners",
            shape.polyhedron().sides().len(),
            shape.polyhedron().vertex_count()
        );

        Ok(Self {
            config,
            shape: 1,
            renderables: vec![Box::new(origin_marker()), Box::new(shape)],
            renderer: AsciiRenderer::new(width as usize, height.saturating_sub(1) as usize, camera),
            timer: FrameTimer::new(),
            running: true,
            last_fps_update: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)
            .context("Failed to enter alternate screen")?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)
            .context("Failed to leave alternate screen")?;

        result
    }

    fn main_loop(&mut self) -> Result<()> {
        let target_frame_time = self.config.frame_time();
        self.timer.tick();

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?)?;
            }

            self.timer.tick();
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_fps_update).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_fps_update).as_secs_f32();
                self.frame_count = 0;
                self.last_fps_update = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => match code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.running = false;
                }
                KeyCode::Char(' ') => {
                    self.timer.paused = !self.timer.paused;
                    debug!("paused: {}", self.timer.paused);
                }
                KeyCode::Char('+') | KeyCode::Char('=') => {
                    self.timer.faster();
                }
                KeyCode::Char('-') => {
                    self.timer.slower();
                }
                KeyCode::Char('r') => {
                    self.reseed();
                }
                _ => {}
            },
            Event::Resize(width, height) => {
                self.renderer
                    .resize(width as usize, height.saturating_sub(1) as usize);
                execute!(stdout(), terminal::Clear(ClearType::All))?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Replace the shape with a fresh one from the next seed
    fn reseed(&mut self) {
        let polyhedron: PolyhedronConfig = self.config.polyhedron.reseeded();
        let config = TumbleConfig {
            polyhedron,
            planes_file: None,
            ..self.config.clone()
        };
        match build_polyhedron(&config) {
            Ok(shape) => {
                info!("new shape from seed {}", config.polyhedron.rng_seed);
                self.renderables[self.shape] = Box::new(shape);
                self.config = config;
            }
            Err(err) => warn!("could not build shape from seed {}: {:#}", config.polyhedron.rng_seed, err),
        }
    }

    fn render(&mut self) -> Result<()> {
        self.renderer.clear();

        // Update and rasterize every renderable, then track the shape
        draw_frame(&self.timer, &mut self.renderer, &mut self.renderables);
        let focus = self.renderables[self.shape].focus();
        self.renderer.camera_mut().follow(focus);
        self.renderer.render_ground(&focus, 40.0, 4.0);

        // Output to terminal
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 1))?;
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Tumble | seed {} | FPS: {:.1} | speed x{:.2}{} | Space=Pause +/-=Speed R=Reseed Q=Quit",
                self.config.polyhedron.rng_seed,
                self.fps,
                self.timer.time_scale,
                if self.timer.paused { " (paused)" } else { "" },
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_timer_reports_zero() {
        let mut timer = FrameTimer::new();
        timer.paused = true;
        std::thread::sleep(Duration::from_millis(5));
        timer.tick();
        assert_eq!(timer.elapsed_time(), 0.0);

        timer.paused = false;
        std::thread::sleep(Duration::from_millis(5));
        timer.tick();
        assert!(timer.elapsed_time() > 0.0);
    }

    #[test]
    fn test_time_scale_is_clamped() {
        let mut timer = FrameTimer::new();
        for _ in 0..100 {
            timer.faster();
        }
        assert_eq!(timer.time_scale, MAX_TIME_SCALE);
        for _ in 0..100 {
            timer.slower();
        }
        assert_eq!(timer.time_scale, MIN_TIME_SCALE);
    }

    #[test]
    fn test_build_from_plane_list() {
        let dir = std::env::temp_dir().join(format!("tumble-planes-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cube.planes");
        std::fs::write(
            &path,
            "plane 0 0 -1 4\nplane 0 0 1 4\nplane -1 0 0 4\nplane 1 0 0 4\nplane 0 -1 0 4\nplane 0 1 0 4\n",
        )
        .unwrap();

        let config = TumbleConfig {
            planes_file: Some(path),
            ..Default::default()
        };
        let shape = build_polyhedron(&config).unwrap();
        assert_eq!(shape.polyhedron().sides().len(), 6);
        assert!(shape.polyhedron().is_closed());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_bad_plane_list_is_reported() {
        let config = TumbleConfig {
            planes_file: Some("/nonexistent/tumble.planes".into()),
            ..Default::default()
        };
        let err = build_polyhedron(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read plane list"));
    }
}
