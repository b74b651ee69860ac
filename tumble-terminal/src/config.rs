/// Configuration for the terminal viewer
///
/// Loads settings from `config/tumble.json` or creates the default file if missing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tumble_core::PolyhedronConfig;

/// Default location of the configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/tumble.json";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TumbleConfig {
    /// Shape generation and starting placement
    pub polyhedron: PolyhedronConfig,

    /// Chase camera settings
    pub camera: CameraConfig,

    /// Frame rate and logging
    pub display: DisplayConfig,

    /// Plane list to build the shape from instead of random planes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planes_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Horizontal distance behind the followed shape
    pub distance: f32,

    /// Height above the followed shape
    pub height: f32,

    /// Vertical field of view in degrees
    pub fov_degrees: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Target FPS (frames per second)
    pub target_fps: u32,

    /// Log output; the terminal itself is taken by the renderer
    pub log_file: PathBuf,

    /// One of `error`, `warn`, `info`, `debug`, `trace`
    pub log_level: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 48.0,
            height: 28.0,
            fov_degrees: 50.0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            log_file: PathBuf::from("tumble.log"),
            log_level: "info".to_string(),
        }
    }
}

/// Where the configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Loaded,
    CreatedDefault,
}

impl TumbleConfig {
    /// Load configuration from `path`, or write and return the default if missing
    pub fn load(path: &Path) -> Result<(Self, ConfigSource)> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;

            let config: TumbleConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;

            Ok((config, ConfigSource::Loaded))
        } else {
            let config = Self::default();
            config.save(path)?;
            Ok((config, ConfigSource::CreatedDefault))
        }
    }

    /// Save configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Frame budget for the main loop
    pub fn frame_time(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.display.target_fps.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = TumbleConfig::default();
        assert_eq!(config.display.target_fps, 30);
        assert_eq!(config.polyhedron.random_plane_count, 8);
        assert!(config.planes_file.is_none());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = TumbleConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: TumbleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.camera.fov_degrees, deserialized.camera.fov_degrees);
        assert_eq!(config.polyhedron, deserialized.polyhedron);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let json = r#"{ "polyhedron": { "rng_seed": 3 }, "display": { "target_fps": 60 } }"#;
        let config: TumbleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.polyhedron.rng_seed, 3);
        assert_eq!(config.polyhedron.bounding_half_extent, 8.0);
        assert_eq!(config.display.target_fps, 60);
        assert_eq!(config.display.log_level, "info");
        assert_relative_eq!(config.frame_time().as_secs_f32(), 1.0 / 60.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_fps_is_clamped() {
        let mut config = TumbleConfig::default();
        config.display.target_fps = 0;
        assert_relative_eq!(config.frame_time().as_secs_f32(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = std::env::temp_dir().join(format!("tumble-config-{}", std::process::id()));
        let path = dir.join("tumble.json");
        let _ = fs::remove_dir_all(&dir);

        let (_, source) = TumbleConfig::load(&path).unwrap();
        assert_eq!(source, ConfigSource::CreatedDefault);
        assert!(path.exists());

        let (_, source) = TumbleConfig::load(&path).unwrap();
        assert_eq!(source, ConfigSource::Loaded);

        let _ = fs::remove_dir_all(&dir);
    }
}
