/// Seeded random plane sets for rolling polyhedra
use std::f32::consts::{FRAC_PI_3, PI, TAU};

use log::{debug, warn};
use nalgebra::{Unit, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::GeometryError;
use crate::plane::Plane;
use crate::polyhedron::{BuildOptions, Polyhedron};

/// Default smallest angle between any two plane normals, ten degrees.
pub const DEFAULT_MIN_PLANE_ANGLE: f32 = PI / 18.0;

/// Normal draws per random plane before the angle limit is given up.
const MAX_NORMAL_DRAWS: usize = 64;

/// Plane sets drawn per seed before an open shape is accepted.
pub const MAX_PLANE_SET_DRAWS: usize = 16;

/// Construction parameters of an animated polyhedron.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct PolyhedronConfig {
    /// Half size of the axis-aligned box every shape starts from.
    pub bounding_half_extent: f32,
    /// Extra randomly oriented cutting planes.
    pub random_plane_count: usize,
    pub rng_seed: u64,
    /// Distance of the random planes from the origin, the half extent when unset.
    pub random_plane_dist: Option<f32>,
    /// Pitch range of the random plane normals, in radians. Negative is downward.
    pub pitch_range: (f32, f32),
    /// Random normals closer than this angle to an earlier plane are redrawn.
    pub min_plane_angle: f32,
    /// Initial world position of the model origin.
    pub origin: [f32; 3],
    /// Initial rolling direction on the ground, radians from +X.
    pub heading: f32,
    pub build: BuildOptions,
}

impl Default for PolyhedronConfig {
    fn default() -> Self {
        Self {
            bounding_half_extent: 8.0,
            random_plane_count: 8,
            rng_seed: 0x5eed,
            random_plane_dist: None,
            pitch_range: (-FRAC_PI_3, 0.0),
            min_plane_angle: DEFAULT_MIN_PLANE_ANGLE,
            origin: [0.0, 0.0, 8.0],
            heading: 0.0,
            build: BuildOptions::default(),
        }
    }
}

impl PolyhedronConfig {
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !(self.bounding_half_extent.is_finite() && self.bounding_half_extent > 0.0) {
            return Err(GeometryError::InvalidConfig("bounding_half_extent must be positive"));
        }
        if let Some(dist) = self.random_plane_dist {
            if !(dist.is_finite() && dist > 0.0) {
                return Err(GeometryError::InvalidConfig("random_plane_dist must be positive"));
            }
        }
        let (low, high) = self.pitch_range;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(GeometryError::InvalidConfig("pitch_range must be an increasing pair"));
        }
        if !(self.min_plane_angle.is_finite() && self.min_plane_angle >= 0.0) {
            return Err(GeometryError::InvalidConfig("min_plane_angle must not be negative"));
        }
        if !self.heading.is_finite() {
            return Err(GeometryError::InvalidConfig("heading must be finite"));
        }
        Ok(())
    }

    /// Unit ground direction for `heading`.
    pub fn initial_velocity(&self) -> Vector3<f32> {
        Vector3::new(self.heading.cos(), self.heading.sin(), 0.0)
    }

    /// Same shape parameters with the next seed.
    pub fn reseeded(&self) -> Self {
        Self {
            rng_seed: self.rng_seed.wrapping_add(1),
            ..self.clone()
        }
    }
}

/// The six faces of the bounding box. Index 0 is the floor.
pub fn bounding_planes(half_extent: f32) -> [Plane; 6] {
    let axis = |x: f32, y: f32, z: f32| Plane::from_unit(Unit::new_unchecked(Vector3::new(x, y, z)), half_extent);
    [
        axis(0.0, 0.0, -1.0),
        axis(0.0, 0.0, 1.0),
        axis(-1.0, 0.0, 0.0),
        axis(1.0, 0.0, 0.0),
        axis(0.0, -1.0, 0.0),
        axis(0.0, 1.0, 0.0),
    ]
}

fn random_normal(rng: &mut StdRng, (pitch_low, pitch_high): (f32, f32)) -> Vector3<f32> {
    let yaw: f32 = rng.random_range(0.0..TAU);
    let pitch: f32 = rng.random_range(pitch_low..pitch_high);
    Vector3::new(yaw.cos() * pitch.cos(), yaw.sin() * pitch.cos(), pitch.sin()).normalize()
}

fn draw_planes(config: &PolyhedronConfig, rng: &mut StdRng) -> Vec<Plane> {
    let dist = config
        .random_plane_dist
        .unwrap_or(config.bounding_half_extent);
    let max_cos = config.min_plane_angle.cos();

    let mut planes = bounding_planes(config.bounding_half_extent).to_vec();
    planes.reserve(config.random_plane_count);

    for _ in 0..config.random_plane_count {
        let mut normal = random_normal(rng, config.pitch_range);
        for _ in 1..MAX_NORMAL_DRAWS {
            if planes.iter().all(|p| p.normal.dot(&normal) <= max_cos) {
                break;
            }
            normal = random_normal(rng, config.pitch_range);
        }
        planes.push(Plane::from_unit(Unit::new_normalize(normal), dist));
    }

    planes
}

/// Bounding box planes followed by `random_plane_count` random cuts.
///
/// These are the planes of the first draw of [`generate_polyhedron`].
pub fn generate_planes(config: &PolyhedronConfig) -> Result<Vec<Plane>, GeometryError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.rng_seed);
    Ok(draw_planes(config, &mut rng))
}

/// Builds the polyhedron described by `config`.
///
/// A plane set that does not close up is replaced by the next draw from the
/// same seeded stream, up to [`MAX_PLANE_SET_DRAWS`] draws.
pub fn generate_polyhedron(config: &PolyhedronConfig) -> Result<Polyhedron, GeometryError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.rng_seed);

    let mut draw = 1;
    loop {
        let planes = draw_planes(config, &mut rng);
        let polyhedron = Polyhedron::from_planes(&planes, &config.build)?;
        if polyhedron.is_closed() {
            return Ok(polyhedron);
        }
        if draw == MAX_PLANE_SET_DRAWS {
            warn!("seed {} gave no closed polyhedron in {} draws", config.rng_seed, draw);
            return Ok(polyhedron);
        }
        debug!("seed {} draw {} is not closed, drawing again", config.rng_seed, draw);
        draw += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_planes() {
        let config = PolyhedronConfig::default();
        let a = generate_planes(&config).unwrap();
        let b = generate_planes(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 14);

        let c = generate_planes(&config.reseeded()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_random_planes_point_downward() {
        let config = PolyhedronConfig {
            random_plane_count: 32,
            ..Default::default()
        };
        let planes = generate_planes(&config).unwrap();
        for plane in &planes[6..] {
            assert!(plane.normal.z <= 0.0);
            assert!(plane.normal.z >= -(FRAC_PI_3.sin()) - 1e-6);
            assert!((plane.normal.norm() - 1.0).abs() < 1e-5);
            assert_eq!(plane.dist, 8.0);
        }
    }

    #[test]
    fn test_random_normals_keep_apart() {
        let config = PolyhedronConfig::default();
        let planes = generate_planes(&config).unwrap();
        let max_cos = config.min_plane_angle.cos() + 1e-5;
        for (i, a) in planes.iter().enumerate().skip(6) {
            for b in &planes[..i] {
                assert!(a.normal.dot(&b.normal.into_inner()) <= max_cos, "plane {} too close to an earlier plane", i);
            }
        }
    }

    #[test]
    fn test_first_draw_matches_generate_planes() {
        let config = PolyhedronConfig {
            rng_seed: 21,
            ..Default::default()
        };
        let planes = generate_planes(&config).unwrap();
        let direct = Polyhedron::from_planes(&planes, &config.build).unwrap();
        if direct.is_closed() {
            let generated = generate_polyhedron(&config).unwrap();
            assert_eq!(generated.sides(), direct.sides());
        }
    }

    #[test]
    fn test_floor_is_first() {
        let planes = bounding_planes(3.0);
        assert_eq!(planes[0].normal.into_inner(), Vector3::new(0.0, 0.0, -1.0));
        assert!(planes.iter().all(|p| p.dist == 3.0));
    }

    #[test]
    fn test_invalid_config() {
        let config = PolyhedronConfig {
            bounding_half_extent: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            generate_planes(&config),
            Err(GeometryError::InvalidConfig(_))
        ));

        let config = PolyhedronConfig {
            pitch_range: (0.5, 0.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PolyhedronConfig {
            min_plane_angle: -0.1,
            ..Default::default()
        };
        assert!(generate_polyhedron(&config).is_err());
    }

    #[test]
    fn test_box_without_cuts() {
        let config = PolyhedronConfig {
            random_plane_count: 0,
            ..Default::default()
        };
        let poly = generate_polyhedron(&config).unwrap();
        assert_eq!(poly.sides().len(), 6);
        assert!(poly.is_closed());
    }

    #[cfg(feature = "serde-serialize")]
    #[test]
    fn test_config_json_fills_defaults() {
        let config: PolyhedronConfig = serde_json::from_str(r#"{ "rng_seed": 9, "build": { "min_face_area": 0.5 } }"#).unwrap();
        assert_eq!(config.rng_seed, 9);
        assert_eq!(config.random_plane_count, 8);
        assert_eq!(config.build.min_face_area, 0.5);
        assert_eq!(config.build.edge_epsilon, 0.001);
        assert_eq!(config.build.weld_epsilon, 0.05);
        assert_eq!(config.min_plane_angle, DEFAULT_MIN_PLANE_ANGLE);

        let json = serde_json::to_string(&config).unwrap();
        let back: PolyhedronConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
