/// Tumble Web - WASM bindings for a rolling polyhedron
///
/// The browser owns drawing. This module builds the shape, advances the
/// animation and hands out flat vertex buffers plus the model-to-world matrix
/// for any WebGL or canvas renderer to consume.

use tumble_core::{AnimatedPolyhedron, PolyhedronConfig};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WebPolyhedron {
    config: PolyhedronConfig,
    shape: AnimatedPolyhedron,
    last_tick: Option<f64>,
}

fn build(config: &PolyhedronConfig) -> Result<AnimatedPolyhedron, JsValue> {
    AnimatedPolyhedron::new(config).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn now_ms() -> Option<f64> {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|performance| performance.now())
}

#[wasm_bindgen]
impl WebPolyhedron {
    /// Random shape cut from a box of `half_extent` by `plane_count` planes
    #[wasm_bindgen(constructor)]
    pub fn new(half_extent: f32, plane_count: usize, seed: u64) -> Result<WebPolyhedron, JsValue> {
        let config = PolyhedronConfig {
            bounding_half_extent: half_extent,
            random_plane_count: plane_count,
            rng_seed: seed,
            origin: [0.0, 0.0, half_extent],
            ..Default::default()
        };
        let shape = build(&config)?;
        Ok(WebPolyhedron {
            config,
            shape,
            last_tick: None,
        })
    }

    /// Advance by the wall-clock time since the previous tick
    pub fn tick(&mut self) {
        let now = now_ms();
        let dt = match (self.last_tick, now) {
            (Some(last), Some(now)) => ((now - last) / 1000.0) as f32,
            _ => 0.0,
        };
        self.last_tick = now;
        self.update(dt);
    }

    /// Advance by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        if let Err(err) = self.shape.update(dt) {
            web_sys::console::warn_1(&JsValue::from_str(&format!("polyhedron stopped rolling: {}", err)));
        }
    }

    /// Replace the shape with one built from the next seed
    pub fn reseed(&mut self) -> Result<(), JsValue> {
        let config = self.config.reseeded();
        self.shape = build(&config)?;
        self.config = config;
        self.last_tick = None;
        Ok(())
    }

    pub fn seed(&self) -> u64 {
        self.config.rng_seed
    }

    /// Model-space positions, three floats per vertex
    pub fn positions(&self) -> Vec<f32> {
        self.shape
            .mesh()
            .vertices
            .iter()
            .flat_map(|v| [v.position.x, v.position.y, v.position.z])
            .collect()
    }

    /// Model-space normals, three floats per vertex
    pub fn normals(&self) -> Vec<f32> {
        self.shape
            .mesh()
            .vertices
            .iter()
            .flat_map(|v| [v.normal.x, v.normal.y, v.normal.z])
            .collect()
    }

    /// Texture coordinates, two floats per vertex
    pub fn texcoords(&self) -> Vec<f32> {
        self.shape
            .mesh()
            .vertices
            .iter()
            .flat_map(|v| [v.texcoord.x, v.texcoord.y])
            .collect()
    }

    /// Tangents, three floats per vertex
    pub fn tangents(&self) -> Vec<f32> {
        self.shape
            .mesh()
            .vertices
            .iter()
            .flat_map(|v| [v.tangent_s.x, v.tangent_s.y, v.tangent_s.z])
            .collect()
    }

    pub fn indices(&self) -> Vec<u32> {
        self.shape.mesh().indices.clone()
    }

    /// Column-major 4x4 model-to-world matrix
    pub fn model_to_world(&self) -> Vec<f32> {
        self.shape.model_to_world().as_slice().to_vec()
    }

    pub fn current_side(&self) -> usize {
        self.shape.current_side()
    }

    pub fn is_stalled(&self) -> bool {
        self.shape.is_stalled()
    }
}
