//! # Engine Configuration
//!
//! Runtime knobs for the engine and the terrain generator. Both structs
//! deserialize from JSON and every field has a default, so `{}` is a valid
//! configuration.

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Default render distance in chunks around the focus chunk.
pub const RENDER_DISTANCE: i32 = 2;

/// Errors raised while reading an engine configuration.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "failed to parse engine configuration: {err}"),
            Self::Invalid(reason) => write!(f, "invalid engine configuration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of background worker threads. `0` runs every task inline on the
    /// thread that calls `process_tasks`.
    pub worker_count: usize,
    /// Horizontal radius, in chunks, of the loaded area around the focus.
    pub render_distance: i32,
    /// Lowest chunk y level kept loaded.
    pub min_level: i32,
    /// Highest chunk y level kept loaded.
    pub max_level: i32,
    pub generator: GeneratorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            render_distance: RENDER_DISTANCE,
            min_level: -1,
            max_level: 1,
            generator: GeneratorConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn vertical_levels(&self) -> RangeInclusive<i32> {
        self.min_level..=self.max_level
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render_distance < 0 {
            return Err(ConfigError::Invalid(format!(
                "render_distance must not be negative, got {}",
                self.render_distance
            )));
        }
        if self.min_level > self.max_level {
            return Err(ConfigError::Invalid(format!(
                "min_level {} is above max_level {}",
                self.min_level, self.max_level
            )));
        }
        self.generator.validate()
    }
}

/// Terrain generator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    /// Chunk y level whose columns follow the 2D heightmap.
    pub ground_level: i32,
    /// Chunk y level in which trees and totems are spawned.
    pub structure_level: i32,
    /// Chunk y levels filled with a 3D checkerboard of test blocks.
    pub checkerboard_levels: Vec<i32>,
    /// Heightmap amplitude in cells.
    pub height_scale: f64,
    pub noise_scale_2d: f64,
    pub noise_scale_3d: f64,
    /// 3D noise at or above this value is solid.
    pub solid_threshold: f64,
    /// Columns whose surface lies below this local height are flooded with lava.
    pub lava_height: i32,
    /// Probability that a grass column spawns a structure.
    pub structure_chance: f64,
    /// Fraction of spawned structures that are totems rather than trees.
    pub totem_share: f64,
    /// Probability that a generated solid block starts out weathered.
    pub damage_chance: f64,
    /// Capacity of the heightmap LRU cache, in chunk columns.
    pub heightmap_cache_size: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            ground_level: 0,
            structure_level: 1,
            checkerboard_levels: Vec::new(),
            height_scale: 24.0,
            noise_scale_2d: 0.02,
            noise_scale_3d: 0.05,
            solid_threshold: 0.2,
            lava_height: 5,
            structure_chance: 0.01,
            totem_share: 0.2,
            damage_chance: 0.5,
            heightmap_cache_size: 64,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("structure_chance", self.structure_chance),
            ("totem_share", self.totem_share),
            ("damage_chance", self.damage_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.height_scale < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "height_scale must not be negative, got {}",
                self.height_scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.generator.solid_threshold, 0.2);
    }

    #[test]
    fn partial_generator_overrides_merge_with_defaults() {
        let config =
            EngineConfig::from_json(r#"{ "worker_count": 0, "generator": { "seed": 7 } }"#).unwrap();
        assert_eq!(config.worker_count, 0);
        assert_eq!(config.generator.seed, 7);
        assert_eq!(config.generator.structure_chance, 0.01);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "min_level": 3, "max_level": 1 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{ "generator": { "structure_chance": 2.0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(EngineConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
