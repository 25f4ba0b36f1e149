//! Configuration management for simulation parameters.
//!
//! Strongly-typed sections that map onto a `config.toml` file. Every section
//! has defaults taken from the tuned page constants, so a file only needs to
//! name what it overrides.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [engine]
//! seed = 42
//!
//! [pond]
//! bacteria = 300
//! light = 0.5
//!
//! [blood]
//! flow_rate = 1.8
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Frame loop parameters shared by all simulations.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: Option<u64>,
    /// Frames per second the 2D per-frame constants were tuned for.
    pub frame_rate: f32,
    /// Upper bound on live agents per stage.
    pub capacity: usize,
    /// Ticks between metrics log lines.
    pub log_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            frame_rate: 60.0,
            capacity: 8000,
            log_interval: 1000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PondConfig {
    pub width: f32,
    pub height: f32,
    pub bacteria: usize,
    pub paramecia: usize,
    pub algae: usize,
    pub amoebae: usize,
    pub euglenae: usize,
    pub rotifers: usize,
    pub hydrae: usize,
    pub light: f32,
    pub temperature: f32,
    pub pipette_burst: usize,
    pub pipette_radius: f32,
    pub repel_radius: f32,
    pub repel_strength: f32,
}

impl Default for PondConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            bacteria: 200,
            paramecia: 15,
            algae: 40,
            amoebae: 3,
            euglenae: 10,
            rotifers: 5,
            hydrae: 3,
            light: 1.0,
            temperature: 1.0,
            pipette_burst: 20,
            pipette_radius: 50.0,
            repel_radius: 100.0,
            repel_strength: 5.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BloodConfig {
    pub width: f32,
    pub height: f32,
    pub red_cells: usize,
    pub white_cells: usize,
    pub platelets: usize,
    pub flow_rate: f32,
    pub damage_radius: f32,
    /// Frames before a damage zone closes.
    pub heal_frames: f32,
    pub inject_count: usize,
}

impl Default for BloodConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 500.0,
            red_cells: 300,
            white_cells: 15,
            platelets: 100,
            flow_rate: 1.0,
            damage_radius: 40.0,
            heal_frames: 1200.0,
            inject_count: 5,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SoilConfig {
    pub width: f32,
    pub height: f32,
    pub bacteria: usize,
    pub max_bacteria: usize,
    pub max_particles: usize,
    pub max_fungal_nodes: usize,
    pub moisture_decay: f32,
    pub initial_moisture: f32,
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            bacteria: 100,
            max_bacteria: 500,
            max_particles: 2000,
            max_fungal_nodes: 2000,
            moisture_decay: 0.9995,
            initial_moisture: 0.4,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AntConfig {
    pub width: u16,
    pub height: u16,
    pub workers: usize,
    pub max_food: usize,
    pub food_interval_ms: f32,
    /// Colony substeps per rendered frame.
    pub sim_speed: u32,
    pub pheromone_decay: f32,
    /// Ticks between eggs once the chamber is dug.
    pub egg_interval: u64,
}

impl Default for AntConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
            workers: 20,
            max_food: 50,
            food_interval_ms: 500.0,
            sim_speed: 2,
            pheromone_decay: 0.99,
            egg_interval: 200,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AquariumConfig {
    pub boids: usize,
    pub perception_radius: f32,
    pub max_speed: f32,
    pub max_force: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub separation: f32,
    pub boundary_radius: f32,
    pub bubbles: usize,
    pub scare_radius: f32,
    pub scare_strength: f32,
    pub scare_seconds: f32,
}

impl Default for AquariumConfig {
    fn default() -> Self {
        Self {
            boids: 150,
            perception_radius: 2.5,
            max_speed: 0.2,
            max_force: 0.015,
            alignment: 1.0,
            cohesion: 1.0,
            separation: 1.5,
            boundary_radius: 15.0,
            bubbles: 50,
            scare_radius: 12.0,
            scare_strength: 0.08,
            scare_seconds: 2.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FlowerConfig {
    pub count: usize,
    pub growth_speed: f32,
    /// Mean seconds from sprouting to withering away.
    pub life_span: f32,
    pub wind: f32,
    pub field_size: f32,
}

impl Default for FlowerConfig {
    fn default() -> Self {
        Self {
            count: 50,
            growth_speed: 1.0,
            life_span: 5.0,
            wind: 0.1,
            field_size: 20.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StarfieldConfig {
    pub stars: usize,
    pub warp_speed: f32,
    pub galaxy_frequency: f32,
    pub tunnel_radius: f32,
    pub tunnel_length: f32,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            stars: 5000,
            warp_speed: 0.5,
            galaxy_frequency: 0.005,
            tunnel_radius: 50.0,
            tunnel_length: 1000.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TreeConfig {
    /// Seconds per full day/night cycle.
    pub day_duration: f32,
    pub butterflies: usize,
    pub wind: f32,
    pub auto_cycle: bool,
    /// Chance per night tick that a firefly appears.
    pub firefly_chance: f32,
    pub max_fireflies: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            day_duration: 30.0,
            butterflies: 15,
            wind: 1.5,
            auto_cycle: true,
            firefly_chance: 0.05,
            max_fireflies: 40,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct JellyfishConfig {
    pub count: usize,
    pub speed: f32,
    pub snow: usize,
}

impl Default for JellyfishConfig {
    fn default() -> Self {
        Self {
            count: 15,
            speed: 1.0,
            snow: 2000,
        }
    }
}

/// Complete application configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub pond: PondConfig,
    pub blood: BloodConfig,
    pub soil: SoilConfig,
    pub ants: AntConfig,
    pub aquarium: AquariumConfig,
    pub flowers: FlowerConfig,
    pub starfield: StarfieldConfig,
    pub trees: TreeConfig,
    pub jellyfish: JellyfishConfig,
}

impl AppConfig {
    /// Validates configuration values are within acceptable ranges.
    pub fn validate(&self) -> anyhow::Result<()> {
        // Engine validation
        anyhow::ensure!(self.engine.frame_rate > 0.0, "Frame rate must be positive");
        anyhow::ensure!(self.engine.frame_rate <= 240.0, "Frame rate too high (max 240)");
        anyhow::ensure!(self.engine.capacity > 0, "Stage capacity must be positive");
        anyhow::ensure!(
            self.engine.capacity <= 100_000,
            "Stage capacity too large (max 100000)"
        );
        anyhow::ensure!(self.engine.log_interval > 0, "Log interval must be positive");

        // Pond validation
        anyhow::ensure!(
            self.pond.width > 0.0 && self.pond.height > 0.0,
            "Pond dimensions must be positive"
        );
        anyhow::ensure!(
            (0.0..=2.0).contains(&self.pond.light),
            "Pond light must be within 0.0-2.0"
        );
        anyhow::ensure!(
            self.pond.temperature > 0.0 && self.pond.temperature <= 3.0,
            "Pond temperature factor must be within (0.0, 3.0]"
        );
        anyhow::ensure!(
            self.pond.repel_radius >= 0.0 && self.pond.pipette_radius >= 0.0,
            "Tool radii must be non-negative"
        );

        // Blood vessel validation
        anyhow::ensure!(
            self.blood.width > 0.0 && self.blood.height > 0.0,
            "Vessel dimensions must be positive"
        );
        anyhow::ensure!(
            self.blood.flow_rate > 0.0 && self.blood.flow_rate <= 3.0,
            "Flow rate must be within (0.0, 3.0]"
        );
        anyhow::ensure!(self.blood.damage_radius > 0.0, "Damage radius must be positive");
        anyhow::ensure!(self.blood.heal_frames > 0.0, "Heal time must be positive");

        // Soil validation
        anyhow::ensure!(
            self.soil.width > 0.0 && self.soil.height > 0.0,
            "Soil dimensions must be positive"
        );
        anyhow::ensure!(
            self.soil.bacteria <= self.soil.max_bacteria,
            "Initial bacteria exceed the bacteria cap"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.soil.moisture_decay),
            "Moisture decay must be within 0.0-1.0"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.soil.initial_moisture),
            "Initial moisture must be within 0.0-1.0"
        );

        // Ant farm validation
        anyhow::ensure!(
            self.ants.width >= 100 && self.ants.height >= 160,
            "Ant farm too small (min 100x160)"
        );
        anyhow::ensure!(self.ants.width <= 2000, "Ant farm too wide (max 2000)");
        anyhow::ensure!(self.ants.height <= 2000, "Ant farm too tall (max 2000)");
        anyhow::ensure!(
            (1..=8).contains(&self.ants.sim_speed),
            "Ant sim speed must be within 1-8"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.ants.pheromone_decay),
            "Pheromone decay must be within 0.0-1.0"
        );
        anyhow::ensure!(self.ants.egg_interval > 0, "Egg interval must be positive");

        // Aquarium validation
        anyhow::ensure!(self.aquarium.max_speed > 0.0, "Boid max speed must be positive");
        anyhow::ensure!(self.aquarium.max_force >= 0.0, "Boid max force must be non-negative");
        anyhow::ensure!(
            self.aquarium.perception_radius > 0.0,
            "Perception radius must be positive"
        );
        anyhow::ensure!(
            self.aquarium.boundary_radius > 0.0,
            "Boundary radius must be positive"
        );

        // Gentle 3D scenes
        anyhow::ensure!(self.flowers.life_span >= 2.0, "Flower life span must be at least 2.0");
        anyhow::ensure!(self.flowers.growth_speed > 0.0, "Growth speed must be positive");
        anyhow::ensure!(self.starfield.tunnel_length > 0.0, "Tunnel length must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.starfield.galaxy_frequency),
            "Galaxy frequency must be within 0.0-1.0"
        );
        anyhow::ensure!(self.trees.day_duration > 0.0, "Day duration must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.trees.firefly_chance),
            "Firefly chance must be within 0.0-1.0"
        );
        anyhow::ensure!(self.jellyfish.speed > 0.0, "Jellyfish speed must be positive");

        Ok(())
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Like [`Self::from_file`], but a missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml("[pond]\nbacteria = 12\n").unwrap();
        assert_eq!(config.pond.bacteria, 12);
        assert_eq!(config.pond.paramecia, 15);
        assert_eq!(config.blood, BloodConfig::default());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = AppConfig::default();
        let parsed = AppConfig::from_toml(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_flow_rate() {
        let config = AppConfig {
            blood: BloodConfig {
                flow_rate: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_sim_speed() {
        let config = AppConfig {
            ants: AntConfig {
                sim_speed: 9,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_soil_cap_below_initial() {
        let config = AppConfig {
            soil: SoilConfig {
                bacteria: 600,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_frame_rate() {
        let config = AppConfig {
            engine: EngineConfig {
                frame_rate: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(AppConfig::from_toml("[pond\nbacteria = ").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("/nonexistent/vivarium.toml").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
