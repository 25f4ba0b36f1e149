//! Headless driver used by the CLI and integration tests.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use vivarium_core::config::AppConfig;
use vivarium_core::metrics::Metrics;
use vivarium_core::{Simulation, SimulationId};
use vivarium_data::{Census, Frame, Interaction};

/// Reads `path` when it exists; otherwise the built-in defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load(path).with_context(|| format!("loading config from {}", path.display()))
}

pub struct App {
    pub config: AppConfig,
    pub seed: u64,
    pub sim: Box<dyn Simulation>,
    pub metrics: Metrics,
    dt: f32,
}

impl App {
    /// Builds `id` from `config`. `seed` overrides the configured seed; with
    /// neither, a random one is drawn and logged so the run can be replayed.
    pub fn new(id: SimulationId, config: AppConfig, seed: Option<u64>) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let seed = seed
            .or(config.engine.seed)
            .unwrap_or_else(rand::random::<u64>);
        tracing::info!(sim = %id, seed, "Starting simulation");

        let sim = vivarium_core::create(id, &config, seed);
        let metrics = Metrics::new(config.engine.log_interval);
        let dt = 1.0 / config.engine.frame_rate;

        Ok(Self {
            config,
            seed,
            sim,
            metrics,
            dt,
        })
    }

    /// One frame at the configured frame rate.
    pub fn step(&mut self) -> Duration {
        let started = Instant::now();
        let report = self.sim.step(self.dt);
        let elapsed = started.elapsed();
        self.metrics
            .record_tick(elapsed, &report, self.sim.population());
        elapsed
    }

    pub fn run_headless(&mut self, ticks: u64) -> Census {
        for _ in 0..ticks {
            self.step();
        }
        tracing::info!(
            sim = %self.sim.id(),
            ticks = self.metrics.tick_count(),
            entities = self.sim.population(),
            dropped = self.metrics.dropped_total(),
            mean_tick_us = self.metrics.mean_tick().as_micros() as u64,
            "Headless run finished"
        );
        self.sim.census()
    }

    pub fn apply(&mut self, input: &Interaction) -> Result<()> {
        self.sim.apply(input)?;
        self.metrics.increment_counter("interactions");
        Ok(())
    }

    #[must_use]
    pub fn frame(&self) -> Frame {
        self.sim.frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vivarium_data::{Knob, Tool};

    #[test]
    fn test_missing_config_falls_back() {
        let config = load_config(Path::new("/nonexistent/vivarium.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_explicit_seed_wins() {
        let config = AppConfig::default();
        let app = App::new(SimulationId::Jellyfish, config, Some(9)).unwrap();
        assert_eq!(app.seed, 9);
    }

    #[test]
    fn test_headless_run_records_metrics() {
        let mut app = App::new(SimulationId::PondDrop, AppConfig::default(), Some(3)).unwrap();
        let census = app.run_headless(30);
        assert_eq!(app.metrics.tick_count(), 30);
        assert_eq!(app.sim.tick(), 30);
        assert!(census.count("Bacteria") > 0);
    }

    #[test]
    fn test_apply_counts_interactions() {
        let mut app = App::new(SimulationId::Aquarium, AppConfig::default(), Some(3)).unwrap();
        app.apply(&Interaction::Tool {
            tool: Tool::Feed,
            x: 0.0,
            y: 0.0,
        })
        .unwrap();
        assert!(app
            .apply(&Interaction::Knob {
                knob: Knob::Light,
                value: 1.0
            })
            .is_err());
        assert_eq!(app.metrics.counter("interactions"), 1);
    }
}
