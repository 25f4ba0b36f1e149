pub mod macros;

use vivarium_core::config::AppConfig;
use vivarium_core::{Simulation, SimulationId};
use vivarium_lib::app::App;

#[allow(dead_code)]
pub struct SimBuilder {
    id: SimulationId,
    config: AppConfig,
    seed: u64,
}

#[allow(dead_code)]
impl SimBuilder {
    pub fn new(id: SimulationId) -> Self {
        Self {
            id,
            config: AppConfig::default(),
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn build(self) -> Box<dyn Simulation> {
        vivarium_core::create(self.id, &self.config, self.seed)
    }

    pub fn build_app(self) -> App {
        App::new(self.id, self.config, Some(self.seed)).expect("valid test config")
    }
}

/// Steps `sim` at 60 fps for `ticks` frames.
#[allow(dead_code)]
pub fn run(sim: &mut dyn Simulation, ticks: u64) {
    for _ in 0..ticks {
        sim.step(1.0 / 60.0);
    }
}
