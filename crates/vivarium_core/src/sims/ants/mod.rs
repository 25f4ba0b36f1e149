//! Ant farm: a side-on slice of soil where a queen digs a chamber, lays
//! eggs, and workers forage along pheromone trails while hauling dirt
//! out of their tunnels.

mod colony;
mod terrain;

pub use colony::{Ant, Caste, Feed, QueenState, Role, Task, TaskCue};
pub use terrain::{ground_level, Ground, Terrain};

use crate::config::AntConfig;
use crate::error::{Result, SimError};
use crate::field::ScalarField;
use crate::simulation::{seconds, Simulation, SimulationId};
use crate::stage::{Environment, Stage, TickReport};
use crate::sims::jitter;
use rand::Rng;
use vivarium_data::{Bounds, Census, Frame, Interaction, Knob, Rgba, Sprite, Tool};

const COLONY_CAPACITY: usize = 4000;
const QUEEN_START: i32 = 80;

/// Shared soil and chemistry of the farm.
#[derive(Debug, Clone)]
pub struct Nest {
    pub terrain: Terrain,
    pub home: ScalarField,
    pub food: ScalarField,
    pub egg_interval: u64,
}

impl Nest {
    #[must_use]
    pub fn new(config: &AntConfig) -> Self {
        let (w, h) = (usize::from(config.width), usize::from(config.height));
        Self {
            terrain: Terrain::generate(config.width, config.height),
            home: ScalarField::new(w, h, 1.0, config.pheromone_decay, 1.0),
            food: ScalarField::new(w, h, 1.0, config.pheromone_decay, 1.0),
            egg_interval: config.egg_interval,
        }
    }
}

// Trails fade once per rendered frame, not per substep, so the farm owns
// the decay instead of the stage.
impl Environment for Nest {}

pub struct AntFarm {
    stage: Stage<Ant>,
    config: AntConfig,
    sim_speed: u32,
    food_clock_ms: f32,
    /// Calls to `step`; the stage counts colony substeps instead
    frames: u64,
}

impl AntFarm {
    #[must_use]
    pub fn new(config: &AntConfig, seed: u64) -> Self {
        let bounds = Bounds::new(f32::from(config.width), f32::from(config.height));
        let mut stage = Stage::new(bounds, Nest::new(config), seed, COLONY_CAPACITY);

        let mid = i32::from(config.width) / 2;
        let queen = Ant::queen(mid, QUEEN_START, stage.rng_mut());
        stage.spawn(queen);
        stage.populate(config.workers, |rng, _| {
            let x = mid + jitter(rng, 10.0).round() as i32;
            Ant::worker(x, QUEEN_START, rng)
        });
        tracing::debug!(workers = config.workers, "Ant farm founded");

        Self {
            stage,
            config: config.clone(),
            sim_speed: config.sim_speed,
            food_clock_ms: 0.0,
            frames: 0,
        }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Ant> {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage<Ant> {
        &mut self.stage
    }

    #[must_use]
    pub fn nest(&self) -> &Nest {
        self.stage.env()
    }

    #[must_use]
    pub fn count(&self, caste: Caste) -> usize {
        self.stage.count(caste)
    }

    #[must_use]
    pub fn sim_speed(&self) -> u32 {
        self.sim_speed
    }

    #[must_use]
    pub fn queen_state(&self) -> Option<QueenState> {
        let mut state = None;
        self.stage.for_each(|_, ant| {
            if let Role::Queen { state: s, .. } = ant.role {
                state = Some(s);
            }
        });
        state
    }

    /// Places a crumb at `(x, y)`, or on the surface of column `x` when `y`
    /// is `None`. Returns false outside the farm or when the stage is full.
    pub fn drop_food(&mut self, x: i32, y: Option<i32>) -> bool {
        let terrain = &self.stage.env().terrain;
        if x < 0 || x >= terrain.width() {
            return false;
        }
        let y = y.unwrap_or_else(|| terrain.surface(x) - 1);
        if !terrain.is_valid(x, y) {
            return false;
        }
        let crumb = Ant::food(x, y, self.stage.rng_mut());
        self.stage.spawn(crumb).is_some()
    }

    /// Scatters ten crumbs around a point.
    pub fn drop_cluster(&mut self, x: f32, y: f32) -> usize {
        let mut placed = 0;
        for _ in 0..10 {
            let rng = self.stage.rng_mut();
            let cx = (x + jitter(rng, 10.0)).floor() as i32;
            let cy = (y + jitter(rng, 10.0)).floor() as i32;
            if self.drop_food(cx, Some(cy)) {
                placed += 1;
            }
        }
        placed
    }

    fn restock(&mut self, dt: f32) {
        self.food_clock_ms += seconds(dt) * 1000.0;
        let interval = self.config.food_interval_ms.max(1.0);
        while self.food_clock_ms >= interval {
            self.food_clock_ms -= interval;
            if self.count(Caste::Food) < self.config.max_food {
                let width = i32::from(self.config.width);
                let x = self.stage.rng_mut().gen_range(0..width);
                self.drop_food(x, None);
            }
        }
    }
}

impl Simulation for AntFarm {
    fn id(&self) -> SimulationId {
        SimulationId::AntFarm
    }

    /// Runs `sim_speed` colony ticks, then fades the trails once.
    fn step(&mut self, dt: f32) -> TickReport {
        self.frames += 1;
        self.restock(dt);
        let mut report = TickReport::default();
        for _ in 0..self.sim_speed {
            report.absorb(self.stage.step(1.0));
        }
        let nest = self.stage.env_mut();
        nest.home.decay();
        nest.food.decay();
        report.tick = self.frames;
        report
    }

    fn frame(&self) -> Frame {
        let b = self.stage.bounds();
        let terrain = &self.nest().terrain;
        let mut frame = Frame::flat(self.frames, b.width, b.height, Rgba::hex(0x3e2723));
        frame
            .sprites
            .push(Sprite::rect(b.width / 2.0, 40.0, b.width, 80.0, Rgba::hex(0x87ceeb)).on_layer(-3));

        let dirt = Rgba::hex(0x5d4037);
        for y in 0..terrain.height() {
            for (x0, len) in terrain.runs(y, Ground::Dirt) {
                let cx = x0 as f32 + len as f32 / 2.0;
                frame
                    .sprites
                    .push(Sprite::rect(cx, y as f32 + 0.5, len as f32, 1.0, dirt).on_layer(-2));
            }
        }

        frame.sprites.extend(self.stage.sprites());
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Tool {
                tool: Tool::DropFood,
                x,
                y,
            } => {
                let placed = self.drop_cluster(x, y);
                tracing::debug!(placed, "Sugar dropped");
            }
            Interaction::Tool { tool: Tool::SpawnFood, .. } => {
                let mid = i32::from(self.config.width) / 2;
                self.drop_food(mid, None);
            }
            Interaction::Knob {
                knob: Knob::SimSpeed,
                value,
            } => {
                self.sim_speed = value.round().clamp(1.0, 8.0) as u32;
            }
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        let mut carrying_dirt = 0;
        let mut carrying_food = 0;
        self.stage.for_each(|_, ant| {
            if let Role::Worker { task } = ant.role {
                carrying_dirt += usize::from(task.holding_dirt());
                carrying_food += usize::from(task.has_food());
            }
        });
        let status = match self.queen_state() {
            Some(QueenState::DigChamber) => "Digging chamber",
            Some(QueenState::LayEggs) => "Laying eggs",
            None => "No queen",
        };
        Census::new()
            .with("Workers", self.count(Caste::Worker) as f64)
            .with("Eggs", self.count(Caste::Egg) as f64)
            .with("Larvae", self.count(Caste::Larva) as f64)
            .with("Food", self.count(Caste::Food) as f64)
            .with("Carrying dirt", carrying_dirt as f64)
            .with("Carrying food", carrying_food as f64)
            .with("Dirt cells", self.nest().terrain.dirt_cells() as f64)
            .with("Sim speed", f64::from(self.sim_speed))
            .with_status(status)
    }

    fn tick(&self) -> u64 {
        self.frames
    }

    fn population(&self) -> usize {
        self.stage.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn farm() -> AntFarm {
        AntFarm::new(&AntConfig::default(), 21)
    }

    #[test]
    fn test_founding_colony() {
        let farm = farm();
        assert_eq!(farm.count(Caste::Queen), 1);
        assert_eq!(farm.count(Caste::Worker), 20);
        assert_eq!(farm.queen_state(), Some(QueenState::DigChamber));
        assert_eq!(farm.census().status.as_deref(), Some("Digging chamber"));
    }

    #[test]
    fn test_queen_digs_chamber_then_lays() {
        let mut farm = farm();
        for _ in 0..60 {
            farm.step(1.0 / 60.0);
        }
        assert_eq!(farm.queen_state(), Some(QueenState::LayEggs));
        // Chamber center is open.
        assert!(farm.nest().terrain.is_air(200, 150));

        for _ in 0..150 {
            farm.step(1.0 / 60.0);
        }
        assert!(farm.count(Caste::Egg) >= 1);
    }

    #[test]
    fn test_worker_picks_up_adjacent_food() {
        let config = AntConfig {
            workers: 0,
            ..Default::default()
        };
        let mut farm = AntFarm::new(&config, 5);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        farm.stage_mut().spawn(Ant::worker(50, 60, &mut rng));
        farm.stage_mut().spawn(Ant::food(51, 60, &mut rng));
        let report = farm.stage_mut().step(1.0);
        assert_eq!(report.consumed, 1);
        assert_eq!(farm.count(Caste::Food), 0);
        let mut carrying = false;
        farm.stage().for_each(|_, ant| {
            if let Role::Worker { task } = ant.role {
                carrying = task.has_food();
            }
        });
        assert!(carrying);
    }

    #[test]
    fn test_fed_larva_ages() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut larva = Ant::larva(10, 120, &mut rng);
        crate::stage::Agent::receive(&mut larva, Feed);
        match larva.role {
            Role::Larva { age, hunger, .. } => {
                assert_eq!(age, 200);
                assert_eq!(hunger, 0);
            }
            other => panic!("unexpected role {other:?}"),
        }
    }

    #[test]
    fn test_food_restocks_on_the_surface() {
        let config = AntConfig {
            workers: 0,
            ..Default::default()
        };
        let mut farm = AntFarm::new(&config, 5);
        farm.step(0.5);
        assert_eq!(farm.count(Caste::Food), 0);
        for _ in 0..61 {
            farm.step(1.0 / 60.0);
        }
        assert_eq!(farm.count(Caste::Food), 2);
        farm.stage().for_each(|_, ant| {
            if ant.caste() == Caste::Food {
                let terrain = &farm.nest().terrain;
                assert!(terrain.is_dirt(ant.x, ant.y + 1));
            }
        });
    }

    #[test]
    fn test_stalled_frame_restocks_at_most_one_clamped_interval() {
        let config = AntConfig {
            workers: 0,
            food_interval_ms: 10.0,
            ..Default::default()
        };
        let mut farm = AntFarm::new(&config, 6);
        farm.step(30.0);
        assert_eq!(farm.count(Caste::Food), 6);
    }

    #[test]
    fn test_tick_counts_frames_not_substeps() {
        let mut farm = farm();
        assert_eq!(farm.sim_speed(), 2);
        for _ in 0..5 {
            farm.step(1.0 / 60.0);
        }
        assert_eq!(farm.tick(), 5);
        assert_eq!(farm.stage().tick(), 10);
    }

    #[test]
    fn test_tools_and_sim_speed() {
        let mut farm = farm();
        farm.apply(&Interaction::Tool {
            tool: Tool::DropFood,
            x: 100.0,
            y: 70.0,
        })
        .unwrap();
        farm.apply(&Interaction::Tool {
            tool: Tool::SpawnFood,
            x: 0.0,
            y: 0.0,
        })
        .unwrap();
        assert_eq!(farm.count(Caste::Food), 11);

        farm.apply(&Interaction::Knob {
            knob: Knob::SimSpeed,
            value: 12.0,
        })
        .unwrap();
        assert_eq!(farm.sim_speed(), 8);
        let report = farm.step(1.0 / 60.0);
        assert_eq!(farm.tick(), 1);
        assert_eq!(farm.stage().tick(), 8);
        assert_eq!(farm.frame().tick, 1);
        assert!(report.updated >= 8 * 21);
        assert!(farm
            .apply(&Interaction::Knob {
                knob: Knob::Light,
                value: 1.0
            })
            .is_err());
    }

    #[test]
    fn test_pheromone_stays_capped() {
        let mut farm = farm();
        for _ in 0..100 {
            farm.step(1.0 / 60.0);
        }
        assert!(farm.nest().home.max_value() <= 1.0);
        assert!(farm.nest().food.max_value() <= 1.0);
    }
}
