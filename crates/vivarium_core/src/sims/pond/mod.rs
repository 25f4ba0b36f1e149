//! A drop of pond water under the microscope.
//!
//! Bacteria drift, algae bask, and a handful of predators (paramecia,
//! amoebae, euglenae, rotifers, hydrae) hunt them. Starved predators sink
//! as detritus, which in turn feeds the filter feeders.

mod organisms;

pub use organisms::{AmoebaMode, Body, EuglenaMode, HydraMode, Organism, PondEffect, Species};

use crate::config::PondConfig;
use crate::error::{Result, SimError};
use crate::simulation::{frames, Simulation, SimulationId};
use crate::stage::{Environment, Stage, TickReport};
use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vivarium_data::{Bounds, Census, Frame, Interaction, Knob, Rgba, Tool};

/// Water conditions shared by every organism.
#[derive(Debug, Clone, PartialEq)]
pub struct PondEnv {
    /// 0.0 (dark) to 1.5 (bright)
    pub light: f32,
    /// Scales rotifer activity
    pub temperature: f32,
    /// Frames elapsed; drives wander and pulse phases
    pub clock: f32,
    pub caustic: f32,
}

impl Environment for PondEnv {
    fn advance(&mut self, dt: f32, _rng: &mut ChaCha8Rng) {
        self.clock += dt;
        self.caustic += 0.01 * dt;
    }
}

pub struct Pond {
    stage: Stage<Organism>,
    config: PondConfig,
    zoom: f32,
}

fn anywhere(rng: &mut ChaCha8Rng, b: Bounds) -> Vec2 {
    Vec2::new(rng.gen::<f32>() * b.width, rng.gen::<f32>() * b.height)
}

impl Pond {
    #[must_use]
    pub fn new(config: &PondConfig, seed: u64, capacity: usize) -> Self {
        let bounds = Bounds::new(config.width, config.height);
        let env = PondEnv {
            light: config.light,
            temperature: config.temperature,
            clock: 0.0,
            caustic: 0.0,
        };
        let mut stage = Stage::new(bounds, env, seed, capacity);

        let plan = [
            (Species::Bacterium, config.bacteria),
            (Species::Paramecium, config.paramecia),
            (Species::Alga, config.algae),
            (Species::Amoeba, config.amoebae),
            (Species::Euglena, config.euglenae),
            (Species::Rotifer, config.rotifers),
        ];
        for (species, count) in plan {
            stage.populate(count, |rng, b| {
                let at = anywhere(rng, b);
                Organism::spawn(species, at, rng)
            });
        }
        // Hydrae anchor in the lower part of the drop.
        stage.populate(config.hydrae, |rng, b| {
            let at = Vec2::new(
                rng.gen_range(30.0..(b.width - 30.0).max(31.0)),
                rng.gen_range((b.height * 0.7)..(b.height - 20.0).max(b.height * 0.7 + 1.0)),
            );
            Organism::spawn(Species::Hydra, at, rng)
        });

        tracing::debug!(population = stage.len(), "Pond seeded");
        Self {
            stage,
            config: config.clone(),
            zoom: 1.0,
        }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Organism> {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage<Organism> {
        &mut self.stage
    }

    #[must_use]
    pub fn count(&self, species: Species) -> usize {
        self.stage.count(species)
    }

    /// Maps a canvas point to pond coordinates under the current zoom.
    fn to_local(&self, x: f32, y: f32) -> Vec2 {
        let c = self.stage.bounds().center();
        Vec2::new(c.0 + (x - c.0) / self.zoom, c.1 + (y - c.1) / self.zoom)
    }

    /// Drops a cluster of bacteria around `at`.
    pub fn pipette(&mut self, at: Vec2) -> usize {
        let radius = self.config.pipette_radius;
        let mut added = 0;
        for _ in 0..self.config.pipette_burst {
            let pos = crate::sims::scatter(self.stage.rng_mut(), at, radius);
            let bacterium = Organism::spawn(Species::Bacterium, pos, self.stage.rng_mut());
            if self.stage.spawn(bacterium).is_some() {
                added += 1;
            }
        }
        added
    }

    /// Pushes every organism within the repel radius straight away from `at`.
    pub fn repel(&mut self, at: Vec2) {
        let radius = self.config.repel_radius;
        let strength = self.config.repel_strength;
        self.stage.for_each_mut(|o, _, _| {
            let away = o.pos - at;
            let d = away.length();
            if d < radius && d > f32::EPSILON {
                o.vel += away / d * strength;
            }
        });
    }
}

impl Simulation for Pond {
    fn id(&self) -> SimulationId {
        SimulationId::PondDrop
    }

    fn step(&mut self, dt: f32) -> TickReport {
        self.stage.step(frames(dt))
    }

    fn frame(&self) -> Frame {
        let b = self.stage.bounds();
        let light = self.stage.env().light;
        let dim = (1.0 - light / 1.5).clamp(0.0, 1.0) * 0.5;
        let water = if self.zoom > 1.0 {
            Rgba::hex(0x0a2e3d)
        } else {
            Rgba::hex(0x051a26)
        };
        let mut frame = Frame::flat(self.stage.tick(), b.width, b.height, water.lerp(Rgba::BLACK, dim));

        // Caustic shimmer bands along the top of the drop.
        let caustic = self.stage.env().caustic;
        for i in 0..6 {
            let x = b.width * (i as f32 + 0.5) / 6.0 + (caustic * 2.0 + i as f32).sin() * 30.0;
            let alpha = 0.03 + 0.02 * (caustic * 3.0 + i as f32 * 1.7).sin().abs() * light;
            frame.sprites.push(
                vivarium_data::Sprite::ellipse(x, b.height * 0.3, 120.0, 40.0, Rgba::hex(0x2a6a7a).with_alpha(alpha))
                    .on_layer(-2),
            );
        }

        let (cx, cy) = b.center();
        let zoom = self.zoom;
        frame.sprites.extend(
            self.stage
                .sprites()
                .into_iter()
                .map(|s| if zoom == 1.0 { s } else { s.scaled_about(cx, cy, zoom) }),
        );
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Tool { tool: Tool::Pipette, x, y } => {
                let at = self.to_local(x, y);
                let added = self.pipette(at);
                tracing::debug!(added, "Pipette drop");
            }
            Interaction::Tool { tool: Tool::Repel, x, y } => {
                let at = self.to_local(x, y);
                self.repel(at);
            }
            Interaction::Knob { knob: Knob::Light, value } => {
                self.stage.env_mut().light = value.clamp(0.0, 1.5);
            }
            Interaction::Knob { knob: Knob::Temperature, value } => {
                self.stage.env_mut().temperature = value.clamp(0.1, 3.0);
            }
            Interaction::Knob { knob: Knob::Zoom, value } => {
                self.zoom = value.clamp(0.5, 4.0);
            }
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        Species::ALL
            .iter()
            .fold(Census::new(), |c, s| c.with(s.label(), self.count(*s) as f64))
    }

    fn tick(&self) -> u64 {
        self.stage.tick()
    }

    fn population(&self) -> usize {
        self.stage.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Agent;

    fn quiet_pond() -> Pond {
        let config = PondConfig {
            bacteria: 0,
            paramecia: 0,
            algae: 0,
            amoebae: 0,
            euglenae: 0,
            rotifers: 0,
            hydrae: 0,
            ..Default::default()
        };
        Pond::new(&config, 5, 1000)
    }

    #[test]
    fn test_default_population() {
        let pond = Pond::new(&PondConfig::default(), 1, 5000);
        let census = pond.census();
        assert_eq!(census.count("Bacteria"), 200);
        assert_eq!(census.count("Paramecia"), 15);
        assert_eq!(census.count("Algae"), 40);
        assert_eq!(census.count("Hydrae"), 3);
    }

    #[test]
    fn test_pipette_adds_twenty_nearby() {
        let mut pond = quiet_pond();
        pond.apply(&Interaction::Tool {
            tool: Tool::Pipette,
            x: 400.0,
            y: 300.0,
        })
        .unwrap();
        assert_eq!(pond.count(Species::Bacterium), 20);
        pond.stage().for_each(|_, o| {
            assert!(o.position().distance(Vec2::new(400.0, 300.0)) <= 50.0 + 1e-3);
        });
    }

    #[test]
    fn test_repel_pushes_radially() {
        let mut pond = quiet_pond();
        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(1);
        let mut near = Organism::spawn(Species::Bacterium, Vec2::new(450.0, 300.0), &mut rng);
        near.vel = Vec2::ZERO;
        let mut far = Organism::spawn(Species::Bacterium, Vec2::new(700.0, 300.0), &mut rng);
        far.vel = Vec2::ZERO;
        pond.stage_mut().spawn(near);
        pond.stage_mut().spawn(far);
        pond.repel(Vec2::new(400.0, 300.0));
        let mut vels = Vec::new();
        pond.stage().for_each(|_, o| vels.push(o.vel));
        assert_eq!(vels[0], Vec2::new(5.0, 0.0));
        assert_eq!(vels[1], Vec2::ZERO);
    }

    #[test]
    fn test_paramecium_eats_adjacent_bacterium() {
        let mut pond = quiet_pond();
        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(9);
        pond.stage_mut()
            .spawn(Organism::spawn(Species::Paramecium, Vec2::new(200.0, 200.0), &mut rng));
        pond.stage_mut()
            .spawn(Organism::spawn(Species::Bacterium, Vec2::new(205.0, 200.0), &mut rng));
        let report = pond.step(1.0 / 60.0);
        assert_eq!(report.consumed, 1);
        assert_eq!(pond.count(Species::Bacterium), 0);
    }

    #[test]
    fn test_starved_rotifer_leaves_detritus() {
        let mut pond = quiet_pond();
        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(4);
        let mut rotifer = Organism::spawn(Species::Rotifer, Vec2::new(100.0, 100.0), &mut rng);
        rotifer.body = Body::Rotifer { energy: 0.01 };
        pond.stage_mut().spawn(rotifer);
        let report = pond.step(1.0 / 60.0);
        assert_eq!(report.expired, 1);
        assert_eq!(report.spawned, 1);
        assert_eq!(pond.count(Species::Rotifer), 0);
        assert_eq!(pond.count(Species::Detritus), 1);
    }

    #[test]
    fn test_dark_water_switches_euglena_to_hunting() {
        let mut pond = quiet_pond();
        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(4);
        pond.stage_mut()
            .spawn(Organism::spawn(Species::Euglena, Vec2::new(100.0, 100.0), &mut rng));
        pond.apply(&Interaction::Knob {
            knob: Knob::Light,
            value: 0.2,
        })
        .unwrap();
        pond.step(1.0 / 60.0);
        let mut mode = None;
        pond.stage().for_each(|_, o| {
            if let Body::Euglena { mode: m, .. } = o.body {
                mode = Some(m);
            }
        });
        assert_eq!(mode, Some(EuglenaMode::Hunting));
    }

    #[test]
    fn test_unsupported_tool() {
        let mut pond = quiet_pond();
        let err = pond
            .apply(&Interaction::Tool {
                tool: Tool::Cut,
                x: 0.0,
                y: 0.0,
            })
            .unwrap_err();
        assert!(matches!(err, SimError::UnsupportedInteraction { .. }));
    }

    #[test]
    fn test_light_knob_is_clamped() {
        let mut pond = quiet_pond();
        pond.apply(&Interaction::Knob {
            knob: Knob::Light,
            value: 9.0,
        })
        .unwrap();
        assert_eq!(pond.stage().env().light, 1.5);
    }
}
