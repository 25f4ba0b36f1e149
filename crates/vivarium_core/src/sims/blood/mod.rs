//! A stretch of artery: cells ride a pulsing parabolic flow, platelets plug
//! wall damage, white cells hunt injected pathogens and cholesterol slowly
//! builds plaque.

mod cells;

pub use cells::{Cell, CellBody, CellKind, Lineage, PathogenState, PlaqueState, PlateletState, Strain};

use crate::config::BloodConfig;
use crate::error::{Result, SimError};
use crate::simulation::{frames, Simulation, SimulationId};
use crate::stage::{Environment, Stage, TickReport};
use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use vivarium_data::{Bounds, Census, Frame, Interaction, Knob, Rgba, Sprite, Tool};

/// An injured patch of vessel wall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DamageZone {
    pub id: u64,
    pub pos: Vec2,
    pub radius: f32,
    /// Frames since the injury
    pub age: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VesselEnv {
    pub flow_rate: f32,
    pub heart_phase: f32,
    /// Flow rate scaled by the current pulse
    pub current_flow: f32,
    pub center: f32,
    pub radius: f32,
    pub width: f32,
    pub zones: Vec<DamageZone>,
    zone_radius: f32,
    heal_frames: f32,
    next_zone: u64,
    frame: u64,
}

impl VesselEnv {
    fn new(config: &BloodConfig) -> Self {
        Self {
            flow_rate: config.flow_rate,
            heart_phase: 0.0,
            current_flow: config.flow_rate,
            center: config.height / 2.0,
            radius: config.height / 2.0,
            width: config.width,
            zones: Vec::new(),
            zone_radius: config.damage_radius,
            heal_frames: config.heal_frames,
            next_zone: 0,
            frame: 0,
        }
    }

    #[must_use]
    pub fn systolic(&self) -> f32 {
        120.0 * self.flow_rate
    }

    #[must_use]
    pub fn diastolic(&self) -> f32 {
        80.0 * (0.5 + self.flow_rate * 0.5)
    }

    #[must_use]
    pub fn heart_rate(&self) -> f32 {
        (60.0 * self.flow_rate).floor()
    }

    /// Opens a damage zone and returns its id.
    pub fn injure(&mut self, pos: Vec2) -> u64 {
        let id = self.next_zone;
        self.next_zone += 1;
        self.zones.push(DamageZone {
            id,
            pos,
            radius: self.zone_radius,
            age: 0.0,
        });
        tracing::debug!(id, x = pos.x, y = pos.y, "Vessel wall damaged");
        id
    }

    /// Zone containing `pos`, if any; the oldest zone wins on overlap.
    #[must_use]
    pub fn zone_at(&self, pos: Vec2) -> Option<u64> {
        self.zones
            .iter()
            .find(|z| z.pos.distance(pos) < z.radius)
            .map(|z| z.id)
    }
}

impl Environment for VesselEnv {
    fn advance(&mut self, dt: f32, rng: &mut ChaCha8Rng) {
        self.heart_phase += 0.05 * self.flow_rate * dt;
        self.current_flow = self.flow_rate * (1.0 + self.heart_phase.sin() * 0.2);

        let heal = self.heal_frames;
        for zone in &mut self.zones {
            zone.age += dt;
        }
        let before = self.zones.len();
        self.zones.retain(|z| z.age < heal);
        if self.zones.len() < before {
            tracing::debug!(healed = before - self.zones.len(), "Damage zones healed");
        }

        // Hypertension tears the wall now and then.
        self.frame += 1;
        if self.frame % 10 == 0 && self.systolic().round() > 190.0 && rng.gen::<f32>() < 0.05 {
            let x = rng.gen::<f32>() * self.width;
            let y = if rng.gen::<f32>() > 0.5 {
                self.center - self.radius + 30.0
            } else {
                self.center + self.radius - 30.0
            };
            self.injure(Vec2::new(x, y));
        }
    }
}

pub struct Vessel {
    stage: Stage<Cell>,
    config: BloodConfig,
}

fn anywhere(rng: &mut ChaCha8Rng, b: Bounds) -> Vec2 {
    Vec2::new(rng.gen::<f32>() * b.width, rng.gen::<f32>() * b.height)
}

impl Vessel {
    #[must_use]
    pub fn new(config: &BloodConfig, seed: u64, capacity: usize) -> Self {
        let bounds = Bounds::new(config.width, config.height);
        let mut stage = Stage::new(bounds, VesselEnv::new(config), seed, capacity);
        stage.populate(config.platelets, |rng, b| Cell::platelet(anywhere(rng, b), rng));
        stage.populate(config.red_cells, |rng, b| Cell::red(anywhere(rng, b), rng));
        stage.populate(config.white_cells, |rng, b| Cell::white(anywhere(rng, b), rng));
        tracing::debug!(population = stage.len(), "Vessel seeded");
        Self {
            stage,
            config: config.clone(),
        }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Cell> {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage<Cell> {
        &mut self.stage
    }

    #[must_use]
    pub fn env(&self) -> &VesselEnv {
        self.stage.env()
    }

    #[must_use]
    pub fn count(&self, kind: CellKind) -> usize {
        self.stage.count(kind)
    }

    pub fn cut(&mut self, at: Vec2) -> u64 {
        self.stage.env_mut().injure(at)
    }

    /// Releases a handful of pathogens around `at`.
    pub fn inject(&mut self, at: Vec2) -> usize {
        let mut added = 0;
        for _ in 0..self.config.inject_count {
            let pos = crate::sims::scatter(self.stage.rng_mut(), at, 20.0);
            let germ = Cell::pathogen(pos, self.stage.rng_mut());
            if self.stage.spawn(germ).is_some() {
                added += 1;
            }
        }
        added
    }

    pub fn plaque(&mut self, at: Vec2) -> bool {
        let particle = Cell::cholesterol(at, self.stage.rng_mut());
        self.stage.spawn(particle).is_some()
    }

    #[must_use]
    pub fn status(&self) -> &'static str {
        if self.count(CellKind::Clot) > 10 {
            "Clotting"
        } else {
            "Normal"
        }
    }
}

impl Simulation for Vessel {
    fn id(&self) -> SimulationId {
        SimulationId::BloodVessel
    }

    fn step(&mut self, dt: f32) -> TickReport {
        self.stage.step(frames(dt))
    }

    fn frame(&self) -> Frame {
        let b = self.stage.bounds();
        let env = self.stage.env();
        let mut frame = Frame::flat(self.stage.tick(), b.width, b.height, Rgba::hex(0x220000));

        let wall = Rgba::hex(0x550000).with_alpha(0.8);
        let top = env.center - env.radius;
        let bottom = env.center + env.radius;
        frame.sprites.push(Sprite::rect(b.width / 2.0, top + 5.0, b.width, 10.0, wall).on_layer(-2));
        frame.sprites.push(Sprite::rect(b.width / 2.0, bottom - 5.0, b.width, 10.0, wall).on_layer(-2));

        for zone in &env.zones {
            let (x, y) = (zone.pos.x, zone.pos.y);
            let fade = 1.0 - zone.age / env.heal_frames.max(1.0);
            frame
                .sprites
                .push(Sprite::line(x - 20.0, y - 10.0, 40.0, 20.0, 4.0, Rgba::hex(0x8b0000).with_alpha(0.8 * fade)).on_layer(-1));
            frame
                .sprites
                .push(Sprite::line(x - 15.0, y - 5.0, 30.0, 10.0, 2.0, Rgba::WHITE.with_alpha(0.5 * fade)).on_layer(-1));
        }

        frame.sprites.extend(self.stage.sprites());
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Tool { tool: Tool::Cut, x, y } => {
                self.cut(Vec2::new(x, y));
            }
            Interaction::Tool { tool: Tool::Inject, x, y } => {
                let added = self.inject(Vec2::new(x, y));
                tracing::debug!(added, "Pathogens injected");
            }
            Interaction::Tool { tool: Tool::Plaque, x, y } => {
                self.plaque(Vec2::new(x, y));
            }
            Interaction::Tool { tool: Tool::Observe, .. } => {}
            Interaction::Knob { knob: Knob::Flow, value } => {
                self.stage.env_mut().flow_rate = value.clamp(0.2, 2.5);
            }
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        let env = self.env();
        let platelets = self.count(CellKind::Platelet) + self.count(CellKind::Clot);
        let cholesterol = self.count(CellKind::Cholesterol) + self.count(CellKind::Plaque);
        let systolic = env.systolic().round();
        Census::new()
            .with("RBC", self.count(CellKind::RedCell) as f64)
            .with("WBC", self.count(CellKind::WhiteCell) as f64)
            .with("Platelets", platelets as f64)
            .with("Clumping", self.count(CellKind::Clot) as f64)
            .with("Pathogens", self.count(CellKind::Pathogen) as f64)
            .with("Cholesterol", cholesterol as f64)
            .with("Damage zones", env.zones.len() as f64)
            .with("Heart rate", f64::from(env.heart_rate()))
            .with("Systolic", f64::from(systolic))
            .with("Diastolic", f64::from(env.diastolic().round()))
            .with("BP alert", if systolic > 160.0 { 1.0 } else { 0.0 })
            .with_status(self.status())
    }

    fn tick(&self) -> u64 {
        self.stage.tick()
    }

    fn population(&self) -> usize {
        self.stage.len()
    }
}
