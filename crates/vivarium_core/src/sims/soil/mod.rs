//! Rhizosphere: soil grains around a taproot, bacteria grazing organic
//! matter and a fungal network spreading through the wet soil.

mod fungi;

pub use fungi::{FungalNetwork, Hypha, Root};

use crate::config::SoilConfig;
use crate::edges;
use crate::error::{Result, SimError};
use crate::field::ScalarField;
use crate::simulation::{frames, Simulation, SimulationId};
use crate::stage::{Agent, Environment, Outcome, PeerOf, Stage, Tick, TickReport};
use crate::steering::{integrate, nearest, seek};
use crate::sims::{angle, between, heading, jitter};
use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vivarium_data::{Bounds, Census, Frame, Interaction, Rgba, Shape, Sprite, Tool};

const MOISTURE_CELL: f32 = 20.0;
const BACTERIUM_MAX_SPEED: f32 = 1.5;
const BACTERIUM_MAX_FORCE: f32 = 0.1;
const MIN_GRAIN: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DwellerKind {
    Sand,
    Organic,
    Clay,
    Bacterium,
}

/// A bacterium asks an organic grain to give up some of its mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nibble(pub f32);

/// One soil grain or bacterium.
#[derive(Debug, Clone, PartialEq)]
pub struct Dweller {
    pub kind: DwellerKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub energy: f32,
    rotation: f32,
    phase: f32,
    /// Moisture under the grain, refreshed each tick for drawing
    wetness: f32,
    hue: f32,
}

impl Dweller {
    fn base(kind: DwellerKind, pos: Vec2, size: f32, rng: &mut ChaCha8Rng) -> Self {
        Self {
            kind,
            pos,
            vel: Vec2::ZERO,
            size,
            energy: 0.0,
            rotation: angle(rng),
            phase: angle(rng),
            wetness: 0.0,
            hue: 0.0,
        }
    }

    /// A grain of random texture: sand 40%, organic 20%, clay 40%.
    pub fn grain(pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let roll: f32 = rng.gen();
        let kind = if roll < 0.4 {
            DwellerKind::Sand
        } else if roll < 0.6 {
            DwellerKind::Organic
        } else {
            DwellerKind::Clay
        };
        let size = between(rng, 4.0, 12.0);
        Self::base(kind, pos, size, rng)
    }

    pub fn organic(pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let size = between(rng, 4.0, 10.0);
        Self::base(DwellerKind::Organic, pos, size, rng)
    }

    pub fn bacterium(pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let mut b = Self::base(DwellerKind::Bacterium, pos, 4.0, rng);
        b.vel = heading(angle(rng)) * 0.5;
        b.energy = between(rng, 50.0, 100.0);
        b.hue = between(rng, 0.0, 1.0);
        b
    }

    #[must_use]
    pub fn is_grain(&self) -> bool {
        self.kind != DwellerKind::Bacterium
    }

    fn graze(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>]) -> Outcome {
        let dt = ctx.dt;
        let mut acc = heading(angle(ctx.rng)) * 0.15;

        let food = nearest(peers, self.pos, 80.0, |p| p.kind == DwellerKind::Organic && ctx.is_live(p))
            .map(|(p, d)| (p.entity, p.position, d));
        if let Some((entity, at, d)) = food {
            acc += seek(self.pos, self.vel, at, BACTERIUM_MAX_SPEED * 1.5, BACTERIUM_MAX_FORCE);
            if d < 8.0 {
                self.energy += 5.0;
                ctx.send(entity, Nibble(0.1));
            }
        }

        if let Some((point, d)) = ctx.env.root.nearest(self.pos) {
            if d > 30.0 && d < 200.0 {
                acc += (point - self.pos).normalize_or_zero() * 0.3;
            }
        }

        integrate(&mut self.vel, acc, BACTERIUM_MAX_SPEED);
        self.pos += self.vel * dt;
        edges::wrap(&mut self.pos, ctx.bounds, 0.0);
        self.energy -= 0.05 * dt;
        self.phase += 0.05 * dt;

        if self.energy <= 0.0 {
            ctx.env.live_bacteria = ctx.env.live_bacteria.saturating_sub(1);
            return Outcome::Expired;
        }
        if self.energy > 150.0 {
            let env = &mut *ctx.env;
            if env.live_bacteria < env.max_bacteria {
                env.live_bacteria += 1;
                self.energy *= 0.5;
                let at = self.pos + Vec2::new(jitter(ctx.rng, 10.0), jitter(ctx.rng, 10.0));
                let child = Dweller::bacterium(at, ctx.rng);
                ctx.spawn(child);
            }
        }
        Outcome::Idle
    }
}

impl Agent for Dweller {
    type Kind = DwellerKind;
    type Vector = Vec2;
    type Env = SoilEnv;
    type Effect = Nibble;

    fn kind(&self) -> DwellerKind {
        self.kind
    }

    fn position(&self) -> Vec2 {
        self.pos
    }

    fn velocity(&self) -> Vec2 {
        self.vel
    }

    fn size(&self) -> f32 {
        self.size
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>]) -> Outcome {
        if self.kind == DwellerKind::Bacterium {
            return self.graze(ctx, peers);
        }

        self.wetness = ctx.env.moisture.sample(self.pos.x, self.pos.y);
        if self.kind == DwellerKind::Organic {
            if self.size <= MIN_GRAIN {
                tracing::debug!(x = self.pos.x, y = self.pos.y, "Organic matter used up");
                return Outcome::Expired;
            }
            if self.size > 3.0 {
                let dt = ctx.dt;
                self.pos.x += jitter(ctx.rng, 0.2) * dt;
                self.pos.y += between(ctx.rng, -0.05, 0.1) * dt;
                self.size = (self.size - 0.0005 * dt).max(MIN_GRAIN);
            }
        }
        Outcome::Idle
    }

    fn receive(&mut self, Nibble(amount): Nibble) {
        if self.kind == DwellerKind::Organic {
            self.size = (self.size - amount).max(MIN_GRAIN);
        }
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        let (x, y) = (self.pos.x, self.pos.y);
        let m = self.wetness;
        match self.kind {
            DwellerKind::Sand => {
                let color = Rgba::hex(0x8d6e63).lerp(Rgba::hex(0xa17868), m).with_alpha(0.8);
                out.push(Sprite::rect(x, y, self.size, self.size * 0.8, color).rotated(self.rotation));
            }
            DwellerKind::Organic => {
                let color = Rgba::hex(0x2d1e19).lerp(Rgba::hex(0x2d2819), m).with_alpha(0.9);
                out.push(Sprite::ellipse(x, y, self.size, self.size * 0.8, color).rotated(self.rotation));
            }
            DwellerKind::Clay => {
                let color = Rgba::hex(0x965046).lerp(Rgba::hex(0xb45046), m).with_alpha(0.7);
                out.push(Sprite::circle(x, y, self.size * 0.3, color));
            }
            DwellerKind::Bacterium => {
                let pulse = self.phase.sin() * 0.3 + 0.7;
                let alpha = (80.0 + self.energy.clamp(0.0, 100.0) * 1.4) / 255.0;
                let green = Rgba::hex(0x55e655).lerp(Rgba::hex(0x66ffaa), self.hue);
                out.push(Sprite::circle(x, y, 5.0 * pulse, green.with_alpha(alpha * 0.3 * pulse)).on_layer(3));
                out.push(Sprite::circle(x, y, 2.0, green.with_alpha(alpha)).on_layer(3));
            }
        }
        if self.is_grain() && m > 0.2 {
            out.push(
                Sprite::new(
                    x,
                    y,
                    Shape::Ring {
                        radius: self.size * 0.7,
                        width: m * 2.0 + 1.0,
                    },
                    Rgba::hex(0x40c4ff).with_alpha(m * 0.6),
                )
                .on_layer(1),
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct SoilEnv {
    pub moisture: ScalarField,
    pub root: Root,
    pub fungi: FungalNetwork,
    pub max_bacteria: usize,
    /// Bacteria alive right now, counting splits queued this tick
    pub live_bacteria: usize,
    bounds: Bounds,
}

impl Environment for SoilEnv {
    fn advance(&mut self, _dt: f32, rng: &mut ChaCha8Rng) {
        self.moisture.decay();
        let grown = self.fungi.grow(&self.root, &self.moisture, self.bounds, rng);
        if grown > 0 && self.fungi.len() >= self.fungi.max_nodes {
            tracing::debug!(nodes = self.fungi.len(), "Fungal network reached its limit");
        }
    }
}

pub struct Soil {
    stage: Stage<Dweller>,
    config: SoilConfig,
}

fn anywhere(rng: &mut ChaCha8Rng, b: Bounds) -> Vec2 {
    Vec2::new(rng.gen::<f32>() * b.width, rng.gen::<f32>() * b.height)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nutrients {
    Low,
    Medium,
    High,
}

impl Nutrients {
    #[must_use]
    pub fn from_ratio(organic_ratio: f32) -> Self {
        if organic_ratio > 0.45 {
            Nutrients::High
        } else if organic_ratio > 0.35 {
            Nutrients::Medium
        } else {
            Nutrients::Low
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrients::Low => "Low",
            Nutrients::Medium => "Medium",
            Nutrients::High => "High",
        }
    }
}

impl Soil {
    #[must_use]
    pub fn new(config: &SoilConfig, seed: u64) -> Self {
        let bounds = Bounds::new(config.width, config.height);
        let cols = (config.width / MOISTURE_CELL).ceil() as usize;
        let rows = (config.height / MOISTURE_CELL).ceil() as usize;
        let mut moisture = ScalarField::new(cols, rows, MOISTURE_CELL, config.moisture_decay, 1.0).with_threshold(1e-4);
        moisture.fill(config.initial_moisture);

        let env = SoilEnv {
            moisture,
            root: Root { points: Vec::new() },
            fungi: FungalNetwork::attach(&Root { points: Vec::new() }, config.max_fungal_nodes),
            max_bacteria: config.max_bacteria,
            live_bacteria: 0,
            bounds,
        };
        let grains = (bounds.area() / 2000.0) as usize;
        let capacity = config.max_particles.max(grains) + config.max_bacteria + 8;
        let mut stage: Stage<Dweller> = Stage::new(bounds, env, seed, capacity);

        let (env, rng) = stage.env_and_rng();
        env.root = Root::grow(Vec2::new(bounds.width / 2.0, 0.0), rng);
        env.fungi = FungalNetwork::attach(&env.root, config.max_fungal_nodes);

        stage.populate(grains, |rng, b| Dweller::grain(anywhere(rng, b), rng));
        stage.populate(config.bacteria, |rng, b| Dweller::bacterium(anywhere(rng, b), rng));
        tracing::debug!(grains, bacteria = config.bacteria, "Soil seeded");

        Self {
            stage,
            config: config.clone(),
        }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Dweller> {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage<Dweller> {
        &mut self.stage
    }

    #[must_use]
    pub fn env(&self) -> &SoilEnv {
        self.stage.env()
    }

    #[must_use]
    pub fn count(&self, kind: DwellerKind) -> usize {
        self.stage.count(kind)
    }

    #[must_use]
    pub fn grains(&self) -> usize {
        self.stage.count_where(Dweller::is_grain)
    }

    pub fn water(&mut self, at: Vec2) {
        self.stage.env_mut().moisture.deposit_radius(at.x, at.y, 60.0, 0.1);
    }

    /// Drops two organic grains near `at`, evicting the oldest grains past
    /// the particle cap.
    pub fn add_organic(&mut self, at: Vec2) {
        for _ in 0..2 {
            let rng = self.stage.rng_mut();
            let pos = at + Vec2::new(jitter(rng, 40.0), jitter(rng, 40.0));
            let grain = Dweller::organic(pos, rng);
            if self.stage.spawn(grain).is_none() {
                tracing::debug!(capacity = self.stage.capacity(), "Soil full, organic grain dropped");
            }
        }
        let excess = self.grains().saturating_sub(self.config.max_particles);
        if excess > 0 {
            let mut oldest = Vec::with_capacity(excess);
            self.stage.for_each(|entity, d| {
                if d.is_grain() && oldest.len() < excess {
                    oldest.push(entity);
                }
            });
            for entity in oldest {
                self.stage.despawn(entity);
            }
        }
    }

    #[must_use]
    pub fn nutrients(&self) -> Nutrients {
        let grains = self.grains();
        if grains == 0 {
            return Nutrients::Low;
        }
        Nutrients::from_ratio(self.count(DwellerKind::Organic) as f32 / grains as f32)
    }

    /// Mean moisture over the field, in percent.
    #[must_use]
    pub fn moisture_percent(&self) -> f32 {
        self.env().moisture.mean() * 100.0
    }
}

impl Simulation for Soil {
    fn id(&self) -> SimulationId {
        SimulationId::SoilRhizosphere
    }

    fn step(&mut self, dt: f32) -> TickReport {
        let bacteria = self.count(DwellerKind::Bacterium);
        self.stage.env_mut().live_bacteria = bacteria;
        self.stage.step(frames(dt))
    }

    fn frame(&self) -> Frame {
        let b = self.stage.bounds();
        let env = self.stage.env();
        let mut frame = Frame::flat(self.stage.tick(), b.width, b.height, Rgba::hex(0x2d1e14));

        let top = Rgba::hex(0x2d1e14);
        let sub = Rgba::hex(0x3c2d1e);
        let rock = Rgba::hex(0x1e1919);
        let bands = 12;
        let band = b.height / bands as f32;
        for i in 0..bands {
            let t = i as f32 / (bands - 1) as f32;
            let color = if t < 0.4 {
                top.lerp(sub, t / 0.4)
            } else {
                sub.lerp(rock, (t - 0.4) / 0.6)
            };
            frame
                .sprites
                .push(Sprite::rect(b.width / 2.0, band * (i as f32 + 0.5), b.width, band + 1.0, color).on_layer(-3));
        }

        let thread = Rgba::hex(0xeeeeee).with_alpha(0.47);
        for node in &env.fungi.nodes {
            match node.parent.and_then(|i| env.fungi.nodes.get(i)) {
                Some(parent) => {
                    let d = node.pos - parent.pos;
                    frame
                        .sprites
                        .push(Sprite::line(parent.pos.x, parent.pos.y, d.x, d.y, 0.8, thread).on_layer(2));
                }
                None => frame
                    .sprites
                    .push(Sprite::circle(node.pos.x, node.pos.y, 1.5, Rgba::WHITE.with_alpha(0.3)).on_layer(2)),
            }
        }

        let bark = Rgba::hex(0x8d6e63);
        for (i, pair) in env.root.points.windows(2).enumerate() {
            let d = pair[1] - pair[0];
            let width = env.root.thickness(i) * 2.0;
            frame
                .sprites
                .push(Sprite::line(pair[0].x, pair[0].y, d.x, d.y, width, bark).on_layer(2));
        }

        frame.sprites.extend(self.stage.sprites());
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Tool { tool: Tool::Water, x, y } => self.water(Vec2::new(x, y)),
            Interaction::Tool {
                tool: Tool::Organic,
                x,
                y,
            } => self.add_organic(Vec2::new(x, y)),
            Interaction::Tool { tool: Tool::Observe, .. } => {}
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        Census::new()
            .with("Bacteria", self.count(DwellerKind::Bacterium) as f64)
            .with("Fungal nodes", self.env().fungi.len() as f64)
            .with("Moisture", f64::from(self.moisture_percent()))
            .with("Organic", self.count(DwellerKind::Organic) as f64)
            .with("Particles", self.grains() as f64)
            .with_status(self.nutrients().as_str())
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
    use rand::SeedableRng;

    fn bare() -> Soil {
        let config = SoilConfig {
            width: 200.0,
            height: 200.0,
            bacteria: 0,
            ..Default::default()
        };
        let mut soil = Soil::new(&config, 4);
        let everyone: Vec<_> = {
            let mut v = Vec::new();
            soil.stage().for_each(|e, _| v.push(e));
            v
        };
        for e in everyone {
            soil.stage_mut().despawn(e);
        }
        soil
    }

    #[test]
    fn test_default_soil() {
        let soil = Soil::new(&SoilConfig::default(), 1);
        assert_eq!(soil.grains(), 240);
        assert_eq!(soil.count(DwellerKind::Bacterium), 100);
        assert_eq!(soil.env().root.points.len(), 31);
        assert_eq!(soil.env().fungi.len(), 26);
    }

    #[test]
    fn test_bacterium_grazes_organic_grain() {
        let mut soil = bare();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut grain = Dweller::organic(Vec2::new(100.0, 100.0), &mut rng);
        grain.size = 2.05;
        soil.stage_mut().spawn(grain);
        let mut b = Dweller::bacterium(Vec2::new(103.0, 100.0), &mut rng);
        b.vel = Vec2::ZERO;
        b.energy = 10.0;
        soil.stage_mut().spawn(b);

        soil.step(1.0 / 60.0);
        let mut energy = 0.0;
        soil.stage().for_each(|_, d| {
            if d.kind == DwellerKind::Bacterium {
                energy = d.energy;
            }
        });
        assert!(energy > 14.0);

        let report = soil.step(1.0 / 60.0);
        assert_eq!(report.expired, 1);
        assert_eq!(soil.count(DwellerKind::Organic), 0);
    }

    #[test]
    fn test_bacterium_splits_and_starves() {
        let mut soil = bare();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut rich = Dweller::bacterium(Vec2::new(50.0, 50.0), &mut rng);
        rich.energy = 200.0;
        let mut poor = Dweller::bacterium(Vec2::new(150.0, 150.0), &mut rng);
        poor.energy = 0.01;
        soil.stage_mut().spawn(rich);
        soil.stage_mut().spawn(poor);

        let report = soil.step(1.0 / 60.0);
        assert_eq!(report.spawned, 1);
        assert_eq!(report.expired, 1);
        assert_eq!(soil.count(DwellerKind::Bacterium), 2);
    }

    #[test]
    fn test_bacteria_cap_holds_under_simultaneous_splits() {
        let config = SoilConfig {
            width: 200.0,
            height: 200.0,
            bacteria: 0,
            max_bacteria: 10,
            ..Default::default()
        };
        let mut soil = Soil::new(&config, 5);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for i in 0..9 {
            let mut b = Dweller::bacterium(Vec2::new(20.0 * i as f32 + 10.0, 100.0), &mut rng);
            b.energy = 200.0;
            soil.stage_mut().spawn(b);
        }

        let report = soil.step(1.0 / 60.0);
        assert_eq!(report.spawned, 1);
        assert_eq!(soil.count(DwellerKind::Bacterium), 10);

        soil.step(1.0 / 60.0);
        assert!(soil.count(DwellerKind::Bacterium) <= 10);
    }

    #[test]
    fn test_water_and_organic_tools() {
        let mut soil = Soil::new(&SoilConfig::default(), 2);
        let before = soil.moisture_percent();
        soil.apply(&Interaction::Tool {
            tool: Tool::Water,
            x: 400.0,
            y: 300.0,
        })
        .unwrap();
        assert!(soil.moisture_percent() > before);

        let organic = soil.count(DwellerKind::Organic);
        soil.apply(&Interaction::Tool {
            tool: Tool::Organic,
            x: 400.0,
            y: 300.0,
        })
        .unwrap();
        assert_eq!(soil.count(DwellerKind::Organic), organic + 2);
        assert!(soil.apply(&Interaction::Hold { active: true }).is_err());
    }

    #[test]
    fn test_particle_cap_evicts_oldest() {
        let config = SoilConfig {
            max_particles: 240,
            ..Default::default()
        };
        let mut soil = Soil::new(&config, 3);
        soil.add_organic(Vec2::new(10.0, 10.0));
        assert_eq!(soil.grains(), 240);
    }

    #[test]
    fn test_nutrient_levels() {
        assert_eq!(Nutrients::from_ratio(0.5), Nutrients::High);
        assert_eq!(Nutrients::from_ratio(0.4), Nutrients::Medium);
        assert_eq!(Nutrients::from_ratio(0.2), Nutrients::Low);
    }
}
