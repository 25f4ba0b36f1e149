//! A school of fish in a spherical tank, with sinking food flakes and
//! bubble columns rising from three air stones.
//!
//! Tank coordinates are centered, y up. Tools take world coordinates: feed
//! uses `(x, z)` on the water surface, scare uses `(x, y)` in the `z = 0`
//! plane.

use crate::config::AquariumConfig;
use crate::error::{Result, SimError};
use crate::simulation::{frames, Simulation, SimulationId};
use crate::stage::{Agent, Environment, Outcome, PeerOf, Stage, Tick, TickReport};
use crate::steering::{integrate, nearest, seek, Flocking};
use crate::sims::{angle, between, jitter};
use glam::Vec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vivarium_data::{Bounds, Census, Frame, Interaction, Knob, Projection, Rgba, Sprite, Tool};

const AIR_STONES: [(f32, f32); 3] = [(-8.0, -5.0), (6.0, 3.0), (-3.0, 8.0)];
const PALETTE: [u32; 8] = [0x00d5ff, 0x1466cc, 0xff8c1a, 0xf21d1d, 0xfff01a, 0xeb8fd6, 0x14b89a, 0x9933e6];
const FLAKE_COLORS: [u32; 5] = [0xffa07a, 0xffd700, 0xff6347, 0x98fb98, 0xd2691e];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denizen {
    Fish,
    Flake,
    Bubble,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Body {
    Fish { scale: f32, color: Rgba, wiggle: f32 },
    Flake { flutter: f32, color: Rgba },
    Bubble { source: Vec3, speed: f32, wobble: f32, amount: f32, radius: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Swimmer {
    pub pos: Vec3,
    pub vel: Vec3,
    phase: f32,
    pub body: Body,
}

impl Swimmer {
    pub fn fish(radius: f32, max_speed: f32, rng: &mut ChaCha8Rng) -> Self {
        let pos = Vec3::new(jitter(rng, radius), jitter(rng, radius), jitter(rng, radius));
        let dir = Vec3::new(jitter(rng, 1.0), jitter(rng, 1.0), jitter(rng, 1.0)).normalize_or_zero();
        let color = Rgba::hex(PALETTE[rng.gen_range(0..PALETTE.len())]);
        Self {
            pos,
            vel: dir * max_speed,
            phase: angle(rng),
            body: Body::Fish {
                scale: between(rng, 0.7, 1.3),
                color,
                wiggle: between(rng, 8.0, 12.0),
            },
        }
    }

    pub fn flake(x: f32, y: f32, z: f32, rng: &mut ChaCha8Rng) -> Self {
        Self {
            pos: Vec3::new(x, y, z),
            vel: Vec3::new(0.0, -0.03, 0.0),
            phase: rng.gen::<f32>() * 100.0,
            body: Body::Flake {
                flutter: between(rng, 2.0, 5.0),
                color: Rgba::hex(FLAKE_COLORS[rng.gen_range(0..FLAKE_COLORS.len())]),
            },
        }
    }

    pub fn bubble(stone: (f32, f32), floor: f32, rng: &mut ChaCha8Rng) -> Self {
        let source = Vec3::new(stone.0, floor, stone.1);
        Self {
            pos: Vec3::new(source.x + jitter(rng, 2.0), floor + rng.gen::<f32>() * 5.0, source.z + jitter(rng, 2.0)),
            vel: Vec3::ZERO,
            phase: angle(rng),
            body: Body::Bubble {
                source,
                speed: between(rng, 0.02, 0.05),
                wobble: between(rng, 2.0, 4.0),
                amount: between(rng, 0.02, 0.04),
                radius: between(rng, 0.05, 0.2),
            },
        }
    }

    fn swim(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>]) -> Outcome {
        let tank = &*ctx.env;
        let rules = tank.flocking;
        let neighbours = peers
            .iter()
            .filter(|p| p.kind == Denizen::Fish && p.entity != ctx.me)
            .map(|p| (p.position, p.velocity));
        let mut acc = rules.steer(self.pos, self.vel, neighbours);

        let mut eaten = None;
        if let Some((flake, d)) = nearest(peers, self.pos, 10.0, |p| p.kind == Denizen::Flake && ctx.is_live(p)) {
            acc += seek(self.pos, self.vel, flake.position, rules.max_speed, rules.max_force * 4.0);
            if d < 0.5 {
                eaten = Some(flake.entity);
            }
        }

        if let Some((point, _)) = tank.scare {
            let d = self.pos.distance(point);
            if d < tank.scare_radius {
                let away = (self.pos - point).normalize_or_zero();
                acc += away * (1.0 - d / tank.scare_radius) * tank.scare_strength;
            }
        }

        if self.pos.length() > tank.radius {
            acc += seek(self.pos, self.vel, Vec3::ZERO, rules.max_speed, rules.max_force * 2.0);
        }

        integrate(&mut self.vel, acc, rules.max_speed);
        self.pos += self.vel * ctx.dt;
        self.phase += ctx.dt / 60.0;

        match eaten {
            Some(flake) => Outcome::Consumed(flake),
            None => Outcome::Idle,
        }
    }
}

impl Agent for Swimmer {
    type Kind = Denizen;
    type Vector = Vec3;
    type Env = Tank;
    type Effect = ();

    fn kind(&self) -> Denizen {
        match self.body {
            Body::Fish { .. } => Denizen::Fish,
            Body::Flake { .. } => Denizen::Flake,
            Body::Bubble { .. } => Denizen::Bubble,
        }
    }

    fn position(&self) -> Vec3 {
        self.pos
    }

    fn velocity(&self) -> Vec3 {
        self.vel
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>]) -> Outcome {
        let dt = ctx.dt;
        let t = ctx.env.time;
        let r = ctx.env.radius;
        match self.body {
            Body::Fish { .. } => self.swim(ctx, peers),
            Body::Flake { .. } => {
                self.pos.y -= 0.03 * dt;
                self.pos.x += (t * 2.0 + self.phase).sin() * 0.005 * dt;
                self.pos.z += (t * 1.5 + self.phase).cos() * 0.005 * dt;
                if self.pos.y < -r {
                    Outcome::Expired
                } else {
                    Outcome::Idle
                }
            }
            Body::Bubble {
                source,
                speed,
                wobble,
                amount,
                ..
            } => {
                self.pos.y += speed * dt;
                self.pos.x = source.x + (t * wobble + self.phase).sin() * amount * 10.0;
                self.pos.z = source.z + (t * wobble * 0.7 + self.phase).cos() * amount * 10.0;
                if self.pos.y > r - 1.0 {
                    self.pos.y = -r + ctx.rng.gen::<f32>() * 3.0;
                }
                Outcome::Idle
            }
        }
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        let Vec3 { x, y, z } = self.pos;
        match self.body {
            Body::Fish { scale, color, wiggle } => {
                let heading = self.vel.y.atan2(self.vel.x);
                let tail = (self.phase * wiggle).sin() * 0.5;
                out.push(
                    Sprite::ellipse(x, y, 0.3 * scale, 0.12 * scale, color)
                        .rotated(heading)
                        .at_depth(z),
                );
                let back = -0.3 * scale;
                let (dx, dy) = ((heading + tail).cos() * back, (heading + tail).sin() * back);
                out.push(Sprite::line(x, y, dx, dy, 0.1 * scale, color.with_alpha(0.9)).at_depth(z));
            }
            Body::Flake { color, .. } => {
                out.push(Sprite::circle(x, y, 0.2, color).at_depth(z));
            }
            Body::Bubble { radius, .. } => {
                out.push(Sprite::circle(x, y, radius, Rgba::WHITE.with_alpha(0.4)).at_depth(z));
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tank {
    pub flocking: Flocking,
    pub radius: f32,
    /// Point and remaining seconds of the last glass tap
    pub scare: Option<(Vec3, f32)>,
    pub scare_radius: f32,
    pub scare_strength: f32,
    /// Seconds since the tank was filled
    pub time: f32,
}

impl Environment for Tank {
    fn advance(&mut self, dt: f32, _rng: &mut ChaCha8Rng) {
        let seconds = dt / 60.0;
        self.time += seconds;
        if let Some((_, left)) = &mut self.scare {
            *left -= seconds;
        }
        if matches!(self.scare, Some((_, left)) if left <= 0.0) {
            self.scare = None;
        }
    }
}

pub struct Aquarium {
    stage: Stage<Swimmer>,
    config: AquariumConfig,
    eaten: u64,
}

impl Aquarium {
    #[must_use]
    pub fn new(config: &AquariumConfig, seed: u64) -> Self {
        let r = config.boundary_radius;
        let tank = Tank {
            flocking: Flocking {
                perception: config.perception_radius,
                max_speed: config.max_speed,
                max_force: config.max_force,
                alignment: config.alignment,
                cohesion: config.cohesion,
                separation: config.separation,
            },
            radius: r,
            scare: None,
            scare_radius: config.scare_radius,
            scare_strength: config.scare_strength,
            time: 0.0,
        };
        let capacity = config.boids + config.bubbles + 2000;
        let mut stage = Stage::new(Bounds::new(r * 2.0, r * 2.0), tank, seed, capacity);
        stage.populate(config.boids, |rng, _| Swimmer::fish(r, config.max_speed, rng));
        let mut stones = AIR_STONES.iter().cycle();
        stage.populate(config.bubbles, |rng, _| {
            let stone = stones.next().copied().unwrap_or((0.0, 0.0));
            Swimmer::bubble(stone, -r, rng)
        });
        tracing::debug!(fish = config.boids, bubbles = config.bubbles, "Tank filled");
        Self {
            stage,
            config: config.clone(),
            eaten: 0,
        }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Swimmer> {
        &self.stage
    }

    #[must_use]
    pub fn tank(&self) -> &Tank {
        self.stage.env()
    }

    #[must_use]
    pub fn count(&self, kind: Denizen) -> usize {
        self.stage.count(kind)
    }

    /// Scatters flakes on the surface around `(x, z)`; more fish get more
    /// food. Returns the number dropped.
    pub fn feed(&mut self, x: f32, z: f32) -> usize {
        let r = self.config.boundary_radius;
        let count = (self.config.boids.div_ceil(8)).max(5);
        let mut dropped = 0;
        for _ in 0..count {
            let rng = self.stage.rng_mut();
            let a = angle(rng);
            let d = rng.gen::<f32>() * 4.0;
            let fx = (x + a.cos() * d).clamp(-r + 1.0, r - 1.0);
            let fz = (z + a.sin() * d).clamp(-r + 1.0, r - 1.0);
            let flake = Swimmer::flake(fx, r, fz, rng);
            if self.stage.spawn(flake).is_some() {
                dropped += 1;
            }
        }
        dropped
    }

    pub fn scare(&mut self, at: Vec3) {
        let seconds = self.config.scare_seconds;
        self.stage.env_mut().scare = Some((at, seconds));
    }

    #[must_use]
    pub fn mean_speed(&self) -> f32 {
        let mut total = 0.0;
        let mut n = 0;
        self.stage.for_each(|_, s| {
            if matches!(s.body, Body::Fish { .. }) {
                total += s.vel.length();
                n += 1;
            }
        });
        if n == 0 {
            0.0
        } else {
            total / n as f32
        }
    }
}

impl Simulation for Aquarium {
    fn id(&self) -> SimulationId {
        SimulationId::Aquarium
    }

    fn step(&mut self, dt: f32) -> TickReport {
        let report = self.stage.step(frames(dt));
        self.eaten += report.consumed as u64;
        report
    }

    fn frame(&self) -> Frame {
        let r = self.config.boundary_radius;
        let mut frame = Frame {
            tick: self.stage.tick(),
            width: r * 2.0,
            height: r * 2.0,
            background: Rgba::hex(0x0a1628),
            projection: Projection::Perspective {
                eye_height: 5.0,
                distance: 25.0,
                focal: 1.0 / (30.0_f32.to_radians()).tan(),
            },
            sprites: Vec::new(),
        };
        frame
            .sprites
            .push(Sprite::rect(0.0, -r + 0.1, r * 2.0, 0.4, Rgba::hex(0xc2b280)).at_depth(-r).on_layer(-1));
        for (sx, sz) in AIR_STONES {
            frame
                .sprites
                .push(Sprite::circle(sx, -r + 0.2, 0.4, Rgba::hex(0x555555)).at_depth(sz).on_layer(-1));
        }
        frame.sprites.extend(self.stage.sprites());
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Tool { tool: Tool::Feed, x, y } => {
                let dropped = self.feed(x, y);
                tracing::debug!(dropped, "Flakes dropped");
            }
            Interaction::Tool { tool: Tool::Scare, x, y } => self.scare(Vec3::new(x, y, 0.0)),
            Interaction::Knob { knob: Knob::Speed, value } => {
                self.stage.env_mut().flocking.max_speed = value.clamp(0.1, 1.0);
            }
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        let status = if self.tank().scare.is_some() { "Startled" } else { "Calm" };
        Census::new()
            .with("Fish", self.count(Denizen::Fish) as f64)
            .with("Food", self.count(Denizen::Flake) as f64)
            .with("Bubbles", self.count(Denizen::Bubble) as f64)
            .with("Eaten", self.eaten as f64)
            .with("Mean speed", f64::from(self.mean_speed()))
            .with_status(status)
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

    #[test]
    fn test_tank_contents() {
        let tank = Aquarium::new(&AquariumConfig::default(), 1);
        assert_eq!(tank.count(Denizen::Fish), 150);
        assert_eq!(tank.count(Denizen::Bubble), 50);
        assert_eq!(tank.census().status.as_deref(), Some("Calm"));
    }

    #[test]
    fn test_speed_never_exceeds_limit() {
        let mut tank = Aquarium::new(&AquariumConfig::default(), 2);
        for _ in 0..50 {
            tank.step(1.0 / 60.0);
        }
        tank.stage().for_each(|_, s| {
            if matches!(s.body, Body::Fish { .. }) {
                assert!(s.vel.length() <= 0.2 + 1e-5);
            }
        });
    }

    #[test]
    fn test_feeding_drops_flakes_that_sink_or_get_eaten() {
        let mut tank = Aquarium::new(&AquariumConfig::default(), 3);
        assert_eq!(tank.feed(0.0, 0.0), 19);
        assert_eq!(tank.count(Denizen::Flake), 19);
        tank.stage().for_each(|_, s| {
            if matches!(s.body, Body::Flake { .. }) {
                assert_eq!(s.pos.y, 15.0);
                assert!(s.pos.x.abs() <= 14.0 && s.pos.z.abs() <= 14.0);
            }
        });
        for _ in 0..1200 {
            tank.step(1.0 / 60.0);
        }
        assert_eq!(tank.count(Denizen::Flake), 0);
        assert_eq!(tank.count(Denizen::Fish), 150);
    }

    #[test]
    fn test_scare_expires() {
        let mut tank = Aquarium::new(&AquariumConfig::default(), 4);
        tank.apply(&Interaction::Tool {
            tool: Tool::Scare,
            x: 0.0,
            y: 0.0,
        })
        .unwrap();
        assert_eq!(tank.census().status.as_deref(), Some("Startled"));
        for _ in 0..130 {
            tank.step(1.0 / 60.0);
        }
        assert!(tank.tank().scare.is_none());
    }

    #[test]
    fn test_speed_knob_is_clamped() {
        let mut tank = Aquarium::new(&AquariumConfig::default(), 5);
        tank.apply(&Interaction::Knob {
            knob: Knob::Speed,
            value: 9.0,
        })
        .unwrap();
        assert_eq!(tank.tank().flocking.max_speed, 1.0);
        assert!(tank.apply(&Interaction::Hold { active: true }).is_err());
    }
}
