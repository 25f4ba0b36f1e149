//! Flying through a tunnel of stars, with the occasional galaxy drifting
//! past. Holding the pointer engages warp.

use crate::config::StarfieldConfig;
use crate::error::{Result, SimError};
use crate::simulation::{seconds, Simulation, SimulationId};
use crate::stage::{Agent, Environment, Outcome, PeerOf, Stage, Tick, TickReport};
use crate::sims::{angle, between, chance, jitter};
use glam::Vec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::PI;
use vivarium_data::{Bounds, Census, Frame, Interaction, Knob, Projection, Rgba, Sprite};

const WRAP_Z: f32 = 10.0;
const GALAXY_START_Z: f32 = -500.0;
const GALAXY_END_Z: f32 = 50.0;
const WARP_MULTIPLIER: f32 = 8.0;
const TINT: Rgba = Rgba { r: 102, g: 153, b: 255, a: 1.0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Object {
    Star,
    Galaxy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalaxyShape {
    Spiral,
    Cloud,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Galaxy {
    pub shape: GalaxyShape,
    /// Particle offsets from the galaxy center with their brightness.
    pub particles: Vec<(Vec3, f32)>,
    pub color: Rgba,
    pub spin: f32,
    tilt: (f32, f32),
}

impl Galaxy {
    fn generate(rng: &mut ChaCha8Rng) -> Self {
        let shape = if rng.gen_bool(0.5) { GalaxyShape::Spiral } else { GalaxyShape::Cloud };
        let n = match shape {
            GalaxyShape::Spiral => 1000,
            GalaxyShape::Cloud => 500,
        };
        let mut particles = Vec::with_capacity(n);
        for i in 0..n {
            let offset = match shape {
                GalaxyShape::Spiral => {
                    let (a, r) = (i as f32 * 0.1, i as f32 * 0.02);
                    Vec3::new(a.cos() * r + jitter(rng, 1.0), jitter(rng, 2.0), a.sin() * r + jitter(rng, 1.0))
                }
                GalaxyShape::Cloud => {
                    let r = rng.gen::<f32>() * 10.0;
                    let theta = angle(rng);
                    let phi = rng.gen::<f32>() * PI;
                    Vec3::new(r * phi.sin() * theta.cos(), r * phi.sin() * theta.sin(), r * phi.cos())
                }
            };
            particles.push((offset, between(rng, 0.5, 1.0)));
        }
        let base = Rgba {
            r: rng.gen(),
            g: rng.gen(),
            b: rng.gen(),
            a: 1.0,
        };
        Self {
            shape,
            particles,
            color: base.lerp(TINT, 0.5),
            spin: 0.0,
            tilt: (rng.gen::<f32>() * PI, rng.gen::<f32>() * PI),
        }
    }

    /// Offset rotated by the galaxy's tilt and current spin.
    fn orient(&self, v: Vec3) -> Vec3 {
        let (sy, cy) = self.spin.sin_cos();
        let v = Vec3::new(v.x * cy + v.z * sy, v.y, -v.x * sy + v.z * cy);
        let (sx, cx) = self.tilt.0.sin_cos();
        let v = Vec3::new(v.x, v.y * cx - v.z * sx, v.y * sx + v.z * cx);
        let (sz, cz) = self.tilt.1.sin_cos();
        Vec3::new(v.x * cz - v.y * sz, v.x * sz + v.y * cz, v.z)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Star,
    Galaxy(Box<Galaxy>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mote {
    pub pos: Vec3,
    pub body: Body,
}

impl Mote {
    fn star(config: &StarfieldConfig, rng: &mut ChaCha8Rng) -> Self {
        let r = config.tunnel_radius + rng.gen::<f32>() * 200.0;
        let theta = angle(rng);
        Self {
            pos: Vec3::new(r * theta.cos(), r * theta.sin(), jitter(rng, config.tunnel_length)),
            body: Body::Star,
        }
    }

    fn galaxy(rng: &mut ChaCha8Rng) -> Self {
        Self {
            pos: Vec3::new(jitter(rng, 60.0), jitter(rng, 60.0), GALAXY_START_Z),
            body: Body::Galaxy(Box::new(Galaxy::generate(rng))),
        }
    }
}

impl Agent for Mote {
    type Kind = Object;
    type Vector = Vec3;
    type Env = Flight;
    type Effect = ();

    fn kind(&self) -> Object {
        match self.body {
            Body::Star => Object::Star,
            Body::Galaxy(_) => Object::Galaxy,
        }
    }

    fn position(&self) -> Vec3 {
        self.pos
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, _peers: &[PeerOf<Self>]) -> Outcome {
        let flight = &*ctx.env;
        match &mut self.body {
            Body::Star => {
                self.pos.z += flight.speed * 0.5;
                if self.pos.z > WRAP_Z {
                    self.pos.z -= flight.tunnel_length;
                }
                Outcome::Idle
            }
            Body::Galaxy(galaxy) => {
                self.pos.z += flight.speed;
                galaxy.spin += 0.001;
                if self.pos.z > GALAXY_END_Z {
                    Outcome::Expired
                } else {
                    Outcome::Idle
                }
            }
        }
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        match &self.body {
            Body::Star => out.push(Sprite::circle(self.pos.x, self.pos.y, 0.1, Rgba::WHITE.with_alpha(0.8)).at_depth(self.pos.z)),
            Body::Galaxy(galaxy) => {
                for &(offset, brightness) in &galaxy.particles {
                    let p = self.pos + galaxy.orient(offset);
                    let color = galaxy.color.lerp(Rgba::BLACK, 1.0 - brightness);
                    out.push(Sprite::circle(p.x, p.y, 0.2, color.with_alpha(0.7)).at_depth(p.z).on_layer(1));
                }
            }
        }
    }
}

/// Ship state shared by every mote.
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    pub warp_speed: f32,
    pub multiplier: f32,
    pub target: f32,
    /// Distance covered by a galaxy this tick.
    pub speed: f32,
    pub tunnel_length: f32,
}

impl Flight {
    #[must_use]
    pub fn warping(&self) -> bool {
        self.target > 1.0
    }
}

impl Environment for Flight {
    fn advance(&mut self, dt: f32, _rng: &mut ChaCha8Rng) {
        self.multiplier += (self.target - self.multiplier) * 5.0 * dt;
        self.speed = self.warp_speed * 200.0 * dt * self.multiplier;
    }
}

pub struct Starfield {
    stage: Stage<Mote>,
    galaxy_frequency: f32,
    galaxies_seen: u64,
}

impl Starfield {
    #[must_use]
    pub fn new(config: &StarfieldConfig, seed: u64) -> Self {
        let flight = Flight {
            warp_speed: config.warp_speed,
            multiplier: 1.0,
            target: 1.0,
            speed: 0.0,
            tunnel_length: config.tunnel_length,
        };
        let extent = (config.tunnel_radius + 200.0) * 2.0;
        let mut stage = Stage::new(Bounds::new(extent, extent), flight, seed, config.stars + 64);
        stage.populate(config.stars, |rng, _| Mote::star(config, rng));
        tracing::debug!(stars = config.stars, "Starfield generated");
        Self {
            stage,
            galaxy_frequency: config.galaxy_frequency,
            galaxies_seen: 0,
        }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Mote> {
        &self.stage
    }

    #[must_use]
    pub fn flight(&self) -> &Flight {
        self.stage.env()
    }

    pub fn hold(&mut self, active: bool) {
        self.stage.env_mut().target = if active { WARP_MULTIPLIER } else { 1.0 };
    }

    pub fn spawn_galaxy(&mut self) -> bool {
        let galaxy = Mote::galaxy(self.stage.rng_mut());
        let spawned = self.stage.spawn(galaxy).is_some();
        if spawned {
            self.galaxies_seen += 1;
            tracing::debug!(total = self.galaxies_seen, "Galaxy ahead");
        }
        spawned
    }
}

impl Simulation for Starfield {
    fn id(&self) -> SimulationId {
        SimulationId::Space
    }

    fn step(&mut self, dt: f32) -> TickReport {
        let mut report = self.stage.step(seconds(dt));
        if chance(self.stage.rng_mut(), self.galaxy_frequency) && self.spawn_galaxy() {
            report.spawned += 1;
        }
        report
    }

    fn frame(&self) -> Frame {
        let b = self.stage.bounds();
        let mut frame = Frame {
            tick: self.stage.tick(),
            width: b.width,
            height: b.height,
            background: Rgba::BLACK,
            projection: Projection::Perspective {
                eye_height: 0.0,
                distance: 0.0,
                focal: 1.0 / 30.0_f32.to_radians().tan(),
            },
            sprites: self.stage.sprites(),
        };
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Hold { active } => self.hold(active),
            Interaction::Knob {
                knob: Knob::WarpSpeed,
                value,
            } => self.stage.env_mut().warp_speed = value.clamp(0.1, 10.0),
            Interaction::Knob {
                knob: Knob::GalaxyFrequency,
                value,
            } => self.galaxy_frequency = value.clamp(0.001, 0.05),
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        let flight = self.flight();
        Census::new()
            .with("Stars", self.stage.count(Object::Star) as f64)
            .with("Galaxies", self.stage.count(Object::Galaxy) as f64)
            .with("Galaxies passed", self.galaxies_seen as f64)
            .with("Warp", f64::from(flight.warp_speed))
            .with("Multiplier", f64::from(flight.multiplier))
            .with_status(if flight.warping() { "Warp engaged" } else { "Cruising" })
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

    fn small() -> StarfieldConfig {
        StarfieldConfig {
            stars: 300,
            ..Default::default()
        }
    }

    #[test]
    fn test_stars_fill_the_tunnel() {
        let field = Starfield::new(&StarfieldConfig::default(), 1);
        assert_eq!(field.stage().count(Object::Star), 5000);
        field.stage().for_each(|_, m| {
            let r = (m.pos.x * m.pos.x + m.pos.y * m.pos.y).sqrt();
            assert!((50.0 - 1e-3..=250.0 + 1e-3).contains(&r));
            assert!(m.pos.z.abs() <= 500.0);
        });
    }

    #[test]
    fn test_stars_wrap_behind_the_camera() {
        let mut field = Starfield::new(&small(), 2);
        field.hold(true);
        for _ in 0..600 {
            field.step(1.0 / 60.0);
        }
        assert_eq!(field.stage().count(Object::Star), 300);
        field.stage().for_each(|_, m| {
            if m.body == Body::Star {
                assert!(m.pos.z <= WRAP_Z);
                assert!(m.pos.z > WRAP_Z - 1000.0 - 50.0);
            }
        });
    }

    #[test]
    fn test_warp_eases_toward_target() {
        let mut field = Starfield::new(&small(), 3);
        field.apply(&Interaction::Hold { active: true }).unwrap();
        field.step(1.0 / 60.0);
        let m = field.flight().multiplier;
        assert!(m > 1.0 && m < 8.0);
        for _ in 0..300 {
            field.step(1.0 / 60.0);
        }
        assert!((field.flight().multiplier - 8.0).abs() < 0.1);
        assert_eq!(field.census().status.as_deref(), Some("Warp engaged"));

        field.apply(&Interaction::Hold { active: false }).unwrap();
        for _ in 0..300 {
            field.step(1.0 / 60.0);
        }
        assert!((field.flight().multiplier - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_galaxies_pass_and_are_removed() {
        let mut field = Starfield::new(&small(), 4);
        assert!(field.spawn_galaxy());
        assert_eq!(field.stage().count(Object::Galaxy), 1);
        field.galaxy_frequency = 0.0;
        field.apply(&Interaction::Knob {
            knob: Knob::WarpSpeed,
            value: 10.0,
        })
        .unwrap();
        // 10 * 200 / 60 units per frame at rest; 550 units to clear.
        for _ in 0..20 {
            field.step(1.0 / 60.0);
        }
        let report = field.step(1.0 / 60.0);
        assert_eq!(field.stage().count(Object::Galaxy), 0);
        assert!(field.census().get("Galaxies passed").unwrap_or_default() >= 1.0);
        assert!(report.expired <= 1);

        field
            .apply(&Interaction::Knob {
                knob: Knob::GalaxyFrequency,
                value: 1.0,
            })
            .unwrap();
        assert_eq!(field.galaxy_frequency, 0.05);
    }

    #[test]
    fn test_unsupported_tool() {
        let mut field = Starfield::new(&small(), 5);
        assert!(field
            .apply(&Interaction::Knob {
                knob: Knob::Zoom,
                value: 2.0
            })
            .is_err());
    }
}
