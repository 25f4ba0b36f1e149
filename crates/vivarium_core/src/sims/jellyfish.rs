//! Jellyfish bobbing in the deep with trailing tentacles and falling
//! marine snow. A sonar ping pushes nearby jellies away.

use crate::config::JellyfishConfig;
use crate::error::{Result, SimError};
use crate::simulation::{seconds, Simulation, SimulationId};
use crate::stage::{Agent, Environment, Outcome, PeerOf, Stage, Tick, TickReport};
use crate::sims::{angle, between, jitter};
use glam::Vec3;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;
use vivarium_data::{Bounds, Census, Frame, Interaction, Knob, Projection, Rgba, Sprite, Tool};

const TENTACLES: usize = 8;
const TENTACLE_NODES: usize = 15;
const SEGMENT: f32 = 0.3;
const SONAR_RADIUS: f32 = 10.0;
const SNOW_EXTENT: f32 = 20.0;
const GLOW: Rgba = Rgba::hex(0x00ffff);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    Jelly,
    Snow,
}

/// One tentacle as a chain of world-space nodes hanging from the bell rim.
#[derive(Debug, Clone, PartialEq)]
pub struct Tentacle {
    pub anchor: Vec3,
    pub nodes: Vec<Vec3>,
}

impl Tentacle {
    fn hanging(origin: Vec3, index: usize) -> Self {
        let a = index as f32 / TENTACLES as f32 * TAU;
        let anchor = Vec3::new(a.cos() * 0.6, 0.0, a.sin() * 0.6);
        let nodes = (0..TENTACLE_NODES)
            .map(|j| origin + anchor - Vec3::Y * (j as f32 * SEGMENT))
            .collect();
        Self { anchor, nodes }
    }

    /// Pins the head to the bell and lets every other node lag its parent.
    fn follow(&mut self, head: Vec3) {
        self.nodes[0] = head;
        for i in 1..self.nodes.len() {
            let parent = self.nodes[i - 1];
            let node = &mut self.nodes[i];
            let gap = parent - *node;
            let len = gap.length();
            if len > SEGMENT {
                *node += gap / len * (len - SEGMENT) * 0.1;
            }
            node.y -= 0.005;
            node.x += (parent.x - node.x) * 0.05;
            node.z += (parent.z - node.z) * 0.05;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Jelly {
        base_y: f32,
        phase: f32,
        swim_speed: f32,
        impulse: Vec3,
        turn: f32,
        pulse: f32,
        tentacles: Vec<Tentacle>,
    },
    Snow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drifter {
    pub pos: Vec3,
    pub form: Form,
}

impl Drifter {
    pub fn jelly(pos: Vec3, rng: &mut ChaCha8Rng) -> Self {
        Self {
            pos,
            form: Form::Jelly {
                base_y: pos.y,
                phase: angle(rng),
                swim_speed: between(rng, 0.5, 1.0),
                impulse: Vec3::ZERO,
                turn: 0.0,
                pulse: 0.0,
                tentacles: (0..TENTACLES).map(|i| Tentacle::hanging(pos, i)).collect(),
            },
        }
    }

    pub fn snow(rng: &mut ChaCha8Rng) -> Self {
        let e = SNOW_EXTENT * 2.0;
        Self {
            pos: Vec3::new(jitter(rng, e), jitter(rng, e), jitter(rng, e)),
            form: Form::Snow,
        }
    }

    /// Adds a shove scaled by closeness to `origin`. Returns false when the
    /// jelly is out of range or this is a snow flake.
    pub fn ping(&mut self, origin: Vec3) -> bool {
        let Form::Jelly { impulse, .. } = &mut self.form else {
            return false;
        };
        let away = self.pos - origin;
        let d = away.length();
        if d >= SONAR_RADIUS {
            return false;
        }
        *impulse += away.normalize_or_zero() * (SONAR_RADIUS - d) * 0.05;
        true
    }

    #[must_use]
    pub fn impulse(&self) -> Vec3 {
        match &self.form {
            Form::Jelly { impulse, .. } => *impulse,
            Form::Snow => Vec3::ZERO,
        }
    }
}

impl Agent for Drifter {
    type Kind = Drift;
    type Vector = Vec3;
    type Env = Deep;
    type Effect = ();

    fn kind(&self) -> Drift {
        match self.form {
            Form::Jelly { .. } => Drift::Jelly,
            Form::Snow => Drift::Snow,
        }
    }

    fn position(&self) -> Vec3 {
        self.pos
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, _peers: &[PeerOf<Self>]) -> Outcome {
        let deep = &*ctx.env;
        let (t, dt) = (deep.time, ctx.dt * deep.speed);
        match &mut self.form {
            Form::Jelly {
                base_y,
                phase,
                swim_speed,
                impulse,
                turn,
                pulse,
                tentacles,
            } => {
                *phase += dt * *swim_speed;
                *impulse *= 0.9;
                self.pos += *impulse;
                *base_y += impulse.y;
                *pulse = (t * 3.0 + *phase).sin();
                self.pos.y = *base_y + (t * 0.5 + *phase).sin() * 1.5;
                *turn = (t * 0.2 + *phase).sin() * 0.2;

                let (s, c) = turn.sin_cos();
                for tentacle in tentacles.iter_mut() {
                    let a = tentacle.anchor;
                    let rim = Vec3::new(a.x * c - a.z * s, a.y + *pulse * 0.2, a.x * s + a.z * c);
                    tentacle.follow(self.pos + rim);
                }
            }
            Form::Snow => {
                self.pos.y -= 0.01 * deep.speed;
                if self.pos.y < -SNOW_EXTENT {
                    self.pos.y = SNOW_EXTENT;
                }
            }
        }
        Outcome::Idle
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        let Vec3 { x, y, z } = self.pos;
        match &self.form {
            Form::Jelly { pulse, tentacles, .. } => {
                for tentacle in tentacles {
                    for pair in tentacle.nodes.windows(2) {
                        let d = pair[1] - pair[0];
                        out.push(Sprite::line(pair[0].x, pair[0].y, d.x, d.y, 0.04, GLOW.with_alpha(0.4)).at_depth(pair[0].z));
                    }
                }
                let squeeze = 1.0 + pulse * 0.2;
                out.push(Sprite::ellipse(x, y + 0.3, squeeze, 0.7, GLOW.with_alpha(0.35)).at_depth(z).on_layer(1));
                out.push(Sprite::ellipse(x, y + 0.4, squeeze * 0.7, 0.45, Rgba::WHITE.with_alpha(0.25)).at_depth(z).on_layer(1));
            }
            Form::Snow => out.push(Sprite::circle(x, y, 0.05, Rgba::WHITE.with_alpha(0.6)).at_depth(z)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deep {
    pub time: f32,
    pub speed: f32,
}

impl Environment for Deep {
    fn advance(&mut self, dt: f32, _rng: &mut ChaCha8Rng) {
        self.time += dt * self.speed;
    }
}

pub struct Bloom {
    stage: Stage<Drifter>,
    pings: u64,
}

impl Bloom {
    #[must_use]
    pub fn new(config: &JellyfishConfig, seed: u64) -> Self {
        let deep = Deep {
            time: 0.0,
            speed: config.speed,
        };
        let e = SNOW_EXTENT * 2.0;
        let mut stage = Stage::new(Bounds::new(e, e), deep, seed, config.count + config.snow);
        stage.populate(config.count, |rng, _| {
            let pos = Vec3::new(jitter(rng, 20.0), jitter(rng, 10.0), jitter(rng, 10.0));
            Drifter::jelly(pos, rng)
        });
        stage.populate(config.snow, |rng, _| Drifter::snow(rng));
        Self { stage, pings: 0 }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Drifter> {
        &self.stage
    }

    /// Pushes every jelly within range of `origin`. Returns how many moved.
    pub fn sonar(&mut self, origin: Vec3) -> usize {
        let mut pushed = 0;
        self.stage.for_each_mut(|d, _, _| {
            if d.ping(origin) {
                pushed += 1;
            }
        });
        self.pings += 1;
        pushed
    }

    #[must_use]
    pub fn restless(&self) -> usize {
        self.stage.count_where(|d| d.impulse().length() > 0.01)
    }
}

impl Simulation for Bloom {
    fn id(&self) -> SimulationId {
        SimulationId::Jellyfish
    }

    fn step(&mut self, dt: f32) -> TickReport {
        self.stage.step(seconds(dt))
    }

    fn frame(&self) -> Frame {
        let mut frame = Frame {
            tick: self.stage.tick(),
            width: SNOW_EXTENT * 2.0,
            height: SNOW_EXTENT * 2.0,
            background: Rgba::hex(0x000510),
            projection: Projection::Perspective {
                eye_height: 0.0,
                distance: 15.0,
                focal: 1.0 / 37.5_f32.to_radians().tan(),
            },
            sprites: self.stage.sprites(),
        };
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Tool { tool: Tool::Sonar, x, y } => {
                let pushed = self.sonar(Vec3::new(x, y, 0.0));
                tracing::debug!(pushed, "Sonar ping");
            }
            Interaction::Knob { knob: Knob::Speed, value } => self.stage.env_mut().speed = value.clamp(0.1, 3.0),
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        let restless = self.restless();
        Census::new()
            .with("Jellyfish", self.stage.count(Drift::Jelly) as f64)
            .with("Marine snow", self.stage.count(Drift::Snow) as f64)
            .with("Pushed", restless as f64)
            .with("Pings", self.pings as f64)
            .with("Speed", f64::from(self.stage.env().speed))
            .with_status(if restless > 0 { "Scattering" } else { "Drifting" })
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

    #[test]
    fn test_bloom_contents() {
        let bloom = Bloom::new(&JellyfishConfig::default(), 1);
        let census = bloom.census();
        assert_eq!(census.count("Jellyfish"), 15);
        assert_eq!(census.count("Marine snow"), 2000);
        assert_eq!(census.status.as_deref(), Some("Drifting"));
    }

    #[test]
    fn test_ping_falls_off_with_distance() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut near = Drifter::jelly(Vec3::new(2.0, 0.0, 0.0), &mut rng);
        let mut far = Drifter::jelly(Vec3::new(12.0, 0.0, 0.0), &mut rng);
        assert!(near.ping(Vec3::ZERO));
        assert!(!far.ping(Vec3::ZERO));
        assert!((near.impulse() - Vec3::new(0.4, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(far.impulse(), Vec3::ZERO);
        assert!(!Drifter::snow(&mut rng).ping(Vec3::ZERO));
    }

    #[test]
    fn test_sonar_impulse_decays() {
        let config = JellyfishConfig {
            count: 1,
            snow: 0,
            ..Default::default()
        };
        let mut bloom = Bloom::new(&config, 3);
        let mut at = Vec3::ZERO;
        bloom.stage().for_each(|_, d| at = d.pos);
        bloom
            .apply(&Interaction::Tool {
                tool: Tool::Sonar,
                x: at.x + 1.0,
                y: at.y,
            })
            .unwrap();
        assert_eq!(bloom.restless(), 1);
        assert_eq!(bloom.census().status.as_deref(), Some("Scattering"));
        for _ in 0..120 {
            bloom.step(1.0 / 60.0);
        }
        assert_eq!(bloom.restless(), 0);
        let mut x = 0.0;
        bloom.stage().for_each(|_, d| x = d.pos.x);
        assert!(x < at.x - 0.5);
    }

    #[test]
    fn test_tentacles_hang_below_the_bell() {
        let mut bloom = Bloom::new(&JellyfishConfig::default(), 4);
        for _ in 0..300 {
            bloom.step(1.0 / 60.0);
        }
        bloom.stage().for_each(|_, d| {
            if let Form::Jelly { tentacles, .. } = &d.form {
                for t in tentacles {
                    let tip = t.nodes[TENTACLE_NODES - 1];
                    assert!(tip.y < t.nodes[0].y);
                    for pair in t.nodes.windows(2) {
                        assert!(pair[0].distance(pair[1]) < 1.5);
                    }
                }
            }
        });
    }

    #[test]
    fn test_snow_wraps_and_speed_knob() {
        let mut bloom = Bloom::new(&JellyfishConfig::default(), 5);
        bloom
            .apply(&Interaction::Knob {
                knob: Knob::Speed,
                value: 99.0,
            })
            .unwrap();
        assert_eq!(bloom.stage().env().speed, 3.0);
        for _ in 0..200 {
            bloom.step(1.0 / 60.0);
        }
        bloom.stage().for_each(|_, d| {
            if d.form == Form::Snow {
                assert!(d.pos.y >= -SNOW_EXTENT && d.pos.y <= SNOW_EXTENT);
            }
        });
        assert_eq!(bloom.census().count("Marine snow"), 2000);
    }
}
