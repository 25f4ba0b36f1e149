//! A pine grove through a day/night cycle: butterflies by day, fireflies
//! after dark, and a sparkle burst wherever the ground is tapped.

use crate::config::TreeConfig;
use crate::error::{Result, SimError};
use crate::simulation::{seconds, Simulation, SimulationId};
use crate::stage::{Agent, Environment, Outcome, PeerOf, Stage, Tick, TickReport};
use crate::sims::{angle, between, chance, jitter};
use glam::Vec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::{FRAC_PI_2, TAU};
use vivarium_data::{Bounds, Census, Frame, Interaction, Knob, Projection, Rgba, Shape, Sprite, Tool};

const TREES: usize = 50;
const BURST_SIZE: usize = 50;
const MAX_SPARKS: usize = 500;
const NIGHT_STARS: usize = 2000;
const BUTTERFLY_SPEED: f32 = 2.0;
const SKY: Rgba = Rgba::hex(0x87ceeb);
const SUNSET: Rgba = Rgba::hex(0xfd5e53);
const NIGHT: Rgba = Rgba::hex(0x1a1a40);

/// Terrain height; rolling hills that rise into mountains past radius 25.
#[must_use]
pub fn ground_height(x: f32, z: f32) -> f32 {
    let dist = (x * x + z * z).sqrt();
    let mut y = (x * 0.1).sin() * (z * 0.1).cos() * 1.5;
    y += (x * 0.5 + z * 0.3).sin() * 0.2;
    y + ((dist - 25.0).max(0.0) * 0.15).powi(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPhase {
    Day,
    Dusk,
    Night,
}

impl DayPhase {
    #[must_use]
    pub fn from_sun(height: f32) -> Self {
        if height > 0.2 {
            DayPhase::Day
        } else if height > -0.2 {
            DayPhase::Dusk
        } else {
            DayPhase::Night
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DayPhase::Day => "Day",
            DayPhase::Dusk => "Dusk",
            DayPhase::Night => "Night",
        }
    }
}

/// Sky, lights and wind of the grove.
#[derive(Debug, Clone, PartialEq)]
pub struct Sky {
    pub time: f32,
    pub day_duration: f32,
    pub auto_cycle: bool,
    /// Fraction of the day in `[0, 1)`; 0 is sunrise.
    pub time_of_day: f32,
    pub wind: f32,
    pub phase: DayPhase,
    pub sun: f32,
    pub moon: f32,
    pub hemi: f32,
    pub stars: f32,
    pub background: Rgba,
    /// Position and start time of the last tap ripple.
    pub ripple: Option<(Vec3, f32)>,
}

impl Sky {
    fn new(config: &TreeConfig) -> Self {
        Self {
            time: 0.0,
            day_duration: config.day_duration,
            auto_cycle: config.auto_cycle,
            time_of_day: 0.0,
            wind: config.wind,
            phase: DayPhase::Day,
            sun: 2.0,
            moon: 0.0,
            hemi: 0.6,
            stars: 0.0,
            background: SKY,
            ripple: None,
        }
    }

    #[must_use]
    pub fn sun_angle(&self) -> f32 {
        self.time_of_day * TAU + FRAC_PI_2
    }

    #[must_use]
    pub fn sun_height(&self) -> f32 {
        self.sun_angle().sin()
    }
}

impl Environment for Sky {
    fn advance(&mut self, dt: f32, _rng: &mut ChaCha8Rng) {
        self.time += dt;
        if self.auto_cycle {
            self.time_of_day = (self.time % self.day_duration) / self.day_duration;
        }
        let h = self.sun_height();
        self.phase = DayPhase::from_sun(h);

        let (target, sun, moon, hemi) = match self.phase {
            DayPhase::Day => {
                self.stars = 0.0;
                (SKY, 2.0, 0.0, 0.6)
            }
            DayPhase::Dusk => {
                let t = (h + 0.2) / 0.4;
                let mut color = NIGHT.lerp(SUNSET, (t * std::f32::consts::PI).sin());
                if t > 0.5 {
                    color = color.lerp(SKY, (t - 0.5) * 2.0);
                }
                self.stars = 1.0 - t;
                (color, (h * 10.0).max(0.0), 0.0, 0.3)
            }
            DayPhase::Night => {
                self.stars = (self.stars + 0.01).min(1.0);
                (NIGHT, 0.0, 1.2, 0.8)
            }
        };
        self.background = self.background.lerp(target, 0.1);
        self.sun += (sun - self.sun) * 0.1;
        self.moon += (moon - self.moon) * 0.1;
        self.hemi += (hemi - self.hemi) * 0.05;

        if matches!(self.ripple, Some((_, start)) if self.time - start >= 2.0) {
            self.ripple = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Creature {
    Butterfly,
    Firefly,
    Spark,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Life {
    Butterfly { flap: f32, offset: f32, color: Rgba },
    Firefly { base: Vec3, offsets: Vec3, age: f32, max_age: f32 },
    Spark { life: f32, decay: f32, scale: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wing {
    pub pos: Vec3,
    pub vel: Vec3,
    pub life: Life,
}

impl Wing {
    pub fn butterfly(rng: &mut ChaCha8Rng) -> Self {
        let (a, r) = (angle(rng), rng.gen::<f32>() * 30.0);
        let hue = rng.gen::<f32>();
        Self {
            pos: Vec3::new(a.cos() * r, between(rng, 2.0, 7.0), a.sin() * r),
            vel: Vec3::new(jitter(rng, 2.0), jitter(rng, 1.0), jitter(rng, 2.0)),
            life: Life::Butterfly {
                flap: between(rng, 10.0, 20.0),
                offset: rng.gen::<f32>() * 100.0,
                color: hsl(hue, 0.8, 0.6),
            },
        }
    }

    pub fn firefly(at: Vec3, rng: &mut ChaCha8Rng) -> Self {
        Self {
            pos: at,
            vel: Vec3::ZERO,
            life: Life::Firefly {
                base: at,
                offsets: Vec3::new(rng.gen::<f32>() * 10.0, rng.gen::<f32>() * 10.0, rng.gen::<f32>() * 10.0),
                age: 0.0,
                max_age: between(rng, 5.0, 10.0),
            },
        }
    }

    pub fn spark(at: Vec3, rng: &mut ChaCha8Rng) -> Self {
        Self {
            pos: at,
            vel: Vec3::new(jitter(rng, 5.0), between(rng, 2.0, 7.0), jitter(rng, 5.0)),
            life: Life::Spark {
                life: 1.0,
                decay: between(rng, 0.5, 1.0),
                scale: between(rng, 1.0, 3.0),
            },
        }
    }
}

impl Agent for Wing {
    type Kind = Creature;
    type Vector = Vec3;
    type Env = Sky;
    type Effect = ();

    fn kind(&self) -> Creature {
        match self.life {
            Life::Butterfly { .. } => Creature::Butterfly,
            Life::Firefly { .. } => Creature::Firefly,
            Life::Spark { .. } => Creature::Spark,
        }
    }

    fn position(&self) -> Vec3 {
        self.pos
    }

    fn velocity(&self) -> Vec3 {
        self.vel
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, _peers: &[PeerOf<Self>]) -> Outcome {
        let (dt, t) = (ctx.dt, ctx.env.time);
        match &mut self.life {
            Life::Butterfly { offset, .. } => {
                let o = *offset;
                self.vel.x += (t + o).sin() * 0.1;
                self.vel.z += (t + o).cos() * 0.1;
                self.vel.y += (t * 0.5 + o).sin() * 0.05;
                self.vel = self.vel.clamp_length_max(BUTTERFLY_SPEED);
                self.pos += self.vel * dt;
                if self.pos.length() > 45.0 {
                    self.vel -= self.pos * 0.01;
                }
                if self.pos.y < 1.0 {
                    self.vel.y += 0.1;
                }
                if self.pos.y > 10.0 {
                    self.vel.y -= 0.1;
                }
                Outcome::Idle
            }
            Life::Firefly {
                base,
                offsets,
                age,
                max_age,
            } => {
                *age += dt;
                if *age > *max_age {
                    return Outcome::Expired;
                }
                self.pos = *base
                    + Vec3::new(
                        (t + offsets.x).sin() * 1.5,
                        (t * 1.3 + offsets.y).sin() * 1.5,
                        (t * 0.8 + offsets.z).cos() * 1.5,
                    );
                Outcome::Idle
            }
            Life::Spark { life, decay, .. } => {
                *life -= *decay * dt;
                if *life <= 0.0 {
                    return Outcome::Expired;
                }
                self.vel.y -= 9.8 * dt * 0.5;
                self.pos += self.vel * dt;
                Outcome::Idle
            }
        }
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        let Vec3 { x, y, z } = self.pos;
        match self.life {
            Life::Butterfly { flap, offset, color } => {
                // Wing spread narrows as the wings fold.
                let spread = ((offset + x) * flap).sin().abs() * 0.1 + 0.04;
                out.push(Sprite::ellipse(x - spread, y, spread, 0.1, color).at_depth(z));
                out.push(Sprite::ellipse(x + spread, y, spread, 0.1, color).at_depth(z));
            }
            Life::Firefly { age, .. } => {
                let glow = 1.0 + (age * 10.0).sin() * 0.5;
                out.push(Sprite::circle(x, y, 0.25, Rgba::hex(0xffff00).with_alpha(0.2 * glow)).at_depth(z).on_layer(2));
                out.push(Sprite::circle(x, y, 0.05, Rgba::hex(0xffffaa)).at_depth(z).on_layer(2));
            }
            Life::Spark { life, scale, .. } => {
                out.push(Sprite::circle(x, y, 0.05 * life * scale, Rgba::hex(0x00ffff).with_alpha(life)).at_depth(z).on_layer(2));
            }
        }
    }
}

/// HSL to RGB, all components in `[0, 1]`.
fn hsl(h: f32, s: f32, l: f32) -> Rgba {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = (h.rem_euclid(1.0)) * 6.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba {
        r: to(r),
        g: to(g),
        b: to(b),
        a: 1.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pine {
    pub pos: Vec3,
    pub scale: f32,
    pub stretch: f32,
}

pub struct Grove {
    stage: Stage<Wing>,
    config: TreeConfig,
    pines: Vec<Pine>,
    night_sky: Vec<Vec3>,
}

impl Grove {
    #[must_use]
    pub fn new(config: &TreeConfig, seed: u64) -> Self {
        let capacity = config.butterflies + config.max_fireflies + MAX_SPARKS + BURST_SIZE;
        let mut stage = Stage::new(Bounds::new(100.0, 100.0), Sky::new(config), seed, capacity);
        let rng = stage.rng_mut();
        let mut pines: Vec<Pine> = (0..TREES)
            .map(|_| {
                let (a, r) = (angle(rng), rng.gen::<f32>() * 40.0);
                let (x, z) = (a.cos() * r, a.sin() * r);
                let scale = between(rng, 0.8, 1.4);
                Pine {
                    pos: Vec3::new(x, ground_height(x, z), z),
                    scale,
                    stretch: between(rng, 0.9, 1.1),
                }
            })
            .collect();
        pines.sort_by(|a, b| a.pos.z.total_cmp(&b.pos.z));
        let night_sky = (0..NIGHT_STARS)
            .map(|_| Vec3::new(jitter(rng, 200.0), jitter(rng, 200.0), jitter(rng, 200.0)))
            .collect();
        stage.populate(config.butterflies, |rng, _| Wing::butterfly(rng));
        Self {
            stage,
            config: config.clone(),
            pines,
            night_sky,
        }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Wing> {
        &self.stage
    }

    #[must_use]
    pub fn sky(&self) -> &Sky {
        self.stage.env()
    }

    #[must_use]
    pub fn pines(&self) -> &[Pine] {
        &self.pines
    }

    /// Throws a burst of sparks from the ground at `(x, z)`, evicting the
    /// oldest sparks beyond the live limit.
    pub fn burst(&mut self, x: f32, z: f32) -> usize {
        let at = Vec3::new(x, ground_height(x, z), z);
        let time = self.sky().time;
        self.stage.env_mut().ripple = Some((at, time));

        let mut sparks = Vec::new();
        self.stage.for_each(|e, w| {
            if matches!(w.life, Life::Spark { .. }) {
                sparks.push(e);
            }
        });
        let excess = (sparks.len() + BURST_SIZE).saturating_sub(MAX_SPARKS);
        for e in sparks.into_iter().take(excess) {
            self.stage.despawn(e);
        }

        let mut thrown = 0;
        for _ in 0..BURST_SIZE {
            let spark = Wing::spark(at, self.stage.rng_mut());
            if self.stage.spawn(spark).is_some() {
                thrown += 1;
            }
        }
        thrown
    }

    fn release_fireflies(&mut self) -> usize {
        if self.sky().phase != DayPhase::Night || self.stage.count(Creature::Firefly) >= self.config.max_fireflies {
            return 0;
        }
        if !chance(self.stage.rng_mut(), self.config.firefly_chance) {
            return 0;
        }
        let rng = self.stage.rng_mut();
        let (a, r) = (angle(rng), rng.gen::<f32>() * 30.0);
        let (x, z) = (a.cos() * r, a.sin() * r);
        let at = Vec3::new(x, ground_height(x, z) + between(rng, 0.5, 3.0), z);
        let firefly = Wing::firefly(at, rng);
        usize::from(self.stage.spawn(firefly).is_some())
    }
}

impl Simulation for Grove {
    fn id(&self) -> SimulationId {
        SimulationId::Trees
    }

    fn step(&mut self, dt: f32) -> TickReport {
        let mut report = self.stage.step(seconds(dt));
        report.spawned += self.release_fireflies();
        report
    }

    fn frame(&self) -> Frame {
        let sky = self.sky();
        let mut frame = Frame {
            tick: self.stage.tick(),
            width: 100.0,
            height: 100.0,
            background: sky.background,
            projection: Projection::Perspective {
                eye_height: 4.0,
                distance: 12.0,
                focal: 1.0 / 30.0_f32.to_radians().tan(),
            },
            sprites: Vec::new(),
        };

        let (sun_x, sun_y) = (sky.sun_angle().cos() * 60.0, sky.sun_height() * 60.0);
        let sun_glow = (sky.sun / 2.0).clamp(0.0, 1.0);
        let moon_glow = (sky.moon / 1.2).clamp(0.0, 1.0);
        frame
            .sprites
            .push(Sprite::circle(sun_x, sun_y, 4.0, Rgba::hex(0xfffaed).with_alpha(sun_glow)).at_depth(-80.0).on_layer(-3));
        frame
            .sprites
            .push(Sprite::circle(-sun_x, -sun_y, 3.0, Rgba::hex(0x6688ff).with_alpha(moon_glow)).at_depth(-80.0).on_layer(-3));

        if sky.stars > 0.0 {
            let star = Rgba::WHITE.with_alpha(sky.stars);
            for p in &self.night_sky {
                frame.sprites.push(Sprite::circle(p.x, p.y, 0.2, star).at_depth(p.z).on_layer(-3));
            }
        }

        let light = (sky.hemi + sky.sun * 0.25 + sky.moon * 0.1).clamp(0.2, 1.0);
        let trunk = Rgba::hex(0x4a3728).lerp(Rgba::BLACK, 1.0 - light);
        let needles = Rgba::hex(0x2d4c1e).lerp(Rgba::BLACK, 1.0 - light);
        let t = sky.time;
        for pine in &self.pines {
            let Vec3 { x, y, z } = pine.pos;
            let s = pine.scale;
            let wave = (t * 1.5 + x * 0.5 + z * 0.5).sin();
            frame.sprites.push(Sprite::line(x, y, 0.0, 1.5 * s, 0.3 * s, trunk).at_depth(z));
            for i in 0..3 {
                let fy = (1.2 + i as f32 * 1.2) * s * pine.stretch;
                let bend = wave * sky.wind * 0.05 * (fy - 1.0).max(0.0).powi(2);
                let width = 1.2 * (1.0 - i as f32 * 0.2) * s;
                frame.sprites.push(
                    Sprite::new(
                        x + bend,
                        y + fy,
                        Shape::Star {
                            outer: width,
                            inner: width * 0.45,
                            points: 3,
                        },
                        needles,
                    )
                    .rotated(-FRAC_PI_2)
                    .at_depth(z),
                );
            }
        }

        frame.sprites.extend(self.stage.sprites());
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Tool { tool: Tool::Burst, x, y } => {
                let thrown = self.burst(x, y);
                tracing::debug!(thrown, "Burst");
            }
            Interaction::Knob {
                knob: Knob::DayDuration,
                value,
            } => self.stage.env_mut().day_duration = value.clamp(10.0, 120.0),
            Interaction::Knob { knob: Knob::Wind, value } => self.stage.env_mut().wind = value.clamp(0.0, 5.0),
            Interaction::Knob {
                knob: Knob::TimeOfDay,
                value,
            } => {
                let sky = self.stage.env_mut();
                sky.auto_cycle = false;
                sky.time_of_day = value.clamp(0.0, 1.0);
            }
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        let sky = self.sky();
        Census::new()
            .with("Butterflies", self.stage.count(Creature::Butterfly) as f64)
            .with("Fireflies", self.stage.count(Creature::Firefly) as f64)
            .with("Sparks", self.stage.count(Creature::Spark) as f64)
            .with("Time of day", f64::from(sky.time_of_day))
            .with("Sun", f64::from(sky.sun))
            .with("Moon", f64::from(sky.moon))
            .with_status(sky.phase.as_str())
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

    fn grove() -> Grove {
        Grove::new(&TreeConfig::default(), 9)
    }

    fn night(grove: &mut Grove) {
        grove
            .apply(&Interaction::Knob {
                knob: Knob::TimeOfDay,
                value: 0.5,
            })
            .unwrap();
    }

    #[test]
    fn test_phase_thresholds() {
        assert_eq!(DayPhase::from_sun(1.0), DayPhase::Day);
        assert_eq!(DayPhase::from_sun(0.2), DayPhase::Dusk);
        assert_eq!(DayPhase::from_sun(-0.2), DayPhase::Night);
    }

    #[test]
    fn test_day_starts_at_noon_light() {
        let mut g = grove();
        g.step(1.0 / 60.0);
        assert_eq!(g.sky().phase, DayPhase::Day);
        assert_eq!(g.census().status.as_deref(), Some("Day"));
        assert_eq!(g.pines().len(), 50);
        assert_eq!(g.stage().count(Creature::Butterfly), 15);
    }

    #[test]
    fn test_night_lights_ease_in() {
        let mut g = grove();
        night(&mut g);
        for _ in 0..120 {
            g.step(1.0 / 60.0);
        }
        let sky = g.sky();
        assert_eq!(sky.phase, DayPhase::Night);
        assert!(sky.sun < 0.01);
        assert!((sky.moon - 1.2).abs() < 0.01);
        assert!(!sky.auto_cycle);
    }

    #[test]
    fn test_fireflies_only_at_night() {
        let config = TreeConfig {
            firefly_chance: 1.0,
            ..Default::default()
        };
        let mut g = Grove::new(&config, 3);
        for _ in 0..30 {
            g.step(1.0 / 60.0);
        }
        assert_eq!(g.stage().count(Creature::Firefly), 0);
        night(&mut g);
        for _ in 0..100 {
            g.step(1.0 / 60.0);
        }
        assert_eq!(g.stage().count(Creature::Firefly), 40);
    }

    #[test]
    fn test_butterflies_stay_slow() {
        let mut g = grove();
        for _ in 0..600 {
            g.step(1.0 / 60.0);
        }
        g.stage().for_each(|_, w| {
            if let Life::Butterfly { .. } = w.life {
                assert!(w.vel.length() <= BUTTERFLY_SPEED + 0.1 + w.pos.length() * 0.01 + 1e-4);
            }
        });
    }

    #[test]
    fn test_burst_caps_live_sparks() {
        let mut g = grove();
        for _ in 0..12 {
            assert_eq!(g.burst(0.0, 0.0), 50);
        }
        assert_eq!(g.stage().count(Creature::Spark), 500);
        assert!(g.sky().ripple.is_some());
        for _ in 0..180 {
            g.step(1.0 / 60.0);
        }
        assert_eq!(g.stage().count(Creature::Spark), 0);
        assert!(g.sky().ripple.is_none());
    }

    #[test]
    fn test_knobs() {
        let mut g = grove();
        g.apply(&Interaction::Knob {
            knob: Knob::DayDuration,
            value: 500.0,
        })
        .unwrap();
        assert_eq!(g.sky().day_duration, 120.0);
        assert!(g
            .apply(&Interaction::Tool {
                tool: Tool::Plant,
                x: 0.0,
                y: 0.0
            })
            .is_err());
    }
}
