//! A meadow of flowers that sprout, bloom, wither and reseed as a new
//! species, swaying in the wind.

use crate::behavior::{advance, advance_if_permitted, StateMachine};
use crate::config::FlowerConfig;
use crate::error::{Result, SimError};
use crate::simulation::{seconds, Simulation, SimulationId};
use crate::stage::{Agent, Environment, Outcome, PeerOf, Stage, Tick, TickReport};
use crate::sims::{between, jitter};
use glam::Vec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vivarium_data::{Bounds, Census, Frame, Interaction, Knob, Projection, Rgba, Shape, Sprite, Tool};

const STEM: Rgba = Rgba::hex(0x2d5a27);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Standard,
    Daisy,
    Tulip,
    Sunflower,
    Lavender,
    Rose,
    Bluebell,
    Dandelion,
    Poppy,
    Lily,
}

impl Species {
    pub const ALL: [Species; 10] = [
        Species::Standard,
        Species::Daisy,
        Species::Tulip,
        Species::Sunflower,
        Species::Lavender,
        Species::Rose,
        Species::Bluebell,
        Species::Dandelion,
        Species::Poppy,
        Species::Lily,
    ];

    fn random(rng: &mut ChaCha8Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Species::Standard => "Standard",
            Species::Daisy => "Daisy",
            Species::Tulip => "Tulip",
            Species::Sunflower => "Sunflower",
            Species::Lavender => "Lavender",
            Species::Rose => "Rose",
            Species::Bluebell => "Bluebell",
            Species::Dandelion => "Dandelion",
            Species::Poppy => "Poppy",
            Species::Lily => "Lily",
        }
    }

    /// Petal color and heart color.
    fn colors(self) -> (Rgba, Rgba) {
        let yellow = Rgba::hex(0xffff00);
        match self {
            Species::Standard => (Rgba::hex(0xff69b4), yellow),
            Species::Daisy => (Rgba::WHITE, Rgba::hex(0xffcc00)),
            Species::Tulip => (Rgba::hex(0xff0055), yellow),
            Species::Sunflower => (Rgba::hex(0xffcc00), Rgba::hex(0x3e2723)),
            Species::Lavender => (Rgba::hex(0x9d7bb0), yellow),
            Species::Rose => (Rgba::hex(0xd32f2f), yellow),
            Species::Bluebell => (Rgba::hex(0x3f51b5), yellow),
            Species::Dandelion => (Rgba::WHITE.with_alpha(0.6), yellow),
            Species::Poppy => (Rgba::hex(0xf44336), Rgba::hex(0x212121)),
            Species::Lily => (Rgba::hex(0xff9800), yellow),
        }
    }

    fn head(self, x: f32, y: f32, z: f32, k: f32, out: &mut Vec<Sprite>) {
        let (petal, heart) = self.colors();
        let star = |outer: f32, inner: f32, points: u8, color: Rgba| {
            Sprite::new(
                x,
                y,
                Shape::Star {
                    outer: outer * k,
                    inner: inner * k,
                    points,
                },
                color,
            )
            .at_depth(z)
        };
        match self {
            Species::Standard => out.push(Sprite::circle(x, y, 0.3 * k, petal).at_depth(z)),
            Species::Daisy => {
                out.push(star(0.45, 0.15, 8, petal));
                out.push(Sprite::circle(x, y, 0.15 * k, heart).at_depth(z));
            }
            Species::Tulip => out.push(Sprite::ellipse(x, y + 0.1 * k, 0.2 * k, 0.25 * k, petal).at_depth(z)),
            Species::Sunflower => {
                out.push(star(0.65, 0.3, 12, petal));
                out.push(Sprite::circle(x, y, 0.3 * k, heart).at_depth(z));
            }
            Species::Lavender => {
                for i in 0..10 {
                    let by = y - (0.4 - i as f32 * 0.08) * k;
                    out.push(Sprite::circle(x, by, 0.06 * k, petal).at_depth(z));
                }
            }
            Species::Rose => {
                for i in 0..3 {
                    let shade = petal.lerp(Rgba::BLACK, i as f32 * 0.15);
                    out.push(Sprite::circle(x, y, (0.15 - i as f32 * 0.04) * k, shade).at_depth(z));
                }
            }
            Species::Bluebell => {
                for i in 0..3 {
                    let (bx, by) = (x + (0.1 + i as f32 * 0.05) * k, y - (0.1 + i as f32 * 0.1) * k);
                    out.push(
                        Sprite::ellipse(bx, by, 0.08 * k, 0.1 * k, petal)
                            .rotated(-std::f32::consts::FRAC_PI_3)
                            .at_depth(z),
                    );
                }
            }
            Species::Dandelion => out.push(Sprite::circle(x, y, 0.25 * k, petal).at_depth(z)),
            Species::Poppy => {
                out.push(star(0.3, 0.2, 4, petal));
                out.push(Sprite::circle(x, y, 0.08 * k, heart).at_depth(z));
            }
            Species::Lily => out.push(star(0.4, 0.08, 6, petal)),
        }
    }
}

/// Where a flower is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    Dormant,
    Sprouting,
    Blooming,
    Withering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Sprout,
    Open,
    Fade,
    Reseed,
}

impl StateMachine for Growth {
    type Trigger = Season;
    const NAME: &'static str = "flower";
    const TABLE: &'static [(Self, Season, Self)] = &[
        (Growth::Dormant, Season::Sprout, Growth::Sprouting),
        (Growth::Sprouting, Season::Open, Growth::Blooming),
        (Growth::Sprouting, Season::Fade, Growth::Withering),
        (Growth::Blooming, Season::Fade, Growth::Withering),
        (Growth::Withering, Season::Reseed, Growth::Sprouting),
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flower {
    pub pos: Vec3,
    /// Seconds of growth; negative while the seed is still waiting.
    pub age: f32,
    pub max_age: f32,
    pub height: f32,
    pub species: Species,
    pub growth: Growth,
    bend: f32,
    sway: f32,
    tilt: f32,
}

impl Flower {
    pub fn new(x: f32, z: f32, age: f32, life_span: f32, rng: &mut ChaCha8Rng) -> Self {
        let mut flower = Self {
            pos: Vec3::new(x, 0.0, z),
            age,
            max_age: life_span,
            height: 0.0,
            species: Species::Standard,
            growth: if age < 0.0 { Growth::Dormant } else { Growth::Sprouting },
            bend: jitter(rng, 0.5),
            sway: 0.0,
            tilt: 0.0,
        };
        flower.reseed(life_span, rng);
        flower
    }

    fn reseed(&mut self, life_span: f32, rng: &mut ChaCha8Rng) {
        self.max_age = life_span + jitter(rng, 2.0);
        self.species = Species::random(rng);
        self.height = between(rng, 1.5, 3.0);
        if self.species == Species::Sunflower {
            self.height *= 1.2;
        }
    }

    /// Size of the plant relative to full bloom.
    #[must_use]
    pub fn scale(&self) -> f32 {
        match self.growth {
            Growth::Dormant => 0.0,
            Growth::Sprouting => self.age.clamp(0.0, 1.0),
            Growth::Blooming => 1.0,
            Growth::Withering => (self.max_age - self.age).clamp(0.0, 1.0),
        }
    }

    fn grow(&mut self) {
        if self.age >= 0.0 {
            advance_if_permitted(&mut self.growth, Season::Sprout);
        }
        if self.growth == Growth::Sprouting && self.age >= 1.0 && self.age <= self.max_age - 1.0 {
            advance(&mut self.growth, Season::Open);
        }
        if matches!(self.growth, Growth::Sprouting | Growth::Blooming) && self.age > self.max_age - 1.0 {
            advance(&mut self.growth, Season::Fade);
        }
    }
}

impl Agent for Flower {
    type Kind = Species;
    type Vector = Vec3;
    type Env = Meadow;
    type Effect = ();

    fn kind(&self) -> Species {
        self.species
    }

    fn position(&self) -> Vec3 {
        self.pos
    }

    fn size(&self) -> f32 {
        self.height
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, _peers: &[PeerOf<Self>]) -> Outcome {
        let meadow = &*ctx.env;
        self.age += ctx.dt * meadow.growth_speed;
        self.grow();

        let t = meadow.time;
        self.sway = (t * 2.0 + self.pos.x).sin() * meadow.wind;
        self.tilt = self.bend + (t * 1.5 + self.pos.z).cos() * meadow.wind;
        if self.growth == Growth::Withering {
            self.tilt += 1.0 - (self.max_age - self.age);
        }

        if self.age >= self.max_age {
            let life_span = meadow.life_span;
            self.age = 0.0;
            self.reseed(life_span, ctx.rng);
            advance(&mut self.growth, Season::Reseed);
        }
        Outcome::Idle
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        let k = self.scale();
        if k <= 0.0 {
            return;
        }
        let Vec3 { x, z, .. } = self.pos;
        let h = self.height * k;
        // The stem leans sideways with the tilt and toward the viewer with the sway.
        let (dx, dy) = (self.tilt.sin() * h, self.tilt.cos() * self.sway.cos() * h);
        out.push(Sprite::ellipse(x, 0.0, 0.3 * k, 0.05 * k, Rgba::BLACK.with_alpha(0.3)).at_depth(z).on_layer(-1));
        let stem_width = if self.species == Species::Sunflower { 0.075 } else { 0.05 };
        out.push(Sprite::line(x, 0.0, dx, dy, stem_width * k, STEM).at_depth(z));
        self.species.head(x + dx, dy, z, k, out);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Meadow {
    pub growth_speed: f32,
    pub life_span: f32,
    pub wind: f32,
    pub time: f32,
}

impl Environment for Meadow {
    fn advance(&mut self, dt: f32, _rng: &mut ChaCha8Rng) {
        self.time += dt;
    }
}

pub struct Garden {
    stage: Stage<Flower>,
    config: FlowerConfig,
}

impl Garden {
    #[must_use]
    pub fn new(config: &FlowerConfig, seed: u64) -> Self {
        let meadow = Meadow {
            growth_speed: config.growth_speed,
            life_span: config.life_span,
            wind: config.wind,
            time: 0.0,
        };
        let field = config.field_size;
        let mut stage = Stage::new(Bounds::new(field, field), meadow, seed, config.count + 500);
        stage.populate(config.count, |rng, _| {
            let (x, z) = (jitter(rng, field), jitter(rng, field));
            let age = -rng.gen::<f32>() * 5.0;
            Flower::new(x, z, age, config.life_span, rng)
        });
        Self {
            stage,
            config: config.clone(),
        }
    }

    #[must_use]
    pub fn stage(&self) -> &Stage<Flower> {
        &self.stage
    }

    #[must_use]
    pub fn meadow(&self) -> &Meadow {
        self.stage.env()
    }

    /// Plants a fresh sprout at `(x, z)` on the ground.
    pub fn plant(&mut self, x: f32, z: f32) -> bool {
        let life_span = self.meadow().life_span;
        let flower = Flower::new(x, z, 0.0, life_span, self.stage.rng_mut());
        self.stage.spawn(flower).is_some()
    }

    #[must_use]
    pub fn count_in(&self, growth: Growth) -> usize {
        self.stage.count_where(|f| f.growth == growth)
    }

    /// Species with the most flowers currently in bloom.
    #[must_use]
    pub fn dominant(&self) -> Option<Species> {
        let mut tally = [0usize; Species::ALL.len()];
        self.stage.for_each(|_, f| {
            if f.growth == Growth::Blooming {
                if let Some(i) = Species::ALL.iter().position(|s| *s == f.species) {
                    tally[i] += 1;
                }
            }
        });
        let (best, n) = tally.iter().enumerate().fold((0, 0), |acc, (i, &n)| if n > acc.1 { (i, n) } else { acc });
        (n > 0).then(|| Species::ALL[best])
    }
}

impl Simulation for Garden {
    fn id(&self) -> SimulationId {
        SimulationId::Flowers
    }

    fn step(&mut self, dt: f32) -> TickReport {
        self.stage.step(seconds(dt))
    }

    fn frame(&self) -> Frame {
        let field = self.config.field_size;
        let mut frame = Frame {
            tick: self.stage.tick(),
            width: field,
            height: field,
            background: Rgba::hex(0x111111),
            projection: Projection::Perspective {
                eye_height: 3.0,
                distance: 8.0,
                focal: 1.0 / 30.0_f32.to_radians().tan(),
            },
            sprites: self.stage.sprites(),
        };
        frame.sort_for_painting();
        frame
    }

    fn apply(&mut self, input: &Interaction) -> Result<()> {
        match *input {
            Interaction::Tool { tool: Tool::Plant, x, y } => {
                self.plant(x, y);
            }
            Interaction::Knob {
                knob: Knob::GrowthSpeed,
                value,
            } => self.stage.env_mut().growth_speed = value.clamp(0.1, 5.0),
            Interaction::Knob {
                knob: Knob::LifeSpan,
                value,
            } => self.stage.env_mut().life_span = value.clamp(2.0, 10.0),
            Interaction::Knob { knob: Knob::Wind, value } => self.stage.env_mut().wind = value.clamp(0.0, 0.5),
            _ => return Err(SimError::unsupported(self.id().as_str(), input)),
        }
        Ok(())
    }

    fn census(&self) -> Census {
        let census = Census::new()
            .with("Flowers", self.stage.len() as f64)
            .with("Dormant", self.count_in(Growth::Dormant) as f64)
            .with("Sprouting", self.count_in(Growth::Sprouting) as f64)
            .with("Blooming", self.count_in(Growth::Blooming) as f64)
            .with("Withering", self.count_in(Growth::Withering) as f64)
            .with("Wind", f64::from(self.meadow().wind));
        match self.dominant() {
            Some(species) => census.with_status(format!("Mostly {}", species.name())),
            None => census,
        }
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
    fn test_seeds_start_dormant() {
        let garden = Garden::new(&FlowerConfig::default(), 1);
        assert_eq!(garden.stage().len(), 50);
        assert_eq!(garden.count_in(Growth::Dormant), 50);
        assert!(garden.stage().sprites().is_empty());
    }

    #[test]
    fn test_life_cycle_reseeds() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut flower = Flower::new(0.0, 0.0, 0.0, 5.0, &mut rng);
        assert_eq!(flower.growth, Growth::Sprouting);
        let mut stage = Stage::new(
            Bounds::new(20.0, 20.0),
            Meadow {
                growth_speed: 1.0,
                life_span: 5.0,
                wind: 0.1,
                time: 0.0,
            },
            3,
            4,
        );
        flower.age = 0.5;
        stage.spawn(flower);

        let mut seen = Vec::new();
        for _ in 0..140 {
            stage.step(0.05);
            stage.for_each(|_, f| {
                if seen.last() != Some(&f.growth) {
                    seen.push(f.growth);
                }
            });
        }
        assert_eq!(
            &seen[..4],
            &[Growth::Sprouting, Growth::Blooming, Growth::Withering, Growth::Sprouting]
        );
        assert_eq!(stage.len(), 1);
    }

    #[test]
    fn test_heights_by_species() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..200 {
            let f = Flower::new(0.0, 0.0, 0.0, 5.0, &mut rng);
            let top = if f.species == Species::Sunflower { 3.6 } else { 3.0 };
            assert!(f.height >= 1.5 && f.height <= top);
            assert!((4.0..=6.0).contains(&f.max_age));
        }
    }

    #[test]
    fn test_plant_and_knobs() {
        let mut garden = Garden::new(&FlowerConfig::default(), 5);
        garden
            .apply(&Interaction::Tool {
                tool: Tool::Plant,
                x: 1.0,
                y: -2.0,
            })
            .unwrap();
        assert_eq!(garden.stage().len(), 51);
        assert_eq!(garden.count_in(Growth::Sprouting), 1);

        garden
            .apply(&Interaction::Knob {
                knob: Knob::Wind,
                value: 3.0,
            })
            .unwrap();
        garden
            .apply(&Interaction::Knob {
                knob: Knob::GrowthSpeed,
                value: 0.0,
            })
            .unwrap();
        assert_eq!(garden.meadow().wind, 0.5);
        assert_eq!(garden.meadow().growth_speed, 0.1);
        assert!(garden
            .apply(&Interaction::Tool {
                tool: Tool::Burst,
                x: 0.0,
                y: 0.0
            })
            .is_err());
    }

    #[test]
    fn test_meadow_blooms_after_a_while() {
        let mut garden = Garden::new(&FlowerConfig::default(), 6);
        for _ in 0..400 {
            garden.step(1.0 / 60.0);
        }
        assert_eq!(garden.count_in(Growth::Dormant), 0);
        assert!(!garden.stage().sprites().is_empty());
        assert_eq!(garden.census().count("Flowers"), 50);
    }
}
