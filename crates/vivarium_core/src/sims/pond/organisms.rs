use super::PondEnv;
use crate::behavior::{advance, advance_if_permitted, StateMachine};
use crate::edges;
use crate::sims::{between, chance, heading, jitter};
use crate::stage::{Agent, Outcome, PeerOf, Tick};
use crate::steering::{limit, nearest, turn_toward};
use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vivarium_data::{Rgba, Shape, Sprite};

const MAX_ENERGY: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Bacterium,
    Alga,
    Paramecium,
    Amoeba,
    Euglena,
    Rotifer,
    Hydra,
    Detritus,
}

impl Species {
    pub const ALL: [Species; 8] = [
        Species::Bacterium,
        Species::Alga,
        Species::Paramecium,
        Species::Amoeba,
        Species::Euglena,
        Species::Rotifer,
        Species::Hydra,
        Species::Detritus,
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Species::Bacterium => "Bacteria",
            Species::Alga => "Algae",
            Species::Paramecium => "Paramecia",
            Species::Amoeba => "Amoebae",
            Species::Euglena => "Euglenae",
            Species::Rotifer => "Rotifers",
            Species::Hydra => "Hydrae",
            Species::Detritus => "Detritus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmoebaMode {
    Wandering,
    Hunting,
    Engulfing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmoebaCue {
    Spot,
    Lose,
    Engulf,
    Digested,
}

impl StateMachine for AmoebaMode {
    type Trigger = AmoebaCue;
    const NAME: &'static str = "amoeba";
    const TABLE: &'static [(Self, AmoebaCue, Self)] = &[
        (AmoebaMode::Wandering, AmoebaCue::Spot, AmoebaMode::Hunting),
        (AmoebaMode::Hunting, AmoebaCue::Lose, AmoebaMode::Wandering),
        (AmoebaMode::Hunting, AmoebaCue::Engulf, AmoebaMode::Engulfing),
        (AmoebaMode::Engulfing, AmoebaCue::Digested, AmoebaMode::Wandering),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EuglenaMode {
    Photosynthetic,
    Hunting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightCue {
    Dim,
    Brighten,
}

impl StateMachine for EuglenaMode {
    type Trigger = LightCue;
    const NAME: &'static str = "euglena";
    const TABLE: &'static [(Self, LightCue, Self)] = &[
        (EuglenaMode::Photosynthetic, LightCue::Dim, EuglenaMode::Hunting),
        (EuglenaMode::Hunting, LightCue::Brighten, EuglenaMode::Photosynthetic),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydraMode {
    Relaxed,
    Contracting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydraCue {
    Catch,
    Release,
}

impl StateMachine for HydraMode {
    type Trigger = HydraCue;
    const NAME: &'static str = "hydra";
    const TABLE: &'static [(Self, HydraCue, Self)] = &[
        (HydraMode::Relaxed, HydraCue::Catch, HydraMode::Contracting),
        (HydraMode::Contracting, HydraCue::Release, HydraMode::Relaxed),
    ];
}

/// Per-species state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Body {
    Bacterium,
    Alga {
        cells: u8,
        pulse: f32,
    },
    Paramecium {
        speed: f32,
    },
    Amoeba {
        mode: AmoebaMode,
        digestion: f32,
        eaten: u32,
    },
    Euglena {
        mode: EuglenaMode,
        energy: f32,
        cooldown: f32,
    },
    Rotifer {
        energy: f32,
    },
    Hydra {
        mode: HydraMode,
        energy: f32,
        contraction: f32,
    },
    Detritus {
        life: f32,
        spin: f32,
        points: u8,
    },
}

/// Velocity nudges queued by one organism for another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PondEffect {
    Pull(Vec2),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Organism {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    /// Facing angle in radians
    pub heading: f32,
    phase: f32,
    pub body: Body,
}

fn velocity_jitter(rng: &mut ChaCha8Rng, amp: f32) -> Vec2 {
    Vec2::new(jitter(rng, amp), jitter(rng, amp))
}

impl Organism {
    fn with_body(pos: Vec2, vel: Vec2, size: f32, rng: &mut ChaCha8Rng, body: Body) -> Self {
        Self {
            pos,
            vel,
            size,
            heading: crate::sims::angle(rng),
            phase: crate::sims::angle(rng),
            body,
        }
    }

    pub fn spawn(species: Species, pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        match species {
            Species::Bacterium => {
                let vel = velocity_jitter(rng, 0.5);
                let size = between(rng, 2.0, 4.0);
                Self::with_body(pos, vel, size, rng, Body::Bacterium)
            }
            Species::Alga => {
                let vel = velocity_jitter(rng, 0.05);
                let cells = rng.gen_range(3..7);
                Self::with_body(pos, vel, 8.0, rng, Body::Alga { cells, pulse: 1.0 })
            }
            Species::Paramecium => {
                let speed = between(rng, 1.0, 2.0);
                Self::with_body(pos, Vec2::ZERO, 40.0, rng, Body::Paramecium { speed })
            }
            Species::Amoeba => {
                let vel = velocity_jitter(rng, 0.3);
                let size = between(rng, 30.0, 40.0);
                Self::with_body(
                    pos,
                    vel,
                    size,
                    rng,
                    Body::Amoeba {
                        mode: AmoebaMode::Wandering,
                        digestion: 0.0,
                        eaten: 0,
                    },
                )
            }
            Species::Euglena => {
                let vel = velocity_jitter(rng, 0.5);
                let size = between(rng, 12.0, 16.0);
                Self::with_body(
                    pos,
                    vel,
                    size,
                    rng,
                    Body::Euglena {
                        mode: EuglenaMode::Photosynthetic,
                        energy: 50.0,
                        cooldown: 500.0,
                    },
                )
            }
            Species::Rotifer => {
                let vel = velocity_jitter(rng, 0.3);
                let size = between(rng, 20.0, 28.0);
                Self::with_body(pos, vel, size, rng, Body::Rotifer { energy: 50.0 })
            }
            Species::Hydra => {
                let size = between(rng, 40.0, 55.0);
                Self::with_body(
                    pos,
                    Vec2::ZERO,
                    size,
                    rng,
                    Body::Hydra {
                        mode: HydraMode::Relaxed,
                        energy: 60.0,
                        contraction: 0.0,
                    },
                )
            }
            Species::Detritus => {
                let size = between(rng, 2.0, 5.0);
                Self::detritus(pos, size, rng)
            }
        }
    }

    /// Sinking remains of a dead organism.
    pub fn detritus(pos: Vec2, size: f32, rng: &mut ChaCha8Rng) -> Self {
        let vel = Vec2::new(jitter(rng, 0.1), rng.gen::<f32>() * 0.2);
        let body = Body::Detritus {
            life: between(rng, 300.0, 500.0),
            spin: jitter(rng, 0.02),
            points: rng.gen_range(5..8),
        };
        Self::with_body(pos, vel, size, rng, body)
    }

    #[must_use]
    pub fn species(&self) -> Species {
        match self.body {
            Body::Bacterium => Species::Bacterium,
            Body::Alga { .. } => Species::Alga,
            Body::Paramecium { .. } => Species::Paramecium,
            Body::Amoeba { .. } => Species::Amoeba,
            Body::Euglena { .. } => Species::Euglena,
            Body::Rotifer { .. } => Species::Rotifer,
            Body::Hydra { .. } => Species::Hydra,
            Body::Detritus { .. } => Species::Detritus,
        }
    }

    #[must_use]
    pub fn energy(&self) -> Option<f32> {
        match self.body {
            Body::Euglena { energy, .. } | Body::Rotifer { energy } | Body::Hydra { energy, .. } => {
                Some(energy)
            }
            _ => None,
        }
    }

    /// Leaves detritus behind and reports the death.
    fn die(&self, ctx: &mut Tick<'_, Self>) -> Outcome {
        let remains = Organism::detritus(self.pos, (self.size * 0.2).clamp(2.0, 8.0), ctx.rng);
        ctx.spawn(remains);
        tracing::debug!(species = ?self.species(), tick = ctx.tick, "Organism starved");
        Outcome::Expired
    }
}

fn is_food(kind: Species) -> bool {
    matches!(kind, Species::Bacterium | Species::Detritus)
}

fn eaten(target: Option<hecs::Entity>) -> Outcome {
    target.map_or(Outcome::Idle, Outcome::Consumed)
}

impl Agent for Organism {
    type Kind = Species;
    type Vector = Vec2;
    type Env = PondEnv;
    type Effect = PondEffect;

    fn kind(&self) -> Species {
        self.species()
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
        let dt = ctx.dt;
        let bounds = ctx.bounds;
        let light = ctx.env.light;
        let clock = ctx.env.clock;

        match &mut self.body {
            Body::Bacterium => {
                self.vel += velocity_jitter(ctx.rng, 0.1);
                self.vel *= 0.95;
                self.pos += self.vel * dt;
                edges::wrap(&mut self.pos, bounds, 0.0);
                self.phase += 0.075 * dt;
                Outcome::Idle
            }
            Body::Alga { pulse, .. } => {
                self.pos += self.vel * dt;
                self.heading += 0.001 * dt;
                edges::wrap(&mut self.pos, bounds, 20.0);
                *pulse = if light > 0.8 {
                    1.0 + (clock * 0.083).sin() * 0.05 * (light - 0.8)
                } else {
                    1.0
                };
                Outcome::Idle
            }
            Body::Paramecium { speed } => {
                let target = nearest(peers, self.pos, 200.0, |p| {
                    p.kind == Species::Bacterium && ctx.is_live(p)
                })
                .map(|(p, d)| (p.entity, p.position, d));

                match target {
                    Some((_, at, _)) => {
                        let desired = (at.y - self.pos.y).atan2(at.x - self.pos.x);
                        self.heading = turn_toward(self.heading, desired, (0.05 * dt).min(1.0));
                        *speed = 1.5 + ctx.rng.gen::<f32>();
                    }
                    None => {
                        self.heading += (clock * 0.033).sin() * 0.05;
                        *speed = 0.8 + ctx.rng.gen::<f32>() * 0.5;
                    }
                }
                self.vel = heading(self.heading) * *speed;
                self.pos += self.vel * dt;
                edges::wrap(&mut self.pos, bounds, 50.0);
                self.phase += 0.083 * dt;

                eaten(target.filter(|(_, _, d)| *d < 15.0).map(|(e, _, _)| e))
            }
            Body::Amoeba {
                mode,
                digestion,
                eaten: meals,
            } => {
                let mut consumed = None;
                if *mode == AmoebaMode::Engulfing {
                    *digestion += 0.02 * dt;
                    if *digestion >= 1.0 {
                        advance(mode, AmoebaCue::Digested);
                        *digestion = 0.0;
                    }
                } else {
                    let hungry = *meals > 5;
                    let prey = nearest(peers, self.pos, 250.0, |p| {
                        ctx.is_live(p)
                            && (p.kind == Species::Bacterium
                                || (hungry && p.kind == Species::Paramecium))
                    });
                    match prey {
                        Some((p, d)) => {
                            advance_if_permitted(mode, AmoebaCue::Spot);
                            if d > 0.0 {
                                self.vel += (p.position - self.pos) / d * 0.02 * dt;
                            }
                            let reach = if p.kind == Species::Paramecium { 30.0 } else { 20.0 };
                            if d < reach && advance(mode, AmoebaCue::Engulf) {
                                *digestion = 0.0;
                                *meals += 1;
                                consumed = Some(p.entity);
                            }
                        }
                        None => {
                            advance_if_permitted(mode, AmoebaCue::Lose);
                            self.vel += velocity_jitter(ctx.rng, 0.02) * dt;
                        }
                    }
                }

                let max_speed = if *mode == AmoebaMode::Hunting { 0.8 } else { 0.4 };
                self.vel = limit(self.vel, max_speed) * 0.98;
                self.pos += self.vel * dt;
                edges::wrap(&mut self.pos, bounds, self.size);
                self.phase += 0.04 * dt;
                eaten(consumed)
            }
            Body::Euglena {
                mode,
                energy,
                cooldown,
            } => {
                let mut consumed = None;
                if light > 0.6 {
                    advance_if_permitted(mode, LightCue::Brighten);
                    *energy = (*energy + 0.02 * light * dt).min(MAX_ENERGY);
                } else {
                    advance_if_permitted(mode, LightCue::Dim);
                    *energy -= 0.05 * dt;
                }

                let speed = match mode {
                    EuglenaMode::Photosynthetic => {
                        self.vel.y -= 0.01 * dt;
                        self.heading += (clock * 0.05).sin() * 0.02;
                        0.4
                    }
                    EuglenaMode::Hunting => {
                        let food = nearest(peers, self.pos, 150.0, |p| {
                            is_food(p.kind) && ctx.is_live(p)
                        });
                        match food {
                            Some((p, d)) => {
                                let desired = (p.position.y - self.pos.y).atan2(p.position.x - self.pos.x);
                                self.heading = turn_toward(self.heading, desired, (0.08 * dt).min(1.0));
                                if d < 10.0 {
                                    *energy = (*energy + 20.0).min(MAX_ENERGY);
                                    consumed = Some(p.entity);
                                }
                            }
                            None => self.heading += jitter(ctx.rng, 0.1) * dt,
                        }
                        1.2
                    }
                };

                self.vel *= 0.95;
                self.vel += heading(self.heading) * speed * 0.1 * dt;
                self.pos += self.vel * dt;
                edges::wrap(&mut self.pos, bounds, 20.0);
                self.phase += 0.3 * dt;

                if *energy <= 0.0 {
                    return self.die(ctx);
                }
                *cooldown -= dt;
                if *energy >= MAX_ENERGY && *cooldown <= 0.0 && chance(ctx.rng, 0.01) {
                    *energy = 30.0;
                    *cooldown = 1000.0;
                    let at = self.pos + velocity_jitter(ctx.rng, 30.0);
                    let mut child = Organism::spawn(Species::Euglena, at, ctx.rng);
                    if let Body::Euglena { energy, .. } = &mut child.body {
                        *energy = 30.0;
                    }
                    ctx.spawn(child);
                }
                eaten(consumed)
            }
            Body::Rotifer { energy } => {
                let temperature = ctx.env.temperature;
                let mouth = self.pos - Vec2::new(0.0, self.size * 0.5);
                for p in peers {
                    if !is_food(p.kind) || !ctx.is_live(p) {
                        continue;
                    }
                    let d = mouth.distance(p.position);
                    if d < 60.0 && d > 5.0 {
                        let force = 0.02 * (60.0 - d) / 60.0;
                        ctx.send(p.entity, PondEffect::Pull((mouth - p.position) / d * force * dt));
                    }
                }
                let consumed = nearest(peers, mouth, 8.0, |p| is_food(p.kind) && ctx.is_live(p))
                    .map(|(p, _)| p.entity);
                if consumed.is_some() {
                    *energy = (*energy + 15.0).min(MAX_ENERGY);
                }

                self.vel += velocity_jitter(ctx.rng, 0.01) * dt;
                self.vel *= 0.98;
                self.pos += self.vel * dt * temperature;
                *energy -= 0.02 * dt;
                edges::wrap(&mut self.pos, bounds, 30.0);
                self.phase += 0.2 * dt * temperature;

                if *energy <= 0.0 {
                    return self.die(ctx);
                }
                if *energy >= MAX_ENERGY * 0.9 {
                    *energy /= 2.0;
                    let mut child = Organism::spawn(Species::Rotifer, self.pos + Vec2::new(20.0, 0.0), ctx.rng);
                    child.body = Body::Rotifer { energy: *energy };
                    ctx.spawn(child);
                }
                eaten(consumed)
            }
            Body::Hydra {
                mode,
                energy,
                contraction,
            } => {
                let mut consumed = None;
                match mode {
                    HydraMode::Contracting => {
                        *contraction -= dt;
                        if *contraction <= 0.0 {
                            advance(mode, HydraCue::Release);
                        }
                    }
                    HydraMode::Relaxed => {
                        let pos = self.pos;
                        let prey = nearest(peers, pos, self.size * 0.8, |p| {
                            matches!(
                                p.kind,
                                Species::Bacterium | Species::Paramecium | Species::Rotifer | Species::Euglena
                            ) && p.position.y < pos.y
                                && ctx.is_live(p)
                        });
                        if let Some((p, _)) = prey {
                            if advance(mode, HydraCue::Catch) {
                                *contraction = 50.0;
                                *energy = (*energy + 15.0).min(MAX_ENERGY);
                                consumed = Some(p.entity);
                            }
                        }
                    }
                }

                edges::clamp(
                    &mut self.pos,
                    Vec2::new(30.0, self.size),
                    Vec2::new(bounds.width - 30.0, bounds.height - 20.0),
                );
                *energy -= 0.01 * dt;
                self.phase += 0.04 * dt;

                if *energy <= 0.0 {
                    return self.die(ctx);
                }
                if *energy >= MAX_ENERGY * 0.95 && chance(ctx.rng, 0.005) {
                    *energy = 40.0;
                    let at = Vec2::new(self.pos.x + jitter(ctx.rng, 50.0), self.pos.y + 30.0);
                    let bud = Organism::spawn(Species::Hydra, at, ctx.rng);
                    ctx.spawn(bud);
                }
                eaten(consumed)
            }
            Body::Detritus { life, spin, .. } => {
                self.vel.y = (self.vel.y + 0.001 * dt).min(0.3);
                self.vel *= 0.99;
                self.pos += self.vel * dt;
                self.heading += *spin * dt;
                *life -= dt;
                edges::wrap(&mut self.pos, bounds, 10.0);
                if *life <= 0.0 {
                    Outcome::Expired
                } else {
                    Outcome::Idle
                }
            }
        }
    }

    fn receive(&mut self, effect: PondEffect) {
        match effect {
            PondEffect::Pull(dv) => self.vel += dv,
        }
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        let (x, y) = (self.pos.x, self.pos.y);
        match self.body {
            Body::Bacterium => {
                let r = self.size * (1.0 + self.phase.sin() * 0.1);
                out.push(Sprite::circle(x, y, r, Rgba::WHITE.with_alpha(0.5)).on_layer(1));
            }
            Body::Alga { cells, pulse } => {
                for i in 0..cells {
                    let a = self.heading + f32::from(i) * 2.1;
                    let offset = Vec2::new(a.cos(), a.sin()) * 3.0 * f32::from(i % 3);
                    let r = (3.0 + f32::from(i % 3)) * pulse;
                    out.push(Sprite::circle(x + offset.x, y + offset.y, r, Rgba::hex(0x44aa44).with_alpha(0.8)));
                    out.push(Sprite::circle(
                        x + offset.x + r * 0.3,
                        y + offset.y - r * 0.3,
                        r * 0.4,
                        Rgba::hex(0x226622).with_alpha(0.5),
                    ));
                }
            }
            Body::Paramecium { .. } => {
                let tint = Rgba::hex(0x88ccff);
                out.push(Sprite::ellipse(x, y, 40.0, 20.0, tint.with_alpha(0.15)).rotated(self.heading).on_layer(2));
                out.push(
                    Sprite::new(x, y, Shape::Ring { radius: 21.0, width: 4.0 }, tint.with_alpha(0.1)).on_layer(2),
                );
                let axis = heading(self.heading) * 15.0;
                for (i, side) in [axis, -axis].into_iter().enumerate() {
                    let r = 8.0 * (0.8 + (self.phase + i as f32).sin() * 0.2);
                    out.push(Sprite::circle(x + side.x, y + side.y, r, Rgba::WHITE.with_alpha(0.2)).on_layer(2));
                }
            }
            Body::Amoeba { mode, digestion, .. } => {
                let r = self.size * 0.5 * (1.0 + self.phase.sin() * 0.08);
                out.push(Sprite::circle(x, y, r, Rgba::hex(0x8899bb).with_alpha(0.25)).on_layer(2));
                out.push(Sprite::circle(x, y, self.size * 0.15, Rgba::hex(0x667799).with_alpha(0.5)).on_layer(2));
                if mode == AmoebaMode::Engulfing {
                    let alpha = 0.4 * (1.0 - digestion);
                    out.push(Sprite::circle(x + 4.0, y - 3.0, 6.0, Rgba::WHITE.with_alpha(alpha)).on_layer(2));
                }
            }
            Body::Euglena { mode, .. } => {
                let color = match mode {
                    EuglenaMode::Photosynthetic => Rgba::hex(0x44aa44),
                    EuglenaMode::Hunting => Rgba::hex(0x66aa66),
                };
                out.push(
                    Sprite::ellipse(x, y, self.size, self.size * 0.4, color.with_alpha(0.7))
                        .rotated(self.heading)
                        .on_layer(2),
                );
                let eye = self.pos + heading(self.heading) * self.size * 0.6;
                out.push(Sprite::circle(eye.x, eye.y, 2.0, Rgba::hex(0xff3333).with_alpha(0.9)).on_layer(2));
                let wave = (self.phase * 3.0).sin() * 3.0;
                let tail = heading(self.heading) * self.size * 0.8;
                let tip = self.pos + heading(self.heading) * self.size;
                out.push(
                    Sprite::line(tip.x, tip.y, tail.x, tail.y + wave, 1.0, Rgba::hex(0x88cc88).with_alpha(0.5))
                        .on_layer(2),
                );
            }
            Body::Rotifer { .. } => {
                let tint = Rgba::hex(0xccaa88);
                out.push(Sprite::ellipse(x, y, self.size * 0.4, self.size * 0.5, tint.with_alpha(0.4)).on_layer(2));
                let wheel = self.size * 0.3 * (1.0 + self.phase.sin() * 0.1);
                out.push(
                    Sprite::new(x, y - self.size * 0.5, Shape::Ring { radius: wheel, width: 1.5 }, tint.with_alpha(0.6))
                        .on_layer(2),
                );
                out.push(Sprite::line(x, y + self.size * 0.5, 0.0, self.size * 0.5, 2.0, tint.with_alpha(0.5)).on_layer(2));
            }
            Body::Hydra { mode, .. } => {
                let tint = Rgba::hex(0xaaddaa);
                let squeeze = if mode == HydraMode::Contracting { 0.5 } else { 1.0 };
                let height = self.size * 0.6 * squeeze;
                out.push(Sprite::ellipse(x, y - height * 0.5, self.size * 0.15, height * 0.5, tint.with_alpha(0.5)).on_layer(2));
                let reach = self.size * 0.5 * squeeze;
                for i in 0..6 {
                    let a = -std::f32::consts::FRAC_PI_2 + (i as f32 - 2.5) * 0.4 + (self.phase + i as f32).sin() * 0.3;
                    out.push(
                        Sprite::line(x, y - height, a.cos() * reach, a.sin() * reach, 1.5, tint.with_alpha(0.6))
                            .on_layer(2),
                    );
                }
            }
            Body::Detritus { points, .. } => {
                out.push(
                    Sprite::new(
                        x,
                        y,
                        Shape::Star {
                            outer: self.size,
                            inner: self.size * 0.7,
                            points,
                        },
                        Rgba::hex(0x886644).with_alpha(0.6),
                    )
                    .rotated(self.heading)
                    .on_layer(-1),
                );
            }
        }
    }
}
