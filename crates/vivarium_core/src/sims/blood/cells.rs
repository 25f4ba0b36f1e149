use super::VesselEnv;
use crate::behavior::{advance, advance_if_permitted, StateMachine};
use crate::edges;
use crate::sims::{chance, jitter};
use crate::stage::{Agent, Outcome, PeerOf, Tick};
use crate::steering::{integrate, nearest, seek};
use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vivarium_data::{Rgba, Shape, Sprite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    RedCell,
    WhiteCell,
    Platelet,
    /// A platelet stuck in a damage zone
    Clot,
    Pathogen,
    Cholesterol,
    /// Stuck cholesterol large enough to obstruct flow
    Plaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lineage {
    Neutrophil,
    Lymphocyte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strain {
    Bacterium,
    Virus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateletState {
    Inactive,
    Active,
    Clumping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateletCue {
    Touch,
    Clump,
    Release,
    Respawn,
}

impl StateMachine for PlateletState {
    type Trigger = PlateletCue;
    const NAME: &'static str = "platelet";
    const TABLE: &'static [(Self, PlateletCue, Self)] = &[
        (PlateletState::Inactive, PlateletCue::Touch, PlateletState::Active),
        (PlateletState::Active, PlateletCue::Clump, PlateletState::Clumping),
        (PlateletState::Clumping, PlateletCue::Release, PlateletState::Active),
        (PlateletState::Inactive, PlateletCue::Respawn, PlateletState::Inactive),
        (PlateletState::Active, PlateletCue::Respawn, PlateletState::Inactive),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathogenState {
    Free,
    Engulfed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engulf {
    Caught,
}

impl StateMachine for PathogenState {
    type Trigger = Engulf;
    const NAME: &'static str = "pathogen";
    const TABLE: &'static [(Self, Engulf, Self)] = &[(PathogenState::Free, Engulf::Caught, PathogenState::Engulfed)];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaqueState {
    Drifting,
    Stuck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adhere {
    Stick,
}

impl StateMachine for PlaqueState {
    type Trigger = Adhere;
    const NAME: &'static str = "cholesterol";
    const TABLE: &'static [(Self, Adhere, Self)] = &[(PlaqueState::Drifting, Adhere::Stick, PlaqueState::Stuck)];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellBody {
    Red {
        stretch: f32,
    },
    White {
        lineage: Lineage,
        offset: f32,
    },
    Platelet {
        state: PlateletState,
        zone: Option<u64>,
    },
    Pathogen {
        strain: Strain,
        state: PathogenState,
        progress: f32,
    },
    Cholesterol {
        state: PlaqueState,
        stuck_for: f32,
        size: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub pos: Vec2,
    pub vel: Vec2,
    pub angle: f32,
    spin: f32,
    scale: f32,
    phase: f32,
    pub body: CellBody,
}

/// Plug speed at `y`: `k * (1 - n²)` floored, plus the normalized distance `n`.
fn parabolic(env: &VesselEnv, y: f32, k: f32, floor: f32) -> (f32, f32) {
    let n = ((y - env.center).abs() / env.radius.max(f32::EPSILON)).min(1.0);
    ((k * (1.0 - n * n)).max(floor), n)
}

impl Cell {
    fn with_body(pos: Vec2, rng: &mut ChaCha8Rng, scale: f32, body: CellBody) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            angle: crate::sims::angle(rng),
            spin: 0.0,
            scale,
            phase: crate::sims::angle(rng),
            body,
        }
    }

    pub fn red(pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let scale = 0.8 + rng.gen::<f32>() * 0.4;
        Self::with_body(pos, rng, scale, CellBody::Red { stretch: 1.0 })
    }

    pub fn white(pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let lineage = if rng.gen::<f32>() > 0.7 {
            Lineage::Lymphocyte
        } else {
            Lineage::Neutrophil
        };
        let offset = rng.gen::<f32>() * 100.0;
        Self::with_body(pos, rng, 1.0, CellBody::White { lineage, offset })
    }

    pub fn platelet(pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let scale = 0.3 + rng.gen::<f32>() * 0.2;
        Self::with_body(
            pos,
            rng,
            scale,
            CellBody::Platelet {
                state: PlateletState::Inactive,
                zone: None,
            },
        )
    }

    pub fn pathogen(pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let strain = if rng.gen::<f32>() > 0.5 {
            Strain::Bacterium
        } else {
            Strain::Virus
        };
        let scale = match strain {
            Strain::Bacterium => 0.8,
            Strain::Virus => 0.5,
        };
        let mut cell = Self::with_body(
            pos,
            rng,
            scale,
            CellBody::Pathogen {
                strain,
                state: PathogenState::Free,
                progress: 0.0,
            },
        );
        cell.vel = Vec2::new(jitter(rng, 2.0), jitter(rng, 2.0));
        cell
    }

    pub fn cholesterol(pos: Vec2, rng: &mut ChaCha8Rng) -> Self {
        let size = 4.0 + rng.gen::<f32>() * 4.0;
        let mut cell = Self::with_body(
            pos,
            rng,
            1.0,
            CellBody::Cholesterol {
                state: PlaqueState::Drifting,
                stuck_for: 0.0,
                size,
            },
        );
        cell.vel = Vec2::new(jitter(rng, 0.5), jitter(rng, 0.5));
        cell
    }

    #[must_use]
    pub fn cell_kind(&self) -> CellKind {
        match self.body {
            CellBody::Red { .. } => CellKind::RedCell,
            CellBody::White { .. } => CellKind::WhiteCell,
            CellBody::Platelet {
                state: PlateletState::Clumping,
                ..
            } => CellKind::Clot,
            CellBody::Platelet { .. } => CellKind::Platelet,
            CellBody::Pathogen { .. } => CellKind::Pathogen,
            CellBody::Cholesterol {
                state: PlaqueState::Stuck,
                size,
                ..
            } if size >= 6.0 => CellKind::Plaque,
            CellBody::Cholesterol { .. } => CellKind::Cholesterol,
        }
    }

    /// Re-enters at the inlet at a fresh height within `spread` of the radius.
    fn reenter(&mut self, env: &VesselEnv, x: f32, spread: f32, rng: &mut ChaCha8Rng) {
        self.pos.x = x;
        self.pos.y = env.center + jitter(rng, 2.0) * env.radius * spread;
    }
}

impl Agent for Cell {
    type Kind = CellKind;
    type Vector = Vec2;
    type Env = VesselEnv;
    type Effect = ();

    fn kind(&self) -> CellKind {
        self.cell_kind()
    }

    fn position(&self) -> Vec2 {
        self.pos
    }

    fn velocity(&self) -> Vec2 {
        self.vel
    }

    fn size(&self) -> f32 {
        match self.body {
            CellBody::Cholesterol { size, .. } => size,
            _ => self.scale * 15.0,
        }
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>]) -> Outcome {
        let dt = ctx.dt;
        let width = ctx.bounds.width;
        let flow = ctx.env.current_flow;
        let (top, bottom) = (ctx.env.center - ctx.env.radius, ctx.env.center + ctx.env.radius);

        match &mut self.body {
            CellBody::Red { stretch } => {
                let (speed, n) = parabolic(ctx.env, self.pos.y, 6.0, 0.5);
                let mut slowdown: f32 = 1.0;
                for p in peers {
                    match p.kind {
                        CellKind::Clot if (p.position.x - self.pos.x).abs() < 30.0 => {
                            let away = self.pos - p.position;
                            let d = away.length();
                            if d < 22.0 && d > f32::EPSILON {
                                self.pos += away / d * (22.0 - d) * 0.2;
                                slowdown = 0.1;
                                self.spin += jitter(ctx.rng, 0.5);
                            }
                        }
                        CellKind::Plaque => {
                            let away = self.pos - p.position;
                            let d = away.length();
                            let reach = p.size + 10.0;
                            if d < reach && d > f32::EPSILON {
                                self.pos += away / d * (reach - d) * 0.1;
                                slowdown = slowdown.min(0.5);
                            }
                        }
                        _ => {}
                    }
                }
                self.pos.x += speed * flow * dt * slowdown;
                self.spin += n * 0.1 * 0.05 * flow;
                self.spin *= 0.95;
                self.angle += self.spin * dt;
                *stretch = 1.0 + speed * flow * 0.05;
                if self.pos.x > width + 50.0 {
                    let env = &*ctx.env;
                    self.reenter(env, -50.0, 0.9, ctx.rng);
                }
                Outcome::Idle
            }
            CellBody::White { lineage, offset } => {
                let n = ((self.pos.y - ctx.env.center).abs() / ctx.env.radius.max(f32::EPSILON)).min(1.0);
                if *lineage == Lineage::Neutrophil {
                    let outward = if self.pos.y < ctx.env.center { -1.0 } else { 1.0 };
                    self.pos.y += outward * 0.2 * dt;
                }

                let target = nearest(peers, self.pos, 120.0, |p| p.kind == CellKind::Pathogen && ctx.is_live(p))
                    .map(|(p, _)| p.position);
                match target {
                    Some(at) => {
                        let force = seek(self.pos, self.vel, at, 1.5, 0.1);
                        integrate(&mut self.vel, force, 1.5);
                    }
                    None => self.vel *= 0.9,
                }
                self.pos += self.vel * dt;
                self.pos.y = self.pos.y.clamp(top + 20.0, (bottom - 20.0).max(top + 20.0));

                let mut speed = 6.0 * (1.0 - n * n);
                if *lineage == Lineage::Neutrophil && n > 0.8 {
                    speed *= 0.3;
                    self.angle += 0.05 * dt;
                } else {
                    self.angle = (*offset + self.pos.x * 0.01).sin() * 0.2;
                }
                self.pos.x += speed.max(0.2) * flow * dt;

                if self.pos.x > width + 60.0 {
                    let env = &*ctx.env;
                    self.reenter(env, -60.0, 0.9, ctx.rng);
                }
                Outcome::Idle
            }
            CellBody::Platelet { state, zone } => {
                if *state == PlateletState::Clumping {
                    let zone_open = zone.is_some_and(|id| ctx.env.zones.iter().any(|z| z.id == id));
                    if zone_open {
                        self.pos += Vec2::new(jitter(ctx.rng, 0.5), jitter(ctx.rng, 0.5));
                        return Outcome::Idle;
                    }
                    advance(state, PlateletCue::Release);
                    *zone = None;
                }

                let (speed, n) = parabolic(ctx.env, self.pos.y, 6.5, 0.5);
                self.pos.x += speed * flow * dt;
                self.angle += n * 0.2 * flow * dt;

                if let Some(hit) = ctx.env.zone_at(self.pos) {
                    advance_if_permitted(state, PlateletCue::Touch);
                    if advance(state, PlateletCue::Clump) {
                        *zone = Some(hit);
                    }
                }

                if self.pos.x > width + 50.0 {
                    advance(state, PlateletCue::Respawn);
                    let env = &*ctx.env;
                    self.reenter(env, -50.0, 0.9, ctx.rng);
                }
                Outcome::Idle
            }
            CellBody::Pathogen { state, progress, .. } => {
                if *state == PathogenState::Engulfed {
                    *progress += 0.02 * dt;
                    if *progress >= 1.0 {
                        tracing::debug!(tick = ctx.tick, "Pathogen destroyed");
                        return Outcome::Expired;
                    }
                    return Outcome::Idle;
                }

                self.vel += Vec2::new(jitter(ctx.rng, 0.3), jitter(ctx.rng, 0.3));
                self.vel *= 0.95;
                let (speed, _) = parabolic(ctx.env, self.pos.y, 5.0, 0.3);
                self.pos.x += (speed * flow * 0.5 + self.vel.x) * dt;
                self.pos.y += self.vel.y * dt;
                edges::bounce(&mut self.pos.y, &mut self.vel.y, top + 20.0, bottom - 20.0, 0.5);
                self.phase += 0.1 * dt;
                self.angle += 0.02 * dt;

                let caught = nearest(peers, self.pos, 25.0, |p| p.kind == CellKind::WhiteCell).is_some();
                if caught && advance(state, Engulf::Caught) {
                    *progress = 0.0;
                    return Outcome::Idle;
                }

                if self.pos.x > width + 50.0 {
                    let env = &*ctx.env;
                    self.reenter(env, -50.0, 0.8, ctx.rng);
                } else if self.pos.x < -60.0 {
                    self.pos.x = width + 40.0;
                }
                Outcome::Idle
            }
            CellBody::Cholesterol { state, stuck_for, size } => {
                if *state == PlaqueState::Stuck {
                    *stuck_for += dt;
                    self.phase += 0.02 * dt;
                    if *stuck_for > 500.0 && *size < 12.0 {
                        *size = (*size + 0.001 * dt).min(12.0);
                    }
                    return Outcome::Idle;
                }

                let (speed, _) = parabolic(ctx.env, self.pos.y, 5.0, 0.3);
                let outward = if self.pos.y < ctx.env.center { -1.0 } else { 1.0 };
                self.vel.y += outward * 0.01 * dt;
                self.vel *= 0.98;
                self.pos.x += (speed * flow * 0.6 + self.vel.x) * dt;
                self.pos.y += self.vel.y * dt;

                let near_wall = self.pos.y < top + 30.0 || self.pos.y > bottom - 30.0;
                if near_wall && chance(ctx.rng, 0.02) && advance(state, Adhere::Stick) {
                    let inset = 15.0 + ctx.rng.gen::<f32>() * 10.0;
                    self.pos.y = if self.pos.y < ctx.env.center { top + inset } else { bottom - inset };
                    self.vel = Vec2::ZERO;
                    tracing::debug!(x = self.pos.x, "Cholesterol stuck to the wall");
                    return Outcome::Idle;
                }

                edges::bounce(&mut self.pos.y, &mut self.vel.y, top + 10.0, bottom - 10.0, 0.5);
                if self.pos.x > width + 30.0 {
                    let env = &*ctx.env;
                    self.reenter(env, -30.0, 0.8, ctx.rng);
                }
                Outcome::Idle
            }
        }
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        let (x, y) = (self.pos.x, self.pos.y);
        match self.body {
            CellBody::Red { stretch } => {
                let r = 15.0 * self.scale;
                out.push(
                    Sprite::ellipse(x, y, r * stretch, r / stretch, Rgba::hex(0xcc2222).with_alpha(0.95))
                        .rotated(self.angle)
                        .on_layer(1),
                );
                out.push(Sprite::circle(x, y, r * 0.4, Rgba::hex(0x991111).with_alpha(0.6)).on_layer(1));
            }
            CellBody::White { lineage, .. } => {
                let (r, nucleus, tint) = match lineage {
                    Lineage::Neutrophil => (20.0, 0.35, Rgba::hex(0x8a6fb5)),
                    Lineage::Lymphocyte => (14.0, 0.7, Rgba::hex(0x5a3f99)),
                };
                out.push(Sprite::circle(x, y, r, Rgba::hex(0xf0f0ff).with_alpha(0.9)).on_layer(2));
                if lineage == Lineage::Neutrophil {
                    for i in 0..3 {
                        let a = self.angle + i as f32 * 2.1;
                        out.push(
                            Sprite::circle(x + a.cos() * 6.0, y + a.sin() * 6.0, r * nucleus, tint.with_alpha(0.8))
                                .on_layer(2),
                        );
                    }
                } else {
                    out.push(Sprite::circle(x, y, r * nucleus, tint.with_alpha(0.8)).on_layer(2));
                }
            }
            CellBody::Platelet { state, .. } => {
                let sprite = match state {
                    PlateletState::Inactive => Sprite::ellipse(
                        x,
                        y,
                        14.0 * self.scale,
                        7.0 * self.scale,
                        Rgba::hex(0xffd27f).with_alpha(0.8),
                    ),
                    PlateletState::Active | PlateletState::Clumping => Sprite::new(
                        x,
                        y,
                        Shape::Star {
                            outer: 12.0 * self.scale,
                            inner: 5.0 * self.scale,
                            points: 5,
                        },
                        Rgba::hex(0xffaa33).with_alpha(0.9),
                    ),
                };
                out.push(sprite.rotated(self.angle));
            }
            CellBody::Pathogen { strain, progress, .. } => {
                let alpha = (1.0 - progress).clamp(0.0, 1.0);
                let k = self.scale * (1.0 - progress * 0.5) * (1.0 + self.phase.sin() * 0.1);
                let sprite = match strain {
                    Strain::Bacterium => Sprite::rect(x, y, 24.0 * k, 10.0 * k, Rgba::hex(0x4caf50).with_alpha(alpha)),
                    Strain::Virus => Sprite::new(
                        x,
                        y,
                        Shape::Star {
                            outer: 14.0 * k,
                            inner: 8.0 * k,
                            points: 12,
                        },
                        Rgba::hex(0x9c27b0).with_alpha(alpha),
                    ),
                };
                out.push(sprite.rotated(self.angle).on_layer(2));
            }
            CellBody::Cholesterol { size, state, .. } => {
                let (dx, dy) = match state {
                    PlaqueState::Stuck => (self.phase.sin() * 0.5, (self.phase * 0.7).cos() * 0.3),
                    PlaqueState::Drifting => (0.0, 0.0),
                };
                out.push(Sprite::circle(x + dx, y + dy, size, Rgba::hex(0xffeb99).with_alpha(0.9)).on_layer(1));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platelet_cannot_clump_before_activation() {
        assert!(PlateletState::Inactive.fire(PlateletCue::Clump).is_err());
        assert!(PlateletState::Clumping.fire(PlateletCue::Respawn).is_err());
        assert_eq!(
            PlateletState::Clumping.fire(PlateletCue::Release).unwrap(),
            PlateletState::Active
        );
    }

    #[test]
    fn test_engulfment_is_one_way() {
        assert!(PathogenState::Engulfed.fire(Engulf::Caught).is_err());
        assert!(PlaqueState::Stuck.fire(Adhere::Stick).is_err());
    }

    #[test]
    fn test_stuck_large_cholesterol_is_plaque() {
        let mut rng = <ChaCha8Rng as rand::SeedableRng>::seed_from_u64(1);
        let mut cell = Cell::cholesterol(Vec2::ZERO, &mut rng);
        cell.body = CellBody::Cholesterol {
            state: PlaqueState::Stuck,
            stuck_for: 0.0,
            size: 7.0,
        };
        assert_eq!(cell.cell_kind(), CellKind::Plaque);
        cell.body = CellBody::Cholesterol {
            state: PlaqueState::Drifting,
            stuck_for: 0.0,
            size: 7.0,
        };
        assert_eq!(cell.cell_kind(), CellKind::Cholesterol);
    }
}
