use super::terrain::Ground;
use super::Nest;
use crate::behavior::{advance, StateMachine};
use crate::field::ScalarField;
use crate::sims::{between, chance, jitter};
use crate::stage::{Agent, Outcome, PeerOf, Tick};
use glam::Vec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use vivarium_data::{Rgba, Sprite};

const CHAMBER_DEPTH: i32 = 150;
const CHAMBER_RADIUS: i32 = 8;
const NURSERY_LINE: i32 = 90;
const SKY_LINE: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Caste {
    Queen,
    Worker,
    Egg,
    Larva,
    Food,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueenState {
    DigChamber,
    LayEggs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChamberDug;

impl StateMachine for QueenState {
    type Trigger = ChamberDug;
    const NAME: &'static str = "queen";
    const TABLE: &'static [(Self, ChamberDug, Self)] = &[(QueenState::DigChamber, ChamberDug, QueenState::LayEggs)];
}

/// What a worker is busy with. A dump remembers whether food is still
/// being carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Forage,
    Return,
    Dump { laden: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCue {
    PickUp,
    Deliver,
    Dig,
    Drop,
}

impl StateMachine for Task {
    type Trigger = TaskCue;
    const NAME: &'static str = "worker";
    const TABLE: &'static [(Self, TaskCue, Self)] = &[
        (Task::Forage, TaskCue::PickUp, Task::Return),
        (Task::Return, TaskCue::Deliver, Task::Forage),
        (Task::Forage, TaskCue::Dig, Task::Dump { laden: false }),
        (Task::Return, TaskCue::Dig, Task::Dump { laden: true }),
        (Task::Dump { laden: false }, TaskCue::Drop, Task::Forage),
        (Task::Dump { laden: true }, TaskCue::Drop, Task::Return),
    ];
}

impl Task {
    #[must_use]
    pub fn has_food(&self) -> bool {
        matches!(self, Task::Return | Task::Dump { laden: true })
    }

    #[must_use]
    pub fn holding_dirt(&self) -> bool {
        matches!(self, Task::Dump { .. })
    }
}

/// A worker feeds a larva.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feed;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    Queen { state: QueenState, egg_timer: u64 },
    Worker { task: Task },
    Egg { age: u32, hatch: u32 },
    Larva { age: u32, hunger: u32, pupate: u32 },
    Food,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ant {
    pub x: i32,
    pub y: i32,
    dir_x: i32,
    dir_y: i32,
    pub role: Role,
}

impl Ant {
    fn with_role(x: i32, y: i32, role: Role, rng: &mut ChaCha8Rng) -> Self {
        Self {
            x,
            y,
            dir_x: if rng.gen::<f32>() > 0.5 { 1 } else { -1 },
            dir_y: 0,
            role,
        }
    }

    pub fn queen(x: i32, y: i32, rng: &mut ChaCha8Rng) -> Self {
        Self::with_role(
            x,
            y,
            Role::Queen {
                state: QueenState::DigChamber,
                egg_timer: 0,
            },
            rng,
        )
    }

    pub fn worker(x: i32, y: i32, rng: &mut ChaCha8Rng) -> Self {
        Self::with_role(x, y, Role::Worker { task: Task::Forage }, rng)
    }

    pub fn egg(x: i32, y: i32, rng: &mut ChaCha8Rng) -> Self {
        let hatch = between(rng, 500.0, 700.0) as u32;
        Self::with_role(x, y, Role::Egg { age: 0, hatch }, rng)
    }

    pub fn larva(x: i32, y: i32, rng: &mut ChaCha8Rng) -> Self {
        let pupate = between(rng, 1000.0, 1500.0) as u32;
        Self::with_role(
            x,
            y,
            Role::Larva {
                age: 0,
                hunger: 0,
                pupate,
            },
            rng,
        )
    }

    pub fn food(x: i32, y: i32, rng: &mut ChaCha8Rng) -> Self {
        Self::with_role(x, y, Role::Food, rng)
    }

    #[must_use]
    pub fn caste(&self) -> Caste {
        match self.role {
            Role::Queen { .. } => Caste::Queen,
            Role::Worker { .. } => Caste::Worker,
            Role::Egg { .. } => Caste::Egg,
            Role::Larva { .. } => Caste::Larva,
            Role::Food => Caste::Food,
        }
    }

    /// Picks a new random heading now and then and steps along it. Ants
    /// above the sky line fall instead.
    fn wander(&mut self, nest: &mut Nest, task: &mut Option<&mut Task>, rng: &mut ChaCha8Rng) -> bool {
        if self.y < SKY_LINE {
            let (x, y) = (self.x, self.y + 1);
            return self.try_move(x, y, nest, task, rng);
        }
        if chance(rng, 0.2) {
            self.dir_x = if rng.gen::<f32>() > 0.5 { 1 } else { -1 };
        }
        if chance(rng, 0.2) {
            self.dir_y = if rng.gen::<f32>() > 0.5 { 1 } else { -1 };
        }
        let (x, y) = (self.x + self.dir_x, self.y + self.dir_y);
        self.try_move(x, y, nest, task, rng)
    }

    /// Steps into `(tx, ty)`. The queen clears whatever is there; a worker
    /// digs dirt with a 30% chance and only when its mandibles are free.
    fn try_move(&mut self, tx: i32, ty: i32, nest: &mut Nest, task: &mut Option<&mut Task>, rng: &mut ChaCha8Rng) -> bool {
        let terrain = &mut nest.terrain;
        if !terrain.is_valid(tx, ty) {
            return false;
        }
        let Some(task) = task.as_deref_mut() else {
            terrain.set(tx, ty, Ground::Air);
            self.x = tx;
            self.y = ty;
            return true;
        };

        if terrain.is_dirt(tx, ty) {
            if task.holding_dirt() || !chance(rng, 0.3) {
                return false;
            }
            terrain.set(tx, ty, Ground::Air);
            advance(task, TaskCue::Dig);
            self.x = tx;
            self.y = ty;
            return true;
        }

        self.x = tx;
        self.y = ty;
        if terrain.is_air(tx, ty + 1) && chance(rng, 0.05) {
            self.y += 1;
        }
        true
    }

    /// Moves to the strongest of the eight neighbouring air cells, or
    /// wanders when the trail is too faint.
    fn follow(&mut self, trail: Trail, nest: &mut Nest, task: &mut Option<&mut Task>, rng: &mut ChaCha8Rng) -> bool {
        let field: &ScalarField = match trail {
            Trail::Home => &nest.home,
            Trail::Food => &nest.food,
        };
        let mut best = (self.x, self.y);
        let mut max = -1.0_f32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let (tx, ty) = (self.x + dx, self.y + dy);
                if nest.terrain.is_air(tx, ty) {
                    let v = field.sample(tx as f32, ty as f32);
                    if v > max {
                        max = v;
                        best = (tx, ty);
                    }
                }
            }
        }
        if max > 0.01 {
            (self.x, self.y) = best;
            return true;
        }
        self.wander(nest, task, rng);
        false
    }

    fn rule(&mut self, ctx: &mut Tick<'_, Self>, state: &mut QueenState, egg_timer: &mut u64) {
        let nest = &mut *ctx.env;
        nest.home.deposit(self.x as f32, self.y as f32, 1.0);
        match *state {
            QueenState::DigChamber => {
                if self.y < CHAMBER_DEPTH {
                    self.dir_y = 1;
                    if chance(ctx.rng, 0.5) {
                        nest.terrain.set(self.x - 1, self.y, Ground::Air);
                    }
                    if chance(ctx.rng, 0.5) {
                        nest.terrain.set(self.x + 1, self.y, Ground::Air);
                    }
                    let (x, y) = (self.x, self.y + 1);
                    self.try_move(x, y, nest, &mut None, ctx.rng);
                } else {
                    nest.terrain.excavate(self.x, self.y, CHAMBER_RADIUS);
                    if advance(state, ChamberDug) {
                        tracing::debug!(x = self.x, y = self.y, "Royal chamber excavated");
                    }
                }
            }
            QueenState::LayEggs => {
                *egg_timer += 1;
                if *egg_timer > nest.egg_interval {
                    let x = self.x + jitter(ctx.rng, 4.0).round() as i32;
                    let egg = Ant::egg(x, self.y, ctx.rng);
                    ctx.spawn(egg);
                    *egg_timer = 0;
                    return;
                }
                if chance(ctx.rng, 0.1) {
                    self.wander(nest, &mut None, ctx.rng);
                    self.y = self.y.max(NURSERY_LINE);
                }
            }
        }
    }

    fn work(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>], task: &mut Task) -> Outcome {
        let (fx, fy) = (self.x as f32, self.y as f32);
        if task.has_food() {
            ctx.env.food.deposit(fx, fy, 0.5);
        } else {
            ctx.env.home.deposit(fx, fy, 0.1);
        }

        match *task {
            Task::Dump { .. } => {
                let nest = &mut *ctx.env;
                let on_dirt = nest.terrain.is_dirt(self.x, self.y + 1);
                if on_dirt && nest.terrain.is_air(self.x, self.y) && chance(ctx.rng, 0.8) {
                    nest.terrain.set(self.x, self.y, Ground::Dirt);
                    advance(task, TaskCue::Drop);
                    self.y -= 1;
                    return Outcome::Idle;
                }
                let mut slot = Some(task);
                if chance(ctx.rng, 0.9) {
                    let (x, y) = (self.x, self.y - 1);
                    if !self.try_move(x, y, nest, &mut slot, ctx.rng) {
                        self.wander(nest, &mut slot, ctx.rng);
                    }
                } else {
                    self.wander(nest, &mut slot, ctx.rng);
                }
                Outcome::Idle
            }
            Task::Return => {
                if self.y > NURSERY_LINE {
                    let larva = peers.iter().find(|p| {
                        p.kind == Caste::Larva
                            && ctx.is_live(p)
                            && (p.position.x - fx).abs() < 5.0
                            && (p.position.y - fy).abs() < 5.0
                    });
                    if let Some(larva) = larva.map(|p| p.entity) {
                        ctx.send(larva, Feed);
                    }
                    advance(task, TaskCue::Deliver);
                    return Outcome::Idle;
                }
                let nest = &mut *ctx.env;
                let mut slot = Some(task);
                if chance(ctx.rng, 0.8) {
                    let moved = self.follow(Trail::Home, nest, &mut slot, ctx.rng);
                    if !moved && chance(ctx.rng, 0.5) {
                        let (x, y) = (self.x, self.y + 1);
                        self.try_move(x, y, nest, &mut slot, ctx.rng);
                    }
                } else {
                    self.wander(nest, &mut slot, ctx.rng);
                }
                Outcome::Idle
            }
            Task::Forage => {
                let crumb = peers
                    .iter()
                    .find(|p| {
                        p.kind == Caste::Food
                            && ctx.is_live(p)
                            && (p.position.x - fx).abs() < 2.0
                            && (p.position.y - fy).abs() < 2.0
                    })
                    .map(|p| p.entity);
                if let Some(crumb) = crumb {
                    advance(task, TaskCue::PickUp);
                    self.dir_y = -1;
                    return Outcome::Consumed(crumb);
                }
                let nest = &mut *ctx.env;
                let mut slot = Some(task);
                if chance(ctx.rng, 0.8) {
                    self.follow(Trail::Food, nest, &mut slot, ctx.rng);
                } else {
                    self.wander(nest, &mut slot, ctx.rng);
                }
                Outcome::Idle
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trail {
    Home,
    Food,
}

impl Agent for Ant {
    type Kind = Caste;
    type Vector = Vec2;
    type Env = Nest;
    type Effect = Feed;

    fn kind(&self) -> Caste {
        self.caste()
    }

    fn position(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>]) -> Outcome {
        match self.role {
            Role::Queen {
                mut state,
                mut egg_timer,
            } => {
                self.rule(ctx, &mut state, &mut egg_timer);
                self.role = Role::Queen { state, egg_timer };
                Outcome::Idle
            }
            Role::Worker { mut task } => {
                let outcome = self.work(ctx, peers, &mut task);
                self.role = Role::Worker { task };
                outcome
            }
            Role::Egg { age, hatch } => {
                let age = age + 1;
                if age > hatch {
                    let larva = Ant::larva(self.x, self.y, ctx.rng);
                    ctx.spawn(larva);
                    return Outcome::Expired;
                }
                self.role = Role::Egg { age, hatch };
                Outcome::Idle
            }
            Role::Larva { age, hunger, pupate } => {
                let (age, hunger) = (age + 1, hunger + 1);
                ctx.env.home.deposit(self.x as f32, self.y as f32, 0.5);
                if age > pupate {
                    let worker = Ant::worker(self.x, self.y, ctx.rng);
                    ctx.spawn(worker);
                    tracing::debug!(x = self.x, y = self.y, "Larva pupated into a worker");
                    return Outcome::Expired;
                }
                self.role = Role::Larva { age, hunger, pupate };
                Outcome::Idle
            }
            Role::Food => Outcome::Idle,
        }
    }

    fn receive(&mut self, _: Feed) {
        if let Role::Larva { age, pupate, .. } = self.role {
            self.role = Role::Larva {
                age: age + 200,
                hunger: 0,
                pupate,
            };
        }
    }

    fn describe(&self, out: &mut Vec<Sprite>) {
        let (x, y) = (self.x as f32 + 0.5, self.y as f32 + 0.5);
        let sprite = match self.role {
            Role::Queen { .. } => Sprite::rect(x, y, 3.0, 3.0, Rgba::hex(0x800080)).on_layer(3),
            Role::Worker { task } => {
                let color = if task.holding_dirt() {
                    Rgba::hex(0x5d4037)
                } else if task.has_food() {
                    Rgba::hex(0x00ff00)
                } else {
                    Rgba::BLACK
                };
                Sprite::rect(x, y, 1.0, 1.0, color).on_layer(3)
            }
            Role::Egg { .. } => Sprite::rect(x, y, 1.0, 1.0, Rgba::WHITE).on_layer(1),
            Role::Larva { .. } => Sprite::rect(x + 0.5, y + 0.5, 2.0, 2.0, Rgba::hex(0xffff00)).on_layer(1),
            Role::Food => Sprite::rect(x + 0.5, y + 0.5, 2.0, 2.0, Rgba::hex(0x00ff00)).on_layer(2),
        };
        out.push(sprite);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_table() {
        assert_eq!(Task::Forage.fire(TaskCue::PickUp).unwrap(), Task::Return);
        assert_eq!(Task::Return.fire(TaskCue::Dig).unwrap(), Task::Dump { laden: true });
        assert_eq!(Task::Dump { laden: true }.fire(TaskCue::Drop).unwrap(), Task::Return);
        assert!(Task::Dump { laden: false }.fire(TaskCue::Dig).is_err());
        assert!(Task::Forage.fire(TaskCue::Deliver).is_err());
        assert!(QueenState::LayEggs.fire(ChamberDug).is_err());
    }

    #[test]
    fn test_carry_flags() {
        assert!(Task::Dump { laden: true }.has_food());
        assert!(Task::Dump { laden: false }.holding_dirt());
        assert!(!Task::Forage.has_food());
    }
}
