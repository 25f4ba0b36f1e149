//! The frame loop shared by every simulation.
//!
//! A [`Stage`] owns the live agents of one simulation in a `hecs::World`,
//! the environment they share and the seeded RNG that drives every
//! probabilistic branch. Each [`Stage::step`]:
//!
//! 1. advances the environment,
//! 2. snapshots every agent as a [`Peer`] in spawn order,
//! 3. updates each agent that is still live, collecting its [`Outcome`],
//! 4. despawns consumed and expired agents,
//! 5. delivers queued effects to the survivors,
//! 6. spawns queued agents while under capacity.
//!
//! Handles are generational, so removing one agent can never remove or skip
//! an unrelated one, and a stale handle simply misses.

use crate::steering::SteerVector;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use vivarium_data::{Bounds, Sprite};

/// Shared state of one simulation that agents read and write.
pub trait Environment: Send + Sync + 'static {
    /// Called once at the start of every tick.
    fn advance(&mut self, _dt: f32, _rng: &mut ChaCha8Rng) {}
}

impl Environment for () {}

/// What an agent asks the stage to do with it after its update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Idle,
    /// The agent consumed or destroyed this peer.
    Consumed(hecs::Entity),
    /// The agent is done (death, decomposition, lifetime expiry).
    Expired,
}

pub trait Agent: Send + Sync + Sized + 'static {
    type Kind: Copy + PartialEq + fmt::Debug + Send + Sync + 'static;
    type Vector: SteerVector;
    type Env: Environment;
    type Effect: Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
    fn position(&self) -> Self::Vector;

    fn velocity(&self) -> Self::Vector {
        Self::Vector::ZERO
    }

    fn size(&self) -> f32 {
        1.0
    }

    fn update(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>]) -> Outcome;

    /// Applies an effect another agent queued for this one.
    fn receive(&mut self, _effect: Self::Effect) {}

    /// Appends the sprites that draw this agent.
    fn describe(&self, out: &mut Vec<Sprite>);
}

/// Read-only snapshot of an agent taken at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peer<K, V> {
    pub entity: hecs::Entity,
    pub serial: u64,
    pub kind: K,
    pub position: V,
    pub velocity: V,
    pub size: f32,
}

pub type PeerOf<A> = Peer<<A as Agent>::Kind, <A as Agent>::Vector>;

/// Spawn-order key; keeps iteration stable across despawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Serial(pub u64);

/// Per-agent view of the running tick.
pub struct Tick<'a, A: Agent> {
    pub dt: f32,
    pub tick: u64,
    pub bounds: Bounds,
    /// Handle of the agent being updated.
    pub me: hecs::Entity,
    pub env: &'a mut A::Env,
    pub rng: &'a mut ChaCha8Rng,
    gone: &'a HashSet<hecs::Entity>,
    spawns: &'a mut Vec<A>,
    effects: &'a mut Vec<(hecs::Entity, A::Effect)>,
}

impl<A: Agent> Tick<'_, A> {
    /// Queues a new agent; it appears after this tick's removals.
    pub fn spawn(&mut self, agent: A) {
        self.spawns.push(agent);
    }

    /// Queues an effect for `target`, delivered if it survives the tick.
    pub fn send(&mut self, target: hecs::Entity, effect: A::Effect) {
        self.effects.push((target, effect));
    }

    /// True for peers other than the caller that have not been removed yet.
    #[must_use]
    pub fn is_live(&self, peer: &PeerOf<A>) -> bool {
        peer.entity != self.me && !self.gone.contains(&peer.entity)
    }
}

/// Structural changes made by one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub updated: usize,
    pub consumed: usize,
    pub expired: usize,
    pub spawned: usize,
    pub dropped: usize,
    pub effects: usize,
}

impl TickReport {
    #[must_use]
    pub fn removed(&self) -> usize {
        self.consumed + self.expired
    }

    /// Folds another report into this one; used for substeps.
    pub fn absorb(&mut self, other: TickReport) {
        self.tick = self.tick.max(other.tick);
        self.updated += other.updated;
        self.consumed += other.consumed;
        self.expired += other.expired;
        self.spawned += other.spawned;
        self.dropped += other.dropped;
        self.effects += other.effects;
    }
}

pub struct Stage<A: Agent> {
    world: hecs::World,
    env: A::Env,
    bounds: Bounds,
    rng: ChaCha8Rng,
    tick: u64,
    next_serial: u64,
    capacity: usize,
    peers: Vec<PeerOf<A>>,
    gone: HashSet<hecs::Entity>,
    spawns: Vec<A>,
    effects: Vec<(hecs::Entity, A::Effect)>,
}

impl<A: Agent> Stage<A> {
    #[must_use]
    pub fn new(bounds: Bounds, env: A::Env, seed: u64, capacity: usize) -> Self {
        Self {
            world: hecs::World::new(),
            env,
            bounds,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
            next_serial: 0,
            capacity,
            peers: Vec::new(),
            gone: HashSet::new(),
            spawns: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Adds an agent immediately. Returns `None` when the stage is full.
    pub fn spawn(&mut self, agent: A) -> Option<hecs::Entity> {
        if self.len() >= self.capacity {
            return None;
        }
        let serial = Serial(self.next_serial);
        self.next_serial += 1;
        Some(self.world.spawn((serial, agent)))
    }

    /// Builds agents with the stage RNG and spawns them.
    pub fn populate<F>(&mut self, count: usize, mut make: F) -> usize
    where
        F: FnMut(&mut ChaCha8Rng, Bounds) -> A,
    {
        let mut spawned = 0;
        for _ in 0..count {
            let agent = make(&mut self.rng, self.bounds);
            if self.spawn(agent).is_none() {
                break;
            }
            spawned += 1;
        }
        spawned
    }

    pub fn despawn(&mut self, entity: hecs::Entity) -> bool {
        self.world.despawn(entity).is_ok()
    }

    #[must_use]
    pub fn contains(&self, entity: hecs::Entity) -> bool {
        self.world.contains(entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    #[must_use]
    pub fn count(&self, kind: A::Kind) -> usize {
        self.count_where(|a| a.kind() == kind)
    }

    #[must_use]
    pub fn count_where<F: FnMut(&A) -> bool>(&self, mut pred: F) -> usize {
        let mut query = self.world.query::<&A>();
        let n = query.iter().filter(|(_, a)| pred(a)).count();
        n
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn env(&self) -> &A::Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut A::Env {
        &mut self.env
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Environment and RNG together, for tools that randomize env edits.
    pub fn env_and_rng(&mut self) -> (&mut A::Env, &mut ChaCha8Rng) {
        (&mut self.env, &mut self.rng)
    }

    /// Visits agents in spawn order.
    pub fn for_each<F: FnMut(hecs::Entity, &A)>(&self, mut f: F) {
        let mut query = self.world.query::<(&Serial, &A)>();
        let mut agents: Vec<_> = query.iter().collect();
        agents.sort_by_key(|(_, (serial, _))| **serial);
        for (entity, (_, agent)) in agents {
            f(entity, agent);
        }
    }

    /// Mutates every agent, with access to the environment and RNG.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut A, &mut A::Env, &mut ChaCha8Rng),
    {
        for (_, agent) in self.world.query_mut::<&mut A>() {
            f(agent, &mut self.env, &mut self.rng);
        }
    }

    /// Sprites of all agents in spawn order.
    #[must_use]
    pub fn sprites(&self) -> Vec<Sprite> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each(|_, agent| agent.describe(&mut out));
        out
    }

    fn capture_peers(&mut self) -> Vec<PeerOf<A>> {
        let mut peers = std::mem::take(&mut self.peers);
        peers.clear();
        peers.extend(
            self.world
                .query::<(&Serial, &A)>()
                .iter()
                .map(|(entity, (serial, agent))| Peer {
                    entity,
                    serial: serial.0,
                    kind: agent.kind(),
                    position: agent.position(),
                    velocity: agent.velocity(),
                    size: agent.size(),
                }),
        );
        peers.sort_by_key(|p| p.serial);
        peers
    }

    pub fn step(&mut self, dt: f32) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        self.env.advance(dt, &mut self.rng);

        let peers = self.capture_peers();
        self.gone.clear();

        for peer in &peers {
            if self.gone.contains(&peer.entity) {
                continue;
            }
            let Ok(agent) = self.world.query_one_mut::<&mut A>(peer.entity) else {
                continue;
            };
            let outcome = {
                let mut ctx = Tick {
                    dt,
                    tick: self.tick,
                    bounds: self.bounds,
                    me: peer.entity,
                    env: &mut self.env,
                    rng: &mut self.rng,
                    gone: &self.gone,
                    spawns: &mut self.spawns,
                    effects: &mut self.effects,
                };
                agent.update(&mut ctx, &peers)
            };
            report.updated += 1;

            match outcome {
                Outcome::Idle => {}
                Outcome::Consumed(target) => {
                    if target != peer.entity && self.world.contains(target) && self.gone.insert(target) {
                        report.consumed += 1;
                    }
                }
                Outcome::Expired => {
                    if self.gone.insert(peer.entity) {
                        report.expired += 1;
                    }
                }
            }
        }

        for entity in self.gone.drain() {
            let _ = self.world.despawn(entity);
        }

        for (target, effect) in self.effects.drain(..) {
            if let Ok(agent) = self.world.query_one_mut::<&mut A>(target) {
                agent.receive(effect);
                report.effects += 1;
            }
        }

        let pending = std::mem::take(&mut self.spawns);
        for agent in pending {
            if self.spawn(agent).is_some() {
                report.spawned += 1;
            } else {
                report.dropped += 1;
            }
        }
        if report.dropped > 0 {
            tracing::debug!(dropped = report.dropped, capacity = self.capacity, "Stage at capacity");
        }

        self.peers = peers;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Role {
        Eater,
        Food,
        Mortal,
        Breeder,
    }

    struct Dot {
        role: Role,
        pos: Vec2,
        ttl: u32,
        bumped: u32,
    }

    impl Dot {
        fn new(role: Role, x: f32) -> Self {
            Self {
                role,
                pos: Vec2::new(x, 0.0),
                ttl: 1,
                bumped: 0,
            }
        }
    }

    impl Agent for Dot {
        type Kind = Role;
        type Vector = Vec2;
        type Env = ();
        type Effect = u32;

        fn kind(&self) -> Role {
            self.role
        }

        fn position(&self) -> Vec2 {
            self.pos
        }

        fn update(&mut self, ctx: &mut Tick<'_, Self>, peers: &[PeerOf<Self>]) -> Outcome {
            match self.role {
                Role::Eater => {
                    let origin = self.pos;
                    match crate::steering::nearest(peers, origin, 1.5, |p| {
                        p.kind == Role::Food && ctx.is_live(p)
                    }) {
                        Some((food, _)) => Outcome::Consumed(food.entity),
                        None => Outcome::Idle,
                    }
                }
                Role::Mortal => {
                    if self.ttl == 0 {
                        Outcome::Expired
                    } else {
                        self.ttl -= 1;
                        Outcome::Idle
                    }
                }
                Role::Breeder => {
                    ctx.spawn(Dot::new(Role::Food, self.pos.x + 100.0));
                    let targets: Vec<_> = peers.iter().filter(|p| ctx.is_live(p)).map(|p| p.entity).collect();
                    for target in targets {
                        ctx.send(target, 1);
                    }
                    Outcome::Idle
                }
                Role::Food => Outcome::Idle,
            }
        }

        fn receive(&mut self, effect: u32) {
            self.bumped += effect;
        }

        fn describe(&self, out: &mut Vec<Sprite>) {
            out.push(Sprite::circle(self.pos.x, self.pos.y, 1.0, vivarium_data::Rgba::WHITE));
        }
    }

    fn stage() -> Stage<Dot> {
        Stage::new(Bounds::new(100.0, 100.0), (), 7, 64)
    }

    #[test]
    fn test_consumed_peer_is_removed_once() {
        let mut stage = stage();
        stage.spawn(Dot::new(Role::Eater, 0.0));
        stage.spawn(Dot::new(Role::Eater, 0.5));
        let food = stage.spawn(Dot::new(Role::Food, 1.0)).unwrap();
        let far = stage.spawn(Dot::new(Role::Food, 50.0)).unwrap();

        let report = stage.step(1.0);
        assert_eq!(report.consumed, 1);
        assert!(!stage.contains(food));
        assert!(stage.contains(far));
        assert_eq!(stage.len(), 3);
    }

    #[test]
    fn test_expired_after_ttl() {
        let mut stage = stage();
        let mortal = stage.spawn(Dot::new(Role::Mortal, 0.0)).unwrap();
        assert_eq!(stage.step(1.0).expired, 0);
        assert_eq!(stage.step(1.0).expired, 1);
        assert!(!stage.contains(mortal));
        assert!(stage.is_empty());
    }

    #[test]
    fn test_spawns_and_effects_apply_after_updates() {
        let mut stage = stage();
        stage.spawn(Dot::new(Role::Breeder, 0.0));
        let food = stage.spawn(Dot::new(Role::Food, 10.0)).unwrap();
        let report = stage.step(1.0);
        assert_eq!(report.spawned, 1);
        assert_eq!(report.effects, 1);
        assert_eq!(stage.len(), 3);
        let mut bumped = 0;
        stage.for_each(|e, d| {
            if e == food {
                bumped = d.bumped;
            }
        });
        assert_eq!(bumped, 1);
    }

    #[test]
    fn test_capacity_drops_excess_spawns() {
        let mut stage: Stage<Dot> = Stage::new(Bounds::new(10.0, 10.0), (), 1, 2);
        stage.spawn(Dot::new(Role::Breeder, 0.0));
        stage.spawn(Dot::new(Role::Food, 5.0));
        assert!(stage.spawn(Dot::new(Role::Food, 6.0)).is_none());
        let report = stage.step(1.0);
        assert_eq!(report.spawned, 0);
        assert_eq!(report.dropped, 1);
        assert_eq!(stage.len(), 2);
    }

    #[test]
    fn test_for_each_is_spawn_ordered() {
        let mut stage = stage();
        for i in 0..10 {
            stage.spawn(Dot::new(Role::Food, i as f32));
        }
        let mut xs = Vec::new();
        stage.for_each(|_, d| xs.push(d.pos.x as i32));
        assert_eq!(xs, (0..10).collect::<Vec<_>>());
        assert_eq!(stage.sprites().len(), 10);
    }
}
