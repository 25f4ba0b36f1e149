//! Seek/flee/align steering shared by every moving agent.
//!
//! All helpers are generic over [`SteerVector`], implemented for
//! `glam::Vec2` and `glam::Vec3`, so the flat pond and the 3D aquarium use
//! the same controller.

use crate::stage::Peer;
use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

pub trait SteerVector:
    Copy
    + Default
    + PartialEq
    + fmt::Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f32, Output = Self>
    + Div<f32, Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;

    fn length(self) -> f32;
    fn length_squared(self) -> f32;
    fn distance(self, other: Self) -> f32;
    fn normalize_or_zero(self) -> Self;
    fn clamp_length_max(self, max: f32) -> Self;
}

macro_rules! impl_steer_vector {
    ($($t:ty),*) => {
        $(
            impl SteerVector for $t {
                const ZERO: Self = <$t>::ZERO;

                #[inline]
                fn length(self) -> f32 {
                    <$t>::length(self)
                }

                #[inline]
                fn length_squared(self) -> f32 {
                    <$t>::length_squared(self)
                }

                #[inline]
                fn distance(self, other: Self) -> f32 {
                    <$t>::distance(self, other)
                }

                #[inline]
                fn normalize_or_zero(self) -> Self {
                    <$t>::normalize_or_zero(self)
                }

                #[inline]
                fn clamp_length_max(self, max: f32) -> Self {
                    <$t>::clamp_length_max(self, max.max(0.0))
                }
            }
        )*
    };
}

impl_steer_vector!(Vec2, Vec3);

/// Clamps the magnitude of `v` to `max`.
#[inline]
pub fn limit<V: SteerVector>(v: V, max: f32) -> V {
    v.clamp_length_max(max)
}

/// Steering force toward `target`: `(desired - velocity)` clamped to `max_force`.
pub fn seek<V: SteerVector>(position: V, velocity: V, target: V, max_speed: f32, max_force: f32) -> V {
    let desired = (target - position).normalize_or_zero() * max_speed;
    limit(desired - velocity, max_force)
}

/// Steering force away from `threat`.
pub fn flee<V: SteerVector>(position: V, velocity: V, threat: V, max_speed: f32, max_force: f32) -> V {
    let desired = (position - threat).normalize_or_zero() * max_speed;
    limit(desired - velocity, max_force)
}

/// Adds `acceleration` to `velocity` and caps the result at `max_speed`.
#[inline]
pub fn integrate<V: SteerVector>(velocity: &mut V, acceleration: V, max_speed: f32) {
    *velocity = limit(*velocity + acceleration, max_speed);
}

/// Closest accepted peer strictly inside `radius`.
///
/// Ties keep the first peer encountered; there is no secondary key.
pub fn nearest<'p, K, V, F>(peers: &'p [Peer<K, V>], origin: V, radius: f32, mut accept: F) -> Option<(&'p Peer<K, V>, f32)>
where
    V: SteerVector,
    F: FnMut(&Peer<K, V>) -> bool,
{
    let mut best = None;
    let mut best_distance = radius;
    for peer in peers {
        if !accept(peer) {
            continue;
        }
        let d = origin.distance(peer.position);
        if d < best_distance {
            best_distance = d;
            best = Some(peer);
        }
    }
    best.map(|p| (p, best_distance))
}

/// Wraps an angle difference into `[-PI, PI]`.
#[inline]
pub fn wrap_angle(mut a: f32) -> f32 {
    while a > PI {
        a -= TAU;
    }
    while a < -PI {
        a += TAU;
    }
    a
}

/// Turns `heading` toward `desired` by a fraction of the shortest arc.
#[inline]
pub fn turn_toward(heading: f32, desired: f32, rate: f32) -> f32 {
    heading + wrap_angle(desired - heading) * rate
}

/// Reynolds flocking weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flocking {
    pub perception: f32,
    pub max_speed: f32,
    pub max_force: f32,
    pub alignment: f32,
    pub cohesion: f32,
    pub separation: f32,
}

impl Flocking {
    /// Combined alignment, cohesion and separation force from
    /// `(position, velocity)` neighbours. Separation weighs each neighbour by
    /// `1/d²` and may use up to one and a half times the force budget.
    pub fn steer<V, I>(&self, position: V, velocity: V, neighbours: I) -> V
    where
        V: SteerVector,
        I: IntoIterator<Item = (V, V)>,
    {
        let mut align = V::ZERO;
        let mut center = V::ZERO;
        let mut separation = V::ZERO;
        let mut total = 0usize;

        for (other_pos, other_vel) in neighbours {
            let d = position.distance(other_pos);
            if d <= f32::EPSILON || d >= self.perception {
                continue;
            }
            align += other_vel;
            center += other_pos;
            separation += (position - other_pos) / (d * d);
            total += 1;
        }

        if total == 0 {
            return V::ZERO;
        }
        let n = total as f32;

        let steer_align = limit((align / n).normalize_or_zero() * self.max_speed - velocity, self.max_force);
        let steer_cohesion = limit(
            (center / n - position).normalize_or_zero() * self.max_speed - velocity,
            self.max_force,
        );
        let steer_separation = limit(
            (separation / n).normalize_or_zero() * self.max_speed - velocity,
            self.max_force * 1.5,
        );

        steer_align * self.alignment + steer_cohesion * self.cohesion + steer_separation * self.separation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(i: u32, x: f32, y: f32, kind: u8) -> Peer<u8, Vec2> {
        Peer {
            entity: hecs::Entity::from_bits(((1u64) << 32) | i as u64).unwrap(),
            serial: i as u64,
            kind,
            position: Vec2::new(x, y),
            velocity: Vec2::ZERO,
            size: 1.0,
        }
    }

    #[test]
    fn test_seek_points_at_target() {
        let force = seek(Vec2::ZERO, Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0, 5.0);
        assert!((force - Vec2::new(2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_seek_is_clamped_to_max_force() {
        let force = seek(Vec2::ZERO, Vec2::new(0.0, 3.0), Vec2::new(10.0, 0.0), 2.0, 0.1);
        assert!(force.length() <= 0.1 + 1e-6);
    }

    #[test]
    fn test_flee_opposes_seek() {
        let s = seek(Vec3::ZERO, Vec3::ZERO, Vec3::X, 1.0, 1.0);
        let f = flee(Vec3::ZERO, Vec3::ZERO, Vec3::X, 1.0, 1.0);
        assert!((s + f).length() < 1e-6);
    }

    #[test]
    fn test_nearest_respects_radius_and_predicate() {
        let peers = vec![peer(1, 5.0, 0.0, 0), peer(2, 2.0, 0.0, 1), peer(3, 30.0, 0.0, 0)];
        let (hit, d) = nearest(&peers, Vec2::ZERO, 20.0, |p| p.kind == 0).unwrap();
        assert_eq!(hit.serial, 1);
        assert!((d - 5.0).abs() < 1e-6);
        assert!(nearest(&peers, Vec2::ZERO, 4.0, |p| p.kind == 0).is_none());
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        let peers = vec![peer(7, 3.0, 0.0, 0), peer(8, -3.0, 0.0, 0)];
        let (hit, _) = nearest(&peers, Vec2::ZERO, 10.0, |_| true).unwrap();
        assert_eq!(hit.serial, 7);
    }

    #[test]
    fn test_turn_toward_takes_short_arc() {
        let h = turn_toward(PI - 0.1, -PI + 0.1, 1.0);
        assert!((wrap_angle(h) - (-PI + 0.1)).abs() < 1e-5);
    }

    #[test]
    fn test_flocking_without_neighbours_is_zero() {
        let flock = Flocking {
            perception: 2.5,
            max_speed: 0.2,
            max_force: 0.015,
            alignment: 1.0,
            cohesion: 1.0,
            separation: 1.5,
        };
        let far = [(Vec3::new(10.0, 0.0, 0.0), Vec3::X)];
        assert_eq!(flock.steer(Vec3::ZERO, Vec3::X * 0.2, far), Vec3::ZERO);
    }
}
