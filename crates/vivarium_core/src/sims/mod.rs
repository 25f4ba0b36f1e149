//! The exhibits. Each one owns a [`crate::stage::Stage`] (or a few) and
//! implements [`crate::simulation::Simulation`].

pub mod ants;
pub mod aquarium;
pub mod blood;
pub mod flowers;
pub mod jellyfish;
pub mod pond;
pub mod soil;
pub mod starfield;
pub mod trees;

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

/// Uniform in `[-amp / 2, amp / 2)`.
#[inline]
pub(crate) fn jitter<R: Rng + ?Sized>(rng: &mut R, amp: f32) -> f32 {
    (rng.gen::<f32>() - 0.5) * amp
}

/// Uniform in `[lo, hi)`; collapses to `lo` for an empty range.
#[inline]
pub(crate) fn between<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// True with probability `p`; tolerates `p` outside `[0, 1]`.
#[inline]
pub(crate) fn chance<R: Rng + ?Sized>(rng: &mut R, p: f32) -> bool {
    rng.gen::<f32>() < p
}

#[inline]
pub(crate) fn angle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>() * TAU
}

/// Random point within `radius` of `center`.
pub(crate) fn scatter<R: Rng + ?Sized>(rng: &mut R, center: Vec2, radius: f32) -> Vec2 {
    let a = angle(rng);
    let d = rng.gen::<f32>() * radius;
    center + Vec2::new(a.cos(), a.sin()) * d
}

/// Heading as a unit vector.
#[inline]
pub(crate) fn heading(a: f32) -> Vec2 {
    Vec2::new(a.cos(), a.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_helpers_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let j = jitter(&mut rng, 0.1);
            assert!((-0.05..0.05).contains(&j));
            let b = between(&mut rng, 2.0, 4.0);
            assert!((2.0..4.0).contains(&b));
            let p = scatter(&mut rng, Vec2::new(10.0, 10.0), 50.0);
            assert!(p.distance(Vec2::new(10.0, 10.0)) <= 50.0 + 1e-3);
        }
        assert_eq!(between(&mut rng, 5.0, 5.0), 5.0);
        assert!(!chance(&mut rng, 0.0));
        assert!(chance(&mut rng, 1.5));
    }
}
