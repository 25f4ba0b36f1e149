//! Edge policies. Each simulation picks its own; nothing enforces a shared
//! contract.

use glam::Vec2;
use vivarium_data::Bounds;

/// Teleports to the opposite side once the point leaves the rectangle
/// grown by `margin`.
pub fn wrap(p: &mut Vec2, bounds: Bounds, margin: f32) {
    if p.x < -margin {
        p.x = bounds.width + margin;
    } else if p.x > bounds.width + margin {
        p.x = -margin;
    }
    if p.y < -margin {
        p.y = bounds.height + margin;
    } else if p.y > bounds.height + margin {
        p.y = -margin;
    }
}

/// Keeps the point within `[lo, hi]` componentwise.
pub fn clamp(p: &mut Vec2, lo: Vec2, hi: Vec2) {
    *p = p.clamp(lo, hi.max(lo));
}

/// Reflects a coordinate off `[lo, hi]`, scaling the velocity by
/// `-restitution` on contact. Returns whether it touched a wall.
pub fn bounce(coord: &mut f32, velocity: &mut f32, lo: f32, hi: f32, restitution: f32) -> bool {
    if *coord < lo {
        *coord = lo;
        *velocity *= -restitution;
        true
    } else if *coord > hi {
        *coord = hi;
        *velocity *= -restitution;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_with_margin() {
        let b = Bounds::new(100.0, 100.0);
        let mut p = Vec2::new(-21.0, 50.0);
        wrap(&mut p, b, 20.0);
        assert_eq!(p, Vec2::new(120.0, 50.0));
        let mut q = Vec2::new(-19.0, 121.0);
        wrap(&mut q, b, 20.0);
        assert_eq!(q, Vec2::new(-19.0, -20.0));
    }

    #[test]
    fn test_bounce_reverses_and_damps() {
        let mut y = 5.0;
        let mut vy = -2.0;
        assert!(bounce(&mut y, &mut vy, 10.0, 90.0, 0.5));
        assert_eq!((y, vy), (10.0, 1.0));
        assert!(!bounce(&mut y, &mut vy, 10.0, 90.0, 0.5));
    }

    #[test]
    fn test_clamp_tolerates_inverted_range() {
        let mut p = Vec2::new(50.0, 50.0);
        clamp(&mut p, Vec2::new(30.0, 40.0), Vec2::new(20.0, 45.0));
        assert_eq!(p, Vec2::new(30.0, 45.0));
    }
}
