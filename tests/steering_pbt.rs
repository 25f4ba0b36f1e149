use glam::{Vec2, Vec3};
use proptest::prelude::*;
use vivarium_core::field::ScalarField;
use vivarium_core::steering::{flee, integrate, seek, Flocking};

prop_compose! {
    fn arb_vec2(range: f32)(x in -range..range, y in -range..range) -> Vec2 {
        Vec2::new(x, y)
    }
}

prop_compose! {
    fn arb_vec3(range: f32)(x in -range..range, y in -range..range, z in -range..range) -> Vec3 {
        Vec3::new(x, y, z)
    }
}

prop_compose! {
    fn arb_limits()(max_speed in 0.01f32..10.0, max_force in 0.0f32..2.0) -> (f32, f32) {
        (max_speed, max_force)
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldOp {
    Deposit(f32, f32, f32),
    Splash(f32, f32, f32, f32),
    Decay,
}

fn arb_field_op() -> impl Strategy<Value = FieldOp> {
    prop_oneof![
        (-20.0f32..120.0, -20.0f32..120.0, -50.0f32..50.0).prop_map(|(x, y, a)| FieldOp::Deposit(x, y, a)),
        (0.0f32..100.0, 0.0f32..100.0, 0.0f32..30.0, -50.0f32..50.0)
            .prop_map(|(x, y, r, a)| FieldOp::Splash(x, y, r, a)),
        Just(FieldOp::Decay),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_seek_then_integrate_respects_max_speed(
        pos in arb_vec2(500.0),
        vel in arb_vec2(20.0),
        target in arb_vec2(500.0),
        (max_speed, max_force) in arb_limits()
    ) {
        let mut v = vel;
        let force = seek(pos, v, target, max_speed, max_force);
        prop_assert!(force.length() <= max_force + 1e-4);
        integrate(&mut v, force, max_speed);
        prop_assert!(v.length() <= max_speed * (1.0 + 1e-5) + 1e-6, "speed {} > {}", v.length(), max_speed);
    }

    #[test]
    fn test_flee_then_integrate_respects_max_speed(
        pos in arb_vec3(50.0),
        vel in arb_vec3(5.0),
        threat in arb_vec3(50.0),
        (max_speed, max_force) in arb_limits()
    ) {
        let mut v = vel;
        let force = flee(pos, v, threat, max_speed, max_force);
        integrate(&mut v, force, max_speed);
        prop_assert!(v.length() <= max_speed * (1.0 + 1e-5) + 1e-6);
    }

    #[test]
    fn test_flocking_integrate_respects_max_speed(
        pos in arb_vec3(10.0),
        vel in arb_vec3(1.0),
        neighbours in prop::collection::vec((arb_vec3(10.0), arb_vec3(1.0)), 0..30),
        (max_speed, max_force) in arb_limits()
    ) {
        let flock = Flocking {
            perception: 2.5,
            max_speed,
            max_force,
            alignment: 1.0,
            cohesion: 1.0,
            separation: 1.5,
        };
        let mut v = vel;
        let force = flock.steer(pos, v, neighbours);
        prop_assert!(force.is_finite());
        integrate(&mut v, force, max_speed);
        prop_assert!(v.length() <= max_speed * (1.0 + 1e-5) + 1e-6);
    }

    #[test]
    fn test_field_cells_stay_within_cap(
        ops in prop::collection::vec(arb_field_op(), 1..60),
        cap in 1.0f32..100.0,
        decay in 0.5f32..1.0
    ) {
        let mut field = ScalarField::new(20, 20, 5.0, decay, cap);
        for op in ops {
            match op {
                FieldOp::Deposit(x, y, a) => field.deposit(x, y, a),
                FieldOp::Splash(x, y, r, a) => field.deposit_radius(x, y, r, a),
                FieldOp::Decay => field.decay(),
            }
        }
        for iy in 0..field.height() {
            for ix in 0..field.width() {
                let v = field.get(ix, iy);
                prop_assert!((0.0..=cap).contains(&v), "cell ({}, {}) = {}", ix, iy, v);
            }
        }
        prop_assert!(field.max_value() <= cap);
    }
}
