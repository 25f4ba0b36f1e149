mod common;

use common::{run, SimBuilder};
use vivarium_core::{SimError, SimulationId};
use vivarium_data::{Interaction, Projection, Tool};

fn signature_input(id: SimulationId) -> Interaction {
    let tool = |tool, x, y| Interaction::Tool { tool, x, y };
    match id {
        SimulationId::Flowers => tool(Tool::Plant, 1.0, -2.0),
        SimulationId::Space => Interaction::Hold { active: true },
        SimulationId::Trees => tool(Tool::Burst, 0.0, 0.0),
        SimulationId::Jellyfish => tool(Tool::Sonar, 0.0, 0.0),
        SimulationId::Aquarium => tool(Tool::Feed, 0.0, 0.0),
        SimulationId::AntFarm => tool(Tool::SpawnFood, 0.0, 0.0),
        SimulationId::PondDrop => tool(Tool::Pipette, 400.0, 300.0),
        SimulationId::SoilRhizosphere => tool(Tool::Water, 400.0, 300.0),
        SimulationId::BloodVessel => tool(Tool::Inject, 500.0, 250.0),
    }
}

#[test]
fn test_every_simulation_runs_and_draws() {
    for id in SimulationId::ALL {
        let mut sim = SimBuilder::new(id).with_seed(7).build();
        sim.apply(&signature_input(id)).unwrap_or_else(|e| panic!("{id}: {e}"));
        run(sim.as_mut(), 240);

        assert_eq!(sim.tick(), 240, "{id}");
        assert!(sim.population() > 0, "{id} died out");

        let frame = sim.frame();
        assert!(!frame.sprites.is_empty(), "{id} drew nothing");
        for s in &frame.sprites {
            assert!(
                s.x.is_finite() && s.y.is_finite() && s.z.is_finite(),
                "{id} produced a non-finite sprite {s:?}"
            );
        }
        let three_d = matches!(frame.projection, Projection::Perspective { .. });
        let expected_3d = matches!(
            id,
            SimulationId::Flowers
                | SimulationId::Space
                | SimulationId::Trees
                | SimulationId::Jellyfish
                | SimulationId::Aquarium
        );
        assert_eq!(three_d, expected_3d, "{id} projection");
    }
}

#[test]
fn test_foreign_tools_are_rejected() {
    for id in SimulationId::ALL {
        let mut sim = SimBuilder::new(id).build();
        let foreign = if id == SimulationId::Jellyfish { Tool::Cut } else { Tool::Sonar };
        let err = sim
            .apply(&Interaction::Tool {
                tool: foreign,
                x: 0.0,
                y: 0.0,
            })
            .unwrap_err();
        assert!(
            matches!(err, SimError::UnsupportedInteraction { ref sim, .. } if sim == id.as_str()),
            "{id}: {err}"
        );
    }
}

#[test]
fn test_stalled_frame_is_clamped() {
    let mut slow = SimBuilder::new(SimulationId::Jellyfish).build();
    let mut stalled = SimBuilder::new(SimulationId::Jellyfish).build();
    slow.step(1.0);
    stalled.step(10.0);
    assert_eq!(slow.frame(), stalled.frame());
}

#[test]
fn test_headless_app_matches_direct_run() {
    let mut app = SimBuilder::new(SimulationId::BloodVessel).with_seed(3).build_app();
    let census = app.run_headless(90);

    let mut direct = SimBuilder::new(SimulationId::BloodVessel).with_seed(3).build();
    run(direct.as_mut(), 90);
    assert_eq!(census, direct.census());
    assert_eq!(app.metrics.tick_count(), 90);
}
