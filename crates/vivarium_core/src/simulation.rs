//! The surface every exhibit offers to a host: step, draw, poke, count.

use crate::config::AppConfig;
use crate::error::{Result, SimError};
use crate::sims;
use crate::stage::TickReport;
use std::fmt;
use std::str::FromStr;
use vivarium_data::{Census, Frame, Interaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationId {
    Flowers,
    Space,
    Trees,
    Jellyfish,
    Aquarium,
    AntFarm,
    PondDrop,
    SoilRhizosphere,
    BloodVessel,
}

impl SimulationId {
    pub const ALL: [SimulationId; 9] = [
        SimulationId::Flowers,
        SimulationId::Space,
        SimulationId::Trees,
        SimulationId::Jellyfish,
        SimulationId::Aquarium,
        SimulationId::AntFarm,
        SimulationId::PondDrop,
        SimulationId::SoilRhizosphere,
        SimulationId::BloodVessel,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationId::Flowers => "flowers",
            SimulationId::Space => "space",
            SimulationId::Trees => "trees",
            SimulationId::Jellyfish => "jellyfish",
            SimulationId::Aquarium => "aquarium",
            SimulationId::AntFarm => "ant_farm",
            SimulationId::PondDrop => "pond_drop",
            SimulationId::SoilRhizosphere => "soil_rhizosphere",
            SimulationId::BloodVessel => "blood_vessel",
        }
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationId {
    type Err = SimError;

    /// Accepts the catalog id plus a few short aliases (`pond`, `blood`, `soil`, `ants`).
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        let id = match key.as_str() {
            "pond" => SimulationId::PondDrop,
            "blood" => SimulationId::BloodVessel,
            "soil" => SimulationId::SoilRhizosphere,
            "ants" => SimulationId::AntFarm,
            "starfield" => SimulationId::Space,
            other => SimulationId::ALL
                .into_iter()
                .find(|id| id.as_str() == other)
                .ok_or_else(|| SimError::unknown_simulation(s.trim()))?,
        };
        Ok(id)
    }
}

/// One running exhibit.
pub trait Simulation {
    fn id(&self) -> SimulationId;

    /// Advances by `dt` seconds of wall time.
    fn step(&mut self, dt: f32) -> TickReport;

    fn frame(&self) -> Frame;

    /// Routes a tool, knob or hold event. Inputs the page does not offer
    /// fail with [`SimError::UnsupportedInteraction`].
    fn apply(&mut self, input: &Interaction) -> Result<()>;

    fn census(&self) -> Census;

    fn tick(&self) -> u64;

    /// Live entity count across the simulation's stages.
    fn population(&self) -> usize;
}

/// Builds a simulation from configuration.
pub fn create(id: SimulationId, config: &AppConfig, seed: u64) -> Box<dyn Simulation> {
    tracing::debug!(sim = %id, seed, "Creating simulation");
    let capacity = config.engine.capacity;
    match id {
        SimulationId::Flowers => Box::new(sims::flowers::Garden::new(&config.flowers, seed)),
        SimulationId::Space => Box::new(sims::starfield::Starfield::new(&config.starfield, seed)),
        SimulationId::Trees => Box::new(sims::trees::Grove::new(&config.trees, seed)),
        SimulationId::Jellyfish => Box::new(sims::jellyfish::Bloom::new(&config.jellyfish, seed)),
        SimulationId::Aquarium => Box::new(sims::aquarium::Aquarium::new(&config.aquarium, seed)),
        SimulationId::AntFarm => Box::new(sims::ants::AntFarm::new(&config.ants, seed)),
        SimulationId::PondDrop => Box::new(sims::pond::Pond::new(&config.pond, seed, capacity)),
        SimulationId::SoilRhizosphere => Box::new(sims::soil::Soil::new(&config.soil, seed)),
        SimulationId::BloodVessel => {
            Box::new(sims::blood::Vessel::new(&config.blood, seed, capacity))
        }
    }
}

/// Parses an id and builds the simulation.
pub fn create_by_name(name: &str, config: &AppConfig, seed: u64) -> Result<Box<dyn Simulation>> {
    let id = name.parse::<SimulationId>()?;
    Ok(create(id, config, seed))
}

/// Frame units elapsed for `dt` seconds at the tuned frame rate, clamped
/// so a stalled tab does not fling agents across the world.
#[inline]
#[must_use]
pub fn frames(dt: f32) -> f32 {
    (dt * 60.0).clamp(0.0, 4.0)
}

/// Wall seconds with the same stall clamp as [`frames`], for the exhibits
/// tuned in seconds.
#[inline]
#[must_use]
pub fn seconds(dt: f32) -> f32 {
    frames(dt) / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trips_through_display() {
        for id in SimulationId::ALL {
            assert_eq!(id.to_string().parse::<SimulationId>().unwrap(), id);
        }
    }

    #[test]
    fn test_aliases_and_unknown() {
        assert_eq!(" Pond ".parse::<SimulationId>().unwrap(), SimulationId::PondDrop);
        assert_eq!("blood-vessel".parse::<SimulationId>().unwrap(), SimulationId::BloodVessel);
        let err = "lava_lamp".parse::<SimulationId>().unwrap_err();
        assert!(matches!(err, SimError::UnknownSimulation(ref s) if s == "lava_lamp"));
    }

    #[test]
    fn test_frames_clamps_stalls() {
        assert!((frames(1.0 / 60.0) - 1.0).abs() < 1e-5);
        assert_eq!(frames(2.0), 4.0);
        assert_eq!(frames(-1.0), 0.0);
    }

    #[test]
    fn test_every_simulation_reports_its_id() {
        let config = AppConfig::default();
        for id in SimulationId::ALL {
            let sim = create(id, &config, 1);
            assert_eq!(sim.id(), id);
            assert_eq!(sim.tick(), 0);
        }
    }
}
