//! Error types for vivarium_core.
//!
//! Simulation logic itself never fails; these cover the surface around it:
//! picking a simulation and routing input to it.

use thiserror::Error;

/// Main error type for vivarium_core operations.
#[derive(Error, Debug)]
pub enum SimError {
    /// No simulation registered under this id
    #[error("Unknown simulation: {0}")]
    UnknownSimulation(String),

    /// The simulation does not offer this tool or knob
    #[error("{sim} does not support {interaction}")]
    UnsupportedInteraction { sim: String, interaction: String },
}

/// Result type alias for vivarium_core operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    #[must_use]
    pub fn unknown_simulation<S: Into<String>>(id: S) -> Self {
        Self::UnknownSimulation(id.into())
    }

    #[must_use]
    pub fn unsupported<S: Into<String>, I: ToString>(sim: S, interaction: &I) -> Self {
        Self::UnsupportedInteraction {
            sim: sim.into(),
            interaction: interaction.to_string(),
        }
    }
}
