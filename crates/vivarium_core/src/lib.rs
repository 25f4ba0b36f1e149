//! # Vivarium Core
//!
//! The simulation engine behind the Vivarium gallery: a handful of small
//! generative-art worlds that share one frame loop.
//!
//! This crate contains:
//! - The [`stage::Stage`] frame loop over a `hecs` arena with stable update
//!   order and deferred structural changes
//! - Seek/flee/flocking steering for 2D and 3D agents
//! - Decaying scalar fields (pheromones, moisture)
//! - Explicit state machine tables for behavioral modes
//! - The nine simulations behind [`simulation::Simulation`]
//! - Configuration, metrics and structured logging
//!
//! ## Example
//!
//! ```
//! use vivarium_core::config::AppConfig;
//! use vivarium_core::simulation::{create, SimulationId};
//!
//! let config = AppConfig::default();
//! let mut sim = create(SimulationId::Aquarium, &config, 42);
//! sim.step(1.0 / 60.0);
//! assert_eq!(sim.census().count("Fish"), 150);
//! ```

/// Behavioral modes with explicit transition tables
pub mod behavior;
/// Configuration management for simulation parameters
pub mod config;
/// Shared edge policies (wrap, clamp, bounce)
pub mod edges;
/// Error types for the simulation surface
pub mod error;
/// Decaying scalar grids
pub mod field;
/// Frame loop metrics and structured logging
pub mod metrics;
/// Simulation trait, ids and registry
pub mod simulation;
/// The individual exhibits
pub mod sims;
/// The per-tick entity update loop
pub mod stage;
/// Seek, flee and flocking helpers
pub mod steering;

pub use behavior::{StateMachine, TransitionError};
pub use config::AppConfig;
pub use error::{Result, SimError};
pub use simulation::{create, Simulation, SimulationId};
pub use stage::{Agent, Outcome, Stage, TickReport};
