//! Plain data shared between the simulation core, the renderers and the
//! landing page: render descriptions, input events, census readouts and
//! catalog entries. Nothing in here knows how a simulation behaves.

pub mod catalog;
pub mod census;
pub mod interaction;
pub mod render;

pub use catalog::SimulationInfo;
pub use census::Census;
pub use interaction::{Interaction, Knob, ParseInputError, Tool};
pub use render::{Frame, Projection, Rgba, Shape, Sprite};

use serde::{Deserialize, Serialize};

/// Fixed world rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.width * 0.5, self.height * 0.5)
    }

    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && x <= self.width && y >= 0.0 && y <= self.height
    }

    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}
