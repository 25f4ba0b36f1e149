use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pointer tools offered by the simulation pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Drop a burst of bacteria (pond).
    Pipette,
    /// Push everything near the pointer away.
    Repel,
    /// Damage the vessel wall (blood vessel).
    Cut,
    /// Inject pathogens (blood vessel).
    Inject,
    /// Release a cholesterol particle (blood vessel).
    Plaque,
    Water,
    Organic,
    Observe,
    /// Spawn a single food item (ant farm button).
    SpawnFood,
    /// Drop a handful of food at the pointer.
    DropFood,
    /// Scatter flakes for the fish (aquarium).
    Feed,
    /// Startle the school (aquarium).
    Scare,
    Plant,
    /// Magic burst (trees).
    Burst,
    /// Sonar pulse (jellyfish).
    Sonar,
}

impl Tool {
    pub const ALL: [Tool; 15] = [
        Tool::Pipette,
        Tool::Repel,
        Tool::Cut,
        Tool::Inject,
        Tool::Plaque,
        Tool::Water,
        Tool::Organic,
        Tool::Observe,
        Tool::SpawnFood,
        Tool::DropFood,
        Tool::Feed,
        Tool::Scare,
        Tool::Plant,
        Tool::Burst,
        Tool::Sonar,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Pipette => "pipette",
            Tool::Repel => "repel",
            Tool::Cut => "cut",
            Tool::Inject => "inject",
            Tool::Plaque => "plaque",
            Tool::Water => "water",
            Tool::Organic => "organic",
            Tool::Observe => "observe",
            Tool::SpawnFood => "spawn_food",
            Tool::DropFood => "drop_food",
            Tool::Feed => "feed",
            Tool::Scare => "scare",
            Tool::Plant => "plant",
            Tool::Burst => "burst",
            Tool::Sonar => "sonar",
        }
    }
}

/// Slider inputs bound to configuration scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Knob {
    Light,
    Temperature,
    Zoom,
    Flow,
    Wind,
    GrowthSpeed,
    LifeSpan,
    WarpSpeed,
    GalaxyFrequency,
    DayDuration,
    TimeOfDay,
    SimSpeed,
    Speed,
}

impl Knob {
    pub const ALL: [Knob; 13] = [
        Knob::Light,
        Knob::Temperature,
        Knob::Zoom,
        Knob::Flow,
        Knob::Wind,
        Knob::GrowthSpeed,
        Knob::LifeSpan,
        Knob::WarpSpeed,
        Knob::GalaxyFrequency,
        Knob::DayDuration,
        Knob::TimeOfDay,
        Knob::SimSpeed,
        Knob::Speed,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Knob::Light => "light",
            Knob::Temperature => "temperature",
            Knob::Zoom => "zoom",
            Knob::Flow => "flow",
            Knob::Wind => "wind",
            Knob::GrowthSpeed => "growth_speed",
            Knob::LifeSpan => "life_span",
            Knob::WarpSpeed => "warp_speed",
            Knob::GalaxyFrequency => "galaxy_frequency",
            Knob::DayDuration => "day_duration",
            Knob::TimeOfDay => "time_of_day",
            Knob::SimSpeed => "sim_speed",
            Knob::Speed => "speed",
        }
    }
}

/// A user input routed to one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interaction {
    Tool { tool: Tool, x: f32, y: f32 },
    Knob { knob: Knob, value: f32 },
    /// Pointer held down (`true`) or released.
    Hold { active: bool },
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interaction::Tool { tool, x, y } => write!(f, "tool {} at ({x:.1}, {y:.1})", tool.as_str()),
            Interaction::Knob { knob, value } => write!(f, "knob {} = {value}", knob.as_str()),
            Interaction::Hold { active } => write!(f, "hold {active}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseInputError {
    pub input: String,
    pub expected: &'static str,
}

impl fmt::Display for ParseInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.expected, self.input)
    }
}

impl std::error::Error for ParseInputError {}

impl FromStr for Tool {
    type Err = ParseInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Tool::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ParseInputError {
                input: s.to_string(),
                expected: "tool",
            })
    }
}

impl FromStr for Knob {
    type Err = ParseInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Knob::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ParseInputError {
                input: s.to_string(),
                expected: "knob",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(tool.as_str().parse::<Tool>(), Ok(tool));
        }
        assert_eq!("Spawn-Food".parse::<Tool>(), Ok(Tool::SpawnFood));
        assert!("lasso".parse::<Tool>().is_err());
    }

    #[test]
    fn test_knob_matches_serde_name() {
        let json = serde_json::to_string(&Knob::GalaxyFrequency).unwrap();
        assert_eq!(json, "\"galaxy_frequency\"");
        assert_eq!("galaxy_frequency".parse::<Knob>(), Ok(Knob::GalaxyFrequency));
    }

    #[test]
    fn test_interaction_is_tagged() {
        let i: Interaction =
            serde_json::from_str(r#"{"kind":"tool","tool":"cut","x":1.0,"y":2.0}"#).unwrap();
        assert_eq!(
            i,
            Interaction::Tool {
                tool: Tool::Cut,
                x: 1.0,
                y: 2.0
            }
        );
    }
}
