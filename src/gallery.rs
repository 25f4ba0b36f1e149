//! Landing page catalog and its search box.

use serde::Serialize;
use vivarium_core::SimulationId;
use vivarium_data::SimulationInfo;

/// Result of a catalog search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "entries", rename_all = "snake_case")]
pub enum Listing {
    Matches(Vec<SimulationInfo>),
    /// Nothing matched; the page shows its "no results" banner.
    NoResults,
}

impl Listing {
    #[must_use]
    pub fn entries(&self) -> &[SimulationInfo] {
        match self {
            Listing::Matches(entries) => entries,
            Listing::NoResults => &[],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Listing::NoResults)
    }
}

fn card(id: SimulationId) -> SimulationInfo {
    match id {
        SimulationId::Flowers => SimulationInfo::new(
            id.as_str(),
            "Floral Growth",
            "Watch procedural flowers grow, bloom, and return to the earth in a mesmerizing cycle of life.",
            &["nature", "procedural", "calm"],
            "🌸",
        ),
        SimulationId::Space => SimulationInfo::new(
            id.as_str(),
            "Galactic Voyage",
            "Embark on an infinite journey through procedurally generated star fields and galaxy formations.",
            &["space", "particles", "infinite"],
            "🌌",
        ),
        SimulationId::Trees => SimulationInfo::new(
            id.as_str(),
            "Whispering Trees",
            "Observe ancient trees swaying in the wind as the day turns to night and the cycle continues.",
            &["nature", "atmospheric", "day-night"],
            "🌳",
        ),
        SimulationId::Jellyfish => SimulationInfo::new(
            id.as_str(),
            "Abyssal Drift",
            "Translucent jellyfish pulse through the deep sea while marine snow falls around them.",
            &["ocean", "calm", "physics"],
            "🪼",
        ),
        SimulationId::Aquarium => SimulationInfo::new(
            id.as_str(),
            "Boids Aquarium",
            "A school of fish flocks through a glass tank. Feed them or give them a fright.",
            &["ocean", "flocking", "interactive"],
            "🐠",
        ),
        SimulationId::AntFarm => SimulationInfo::new(
            id.as_str(),
            "Ant Farm",
            "A colony digs tunnels, forages for food and raises its brood between two panes of glass.",
            &["nature", "colony", "emergent"],
            "🐜",
        ),
        SimulationId::PondDrop => SimulationInfo::new(
            id.as_str(),
            "Pond Drop",
            "Peer through a microscope at bacteria, algae and hungry protozoa living in a single drop of pond water.",
            &["microscopic", "ecosystem", "interactive"],
            "🔬",
        ),
        SimulationId::SoilRhizosphere => SimulationInfo::new(
            id.as_str(),
            "Soil Rhizosphere",
            "Roots, fungal threads and bacteria trade moisture and nutrients beneath the surface.",
            &["nature", "microscopic", "ecosystem"],
            "🌱",
        ),
        SimulationId::BloodVessel => SimulationInfo::new(
            id.as_str(),
            "Blood Vessel",
            "Red cells stream past while white cells hunt pathogens and platelets patch the wall.",
            &["biology", "microscopic", "interactive"],
            "🩸",
        ),
    }
}

/// Every simulation card, in gallery order.
#[must_use]
pub fn catalog() -> Vec<SimulationInfo> {
    SimulationId::ALL.into_iter().map(card).collect()
}

/// Filters the full catalog. An empty query lists everything.
#[must_use]
pub fn filter(query: &str) -> Listing {
    filter_entries(&catalog(), query)
}

/// Filters an arbitrary set of cards with the same rules as [`filter`].
#[must_use]
pub fn filter_entries(entries: &[SimulationInfo], query: &str) -> Listing {
    let needle = query.trim().to_lowercase();
    let found: Vec<SimulationInfo> = entries
        .iter()
        .filter(|info| needle.is_empty() || info.matches(&needle))
        .cloned()
        .collect();

    tracing::debug!(query = %needle, matches = found.len(), "Filtered catalog");
    if found.is_empty() {
        Listing::NoResults
    } else {
        Listing::Matches(found)
    }
}

/// [`filter`] encoded as JSON for the landing page.
pub fn filter_json(query: &str) -> serde_json::Result<String> {
    serde_json::to_string(&filter(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_every_simulation() {
        let cards = catalog();
        assert_eq!(cards.len(), SimulationId::ALL.len());
        for (card, id) in cards.iter().zip(SimulationId::ALL) {
            assert_eq!(card.id, id.as_str());
            assert!(card.path.contains(id.as_str()));
        }
    }

    #[test]
    fn test_empty_query_lists_everything() {
        assert_eq!(filter("").entries().len(), 9);
        assert_eq!(filter("   ").entries().len(), 9);
    }

    #[test]
    fn test_tag_search() {
        let listing = filter("nature");
        let ids: Vec<&str> = listing.entries().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["flowers", "trees", "ant_farm", "soil_rhizosphere"]);
    }

    #[test]
    fn test_no_results() {
        let listing = filter("volcano");
        assert!(listing.is_empty());
        assert!(listing.entries().is_empty());
    }

    #[test]
    fn test_listing_serializes_with_status() {
        let json = serde_json::to_string(&Listing::NoResults).unwrap();
        assert_eq!(json, r#"{"status":"no_results"}"#);
    }
}
