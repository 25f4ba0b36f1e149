use serde::{Deserialize, Serialize};

/// Landing page card for one simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub path: String,
    pub tags: Vec<String>,
    pub icon: String,
}

impl SimulationInfo {
    #[must_use]
    pub fn new(id: &str, title: &str, description: &str, tags: &[&str], icon: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            path: format!("simulations/{id}/index.html"),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            icon: icon.to_string(),
        }
    }

    /// Case-insensitive substring match on title, description or any tag.
    ///
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_tags_and_title() {
        let info = SimulationInfo::new(
            "flowers",
            "Floral Growth",
            "A field of procedural flowers.",
            &["nature", "procedural"],
            "🌸",
        );
        assert_eq!(info.path, "simulations/flowers/index.html");
        assert!(info.matches("floral"));
        assert!(info.matches("proc"));
        assert!(!info.matches("space"));
    }
}
