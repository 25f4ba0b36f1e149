use serde::{Deserialize, Serialize};

/// Ordered readout of a simulation's population and gauges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Census {
    pub entries: Vec<(String, f64)>,
    pub status: Option<String>,
}

impl Census {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, replacing an existing one with the same label.
    #[must_use]
    pub fn with(mut self, label: &str, value: f64) -> Self {
        self.set(label, value);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn set(&mut self, label: &str, value: f64) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label.to_string(), value)),
        }
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.get(label).map_or(0, |v| v.max(0.0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut census = Census::new().with("rbc", 300.0).with("wbc", 15.0);
        census.set("rbc", 299.0);
        assert_eq!(census.entries.len(), 2);
        assert_eq!(census.entries[0], ("rbc".to_string(), 299.0));
        assert_eq!(census.count("wbc"), 15);
        assert_eq!(census.get("missing"), None);
    }
}
