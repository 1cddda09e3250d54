use serde::{Deserialize, Serialize};

/// The closed set of narrative entity kinds the extraction prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Character,
    Location,
    Event,
    Theme,
    Organization,
}

/// A named thing extracted from one chunk of text. Offsets are within the
/// source chunk; instances with out-of-bounds offsets are discarded at parse
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub start_pos: usize,
    pub end_pos: usize,
    pub confidence: f32,
}

impl Entity {
    /// Graph node identity: case-insensitive, trimmed, single-spaced.
    pub fn normalized(&self) -> String {
        normalize_entity_text(&self.text)
    }
}

/// Typed directed connection between two entities, by surface text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub confidence: f32,
    #[serde(default)]
    pub context: String,
}

/// Relation kind, uppercase with underscores. The known constants below are
/// what the prompt requests; unknown values are carried through untouched so
/// the set stays extensible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationType(String);

impl RelationType {
    pub const INTERACTS_WITH: &'static str = "INTERACTS_WITH";
    pub const LOCATED_IN: &'static str = "LOCATED_IN";
    pub const PARTICIPATES_IN: &'static str = "PARTICIPATES_IN";
    pub const REPRESENTS: &'static str = "REPRESENTS";
    pub const BELONGS_TO: &'static str = "BELONGS_TO";
    pub const CAUSES: &'static str = "CAUSES";
    pub const PRECEDES: &'static str = "PRECEDES";
    pub const LEADS_TO: &'static str = "LEADS_TO";
    pub const RESULTS_IN: &'static str = "RESULTS_IN";
    pub const SPEAKS_TO: &'static str = "SPEAKS_TO";
    pub const FEELS_ABOUT: &'static str = "FEELS_ABOUT";
    pub const MEETS: &'static str = "MEETS";
    pub const WITNESSES: &'static str = "WITNESSES";
    pub const GOES_TO: &'static str = "GOES_TO";
    pub const LIVES_IN: &'static str = "LIVES_IN";
    pub const VISITS: &'static str = "VISITS";

    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase().replace(' ', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_causal(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::CAUSES | Self::LEADS_TO | Self::RESULTS_IN
        )
    }

    pub fn is_interpersonal(&self) -> bool {
        matches!(self.0.as_str(), Self::SPEAKS_TO | Self::FEELS_ABOUT)
    }
}

impl From<&str> for RelationType {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One extraction pass over one chunk of text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Case-insensitive, trimmed, whitespace-collapsed entity identity.
pub fn normalize_entity_text(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_case_and_spacing() {
        assert_eq!(normalize_entity_text("  Alice  "), "alice");
        assert_eq!(normalize_entity_text("The   Old\tCastle"), "the old castle");
    }

    #[test]
    fn relation_type_normalizes_input() {
        assert_eq!(RelationType::new("speaks to").as_str(), "SPEAKS_TO");
        assert!(RelationType::new("causes").is_causal());
        assert!(RelationType::new("FEELS_ABOUT").is_interpersonal());
        assert!(!RelationType::new("LOCATED_IN").is_causal());
    }

    #[test]
    fn entity_type_round_trips_uppercase() {
        let parsed: EntityType = serde_json::from_str("\"CHARACTER\"").unwrap();
        assert_eq!(parsed, EntityType::Character);
        assert_eq!(serde_json::to_string(&EntityType::Location).unwrap(), "\"LOCATION\"");
    }
}
