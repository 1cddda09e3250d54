use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::schema::{Entity, EntityType, Extraction, RelationType, Relationship};

/// How the JSON region was located inside the raw model response. Strategies
/// are tried in declaration order; the first that yields schema-valid JSON
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// The whole response is the JSON document.
    DirectJson,
    /// JSON wrapped in a markdown code fence.
    FencedBlock,
    /// First balanced `{...}` or `[...]` region in surrounding prose.
    BalancedRegion,
}

#[derive(Debug)]
pub struct ParseOutcome {
    pub extraction: Extraction,
    /// `None` when every strategy failed and the result degraded to empty.
    pub strategy: Option<ParseStrategy>,
}

// Looser mirror of the wire shape: tolerate missing fields and junk relation
// spellings, then validate into the typed schema.
#[derive(Deserialize)]
struct RawExtraction {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
}

#[derive(Deserialize)]
struct RawEntity {
    text: String,
    #[serde(rename = "type")]
    entity_type: EntityType,
    #[serde(default)]
    start_pos: usize,
    #[serde(default)]
    end_pos: usize,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

#[derive(Deserialize)]
struct RawRelationship {
    source: String,
    target: String,
    #[serde(rename = "type")]
    relation_type: String,
    #[serde(default = "default_confidence")]
    confidence: f32,
    #[serde(default)]
    context: String,
}

fn default_confidence() -> f32 {
    0.5
}

/// Best-effort parse of a raw LLM response into a typed [`Extraction`].
///
/// Never errors: any failure degrades to an empty extraction. Entities whose
/// offsets fall outside `source_len` are discarded; confidences are clamped
/// to [0, 1].
pub fn parse_extraction(raw: &str, source_len: usize) -> ParseOutcome {
    for (strategy, candidate) in candidates(raw) {
        if let Ok(parsed) = serde_json::from_str::<RawExtraction>(&candidate) {
            return ParseOutcome {
                extraction: validate(parsed, source_len),
                strategy: Some(strategy),
            };
        }
    }

    debug!(response_len = raw.len(), "no parsable extraction in response");
    ParseOutcome {
        extraction: Extraction::default(),
        strategy: None,
    }
}

fn candidates(raw: &str) -> Vec<(ParseStrategy, String)> {
    let mut out = vec![(ParseStrategy::DirectJson, raw.trim().to_string())];

    if let Some(fenced) = fenced_block(raw) {
        out.push((ParseStrategy::FencedBlock, fenced));
    }
    if let Some(balanced) = balanced_region(raw) {
        out.push((ParseStrategy::BalancedRegion, balanced));
    }
    out
}

fn fenced_block(raw: &str) -> Option<String> {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let re = FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());
    re.captures(raw)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Scan for the first balanced `{...}` or `[...]`, tracking string literals
/// and escapes so braces inside quoted text do not confuse the depth count.
fn balanced_region(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let start = raw.find(['{', '['])?;
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

fn validate(raw: RawExtraction, source_len: usize) -> Extraction {
    let entities: Vec<Entity> = raw
        .entities
        .into_iter()
        .filter(|e| !e.text.trim().is_empty())
        .filter(|e| e.start_pos <= e.end_pos && e.end_pos <= source_len)
        .map(|e| Entity {
            text: e.text,
            entity_type: e.entity_type,
            start_pos: e.start_pos,
            end_pos: e.end_pos,
            confidence: e.confidence.clamp(0.0, 1.0),
        })
        .collect();

    let relationships = raw
        .relationships
        .into_iter()
        .filter(|r| !r.source.trim().is_empty() && !r.target.trim().is_empty())
        .map(|r| Relationship {
            source: r.source,
            target: r.target,
            relation_type: RelationType::new(&r.relation_type),
            confidence: r.confidence.clamp(0.0, 1.0),
            context: r.context,
        })
        .collect();

    Extraction {
        entities,
        relationships,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"entities":[{"text":"Alice","type":"CHARACTER","start_pos":0,"end_pos":5,"confidence":0.9}],"relationships":[{"source":"Alice","target":"Bob","type":"SPEAKS_TO","confidence":0.8,"context":"Alice spoke to Bob"}]}"#;

    #[test]
    fn direct_json_parses() {
        let outcome = parse_extraction(VALID, 100);
        assert_eq!(outcome.strategy, Some(ParseStrategy::DirectJson));
        assert_eq!(outcome.extraction.entities.len(), 1);
        assert_eq!(outcome.extraction.relationships.len(), 1);
        assert_eq!(
            outcome.extraction.relationships[0].relation_type.as_str(),
            "SPEAKS_TO"
        );
    }

    #[test]
    fn fenced_json_parses() {
        let wrapped = format!("Here you go:\n```json\n{}\n```\nHope that helps!", VALID);
        let outcome = parse_extraction(&wrapped, 100);
        assert_eq!(outcome.strategy, Some(ParseStrategy::FencedBlock));
        assert_eq!(outcome.extraction.entities.len(), 1);
    }

    #[test]
    fn prose_wrapped_json_parses_via_balanced_scan() {
        let wrapped = format!("Sure! The extraction is {} as requested.", VALID);
        let outcome = parse_extraction(&wrapped, 100);
        assert_eq!(outcome.strategy, Some(ParseStrategy::BalancedRegion));
        assert_eq!(outcome.extraction.entities.len(), 1);
    }

    #[test]
    fn braces_inside_strings_do_not_break_the_scan() {
        let tricky = r#"note: {"entities":[{"text":"The {Masked} One","type":"CHARACTER","start_pos":0,"end_pos":6,"confidence":1.0}],"relationships":[]} done"#;
        let outcome = parse_extraction(tricky, 50);
        assert_eq!(outcome.extraction.entities.len(), 1);
        assert_eq!(outcome.extraction.entities[0].text, "The {Masked} One");
    }

    #[test]
    fn garbage_degrades_to_empty() {
        let outcome = parse_extraction("I could not find any entities, sorry.", 100);
        assert!(outcome.strategy.is_none());
        assert!(outcome.extraction.is_empty());
    }

    #[test]
    fn out_of_bounds_entities_are_discarded() {
        let outcome = parse_extraction(VALID, 3);
        assert!(outcome.extraction.entities.is_empty());
        // Relationships are not offset-checked
        assert_eq!(outcome.extraction.relationships.len(), 1);
    }

    #[test]
    fn confidence_is_clamped() {
        let raw = r#"{"entities":[{"text":"X","type":"THEME","start_pos":0,"end_pos":1,"confidence":3.5}],"relationships":[]}"#;
        let outcome = parse_extraction(raw, 10);
        assert_eq!(outcome.extraction.entities[0].confidence, 1.0);
    }
}
