use chunks::ChunkStore;
use extract::RelationType;
use graph::NarrativeGraph;

const MAX_SUPPORTING_TEXTS: usize = 3;
const EXCERPT_CHARS: usize = 200;

/// Verb phrase for one relation kind. Unknown types fall back to the
/// lower-cased relation name with underscores as spaces.
pub fn verb_phrase(relation: &RelationType) -> String {
    match relation.as_str() {
        RelationType::SPEAKS_TO => "speaks to".to_string(),
        RelationType::FEELS_ABOUT => "feels about".to_string(),
        RelationType::MEETS => "meets".to_string(),
        RelationType::INTERACTS_WITH => "interacts with".to_string(),
        RelationType::GOES_TO => "goes to".to_string(),
        RelationType::LIVES_IN => "lives in".to_string(),
        RelationType::VISITS => "visits".to_string(),
        RelationType::LOCATED_IN => "is located in".to_string(),
        RelationType::CAUSES => "causes".to_string(),
        RelationType::LEADS_TO => "leads to".to_string(),
        RelationType::RESULTS_IN => "results in".to_string(),
        RelationType::PRECEDES => "precedes".to_string(),
        RelationType::PARTICIPATES_IN => "participates in".to_string(),
        RelationType::WITNESSES => "witnesses".to_string(),
        RelationType::BELONGS_TO => "belongs to".to_string(),
        RelationType::REPRESENTS => "represents".to_string(),
        other => other.to_lowercase().replace('_', " "),
    }
}

/// Walk a path's nodes and edges into a readable narrative line, e.g.
/// "Alice speaks to Bob; Bob goes to the castle".
pub fn render_narrative(path: &[String], graph: &NarrativeGraph) -> String {
    let display = |key: &str| -> String {
        graph
            .node(key)
            .map(|n| n.text.clone())
            .unwrap_or_else(|| key.to_string())
    };

    if path.len() < 2 {
        return path.first().map(|k| display(k)).unwrap_or_default();
    }

    let mut segments = Vec::with_capacity(path.len() - 1);
    for pair in path.windows(2) {
        let phrase = graph
            .edge_between(&pair[0], &pair[1])
            .map(|edge| verb_phrase(&edge.relation_type))
            .unwrap_or_else(|| "relates to".to_string());
        segments.push(format!("{} {} {}", display(&pair[0]), phrase, display(&pair[1])));
    }
    segments.join("; ")
}

/// Up to three chunk excerpts mentioning any node on the path.
pub fn supporting_texts(path: &[String], graph: &NarrativeGraph, store: &ChunkStore) -> Vec<String> {
    let names: Vec<String> = path
        .iter()
        .filter_map(|key| graph.node(key).map(|n| n.text.clone()))
        .collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    store
        .mentioning(&refs, MAX_SUPPORTING_TEXTS)
        .into_iter()
        .map(|chunk| excerpt(&chunk.text))
        .collect()
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    format!("{}…", cut.trim_end())
}
