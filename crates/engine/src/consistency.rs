use serde::Serialize;
use tracing::warn;

use extract::{EntityType, RelationType, normalize_entity_text};

use crate::indexer::HybridIndexer;

const CONFIRMATION_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckType {
    Character,
    Plot,
    Setting,
    All,
}

impl CheckType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "character" => Self::Character,
            "plot" => Self::Plot,
            "setting" => Self::Setting,
            _ => Self::All,
        }
    }

    fn covers(self, other: Self) -> bool {
        self == Self::All || self == other
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub entity: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub is_consistent: bool,
    pub conflicts: Vec<Conflict>,
    pub confirmations: Vec<String>,
    pub recommendation: String,
}

impl ConsistencyReport {
    fn consistent() -> Self {
        Self {
            is_consistent: true,
            conflicts: Vec::new(),
            confirmations: Vec::new(),
            recommendation: "No contradictions with previously indexed material".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifeState {
    Alive,
    Dead,
}

impl HybridIndexer {
    /// Heuristic check of a new statement against established narrative
    /// facts. Best-effort by design: any internal failure degrades to a
    /// consistent report with zero conflicts, since blocking a writer on a
    /// broken collaborator is worse than a missed warning.
    pub async fn check_consistency(
        &self,
        statement: &str,
        doc_id: Option<&str>,
        check_type: CheckType,
    ) -> ConsistencyReport {
        if self.is_collection_empty().await {
            return ConsistencyReport::consistent();
        }

        let extraction = self.extractor.extract(statement).await;
        if extraction.entities.is_empty() {
            return ConsistencyReport::consistent();
        }

        let mut conflicts = Vec::new();

        if check_type.covers(CheckType::Character) {
            let store = self.store.read().await;
            for entity in &extraction.entities {
                if entity.entity_type != EntityType::Character {
                    continue;
                }
                let name = entity.text.clone();
                let recorded = recorded_life_state(&store, &name, doc_id);
                let stated = stated_life_state(statement, &name);
                if let (Some(LifeState::Dead), Some(LifeState::Alive)) = (recorded, stated) {
                    conflicts.push(Conflict {
                        detail: format!(
                            "{name} is established as dead in indexed material, but the statement describes them as active"
                        ),
                        entity: name,
                    });
                }
            }
        }

        if check_type.covers(CheckType::Plot) {
            let graph = self.graph.lock().await;
            for rel in &extraction.relationships {
                if !rel.relation_type.is_causal() {
                    continue;
                }
                // A statement reversing an established causal edge is a
                // direct contradiction.
                if let Some(existing) = graph.edge_between(&rel.target, &rel.source) {
                    if existing.relation_type.is_causal() {
                        conflicts.push(Conflict {
                            entity: rel.source.clone(),
                            detail: format!(
                                "statement has {} causing {}, but the indexed narrative records the reverse",
                                rel.source, rel.target
                            ),
                        });
                    }
                }
            }
        }

        if check_type.covers(CheckType::Setting) {
            let graph = self.graph.lock().await;
            for rel in &extraction.relationships {
                if rel.relation_type.as_str() != RelationType::LIVES_IN {
                    continue;
                }
                for (target, edge) in graph.out_neighbors(&rel.source) {
                    if edge.relation_type.as_str() == RelationType::LIVES_IN
                        && target != normalize_entity_text(&rel.target)
                    {
                        let home = graph
                            .node(&target)
                            .map(|n| n.text.clone())
                            .unwrap_or(target.clone());
                        conflicts.push(Conflict {
                            entity: rel.source.clone(),
                            detail: format!(
                                "{} is established as living in {}, not {}",
                                rel.source, home, rel.target
                            ),
                        });
                    }
                }
            }
        }

        let confirmations = match self.query(statement, 5).await {
            Ok(paths) => paths
                .into_iter()
                .filter(|p| p.score > CONFIRMATION_THRESHOLD)
                .map(|p| p.narrative)
                .collect(),
            Err(e) => {
                warn!(error = %e, "confirmation path lookup failed");
                Vec::new()
            }
        };

        let is_consistent = conflicts.is_empty();
        let recommendation = if is_consistent {
            "No contradictions with previously indexed material".to_string()
        } else {
            format!(
                "Review {} potential contradiction(s) before keeping this statement",
                conflicts.len()
            )
        };

        ConsistencyReport {
            is_consistent,
            conflicts,
            confirmations,
            recommendation,
        }
    }
}

const DEATH_PATTERNS: &[&str] = &["{} is dead", "{} died", "{} was killed", "{} had died", "death of {}"];

const ACTIVITY_MARKERS: &[&str] = &[
    "says", "said", "speaks", "spoke", "walks", "walked", "arrives", "arrived", "replies",
    "replied", "smiles", "smiled", "laughs", "laughed", "greets", "greeted", "is alive",
];

fn death_phrases(name: &str) -> Vec<String> {
    let name = name.to_lowercase();
    DEATH_PATTERNS
        .iter()
        .map(|p| p.replace("{}", &name))
        .collect()
}

/// Scan indexed chunks mentioning the character for explicit death
/// assertions. Activity alone never records an "alive" state; inferring
/// aliveness from every action verb would flag ordinary prose.
fn recorded_life_state(
    store: &chunks::ChunkStore,
    name: &str,
    doc_id: Option<&str>,
) -> Option<LifeState> {
    let phrases = death_phrases(name);
    for chunk in store.mentioning(&[&name.to_lowercase()], 50) {
        if let Some(doc) = doc_id {
            if chunk.doc_id != doc {
                continue;
            }
        }
        let text = chunk.text.to_lowercase();
        if phrases.iter().any(|p| text.contains(p.as_str())) {
            return Some(LifeState::Dead);
        }
    }
    None
}

fn stated_life_state(statement: &str, name: &str) -> Option<LifeState> {
    let text = statement.to_lowercase();
    if !text.contains(&name.to_lowercase()) {
        return None;
    }
    if death_phrases(name).iter().any(|p| text.contains(p.as_str())) {
        return Some(LifeState::Dead);
    }
    if ACTIVITY_MARKERS.iter().any(|m| text.contains(m)) {
        return Some(LifeState::Alive);
    }
    None
}
