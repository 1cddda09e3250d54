use serde::Serialize;
use tracing::warn;

use extract::{EntityType, RelationType};

use crate::indexer::HybridIndexer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionType {
    Plot,
    Character,
    Style,
    All,
}

impl SuggestionType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "plot" => Self::Plot,
            "character" => Self::Character,
            "style" => Self::Style,
            _ => Self::All,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Suggestions {
    pub suggestions: Vec<String>,
}

impl HybridIndexer {
    /// Writing prompts derived from the indexed narrative around `context`.
    /// Returns an empty list rather than an error when nothing is indexed
    /// or a lookup fails.
    pub async fn writing_suggestions(
        &self,
        context: &str,
        suggestion_type: SuggestionType,
    ) -> Suggestions {
        if self.is_collection_empty().await {
            return Suggestions::default();
        }

        let mut suggestions = Vec::new();

        if matches!(suggestion_type, SuggestionType::Plot | SuggestionType::All) {
            suggestions.extend(self.plot_suggestions(context).await);
        }
        if matches!(suggestion_type, SuggestionType::Character | SuggestionType::All) {
            suggestions.extend(self.character_suggestions(context).await);
        }
        if matches!(suggestion_type, SuggestionType::Style | SuggestionType::All) {
            suggestions.extend(self.style_suggestions(context).await);
        }

        suggestions.dedup();
        Suggestions { suggestions }
    }

    /// Causal chains touching the context become continuation prompts.
    async fn plot_suggestions(&self, context: &str) -> Vec<String> {
        let paths = match self.query(context, 3).await {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "plot suggestion lookup failed");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        for path in paths {
            let causal = path
                .relationships
                .iter()
                .any(|r| RelationType::new(r).is_causal());
            if causal {
                out.push(format!(
                    "Develop the consequences of this chain: {}",
                    path.narrative
                ));
            } else if path.nodes.len() > 2 {
                out.push(format!(
                    "Explore how {} connects to {}",
                    path.nodes.first().map(String::as_str).unwrap_or(""),
                    path.nodes.last().map(String::as_str).unwrap_or("")
                ));
            }
        }
        out
    }

    /// One development prompt per character mentioned in the context.
    async fn character_suggestions(&self, context: &str) -> Vec<String> {
        let extraction = self.extractor.extract(context).await;
        let graph = self.graph.lock().await;

        let mut out = Vec::new();
        for entity in extraction.entities {
            let is_character = entity.entity_type == EntityType::Character
                || graph
                    .node(&entity.text)
                    .is_some_and(|n| n.entity_type == EntityType::Character);
            if !is_character || !graph.contains(&entity.text) {
                continue;
            }
            let degree = graph.out_neighbors(&entity.text).len();
            if degree == 0 {
                out.push(format!(
                    "{} has no established relationships yet; a scene with another character could anchor them",
                    entity.text
                ));
            } else {
                out.push(format!(
                    "Deepen one of {}'s {} existing relationships instead of introducing a new one",
                    entity.text, degree
                ));
            }
        }
        out
    }

    /// Compare sentence length in the context against similar indexed prose.
    async fn style_suggestions(&self, context: &str) -> Vec<String> {
        let store = self.store.read().await;
        let hits = match store.search(context, 3, None).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "style suggestion search failed");
                return Vec::new();
            }
        };
        if hits.is_empty() {
            return Vec::new();
        }

        let indexed_avg = {
            let lens: Vec<f32> = hits.iter().map(|h| avg_sentence_len(&h.text)).collect();
            lens.iter().sum::<f32>() / lens.len() as f32
        };
        let context_avg = avg_sentence_len(context);
        if context_avg == 0.0 || indexed_avg == 0.0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        if context_avg > indexed_avg * 1.5 {
            out.push(format!(
                "Sentences here average {context_avg:.0} words against {indexed_avg:.0} in earlier scenes; consider breaking some up"
            ));
        } else if context_avg < indexed_avg / 1.5 {
            out.push(format!(
                "Sentences here average {context_avg:.0} words against {indexed_avg:.0} in earlier scenes; consider varying the rhythm"
            ));
        }
        out
    }
}

fn avg_sentence_len(text: &str) -> f32 {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.is_empty() {
        return 0.0;
    }
    let words: usize = sentences
        .iter()
        .map(|s| s.split_whitespace().count())
        .sum();
    words as f32 / sentences.len() as f32
}
