//! Scripted extraction providers for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::{ExtractionError, ExtractionProvider};

const EMPTY_RESULT: &str = r#"{"entities": [], "relationships": []}"#;

/// Returns canned responses in order, then an empty-result JSON once the
/// script runs out. Call counts are observable for assertions.
pub struct ScriptedExtractor {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl ScriptedExtractor {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ExtractionProvider for ScriptedExtractor {
    async fn complete(&self, _prompt: &str) -> Result<String, ExtractionError> {
        *self.calls.lock().unwrap() += 1;
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| EMPTY_RESULT.to_string()))
    }
}

/// Keys responses by a substring match against the prompt, so tests indexing
/// several documents do not depend on call order. Falls back to empty.
pub struct KeyedExtractor {
    routes: Vec<(String, String)>,
}

impl KeyedExtractor {
    pub fn new(routes: Vec<(&str, &str)>) -> Self {
        Self {
            routes: routes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl ExtractionProvider for KeyedExtractor {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        for (needle, response) in &self.routes {
            if prompt.contains(needle.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(EMPTY_RESULT.to_string())
    }
}

/// Always fails, for exercising extraction-failure degradation.
pub struct FailingExtractor;

#[async_trait]
impl ExtractionProvider for FailingExtractor {
    async fn complete(&self, _prompt: &str) -> Result<String, ExtractionError> {
        Err(ExtractionError::Http("fake extractor is offline".to_string()))
    }
}
