//! Working memory for one pipeline execution.

use crate::types::SearchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short extracted insight with attributed sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// First line of the block it was derived from, at most 100 chars
    pub title: String,
    /// The whole block, at most 300 chars
    pub content: String,
    /// Up to 2 source URLs, in result order
    pub sources: Vec<String>,
}

/// Execution metadata carried alongside the stage outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMetadata {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Stage names in completion order
    pub steps_completed: Vec<String>,
}

/// Everything one pipeline execution accumulates.
///
/// Created fresh per job attempt and discarded once the outcome is
/// persisted; only `report` (and the task's status/error) survive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    pub query: String,
    pub plan: String,
    pub search_queries: Vec<String>,
    pub search_results: Vec<SearchResult>,
    pub analysis: String,
    pub findings: Vec<Finding>,
    pub report: String,
    pub metadata: StateMetadata,
}

impl ResearchState {
    /// Fresh state for a query, clock started
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            plan: String::new(),
            search_queries: Vec::new(),
            search_results: Vec::new(),
            analysis: String::new(),
            findings: Vec::new(),
            report: String::new(),
            metadata: StateMetadata {
                start_time: Utc::now(),
                end_time: None,
                steps_completed: Vec::new(),
            },
        }
    }

    /// Record a stage as completed
    pub fn complete_step(&mut self, step: &str) {
        self.metadata.steps_completed.push(step.to_string());
    }

    /// Elapsed execution time in seconds, using now if still running
    pub fn elapsed_secs(&self) -> f64 {
        let end = self.metadata.end_time.unwrap_or_else(Utc::now);
        (end - self.metadata.start_time).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty() {
        let state = ResearchState::new("what is rust");
        assert_eq!(state.query, "what is rust");
        assert!(state.plan.is_empty());
        assert!(state.search_results.is_empty());
        assert!(state.metadata.steps_completed.is_empty());
        assert!(state.metadata.end_time.is_none());
    }

    #[test]
    fn test_steps_completed_ordering() {
        let mut state = ResearchState::new("q");
        state.complete_step("plan");
        state.complete_step("search");
        assert_eq!(state.metadata.steps_completed, vec!["plan", "search"]);
    }

    #[test]
    fn test_elapsed_uses_end_time_when_set() {
        let mut state = ResearchState::new("q");
        state.metadata.end_time = Some(state.metadata.start_time + chrono::Duration::seconds(4));
        assert!((state.elapsed_secs() - 4.0).abs() < f64::EPSILON);
    }
}
