//! Four-stage research pipeline: plan -> search -> analyze -> report.
//!
//! Stages run strictly in sequence; each consumes the previous stage's
//! output and mutates the shared [`ResearchState`]. The pipeline never
//! retries internally - a failed LLM or search call fails the whole
//! execution and the orchestrator decides whether to run it again.

use crate::agent::state::{Finding, ResearchState};
use crate::llm::LlmClient;
use crate::search::SearchAggregator;
use crate::types::{AppError, Result, SearchResult};
use chrono::Utc;
use std::sync::Arc;

/// Results requested per extracted search query.
const SEARCH_RESULTS_PER_QUERY: usize = 3;
/// At most this many findings are derived from the analysis.
const MAX_FINDINGS: usize = 5;
/// Analysis blocks shorter than this are discarded as noise.
const MIN_FINDING_LEN: usize = 50;
/// Finding title / content truncation limits, in chars.
const MAX_TITLE_LEN: usize = 100;
const MAX_CONTENT_LEN: usize = 300;
/// Each finding cites at most this many sources.
const MAX_FINDING_SOURCES: usize = 2;

/// One of the four ordered pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Planning,
    Searching,
    Analyzing,
    Generating,
}

impl PipelineStep {
    /// Stable wire name, also used for progress mapping
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Planning => "planning",
            PipelineStep::Searching => "searching",
            PipelineStep::Analyzing => "analyzing",
            PipelineStep::Generating => "generating",
        }
    }
}

/// Drives the four research stages against the LLM and search capabilities.
pub struct AgentPipeline {
    llm: Arc<dyn LlmClient>,
    aggregator: SearchAggregator,
}

impl AgentPipeline {
    pub fn new(llm: Arc<dyn LlmClient>, aggregator: SearchAggregator) -> Self {
        Self { llm, aggregator }
    }

    /// Execute the full pipeline for a query.
    ///
    /// `on_progress` fires once per stage, before that stage's work starts,
    /// so observers see the step currently running. Any underlying failure
    /// surfaces as [`AppError::Pipeline`] with the cause preserved in the
    /// message.
    pub async fn execute<F>(&self, query: &str, on_progress: F) -> Result<ResearchState>
    where
        F: Fn(PipelineStep) + Send + Sync,
    {
        let mut state = ResearchState::new(query);

        // Step 1: Plan
        on_progress(PipelineStep::Planning);
        state.plan = self.plan_research(query).await.map_err(pipeline_err)?;
        state.search_queries = extract_search_queries(&state.plan);
        state.complete_step("plan");
        tracing::info!(queries = state.search_queries.len(), "research planned");

        // Step 2: Search
        on_progress(PipelineStep::Searching);
        state.search_results = self
            .aggregator
            .search_multiple(&state.search_queries, SEARCH_RESULTS_PER_QUERY)
            .await
            .map_err(pipeline_err)?;
        state.complete_step("search");
        tracing::info!(sources = state.search_results.len(), "sources gathered");

        // Step 3: Analyze
        on_progress(PipelineStep::Analyzing);
        state.analysis = self
            .analyze_results(query, &state.search_results)
            .await
            .map_err(pipeline_err)?;
        state.findings = extract_findings(&state.analysis, &state.search_results);
        state.complete_step("analyze");
        tracing::info!(findings = state.findings.len(), "key findings extracted");

        // Step 4: Generate report (pure, no upstream calls)
        on_progress(PipelineStep::Generating);
        state.metadata.end_time = Some(Utc::now());
        state.report = build_report(&state);
        state.complete_step("generate");
        tracing::info!("report generated");

        Ok(state)
    }

    async fn plan_research(&self, query: &str) -> Result<String> {
        let prompt = format!(
            "You are a research strategist. For the following query, create a brief research plan with 3-5 search queries.\n\n\
             Query: {}\n\n\
             Respond with:\n\
             1. Brief analysis of what we need to find\n\
             2. List of specific search queries (one per line, starting with -)\n\n\
             Be concise and strategic.",
            query
        );

        self.llm.generate(&prompt).await
    }

    async fn analyze_results(&self, query: &str, results: &[SearchResult]) -> Result<String> {
        let content = results
            .iter()
            .map(|r| format!("Title: {}\nContent: {}", r.title, r.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Analyze the following search results for the query: \"{}\"\n\n\
             Results:\n{}\n\n\
             Provide a comprehensive analysis including:\n\
             1. Main themes and patterns\n\
             2. Key insights\n\
             3. Notable findings\n\
             4. Any gaps or limitations\n\n\
             Be thorough but concise.",
            query, content
        );

        self.llm.generate(&prompt).await
    }
}

fn pipeline_err(err: AppError) -> AppError {
    match err {
        AppError::Pipeline(msg) => AppError::Pipeline(msg),
        other => AppError::Pipeline(other.to_string()),
    }
}

/// Pull search queries out of a plan: every line whose trimmed text starts
/// with `-`, marker stripped. Zero queries is a valid (degenerate) outcome.
fn extract_search_queries(plan: &str) -> Vec<String> {
    plan.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-'))
        .map(|line| line.trim_start_matches('-').trim().to_string())
        .filter(|query| !query.is_empty())
        .collect()
}

/// Derive findings from the analysis text.
///
/// The analysis is split into paragraph-like blocks on blank lines; only the
/// first [`MAX_FINDINGS`] blocks are considered, and blocks at or under
/// [`MIN_FINDING_LEN`] chars are dropped. Source attribution is a coarse
/// heuristic: every finding cites the first two result URLs.
fn extract_findings(analysis: &str, sources: &[SearchResult]) -> Vec<Finding> {
    let cited: Vec<String> = sources
        .iter()
        .take(MAX_FINDING_SOURCES)
        .map(|s| s.url.clone())
        .collect();

    analysis
        .split("\n\n")
        .take(MAX_FINDINGS)
        .filter(|section| section.trim().chars().count() > MIN_FINDING_LEN)
        .map(|section| {
            let first_line = section.lines().next().unwrap_or_default();
            Finding {
                title: truncate_chars(strip_numbering(first_line), MAX_TITLE_LEN),
                content: truncate_chars(section, MAX_CONTENT_LEN),
                sources: cited.clone(),
            }
        })
        .collect()
}

/// Strip a leading "N. " enumeration marker from a finding title.
fn strip_numbering(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() < line.len() {
        if let Some(stripped) = rest.strip_prefix('.') {
            return stripped.trim_start();
        }
    }
    line
}

/// Char-boundary-safe truncation.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Assemble the final report from the accumulated state. Pure function of
/// the state; the only clock read is the fallback for a missing end time.
fn build_report(state: &ResearchState) -> String {
    let findings = state
        .findings
        .iter()
        .enumerate()
        .map(|(i, f)| format!("### {}. {}\n\n{}", i + 1, f.title, f.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let sources = state
        .search_results
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] [{}]({})", i + 1, s.title, s.url))
        .collect::<Vec<_>>()
        .join("\n");

    let methodology = format!(
        "Report Generated: {}\n\
         Query: {}\n\
         Sources Analyzed: {}\n\
         Key Findings: {}\n\
         Duration: {}s",
        Utc::now().to_rfc3339(),
        state.query,
        state.search_results.len(),
        state.findings.len(),
        state.elapsed_secs()
    );

    let summary = state.analysis.split("\n\n").next().unwrap_or_default();

    format!(
        "# Research Report: {}\n\n\
         ## Executive Summary\n{}\n\n\
         ## Key Findings\n{}\n\n\
         ## Methodology\n{}\n\n\
         ## Sources\n{}",
        state.query, summary, findings, methodology, sources
    )
}
