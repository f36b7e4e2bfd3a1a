//! The four-stage research agent: plan, search, analyze, report.
//!
//! [`pipeline::AgentPipeline`] drives the stages strictly in order against
//! the LLM and search capabilities, accumulating everything in a
//! [`state::ResearchState`] that lives only for one execution.

/// Pipeline execution across the four stages.
pub mod pipeline;
/// Working state accumulated across stages.
pub mod state;

pub use pipeline::{AgentPipeline, PipelineStep};
pub use state::{Finding, ResearchState};
