//! LLM client abstraction and the Groq provider.
//!
//! The pipeline only needs a single capability from a language model:
//! prompt in, text out. [`client::LlmClient`] is that seam; [`groq::GroqClient`]
//! implements it against the Groq chat-completions API.

/// Provider-agnostic client trait.
pub mod client;
/// Groq chat-completions client.
pub mod groq;

pub use client::LlmClient;
pub use groq::GroqClient;
