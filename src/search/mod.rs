//! Web search capability and multi-query aggregation.
//!
//! [`client::SearchClient`] abstracts the outbound search provider;
//! [`tavily::TavilyClient`] implements it against the Tavily API.
//! [`aggregator::SearchAggregator`] fans a set of queries out concurrently
//! and merges the results, deduplicating by URL.

/// Search aggregation across multiple queries.
pub mod aggregator;
/// Provider-agnostic search client trait.
pub mod client;
/// Tavily search API client.
pub mod tavily;

pub use aggregator::SearchAggregator;
pub use client::SearchClient;
pub use tavily::TavilyClient;
