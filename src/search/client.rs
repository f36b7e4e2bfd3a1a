use crate::types::{Result, SearchResult};
use async_trait::async_trait;

/// Generic web search trait for provider abstraction
///
/// Implementations return results in the provider's relevance order,
/// bounded to `max_results`.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run a single search query
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}
