//! Multi-query search fan-out with URL deduplication.

use crate::search::client::SearchClient;
use crate::types::{Result, SearchResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Fans queries out to the search capability concurrently and merges the
/// result lists into one deduplicated set.
///
/// Merge order is stable: results are kept in the order the queries were
/// issued, and within a query in the provider's relevance order. The first
/// occurrence of a URL wins; later occurrences are dropped regardless of
/// which query produced them.
pub struct SearchAggregator {
    client: Arc<dyn SearchClient>,
}

impl SearchAggregator {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self { client }
    }

    /// Run every query concurrently and merge the results.
    ///
    /// A failure of any single query fails the whole aggregation; the retry
    /// policy above the pipeline is the recovery path. An empty query list
    /// is valid and yields an empty result set.
    pub async fn search_multiple(
        &self,
        queries: &[String],
        per_query_limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let searches = queries
            .iter()
            .map(|query| self.client.search(query, per_query_limit));

        // try_join_all preserves the order queries were issued in, so the
        // dedup pass below sees results in query-then-result order.
        let per_query: Vec<Vec<SearchResult>> = futures::future::try_join_all(searches).await?;

        let mut seen_urls = HashSet::new();
        let mut merged = Vec::new();
        for results in per_query {
            for result in results {
                if seen_urls.insert(result.url.clone()) {
                    merged.push(result);
                }
            }
        }

        tracing::debug!(
            queries = queries.len(),
            unique_results = merged.len(),
            "search aggregation finished"
        );

        Ok(merged)
    }
}
