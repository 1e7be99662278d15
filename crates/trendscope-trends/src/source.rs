use async_trait::async_trait;

use trendscope_core::{RelatedQueries, TrendSeries, TrendsError, TrendsSource};

use crate::client::TrendsClient;
use crate::retry::retry_with_backoff;

/// Production [`TrendsSource`]: the raw client endpoints wrapped in the
/// configured retry policy, so the aggregator sees only final outcomes.
#[async_trait]
impl TrendsSource for TrendsClient {
    async fn series(
        &self,
        keyword: &str,
        geo: &str,
        timeframe: &str,
    ) -> Result<TrendSeries, TrendsError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.interest_over_time(keyword, geo, timeframe)
        })
        .await
    }

    async fn related(&self, keyword: &str, geo: &str) -> Result<RelatedQueries, TrendsError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.related_queries(keyword, geo)
        })
        .await
    }
}
