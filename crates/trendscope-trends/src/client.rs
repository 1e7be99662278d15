//! Typed client for the trends API.
//!
//! All endpoints share a JSON envelope with a `"status"` field; API-level
//! errors surface as [`TrendsError::Api`], throttling as
//! [`TrendsError::RateLimited`], and network/5xx failures as
//! [`TrendsError::Transient`].

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use trendscope_core::{ConfigError, RelatedQueries, TrendSeries, TrendsError};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    series: TrendSeries,
}

#[derive(Debug, Deserialize)]
struct RelatedResponse {
    queries: RelatedQueries,
}

/// Client for the trends API.
///
/// Holds the HTTP client, base URL, and retry policy. Point `base_url` at a
/// mock server in tests.
pub struct TrendsClient {
    client: Client,
    base_url: Url,
    pub(crate) max_retries: u32,
    pub(crate) backoff_base_ms: u64,
}

impl TrendsClient {
    /// Creates a new client for the trends API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if `base_url` is not a valid URL
    /// or the underlying `reqwest::Client` cannot be constructed.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("trendscope/0.1 (keyword-discovery)")
            .build()
            .map_err(|e| {
                ConfigError::Validation(format!("failed to build trends HTTP client: {e}"))
            })?;

        // Normalise: exactly one trailing slash so query_pairs_mut writes to
        // the root path rather than replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            ConfigError::Validation(format!("invalid trends base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client,
            base_url,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    /// Overrides the retry policy applied by the `TrendsSource` impl.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Fetches the interest-over-time series for one keyword.
    ///
    /// A single call with no retry; the `TrendsSource` impl layers the
    /// back-off policy on top.
    ///
    /// # Errors
    ///
    /// - [`TrendsError::NoData`] if the source reports an empty series.
    /// - [`TrendsError::RateLimited`] on HTTP 429.
    /// - [`TrendsError::Transient`] on network failure or 5xx.
    /// - [`TrendsError::Api`] if the envelope status is `"ERROR"`.
    /// - [`TrendsError::Deserialize`] if the body does not match the
    ///   expected shape.
    pub async fn interest_over_time(
        &self,
        keyword: &str,
        geo: &str,
        timeframe: &str,
    ) -> Result<TrendSeries, TrendsError> {
        let url = self.build_url(
            "interestOverTime",
            &[("kw", keyword), ("geo", geo), ("timeframe", timeframe)],
        );
        let context = format!("interestOverTime(kw={keyword}, geo={geo})");
        let body = self.request_json(url, &context).await?;
        Self::check_api_error(&body)?;

        let envelope: SeriesResponse =
            serde_json::from_value(body).map_err(|e| TrendsError::Deserialize {
                context,
                source: e,
            })?;

        if envelope.series.points.is_empty() {
            return Err(TrendsError::NoData);
        }

        Ok(envelope.series)
    }

    /// Fetches related and rising query candidates for one seed keyword.
    ///
    /// Empty candidate lists are a valid result.
    ///
    /// # Errors
    ///
    /// Same error set as [`TrendsClient::interest_over_time`], minus the
    /// empty-series `NoData` mapping.
    pub async fn related_queries(
        &self,
        keyword: &str,
        geo: &str,
    ) -> Result<RelatedQueries, TrendsError> {
        let url = self.build_url("relatedQueries", &[("kw", keyword), ("geo", geo)]);
        let context = format!("relatedQueries(kw={keyword}, geo={geo})");
        let body = self.request_json(url, &context).await?;
        Self::check_api_error(&body)?;

        let envelope: RelatedResponse =
            serde_json::from_value(body).map_err(|e| TrendsError::Deserialize {
                context,
                source: e,
            })?;

        Ok(envelope.queries)
    }

    /// Builds the full request URL with percent-encoded query parameters.
    fn build_url(&self, op: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("op", op);
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        url
    }

    /// Performs the GET and maps transport-level failures into the taxonomy.
    async fn request_json(
        &self,
        url: Url,
        context: &str,
    ) -> Result<serde_json::Value, TrendsError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TrendsError::RateLimited);
        }
        if status.is_server_error() {
            return Err(TrendsError::Transient(format!(
                "trends source returned HTTP {status}"
            )));
        }
        if !status.is_success() {
            return Err(TrendsError::Api(format!(
                "unexpected HTTP {status} from trends source"
            )));
        }

        let text = response.text().await.map_err(map_transport_error)?;
        serde_json::from_str(&text).map_err(|e| TrendsError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    /// Surfaces `"status": "ERROR"` envelopes as [`TrendsError::Api`].
    fn check_api_error(body: &serde_json::Value) -> Result<(), TrendsError> {
        if body.get("status").and_then(|s| s.as_str()) == Some("ERROR") {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unspecified error");
            return Err(TrendsError::Api(message.to_string()));
        }
        Ok(())
    }
}

fn map_transport_error(err: reqwest::Error) -> TrendsError {
    TrendsError::Transient(err.to_string())
}
