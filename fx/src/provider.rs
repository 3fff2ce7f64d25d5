//! Rate fetcher trait and the HTTP implementation.

use async_trait::async_trait;
use chrono::Duration;
use exchange_common::{constants, normalize_base, DurationExt};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{redirect, Client, StatusCode, Url};
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};
use crate::table::RateTable;

/// Latest-rates endpoint of openexchangerates.org.
pub const DEFAULT_ENDPOINT: &str = "https://openexchangerates.org/api/latest.json";

/// Source of fresh rate tables.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Get the fetcher name.
    fn name(&self) -> &str;

    /// Fetch the latest rates against `base_currency`.
    async fn fetch(&self, base_currency: &str) -> FxResult<RateTable>;
}

/// Configuration for [`HttpRateFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// Latest-rates endpoint URL.
    pub endpoint: String,
    /// Application ID sent in the `Authorization` header.
    pub app_id: String,
    /// Timeout for the whole request.
    pub request_timeout: Duration,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            app_id: String::new(),
            request_timeout: constants::default_request_timeout(),
        }
    }
}

impl HttpFetcherConfig {
    /// Create a configuration for the default endpoint.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Default::default()
        }
    }

    /// Use a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> FxResult<()> {
        Url::parse(&self.endpoint)
            .map_err(|e| FxError::Config(format!("invalid endpoint {:?}: {e}", self.endpoint)))?;

        if self.request_timeout <= Duration::zero() {
            return Err(FxError::Config(
                "Request timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Fetches rate tables from an openexchangerates.org style API.
pub struct HttpRateFetcher {
    client: Client,
    endpoint: Url,
    app_id: String,
}

impl HttpRateFetcher {
    /// Build the HTTP client.
    ///
    /// The client keeps cookies between requests and does not follow
    /// redirects; a redirect shows up as an unexpected status.
    pub fn new(config: HttpFetcherConfig) -> FxResult<Self> {
        config.validate()?;

        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| FxError::Config(format!("invalid endpoint {:?}: {e}", config.endpoint)))?;

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .timeout(config.request_timeout.as_std())
            .build()
            .map_err(|e| FxError::Config(format!("creating HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            app_id: config.app_id,
        })
    }

    /// Get the configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_url(&self, base_currency: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("base", &normalize_base(base_currency));
        url
    }
}

#[async_trait]
impl RateFetcher for HttpRateFetcher {
    fn name(&self) -> &str {
        "openexchangerates"
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch(&self, base_currency: &str) -> FxResult<RateTable> {
        let response = self
            .client
            .get(self.request_url(base_currency))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Token {}", self.app_id))
            .send()
            .await
            .map_err(FxError::Request)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FxError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(FxError::Request)?;
        let table: RateTable = serde_json::from_slice(&body)?;

        debug!(
            timestamp = table.timestamp,
            rates = table.rates.len(),
            "Fetched rates"
        );

        Ok(table)
    }
}

/// What a [`MockRateFetcher`] answers with.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this table.
    Table(RateTable),
    /// Decode this body as if it came off the wire.
    Body(String),
    /// Fail with this HTTP status.
    Status(u16),
}

/// Mock rate fetcher for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateFetcher {
    name: String,
    response: parking_lot::Mutex<MockResponse>,
    delay: parking_lot::Mutex<Option<std::time::Duration>>,
    requests: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateFetcher {
    /// Create a mock that answers with an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: parking_lot::Mutex::new(MockResponse::Table(RateTable::default())),
            delay: parking_lot::Mutex::new(None),
            requests: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Answer subsequent fetches with `table`.
    pub fn set_table(&self, table: RateTable) {
        *self.response.lock() = MockResponse::Table(table);
    }

    /// Answer subsequent fetches with `response`.
    pub fn set_response(&self, response: MockResponse) {
        *self.response.lock() = response;
    }

    /// Sleep before answering.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Number of fetches performed.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Base currencies requested so far, in order.
    pub fn requested_bases(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateFetcher for MockRateFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, base_currency: &str) -> FxResult<RateTable> {
        self.requests.lock().push(base_currency.to_string());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.response.lock().clone();
        match response {
            MockResponse::Table(table) => Ok(table),
            MockResponse::Body(body) => Ok(serde_json::from_str(&body)?),
            MockResponse::Status(code) => Err(FxError::UnexpectedStatus(code)),
        }
    }
}
