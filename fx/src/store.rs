//! Rate store: keeps the latest rate table fresh and converts quantities.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use exchange_common::{
    constants, is_within, normalize_base, normalize_target, parse_exact, BigRational,
};
use num_traits::Zero;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::cache::{self, CacheError};
use crate::error::{FxError, FxResult};
use crate::provider::RateFetcher;
use crate::table::RateTable;

/// Directory under the user cache directory holding rate files.
pub const CACHE_DIRECTORY_NAME: &str = "openexchangerates";

/// Configuration for a [`RateStore`].
#[derive(Debug, Clone)]
pub struct RateStoreConfig {
    /// Currency the rate table is denominated against.
    pub base_currency: String,
    /// Directory holding `<base>.json` cache files.
    pub cache_directory: PathBuf,
    /// Maximum age of rate data before a refresh.
    pub time_to_live: Duration,
}

impl RateStoreConfig {
    /// Create a configuration caching into `cache_directory`.
    pub fn new(base_currency: impl Into<String>, cache_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_currency: base_currency.into(),
            cache_directory: cache_directory.into(),
            time_to_live: constants::default_time_to_live(),
        }
    }

    /// Create a configuration caching into the user cache directory.
    pub fn for_user(base_currency: impl Into<String>) -> FxResult<Self> {
        Ok(Self::new(base_currency, default_cache_directory()?))
    }

    /// Use a different cache directory.
    pub fn with_cache_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.cache_directory = directory.into();
        self
    }

    /// Set how long fetched rates stay fresh.
    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = ttl;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> FxResult<()> {
        if normalize_base(&self.base_currency).is_empty() {
            return Err(FxError::Config("Base currency cannot be empty".to_string()));
        }

        if self.cache_directory.as_os_str().is_empty() {
            return Err(FxError::Config("Cache directory cannot be empty".to_string()));
        }

        if self.time_to_live <= Duration::zero() {
            return Err(FxError::Config("Time to live must be positive".to_string()));
        }

        Ok(())
    }
}

/// Default cache directory: `<user cache dir>/openexchangerates`.
pub fn default_cache_directory() -> FxResult<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(CACHE_DIRECTORY_NAME))
        .ok_or_else(|| FxError::Config("getting cache directory: none available".to_string()))
}

/// Table plus the rates derived from it. Always replaced together.
#[derive(Default)]
struct RateState {
    table: RateTable,
    rates: HashMap<String, BigRational>,
}

/// Owns the latest rate table for one base currency.
///
/// Rates are refreshed on demand: the first call loads the cache file, and
/// any call after the time to live has passed fetches from the network and
/// rewrites the cache. There is no background refresh and no retry.
pub struct RateStore {
    fetcher: Arc<dyn RateFetcher>,
    base_currency: String,
    cache_path: PathBuf,
    time_to_live: Duration,
    state: RwLock<RateState>,
}

impl RateStore {
    /// Create a store. The base currency is trimmed and lowercased.
    pub fn new(fetcher: Arc<dyn RateFetcher>, config: RateStoreConfig) -> FxResult<Self> {
        config.validate()?;

        let base_currency = normalize_base(&config.base_currency);
        let cache_path = cache::cache_path(&config.cache_directory, &base_currency);

        Ok(Self {
            fetcher,
            base_currency,
            cache_path,
            time_to_live: config.time_to_live,
            state: RwLock::new(RateState::default()),
        })
    }

    /// Normalised base currency.
    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Cache file backing this store.
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Configured time to live.
    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    /// Copy of the current rate table.
    pub async fn snapshot(&self) -> RateTable {
        self.state.read().await.table.clone()
    }

    /// Currently known rate for `currency`, without refreshing.
    pub async fn rate(&self, currency: &str) -> Option<BigRational> {
        self.state
            .read()
            .await
            .rates
            .get(&normalize_target(currency))
            .cloned()
    }

    /// Whether the in-memory rates are younger than the time to live.
    pub async fn is_fresh(&self) -> bool {
        is_within(self.state.read().await.table.timestamp, self.time_to_live)
    }

    /// Make sure the rates are younger than the time to live.
    ///
    /// Loads the cache file when nothing is in memory yet, then fetches from
    /// the network if the data is still too old. The new table replaces the
    /// old one only after it has been fetched and parsed in full. Fetch and
    /// cache write failures are returned to the caller.
    #[instrument(skip(self), fields(base = %self.base_currency))]
    pub async fn ensure_fresh(&self) -> FxResult<()> {
        if self.is_fresh().await {
            debug!("Rates are fresh");
            return Ok(());
        }

        let mut state = self.state.write().await;

        if !state.table.is_loaded() {
            self.load_cache(&mut state);
        }

        // Another caller may have refreshed while we waited for the lock.
        if is_within(state.table.timestamp, self.time_to_live) {
            debug!(timestamp = state.table.timestamp, "Rates are fresh");
            return Ok(());
        }

        info!(fetcher = self.fetcher.name(), "Refreshing rates");

        let table = self.fetcher.fetch(&self.base_currency).await?;
        let rates = table.exchange_rates()?;

        state.table = table;
        state.rates = rates;

        cache::save(&self.cache_path, &state.table).map_err(|source| FxError::CacheSave {
            path: self.cache_path.clone(),
            source,
        })?;

        info!(
            timestamp = state.table.timestamp,
            published = ?state.table.fetched_at(),
            rates = state.rates.len(),
            "Rates refreshed"
        );

        Ok(())
    }

    /// Convert `quantity` into `currency`.
    ///
    /// The result is the stored rate for `currency` divided by `quantity`.
    #[instrument(skip(self, quantity), fields(base = %self.base_currency, quantity = %quantity))]
    pub async fn convert(&self, currency: &str, quantity: &BigRational) -> FxResult<BigRational> {
        let currency = normalize_target(currency);

        if quantity.is_zero() {
            return Err(FxError::ZeroQuantity);
        }

        self.ensure_fresh().await?;

        let state = self.state.read().await;
        let rate = state
            .rates
            .get(&currency)
            .ok_or_else(|| FxError::NoExchangeRate {
                base_currency: self.base_currency.clone(),
                currency: currency.clone(),
            })?;

        let result = rate / quantity;

        debug!(currency = %currency, rate = %rate, result = %result, "Converted");
        Ok(result)
    }

    /// Convert a decimal string quantity into `currency`.
    pub async fn convert_decimal(&self, currency: &str, quantity: &str) -> FxResult<BigRational> {
        let quantity = parse_exact(quantity)?;
        self.convert(currency, &quantity).await
    }

    fn load_cache(&self, state: &mut RateState) {
        let path = self.cache_path.display();

        let table = match cache::load(&self.cache_path) {
            Ok(table) => table,
            Err(CacheError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path, "No cached rates");
                return;
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Ignoring unreadable rate cache");
                return;
            }
        };

        match table.exchange_rates() {
            Ok(rates) => {
                debug!(path = %path, timestamp = table.timestamp, "Using cached rates");
                state.table = table;
                state.rates = rates;
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Ignoring rate cache with invalid rates");
            }
        }
    }
}
