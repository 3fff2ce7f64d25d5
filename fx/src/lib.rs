//! Exchange FX
//!
//! Exchange rate store backed by an openexchangerates.org style API and a
//! local cache file, with exact rational conversion.
//!
//! # Features
//!
//! - Rates fetched through a pluggable [`RateFetcher`]
//! - One JSON cache file per base currency with a configurable TTL
//! - Conversions computed as exact fractions
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use exchange_fx::{HttpFetcherConfig, HttpRateFetcher, RateStore, RateStoreConfig};
//!
//! let fetcher = HttpRateFetcher::new(HttpFetcherConfig::new(app_id))?;
//! let store = RateStore::new(Arc::new(fetcher), RateStoreConfig::for_user("usd")?)?;
//!
//! let quantity = exchange_common::parse_exact("1")?;
//! let eur = store.convert("EUR", &quantity).await?;
//! println!("{}", exchange_common::to_fixed(&eur, 2));
//! ```

pub mod cache;
pub mod error;
pub mod provider;
pub mod store;
pub mod table;

pub use cache::CacheError;
pub use error::{FxError, FxResult};
pub use provider::{HttpFetcherConfig, HttpRateFetcher, RateFetcher, DEFAULT_ENDPOINT};
#[cfg(any(test, feature = "test-utils"))]
pub use provider::{MockRateFetcher, MockResponse};
pub use store::{RateStore, RateStoreConfig};
pub use table::RateTable;
