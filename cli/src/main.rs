//! Exchange CLI
//!
//! Converts a quantity of one currency into another using cached
//! openexchangerates.org rates.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_common::{normalize_base, parse_exact, to_fixed, BigRational};
use exchange_fx::{FxError, HttpRateFetcher, RateFetcher, RateStore, RateStoreConfig};

mod config;

use config::ExchangeConfig;

const EXIT_ERROR: u8 = 1;
const EXIT_ARGUMENT_ERROR: u8 = 2;

/// Exchange CLI
#[derive(Parser, Debug)]
#[command(name = "exchange")]
#[command(about = "Convert currency amounts using openexchangerates.org rates")]
struct Args {
    /// Quantity of the currency
    #[arg(long, value_parser = parse_quantity)]
    qty: BigRational,

    /// Base currency
    #[arg(long, default_value = "usd")]
    base: String,

    /// Currency to convert to
    #[arg(long, default_value = "eur")]
    currency: String,

    /// Rates endpoint (overrides EXCHANGE_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Cache directory (overrides EXCHANGE_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Seconds before cached rates are refreshed (overrides EXCHANGE_TTL_SECS)
    #[arg(long)]
    ttl_secs: Option<i64>,
}

fn parse_quantity(s: &str) -> Result<BigRational, String> {
    parse_exact(s).map_err(|e| e.to_string())
}

/// Why a run did not produce a result line.
#[derive(Debug)]
enum Failure {
    /// Bad arguments or configuration.
    Setup(anyhow::Error),
    /// The conversion itself failed.
    Convert(FxError),
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Failure::Setup(_) => EXIT_ARGUMENT_ERROR,
            Failure::Convert(_) => EXIT_ERROR,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = ExchangeConfig::from_env();

    // Logs go to stderr, stdout carries the result only
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args, config, http_fetcher).await {
        Ok(line) => {
            println!("{line}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            match &failure {
                Failure::Setup(e) => {
                    error!(error = %format!("{e:#}"), "Invalid configuration");
                }
                Failure::Convert(e) => {
                    error!(
                        base_currency = %normalize_base(&args.base),
                        currency = %args.currency,
                        qty = %args.qty,
                        op = "convert",
                        error = %e,
                        "Conversion failed"
                    );
                }
            }
            ExitCode::from(failure.exit_code())
        }
    }
}

/// Apply flags, set up the store and convert, returning the output line.
async fn run<F>(args: &Args, config: ExchangeConfig, connect: F) -> Result<String, Failure>
where
    F: FnOnce(&ExchangeConfig) -> anyhow::Result<Arc<dyn RateFetcher>>,
{
    let config = config
        .with_overrides(args.endpoint.clone(), args.cache_dir.clone(), args.ttl_secs)
        .and_then(|config| config.validate().map(|()| config))
        .map_err(|e| Failure::Setup(anyhow!(e)))?;

    let fetcher = connect(&config).map_err(Failure::Setup)?;
    let store = build_store(&config, &args.base, fetcher).map_err(Failure::Setup)?;

    let result = tokio::select! {
        result = store.convert(&args.currency, &args.qty) => result,
        Ok(()) = tokio::signal::ctrl_c() => Err(FxError::Cancelled),
    };

    let value = result.map_err(Failure::Convert)?;

    Ok(format_result(
        &args.qty,
        store.base_currency(),
        &value,
        &args.currency,
    ))
}

fn format_result(qty: &BigRational, base: &str, value: &BigRational, currency: &str) -> String {
    format!("{} {base} is {} {currency}", to_fixed(qty, 2), to_fixed(value, 2))
}

fn http_fetcher(config: &ExchangeConfig) -> anyhow::Result<Arc<dyn RateFetcher>> {
    let fetcher = HttpRateFetcher::new(config.fetcher_config()).context("creating rate fetcher")?;
    debug!(endpoint = %fetcher.endpoint(), "Using rates endpoint");
    Ok(Arc::new(fetcher))
}

fn build_store(
    config: &ExchangeConfig,
    base: &str,
    fetcher: Arc<dyn RateFetcher>,
) -> anyhow::Result<RateStore> {
    let store_config = match &config.cache_directory {
        Some(dir) => RateStoreConfig::new(base, dir),
        None => RateStoreConfig::for_user(base).context("resolving cache directory")?,
    }
    .with_time_to_live(config.time_to_live);

    RateStore::new(fetcher, store_config).context("creating rate store")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use exchange_common::unix_now;
    use exchange_fx::{MockRateFetcher, MockResponse, RateTable};
    use std::path::Path;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["exchange", "--qty", "12.34"]).unwrap();

        assert_eq!(args.qty, parse_exact("12.34").unwrap());
        assert_eq!(args.base, "usd");
        assert_eq!(args.currency, "eur");
        assert!(args.endpoint.is_none());
    }

    #[test]
    fn test_args_require_valid_qty() {
        assert!(Args::try_parse_from(["exchange"]).is_err());
        assert!(Args::try_parse_from(["exchange", "--qty", "1.2.3"]).is_err());
    }

    const BODY: &str = r#"{"base": "USD", "rates": {"EUR": 0.959877, "JPY": 154.78}}"#;

    fn mock_fetcher() -> Arc<MockRateFetcher> {
        let fetcher = Arc::new(MockRateFetcher::new("test"));
        let mut table: RateTable = serde_json::from_str(BODY).unwrap();
        table.timestamp = unix_now();
        fetcher.set_table(table);
        fetcher
    }

    fn args(extra: &[&str], dir: &Path) -> Args {
        let dir = dir.to_str().unwrap();
        let mut argv = vec!["exchange", "--cache-dir", dir];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn config() -> ExchangeConfig {
        ExchangeConfig {
            app_id: "abc".to_string(),
            ..Default::default()
        }
    }

    async fn run_with(
        args: &Args,
        config: ExchangeConfig,
        fetcher: &Arc<MockRateFetcher>,
    ) -> Result<String, Failure> {
        let fetcher: Arc<dyn RateFetcher> = fetcher.clone();
        run(args, config, move |_| Ok(fetcher)).await
    }

    #[test]
    fn test_format_result() {
        let line = format_result(
            &parse_exact("12.345").unwrap(),
            "usd",
            &parse_exact("0.125").unwrap(),
            "eur",
        );
        assert_eq!(line, "12.35 usd is 0.13 eur");
    }

    #[tokio::test]
    async fn test_run_prints_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = mock_fetcher();
        let args = args(&["--qty", "1", "--base", "USD", "--currency", "EUR"], dir.path());

        let line = run_with(&args, config(), &fetcher).await.unwrap();

        assert_eq!(line, "1.00 usd is 0.96 EUR");
        assert_eq!(fetcher.requested_bases(), vec!["usd"]);
        assert!(dir.path().join("usd.json").exists());
    }

    #[tokio::test]
    async fn test_run_missing_currency_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = mock_fetcher();
        let args = args(&["--qty", "1", "--currency", "xyz"], dir.path());

        let failure = run_with(&args, config(), &fetcher).await.unwrap_err();

        assert_eq!(failure.exit_code(), EXIT_ERROR);
        assert!(matches!(
            failure,
            Failure::Convert(FxError::NoExchangeRate { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_fetch_failure_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = mock_fetcher();
        fetcher.set_response(MockResponse::Status(401));
        let args = args(&["--qty", "1"], dir.path());

        let failure = run_with(&args, config(), &fetcher).await.unwrap_err();

        assert_eq!(failure.exit_code(), EXIT_ERROR);
    }

    #[tokio::test]
    async fn test_run_missing_app_id_is_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = mock_fetcher();
        let args = args(&["--qty", "1"], dir.path());

        let failure = run_with(&args, ExchangeConfig::default(), &fetcher)
            .await
            .unwrap_err();

        assert_eq!(failure.exit_code(), EXIT_ARGUMENT_ERROR);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_run_empty_base_is_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = mock_fetcher();
        let args = args(&["--qty", "1", "--base", "  "], dir.path());

        let failure = run_with(&args, config(), &fetcher).await.unwrap_err();

        assert_eq!(failure.exit_code(), EXIT_ARGUMENT_ERROR);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_run_out_of_range_ttl_is_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = mock_fetcher();
        let huge = i64::MAX.to_string();
        let args = args(&["--qty", "1", "--ttl-secs", huge.as_str()], dir.path());

        let failure = run_with(&args, config(), &fetcher).await.unwrap_err();

        assert_eq!(failure.exit_code(), EXIT_ARGUMENT_ERROR);
        assert_eq!(fetcher.calls(), 0);
    }

    #[test]
    fn test_build_store_uses_cache_dir() {
        let config = ExchangeConfig {
            app_id: "abc".to_string(),
            cache_directory: Some(PathBuf::from("/tmp/rates")),
            ..Default::default()
        };

        let store = build_store(&config, " USD ", mock_fetcher()).unwrap();

        assert_eq!(store.base_currency(), "usd");
        assert_eq!(store.cache_path(), PathBuf::from("/tmp/rates/usd.json"));
        assert_eq!(store.time_to_live(), config.time_to_live);
    }
}
