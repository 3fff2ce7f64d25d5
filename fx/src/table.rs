//! Rate table as served by the rates API and stored in the cache file.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use exchange_common::{normalize_target, parse_exact, BigRational};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::error::{FxError, FxResult};

/// Latest rates against one base currency.
///
/// Rates are kept in their decimal text form so that nothing is lost to
/// floating point between the wire, the cache file and [`parse_exact`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    /// API disclaimer, carried verbatim.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub disclaimer: String,
    /// API license, carried verbatim.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license: String,
    /// When the rates were published, in Unix epoch seconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,
    /// Base currency as reported by the API.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base: String,
    /// Currency code to decimal rate.
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        serialize_with = "serialize_rates",
        deserialize_with = "deserialize_rates"
    )]
    pub rates: BTreeMap<String, String>,
}

impl RateTable {
    /// Whether the table holds data from a fetch or cache load.
    pub fn is_loaded(&self) -> bool {
        self.timestamp != 0
    }

    /// Publication time, if representable.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }

    /// Parse every rate into an exact rational, keyed by uppercase code.
    pub fn exchange_rates(&self) -> FxResult<HashMap<String, BigRational>> {
        self.rates
            .iter()
            .map(|(code, rate)| {
                parse_exact(rate)
                    .map(|value| (normalize_target(code), value))
                    .map_err(|source| FxError::InvalidRate {
                        currency: code.clone(),
                        source,
                    })
            })
            .collect()
    }
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Accept rates as JSON numbers or strings, keeping the exact text.
fn deserialize_rates<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;

    raw.into_iter()
        .map(|(code, value)| match value {
            Value::Number(number) => Ok((code, number.to_string())),
            Value::String(text) => Ok((code, text)),
            other => Err(serde::de::Error::custom(format!(
                "rate for {code} is not a number: {other}"
            ))),
        })
        .collect()
}

/// Write rates back as JSON numbers where the text is a valid number literal.
fn serialize_rates<S>(rates: &BTreeMap<String, String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(rates.len()))?;
    for (code, rate) in rates {
        match rate.parse::<Number>() {
            Ok(number) => map.serialize_entry(code, &number)?,
            Err(_) => map.serialize_entry(code, rate)?,
        }
    }
    map.end()
}
