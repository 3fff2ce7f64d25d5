//! Currency code normalisation.
//!
//! Base currencies travel lowercased (they end up in URLs and cache file
//! names) while rate lookups are keyed by the uppercase ISO 4217 code used in
//! the API's `rates` object.

/// Normalise a base currency code: trimmed and lowercased.
pub fn normalize_base(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Normalise a target currency code: trimmed and uppercased.
pub fn normalize_target(code: &str) -> String {
    code.trim().to_uppercase()
}
