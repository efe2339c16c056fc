use std::collections::BTreeMap;

use axum::http::HeaderMap;

pub mod discord_validation;
pub mod logging;

/// Flattens an HTTP header map into owned strings, skipping values that are not visible ASCII.
pub fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
