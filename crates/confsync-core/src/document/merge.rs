//! Overlaying persisted JSON onto the default document.
//!
//! A file on disk may have been written by an older build (missing newer
//! fields), edited by hand (unknown or mistyped fields), or only partially
//! filled in.  [`merge_with_defaults`] turns any of those into a fully
//! populated [`AppConfig`]:
//!
//! 1. Top level: every key of the raw object that also exists in the default
//!    document replaces the default value.  Unknown keys are dropped.
//! 2. `proxy`: merged field by field over the default proxy record, so a
//!    partial proxy block never clobbers unrelated default proxy fields.
//! 3. `proxy.upstream_proxy`: merged field by field over the upstream record's
//!    own defaults, even when the default document has no upstream proxy.
//!
//! A value whose JSON type does not fit the schema is ignored and the default
//! for that field is kept.  Only a document that is not a JSON object at all
//! is rejected.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::config::{AppConfig, ProxyConfig, UpstreamProxyConfig};

const PROXY_KEY: &str = "proxy";
const UPSTREAM_PROXY_KEY: &str = "upstream_proxy";

/// Error type for reading a persisted document.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The text is not valid JSON.
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The JSON is valid but its top level is not an object.
    #[error("config document must be a JSON object")]
    NotAnObject,
}

/// Parses persisted text and merges it over the defaults.
///
/// # Errors
///
/// Returns [`MergeError::Parse`] for malformed JSON and
/// [`MergeError::NotAnObject`] when the top level is not an object.
pub fn parse_document(text: &str) -> Result<AppConfig, MergeError> {
    let raw: Value = serde_json::from_str(text)?;
    merge_with_defaults(&raw)
}

/// Merges a raw JSON document over [`AppConfig::default()`].
///
/// # Errors
///
/// Returns [`MergeError::NotAnObject`] when `raw` is not a JSON object.
pub fn merge_with_defaults(raw: &Value) -> Result<AppConfig, MergeError> {
    let Value::Object(raw) = raw else {
        return Err(MergeError::NotAnObject);
    };

    let defaults = AppConfig::default();
    let mut merged: AppConfig = overlay_record(&defaults, raw, &[PROXY_KEY])?;

    merged.proxy = match raw.get(PROXY_KEY) {
        Some(Value::Object(raw_proxy)) => merge_proxy(&defaults.proxy, raw_proxy)?,
        Some(Value::Null) | None => defaults.proxy,
        Some(_) => {
            warn!(field = PROXY_KEY, "ignoring non-object proxy block");
            defaults.proxy
        }
    };

    Ok(merged)
}

fn merge_proxy(defaults: &ProxyConfig, raw: &Map<String, Value>) -> Result<ProxyConfig, MergeError> {
    let mut proxy: ProxyConfig = overlay_record(defaults, raw, &[UPSTREAM_PROXY_KEY])?;

    proxy.upstream_proxy = match raw.get(UPSTREAM_PROXY_KEY) {
        Some(Value::Object(raw_upstream)) => {
            let base: UpstreamProxyConfig = defaults.upstream_proxy.clone().unwrap_or_default();
            Some(overlay_record(&base, raw_upstream, &[])?)
        }
        Some(Value::Null) => None,
        Some(_) => {
            warn!(field = UPSTREAM_PROXY_KEY, "ignoring non-object upstream proxy block");
            defaults.upstream_proxy.clone()
        }
        None => defaults.upstream_proxy.clone(),
    };

    Ok(proxy)
}

/// Overlays the keys of `raw` onto the serialized form of `base`, one field at
/// a time, keeping the default for any field the schema rejects.
fn overlay_record<T>(base: &T, raw: &Map<String, Value>, skip: &[&str]) -> Result<T, MergeError>
where
    T: Serialize + DeserializeOwned,
{
    let Value::Object(mut merged) = serde_json::to_value(base)? else {
        return Err(MergeError::NotAnObject);
    };

    for (key, value) in raw {
        if skip.contains(&key.as_str()) {
            continue;
        }
        if !merged.contains_key(key) {
            debug!(field = %key, "dropping unknown config field");
            continue;
        }

        let previous = merged.insert(key.clone(), value.clone());
        if serde_json::from_value::<T>(Value::Object(merged.clone())).is_err() {
            warn!(field = %key, "ignoring config field with unexpected type");
            if let Some(previous) = previous {
                merged.insert(key.clone(), previous);
            }
        }
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
