//! Configuration document schema.
//!
//! The document is persisted as pretty-printed JSON.  Example:
//!
//! ```json
//! {
//!   "language": "en",
//!   "theme": "light",
//!   "error_reporting_enabled": false,
//!   "proxy": {
//!     "enabled": true,
//!     "port": 8080,
//!     "upstream_proxy": {
//!       "enabled": true,
//!       "host": "127.0.0.1",
//!       "port": 7890
//!     }
//!   }
//! }
//! ```
//!
//! # Optional fields are serialized as `null`
//!
//! None of the `Option` fields use `skip_serializing_if`.  The merge step in
//! [`super::merge`] treats the serialized default document as the schema: a
//! key that is missing from it is considered unknown and dropped.  Skipping
//! `None` would make every optional field look unknown.

use serde::{Deserialize, Serialize};

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// There is exactly one of these per running instance.  It is replaced
/// wholesale on every successful save and never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// UI language tag (e.g. `"en"`, `"zh-CN"`).
    pub language: String,
    /// UI theme: `"light"`, `"dark"` or `"system"`.
    pub theme: String,
    /// Periodically refresh account quotas in the background.
    pub auto_refresh: bool,
    /// Refresh period in minutes.
    pub refresh_interval: i32,
    /// Periodically sync the current account.
    pub auto_sync: bool,
    /// Sync period in minutes.
    pub sync_interval: i32,
    /// Directory pre-selected in export dialogs.
    pub default_export_path: Option<String>,
    /// Launch the application when the user logs in.
    pub auto_startup: bool,
    /// Forward error-level log entries to the error reporter.
    pub error_reporting_enabled: bool,
    /// Local API proxy settings.
    pub proxy: ProxyConfig,
}

/// Local API proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    /// TCP port the proxy listens on.
    pub port: u16,
    /// Bind on all interfaces instead of loopback only.
    pub allow_lan_access: bool,
    /// Start the proxy together with the application.
    pub auto_start: bool,
    pub api_key: String,
    /// Upstream request timeout in seconds.
    pub request_timeout: u64,
    /// Optional proxy the local proxy itself connects through.
    pub upstream_proxy: Option<UpstreamProxyConfig>,
}

/// Upstream (outbound) proxy used by the local proxy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamProxyConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            theme: "light".to_string(),
            auto_refresh: false,
            refresh_interval: 15,
            auto_sync: false,
            sync_interval: 5,
            default_export_path: None,
            auto_startup: false,
            // Privacy by default: nothing leaves the machine until opted in.
            error_reporting_enabled: false,
            proxy: ProxyConfig::default(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
            allow_lan_access: false,
            auto_start: false,
            api_key: String::new(),
            request_timeout: 120,
            upstream_proxy: None,
        }
    }
}

impl Default for UpstreamProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: String::new(),
            port: 7890,
            username: None,
            password: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
