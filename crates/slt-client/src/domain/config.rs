//! Client configuration with validation.
//!
//! Defaults match the stock obs-websocket setup on the local machine.
//! Environment overrides:
//!
//! | Variable                 | Field             |
//! |--------------------------|-------------------|
//! | `SLT_OBS_WS_URL`         | `address`         |
//! | `SLT_OBS_WS_PASSWORD`    | `password`        |
//! | `SLT_REQUEST_TIMEOUT_MS` | `request_timeout` |

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::errors::ClientError;
use super::vendor::DEFAULT_VENDOR_NAME;

/// Default obs-websocket address.
pub const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:4455";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// RPC version sent when the Hello does not announce one.
pub const DEFAULT_RPC_VERSION: u32 = 1;

/// Environment variable overriding the address.
pub const ENV_URL: &str = "SLT_OBS_WS_URL";
/// Environment variable overriding the password.
pub const ENV_PASSWORD: &str = "SLT_OBS_WS_PASSWORD";
/// Environment variable overriding the request timeout (milliseconds).
pub const ENV_REQUEST_TIMEOUT_MS: &str = "SLT_REQUEST_TIMEOUT_MS";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// obs-websocket URL
    pub address: String,
    /// Server password; `None` or empty means no authentication
    pub password: Option<String>,
    /// Bound on each request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Vendor name used for vendor calls
    pub vendor_name: String,
    /// Issue a listing as soon as the session is identified
    pub list_on_identify: bool,
    /// RPC version fallback
    pub rpc_version: u32,
    /// Capacity of the collaborator event channel
    pub event_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            password: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            vendor_name: DEFAULT_VENDOR_NAME.to_string(),
            list_on_identify: true,
            rpc_version: DEFAULT_RPC_VERSION,
            event_channel_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with process environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Overlay overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_URL) {
            let url = url.trim();
            if !url.is_empty() {
                self.address = url.to_string();
            }
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if let Some(ms) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            match ms.trim().parse::<u64>() {
                Ok(ms) => self.request_timeout = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %ms, "{} is not a number", ENV_REQUEST_TIMEOUT_MS),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_address(&self.address)?;

        if self.request_timeout.is_zero() {
            return Err(ClientError::Config("request_timeout cannot be 0".into()));
        }

        if self.vendor_name.trim().is_empty() {
            return Err(ClientError::Config("vendor_name cannot be empty".into()));
        }

        if self.event_channel_capacity == 0 {
            return Err(ClientError::Config(
                "event_channel_capacity cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Password to authenticate with, if one is set and non-empty.
    pub fn effective_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Check that `address` is a `ws://` or `wss://` URL with a host.
pub fn validate_address(address: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(address.trim()).map_err(|e| invalid(e.to_string()))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(invalid(format!(
            "scheme must be ws or wss, got {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".into()));
    }

    Ok(url)
}
