use serde::Deserialize;
use url::Url;

use crate::env::EnvCache;

// =============================================================================
// Registry constants
// =============================================================================

/// Proxy used when GOPROXY names no usable URL
pub const DEFAULT_PROXY_URL: &str = "https://proxy.golang.org";

/// User-Agent sent with every proxy request
pub const USER_AGENT: &str = concat!("gomajor/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Logging constants
// =============================================================================

/// Environment variable holding the log filter directives
pub const LOG_ENV: &str = "GOMAJOR_LOG";

/// Log filter used when the environment variable is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

// =============================================================================
// Resolution constants
// =============================================================================

/// Maximum number of list requests while walking a major version chain
pub const MAX_MAJOR_CHAIN: usize = 100;

/// Concurrent update lookups when the proxy may answer from cache
pub const CACHED_CONCURRENCY: usize = 3;

/// Concurrent update lookups when forcing live fetches
pub const LIVE_CONCURRENCY: usize = 1;

/// Runtime configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Proxy base URLs, tried in order
    pub proxies: Vec<String>,
    /// Module path glob patterns that are never queried
    pub private: Vec<String>,
    /// Ask proxies to answer from their cache only
    pub cached: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxies: vec![DEFAULT_PROXY_URL.to_string()],
            private: Vec::new(),
            cached: true,
        }
    }
}

impl Config {
    /// Builds the configuration from `GOPROXY` and `GOPRIVATE`.
    ///
    /// `GOPROXY=off` leaves no proxies, so every lookup fails.
    pub async fn from_env(env: &EnvCache) -> Self {
        let goproxy = env.get("GOPROXY").await;
        let mut proxies = parse_proxy_list(&goproxy);
        if proxies.is_empty() && !is_proxy_off(&goproxy) {
            proxies.push(DEFAULT_PROXY_URL.to_string());
        }
        Self {
            proxies,
            private: parse_pattern_list(&env.get("GOPRIVATE").await),
            ..Self::default()
        }
    }

    /// Proxy entries that parse as URLs
    pub fn proxy_urls(&self) -> Vec<Url> {
        self.proxies
            .iter()
            .filter_map(|p| Url::parse(p).ok())
            .collect()
    }
}

/// Splits a GOPROXY value on `,` and `|`. Entries after `off` are ignored
/// and entries without a scheme such as `direct` are dropped.
pub fn parse_proxy_list(value: &str) -> Vec<String> {
    value
        .split([',', '|'])
        .map(str::trim)
        .take_while(|p| *p != "off")
        .filter(|p| Url::parse(p).is_ok_and(|u| !u.scheme().is_empty()))
        .map(str::to_string)
        .collect()
}

fn is_proxy_off(value: &str) -> bool {
    value.split([',', '|']).any(|p| p.trim() == "off")
}

/// Splits a comma separated pattern list such as GOPRIVATE
pub fn parse_pattern_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
