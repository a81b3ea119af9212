//! Go environment lookup
//!
//! Values come from `go env KEY` and are memoized per key. Concurrent
//! lookups of the same key share a single `go env` invocation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

/// Source of raw environment values
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait EnvSource: Send + Sync {
    /// Returns the value of `key`, or `None` if it cannot be determined
    async fn lookup(&self, key: &str) -> Option<String>;
}

/// Reads values through the `go` tool, falling back to the process
/// environment when `go` is not installed
pub struct GoEnv;

#[async_trait::async_trait]
impl EnvSource for GoEnv {
    async fn lookup(&self, key: &str) -> Option<String> {
        match Command::new("go").args(["env", key]).output().await {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                debug!("go env {} exited with {}", key, output.status);
                std::env::var(key).ok()
            }
            Err(e) => {
                debug!("go env unavailable ({}), reading {} from environment", e, key);
                std::env::var(key).ok()
            }
        }
    }
}

/// Memoizing, single-flight cache over an [`EnvSource`]
pub struct EnvCache {
    source: Arc<dyn EnvSource>,
    values: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl EnvCache {
    pub fn new(source: Arc<dyn EnvSource>) -> Self {
        Self {
            source,
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value of `key`; missing values are the empty string.
    ///
    /// The first caller performs the lookup; later and concurrent callers
    /// receive the same value. Entries are never invalidated.
    pub async fn get(&self, key: &str) -> String {
        let cell = {
            let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
            values
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(|| async {
            let value = self.source.lookup(key).await.unwrap_or_default();
            debug!("{}={}", key, value);
            value
        })
        .await
        .clone()
    }
}

impl Default for EnvCache {
    fn default() -> Self {
        Self::new(Arc::new(GoEnv))
    }
}
