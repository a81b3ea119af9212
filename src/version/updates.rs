//! Concurrent update scanning for a set of module requirements

use std::sync::Arc;

use futures::StreamExt;
use serde::{Serialize, Serializer};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::{CACHED_CONCURRENCY, LIVE_CONCURRENCY};
use crate::version::error::ResolveError;
use crate::version::path::matches_prefix_patterns;
use crate::version::resolver::Resolver;
use crate::version::semver::is_newer_version;

/// A module path at a specific version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleVersion {
    pub path: String,
    pub version: String,
}

impl ModuleVersion {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }
}

/// A newer version of a module, or the error hit while looking for one
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Update {
    pub module: ModuleVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<ModuleVersion>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub err: Option<ResolveError>,
}

fn serialize_error<S: Serializer>(
    err: &Option<ResolveError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match err {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Modules to check and the policy for what counts as an update
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Consider non-v0 prereleases
    pub allow_prerelease: bool,
    /// The proxy may answer from cache; allows more parallel lookups
    pub cached: bool,
    /// Only report updates to a newer major version
    pub major_only: bool,
    /// Comma separated glob patterns of module paths to skip (GOPRIVATE)
    pub private: String,
    pub modules: Vec<ModuleVersion>,
}

/// Looks up the latest version of every module concurrently.
///
/// Events arrive in completion order. The channel closes once every
/// lookup has finished.
pub fn updates(resolver: Arc<Resolver>, options: UpdateOptions) -> mpsc::Receiver<Update> {
    let limit = if options.cached {
        CACHED_CONCURRENCY
    } else {
        LIVE_CONCURRENCY
    };
    let (tx, rx) = mpsc::channel(limit);

    tokio::spawn(async move {
        let UpdateOptions {
            allow_prerelease,
            major_only,
            private,
            modules,
            ..
        } = options;

        let modules = modules.into_iter().filter(|m| {
            let skip = matches_prefix_patterns(&private, &m.path);
            if skip {
                debug!("Skipping private module {}", m.path);
            }
            !skip
        });

        futures::stream::iter(modules)
            .for_each_concurrent(limit, |module| {
                let resolver = Arc::clone(&resolver);
                let tx = tx.clone();
                async move {
                    let update =
                        check_module(&resolver, module, allow_prerelease, major_only).await;
                    if let Some(update) = update
                        && tx.send(update).await.is_err()
                    {
                        debug!("Update receiver dropped");
                    }
                }
            })
            .await;
    });

    rx
}

async fn check_module(
    resolver: &Resolver,
    module: ModuleVersion,
    allow_prerelease: bool,
    major_only: bool,
) -> Option<Update> {
    let latest = match resolver.latest(&module.path, allow_prerelease).await {
        Ok(latest) => latest,
        Err(ResolveError::NoVersions(_)) => {
            debug!("No selectable versions for {}", module.path);
            return None;
        }
        Err(e) => {
            warn!("Failed to check {}: {}", module.path, e);
            return Some(Update {
                module,
                latest: None,
                err: Some(e),
            });
        }
    };

    let version = latest.max_version("", allow_prerelease)?;
    if !is_newer_version(&module.version, version, major_only) {
        return None;
    }

    Some(Update {
        latest: Some(ModuleVersion::new(latest.with_major_path(version), version)),
        module,
        err: None,
    })
}
