//! Major version resolution
//!
//! Walks the chain of major versions a module publishes, finds the module
//! that owns a package path, and resolves `package[@query]` specs.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::MAX_MAJOR_CHAIN;
use crate::parser::GoModParser;
use crate::version::error::{RegistryError, ResolveError, VersionError};
use crate::version::module::{Module, Retractions};
use crate::version::path::{check_path, join_path, mod_major, mod_prefix, split_path, split_spec};
use crate::version::registry::Registry;
use crate::version::semver::{INCOMPATIBLE, compare, is_incompatible, is_valid, major};

/// A resolved `package@query` target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spec {
    /// Module path without its major version suffix
    pub mod_prefix: String,
    /// Concrete version the query resolved to
    pub version: String,
    /// Package directory inside the module
    pub package_dir: String,
    /// Query to hand to the fetch step; empty means `version`
    pub query: String,
}

impl Spec {
    /// The module path for the resolved version
    pub fn module_path(&self) -> String {
        join_path(&self.mod_prefix, &self.version, "")
    }

    /// The package import path for the resolved version
    pub fn package_path(&self) -> String {
        join_path(&self.mod_prefix, &self.version, &self.package_dir)
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let query = if self.query.is_empty() {
            &self.version
        } else {
            &self.query
        };
        write!(f, "{}@{}", self.package_path(), query)
    }
}

/// Resolves module versions through a [`Registry`]
pub struct Resolver {
    registry: Arc<dyn Registry>,
    parser: GoModParser,
}

impl Resolver {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            parser: GoModParser::new(),
        }
    }

    /// Lists the versions of a module, or `None` if no proxy knows it
    pub async fn query(&self, module_path: &str) -> Result<Option<Module>, ResolveError> {
        match self.registry.fetch_all_versions(module_path).await {
            Ok(module) => Ok(Some(module)),
            Err(RegistryError::NotFound(_)) => {
                debug!("Module not found: {}", module_path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Finds the module that provides `package_path` by trimming path
    /// elements until a module is found
    pub async fn query_package(&self, package_path: &str) -> Result<Module, ResolveError> {
        let mut prefix = package_path;
        loop {
            if check_path(prefix).is_ok()
                && let Some(module) = self.query(prefix).await?
            {
                check_import_versioning(&module, package_path)?;
                return Ok(module);
            }
            match prefix.rsplit_once('/') {
                Some((remaining, _)) => prefix = remaining,
                None => break,
            }
        }
        Err(ResolveError::PackageNotFound(package_path.to_string()))
    }

    /// Finds every major version of a module, starting at `module_path`
    pub async fn list(&self, module_path: &str) -> Result<Vec<Module>, ResolveError> {
        let mut latest = self
            .query(module_path)
            .await?
            .ok_or_else(|| ResolveError::ModuleNotFound(module_path.to_string()))?;
        let mut history = Vec::new();

        for _ in 0..MAX_MAJOR_CHAIN {
            let Some(next_path) = latest.next_major_path() else {
                history.push(latest);
                return Ok(history);
            };
            debug!("Checking next major version {}", next_path);

            let mut next = self.query(&next_path).await?;
            if next.is_none() {
                // The project may have adopted modules without bumping the
                // major version it had published as +incompatible
                let fallback = latest
                    .max_version("", true)
                    .filter(|v| is_incompatible(v))
                    .and_then(major)
                    .map(|m| latest.with_major_path(&m))
                    .filter(|path| *path != latest.path);
                if let Some(path) = fallback {
                    debug!("Checking unbumped major version {}", path);
                    next = self.query(&path).await?;
                }
            }

            match next {
                Some(next) => history.push(std::mem::replace(&mut latest, next)),
                None => {
                    history.push(latest);
                    return Ok(history);
                }
            }
        }

        Err(ResolveError::LimitExceeded(module_path.to_string()))
    }

    /// Finds the newest major version of a module that still has a
    /// selectable version once retractions are applied.
    ///
    /// The returned module has its retracted versions removed.
    pub async fn latest(
        &self,
        module_path: &str,
        allow_prerelease: bool,
    ) -> Result<Module, ResolveError> {
        let modules = self.list(module_path).await?;

        let newest = modules
            .iter()
            .filter_map(|m| m.max_version("", true).map(|v| (m, v)))
            .fold(None, |max: Option<(&Module, &str)>, (m, v)| match max {
                Some((_, w)) if compare(v, w).is_le() => max,
                _ => Some((m, v)),
            });
        let Some((owner, version)) = newest else {
            return Err(ResolveError::NoVersions(module_path.to_string()));
        };

        let retractions = self.retractions(&owner.path, version).await?;

        modules
            .iter()
            .rev()
            .map(|m| m.retract(&retractions))
            .find(|m| m.max_version("", allow_prerelease).is_some())
            .ok_or_else(|| ResolveError::NoVersions(module_path.to_string()))
    }

    async fn retractions(
        &self,
        module_path: &str,
        version: &str,
    ) -> Result<Retractions, ResolveError> {
        let data = match self.registry.fetch_mod_file(module_path, version).await {
            Ok(data) => data,
            Err(RegistryError::NotFound(_)) => {
                debug!("No go.mod for {}@{}", module_path, version);
                return Ok(Retractions::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mod_file = self
            .parser
            .parse_bytes(&data)
            .map_err(|source| ResolveError::Parse {
                module: module_path.to_string(),
                version: version.to_string(),
                source,
            })?;
        if !mod_file.retracts.is_empty() {
            debug!(
                "{}@{} retracts {} range(s)",
                module_path,
                version,
                mod_file.retracts.ranges().len()
            );
        }
        Ok(mod_file.retracts)
    }

    /// Resolves a `path[@query]` spec to a concrete version.
    ///
    /// * no query: the owning module's newest version
    /// * `latest`: the newest version of the newest major
    /// * `master`, `default`: like `latest`, but the query is kept as is
    /// * anything else must be a valid version
    pub async fn resolve(&self, spec: &str, allow_prerelease: bool) -> Result<Spec, ResolveError> {
        let (package_path, query) = split_spec(spec);
        let module = self.query_package(package_path).await?;
        let prefix = mod_prefix(&module.path).to_string();
        let package_dir = split_path(&prefix, package_path)
            .map(|(_, dir)| dir)
            .unwrap_or_default();

        let (version, query) = match query {
            "" => {
                let version = module
                    .max_version("", allow_prerelease)
                    .ok_or_else(|| ResolveError::NoVersions(module.path.clone()))?;
                (version.to_string(), String::new())
            }
            "latest" | "master" | "default" => {
                let latest = self.latest(&module.path, allow_prerelease).await?;
                let version = latest
                    .max_version("", allow_prerelease)
                    .ok_or_else(|| ResolveError::NoVersions(latest.path.clone()))?
                    .to_string();
                let query = if query == "latest" {
                    version.clone()
                } else {
                    query.to_string()
                };
                (version, query)
            }
            query => {
                if !is_valid(query) {
                    return Err(VersionError::InvalidVersion(query.to_string()).into());
                }
                let incompatible = format!("{query}+{INCOMPATIBLE}");
                let version = if !module.has_version(query) && module.has_version(&incompatible) {
                    incompatible
                } else {
                    query.to_string()
                };
                (version.clone(), version)
            }
        };

        let spec = Spec {
            mod_prefix: prefix,
            version,
            package_dir,
            query,
        };
        info!("Resolved {} to {}", package_path, spec);
        Ok(spec)
    }
}

/// Rejects package paths that name a major version the module only
/// publishes as `+incompatible`
fn check_import_versioning(module: &Module, package_path: &str) -> Result<(), ResolveError> {
    let prefix = mod_prefix(&module.path);
    let Some((module_path, package_dir)) = split_path(prefix, package_path) else {
        return Ok(());
    };
    if module_path == module.path {
        return Ok(());
    }
    let Some(major) = mod_major(&module_path) else {
        return Ok(());
    };
    match module.max_version(major, false) {
        Some(version) => Err(ResolveError::UnsupportedImportVersioning {
            major: major.to_string(),
            suggestion: format!("{}@{}", join_path(prefix, "", &package_dir), version),
        }),
        None => Err(ResolveError::PackageNotFound(package_path.to_string())),
    }
}
