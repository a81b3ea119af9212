//! Module version listings and retractions

use std::cmp::Ordering;

use crate::version::path::{join_path, mod_prefix};
use crate::version::semver::{
    compare, compare_semver, is_prerelease, is_valid, major, next_major,
};

/// A module path and every version the registry lists for it.
///
/// Versions are kept verbatim, invalid entries included; selection
/// functions skip what they cannot parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub path: String,
    pub versions: Vec<String>,
}

impl Module {
    pub fn new(path: impl Into<String>, versions: Vec<String>) -> Self {
        Self {
            path: path.into(),
            versions,
        }
    }

    /// Returns the latest version whose string starts with `prefix`.
    ///
    /// Prereleases are excluded unless `allow_prerelease` is set or the
    /// version is on the inherently unstable `v0` line.
    pub fn max_version(&self, prefix: &str, allow_prerelease: bool) -> Option<&str> {
        self.versions
            .iter()
            .map(String::as_str)
            .filter(|v| is_valid(v) && v.starts_with(prefix))
            .filter(|v| allow_prerelease || !is_prerelease_outside_v0(v))
            .fold(None, |max, v| match max {
                Some(m) if compare(v, m) != Ordering::Greater => Some(m),
                _ => Some(v),
            })
    }

    /// Reports whether the registry lists exactly this version string
    pub fn has_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    /// Returns a copy without the versions covered by `retractions`
    pub fn retract(&self, retractions: &Retractions) -> Module {
        Module {
            path: self.path.clone(),
            versions: self
                .versions
                .iter()
                .filter(|v| !retractions.includes(v))
                .cloned()
                .collect(),
        }
    }

    /// Returns the module path for the provided version
    pub fn with_major_path(&self, version: &str) -> String {
        join_path(mod_prefix(&self.path), version, "")
    }

    /// Returns the module path of the next major version.
    ///
    /// A module whose newest version is on the v0 line has no next major.
    pub fn next_major_path(&self) -> Option<String> {
        let latest = self.max_version("", true)?;
        if major(latest).as_deref() == Some("v0") {
            return None;
        }
        let next = next_major(latest).ok()?;
        Some(self.with_major_path(&next))
    }
}

fn is_prerelease_outside_v0(version: &str) -> bool {
    is_prerelease(version) && major(version).as_deref() != Some("v0")
}

/// Inclusive range of retracted versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub low: String,
    pub high: String,
}

impl VersionRange {
    pub fn new(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }

    /// A range covering exactly one version
    pub fn single(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            low: version.clone(),
            high: version,
        }
    }

    pub fn includes(&self, version: &str) -> bool {
        is_valid(version)
            && compare_semver(&self.low, version) != Ordering::Greater
            && compare_semver(version, &self.high) != Ordering::Greater
    }
}

/// Set of retracted version ranges declared by a module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retractions(Vec<VersionRange>);

impl Retractions {
    pub fn new(ranges: Vec<VersionRange>) -> Self {
        Self(ranges)
    }

    pub fn includes(&self, version: &str) -> bool {
        self.0.iter().any(|range| range.includes(version))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ranges(&self) -> &[VersionRange] {
        &self.0
    }
}
