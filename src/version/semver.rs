//! Go module version semantics
//!
//! Go versions are semantic versions with a mandatory `v` prefix. The
//! shorthands `vMAJOR` and `vMAJOR.MINOR` are valid but may not carry a
//! prerelease or build suffix. Build metadata `+incompatible` marks a
//! release of a v2+ major that predates semantic import versioning.

use std::cmp::Ordering;

use semver::Version;

use crate::version::error::VersionError;

/// Build metadata attached to legacy v2+ releases without a major path suffix
pub const INCOMPATIBLE: &str = "incompatible";

/// Parse a Go version string into a `semver::Version`.
///
/// Returns `None` for anything Go would reject:
/// - missing `v` prefix
/// - leading zeros in numeric components
/// - shorthand forms with a prerelease or build suffix
///
/// Examples:
/// - "v1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "v2.0.0+incompatible" -> Version(2, 0, 0) with build "incompatible"
pub fn parse_version(version: &str) -> Option<Version> {
    let rest = version.strip_prefix('v')?;
    let (rest, build) = match rest.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (rest, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 || !parts.iter().all(|p| is_numeric(p)) {
        return None;
    }
    if parts.len() < 3 && (pre.is_some() || build.is_some()) {
        return None;
    }

    let mut normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => core.to_string(),
    };
    if let Some(pre) = pre {
        normalized.push('-');
        normalized.push_str(pre);
    }
    if let Some(build) = build {
        normalized.push('+');
        normalized.push_str(build);
    }
    Version::parse(&normalized).ok()
}

fn is_numeric(part: &str) -> bool {
    !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'))
}

/// Reports whether `version` is a valid Go version string
pub fn is_valid(version: &str) -> bool {
    parse_version(version).is_some()
}

/// Returns the major version prefix (`v2` for `v2.1.0`), or `None` if invalid
pub fn major(version: &str) -> Option<String> {
    parse_version(version).map(|v| format!("v{}", v.major))
}

/// Reports whether a valid version carries a prerelease component
pub fn is_prerelease(version: &str) -> bool {
    parse_version(version).is_some_and(|v| !v.pre.is_empty())
}

/// Reports whether a valid version carries the `+incompatible` build marker
pub fn is_incompatible(version: &str) -> bool {
    parse_version(version).is_some_and(|v| v.build.as_str() == INCOMPATIBLE)
}

fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// Compare two versions by semantic version precedence.
///
/// Build metadata is ignored. Invalid versions are equal to each other
/// and lower than every valid version.
pub fn compare_semver(v: &str, w: &str) -> Ordering {
    match (parse_version(v), parse_version(w)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => precedence(&a, &b),
    }
}

/// Total order used to pick the "latest" version.
///
/// 1. invalid < valid
/// 2. `+incompatible` < everything without the marker
/// 3. semantic version precedence
pub fn compare(v: &str, w: &str) -> Ordering {
    match (parse_version(v), parse_version(w)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let a_compatible = a.build.as_str() != INCOMPATIBLE;
            let b_compatible = b.build.as_str() != INCOMPATIBLE;
            a_compatible
                .cmp(&b_compatible)
                .then_with(|| precedence(&a, &b))
        }
    }
}

/// Returns the larger of two versions under [`compare`].
///
/// Returns `None` when both are invalid. Ties resolve to `w`.
pub fn max_version<'a>(v: &'a str, w: &'a str) -> Option<&'a str> {
    if !is_valid(v) && !is_valid(w) {
        return None;
    }
    if compare(v, w) == Ordering::Greater {
        Some(v)
    } else {
        Some(w)
    }
}

/// Reports whether `new_version` is newer than `old_version`.
///
/// With `major_only`, the major version itself must be strictly greater.
pub fn is_newer_version(old_version: &str, new_version: &str, major_only: bool) -> bool {
    if major_only {
        return match (parse_version(old_version), parse_version(new_version)) {
            (Some(old), Some(new)) => old.major < new.major,
            (None, Some(_)) => true,
            _ => false,
        };
    }
    compare(old_version, new_version) == Ordering::Less
}

/// Returns the major version after the provided version.
///
/// `v6.14.1+incompatible` -> `v7`
pub fn next_major(version: &str) -> Result<String, VersionError> {
    let major = major(version)
        .and_then(|m| m.trim_start_matches('v').parse::<u64>().ok())
        .ok_or_else(|| VersionError::InvalidVersion(version.to_string()))?;
    Ok(format!("v{}", major + 1))
}
