//! Module path encoding
//!
//! A module's major version is encoded into its import path:
//! - gopkg.in paths use a dotted suffix for every major: `gopkg.in/yaml.v2`
//! - everything else uses a slash suffix from v2 on: `github.com/go-redis/redis/v8`
//!
//! `v0`, `v1` and `+incompatible` versions have no slash suffix.

use glob::{MatchOptions, Pattern};

use crate::version::error::VersionError;
use crate::version::semver;

const DOTTED_HOST: &str = "gopkg.in/";

fn is_dotted(path: &str) -> bool {
    path.starts_with(DOTTED_HOST)
}

/// Splits a module path into its prefix and major version suffix.
///
/// Returns `Some((path, ""))` when the path has no version suffix and
/// `None` when the suffix is malformed (`/v1`, `/v0`, `/v2.1`, `gopkg.in/yaml`).
pub fn split_path_version(path: &str) -> Option<(&str, &str)> {
    if is_dotted(path) {
        return split_dotted(path);
    }
    let bytes = path.as_bytes();
    let mut i = bytes.len();
    let mut dot = false;
    while i > 0 && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.') {
        if bytes[i - 1] == b'.' {
            dot = true;
        }
        i -= 1;
    }
    if i <= 1 || i == bytes.len() || bytes[i - 1] != b'v' || bytes[i - 2] != b'/' {
        return Some((path, ""));
    }
    let (prefix, path_major) = path.split_at(i - 2);
    if dot || path_major.len() <= 2 || path_major.as_bytes()[2] == b'0' || path_major == "/v1" {
        return None;
    }
    Some((prefix, path_major))
}

fn split_dotted(path: &str) -> Option<(&str, &str)> {
    let bytes = path.as_bytes();
    let mut i = path.strip_suffix("-unstable").unwrap_or(path).len();
    while i > 0 && bytes[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i <= 1 || bytes[i - 1] != b'v' || bytes[i - 2] != b'.' {
        return None;
    }
    let (prefix, path_major) = path.split_at(i - 2);
    if path_major.len() <= 2 || (path_major.as_bytes()[2] == b'0' && path_major != ".v0") {
        return None;
    }
    Some((prefix, path_major))
}

/// Returns the module path with any major version suffix removed
pub fn mod_prefix(module_path: &str) -> &str {
    split_path_version(module_path)
        .map(|(prefix, _)| prefix)
        .unwrap_or(module_path)
}

/// Returns the major version encoded in a module path (`v3`), or `""` if there is none.
///
/// Returns `None` for a malformed suffix.
pub fn mod_major(module_path: &str) -> Option<&str> {
    split_path_version(module_path)
        .map(|(_, major)| major.trim_start_matches(['/', '.']))
}

/// Creates a full package path from a module prefix, version, and package directory.
///
/// ```
/// use gomajor::version::path::join_path;
///
/// assert_eq!(join_path("gopkg.in/yaml", "v2.0.0", ""), "gopkg.in/yaml.v2");
/// assert_eq!(
///     join_path("github.com/go-redis/redis", "v8.0.1", "internal/proto"),
///     "github.com/go-redis/redis/v8/internal/proto"
/// );
/// ```
pub fn join_path(prefix: &str, version: &str, package_dir: &str) -> String {
    let version = version.trim_start_matches(['.', '/']);
    let major = semver::major(version).unwrap_or_default();
    let mut path = prefix.to_string();
    if is_dotted(prefix) {
        if !major.is_empty() {
            path.push('.');
            path.push_str(&major);
        }
    } else if !major.is_empty()
        && major != "v0"
        && major != "v1"
        && !version.contains("+incompatible")
    {
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(&major);
    }
    if !package_dir.is_empty() {
        path.push('/');
        path.push_str(package_dir);
    }
    path
}

/// Splits a package path into its module path and package directory.
///
/// The module prefix must be known up front. Returns `None` if the package
/// path does not belong to the prefix.
pub fn split_path(prefix: &str, package_path: &str) -> Option<(String, String)> {
    let rest = package_path.strip_prefix(prefix)?;
    match rest.as_bytes().first() {
        None | Some(b'/') => {}
        Some(b'.') if is_dotted(prefix) => {}
        Some(_) => return None,
    }

    let mut module_len = prefix.len();
    if rest.starts_with('/') {
        module_len += 1;
    }
    module_len = match package_path[module_len..].find('/') {
        Some(idx) => module_len + idx,
        None => package_path.len(),
    };

    let module_path = match split_path_version(&package_path[..module_len]) {
        Some((module_prefix, major)) if module_prefix == prefix && !major.is_empty() => {
            join_path(prefix, major, "")
        }
        // A dotted prefix must be followed by a well-formed `.vN`
        _ if rest.starts_with('.') => return None,
        _ => prefix.to_string(),
    };
    let package_dir = package_path
        .get(module_path.len()..)
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_string();
    Some((module_path, package_dir))
}

/// Splits a `path@query` spec such as `golang.org/x/tools@latest`
pub fn split_spec(spec: &str) -> (&str, &str) {
    spec.split_once('@').unwrap_or((spec, ""))
}

/// Checks that a module path is well formed enough to send to a registry.
pub fn check_path(path: &str) -> Result<(), VersionError> {
    let invalid = |reason: &str| VersionError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.is_empty() {
        return Err(invalid("empty path"));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(invalid("leading or trailing slash"));
    }
    for element in path.split('/') {
        if element.is_empty() {
            return Err(invalid("empty path element"));
        }
        if element.starts_with('.') || element.ends_with('.') {
            return Err(invalid("path element starts or ends with a dot"));
        }
        if let Some(c) = element
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')))
        {
            return Err(invalid(&format!("invalid char {c:?}")));
        }
    }

    let host = path.split('/').next().unwrap_or_default();
    if !host.contains('.') {
        return Err(invalid("missing dot in first path element"));
    }
    if host.starts_with('-') {
        return Err(invalid("leading dash in first path element"));
    }
    if host.chars().any(|c| c.is_ascii_uppercase() || c == '_' || c == '~') {
        return Err(invalid("invalid char in first path element"));
    }
    if split_path_version(path).is_none() {
        return Err(invalid("invalid version suffix"));
    }
    Ok(())
}

/// Reports whether any of the comma-separated glob patterns matches a
/// leading run of path elements of `target`.
///
/// `*.corp.example.com,rsc.io/private` matches `rsc.io/private/quote`
/// and `git.corp.example.com/x/y`.
pub fn matches_prefix_patterns(globs: &str, target: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    for glob in globs.split(',') {
        let glob = glob.strip_suffix('/').unwrap_or(glob);
        if glob.is_empty() {
            continue;
        }
        let elements = glob.matches('/').count() + 1;
        let target_elements: Vec<&str> = target.splitn(elements + 1, '/').collect();
        if target_elements.len() < elements {
            continue;
        }
        let prefix = target_elements[..elements].join("/");
        if Pattern::new(glob).is_ok_and(|p| p.matches_with(&prefix, options)) {
            return true;
        }
    }
    false
}
