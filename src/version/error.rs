use thiserror::Error;

use crate::parser::ParseError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("proxy: {0}")]
    Protocol(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported proxy URL: {0}")]
    UnsupportedProxy(String),

    #[error("module lookup disabled by GOPROXY=off")]
    Disabled,
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("malformed module path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("failed to parse go.mod for {module}@{version}: {source}")]
    Parse {
        module: String,
        version: String,
        #[source]
        source: ParseError,
    },

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("failed to find module for package: {0}")]
    PackageNotFound(String),

    #[error("{major} doesn't support import versioning; use {suggestion}")]
    UnsupportedImportVersioning { major: String, suggestion: String },

    #[error("no module versions found: {0}")]
    NoVersions(String),

    #[error("request limit exceeded while listing major versions of {0}")]
    LimitExceeded(String),
}
