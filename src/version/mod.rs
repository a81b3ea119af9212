//! Version resolution layer for Go modules
//!
//! This module provides the core functionality for fetching module versions
//! from module proxies, ordering them, and walking major version chains.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Registry  │────▶│   Resolver  │◀────│   Updates   │
//! │   (fetch)   │     │   (chain)   │     │   (scan)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │
//!        ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  Registries │     │ Module/Path │
//! │  (go proxy) │     │  (semver)   │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for the module proxy protocol
//! - [`registries`]: Go proxy implementation over HTTP and `file://`
//! - [`resolver`]: Major version chains, package ownership, spec resolution
//! - [`updates`]: Concurrent latest-version scanning
//! - [`module`]: Version listings and retractions
//! - [`path`]: Major version encoding in import paths
//! - [`semver`]: Go version validity and ordering
//! - [`error`]: Error types for registry and resolution operations

pub mod error;
pub mod module;
pub mod path;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod semver;
pub mod updates;
