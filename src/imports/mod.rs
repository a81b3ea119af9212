//! Import path layer
//! - rewrite.rs: tree walk, per-file rewriting, atomic write-back
//! - format.rs: import block canonicalization
//! - literal.rs: Go string literal quoting
//! - module.rs: module-scoped rewrites
//! - list.rs: import listing

pub mod format;
pub mod list;
pub mod literal;
pub mod module;
pub mod rewrite;

pub use list::list_imports;
pub use module::{RewriteModuleOptions, rewrite_module};
pub use rewrite::{ImportError, Position, Rewrite, rewrite, rewrite_file, rewrite_source};
