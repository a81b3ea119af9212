//! Module-scoped import rewriting

use std::path::Path;

use crate::imports::rewrite::{ImportError, Position, Rewrite, rewrite};
use crate::version::path::{join_path, split_path};

/// Which imports to move and where to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteModuleOptions {
    /// Module path prefix (no major version suffix) of the imports to rewrite
    pub prefix: String,
    /// Version whose major is encoded into the new import paths
    pub new_version: String,
    /// Replacement prefix, when the module itself moves
    pub new_prefix: Option<String>,
    /// Only rewrite imports of this package directory
    pub package_dir: Option<String>,
}

/// Rewrites every import of a module under `dir` to a new major version.
///
/// `on_rewrite` is called with the position, old path and new path of every
/// replaced import.
pub fn rewrite_module<F>(
    dir: &Path,
    options: &RewriteModuleOptions,
    mut on_rewrite: F,
) -> Result<(), ImportError>
where
    F: FnMut(&Position, &str, &str),
{
    let new_prefix = options.new_prefix.as_deref().unwrap_or(&options.prefix);
    let package_dir = options.package_dir.as_deref().filter(|d| !d.is_empty());

    rewrite(dir, |position, path| {
        let Some((_, import_dir)) = split_path(&options.prefix, path) else {
            return Ok(Rewrite::Skip);
        };
        if package_dir.is_some_and(|wanted| wanted != import_dir) {
            return Ok(Rewrite::Skip);
        }
        let new_path = join_path(new_prefix, &options.new_version, &import_dir);
        if new_path == path {
            return Ok(Rewrite::Skip);
        }
        on_rewrite(position, path, &new_path);
        Ok(Rewrite::Replace(new_path))
    })
}
