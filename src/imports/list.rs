use std::collections::BTreeSet;
use std::path::Path;

use crate::imports::rewrite::{ImportError, Rewrite, rewrite};

/// Returns the sorted, distinct import paths used under `dir`
pub fn list_imports(dir: &Path) -> Result<Vec<String>, ImportError> {
    let mut paths = BTreeSet::new();
    rewrite(dir, |_, path| {
        paths.insert(path.to_string());
        Ok(Rewrite::Skip)
    })?;
    Ok(paths.into_iter().collect())
}
