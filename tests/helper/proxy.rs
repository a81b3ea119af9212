//! On-disk module proxy for tests

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use url::Url;

use gomajor::version::registries::GoProxyRegistry;
use gomajor::version::registries::go_proxy::encode_module_path;
use gomajor::version::resolver::Resolver;

/// A `file://` proxy laid out like the HTTP proxy protocol
pub struct FileProxy {
    root: TempDir,
}

impl FileProxy {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    /// Writes `<module>/@v/list`
    pub fn with_module(self, path: &str, versions: &[&str]) -> Self {
        let dir = self.root.path().join(encode_module_path(path)).join("@v");
        fs::create_dir_all(&dir).unwrap();
        let mut list = versions.join("\n");
        list.push('\n');
        fs::write(dir.join("list"), list).unwrap();
        self
    }

    /// Writes `<module>/@v/<version>.mod`
    pub fn with_mod_file(self, path: &str, version: &str, content: &str) -> Self {
        let dir = self.root.path().join(encode_module_path(path)).join("@v");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.mod", encode_module_path(version))), content).unwrap();
        self
    }

    pub fn url(&self) -> Url {
        Url::from_directory_path(self.root.path()).unwrap()
    }

    pub fn registry(&self) -> GoProxyRegistry {
        GoProxyRegistry::new(&[self.url()], false).unwrap()
    }

    pub fn resolver(&self) -> Arc<Resolver> {
        Arc::new(Resolver::new(Arc::new(self.registry())))
    }
}
