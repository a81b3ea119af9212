//! Registry trait for fetching module versions from a module proxy

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::module::Module;

/// Trait for reading the module proxy protocol
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches the version list of a module (`{module}/@v/list`)
    ///
    /// # Returns
    /// * `Ok(Module)` - Versions in registry order, unvalidated
    /// * `Err(RegistryError::NotFound)` - No configured proxy knows the module
    /// * `Err(RegistryError)` - Any other failure
    async fn fetch_all_versions(&self, module_path: &str) -> Result<Module, RegistryError>;

    /// Fetches the go.mod file of one module version (`{module}/@v/{version}.mod`)
    async fn fetch_mod_file(
        &self,
        module_path: &str,
        version: &str,
    ) -> Result<Vec<u8>, RegistryError>;
}
