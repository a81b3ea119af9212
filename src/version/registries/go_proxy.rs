//! Go module proxy implementation
//!
//! Proxies are tried in order. A 404/410 from one proxy falls through to
//! the next; any other failure is returned immediately.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use url::Url;

use crate::config::{Config, USER_AGENT};
use crate::version::error::RegistryError;
use crate::version::module::Module;
use crate::version::registry::Registry;

/// Header asking the proxy to answer from its cache only
const DISABLE_MODULE_FETCH: &str = "Disable-Module-Fetch";

/// One configured proxy base
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyBackend {
    /// `http://` or `https://` proxy
    Http { base: Url },
    /// `file://` proxy, laid out like the HTTP protocol on disk
    File { root: PathBuf },
}

impl ProxyBackend {
    pub fn from_url(url: &Url) -> Result<Self, RegistryError> {
        match url.scheme() {
            "http" | "https" => Ok(Self::Http { base: url.clone() }),
            "file" => url
                .to_file_path()
                .map(|root| Self::File { root })
                .map_err(|()| RegistryError::UnsupportedProxy(url.to_string())),
            _ => Err(RegistryError::UnsupportedProxy(url.to_string())),
        }
    }
}

/// Registry implementation for the Go module proxy protocol
pub struct GoProxyRegistry {
    client: reqwest::Client,
    backends: Vec<ProxyBackend>,
    cached: bool,
}

impl GoProxyRegistry {
    /// Creates a registry over the given proxy URLs, tried in order.
    ///
    /// `cached` asks HTTP proxies not to fetch modules they have not seen.
    pub fn new(proxies: &[Url], cached: bool) -> Result<Self, RegistryError> {
        let backends = proxies
            .iter()
            .map(ProxyBackend::from_url)
            .collect::<Result<Vec<_>, _>>()?;
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            backends,
            cached,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        Self::new(&config.proxy_urls(), config.cached)
    }

    /// Fetch `relative` from each backend in order
    async fn fetch(&self, module_path: &str, relative: &str) -> Result<Vec<u8>, RegistryError> {
        if self.backends.is_empty() {
            return Err(RegistryError::Disabled);
        }
        for backend in &self.backends {
            let result = match backend {
                ProxyBackend::Http { base } => self.fetch_http(base, relative).await,
                ProxyBackend::File { root } => fetch_file(root, relative).await,
            };
            match result {
                Err(RegistryError::NotFound(location)) => {
                    debug!("Not found at {}, trying next proxy", location);
                }
                other => return other,
            }
        }
        Err(RegistryError::NotFound(module_path.to_string()))
    }

    async fn fetch_http(&self, base: &Url, relative: &str) -> Result<Vec<u8>, RegistryError> {
        let url = format!("{}/{}", base.as_str().trim_end_matches('/'), relative);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if self.cached {
            request = request.header(DISABLE_MODULE_FETCH, "true");
        }
        let response = request.send().await?;
        let status = response.status();

        // Go proxy returns 404 or 410 for modules that don't exist
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(RegistryError::NotFound(url));
        }

        if !status.is_success() {
            warn!("Go proxy returned status {}: {}", status, url);
            let body = response.text().await.unwrap_or_default();
            let message = body.trim();
            return Err(RegistryError::Protocol(if message.is_empty() {
                status.to_string()
            } else {
                message.to_string()
            }));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

async fn fetch_file(root: &Path, relative: &str) -> Result<Vec<u8>, RegistryError> {
    let path = relative
        .split('/')
        .fold(root.to_path_buf(), |path, part| path.join(part));
    debug!("Reading {}", path.display());

    match tokio::fs::read(&path).await {
        Ok(data) => Ok(data),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(RegistryError::NotFound(
            path.display().to_string(),
        )),
        Err(e) => Err(RegistryError::Io(e)),
    }
}

#[async_trait::async_trait]
impl Registry for GoProxyRegistry {
    async fn fetch_all_versions(&self, module_path: &str) -> Result<Module, RegistryError> {
        let relative = format!("{}/@v/list", encode_module_path(module_path));
        let body = self.fetch(module_path, &relative).await?;

        let body = String::from_utf8(body).map_err(|e| {
            warn!("Go proxy returned a non UTF-8 version list for {}", module_path);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        // Go proxy returns versions one per line
        let versions: Vec<String> = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect();

        Ok(Module::new(module_path, versions))
    }

    async fn fetch_mod_file(
        &self,
        module_path: &str,
        version: &str,
    ) -> Result<Vec<u8>, RegistryError> {
        let relative = format!(
            "{}/@v/{}.mod",
            encode_module_path(module_path),
            encode_module_path(version)
        );
        self.fetch(module_path, &relative).await
    }
}

/// Encodes a Go module path for use in proxy URLs.
/// Uppercase letters are escaped as !{lowercase}.
pub fn encode_module_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_ascii_uppercase() {
            result.push('!');
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
