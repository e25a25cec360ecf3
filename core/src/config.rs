//! Repository configuration.
//!
//! Values are layered with figment: built-in defaults first, then any
//! `STOREFRONT_*` environment variables (`STOREFRONT_BASE_URL`,
//! `STOREFRONT_BEARER_TOKEN`, `STOREFRONT_STORE_CODE`,
//! `STOREFRONT_PAGE_SIZE`, `STOREFRONT_MAX_PAGES`,
//! `STOREFRONT_TIMEOUT_SECS`, `STOREFRONT_MAX_BODY_BYTES`).

use std::time::Duration;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::repository::{RepositoryOptions, RestRepository};
use crate::transport::UreqTransport;

pub const ENV_PREFIX: &str = "STOREFRONT_";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Scheme and host of the platform, e.g. `https://shop.example.com`.
    pub base_url: String,
    pub bearer_token: Option<String>,
    pub store_code: Option<String>,
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    pub timeout_secs: u64,
    /// Response body cap; `None` keeps the transport default.
    pub max_body_bytes: Option<u64>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            bearer_token: None,
            store_code: None,
            page_size: None,
            max_pages: None,
            timeout_secs: 30,
            max_body_bytes: None,
        }
    }
}

impl std::fmt::Debug for RepositoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("store_code", &self.store_code)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl RepositoryConfig {
    /// Defaults overlaid with the process environment.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    /// # Errors
    /// Fails when a variable cannot be parsed or a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: format!("`{}` is not an http(s) URL", self.base_url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_body_bytes == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_body_bytes",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_pages",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn options(&self) -> RepositoryOptions {
        RepositoryOptions {
            store_code: self.store_code.clone(),
            default_page_size: self.page_size,
            max_pages: self.max_pages,
        }
    }

    pub fn transport(&self) -> UreqTransport {
        let mut transport =
            UreqTransport::with_timeout(&self.base_url, Duration::from_secs(self.timeout_secs));
        if let Some(limit) = self.max_body_bytes {
            transport = transport.max_body_bytes(limit);
        }
        match &self.bearer_token {
            Some(token) => transport.bearer_token(token.clone()),
            None => transport,
        }
    }

    pub fn into_repository(self) -> RestRepository<UreqTransport> {
        RestRepository::with_options(self.transport(), self.options())
    }
}
