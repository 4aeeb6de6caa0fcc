use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::session::{ExpiryPolicy, RedirectMode};
use crate::storage::{CredentialStore, FileStore};

pub(crate) const DEFAULT_API_PREFIX: &str = "/api/";
pub(crate) const DEFAULT_REFRESH_PATH: &str = "/api/v1/accounts/token/refresh/";

/// Client configuration.
///
/// The base URL is a constructor parameter; everything else has a default.
/// Use [`from_env()`](ClientConfig::from_env) for convention-based setup.
///
/// ```rust,ignore
/// let config = ClientConfig::new("https://drcode.example/".parse()?)
///     .with_refresh_timeout(Duration::from_secs(5))
///     .with_storage_path("/var/lib/drcode/session.json");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    base_url: Url,
    api_prefix: String,
    refresh_path: String,
    refresh_timeout: Duration,
    request_timeout: Duration,
    expiry_policy: ExpiryPolicy,
    storage_path: Option<PathBuf>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_prefix: DEFAULT_API_PREFIX.into(),
            refresh_path: DEFAULT_REFRESH_PATH.into(),
            refresh_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(30),
            expiry_policy: ExpiryPolicy::default(),
            storage_path: None,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `DRCODE_BASE_URL`: backend origin (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `DRCODE_API_PREFIX`: path prefix of API calls (default `/api/`)
    /// - `DRCODE_REFRESH_PATH`: token refresh endpoint
    /// - `DRCODE_REFRESH_TIMEOUT_SECS`: refresh call limit (default 15)
    /// - `DRCODE_REQUEST_TIMEOUT_SECS`: per-request limit (default 30)
    /// - `DRCODE_SESSION_EXPIRY`: `never`, `always` or `unless-landing`
    /// - `DRCODE_LANDING_ROUTE`: route expired sessions return to (default `/`)
    /// - `DRCODE_STORAGE_PATH`: persist credentials to this JSON file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the variable that is missing or invalid.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let base_url: Url = lookup("DRCODE_BASE_URL")
            .ok_or_else(|| Error::Config("DRCODE_BASE_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("DRCODE_BASE_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Some(prefix) = lookup("DRCODE_API_PREFIX") {
            config = config.with_api_prefix(prefix);
        }
        if let Some(path) = lookup("DRCODE_REFRESH_PATH") {
            config = config.with_refresh_path(path);
        }
        if let Some(secs) = lookup("DRCODE_REFRESH_TIMEOUT_SECS") {
            config = config.with_refresh_timeout(parse_secs("DRCODE_REFRESH_TIMEOUT_SECS", &secs)?);
        }
        if let Some(secs) = lookup("DRCODE_REQUEST_TIMEOUT_SECS") {
            config = config.with_request_timeout(parse_secs("DRCODE_REQUEST_TIMEOUT_SECS", &secs)?);
        }

        let mode = match lookup("DRCODE_SESSION_EXPIRY") {
            Some(raw) => raw
                .parse::<RedirectMode>()
                .map_err(|e| Error::Config(format!("DRCODE_SESSION_EXPIRY: {e}")))?,
            None => RedirectMode::default(),
        };
        let mut policy = ExpiryPolicy::new(mode);
        if let Some(route) = lookup("DRCODE_LANDING_ROUTE") {
            policy = policy.with_landing_route(route);
        }
        config = config.with_expiry_policy(policy);

        if let Some(path) = lookup("DRCODE_STORAGE_PATH").filter(|p| !p.trim().is_empty()) {
            config = config.with_storage_path(path);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = policy;
        self
    }

    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    #[must_use]
    pub fn refresh_path(&self) -> &str {
        &self.refresh_path
    }

    #[must_use]
    pub fn refresh_timeout(&self) -> Duration {
        self.refresh_timeout
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn expiry_policy(&self) -> &ExpiryPolicy {
        &self.expiry_policy
    }

    #[must_use]
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Credential store backed by the configured file, or by memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the storage file exists but is unreadable.
    pub fn credential_store(&self) -> Result<CredentialStore, Error> {
        match &self.storage_path {
            Some(path) => Ok(CredentialStore::new(FileStore::open(path)?)),
            None => Ok(CredentialStore::in_memory()),
        }
    }

    #[cfg(feature = "reqwest-transport")]
    #[must_use]
    pub fn transport(&self) -> crate::session::ReqwestTransport {
        crate::session::ReqwestTransport::new(self.base_url.clone())
            .with_timeout(self.request_timeout)
    }
}

fn parse_secs(var: &str, raw: &str) -> Result<Duration, Error> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(Error::Config(format!("{var}: must be greater than zero"))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(Error::Config(format!("{var}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[("DRCODE_BASE_URL", "https://drcode.example/")]))
            .unwrap();
        assert_eq!(config.api_prefix(), "/api/");
        assert_eq!(config.refresh_path(), "/api/v1/accounts/token/refresh/");
        assert_eq!(config.refresh_timeout(), Duration::from_secs(15));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.expiry_policy(), &ExpiryPolicy::default());
        assert_eq!(config.storage_path(), None);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("DRCODE_BASE_URL", "http://localhost:8000/"),
            ("DRCODE_REFRESH_TIMEOUT_SECS", "5"),
            ("DRCODE_SESSION_EXPIRY", "always"),
            ("DRCODE_LANDING_ROUTE", "/home/"),
            ("DRCODE_STORAGE_PATH", "/tmp/drcode.json"),
        ]))
        .unwrap();
        assert_eq!(config.refresh_timeout(), Duration::from_secs(5));
        assert_eq!(config.expiry_policy().mode(), RedirectMode::Always);
        assert_eq!(config.expiry_policy().landing_route(), "/home/");
        assert_eq!(config.storage_path(), Some(Path::new("/tmp/drcode.json")));
    }

    #[test]
    fn test_errors_name_the_variable() {
        let missing = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(missing.to_string().contains("DRCODE_BASE_URL"));

        let bad_url =
            ClientConfig::from_lookup(lookup(&[("DRCODE_BASE_URL", "not a url")])).unwrap_err();
        assert!(bad_url.to_string().contains("DRCODE_BASE_URL"));

        let bad_timeout = ClientConfig::from_lookup(lookup(&[
            ("DRCODE_BASE_URL", "https://drcode.example/"),
            ("DRCODE_REQUEST_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(bad_timeout.to_string().contains("DRCODE_REQUEST_TIMEOUT_SECS"));

        let bad_mode = ClientConfig::from_lookup(lookup(&[
            ("DRCODE_BASE_URL", "https://drcode.example/"),
            ("DRCODE_SESSION_EXPIRY", "sometimes"),
        ]))
        .unwrap_err();
        assert!(matches!(bad_mode, Error::Config(m) if m.starts_with("DRCODE_SESSION_EXPIRY")));
    }

    #[test]
    fn test_memory_store_without_path() {
        let config = ClientConfig::new("https://drcode.example/".parse().unwrap());
        let store = config.credential_store().unwrap();
        assert!(!store.is_logged_in());
    }
}
