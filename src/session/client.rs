use std::time::Duration;

use http::header::AUTHORIZATION;

use super::flight::{RefreshGate, Ticket};
use super::headers::{bearer, build_headers};
use super::policy::ExpiryPolicy;
use super::refresh::RefreshCoordinator;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::config::{ClientConfig, DEFAULT_API_PREFIX, DEFAULT_REFRESH_PATH};
use crate::error::{Error, RefreshError};
use crate::storage::CredentialStore;

const UNAUTHORIZED: u16 = 401;

/// The HTTP interceptor: every API call goes through here.
///
/// Adds the bearer token to calls inside the API namespace and, when one of
/// them comes back 401, renews the access token and re-issues the call once.
/// At most one refresh call is outstanding per client; requests that hit a
/// 401 meanwhile wait for it and share its outcome.
///
/// Build one per credential store and share it (`Arc`) between tasks.
pub struct SessionClient<T> {
    transport: T,
    credentials: CredentialStore,
    coordinator: RefreshCoordinator,
    gate: RefreshGate,
    api_prefix: String,
    expiry: ExpiryPolicy,
}

impl<T> std::fmt::Debug for SessionClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("api_prefix", &self.api_prefix)
            .field("refresh_path", &self.coordinator.path())
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> SessionClient<T> {
    /// Client with the default API prefix, refresh endpoint and expiry policy.
    #[must_use]
    pub fn new(transport: T, credentials: CredentialStore) -> Self {
        Self {
            transport,
            credentials,
            coordinator: RefreshCoordinator::new(DEFAULT_REFRESH_PATH, Duration::from_secs(15)),
            gate: RefreshGate::default(),
            api_prefix: DEFAULT_API_PREFIX.into(),
            expiry: ExpiryPolicy::default(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ClientConfig, transport: T, credentials: CredentialStore) -> Self {
        Self::new(transport, credentials)
            .with_api_prefix(config.api_prefix())
            .with_refresh_coordinator(RefreshCoordinator::new(
                config.refresh_path(),
                config.refresh_timeout(),
            ))
            .with_expiry_policy(config.expiry_policy().clone())
    }

    /// Path prefix that marks a call as an API call (default `/api/`).
    #[must_use]
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_refresh_coordinator(mut self, coordinator: RefreshCoordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    #[must_use]
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry = policy;
        self
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    #[must_use]
    pub fn expiry_policy(&self) -> &ExpiryPolicy {
        &self.expiry
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn refresh_in_flight(&self) -> bool {
        self.gate.is_in_flight()
    }

    /// Requests currently queued behind the in-flight refresh.
    #[must_use]
    pub fn refresh_waiters(&self) -> usize {
        self.gate.waiting()
    }

    /// Relative targets inside the API prefix, or absolute ones on the
    /// transport's own origin.
    fn is_api_call(&self, request: &ApiRequest, path: &str) -> bool {
        let on_origin = match request.origin() {
            Some(origin) => self.transport.api_origin() == Some(origin),
            None => true,
        };
        on_origin && path.starts_with(&self.api_prefix)
    }

    fn is_refresh_path(&self, path: &str) -> bool {
        path == self.coordinator.path()
    }

    /// Sends `request`, recovering from one expired access token.
    ///
    /// Non-2xx answers are returned as `Ok`; only the 401 that a refresh
    /// could not cure becomes an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the transport fails, or
    /// [`Error::SessionExpired`] if a 401 triggered a refresh that failed. In
    /// the latter case the credential store has already been cleared.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, Error> {
        let path = request.path().into_owned();
        let is_api = self.is_api_call(&request, &path);
        let sent_token = if is_api { self.decorate(&mut request) } else { None };

        let response = self.transport.send(request.clone()).await?;
        if response.status != UNAUTHORIZED
            || !is_api
            || self.is_refresh_path(&path)
            || self.credentials.refresh_token().is_none()
        {
            return Ok(response);
        }

        tracing::debug!(path = %path, "Access token rejected; renewing");
        let token = self
            .renewed_token(sent_token.as_deref())
            .await
            .map_err(Error::SessionExpired)?;

        match bearer(&token) {
            Some(value) => {
                request.headers.insert(AUTHORIZATION, value);
            }
            None => {
                request.headers.remove(AUTHORIZATION);
            }
        }
        self.transport.send(request).await
    }

    /// Runs a refresh through the single-flight gate, or joins the one
    /// already running.
    ///
    /// # Errors
    ///
    /// Returns the [`RefreshError`] shared by every caller of this refresh.
    pub async fn refresh_now(&self) -> Result<String, RefreshError> {
        match self.gate.enter() {
            Ticket::Leader(guard) => {
                let outcome = self
                    .coordinator
                    .refresh(&self.transport, &self.credentials)
                    .await
                    .map(|tokens| tokens.access);
                let released = guard.settle(&outcome);
                tracing::debug!(released, ok = outcome.is_ok(), "Refresh settled");
                outcome
            }
            Ticket::Follower(rx) => rx.await.unwrap_or(Err(RefreshError::Abandoned)),
        }
    }

    /// Merges the decorator's headers into `request`. Caller headers win,
    /// except `Authorization`. Returns the token that was attached.
    fn decorate(&self, request: &mut ApiRequest) -> Option<String> {
        let token = self.credentials.access_token()?;
        for (name, value) in build_headers(&self.credentials, true) {
            let Some(name) = name else { continue };
            if name == AUTHORIZATION {
                request.headers.insert(name, value);
            } else {
                request.headers.entry(name).or_insert(value);
            }
        }
        Some(token)
    }

    async fn renewed_token(&self, sent: Option<&str>) -> Result<String, RefreshError> {
        // A refresh that settled after this request left already produced a
        // newer token; use it instead of starting another refresh.
        if let Some(current) = self.credentials.access_token() {
            if sent != Some(current.as_str()) {
                tracing::debug!("Retrying with token from a completed refresh");
                return Ok(current);
            }
        }
        self.refresh_now().await
    }
}
