use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{KeyValueStore, MemoryStore};
use crate::error::Error;
use crate::types::{PaymentGateway, PaymentId, PendingOrder, ProfileSnapshot, SessionId, UserSnapshot};

const ACCESS_TOKEN_KEY: &str = "drcode_access_token";
const REFRESH_TOKEN_KEY: &str = "drcode_refresh_token";
const SESSION_ID_KEY: &str = "drcode_user_jti";
const USER_DATA_KEY: &str = "drcode_user_data";
const USER_PROFILE_KEY: &str = "drcode_user_profile";
const PENDING_ORDER_KEY: &str = "drcode_pending_order";
const PAYMENT_GATEWAY_KEY: &str = "drcode_payment_gateway";
const PAYMENT_ID_KEY: &str = "drcode_payment_id";
const REDIRECT_AFTER_LOGIN_KEY: &str = "drcode_redirect_after_login";

const OWNED_KEYS: [&str; 9] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    SESSION_ID_KEY,
    USER_DATA_KEY,
    USER_PROFILE_KEY,
    PENDING_ORDER_KEY,
    PAYMENT_GATEWAY_KEY,
    PAYMENT_ID_KEY,
    REDIRECT_AFTER_LOGIN_KEY,
];

/// The credential record: any subset of access token, refresh token and
/// session id.
///
/// Deserializes from either naming the backend has used (`access` /
/// `access_token`, `refresh` / `refresh_token`, `jti` / `active_jti`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(default, alias = "access_token", skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, alias = "refresh_token", skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    #[serde(
        default,
        alias = "jti",
        alias = "active_jti",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
}

impl TokenSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_access(mut self, token: impl Into<String>) -> Self {
        self.access = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_refresh(mut self, token: impl Into<String>) -> Self {
        self.refresh = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }
}

/// Owner of every persisted session key.
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    #[must_use]
    pub fn new(backend: impl KeyValueStore) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    #[must_use]
    pub fn with_backend(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store backed by process memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    // ── Tokens ─────────────────────────────────────────────────────────

    /// Persists the fields present in `tokens`; absent or empty fields keep
    /// their stored value. The fields go to the backend as one batch, so a
    /// persisting backend never pairs a new access token with a stale
    /// refresh token on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects the write.
    pub fn save_tokens(&self, tokens: &TokenSet) -> Result<(), Error> {
        let entries: Vec<(&str, &str)> = [
            (ACCESS_TOKEN_KEY, &tokens.access),
            (REFRESH_TOKEN_KEY, &tokens.refresh),
            (SESSION_ID_KEY, &tokens.session_id),
        ]
        .into_iter()
        .filter_map(|(key, value)| Some((key, value.as_deref().filter(|v| !v.is_empty())?)))
        .collect();
        if !entries.is_empty() {
            self.backend.set_many(&entries)?;
        }
        tracing::debug!(
            access = tokens.access.is_some(),
            refresh = tokens.refresh.is_some(),
            session = tokens.session_id.is_some(),
            "Saved tokens"
        );
        Ok(())
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read_string(ACCESS_TOKEN_KEY)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read_string(REFRESH_TOKEN_KEY)
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.read_string(SESSION_ID_KEY).map(SessionId)
    }

    /// Snapshot of the stored credential record.
    #[must_use]
    pub fn tokens(&self) -> TokenSet {
        TokenSet {
            access: self.access_token(),
            refresh: self.refresh_token(),
            session_id: self.session_id().map(String::from),
        }
    }

    /// Presence check only: says nothing about expiry or revocation.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.access_token().is_some()
    }

    // ── Snapshots ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects the write.
    pub fn save_user_data(&self, user: &UserSnapshot) -> Result<(), Error> {
        self.write_json(USER_DATA_KEY, user)
    }

    #[must_use]
    pub fn user_data(&self) -> Option<UserSnapshot> {
        self.read_json(USER_DATA_KEY)
    }

    /// Overwrites the given fields of the stored user snapshot, keeping the rest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects the write.
    pub fn merge_user_data(&self, fields: Map<String, Value>) -> Result<(), Error> {
        let mut current = match self.read_json::<Value>(USER_DATA_KEY) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        current.extend(fields);
        self.write_json(USER_DATA_KEY, &current)
    }

    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects the write.
    pub fn save_user_profile(&self, profile: &ProfileSnapshot) -> Result<(), Error> {
        self.write_json(USER_PROFILE_KEY, profile)
    }

    /// Stored profile. Older clients persisted the whole `{success, data}`
    /// envelope; that shape is unwrapped transparently.
    #[must_use]
    pub fn user_profile(&self) -> Option<ProfileSnapshot> {
        let value = self.read_json::<Value>(USER_PROFILE_KEY)?;
        let value = match value {
            Value::Object(mut map) if map.contains_key("success") && map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(value)
            .map_err(|e| tracing::warn!(error = %e, "Discarding unreadable profile snapshot"))
            .ok()
    }

    // ── Checkout hand-off ──────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects the write.
    pub fn save_pending_order(&self, order: &PendingOrder) -> Result<(), Error> {
        self.write_json(PENDING_ORDER_KEY, order)
    }

    #[must_use]
    pub fn pending_order(&self) -> Option<PendingOrder> {
        self.read_json(PENDING_ORDER_KEY)
    }

    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects the write.
    pub fn save_payment_gateway(&self, gateway: PaymentGateway) -> Result<(), Error> {
        self.backend.set(PAYMENT_GATEWAY_KEY, gateway.as_str())
    }

    #[must_use]
    pub fn payment_gateway(&self) -> Option<PaymentGateway> {
        self.read_string(PAYMENT_GATEWAY_KEY)?.parse().ok()
    }

    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects the write.
    pub fn save_payment_id(&self, id: PaymentId) -> Result<(), Error> {
        self.backend.set(PAYMENT_ID_KEY, &id.to_string())
    }

    #[must_use]
    pub fn payment_id(&self) -> Option<PaymentId> {
        self.read_string(PAYMENT_ID_KEY)?.parse().ok()
    }

    /// Drops the pending order and the chosen gateway once verification ends.
    pub fn clear_checkout(&self) {
        for key in [PENDING_ORDER_KEY, PAYMENT_GATEWAY_KEY, PAYMENT_ID_KEY] {
            self.remove_logged(key);
        }
    }

    // ── Route return ───────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend rejects the write.
    pub fn set_redirect_after_login(&self, route: &str) -> Result<(), Error> {
        self.backend.set(REDIRECT_AFTER_LOGIN_KEY, route)
    }

    /// Returns and forgets the route remembered by the route guard.
    pub fn take_redirect_after_login(&self) -> Option<String> {
        let route = self.read_string(REDIRECT_AFTER_LOGIN_KEY)?;
        self.remove_logged(REDIRECT_AFTER_LOGIN_KEY);
        Some(route)
    }

    // ── Reset ──────────────────────────────────────────────────────────

    /// Removes every key this store owns. Idempotent; backend failures are
    /// logged, never returned.
    pub fn clear_all(&self) {
        for key in OWNED_KEYS {
            self.remove_logged(key);
        }
        tracing::debug!("Cleared all stored credentials");
    }

    fn remove_logged(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            tracing::warn!(key, error = %e, "Failed to remove stored key");
        }
    }

    fn read_string(&self, key: &str) -> Option<String> {
        self.backend.get(key).filter(|v| !v.is_empty())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_string(key)?;
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(key, error = %e, "Discarding unreadable stored value"))
            .ok()
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), Error> {
        let raw = serde_json::to_string(value)?;
        self.backend.set(key, &raw)
    }
}
