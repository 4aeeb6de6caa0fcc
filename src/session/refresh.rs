use std::time::Duration;

use serde_json::{Value, json};

use super::headers::build_headers;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::RefreshError;
use crate::storage::{CredentialStore, TokenSet};

/// Tokens persisted by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access: String,
    /// The newly issued refresh token, or the previous one if none was issued.
    pub refresh: String,
}

/// Exchanges the stored refresh token for a new access token.
///
/// Stateless: concurrency is the caller's concern. Every failure clears the
/// credential store before returning, so a half-valid session never stays
/// behind.
#[derive(Debug, Clone)]
pub struct RefreshCoordinator {
    path: String,
    timeout: Duration,
}

impl RefreshCoordinator {
    #[must_use]
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// # Errors
    ///
    /// Returns a [`RefreshError`] if no refresh token is stored, the endpoint
    /// rejects it, the call fails or times out, or the answer carries no
    /// access token. Credentials are cleared in every one of those cases.
    pub async fn refresh<T: Transport>(
        &self,
        transport: &T,
        credentials: &CredentialStore,
    ) -> Result<RefreshedTokens, RefreshError> {
        let result = self.exchange(transport, credentials).await;
        match &result {
            Ok(_) => tracing::info!("Access token refreshed"),
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed; clearing credentials");
                credentials.clear_all();
            }
        }
        result
    }

    async fn exchange<T: Transport>(
        &self,
        transport: &T,
        credentials: &CredentialStore,
    ) -> Result<RefreshedTokens, RefreshError> {
        let refresh_token = credentials
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken)?;

        let mut request = ApiRequest::post(self.path.as_str())
            .with_json(json!({ "refresh": refresh_token }));
        request.headers = build_headers(credentials, false);

        let response = tokio::time::timeout(self.timeout, transport.send(request))
            .await
            .map_err(|_| RefreshError::TimedOut(self.timeout))?
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
                message: response
                    .error_message()
                    .unwrap_or_else(|| format!("refresh failed with status {}", response.status)),
            });
        }

        let issued = parse_tokens(&response)?;
        let access = issued
            .access
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RefreshError::MalformedResponse("no access token".into()))?;
        let refresh = issued
            .refresh
            .filter(|t| !t.is_empty())
            .unwrap_or(refresh_token);
        let session_id = issued.session_id.or_else(|| session_id_from(&access));

        let mut update = TokenSet::new().with_access(&access).with_refresh(&refresh);
        update.session_id = session_id;
        credentials
            .save_tokens(&update)
            .map_err(|e| RefreshError::Storage(e.to_string()))?;

        Ok(RefreshedTokens { access, refresh })
    }
}

/// Reads the token fields from a bare or `{success, data}`-wrapped body.
fn parse_tokens(response: &ApiResponse) -> Result<TokenSet, RefreshError> {
    let body: Value = response
        .json()
        .map_err(|e| RefreshError::MalformedResponse(e.to_string()))?;
    let tokens = match body {
        Value::Object(mut fields) if fields.get("data").is_some_and(Value::is_object) => {
            fields.remove("data").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(tokens).map_err(|e| RefreshError::MalformedResponse(e.to_string()))
}

#[cfg(feature = "token")]
fn session_id_from(access: &str) -> Option<String> {
    crate::token::extract_jti_from_token(access).ok()
}

#[cfg(not(feature = "token"))]
fn session_id_from(_access: &str) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTransport;

    const PATH: &str = "/api/v1/accounts/token/refresh/";

    fn coordinator() -> RefreshCoordinator {
        RefreshCoordinator::new(PATH, Duration::from_secs(5))
    }

    fn logged_in() -> CredentialStore {
        let store = CredentialStore::in_memory();
        store
            .save_tokens(&TokenSet::new().with_access("old").with_refresh("r1").with_session_id("s1"))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn stores_new_access_and_keeps_refresh() {
        let transport = FakeTransport::new(|req| {
            assert_eq!(req.path(), PATH);
            ApiResponse::json_body(200, &json!({"access": "new"}))
        });
        let store = logged_in();

        let tokens = coordinator().refresh(&transport, &store).await.unwrap();
        assert_eq!(tokens.access, "new");
        assert_eq!(tokens.refresh, "r1");
        assert_eq!(store.access_token().as_deref(), Some("new"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));

        let sent = transport.requests();
        assert_eq!(sent[0].body, crate::session::RequestBody::Json(json!({"refresh": "r1"})));
        assert!(!sent[0].headers.contains_key(http::header::AUTHORIZATION));
    }

    #[tokio::test]
    async fn rotated_refresh_token_replaces_old_one() {
        let transport = FakeTransport::new(|_| {
            ApiResponse::json_body(
                200,
                &json!({"success": true, "data": {"access_token": "a2", "refresh_token": "r2"}}),
            )
        });
        let store = logged_in();

        coordinator().refresh(&transport, &store).await.unwrap();
        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
    }

    #[cfg(feature = "token")]
    #[tokio::test]
    async fn session_id_follows_new_token() {
        let access = crate::token::encode_test_token(&json!({"jti": "s2"}));
        let body = json!({ "access": access });
        let transport = FakeTransport::new(move |_| ApiResponse::json_body(200, &body));
        let store = logged_in();

        coordinator().refresh(&transport, &store).await.unwrap();
        assert_eq!(store.session_id().unwrap().0, "s2");
    }

    #[tokio::test]
    async fn missing_refresh_token_clears_without_calling() {
        let transport = FakeTransport::new(|_| ApiResponse::new(200, "{}"));
        let store = CredentialStore::in_memory();
        store.save_tokens(&TokenSet::new().with_access("a")).unwrap();

        let err = coordinator().refresh(&transport, &store).await.unwrap_err();
        assert_eq!(err, RefreshError::MissingRefreshToken);
        assert!(transport.requests().is_empty());
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn rejection_clears_credentials() {
        let transport = FakeTransport::new(|_| {
            ApiResponse::json_body(401, &json!({"detail": "Token is invalid or expired"}))
        });
        let store = logged_in();

        let err = coordinator().refresh(&transport, &store).await.unwrap_err();
        assert_eq!(
            err,
            RefreshError::Rejected {
                status: 401,
                message: "Token is invalid or expired".into()
            }
        );
        assert_eq!(store.tokens(), TokenSet::default());
    }

    #[tokio::test]
    async fn body_without_access_is_malformed() {
        let transport = FakeTransport::new(|_| ApiResponse::json_body(200, &json!({"refresh": "r"})));
        let store = logged_in();

        let err = coordinator().refresh(&transport, &store).await.unwrap_err();
        assert!(matches!(err, RefreshError::MalformedResponse(_)));
        assert!(!store.is_logged_in());
    }

    #[tokio::test]
    async fn network_failure_clears_credentials() {
        let transport = FakeTransport::failing("connection refused");
        let store = logged_in();

        let err = coordinator().refresh(&transport, &store).await.unwrap_err();
        assert!(matches!(err, RefreshError::Network(m) if m.contains("connection refused")));
        assert!(!store.is_logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_refresh_times_out() {
        let transport = FakeTransport::new(|_| ApiResponse::new(200, "{}"));
        let _hold = transport.hold(PATH);
        let store = logged_in();

        let err = RefreshCoordinator::new(PATH, Duration::from_secs(3))
            .refresh(&transport, &store)
            .await
            .unwrap_err();
        assert_eq!(err, RefreshError::TimedOut(Duration::from_secs(3)));
        assert!(!store.is_logged_in());
    }
}
