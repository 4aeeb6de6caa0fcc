use super::{Effects, Notice, failure, landing};
use crate::api::{ApiClient, AuthSession, LoginRequest, PasswordResetConfirm, RegisterRequest, Reply};
use crate::error::Error;
use crate::session::Transport;

const ROUTE: &str = "/login";

/// Login, registration, logout and password reset forms.
pub struct AuthPage<T> {
    api: ApiClient<T>,
}

impl<T: Transport> AuthPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self { api }
    }

    pub async fn login(&self, phone_number: &str, password: &str) -> Effects {
        let request = LoginRequest::new(phone_number, password);
        if let Err(e) = request.validate() {
            return Effects::notice(Notice::warning(e.to_string()));
        }
        let result = self.api.auth().login(&request).await;
        self.establish(result, "Logged in successfully.")
    }

    pub async fn register(&self, request: &RegisterRequest) -> Effects {
        if let Err(e) = request.validate() {
            return Effects::notice(Notice::warning(e.to_string()));
        }
        let result = self.api.auth().register(request).await;
        self.establish(result, "Your account was created.")
    }

    /// Stores the new session and sends the user where they were headed.
    fn establish(&self, result: Result<Reply<AuthSession>, Error>, default_message: &str) -> Effects {
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => return failure(&self.api, ROUTE, &e, "Login failed. Please try again."),
        };
        let credentials = self.api.credentials();
        if let Err(e) = reply.data.persist(credentials) {
            return failure(&self.api, ROUTE, &e, "Could not save your session on this device.");
        }
        tracing::info!(
            user_id = ?reply.data.user.as_ref().and_then(|u| u.id),
            "User signed in"
        );

        let target = credentials
            .take_redirect_after_login()
            .unwrap_or_else(|| landing(&self.api));
        let message = reply.message.unwrap_or_else(|| default_message.to_owned());
        Effects::navigate(target).with_notice(Notice::success(message))
    }

    /// Always ends on the landing route with credentials cleared, even when
    /// the server could not be told.
    pub async fn logout(&self) -> Effects {
        if let Err(e) = self.api.auth().logout().await {
            tracing::debug!(error = %e, "Server-side logout failed");
        }
        Effects::navigate(landing(&self.api)).with_notice(Notice::success("You have been logged out."))
    }

    pub async fn request_password_reset(&self, email: &str) -> Effects {
        if email.trim().is_empty() {
            return Effects::notice(Notice::warning("Email is required."));
        }
        match self.api.auth().request_password_reset(email).await {
            Ok(reply) => Effects::notice(Notice::success(
                reply
                    .message
                    .unwrap_or_else(|| "A password reset link was sent to your email.".to_owned()),
            )),
            Err(e) => failure(&self.api, ROUTE, &e, "Could not send the reset link."),
        }
    }

    pub async fn confirm_password_reset(&self, request: &PasswordResetConfirm) -> Effects {
        match self.api.auth().confirm_password_reset(request).await {
            Ok(reply) => Effects::navigate(landing(&self.api)).with_notice(Notice::success(
                reply
                    .message
                    .unwrap_or_else(|| "Your password was changed. You can log in now.".to_owned()),
            )),
            Err(e) => failure(&self.api, ROUTE, &e, "Could not reset the password."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::NoticeLevel;
    use crate::session::ApiResponse;
    use crate::testing::FakeTransport;
    use crate::{session::SessionClient, storage::CredentialStore};
    use serde_json::json;

    fn anonymous(handler: impl Fn(&crate::session::ApiRequest) -> ApiResponse + Send + Sync + 'static) -> (AuthPage<FakeTransport>, ApiClient<FakeTransport>, FakeTransport) {
        let transport = FakeTransport::new(handler);
        let api = ApiClient::new(SessionClient::new(transport.clone(), CredentialStore::in_memory()));
        (AuthPage::new(api.clone()), api, transport)
    }

    #[tokio::test]
    async fn login_persists_session_and_returns_to_remembered_route() {
        let (page, api, _) = anonymous(|_| {
            ApiResponse::json_body(
                200,
                &json!({"success": true, "message": "welcome", "data": {
                    "tokens": {"access": "a1", "refresh": "r1", "jti": "j1"},
                    "user": {"id": 4, "full_name": "Sara"},
                    "profile": {"auth_status": "APPROVED", "role": "regular"}
                }}),
            )
        });
        api.credentials().set_redirect_after_login("/my-prescriptions").unwrap();

        let effects = page.login("09121234567", "secret-pass").await;
        assert_eq!(effects.navigate.as_deref(), Some("/my-prescriptions"));
        assert_eq!(effects.notice, Some(Notice::success("welcome")));

        let credentials = api.credentials();
        assert_eq!(credentials.access_token().as_deref(), Some("a1"));
        assert_eq!(credentials.session_id().map(String::from).as_deref(), Some("j1"));
        assert!(credentials.user_profile().unwrap().is_approved());
    }

    #[tokio::test]
    async fn invalid_phone_never_reaches_server() {
        let (page, _, transport) = anonymous(|_| ApiResponse::new(200, ""));
        let effects = page.login("12345", "pw").await;
        assert_eq!(effects.notice.unwrap().level, NoticeLevel::Warning);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn rejected_login_shows_server_message() {
        let (page, api, _) = anonymous(|_| {
            ApiResponse::json_body(400, &json!({"success": false, "message": "wrong password"}))
        });
        let effects = page.login("09121234567", "secret-pass").await;
        assert_eq!(effects.notice, Some(Notice::error("wrong password")));
        assert_eq!(effects.navigate, None);
        assert!(!api.credentials().is_logged_in());
    }

    #[tokio::test]
    async fn register_accepts_flat_payload() {
        let (page, api, _) = anonymous(|_| {
            ApiResponse::json_body(
                201,
                &json!({"success": true, "data": {
                    "access_token": "a2", "refresh_token": "r2", "jti": "j2",
                    "user_id": 9, "full_name": "Ali Ahmadi", "phone_number": "09120000000",
                    "next_step": "authentication"
                }}),
            )
        });
        let request = RegisterRequest::new("Ali", "Ahmadi", "09120000000", "long-enough", "long-enough");
        let effects = page.register(&request).await;
        assert_eq!(effects.navigate.as_deref(), Some("/"));
        assert_eq!(api.credentials().refresh_token().as_deref(), Some("r2"));
        assert_eq!(api.credentials().user_data().unwrap().full_name.as_deref(), Some("Ali Ahmadi"));
    }

    #[tokio::test]
    async fn register_mismatch_is_rejected_locally() {
        let (page, _, transport) = anonymous(|_| ApiResponse::new(200, ""));
        let request = RegisterRequest::new("Ali", "Ahmadi", "09120000000", "long-enough", "different1");
        let effects = page.register(&request).await;
        assert_eq!(effects.notice.unwrap().text, "passwords do not match");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_fails() {
        let transport = FakeTransport::failing("connection reset");
        let store = CredentialStore::in_memory();
        store
            .save_tokens(&crate::storage::TokenSet::new().with_access("a").with_refresh("r"))
            .unwrap();
        let api = ApiClient::new(SessionClient::new(transport, store));
        let page = AuthPage::new(api.clone());

        let effects = page.logout().await;
        assert_eq!(effects.navigate.as_deref(), Some("/"));
        assert!(!api.credentials().is_logged_in());
    }
}
