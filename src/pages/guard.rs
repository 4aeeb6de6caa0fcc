use super::{Effects, Notice, landing};
use crate::api::ApiClient;
use crate::session::Transport;

/// Routes that need a logged-in user.
pub const PROTECTED_ROUTES: [&str; 3] = ["/profile", "/premium", "/my-prescriptions"];

/// Result of [`RouteGuard::verify_active_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// No local session to check.
    NotLoggedIn,
    Active,
    /// The server no longer accepts this session; local credentials were cleared.
    Revoked,
}

pub struct RouteGuard<T> {
    api: ApiClient<T>,
    protected: Vec<String>,
}

impl<T: Transport> RouteGuard<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            protected: PROTECTED_ROUTES.iter().map(|r| (*r).to_owned()).collect(),
        }
    }

    #[must_use]
    pub fn with_protected_routes(mut self, routes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.protected = routes.into_iter().map(Into::into).collect();
        self
    }

    /// Matches on the path only; a trailing slash is ignored.
    #[must_use]
    pub fn is_protected(&self, route: &str) -> bool {
        let path = normalize(route);
        self.protected.iter().any(|p| normalize(p) == path)
    }

    /// Sends an anonymous visitor of a protected route back to the landing
    /// route, remembering where they were going.
    pub fn check_access(&self, route: &str) -> Effects {
        let credentials = self.api.credentials();
        if !self.is_protected(route) || credentials.is_logged_in() {
            return Effects::none();
        }
        let path = route.split(['?', '#']).next().unwrap_or(route);
        if let Err(e) = credentials.set_redirect_after_login(path) {
            tracing::warn!(error = %e, "Could not remember redirect target");
        }
        tracing::debug!(route = path, "Blocked anonymous access to protected route");
        Effects::navigate(landing(&self.api))
            .with_notice(Notice::warning("You need to log in to access this page."))
    }

    /// The route remembered by [`check_access`](Self::check_access), once.
    pub fn redirect_after_login(&self) -> Option<String> {
        self.api.credentials().take_redirect_after_login()
    }

    /// Asks the server whether this device still holds the active session.
    ///
    /// The backend allows one session per user; a login elsewhere changes the
    /// server's `active_jti`. Any failure is treated as a lost session.
    pub async fn verify_active_session(&self) -> SessionCheck {
        let credentials = self.api.credentials();
        let Some(local) = credentials.session_id() else {
            return SessionCheck::NotLoggedIn;
        };
        if credentials.access_token().is_none() {
            return SessionCheck::NotLoggedIn;
        }

        match self.api.auth().login_status().await {
            Ok(reply) => match reply.data.active_session_id() {
                Some(active) if active != local.0 => {
                    tracing::info!("Session replaced by a login on another device");
                    credentials.clear_all();
                    SessionCheck::Revoked
                }
                _ => SessionCheck::Active,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Active session check failed");
                credentials.clear_all();
                SessionCheck::Revoked
            }
        }
    }
}

fn normalize(route: &str) -> &str {
    let path = route.split(['?', '#']).next().unwrap_or(route);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}
