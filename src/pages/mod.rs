//! Headless page controllers.
//!
//! Each controller holds the state of one page, calls the API through a
//! shared [`ApiClient`], and reports what the UI should do next as
//! [`Effects`]. Errors never escape a controller: they become a [`Notice`],
//! and an expired session is routed through the session's
//! [`ExpiryPolicy`](crate::session::ExpiryPolicy).

mod auth;
mod checkout;
mod guard;
mod identity;
mod notifications;
mod payment_verify;
mod plans;
mod prescription_detail;
mod prescriptions;
mod profile;
mod questions;
mod saved;
mod tutorials;

pub use auth::AuthPage;
pub use checkout::{CheckoutPage, PAYMENT_REQUEST_ROUTE, PaymentGatewayPage};
pub use guard::{PROTECTED_ROUTES, RouteGuard, SessionCheck};
pub use identity::IdentityVerificationPage;
pub use notifications::NotificationsPage;
pub use payment_verify::{PaymentCallback, PaymentVerifyPage, VerifyOutcome};
pub use plans::PlansPage;
pub use prescription_detail::{Medication, PrescriptionDetailPage};
pub use prescriptions::PrescriptionListPage;
pub use profile::ProfilePage;
pub use questions::UserQuestionsPage;
pub use saved::SavedPrescriptionsPage;
pub use tutorials::TutorialsPage;

use crate::api::ApiClient;
use crate::error::Error;
use crate::session::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, text)
    }

    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, text)
    }

    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, text)
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, text)
    }

    fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Outcome of a page action: something to show, somewhere to go, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct Effects {
    pub notice: Option<Notice>,
    pub navigate: Option<String>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn notice(notice: Notice) -> Self {
        Self {
            notice: Some(notice),
            navigate: None,
        }
    }

    pub fn navigate(route: impl Into<String>) -> Self {
        Self {
            notice: None,
            navigate: Some(route.into()),
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn with_navigate(mut self, route: impl Into<String>) -> Self {
        self.navigate = Some(route.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notice.is_none() && self.navigate.is_none()
    }
}

pub(crate) const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";
pub(crate) const RATE_LIMITED: &str = "Too many requests. Please wait a few seconds and try again.";
pub(crate) const UNREACHABLE: &str = "Could not reach the server. Check your internet connection.";

/// Maps a failed call made from `route` to effects.
///
/// `fallback` is shown when the error carries no usable message.
pub(crate) fn failure<T: Transport>(api: &ApiClient<T>, route: &str, error: &Error, fallback: &str) -> Effects {
    tracing::warn!(route, error = %error, "Page action failed");
    match error {
        Error::SessionExpired(_) => {
            let effects = Effects::notice(Notice::warning(SESSION_EXPIRED));
            match api.session().expiry_policy().redirect_for(route) {
                Some(target) => effects.with_navigate(target),
                None => effects,
            }
        }
        Error::Api { status: 429, .. } => Effects::notice(Notice::warning(RATE_LIMITED)),
        Error::Api { message, .. } if !message.is_empty() => Effects::notice(Notice::error(message.clone())),
        Error::Validation(e) => Effects::notice(Notice::warning(e.to_string())),
        Error::Network(_) => Effects::notice(Notice::error(UNREACHABLE)),
        _ => Effects::notice(Notice::error(fallback)),
    }
}

/// Landing route of the session's expiry policy.
pub(crate) fn landing<T: Transport>(api: &ApiClient<T>) -> String {
    api.session().expiry_policy().landing_route().to_owned()
}

/// Width of the pagination window.
pub const MAX_VISIBLE_PAGES: u32 = 5;

/// Up to [`MAX_VISIBLE_PAGES`] page numbers around `current`, shifted left
/// near the last page.
pub(crate) fn page_window(current: u32, total: u32) -> Vec<u32> {
    let mut start = current.saturating_sub(MAX_VISIBLE_PAGES / 2).max(1);
    let end = total.min(start + MAX_VISIBLE_PAGES - 1);
    if end + 1 < start + MAX_VISIBLE_PAGES {
        start = end.saturating_sub(MAX_VISIBLE_PAGES - 1).max(1);
    }
    (start..=end).collect()
}

/// First value of `key` in the query part of `target`.
pub(crate) fn query_param(target: &str, key: &str) -> Option<String> {
    let (_, query) = target.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::error::{RefreshError, ValidationError};
    use crate::session::ApiResponse;

    #[test]
    fn expired_session_follows_policy() {
        let (api, _) = client(|_| ApiResponse::new(200, ""));
        let expired = Error::SessionExpired(RefreshError::MissingRefreshToken);

        let away = failure(&api, "/profile", &expired, "x");
        assert_eq!(away.navigate.as_deref(), Some("/"));
        assert_eq!(away.notice.unwrap().level, NoticeLevel::Warning);

        let home = failure(&api, "/?tab=new", &expired, "x");
        assert_eq!(home.navigate, None);
    }

    #[test]
    fn error_messages_by_kind() {
        let (api, _) = client(|_| ApiResponse::new(200, ""));

        let limited = failure(&api, "/", &Error::Api { status: 429, message: "slow down".into() }, "x");
        assert_eq!(limited.notice.unwrap().text, RATE_LIMITED);

        let server = failure(&api, "/", &Error::Api { status: 400, message: "invalid code".into() }, "x");
        assert_eq!(server.notice.unwrap(), Notice::error("invalid code"));

        let invalid = failure(&api, "/", &Error::Validation(ValidationError::NoGatewaySelected), "x");
        assert_eq!(invalid.notice.unwrap().level, NoticeLevel::Warning);

        let storage = failure(&api, "/", &Error::Storage("disk full".into()), "Something went wrong.");
        assert_eq!(storage.notice.unwrap().text, "Something went wrong.");
    }

    #[test]
    fn window_shifts_near_the_edges() {
        assert_eq!(page_window(1, 3), vec![1, 2, 3]);
        assert_eq!(page_window(6, 20), vec![4, 5, 6, 7, 8]);
        assert_eq!(page_window(19, 20), vec![16, 17, 18, 19, 20]);
        assert_eq!(page_window(1, 1), vec![1]);
    }

    #[test]
    fn query_param_reads_encoded_values() {
        assert_eq!(
            query_param("/payment/verify/?Authority=A%2001&Status=OK", "Authority").as_deref(),
            Some("A 01")
        );
        assert_eq!(query_param("https://x.example/n/?page=3#top", "page").as_deref(), Some("3"));
        assert_eq!(query_param("/n/", "page"), None);
    }
}
