use std::time::Duration;

/// Boxed source error carried by [`Error::Network`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The request never reached the server or the response never came back.
    #[error("network error: {0}")]
    Network(#[source] BoxError),

    /// The server answered with a failure.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The access token expired and could not be renewed.
    #[error("session expired: {0}")]
    SessionExpired(#[source] RefreshError),

    /// A client-side form check failed before any request was made.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("malformed token: {0}")]
    Token(String),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status of an [`Error::Api`], if this is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    pub(crate) fn network(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Network(message.into())
    }
}

#[cfg(feature = "reqwest-transport")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

/// Why a token refresh failed.
///
/// One refresh outcome is handed to every request queued behind it, so this
/// type is cheap to clone and comparable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("malformed refresh response: {0}")]
    MalformedResponse(String),

    #[error("refresh timed out after {0:?}")]
    TimedOut(Duration),

    #[error("could not persist refreshed tokens: {0}")]
    Storage(String),

    /// The task running the refresh was dropped before it settled.
    #[error("refresh abandoned before completion")]
    Abandoned,
}

/// Client-side form validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("unsupported file type for {file_name}: {content_type}")]
    UnsupportedFileType {
        file_name: String,
        content_type: String,
    },

    #[error("at least one document is required")]
    NoDocuments,

    #[error("total upload size {total} bytes exceeds {limit} bytes")]
    UploadTooLarge { total: u64, limit: u64 },

    #[error("enter a discount code or a referral code")]
    NoPromotionCode,

    #[error("select a payment gateway")]
    NoGatewaySelected,

    #[error("no pending order to pay for")]
    NoPendingOrder,

    #[error("payment details are missing from the callback")]
    MissingPaymentParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_for_api_errors() {
        let api = Error::Api {
            status: 404,
            message: "not found".into(),
        };
        assert_eq!(api.status(), Some(404));
        assert_eq!(Error::Storage("disk".into()).status(), None);
    }

    #[test]
    fn session_expired_wraps_refresh_reason() {
        let err = Error::SessionExpired(RefreshError::MissingRefreshToken);
        assert!(err.is_session_expired());
        assert_eq!(
            err.to_string(),
            "session expired: no refresh token available"
        );
    }
}
