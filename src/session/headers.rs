use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};

use crate::storage::CredentialStore;

/// Builds the headers for an outgoing call.
///
/// Always carries a JSON content type. With `include_auth` and a stored access
/// token, also carries `Authorization: Bearer <token>`; without a token the
/// header is simply left out.
#[must_use]
pub fn build_headers(credentials: &CredentialStore, include_auth: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if include_auth {
        if let Some(value) = credentials.access_token().and_then(|t| bearer(&t)) {
            headers.insert(AUTHORIZATION, value);
        }
    }
    headers
}

/// `Bearer <token>` marked sensitive so it never shows up in debug output.
///
/// `None` if the token contains bytes that cannot appear in a header.
pub(crate) fn bearer(token: &str) -> Option<HeaderValue> {
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(mut value) => {
            value.set_sensitive(true);
            Some(value)
        }
        Err(_) => {
            tracing::warn!("Stored access token is not a valid header value; sending without auth");
            None
        }
    }
}
