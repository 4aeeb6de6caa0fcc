use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use crate::error::Error;

/// Claims read from a JWT payload **without** signature verification.
///
/// The client never holds the signing key; these claims are only hints
/// (session id, expiry) and must not be used for authorization decisions.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    inner: JsonValue,
}

impl TokenClaims {
    /// Gets a claim value by key.
    #[must_use]
    pub fn get_claim(&self, key: &str) -> Option<&JsonValue> {
        self.inner.get(key)
    }

    /// Gets the inner JSON value.
    #[must_use]
    pub fn as_json(&self) -> &JsonValue {
        &self.inner
    }

    #[must_use]
    pub fn jti(&self) -> Option<&str> {
        self.inner.get("jti").and_then(JsonValue::as_str)
    }

    #[must_use]
    pub fn user_id(&self) -> Option<u64> {
        match self.inner.get("user_id")? {
            JsonValue::Number(n) => n.as_u64(),
            JsonValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Expiry from the `exp` claim.
    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        let exp = self.inner.get("exp")?.as_i64()?;
        OffsetDateTime::from_unix_timestamp(exp).ok()
    }

    /// `true` when `exp` is at or before `now`. Tokens without `exp` never expire here.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

/// Decodes the payload segment of a JWT.
///
/// # Errors
///
/// Returns `Error::Token` if the token does not have three segments or the
/// payload is not base64url-encoded JSON.
pub fn decode_unverified_claims(token_str: &str) -> Result<TokenClaims, Error> {
    let payload = extract_payload_from_token(token_str)?;
    let inner: JsonValue =
        serde_json::from_slice(&payload).map_err(|_| Error::Token("invalid payload".into()))?;
    if !inner.is_object() {
        return Err(Error::Token("payload is not an object".into()));
    }
    Ok(TokenClaims { inner })
}

/// Extract the session id (`jti`) from an access token without verifying it.
///
/// # Errors
///
/// Returns `Error::Token` if the token is malformed or carries no `jti` claim.
pub fn extract_jti_from_token(token_str: &str) -> Result<String, Error> {
    decode_unverified_claims(token_str)?
        .jti()
        .map(str::to_owned)
        .ok_or_else(|| Error::Token("missing claim: jti".into()))
}

/// Extracts the payload bytes from a `header.payload.signature` token.
pub(crate) fn extract_payload_from_token(token_str: &str) -> Result<Vec<u8>, Error> {
    let parts: Vec<&str> = token_str.split('.').collect();
    if parts.len() != 3 || parts[1].is_empty() {
        return Err(Error::Token("invalid token format".into()));
    }

    // Some encoders keep the padding; URL_SAFE_NO_PAD rejects it.
    URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|_| Error::Token("invalid payload encoding".into()))
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &JsonValue) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_simplejwt_claims() {
        let token = encode_test_token(&json!({
            "token_type": "access",
            "exp": 1_900_000_000,
            "jti": "9f1c2b",
            "user_id": 42
        }));

        let claims = decode_unverified_claims(&token).unwrap();
        assert_eq!(claims.jti(), Some("9f1c2b"));
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(
            claims.expires_at().unwrap().unix_timestamp(),
            1_900_000_000
        );
    }

    #[test]
    fn user_id_may_be_a_string() {
        let token = encode_test_token(&json!({"user_id": "17"}));
        assert_eq!(decode_unverified_claims(&token).unwrap().user_id(), Some(17));
    }

    #[test]
    fn expiry_comparison() {
        let token = encode_test_token(&json!({"exp": 1_000}));
        let claims = decode_unverified_claims(&token).unwrap();
        let later = OffsetDateTime::from_unix_timestamp(2_000).unwrap();
        let earlier = OffsetDateTime::from_unix_timestamp(500).unwrap();
        assert!(claims.is_expired_at(later));
        assert!(!claims.is_expired_at(earlier));

        let no_exp = decode_unverified_claims(&encode_test_token(&json!({}))).unwrap();
        assert!(!no_exp.is_expired_at(later));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let token = encode_test_token(&json!({"jti": "a"}));
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        parts[1].push_str("==");
        let padded = parts.join(".");
        assert_eq!(extract_jti_from_token(&padded).unwrap(), "a");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(decode_unverified_claims("not-a-token").is_err());
        assert!(decode_unverified_claims("a..c").is_err());
        assert!(decode_unverified_claims("a.!!!.c").is_err());
        let array_payload = format!("h.{}.s", URL_SAFE_NO_PAD.encode("[1,2]"));
        assert!(decode_unverified_claims(&array_payload).is_err());
    }

    #[test]
    fn missing_jti_is_an_error() {
        let token = encode_test_token(&json!({"user_id": 1}));
        let err = extract_jti_from_token(&token).unwrap_err();
        assert!(err.to_string().contains("jti"));
    }
}
