use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiClient, Reply};
use crate::error::{Error, ValidationError};
use crate::phone::{is_valid_phone_number, normalize_phone_number};
use crate::session::{ApiRequest, FormPart, Transport};
use crate::storage::{CredentialStore, TokenSet};
use crate::types::{ProfileSnapshot, UserSnapshot};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Upload limit for identity documents, summed over all files.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

const ACCEPTED_DOCUMENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone_number: String,
    pub password: String,
    pub password2: String,
}

impl RegisterRequest {
    #[must_use]
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: &str,
        password: impl Into<String>,
        password2: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into().trim().to_owned(),
            last_name: last_name.into().trim().to_owned(),
            email: None,
            phone_number: normalize_phone_number(phone_number),
            password: password.into(),
            password2: password2.into(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into().trim().to_owned();
        self.email = (!email.is_empty()).then_some(email);
        self
    }

    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.is_empty() {
            return Err(ValidationError::Required("first name"));
        }
        if self.last_name.is_empty() {
            return Err(ValidationError::Required("last name"));
        }
        if !is_valid_phone_number(&self.phone_number) {
            return Err(ValidationError::InvalidPhoneNumber(self.phone_number.clone()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        if self.password != self.password2 {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn new(phone_number: &str, password: impl Into<String>) -> Self {
        Self {
            phone_number: normalize_phone_number(phone_number),
            password: password.into(),
        }
    }

    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.phone_number.is_empty() {
            return Err(ValidationError::Required("phone number"));
        }
        if !is_valid_phone_number(&self.phone_number) {
            return Err(ValidationError::InvalidPhoneNumber(self.phone_number.clone()));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Required("password"));
        }
        Ok(())
    }
}

/// What login and registration hand back.
///
/// The backend has shipped two shapes: `{tokens, user, profile}` and a flat
/// `{access_token, refresh_token, jti, user_id, full_name, phone_number,
/// profile}`. Both are read here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSession {
    pub tokens: TokenSet,
    pub user: Option<UserSnapshot>,
    pub profile: Option<ProfileSnapshot>,
    pub next_step: Option<String>,
}

impl AuthSession {
    fn from_payload(payload: Value) -> Result<Self, Error> {
        let Value::Object(mut fields) = payload else {
            return Ok(Self::default());
        };

        let tokens: TokenSet = match fields.remove("tokens") {
            Some(tokens @ Value::Object(_)) => serde_json::from_value(tokens)?,
            _ => serde_json::from_value(Value::Object(fields.clone()))?,
        };

        let user = match fields.remove("user") {
            Some(user @ Value::Object(_)) => Some(serde_json::from_value(user)?),
            _ if fields.contains_key("user_id") || fields.contains_key("full_name") => {
                let flat = json!({
                    "user_id": fields.get("user_id"),
                    "full_name": fields.get("full_name"),
                    "phone_number": fields.get("phone_number"),
                });
                Some(serde_json::from_value(strip_nulls(flat))?)
            }
            _ => None,
        };

        let profile = match fields.remove("profile") {
            Some(profile @ Value::Object(_)) => Some(serde_json::from_value(profile)?),
            _ => None,
        };

        let next_step = fields
            .get("next_step")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(Self {
            tokens,
            user,
            profile,
            next_step,
        })
    }

    /// Writes tokens and snapshots to `store`.
    ///
    /// A missing session id is read from the access token's `jti` claim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if a write fails.
    pub fn persist(&self, store: &CredentialStore) -> Result<(), Error> {
        let mut tokens = self.tokens.clone();
        if tokens.session_id.is_none() {
            tokens.session_id = tokens.access.as_deref().and_then(session_id_from);
        }
        store.save_tokens(&tokens)?;
        if let Some(user) = &self.user {
            store.save_user_data(user)?;
        }
        if let Some(profile) = &self.profile {
            store.save_user_profile(profile)?;
        }
        Ok(())
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(fields.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}

#[cfg(feature = "token")]
fn session_id_from(access: &str) -> Option<String> {
    crate::token::extract_jti_from_token(access).ok()
}

#[cfg(not(feature = "token"))]
fn session_id_from(_access: &str) -> Option<String> {
    None
}

/// Answer of the login-status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoginStatus {
    #[serde(default)]
    pub user: Option<UserSnapshot>,
    #[serde(default)]
    pub profile: Option<ProfileSnapshot>,
}

impl LoginStatus {
    /// The session the server considers active for this user.
    #[must_use]
    pub fn active_session_id(&self) -> Option<&str> {
        self.user
            .as_ref()?
            .extra
            .get("active_jti")
            .and_then(Value::as_str)
            .filter(|jti| !jti.is_empty())
    }
}

/// One identity document to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Document {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    #[must_use]
    pub fn is_accepted_type(&self) -> bool {
        ACCEPTED_DOCUMENT_TYPES.contains(&self.content_type.as_str())
    }
}

/// Identity verification submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationRequest {
    pub medical_code: String,
    pub auth_link: String,
    pub referral_code: String,
    pub documents: Vec<Document>,
}

impl VerificationRequest {
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.documents.iter().map(|d| d.data.len() as u64).sum()
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::NoDocuments`],
    /// [`ValidationError::UnsupportedFileType`] or
    /// [`ValidationError::UploadTooLarge`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.documents.is_empty() {
            return Err(ValidationError::NoDocuments);
        }
        if let Some(doc) = self.documents.iter().find(|d| !d.is_accepted_type()) {
            return Err(ValidationError::UnsupportedFileType {
                file_name: doc.file_name.clone(),
                content_type: doc.content_type.clone(),
            });
        }
        let total = self.total_size();
        if total > MAX_UPLOAD_BYTES {
            return Err(ValidationError::UploadTooLarge {
                total,
                limit: MAX_UPLOAD_BYTES,
            });
        }
        Ok(())
    }

    fn into_parts(self) -> Vec<FormPart> {
        let mut parts = Vec::with_capacity(self.documents.len() + 3);
        for (name, value) in [
            ("medical_code", self.medical_code),
            ("auth_link", self.auth_link),
            ("referral_code", self.referral_code),
        ] {
            let value = value.trim();
            if !value.is_empty() {
                parts.push(FormPart::text(name, value));
            }
        }
        parts.extend(
            self.documents
                .into_iter()
                .map(|d| FormPart::file("documents", d.file_name, d.content_type, d.data)),
        );
        parts
    }
}

/// Confirmation of a password reset link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetConfirm {
    pub uidb64: String,
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

/// Account endpoints.
pub struct AuthApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> AuthApi<'a, T> {
    pub(super) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the backend refuses the registration.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Reply<AuthSession>, Error> {
        let reply: Reply<Value> = self
            .client
            .call(ApiRequest::post("/api/v1/accounts/register/").with_json(serde_json::to_value(request)?))
            .await?;
        let message = reply.message;
        Ok(Reply {
            data: AuthSession::from_payload(reply.data)?,
            message,
        })
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] for wrong credentials or a locked account.
    pub async fn login(&self, request: &LoginRequest) -> Result<Reply<AuthSession>, Error> {
        let reply: Reply<Value> = self
            .client
            .call(ApiRequest::post("/api/v1/accounts/login/").with_json(serde_json::to_value(request)?))
            .await?;
        let message = reply.message;
        Ok(Reply {
            data: AuthSession::from_payload(reply.data)?,
            message,
        })
    }

    /// Ends the session on the server, then clears local credentials whatever
    /// the outcome.
    ///
    /// # Errors
    ///
    /// Returns the server or network error; credentials are cleared anyway.
    pub async fn logout(&self) -> Result<(), Error> {
        let credentials = self.client.credentials();
        let result = if credentials.is_logged_in() {
            self.client
                .call::<Value>(ApiRequest::post("/api/v1/accounts/logout/"))
                .await
                .map(|_| ())
        } else {
            Ok(())
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Logout call failed; clearing local session anyway");
        }
        credentials.clear_all();
        result
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the server does not consider the user logged in.
    pub async fn login_status(&self) -> Result<Reply<LoginStatus>, Error> {
        self.client
            .call(ApiRequest::get("/api/v1/accounts/login-status/"))
            .await
    }

    /// Uploads identity documents. Validates before sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before any call, or [`Error::Api`].
    pub async fn submit_verification(&self, request: VerificationRequest) -> Result<Reply<Value>, Error> {
        request.validate()?;
        self.client
            .call(ApiRequest::patch("/api/v1/accounts/verify-profile/").with_multipart(request.into_parts()))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the backend refuses the request.
    pub async fn request_password_reset(&self, email: &str) -> Result<Reply<Value>, Error> {
        self.client
            .call(ApiRequest::post("/api/v1/accounts/password/reset/").with_json(json!({ "email": email.trim() })))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the passwords differ, or [`Error::Api`].
    pub async fn confirm_password_reset(&self, request: &PasswordResetConfirm) -> Result<Reply<Value>, Error> {
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            }
            .into());
        }
        if request.password != request.password_confirm {
            return Err(ValidationError::PasswordMismatch.into());
        }
        self.client
            .call(
                ApiRequest::post("/api/v1/accounts/password/reset/confirm/")
                    .with_json(serde_json::to_value(request)?),
            )
            .await
    }
}
