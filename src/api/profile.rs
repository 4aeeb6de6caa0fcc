use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ApiClient, PrescriptionSummary, Reply};
use crate::error::{Error, ValidationError};
use crate::session::{ApiRequest, Transport};
use crate::types::ProfileSnapshot;

const SAVED_PATH: &str = "/api/v1/accounts/profile/saved/";
const QUESTIONS_PATH: &str = "/api/v1/accounts/profile/questions/";

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ProfileUpdate {
    /// Trimmed copy of the form.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            email: self.email.trim().to_owned(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] for an empty name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.first_name.trim().is_empty() {
            return Err(ValidationError::Required("first name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(ValidationError::Required("last name"));
        }
        Ok(())
    }

    /// Form prefilled from the edit endpoint's payload.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        let field = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        Self {
            first_name: field("first_name"),
            last_name: field("last_name"),
            email: field("email"),
        }
    }
}

/// One page of the user's bookmarked prescriptions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SavedPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<PrescriptionSummary>,
}

/// A question the user asked, with the answer once there is one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserQuestion {
    #[serde(default)]
    pub prescription_title: Option<String>,
    #[serde(default)]
    pub category_title: Option<String>,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub answerer_name: Option<String>,
    #[serde(default)]
    pub answer_text: Option<String>,
    #[serde(default)]
    pub answered_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserQuestion {
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answer_text.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuestionPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<UserQuestion>,
}

pub struct ProfileApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> ProfileApi<'a, T> {
    pub(super) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn get(&self) -> Result<Reply<ProfileSnapshot>, Error> {
        self.client
            .call(ApiRequest::get("/api/v1/accounts/profile/"))
            .await
    }

    /// Full record behind the edit form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn get_for_update(&self) -> Result<Reply<Value>, Error> {
        self.client
            .call(ApiRequest::get("/api/v1/accounts/profile/update/"))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] carrying the first field error on rejection.
    pub async fn update(&self, update: &ProfileUpdate) -> Result<Reply<Value>, Error> {
        self.client
            .call(
                ApiRequest::patch("/api/v1/accounts/profile/update/")
                    .with_json(serde_json::to_value(update.trimmed())?),
            )
            .await
    }

    /// Bookmarked prescriptions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn saved(&self, page: u32) -> Result<Reply<SavedPage>, Error> {
        let mut request = ApiRequest::get(SAVED_PATH);
        if page > 1 {
            request = request.with_query("page", page);
        }
        self.client.call(request).await
    }

    /// The user's questions: the first page, or the one behind a
    /// `next`/`previous` link.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] (403 without an active subscription) or a
    /// transport error.
    pub async fn questions(&self, page_url: Option<&str>) -> Result<Reply<QuestionPage>, Error> {
        self.client
            .call(ApiRequest::get(page_url.unwrap_or(QUESTIONS_PATH)))
            .await
    }
}
