use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ApiClient, Reply};
use crate::error::Error;
use crate::session::{ApiRequest, Transport};

/// A tutorial video hosted on Aparat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutorial {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub aparat_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct TutorialsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> TutorialsApi<'a, T> {
    pub(super) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Every tutorial video. Public; no session needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn list(&self) -> Result<Reply<Vec<Tutorial>>, Error> {
        self.client
            .call(ApiRequest::get("/api/v1/home/tutorials/"))
            .await
    }
}
