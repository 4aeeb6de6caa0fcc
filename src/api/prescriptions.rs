use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{ApiClient, Reply};
use crate::error::Error;
use crate::session::{ApiRequest, Transport};
use crate::types::PrescriptionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    #[default]
    Free,
    Premium,
    #[serde(other)]
    Unknown,
}

/// Filter category offered alongside the first page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub color_code: Option<String>,
}

/// One row of the prescription list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionSummary {
    pub id: PrescriptionId,
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub primary_name: Option<String>,
    #[serde(default)]
    pub access_level: AccessLevel,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PrescriptionSummary {
    #[must_use]
    pub fn is_premium(&self) -> bool {
        self.access_level == AccessLevel::Premium
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// One page of the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrescriptionPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<PrescriptionSummary>,
    #[serde(default)]
    pub filters: Option<Filters>,
}

/// Query for the list endpoint. Page 1 and empty fields are left off the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrescriptionQuery {
    pub page: u32,
    pub search: String,
    pub categories: Vec<u64>,
    pub page_size: Option<u32>,
}

impl PrescriptionQuery {
    #[must_use]
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = u64>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        if self.page > 1 {
            request = request.with_query("page", self.page);
        }
        let search = self.search.trim();
        if !search.is_empty() {
            request = request.with_query("search", search);
        }
        for category in &self.categories {
            request = request.with_query("category", category);
        }
        if let Some(size) = self.page_size {
            request = request.with_query("page_size", size);
        }
        request
    }
}

/// Prescription catalogue, bookmarks and questions.
pub struct PrescriptionsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> PrescriptionsApi<'a, T> {
    pub(super) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] (429 when rate limited) or a transport error.
    pub async fn list(&self, query: &PrescriptionQuery) -> Result<Reply<PrescriptionPage>, Error> {
        self.client
            .call(query.apply(ApiRequest::get("/api/v1/prescriptions/")))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] with status 404 for an unknown slug.
    pub async fn detail(&self, slug: &str) -> Result<Reply<Value>, Error> {
        self.client
            .call(ApiRequest::get(format!("/api/v1/prescriptions/{}/", encode(slug))))
            .await
    }

    /// Long-form description of a prescription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with status 404 for an unknown slug.
    pub async fn description(&self, slug: &str) -> Result<Reply<Value>, Error> {
        self.client
            .call(ApiRequest::get(format!(
                "/api/v1/prescriptions/{}/description/",
                encode(slug)
            )))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn recent(&self) -> Result<Reply<Value>, Error> {
        self.client
            .call(ApiRequest::get("/api/v1/home/prescriptions/recent/"))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn add_bookmark(&self, id: PrescriptionId) -> Result<Reply<Value>, Error> {
        self.client
            .call(ApiRequest::post("/api/v1/users/bookmarks/").with_json(json!({ "prescription_id": id })))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn remove_bookmark(&self, id: PrescriptionId) -> Result<Reply<Value>, Error> {
        self.client
            .call(ApiRequest::delete(format!("/api/v1/users/bookmarks/{id}/")))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] (403 for non-premium accounts) or a transport error.
    pub async fn ask_question(&self, slug: &str, question: &str) -> Result<Reply<Value>, Error> {
        self.client
            .call(
                ApiRequest::post(format!("/api/v1/prescriptions/{}/questions/", encode(slug)))
                    .with_json(json!({ "question": question.trim() })),
            )
            .await
    }
}

fn encode(segment: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::session::{ApiResponse, RequestBody};

    #[tokio::test]
    async fn list_builds_query_and_parses_page() {
        let (client, transport) = client(|_| {
            ApiResponse::json_body(
                200,
                &json!({
                    "count": 23, "next": "http://x/api/v1/prescriptions/?page=3", "previous": null,
                    "results": [
                        {"id": 1, "slug": "flu", "title": "Flu", "access_level": "FREE"},
                        {"id": 2, "slug": "acne", "access_level": "PREMIUM", "category": {"id": 4}}
                    ],
                    "filters": {"categories": [{"id": 4, "title": "Skin"}]}
                }),
            )
        });

        let query = PrescriptionQuery::page(2).with_search(" cold ").with_categories([4, 7]);
        let page = client.prescriptions().list(&query).await.unwrap().data;

        assert_eq!(page.count, 23);
        assert!(page.results[1].is_premium());
        assert_eq!(page.results[1].extra["category"]["id"], 4);
        assert_eq!(page.filters.unwrap().categories[0].title, "Skin");

        let sent = &transport.requests()[0];
        let query: Vec<(&str, &str)> = sent.query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            query,
            [("page", "2"), ("search", "cold"), ("category", "4"), ("category", "7")]
        );
    }

    #[tokio::test]
    async fn first_page_has_no_query() {
        let (client, transport) = client(|_| ApiResponse::json_body(200, &json!({"count": 0, "results": []})));
        client.prescriptions().list(&PrescriptionQuery::default()).await.unwrap();
        assert!(transport.requests()[0].query.is_empty());
    }

    #[tokio::test]
    async fn bookmark_paths_and_bodies() {
        let (client, transport) = client(|_| ApiResponse::json_body(201, &json!({"success": true})));
        client.prescriptions().add_bookmark(PrescriptionId(12)).await.unwrap();
        client.prescriptions().remove_bookmark(PrescriptionId(12)).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].body, RequestBody::Json(json!({"prescription_id": 12})));
        assert_eq!(sent[1].method, http::Method::DELETE);
        assert_eq!(sent[1].path(), "/api/v1/users/bookmarks/12/");
    }

    #[tokio::test]
    async fn slug_is_path_encoded() {
        let (client, transport) = client(|_| ApiResponse::json_body(200, &json!({})));
        client.prescriptions().detail("a b/c").await.unwrap();
        assert_eq!(transport.requests()[0].path(), "/api/v1/prescriptions/a%20b%2Fc/");
    }
}
