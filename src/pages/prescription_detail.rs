use serde_json::Value;

use super::{Effects, Notice, failure};
use crate::api::ApiClient;
use crate::error::Error;
use crate::session::{Transport, login_redirect};
use crate::types::PrescriptionId;

/// One drug line of a prescription, flattened from `prescription_drugs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Medication {
    pub code: Option<String>,
    pub name: String,
    pub dosage: Option<String>,
    pub instructions: Option<String>,
    pub quantity: Option<Value>,
    pub is_combination: bool,
    pub order: u64,
}

impl Medication {
    fn from_item(index: usize, item: &Value) -> Self {
        let text = |v: Option<&Value>| v.and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_owned);
        let drug = item.get("drug");
        Self {
            code: text(drug.and_then(|d| d.get("code"))),
            name: text(drug.and_then(|d| d.get("title"))).unwrap_or_else(|| "Unknown".to_owned()),
            dosage: text(item.get("dosage")),
            instructions: text(item.get("instructions")),
            quantity: item.get("amount").filter(|v| !v.is_null()).cloned(),
            is_combination: item
                .get("is_combination")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            order: item
                .get("order")
                .and_then(Value::as_u64)
                .unwrap_or(index as u64 + 1),
        }
    }
}

/// A single prescription: details, description, bookmark and questions.
pub struct PrescriptionDetailPage<T> {
    api: ApiClient<T>,
    slug: String,
    prescription: Option<Value>,
    description: Option<Value>,
    bookmarked: bool,
    premium_user: bool,
    question: String,
    load_error: Option<String>,
}

impl<T: Transport> PrescriptionDetailPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>, slug: impl Into<String>) -> Self {
        let premium_user = api
            .credentials()
            .user_profile()
            .is_some_and(|p| p.has_premium_access());
        Self {
            api,
            slug: slug.into(),
            prescription: None,
            description: None,
            bookmarked: false,
            premium_user,
            question: String::new(),
            load_error: None,
        }
    }

    fn route(&self) -> String {
        format!("/prescriptions/{}", self.slug)
    }

    pub async fn load(&mut self) -> Effects {
        match self.api.prescriptions().detail(&self.slug).await {
            Ok(reply) => {
                self.bookmarked = reply
                    .data
                    .get("is_bookmarked")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                self.prescription = Some(reply.data);
                self.load_error = None;
                Effects::none()
            }
            Err(e) => {
                let message = load_error_message(&e);
                self.load_error = Some(message.to_owned());
                if e.is_session_expired() {
                    return failure(&self.api, &self.route(), &e, message);
                }
                tracing::warn!(slug = %self.slug, error = %e, "Prescription load failed");
                Effects::none()
            }
        }
    }

    pub async fn load_description(&mut self) -> Effects {
        match self.api.prescriptions().description(&self.slug).await {
            Ok(reply) => {
                self.description = Some(reply.data);
                Effects::none()
            }
            Err(e) => failure(&self.api, &self.route(), &e, "Could not load the description."),
        }
    }

    /// Flips the bookmark at once and reverts it if the server refuses.
    pub async fn toggle_bookmark(&mut self) -> Effects {
        if self.api.credentials().user_profile().is_none() {
            return Effects::navigate(login_redirect(&self.route()))
                .with_notice(Notice::warning("Log in to save prescriptions."));
        }
        let Some(id) = self.prescription_id() else {
            return Effects::none();
        };

        self.bookmarked = !self.bookmarked;
        let result = if self.bookmarked {
            self.api.prescriptions().add_bookmark(id).await
        } else {
            self.api.prescriptions().remove_bookmark(id).await
        };

        match result {
            Ok(_) if self.bookmarked => Effects::notice(Notice::success("Prescription saved.")),
            Ok(_) => Effects::notice(Notice::success("Removed from saved prescriptions.")),
            Err(e) => {
                self.bookmarked = !self.bookmarked;
                failure(&self.api, &self.route(), &e, "Could not update bookmarks. Please try again.")
            }
        }
    }

    pub fn set_question(&mut self, text: impl Into<String>) {
        self.question = text.into();
    }

    /// Questions are a premium feature; the draft is kept on failure.
    pub async fn submit_question(&mut self) -> Effects {
        let question = self.question.trim().to_owned();
        if question.is_empty() {
            return Effects::notice(Notice::warning("Please enter your question."));
        }
        if !self.premium_user {
            return Effects::notice(Notice::warning(
                "Asking questions is available to premium members only.",
            ));
        }
        if self.api.credentials().access_token().is_none() {
            return Effects::navigate(login_redirect(&self.route()))
                .with_notice(Notice::warning("Please log in to your account."));
        }

        match self.api.prescriptions().ask_question(&self.slug, &question).await {
            Ok(_) => {
                self.question.clear();
                Effects::notice(Notice::success(
                    "Your question was submitted. The answer will appear in your profile.",
                ))
            }
            Err(e) => failure(&self.api, &self.route(), &e, "Could not submit the question."),
        }
    }

    #[must_use]
    pub fn prescription(&self) -> Option<&Value> {
        self.prescription.as_ref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&Value> {
        self.description.as_ref()
    }

    #[must_use]
    pub fn prescription_id(&self) -> Option<PrescriptionId> {
        self.prescription
            .as_ref()?
            .get("id")
            .and_then(Value::as_u64)
            .map(PrescriptionId)
    }

    #[must_use]
    pub fn medications(&self) -> Vec<Medication> {
        self.prescription
            .as_ref()
            .and_then(|p| p.get("prescription_drugs"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Medication::from_item(i, item))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_bookmarked(&self) -> bool {
        self.bookmarked
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Message for the error placeholder after a failed [`load`](Self::load).
    #[must_use]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }
}

fn load_error_message(error: &Error) -> &'static str {
    match error {
        Error::Api { status: 404, .. } => "Prescription not found.",
        Error::Api { status: 403, .. } => "You do not have access to this prescription.",
        Error::Api { status: 401, .. } | Error::SessionExpired(_) => "Please log in to your account.",
        Error::Api { status: 500..=599, .. } => "Server error. Please try again later.",
        Error::Network(_) => "Could not reach the server. Check your internet connection.",
        _ => "Could not load the prescription.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::session::{ApiRequest, ApiResponse};
    use crate::types::ProfileSnapshot;
    use http::Method;
    use serde_json::json;

    fn detail() -> Value {
        json!({
            "id": 12, "slug": "hypertension", "title": "Hypertension", "is_bookmarked": false,
            "prescription_drugs": [
                {"drug": {"code": "D1", "title": "Amlodipine"}, "dosage": "5mg", "amount": 30},
                {"drug": {"title": "Losartan"}, "instructions": "daily", "is_combination": true, "order": 7}
            ]
        })
    }

    fn premium(api: &ApiClient<crate::testing::FakeTransport>) {
        let profile: ProfileSnapshot = serde_json::from_value(json!({"role": "premium"})).unwrap();
        api.credentials().save_user_profile(&profile).unwrap();
    }

    #[tokio::test]
    async fn load_maps_medications() {
        let (api, _) = client(|_| ApiResponse::json_body(200, &detail()));
        let mut page = PrescriptionDetailPage::new(api, "hypertension");
        assert!(page.load().await.is_empty());

        assert_eq!(page.prescription_id(), Some(PrescriptionId(12)));
        let meds = page.medications();
        assert_eq!(meds[0].code.as_deref(), Some("D1"));
        assert_eq!(meds[0].order, 1);
        assert_eq!(meds[1].code, None);
        assert!(meds[1].is_combination);
        assert_eq!(meds[1].order, 7);
    }

    #[tokio::test]
    async fn not_found_sets_placeholder() {
        let (api, _) = client(|_| ApiResponse::json_body(404, &json!({"detail": "Not found."})));
        let mut page = PrescriptionDetailPage::new(api, "missing");
        let _ = page.load().await;
        assert_eq!(page.load_error(), Some("Prescription not found."));
    }

    #[tokio::test]
    async fn bookmark_reverts_when_server_refuses() {
        let (api, _) = client(|request: &ApiRequest| {
            if request.method == Method::POST {
                ApiResponse::json_body(500, &json!({"message": "boom"}))
            } else {
                ApiResponse::json_body(200, &detail())
            }
        });
        premium(&api);
        let mut page = PrescriptionDetailPage::new(api, "hypertension");
        let _ = page.load().await;

        let effects = page.toggle_bookmark().await;
        assert!(!page.is_bookmarked());
        assert_eq!(effects.notice.unwrap().text, "boom");
    }

    #[tokio::test]
    async fn bookmark_toggles_both_ways() {
        let (api, transport) = client(|_| ApiResponse::json_body(200, &detail()));
        premium(&api);
        let mut page = PrescriptionDetailPage::new(api, "hypertension");
        let _ = page.load().await;

        let _ = page.toggle_bookmark().await;
        assert!(page.is_bookmarked());
        let _ = page.toggle_bookmark().await;
        assert!(!page.is_bookmarked());

        let methods: Vec<_> = transport.requests().into_iter().map(|r| r.method).collect();
        assert_eq!(methods, [Method::GET, Method::POST, Method::DELETE]);
    }

    #[tokio::test]
    async fn anonymous_bookmark_goes_to_login() {
        let (api, transport) = client(|_| ApiResponse::json_body(200, &detail()));
        let mut page = PrescriptionDetailPage::new(api, "hypertension");
        let effects = page.toggle_bookmark().await;
        assert_eq!(
            effects.navigate.as_deref(),
            Some("/login?redirect=%2Fprescriptions%2Fhypertension")
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn questions_need_text_and_premium() {
        let (api, transport) = client(|_| ApiResponse::json_body(201, &json!({"success": true})));
        let mut page = PrescriptionDetailPage::new(api.clone(), "hypertension");

        page.set_question("   ");
        assert_eq!(page.submit_question().await.notice.unwrap().text, "Please enter your question.");

        page.set_question("Dose for children?");
        let _ = page.submit_question().await;
        assert!(transport.requests().is_empty());
        assert_eq!(page.question(), "Dose for children?");

        premium(&api);
        let mut page = PrescriptionDetailPage::new(api, "hypertension");
        page.set_question(" Dose for children? ");
        let _ = page.submit_question().await;
        assert!(page.question().is_empty());
        assert_eq!(
            transport.requests()[0].body,
            crate::session::RequestBody::Json(json!({"question": "Dose for children?"}))
        );
    }
}
