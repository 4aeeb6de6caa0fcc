use super::{Effects, Notice, failure, landing};
use crate::api::{ApiClient, Document, MAX_UPLOAD_BYTES, VerificationRequest};
use crate::error::ValidationError;
use crate::session::Transport;

const ROUTE: &str = "/authentication";

/// Identity document upload (medical council or student card).
pub struct IdentityVerificationPage<T> {
    api: ApiClient<T>,
    form: VerificationRequest,
}

impl<T: Transport> IdentityVerificationPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            form: VerificationRequest::default(),
        }
    }

    /// Turns away anonymous and already verified users.
    pub fn open(&self) -> Effects {
        let credentials = self.api.credentials();
        if !credentials.is_logged_in() {
            return Effects::navigate(landing(&self.api))
                .with_notice(Notice::warning("Please log in before verifying your identity."));
        }
        let verified = credentials.user_profile().is_some_and(|p| {
            p.is_approved()
                || p.extra
                    .get("is_authenticated")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false)
        });
        if verified {
            return Effects::navigate(landing(&self.api))
                .with_notice(Notice::success("Your account is already verified."));
        }
        Effects::none()
    }

    pub fn set_fields(&mut self, medical_code: &str, auth_link: &str, referral_code: &str) {
        self.form.medical_code = medical_code.to_owned();
        self.form.auth_link = auth_link.to_owned();
        self.form.referral_code = referral_code.to_owned();
    }

    /// Adds the acceptable files; unsupported types are dropped with a notice.
    pub fn add_documents(&mut self, documents: impl IntoIterator<Item = Document>) -> Effects {
        let mut rejected = None;
        for document in documents {
            if document.is_accepted_type() {
                self.form.documents.push(document);
            } else {
                rejected = Some(ValidationError::UnsupportedFileType {
                    file_name: document.file_name,
                    content_type: document.content_type,
                });
            }
        }
        if let Some(e) = rejected {
            return Effects::notice(Notice::error(format!("{e}. Only JPG, PNG and PDF files are accepted.")));
        }
        if self.total_size() > MAX_UPLOAD_BYTES {
            return Effects::notice(Notice::warning("Files must not exceed 5 MB in total."));
        }
        Effects::none()
    }

    pub fn remove_document(&mut self, index: usize) -> Option<Document> {
        (index < self.form.documents.len()).then(|| self.form.documents.remove(index))
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.form.documents
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.form.total_size()
    }

    pub async fn submit(&mut self) -> Effects {
        if let Err(e) = self.form.validate() {
            return Effects::notice(Notice::error(e.to_string()));
        }
        match self.api.auth().submit_verification(self.form.clone()).await {
            Ok(_) => {
                self.form = VerificationRequest::default();
                Effects::navigate(landing(&self.api)).with_notice(Notice::success(
                    "Your verification request was submitted. The result will be emailed to you.",
                ))
            }
            Err(e) => failure(&self.api, ROUTE, &e, "Could not submit the request. Please try again."),
        }
    }
}
