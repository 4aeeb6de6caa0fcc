//! Typed endpoint groups over a shared [`SessionClient`].
//!
//! Each endpoint performs exactly one call through the session and returns a
//! normalised [`Reply`]. Nothing here retries, caches or composes calls.

mod auth;
mod envelope;
mod notifications;
mod orders;
mod payments;
mod plans;
mod prescriptions;
mod profile;
mod tutorials;

use std::sync::Arc;

use serde::de::DeserializeOwned;

pub use auth::{
    AuthApi, AuthSession, Document, LoginRequest, LoginStatus, MAX_UPLOAD_BYTES, MIN_PASSWORD_LEN,
    PasswordResetConfirm, RegisterRequest, VerificationRequest,
};
pub use envelope::{Reply, decode};
pub use notifications::{Notification, NotificationFeed, NotificationsApi};
pub use orders::{OrderCodes, OrderCreated, OrdersApi, PurchaseSummary};
pub use payments::{PaymentCreated, PaymentVerification, PaymentsApi};
pub use plans::{Plan, PlanCatalog, PlansApi};
pub use prescriptions::{
    AccessLevel, Category, Filters, PrescriptionPage, PrescriptionQuery, PrescriptionSummary,
    PrescriptionsApi,
};
pub use profile::{ProfileApi, ProfileUpdate, QuestionPage, SavedPage, UserQuestion};
pub use tutorials::{Tutorial, TutorialsApi};

use crate::error::Error;
use crate::session::{ApiRequest, SessionClient, Transport};
use crate::storage::CredentialStore;

/// Entry point to the endpoint groups. Cheap to clone.
pub struct ApiClient<T> {
    session: Arc<SessionClient<T>>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

impl<T> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("session", &self.session)
            .finish()
    }
}

impl<T: Transport> ApiClient<T> {
    #[must_use]
    pub fn new(session: SessionClient<T>) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    #[must_use]
    pub fn from_shared(session: Arc<SessionClient<T>>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionClient<T>> {
        &self.session
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        self.session.credentials()
    }

    #[must_use]
    pub fn auth(&self) -> AuthApi<'_, T> {
        AuthApi::new(self)
    }

    #[must_use]
    pub fn prescriptions(&self) -> PrescriptionsApi<'_, T> {
        PrescriptionsApi::new(self)
    }

    #[must_use]
    pub fn profile(&self) -> ProfileApi<'_, T> {
        ProfileApi::new(self)
    }

    #[must_use]
    pub fn plans(&self) -> PlansApi<'_, T> {
        PlansApi::new(self)
    }

    #[must_use]
    pub fn orders(&self) -> OrdersApi<'_, T> {
        OrdersApi::new(self)
    }

    #[must_use]
    pub fn payments(&self) -> PaymentsApi<'_, T> {
        PaymentsApi::new(self)
    }

    #[must_use]
    pub fn notifications(&self) -> NotificationsApi<'_, T> {
        NotificationsApi::new(self)
    }

    #[must_use]
    pub fn tutorials(&self) -> TutorialsApi<'_, T> {
        TutorialsApi::new(self)
    }

    pub(crate) async fn call<D: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Reply<D>, Error> {
        let method = request.method.clone();
        let path = request.path().into_owned();
        let response = self.session.execute(request).await?;
        decode(&response).inspect_err(|e| {
            tracing::debug!(%method, path = %path, error = %e, "API call failed");
        })
    }
}

#[cfg(feature = "reqwest-transport")]
impl ApiClient<crate::session::ReqwestTransport> {
    /// Builds the full stack (store, transport, session) from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the configured storage file is unreadable.
    pub fn from_config(config: &crate::config::ClientConfig) -> Result<Self, Error> {
        let credentials = config.credential_store()?;
        Ok(Self::new(SessionClient::from_config(
            config,
            config.transport(),
            credentials,
        )))
    }
}
