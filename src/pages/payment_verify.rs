use serde_json::{Map, Value};

use super::{Effects, Notice, failure, query_param};
use crate::api::{ApiClient, PaymentVerification, Reply};
use crate::error::{Error, ValidationError};
use crate::session::{Transport, login_redirect};
use crate::types::PaymentGateway;

/// Query parameters a gateway appends when it sends the user back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentCallback {
    pub gateway: Option<String>,
    pub authority: Option<String>,
    pub order_id: Option<String>,
    pub status: Option<String>,
}

impl PaymentCallback {
    /// Reads the callback from a route such as
    /// `/payment/verify/?Authority=A00&Status=OK`. Zarinpal capitalises its
    /// parameter names; both spellings are accepted.
    #[must_use]
    pub fn from_route(route: &str) -> Self {
        let param = |key: &str| query_param(route, key).filter(|v| !v.is_empty());
        Self {
            gateway: param("gateway"),
            authority: param("Authority").or_else(|| param("authority")),
            order_id: param("order_id"),
            status: param("Status").or_else(|| param("status")),
        }
    }

    /// Which gateway sent the user back, if the callback says.
    #[must_use]
    pub fn gateway(&self) -> Option<PaymentGateway> {
        let named = self.gateway.as_deref().and_then(|g| g.parse().ok());
        if self.authority.is_some() || named == Some(PaymentGateway::Zarinpal) {
            Some(PaymentGateway::Zarinpal)
        } else if self.order_id.is_some() || named == Some(PaymentGateway::Parspal) {
            Some(PaymentGateway::Parspal)
        } else {
            None
        }
    }

    /// Zarinpal reports a cancelled payment as `NOK`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("NOK")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified { ref_id: Option<String> },
    Failed(String),
}

/// Landing page of the gateway callback.
pub struct PaymentVerifyPage<T> {
    api: ApiClient<T>,
    outcome: Option<VerifyOutcome>,
}

impl<T: Transport> PaymentVerifyPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self { api, outcome: None }
    }

    /// Verifies the payment described by `route` (path and query).
    ///
    /// Anonymous users are sent to log in and come back here. Otherwise the
    /// pending order and chosen gateway are dropped whatever the result.
    pub async fn verify(&mut self, route: &str) -> Effects {
        let credentials = self.api.credentials();
        if credentials.access_token().is_none() {
            tracing::debug!("Payment callback without a session; asking for login");
            return Effects::navigate(login_redirect(route));
        }

        let callback = PaymentCallback::from_route(route);
        let result = self.check(&callback).await;
        credentials.clear_checkout();

        match result {
            Ok(reply) => {
                let ref_id = reply.data.ref_id();
                tracing::info!(ref_id = ?ref_id, "Payment verified");
                self.sync_user_profile().await;
                let text = match &ref_id {
                    Some(id) => format!("Payment completed. Reference number: {id}"),
                    None => "Payment completed.".to_owned(),
                };
                self.outcome = Some(VerifyOutcome::Verified { ref_id });
                Effects::notice(Notice::success(text))
            }
            Err(e) => {
                let effects = failure(&self.api, route, &e, "Could not check the payment status.");
                let reason = effects
                    .notice
                    .as_ref()
                    .map_or_else(|| e.to_string(), |n| n.text.clone());
                self.outcome = Some(VerifyOutcome::Failed(reason));
                effects
            }
        }
    }

    async fn check(&self, callback: &PaymentCallback) -> Result<Reply<PaymentVerification>, Error> {
        let status = callback.status.as_deref().unwrap_or_default();
        match callback.gateway() {
            Some(PaymentGateway::Zarinpal) => {
                if callback.is_cancelled() {
                    return Err(Error::Api {
                        status: 400,
                        message: "Payment was cancelled by the user.".to_owned(),
                    });
                }
                let authority = callback
                    .authority
                    .as_deref()
                    .ok_or(ValidationError::MissingPaymentParams)?;
                self.api.payments().verify_zarinpal(authority, status).await
            }
            Some(PaymentGateway::Parspal) => {
                let order_id = callback
                    .order_id
                    .as_deref()
                    .ok_or(ValidationError::MissingPaymentParams)?;
                self.api.payments().verify_parspal(order_id, status).await
            }
            None => Err(ValidationError::MissingPaymentParams.into()),
        }
    }

    /// Copies the new role and subscription into the cached snapshots so
    /// premium features unlock without a fresh login. Best effort.
    async fn sync_user_profile(&self) {
        let profile = match self.api.profile().get().await {
            Ok(reply) => reply.data,
            Err(e) => {
                tracing::warn!(error = %e, "Could not refresh profile after payment");
                return;
            }
        };

        let mut fields = Map::new();
        if let Some(role) = profile.role {
            fields.insert("role".into(), serde_json::to_value(role).unwrap_or(Value::Null));
        }
        for (key, value) in [
            ("subscription_status", &profile.subscription_status),
            ("subscription_end_date", &profile.subscription_end_date),
        ] {
            if let Some(value) = value {
                fields.insert(key.into(), Value::String(value.clone()));
            }
        }

        let credentials = self.api.credentials();
        let saved = credentials
            .merge_user_data(fields)
            .and_then(|()| credentials.save_user_profile(&profile));
        if let Err(e) = saved {
            tracing::warn!(error = %e, "Could not store refreshed profile");
        }
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&VerifyOutcome> {
        self.outcome.as_ref()
    }
}
