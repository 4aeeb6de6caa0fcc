use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ApiClient, Reply};
use crate::error::Error;
use crate::session::{ApiRequest, Transport};
use crate::types::{PaymentGateway, PaymentId, PlanId};

/// A payment opened at a gateway; the user continues at `payment_url`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentCreated {
    #[serde(default)]
    pub payment_id: Option<PaymentId>,
    pub payment_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PaymentVerification {
    #[serde(default)]
    ref_id: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PaymentVerification {
    /// Gateway reference number; numeric or textual depending on the gateway.
    #[must_use]
    pub fn ref_id(&self) -> Option<String> {
        match self.ref_id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

pub struct PaymentsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> PaymentsApi<'a, T> {
    pub(super) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the gateway refuses the payment.
    pub async fn create(
        &self,
        gateway: PaymentGateway,
        plan_id: PlanId,
        discount_code: &str,
    ) -> Result<Reply<PaymentCreated>, Error> {
        self.client
            .call(
                ApiRequest::post(format!("/api/v1/payment/{gateway}/create/")).with_json(json!({
                    "plan_id": plan_id,
                    "discount_code": discount_code,
                })),
            )
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the payment was not completed.
    pub async fn verify_zarinpal(
        &self,
        authority: &str,
        status: &str,
    ) -> Result<Reply<PaymentVerification>, Error> {
        self.client
            .call(
                ApiRequest::get("/api/v1/payment/zarinpal/verify/")
                    .with_query("Authority", authority)
                    .with_query("Status", status),
            )
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the payment was not completed.
    pub async fn verify_parspal(
        &self,
        order_id: &str,
        status: &str,
    ) -> Result<Reply<PaymentVerification>, Error> {
        self.client
            .call(
                ApiRequest::get("/api/v1/payment/parspal/verify/")
                    .with_query("order_id", order_id)
                    .with_query("status", status),
            )
            .await
    }
}
