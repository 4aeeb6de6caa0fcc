use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{ApiClient, Reply};
use crate::error::Error;
use crate::session::{ApiRequest, Transport};
use crate::types::{OrderId, PlanId};

/// Discount and referral codes entered at checkout. Empty means not used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderCodes {
    pub discount_code: String,
    pub referral_code: String,
}

impl OrderCodes {
    #[must_use]
    pub fn new(discount_code: &str, referral_code: &str) -> Self {
        Self {
            discount_code: discount_code.trim().to_owned(),
            referral_code: referral_code.trim().to_owned(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.discount_code.is_empty() && self.referral_code.is_empty()
    }
}

/// Price breakdown for one plan, optionally with codes applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PurchaseSummary {
    #[serde(default)]
    pub plan_info: Map<String, Value>,
    #[serde(default)]
    pub pricing_info: Map<String, Value>,
    #[serde(default)]
    pub discount_info: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PurchaseSummary {
    #[must_use]
    pub fn plan_name(&self) -> Option<&str> {
        self.plan_info.get("name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn formatted_final_price(&self) -> Option<&str> {
        self.pricing_info
            .get("formatted_final_price")
            .and_then(Value::as_str)
    }

    #[must_use]
    pub fn formatted_savings(&self) -> Option<&str> {
        self.pricing_info
            .get("formatted_savings")
            .and_then(Value::as_str)
    }

    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.discount_info
            .get("is_discounted")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrderCreated {
    #[serde(default)]
    pub id: Option<OrderId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub struct OrdersApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> OrdersApi<'a, T> {
    pub(super) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] with status 404 for an unknown plan.
    pub async fn purchase_summary(&self, plan_id: PlanId) -> Result<Reply<PurchaseSummary>, Error> {
        self.client
            .call(ApiRequest::get(format!("/api/v1/order/purchase/{plan_id}/")))
            .await
    }

    /// Re-prices the plan with `codes` applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] for an invalid or expired code.
    pub async fn apply_codes(
        &self,
        plan_id: PlanId,
        codes: &OrderCodes,
    ) -> Result<Reply<PurchaseSummary>, Error> {
        self.client
            .call(
                ApiRequest::post(format!("/api/v1/order/purchase/{plan_id}/"))
                    .with_json(serde_json::to_value(codes)?),
            )
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the order is refused.
    pub async fn create_order(
        &self,
        plan_id: PlanId,
        codes: &OrderCodes,
    ) -> Result<Reply<OrderCreated>, Error> {
        self.client
            .call(ApiRequest::post("/api/v1/order/create/").with_json(json!({
                "plan_id": plan_id,
                "discount_code": codes.discount_code,
                "referral_code": codes.referral_code,
            })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::session::{ApiResponse, RequestBody};

    fn summary_body() -> Value {
        json!({"success": true, "message": "applied", "data": {
            "plan_info": {"name": "Yearly"},
            "pricing_info": {"formatted_final_price": "900,000", "formatted_savings": "100,000"},
            "discount_info": {"is_discounted": true}
        }})
    }

    #[tokio::test]
    async fn apply_codes_parses_summary() {
        let (client, transport) = client(|_| ApiResponse::json_body(200, &summary_body()));
        let reply = client
            .orders()
            .apply_codes(PlanId(2), &OrderCodes::new(" OFF10 ", ""))
            .await
            .unwrap();

        assert_eq!(reply.message.as_deref(), Some("applied"));
        let summary = reply.data;
        assert_eq!(summary.plan_name(), Some("Yearly"));
        assert_eq!(summary.formatted_final_price(), Some("900,000"));
        assert!(summary.is_discounted());

        let sent = &transport.requests()[0];
        assert_eq!(sent.path(), "/api/v1/order/purchase/2/");
        assert_eq!(
            sent.body,
            RequestBody::Json(json!({"discount_code": "OFF10", "referral_code": ""}))
        );
    }

    #[tokio::test]
    async fn create_order_returns_id() {
        let (client, transport) = client(|_| {
            ApiResponse::json_body(201, &json!({"success": true, "data": {"id": 77, "status": "pending"}}))
        });
        let created = client
            .orders()
            .create_order(PlanId(2), &OrderCodes::default())
            .await
            .unwrap()
            .data;
        assert_eq!(created.id, Some(OrderId(77)));
        assert_eq!(
            transport.requests()[0].body,
            RequestBody::Json(json!({"plan_id": 2, "discount_code": "", "referral_code": ""}))
        );
    }

    #[test]
    fn codes_emptiness() {
        assert!(OrderCodes::new("  ", "").is_empty());
        assert!(!OrderCodes::new("", "REF1").is_empty());
    }
}
