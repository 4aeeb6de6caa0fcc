use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ApiClient, Reply};
use crate::error::Error;
use crate::session::{ApiRequest, Transport};
use crate::types::PlanId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub duration_months: u32,
    /// Set client-side on the longest plan of the catalogue.
    #[serde(default)]
    pub is_recommended: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Subscription plans plus whatever metadata the server attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanCatalog {
    pub plans: Vec<Plan>,
    pub meta: Map<String, Value>,
}

impl PlanCatalog {
    /// Reads `{results: [..]}` or the paginated `{results: {results: [..]}}`.
    fn from_payload(payload: Value) -> Result<Self, Error> {
        let Value::Object(mut fields) = payload else {
            return Ok(Self::default());
        };
        let plans = match fields.remove("results") {
            Some(Value::Object(mut page)) => page.remove("results").unwrap_or(Value::Null),
            Some(list) => list,
            None => Value::Null,
        };
        let plans = match plans {
            Value::Null => Vec::new(),
            list => serde_json::from_value(list)?,
        };
        let meta = match fields.remove("meta") {
            Some(Value::Object(meta)) => meta,
            _ => Map::new(),
        };

        let mut catalog = Self { plans, meta };
        catalog.mark_recommended();
        Ok(catalog)
    }

    /// Flags every plan sharing the longest duration.
    fn mark_recommended(&mut self) {
        let Some(longest) = self.plans.iter().map(|p| p.duration_months).max() else {
            return;
        };
        for plan in &mut self.plans {
            plan.is_recommended = plan.duration_months == longest;
        }
    }

    #[must_use]
    pub fn recommended(&self) -> Option<&Plan> {
        self.plans.iter().find(|p| p.is_recommended)
    }
}

pub struct PlansApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> PlansApi<'a, T> {
    pub(super) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`], [`Error::Decode`] or a transport error.
    pub async fn list(&self) -> Result<Reply<PlanCatalog>, Error> {
        let reply: Reply<Value> = self
            .client
            .call(ApiRequest::get("/api/v1/subscriptions/plan/"))
            .await?;
        let message = reply.message;
        Ok(Reply {
            data: PlanCatalog::from_payload(reply.data)?,
            message,
        })
    }
}
