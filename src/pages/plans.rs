use serde_json::{Map, Value};

use super::{Effects, failure};
use crate::api::{ApiClient, Plan, PlanCatalog};
use crate::session::Transport;
use crate::types::PlanId;

const ROUTE: &str = "/plan/";

pub struct PlansPage<T> {
    api: ApiClient<T>,
    catalog: PlanCatalog,
}

impl<T: Transport> PlansPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            catalog: PlanCatalog::default(),
        }
    }

    pub async fn load(&mut self) -> Effects {
        match self.api.plans().list().await {
            Ok(reply) => {
                self.catalog = reply.data;
                Effects::none()
            }
            Err(e) => failure(
                &self.api,
                ROUTE,
                &e,
                "Could not load plans. Please refresh the page.",
            ),
        }
    }

    /// Continues to checkout for `plan_id`.
    pub fn select(&self, plan_id: PlanId) -> Effects {
        Effects::navigate(format!("/checkout/{plan_id}/"))
    }

    #[must_use]
    pub fn plans(&self) -> &[Plan] {
        &self.catalog.plans
    }

    #[must_use]
    pub fn recommended(&self) -> Option<&Plan> {
        self.catalog.recommended()
    }

    #[must_use]
    pub fn meta(&self) -> &Map<String, Value> {
        &self.catalog.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::session::ApiResponse;
    use serde_json::json;

    #[tokio::test]
    async fn load_marks_longest_plan() {
        let (api, _) = client(|_| {
            ApiResponse::json_body(
                200,
                &json!({"success": true, "data": {
                    "results": {"results": [
                        {"id": 1, "duration_months": 1},
                        {"id": 6, "duration_months": 6}
                    ]},
                    "meta": {"trial_days": 3}
                }}),
            )
        });
        let mut page = PlansPage::new(api);
        assert!(page.load().await.is_empty());
        assert_eq!(page.recommended().map(|p| p.id), Some(PlanId(6)));
        assert_eq!(page.meta()["trial_days"], 3);
        assert_eq!(page.select(PlanId(6)).navigate.as_deref(), Some("/checkout/6/"));
    }

    #[tokio::test]
    async fn failure_keeps_empty_catalogue() {
        let (api, _) = client(|_| ApiResponse::new(502, "bad gateway"));
        let mut page = PlansPage::new(api);
        let effects = page.load().await;
        assert!(effects.notice.is_some());
        assert!(page.plans().is_empty());
    }
}
