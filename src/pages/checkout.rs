use super::{Effects, Notice, failure, landing};
use crate::api::{ApiClient, OrderCodes, PurchaseSummary};
use crate::error::{Error, ValidationError};
use crate::session::Transport;
use crate::storage::CredentialStore;
use crate::types::{AuthStatus, PaymentGateway, PendingOrder, PlanId};

/// Route of the payment gateway selection page.
pub const PAYMENT_REQUEST_ROUTE: &str = "/payment/request/";

const PLANS_ROUTE: &str = "/plan/";

// ── Purchase access ────────────────────────────────────────────────

enum Blocked {
    Anonymous,
    Unverified(Option<AuthStatus>),
}

/// Purchases need a logged-in user whose identity has been approved.
fn purchase_block(credentials: &CredentialStore) -> Option<Blocked> {
    if !credentials.is_logged_in() {
        return Some(Blocked::Anonymous);
    }
    let profile = credentials.user_profile();
    match profile.as_ref().filter(|p| p.is_approved()) {
        Some(_) => None,
        None => Some(Blocked::Unverified(profile.and_then(|p| p.auth_status))),
    }
}

fn unverified_notice(status: Option<AuthStatus>) -> Notice {
    Notice::error(match status {
        Some(AuthStatus::Pending) => "Your identity verification is under review. Please wait.",
        Some(AuthStatus::Rejected) => "Your identity verification was rejected. Please submit it again.",
        _ => "Please complete identity verification before buying a subscription.",
    })
}

// ── Checkout ───────────────────────────────────────────────────────

/// Price summary, promotion codes and order creation for one plan.
pub struct CheckoutPage<T> {
    api: ApiClient<T>,
    route: String,
    plan_id: Option<PlanId>,
    summary: Option<PurchaseSummary>,
    codes: OrderCodes,
}

impl<T: Transport> CheckoutPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            route: "/checkout/".to_owned(),
            plan_id: None,
            summary: None,
            codes: OrderCodes::default(),
        }
    }

    /// Plan id from the last path segment of `route`.
    #[must_use]
    pub fn plan_id_from_route(route: &str) -> Option<PlanId> {
        route
            .split(['?', '#'])
            .next()?
            .split('/')
            .filter(|s| !s.is_empty())
            .next_back()?
            .parse()
            .ok()
    }

    /// Checks access, reads the plan from `route` and loads its price.
    pub async fn open(&mut self, route: &str) -> Effects {
        self.route = route.to_owned();
        match purchase_block(self.api.credentials()) {
            Some(Blocked::Anonymous) => {
                return Effects::navigate(landing(&self.api))
                    .with_notice(Notice::warning("Please log in to buy a subscription."));
            }
            Some(Blocked::Unverified(status)) => {
                return Effects::navigate("/authentication").with_notice(unverified_notice(status));
            }
            None => {}
        }

        let Some(plan_id) = Self::plan_id_from_route(route) else {
            return Effects::navigate(PLANS_ROUTE).with_notice(Notice::error("Plan not found."));
        };
        self.plan_id = Some(plan_id);

        match self.api.orders().purchase_summary(plan_id).await {
            Ok(reply) => {
                self.summary = Some(reply.data);
                Effects::none()
            }
            Err(e @ Error::SessionExpired(_)) => failure(&self.api, route, &e, ""),
            Err(e) => {
                tracing::warn!(plan_id = %plan_id, error = %e, "Could not load purchase summary");
                Effects::navigate(PLANS_ROUTE).with_notice(Notice::error("Could not load plan details."))
            }
        }
    }

    pub fn set_codes(&mut self, discount_code: &str, referral_code: &str) {
        self.codes = OrderCodes::new(discount_code, referral_code);
    }

    /// Re-prices the plan with the entered codes. At least one is needed.
    pub async fn apply_codes(&mut self) -> Effects {
        if self.codes.is_empty() {
            return Effects::notice(Notice::warning(ValidationError::NoPromotionCode.to_string()));
        }
        let Some(plan_id) = self.plan_id else {
            return Effects::navigate(PLANS_ROUTE).with_notice(Notice::error("Plan not found."));
        };
        match self.api.orders().apply_codes(plan_id, &self.codes).await {
            Ok(reply) => {
                self.summary = Some(reply.data);
                Effects::notice(Notice::success(
                    reply.message.unwrap_or_else(|| "Code applied.".to_owned()),
                ))
            }
            Err(e) => failure(&self.api, &self.route, &e, "The code is not valid."),
        }
    }

    /// Creates the order, keeps it as the pending order and moves on to
    /// gateway selection.
    pub async fn proceed_to_payment(&mut self) -> Effects {
        let Some(plan_id) = self.plan_id else {
            return Effects::navigate(PLANS_ROUTE).with_notice(Notice::error("Plan not found."));
        };
        let created = match self.api.orders().create_order(plan_id, &self.codes).await {
            Ok(reply) => reply.data,
            Err(e) => return failure(&self.api, &self.route, &e, "Could not create the order."),
        };

        let summary = self.summary.as_ref();
        let order = PendingOrder {
            plan_id,
            plan_name: summary.and_then(PurchaseSummary::plan_name).map(str::to_owned),
            formatted_price: summary
                .and_then(PurchaseSummary::formatted_final_price)
                .map(str::to_owned),
            discount_code: self.codes.discount_code.clone(),
            referral_code: self.codes.referral_code.clone(),
            has_discount: summary.is_some_and(PurchaseSummary::is_discounted),
            discount_amount: summary
                .and_then(PurchaseSummary::formatted_savings)
                .map(str::to_owned),
            order_id: created.id,
        };
        if let Err(e) = self.api.credentials().save_pending_order(&order) {
            return failure(&self.api, &self.route, &e, "Could not prepare the order. Please try again.");
        }
        tracing::info!(plan_id = %plan_id, order_id = ?order.order_id, "Order created");
        Effects::navigate(PAYMENT_REQUEST_ROUTE)
    }

    #[must_use]
    pub fn summary(&self) -> Option<&PurchaseSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn plan_id(&self) -> Option<PlanId> {
        self.plan_id
    }
}

// ── Gateway selection ──────────────────────────────────────────────

/// Chooses a gateway for the pending order and hands the user over to it.
pub struct PaymentGatewayPage<T> {
    api: ApiClient<T>,
    order: Option<PendingOrder>,
    selected: Option<PaymentGateway>,
}

impl<T: Transport> PaymentGatewayPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            order: None,
            selected: None,
        }
    }

    pub fn open(&mut self) -> Effects {
        let credentials = self.api.credentials();
        match purchase_block(credentials) {
            Some(Blocked::Anonymous) => {
                return Effects::navigate("/login")
                    .with_notice(Notice::warning("Please log in to continue your purchase."));
            }
            Some(Blocked::Unverified(status)) => {
                return Effects::navigate("/profile").with_notice(unverified_notice(status));
            }
            None => {}
        }

        self.order = credentials.pending_order();
        if self.order.is_none() {
            return Effects::navigate(PLANS_ROUTE)
                .with_notice(Notice::warning("Order details not found. Please try again."));
        }
        Effects::none()
    }

    pub fn select_gateway(&mut self, gateway: PaymentGateway) {
        self.selected = Some(gateway);
    }

    pub async fn proceed(&mut self) -> Effects {
        let Some(gateway) = self.selected else {
            return Effects::notice(Notice::warning(ValidationError::NoGatewaySelected.to_string()));
        };
        let Some(order) = &self.order else {
            return Effects::navigate(PLANS_ROUTE)
                .with_notice(Notice::warning(ValidationError::NoPendingOrder.to_string()));
        };

        let created = match self
            .api
            .payments()
            .create(gateway, order.plan_id, &order.discount_code)
            .await
        {
            Ok(reply) => reply.data,
            Err(e) => return failure(&self.api, PAYMENT_REQUEST_ROUTE, &e, "Payment could not be started."),
        };

        let credentials = self.api.credentials();
        if let Err(e) = credentials.save_payment_gateway(gateway) {
            tracing::warn!(error = %e, "Could not remember payment gateway");
        }
        if let Some(id) = created.payment_id {
            if let Err(e) = credentials.save_payment_id(id) {
                tracing::warn!(error = %e, "Could not remember payment id");
            }
        }
        tracing::info!(%gateway, payment_id = ?created.payment_id, "Redirecting to payment gateway");
        Effects::navigate(created.payment_url)
            .with_notice(Notice::info("Redirecting to the payment gateway..."))
    }

    #[must_use]
    pub fn order(&self) -> Option<&PendingOrder> {
        self.order.as_ref()
    }

    #[must_use]
    pub fn selected_gateway(&self) -> Option<PaymentGateway> {
        self.selected
    }
}
