use derive_more::{Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Backend user primary key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Subscription plan primary key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct PlanId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct OrderId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct PaymentId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct PrescriptionId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr, From, Into,
)]
#[serde(transparent)]
pub struct NotificationId(pub u64);

/// Server-side session identifier (the access token's `jti`).
///
/// The backend allows one active session per user; comparing this value with
/// the server's `active_jti` detects a login from another device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SessionId(pub String);

/// Identity verification state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Regular,
    Premium,
    Doctor,
    #[serde(other)]
    Unknown,
}

/// Cached copy of the backend user record.
///
/// Possibly stale; the backend stays the source of truth. Unknown fields are
/// kept in `extra` so the snapshot round-trips whatever the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    #[serde(default, alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Cached copy of the backend profile record. Same staleness contract as
/// [`UserSnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_status: Option<AuthStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_subscription: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProfileSnapshot {
    #[must_use]
    pub fn is_premium(&self) -> bool {
        self.role == Some(Role::Premium)
    }

    /// Premium members and doctors both get premium-only content.
    #[must_use]
    pub fn has_premium_access(&self) -> bool {
        matches!(self.role, Some(Role::Premium | Role::Doctor))
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.auth_status == Some(AuthStatus::Approved)
    }
}

/// Checkout state handed from the checkout page to the payment gateway page.
///
/// Lives only until payment verification finishes, successfully or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub plan_id: PlanId,
    #[serde(default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub formatted_price: Option<String>,
    #[serde(default)]
    pub discount_code: String,
    #[serde(default)]
    pub referral_code: String,
    #[serde(default)]
    pub has_discount: bool,
    #[serde(default)]
    pub discount_amount: Option<String>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

/// Supported payment gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentGateway {
    Zarinpal,
    Parspal,
}

impl PaymentGateway {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Zarinpal => "zarinpal",
            Self::Parspal => "parspal",
        }
    }
}

impl std::fmt::Display for PaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentGateway {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zarinpal" => Ok(Self::Zarinpal),
            "parspal" => Ok(Self::Parspal),
            other => Err(format!("unknown payment gateway: {other}")),
        }
    }
}
