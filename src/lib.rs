#![doc = include_str!("../README.md")]

pub mod api;
pub mod config;
pub mod error;
pub mod pages;
pub mod phone;
pub mod session;
pub mod storage;
#[cfg(feature = "token")]
pub mod token;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use api::{ApiClient, Reply};
pub use config::ClientConfig;
pub use error::{Error, RefreshError, ValidationError};
pub use phone::{is_valid_phone_number, normalize_phone_number};
#[cfg(feature = "reqwest-transport")]
pub use session::ReqwestTransport;
pub use session::{
    ApiRequest, ApiResponse, ExpiryPolicy, RedirectMode, SessionClient, Transport, build_headers,
};
pub use storage::{CredentialStore, FileStore, KeyValueStore, MemoryStore, TokenSet};
#[cfg(feature = "token")]
pub use token::{TokenClaims, decode_unverified_claims, extract_jti_from_token};
pub use types::{
    AuthStatus, NotificationId, OrderId, PaymentGateway, PaymentId, PendingOrder, PlanId,
    PrescriptionId, ProfileSnapshot, Role, SessionId, UserId, UserSnapshot,
};
