//! The authenticated HTTP session.
//!
//! [`SessionClient`] wraps a [`Transport`], decorates API calls with the
//! stored bearer token, and renews the token through a single-flight
//! [`RefreshCoordinator`] call when the server answers 401.

mod client;
mod flight;
mod headers;
mod policy;
mod refresh;
mod transport;

pub use client::SessionClient;
pub use headers::build_headers;
pub use policy::{ExpiryPolicy, RedirectMode, login_redirect};
pub use refresh::{RefreshCoordinator, RefreshedTokens};
#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;
pub use transport::{ApiRequest, ApiResponse, FormPart, RequestBody, Transport};
