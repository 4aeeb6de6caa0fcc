use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::session::ApiResponse;

/// Canonical result of every endpoint call.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub data: T,
    /// Server-provided human-readable message, when there is one.
    pub message: Option<String>,
}

impl<T> Reply<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            data: f(self.data),
            message: self.message,
        }
    }

    #[must_use]
    pub fn into_data(self) -> T {
        self.data
    }
}

/// Normalises a raw response into a [`Reply`].
///
/// - non-2xx: [`Error::Api`] with the body's message, or a generic one
/// - 2xx with `"success": false`: [`Error::Api`]
/// - 2xx with `success` and `data`: `data` is the payload
/// - anything else: the whole body is the payload
///
/// # Errors
///
/// Returns [`Error::Api`] for failures as above, or [`Error::Decode`] if the
/// payload does not match `T`.
pub fn decode<T: DeserializeOwned>(response: &ApiResponse) -> Result<Reply<T>, Error> {
    if !response.is_success() {
        return Err(api_error(response));
    }

    let body = if response.body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        response.json::<Value>()?
    };

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let payload = match body {
        Value::Object(mut fields) if fields.contains_key("success") => {
            if fields.get("success") == Some(&Value::Bool(false)) {
                return Err(api_error(response));
            }
            match fields.remove("data") {
                Some(data) => data,
                None => Value::Object(fields),
            }
        }
        other => other,
    };

    Ok(Reply {
        data: serde_json::from_value(payload)?,
        message,
    })
}

fn api_error(response: &ApiResponse) -> Error {
    Error::Api {
        status: response.status,
        message: response
            .error_message()
            .unwrap_or_else(|| format!("request failed with status {}", response.status)),
    }
}
