use std::borrow::Cow;
use std::future::Future;

use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::{Origin, Url};

use crate::error::Error;

/// Body of an [`ApiRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// One field of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FormPart {
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    #[must_use]
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            data,
        }
    }
}

/// A replayable HTTP call.
///
/// `target` is either a path relative to the base URL or an absolute URL
/// (pagination links come back absolute).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub target: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    #[must_use]
    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(Method::PATCH, target)
    }

    #[must_use]
    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    #[must_use]
    pub fn with_multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Caller-supplied header. The session layer still owns `Authorization`.
    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Path component of the target, without query or fragment.
    #[must_use]
    pub fn path(&self) -> Cow<'_, str> {
        match Url::parse(&self.target) {
            Ok(url) => Cow::Owned(url.path().to_owned()),
            Err(_) => {
                let end = self.target.find(['?', '#']).unwrap_or(self.target.len());
                Cow::Borrowed(&self.target[..end])
            }
        }
    }

    /// Origin of an absolute target; `None` for a relative one.
    #[must_use]
    pub fn origin(&self) -> Option<Origin> {
        Url::parse(&self.target).ok().map(|url| url.origin())
    }
}

/// Raw answer from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(Into::into)
    }

    /// Body as JSON, or `None` when empty or not JSON.
    #[must_use]
    pub fn json_value(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Human-readable failure message from the body.
    ///
    /// Looks at `message`, `detail` and `error` in that order, then at the
    /// first field error of a validation map (`{"errors": {..}}` or top-level
    /// `{"field": ["..."]}`).
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let body = self.json_value()?;
        let fields = body.as_object()?;
        for key in ["message", "detail", "error"] {
            if let Some(text) = fields.get(key).and_then(Value::as_str) {
                if !text.trim().is_empty() {
                    return Some(text.to_owned());
                }
            }
        }
        if let Some(errors) = fields.get("errors").and_then(Value::as_object) {
            return errors.values().find_map(first_text);
        }
        fields
            .values()
            .filter(|v| v.is_array())
            .find_map(first_text)
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

/// The underlying HTTP primitive the session layer wraps.
pub trait Transport: Send + Sync + 'static {
    /// Performs one HTTP call. Any response, including 4xx/5xx, is `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if no response was received.
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse, Error>> + Send;

    /// Origin that relative targets resolve against. Absolute targets only
    /// count as API calls on this origin; `None` means none of them do.
    fn api_origin(&self) -> Option<Origin> {
        None
    }
}

#[cfg(feature = "reqwest-transport")]
pub use self::reqwest_impl::ReqwestTransport;

#[cfg(feature = "reqwest-transport")]
mod reqwest_impl {
    use std::time::Duration;

    use http::header::CONTENT_TYPE;
    use url::Url;

    use super::{ApiRequest, ApiResponse, FormPart, RequestBody, Transport};
    use crate::error::Error;

    /// [`Transport`] over `reqwest`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        http: reqwest::Client,
        base_url: Url,
        timeout: Option<Duration>,
    }

    impl ReqwestTransport {
        #[must_use]
        pub fn new(base_url: Url) -> Self {
            Self {
                http: reqwest::Client::new(),
                base_url,
                timeout: None,
            }
        }

        /// Use a custom HTTP client (for connection pool reuse or testing).
        #[must_use]
        pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
            self.http = client;
            self
        }

        /// Per-request timeout. Unset means no limit beyond the client's own.
        #[must_use]
        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        #[must_use]
        pub fn base_url(&self) -> &Url {
            &self.base_url
        }

        fn resolve(&self, target: &str) -> Result<Url, Error> {
            match Url::parse(target) {
                Ok(url) => Ok(url),
                Err(url::ParseError::RelativeUrlWithoutBase) => self
                    .base_url
                    .join(target)
                    .map_err(|e| Error::Config(format!("invalid request target {target}: {e}"))),
                Err(e) => Err(Error::Config(format!("invalid request target {target}: {e}"))),
            }
        }
    }

    fn into_form(parts: Vec<FormPart>) -> Result<reqwest::multipart::Form, Error> {
        let mut form = reqwest::multipart::Form::new();
        for part in parts {
            let mut field = reqwest::multipart::Part::bytes(part.data);
            if let Some(file_name) = part.file_name {
                field = field.file_name(file_name);
            }
            if let Some(content_type) = part.content_type {
                field = field.mime_str(&content_type)?;
            }
            form = form.part(part.name, field);
        }
        Ok(form)
    }

    impl Transport for ReqwestTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
            let url = self.resolve(&request.target)?;
            let mut headers = request.headers;

            let mut builder = self.http.request(request.method, url);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            builder = match request.body {
                RequestBody::Empty => builder.headers(headers),
                RequestBody::Json(value) => builder.headers(headers).json(&value),
                RequestBody::Multipart(parts) => {
                    // reqwest appends its own boundary content type
                    headers.remove(CONTENT_TYPE);
                    builder.headers(headers).multipart(into_form(parts)?)
                }
            };

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok(ApiResponse::new(status, body.to_vec()))
        }

        fn api_origin(&self) -> Option<url::Origin> {
            Some(self.base_url.origin())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn resolves_relative_and_absolute_targets() {
            let transport = ReqwestTransport::new("https://drcode.example/".parse().unwrap());
            assert_eq!(
                transport.resolve("/api/v1/plans/").unwrap().as_str(),
                "https://drcode.example/api/v1/plans/"
            );
            assert_eq!(
                transport
                    .resolve("https://cdn.example/api/v1/notifications/?page=2")
                    .unwrap()
                    .as_str(),
                "https://cdn.example/api/v1/notifications/?page=2"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_ignores_origin_and_query() {
        assert_eq!(ApiRequest::get("/api/v1/x/?page=2").path(), "/api/v1/x/");
        assert_eq!(
            ApiRequest::get("https://drcode.example/api/v1/notifications/?page=3").path(),
            "/api/v1/notifications/"
        );
        assert_eq!(ApiRequest::get("https://drcode.example").path(), "/");
        assert_eq!(ApiRequest::get("/login#top").path(), "/login");
        assert_eq!(
            ApiRequest::get("https://tracker.example?next=/api/v1/profile/").path(),
            "/"
        );
    }

    #[test]
    fn origin_only_for_absolute_targets() {
        assert_eq!(ApiRequest::get("/api/v1/x/").origin(), None);
        let origin = ApiRequest::get("https://drcode.example/api/v1/x/").origin();
        assert_eq!(origin, Some(Url::parse("https://drcode.example/").unwrap().origin()));
    }

    #[test]
    fn response_helpers() {
        let ok = ApiResponse::json_body(201, &json!({"id": 4}));
        assert!(ok.is_success());
        assert_eq!(ok.json::<Value>().unwrap()["id"], 4);

        let html = ApiResponse::new(502, "<html>bad gateway</html>");
        assert!(!html.is_success());
        assert_eq!(html.json_value(), None);
        assert!(html.text().contains("bad gateway"));
    }

    #[test]
    fn error_message_sources() {
        let msg = ApiResponse::json_body(400, &json!({"success": false, "message": "bad code"}));
        assert_eq!(msg.error_message().as_deref(), Some("bad code"));

        let detail = ApiResponse::json_body(401, &json!({"detail": "Token is invalid"}));
        assert_eq!(detail.error_message().as_deref(), Some("Token is invalid"));

        let nested = ApiResponse::json_body(
            400,
            &json!({"success": false, "errors": {"phone_number": ["already registered"]}}),
        );
        assert_eq!(nested.error_message().as_deref(), Some("already registered"));

        let drf = ApiResponse::json_body(400, &json!({"code": "x", "password": ["too short"]}));
        assert_eq!(drf.error_message().as_deref(), Some("too short"));

        assert_eq!(ApiResponse::json_body(500, &json!({"success": false})).error_message(), None);
        assert_eq!(ApiResponse::new(500, "oops").error_message(), None);
    }
}
