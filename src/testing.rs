//! Scripted transport for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::error::Error;
use crate::session::{ApiRequest, ApiResponse, Transport};

/// Origin the fake answers for; absolute targets elsewhere are foreign.
pub(crate) const BASE_URL: &str = "https://drcode.example/";

type Handler = dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync;

enum Reply {
    Handler(Box<Handler>),
    Fail(String),
}

struct Inner {
    reply: Reply,
    log: Mutex<Vec<ApiRequest>>,
    holds: Mutex<HashMap<String, Arc<Semaphore>>>,
}

/// Answers every request through a closure and records what was sent.
#[derive(Clone)]
pub(crate) struct FakeTransport {
    inner: Arc<Inner>,
}

/// Keeps requests to one path suspended until released or dropped.
pub(crate) struct Hold(Arc<Semaphore>);

impl Hold {
    pub(crate) fn release(self) {}
}

impl Drop for Hold {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl FakeTransport {
    pub(crate) fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Self {
        Self::with_reply(Reply::Handler(Box::new(handler)))
    }

    /// Every request fails as if the connection dropped.
    pub(crate) fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_owned()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            inner: Arc::new(Inner {
                reply,
                log: Mutex::new(Vec::new()),
                holds: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn hold(&self, path: &str) -> Hold {
        let semaphore = Arc::new(Semaphore::new(0));
        self.inner
            .holds
            .lock()
            .unwrap()
            .insert(path.to_owned(), semaphore.clone());
        Hold(semaphore)
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.inner.log.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, path: &str) -> usize {
        self.inner
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path() == path)
            .count()
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        self.inner.log.lock().unwrap().push(request.clone());
        let held = self.inner.holds.lock().unwrap().get(&*request.path()).cloned();
        if let Some(semaphore) = held {
            // closed means released
            let _ = semaphore.acquire().await;
        }
        match &self.inner.reply {
            Reply::Handler(handler) => Ok(handler(&request)),
            Reply::Fail(message) => Err(Error::network(message.clone())),
        }
    }

    fn api_origin(&self) -> Option<url::Origin> {
        url::Url::parse(BASE_URL).ok().map(|url| url.origin())
    }
}

/// `Authorization` header of a recorded request, if any.
pub(crate) fn bearer_of(request: &ApiRequest) -> Option<String> {
    request
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}
