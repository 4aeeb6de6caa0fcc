use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ApiClient, Reply};
use crate::error::Error;
use crate::session::{ApiRequest, Transport};
use crate::types::NotificationId;

const FEED_PATH: &str = "/api/v1/notifications/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of the user's notifications.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationFeed {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub unread_count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

pub struct NotificationsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> NotificationsApi<'a, T> {
    pub(super) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// First page, or the page behind a `next`/`previous` link.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn list(&self, page_url: Option<&str>) -> Result<Reply<NotificationFeed>, Error> {
        self.client
            .call(ApiRequest::get(page_url.unwrap_or(FEED_PATH)))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] or a transport error.
    pub async fn mark_read(&self, id: NotificationId) -> Result<Reply<Value>, Error> {
        self.client
            .call(ApiRequest::post(format!("{FEED_PATH}{id}/")))
            .await
    }
}
