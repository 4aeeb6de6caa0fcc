use super::{Effects, Notice, failure, landing, query_param};
use crate::api::{ApiClient, Notification, NotificationFeed};
use crate::session::Transport;
use crate::types::NotificationId;

const ROUTE: &str = "/notifications/";

/// The user's notification inbox.
pub struct NotificationsPage<T> {
    api: ApiClient<T>,
    feed: NotificationFeed,
    current_page: u32,
}

impl<T: Transport> NotificationsPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            feed: NotificationFeed::default(),
            current_page: 1,
        }
    }

    pub async fn open(&mut self) -> Effects {
        if !self.api.credentials().is_logged_in() {
            return Effects::navigate(landing(&self.api));
        }
        self.load(None).await
    }

    /// Loads the first page, or the page behind a `next`/`previous` link.
    pub async fn load(&mut self, page_url: Option<&str>) -> Effects {
        match self.api.notifications().list(page_url).await {
            Ok(reply) => {
                self.feed = reply.data;
                self.current_page = page_url
                    .and_then(|url| query_param(url, "page"))
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(1);
                Effects::none()
            }
            Err(e) => failure(&self.api, ROUTE, &e, "Could not load notifications."),
        }
    }

    pub async fn next_page(&mut self) -> Effects {
        match self.feed.next.clone() {
            Some(url) => self.load(Some(&url)).await,
            None => Effects::none(),
        }
    }

    pub async fn previous_page(&mut self) -> Effects {
        match self.feed.previous.clone() {
            Some(url) => self.load(Some(&url)).await,
            None => Effects::none(),
        }
    }

    /// No call is made for a notification that is already read.
    pub async fn mark_read(&mut self, id: NotificationId) -> Effects {
        let Some(index) = self.feed.notifications.iter().position(|n| n.id == id) else {
            return Effects::none();
        };
        if self.feed.notifications[index].is_read {
            return Effects::none();
        }
        match self.api.notifications().mark_read(id).await {
            Ok(_) => {
                self.set_read(index);
                Effects::notice(Notice::success("Marked as read."))
            }
            Err(e) => failure(&self.api, ROUTE, &e, "Please try again."),
        }
    }

    /// Marks every unread notification on this page. Stops at the first
    /// failure; the ones already confirmed stay marked.
    pub async fn mark_all_read(&mut self) -> Effects {
        let unread: Vec<(usize, NotificationId)> = self
            .feed
            .notifications
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.is_read)
            .map(|(i, n)| (i, n.id))
            .collect();

        for (index, id) in unread {
            if let Err(e) = self.api.notifications().mark_read(id).await {
                return failure(&self.api, ROUTE, &e, "Please try again.");
            }
            self.set_read(index);
        }
        self.feed.unread_count = 0;
        Effects::notice(Notice::success("All notifications were marked as read."))
    }

    fn set_read(&mut self, index: usize) {
        self.feed.notifications[index].is_read = true;
        self.feed.unread_count = self.feed.unread_count.saturating_sub(1);
    }

    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.feed.notifications
    }

    #[must_use]
    pub fn unread_count(&self) -> u64 {
        self.feed.unread_count
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.feed.total_count
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }
}
