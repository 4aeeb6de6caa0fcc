use super::{Effects, Notice};
use crate::api::{ApiClient, Tutorial};
use crate::session::Transport;

/// Public list of tutorial videos.
pub struct TutorialsPage<T> {
    api: ApiClient<T>,
    tutorials: Vec<Tutorial>,
    error: Option<String>,
}

impl<T: Transport> TutorialsPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            tutorials: Vec::new(),
            error: None,
        }
    }

    /// Anyone may view the list, so failures never redirect.
    pub async fn load(&mut self) -> Effects {
        match self.api.tutorials().list().await {
            Ok(reply) => {
                self.tutorials = reply.data;
                self.error = None;
                Effects::none()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load tutorials");
                self.error = Some(e.to_string());
                Effects::notice(Notice::error(
                    "Could not load the tutorial videos. Please try again.",
                ))
            }
        }
    }

    #[must_use]
    pub fn tutorials(&self) -> &[Tutorial] {
        &self.tutorials
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
