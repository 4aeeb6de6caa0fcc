use super::{Effects, failure, landing, page_window};
use crate::api::{ApiClient, PrescriptionSummary, SavedPage};
use crate::session::Transport;

const ROUTE: &str = "/profile/saved/";

/// The user's bookmarked prescriptions.
pub struct SavedPrescriptionsPage<T> {
    api: ApiClient<T>,
    page: SavedPage,
    current_page: u32,
}

impl<T: Transport> SavedPrescriptionsPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            page: SavedPage::default(),
            current_page: 1,
        }
    }

    pub async fn open(&mut self) -> Effects {
        if !self.api.credentials().is_logged_in() {
            return Effects::navigate(landing(&self.api));
        }
        self.load(1).await
    }

    pub async fn load(&mut self, page: u32) -> Effects {
        let page = page.max(1);
        match self.api.profile().saved(page).await {
            Ok(reply) => {
                self.current_page = reply.data.current_page.unwrap_or(page);
                self.page = reply.data;
                Effects::none()
            }
            Err(e) => failure(&self.api, ROUTE, &e, "Could not load your saved prescriptions."),
        }
    }

    /// Ignores the current page and pages outside `1..=total_pages`.
    pub async fn go_to_page(&mut self, page: u32) -> Effects {
        if page < 1 || page > self.total_pages() || page == self.current_page {
            return Effects::none();
        }
        self.load(page).await
    }

    pub async fn next_page(&mut self) -> Effects {
        if self.page.next.is_none() {
            return Effects::none();
        }
        self.go_to_page(self.current_page + 1).await
    }

    pub async fn previous_page(&mut self) -> Effects {
        if self.page.previous.is_none() {
            return Effects::none();
        }
        self.go_to_page(self.current_page.saturating_sub(1)).await
    }

    pub fn open_prescription(&self, item: &PrescriptionSummary) -> Effects {
        Effects::navigate(format!("/prescriptions/{}/", item.slug))
    }

    #[must_use]
    pub fn prescriptions(&self) -> &[PrescriptionSummary] {
        &self.page.results
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.page.count
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.page.total_pages.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    #[must_use]
    pub fn visible_pages(&self) -> Vec<u32> {
        page_window(self.current_page, self.total_pages())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::session::{ApiRequest, ApiResponse};
    use serde_json::json;

    fn bookmarks(request: &ApiRequest) -> ApiResponse {
        let page: u32 = request
            .query
            .iter()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(1);
        let next = (page < 9).then(|| format!("https://drcode.example/api/v1/accounts/profile/saved/?page={}", page + 1));
        let previous = (page > 1).then(|| "https://drcode.example/api/v1/accounts/profile/saved/".to_owned());
        ApiResponse::json_body(
            200,
            &json!({
                "count": 85, "total_pages": 9, "current_page": page, "page_size": 10,
                "next": next, "previous": previous,
                "results": [{"id": page, "slug": format!("rx-{page}"), "title": "Rx"}]
            }),
        )
    }

    #[tokio::test]
    async fn window_follows_the_current_page() {
        let (api, _) = client(bookmarks);
        let mut page = SavedPrescriptionsPage::new(api);
        assert!(page.open().await.is_empty());
        assert_eq!(page.visible_pages(), vec![1, 2, 3, 4, 5]);

        let _ = page.go_to_page(9).await;
        assert_eq!(page.current_page(), 9);
        assert_eq!(page.visible_pages(), vec![5, 6, 7, 8, 9]);

        let _ = page.previous_page().await;
        assert_eq!(page.current_page(), 8);
        assert_eq!(page.prescriptions()[0].slug, "rx-8");
    }

    #[tokio::test]
    async fn out_of_range_and_current_pages_make_no_call() {
        let (api, transport) = client(bookmarks);
        let mut page = SavedPrescriptionsPage::new(api);
        let _ = page.open().await;

        assert!(page.go_to_page(1).await.is_empty());
        assert!(page.go_to_page(10).await.is_empty());
        assert!(page.previous_page().await.is_empty());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn clicking_a_bookmark_opens_its_detail() {
        let (api, _) = client(bookmarks);
        let mut page = SavedPrescriptionsPage::new(api);
        let _ = page.open().await;
        let item = page.prescriptions()[0].clone();
        assert_eq!(page.open_prescription(&item).navigate.as_deref(), Some("/prescriptions/rx-1/"));
    }

    #[tokio::test]
    async fn anonymous_is_sent_home() {
        let (api, transport) = client(bookmarks);
        api.credentials().clear_all();
        let mut page = SavedPrescriptionsPage::new(api);
        assert_eq!(page.open().await.navigate.as_deref(), Some("/"));
        assert!(transport.requests().is_empty());
    }
}
