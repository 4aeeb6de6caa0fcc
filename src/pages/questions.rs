use super::{Effects, Notice, failure, query_param};
use crate::api::{ApiClient, QuestionPage, UserQuestion};
use crate::session::Transport;

const ROUTE: &str = "/profile/questions/";
const LOGIN_ROUTE: &str = "/login";
const DEFAULT_PAGE_SIZE: u64 = 10;

/// Questions the user asked about prescriptions, and their answers.
pub struct UserQuestionsPage<T> {
    api: ApiClient<T>,
    page: QuestionPage,
    current_page: u32,
    page_size: u64,
    selected: Option<usize>,
}

impl<T: Transport> UserQuestionsPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        Self {
            api,
            page: QuestionPage::default(),
            current_page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            selected: None,
        }
    }

    pub async fn open(&mut self) -> Effects {
        if !self.api.credentials().is_logged_in() {
            return Effects::notice(Notice::warning("Please log in to see your questions."))
                .with_navigate(LOGIN_ROUTE);
        }
        self.load(None).await
    }

    /// Loads the first page, or the page behind a `next`/`previous` link.
    pub async fn load(&mut self, page_url: Option<&str>) -> Effects {
        match self.api.profile().questions(page_url).await {
            Ok(reply) => {
                let page = reply.data;
                self.current_page = page_url
                    .and_then(|url| query_param(url, "page"))
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(1);
                // only a full first page tells the real page size
                if self.current_page == 1 && !page.results.is_empty() {
                    self.page_size = u64::try_from(page.results.len()).unwrap_or(DEFAULT_PAGE_SIZE);
                }
                self.page = page;
                self.selected = None;
                Effects::none()
            }
            Err(e) => failure(&self.api, ROUTE, &e, "Could not load your questions."),
        }
    }

    pub async fn next_page(&mut self) -> Effects {
        match self.page.next.clone() {
            Some(url) => self.load(Some(&url)).await,
            None => Effects::none(),
        }
    }

    pub async fn previous_page(&mut self) -> Effects {
        match self.page.previous.clone() {
            Some(url) => self.load(Some(&url)).await,
            None => Effects::none(),
        }
    }

    /// Shows the full question and answer at `index`.
    pub fn select(&mut self, index: usize) {
        if index < self.page.results.len() {
            self.selected = Some(index);
        }
    }

    pub fn close(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub fn selected(&self) -> Option<&UserQuestion> {
        self.selected.and_then(|i| self.page.results.get(i))
    }

    #[must_use]
    pub fn questions(&self) -> &[UserQuestion] {
        &self.page.results
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.page.count
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        u32::try_from(self.page.count.div_ceil(self.page_size.max(1))).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::client;
    use crate::session::{ApiRequest, ApiResponse};
    use serde_json::json;

    const SECOND: &str = "https://drcode.example/api/v1/accounts/profile/questions/?page=2";

    fn questions(request: &ApiRequest) -> ApiResponse {
        if request.target == SECOND {
            return ApiResponse::json_body(
                200,
                &json!({"count": 3, "previous": "https://drcode.example/api/v1/accounts/profile/questions/",
                        "results": [{"question_text": "Side effects?"}]}),
            );
        }
        ApiResponse::json_body(
            200,
            &json!({"count": 3, "next": SECOND, "results": [
                {"question_text": "Dose?", "answer_text": "Twice daily", "answerer_name": "Dr. Rahimi"},
                {"question_text": "With food?"}
            ]}),
        )
    }

    #[tokio::test]
    async fn pages_keep_the_first_page_size() {
        let (api, _) = client(questions);
        let mut page = UserQuestionsPage::new(api);
        assert!(page.open().await.is_empty());
        assert_eq!(page.total_pages(), 2);

        let _ = page.next_page().await;
        assert_eq!(page.current_page(), 2);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.questions()[0].question_text, "Side effects?");

        let _ = page.previous_page().await;
        assert_eq!(page.current_page(), 1);
    }

    #[tokio::test]
    async fn selection_is_cleared_by_paging() {
        let (api, _) = client(questions);
        let mut page = UserQuestionsPage::new(api);
        let _ = page.open().await;

        page.select(0);
        assert!(page.selected().unwrap().is_answered());
        page.select(7);
        assert_eq!(page.selected().unwrap().question_text, "Dose?");

        let _ = page.next_page().await;
        assert_eq!(page.selected(), None);
    }

    #[tokio::test]
    async fn anonymous_is_asked_to_log_in() {
        let (api, transport) = client(questions);
        api.credentials().clear_all();
        let mut page = UserQuestionsPage::new(api);

        let effects = page.open().await;
        assert_eq!(effects.navigate.as_deref(), Some("/login"));
        assert_eq!(effects.notice.unwrap().level, crate::pages::NoticeLevel::Warning);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_subscription_shows_server_message() {
        let (api, _) = client(|_| {
            ApiResponse::json_body(403, &json!({"detail": "An active subscription is required."}))
        });
        let mut page = UserQuestionsPage::new(api);
        let effects = page.open().await;
        assert_eq!(effects.notice.unwrap().text, "An active subscription is required.");
    }
}
