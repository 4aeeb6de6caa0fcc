use super::{Effects, Notice, failure, page_window};
use crate::api::{ApiClient, Category, PrescriptionQuery, PrescriptionSummary};
use crate::session::Transport;

const ROUTE: &str = "/prescriptions/";
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Paginated, searchable prescription catalogue.
pub struct PrescriptionListPage<T> {
    api: ApiClient<T>,
    prescriptions: Vec<PrescriptionSummary>,
    categories: Vec<Category>,
    selected_categories: Vec<u64>,
    search: String,
    search_mode: bool,
    current_page: u32,
    items_per_page: u32,
    total_count: u64,
    next: Option<String>,
    previous: Option<String>,
    premium_user: bool,
}

impl<T: Transport> PrescriptionListPage<T> {
    #[must_use]
    pub fn new(api: ApiClient<T>) -> Self {
        let premium_user = api
            .credentials()
            .user_profile()
            .is_some_and(|p| p.has_premium_access());
        Self {
            api,
            prescriptions: Vec::new(),
            categories: Vec::new(),
            selected_categories: Vec::new(),
            search: String::new(),
            search_mode: false,
            current_page: 1,
            items_per_page: DEFAULT_PAGE_SIZE,
            total_count: 0,
            next: None,
            previous: None,
            premium_user,
        }
    }

    /// Loads `page` with the current search term and category filter.
    pub async fn load(&mut self, page: u32) -> Effects {
        let page = page.max(1);
        let query = PrescriptionQuery::page(page)
            .with_search(self.search.clone())
            .with_categories(self.selected_categories.iter().copied());

        let listing = match self.api.prescriptions().list(&query).await {
            Ok(reply) => reply.data,
            Err(e) => return failure(&self.api, ROUTE, &e, "Could not load prescriptions."),
        };

        self.search_mode = !self.search.is_empty();
        // categories only come with the unfiltered first page
        if page == 1 && !self.search_mode {
            if let Some(filters) = listing.filters {
                self.categories = filters.categories;
            }
        }
        if page == 1 && !listing.results.is_empty() {
            self.items_per_page = u32::try_from(listing.results.len()).unwrap_or(DEFAULT_PAGE_SIZE);
        }
        self.total_count = listing.count;
        self.next = listing.next;
        self.previous = listing.previous;
        self.prescriptions = listing.results;
        self.current_page = page;
        Effects::none()
    }

    pub async fn search(&mut self, term: &str) -> Effects {
        self.search = term.trim().to_owned();
        self.load(1).await
    }

    pub async fn toggle_category(&mut self, id: u64) -> Effects {
        match self.selected_categories.iter().position(|c| *c == id) {
            Some(i) => {
                self.selected_categories.remove(i);
            }
            None => self.selected_categories.push(id),
        }
        self.load(1).await
    }

    pub async fn clear_categories(&mut self) -> Effects {
        self.selected_categories.clear();
        self.load(1).await
    }

    /// Ignores pages outside `1..=total_pages`.
    pub async fn go_to_page(&mut self, page: u32) -> Effects {
        if page < 1 || page > self.total_pages() {
            return Effects::none();
        }
        self.load(page).await
    }

    /// Where clicking `item` leads. Premium items stay closed to other users.
    pub fn open(&self, item: &PrescriptionSummary) -> Effects {
        if item.is_premium() && !self.premium_user {
            return Effects::notice(Notice::info(
                "This prescription is available to premium members only.",
            ));
        }
        Effects::navigate(format!("/prescriptions/{}", item.slug))
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let per_page = u64::from(self.items_per_page.max(1));
        u32::try_from(self.total_count.div_ceil(per_page)).unwrap_or(u32::MAX)
    }

    /// Up to [`MAX_VISIBLE_PAGES`](super::MAX_VISIBLE_PAGES) page numbers
    /// around the current page.
    #[must_use]
    pub fn visible_pages(&self) -> Vec<u32> {
        page_window(self.current_page, self.total_pages())
    }

    #[must_use]
    pub fn prescriptions(&self) -> &[PrescriptionSummary] {
        &self.prescriptions
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn selected_categories(&self) -> &[u64] {
        &self.selected_categories
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub fn is_search_mode(&self) -> bool {
        self.search_mode
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}
