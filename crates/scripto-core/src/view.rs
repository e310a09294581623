//! View state for the catalog and the change-request board
//!
//! Both views follow the same shape: a fetch puts them in `Loading`, a
//! success in `Ready`, a failure in `Error` with any previous items dropped.

use tracing::debug;

use crate::api::{CatalogSource, RequestSource};
use crate::error::ApiResult;
use crate::live::LiveEvent;
use crate::models::{CatalogItem, ChangeRequest, FulfillReceipt, SearchQuery};

/// Banner shown when the notification stream drops without a close frame
pub const STREAM_CLOSED_MESSAGE: &str =
    "WebSocket connection closed unexpectedly. Please check the server.";

/// Loading / error / ready state of a fetched list
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Loading,
    Error(String),
    Ready(Vec<T>),
}

impl<T> ViewState<T> {
    /// Items when ready, otherwise nothing
    pub fn items(&self) -> &[T] {
        match self {
            ViewState::Ready(items) => items,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Ready with nothing to show (distinct from loading or failed)
    pub fn is_empty(&self) -> bool {
        matches!(self, ViewState::Ready(items) if items.is_empty())
    }

    fn from_result(result: ApiResult<Vec<T>>) -> Self {
        match result {
            Ok(items) => ViewState::Ready(items),
            Err(e) => ViewState::Error(e.message()),
        }
    }
}

/// The catalog listing with its current search
#[derive(Debug, Clone)]
pub struct CatalogView {
    state: ViewState<CatalogItem>,
    query: SearchQuery,
}

impl Default for CatalogView {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogView {
    /// A view that has not fetched yet (shown as loading)
    pub fn new() -> Self {
        Self {
            state: ViewState::Loading,
            query: SearchQuery::new(),
        }
    }

    pub fn state(&self) -> &ViewState<CatalogItem> {
        &self.state
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Fetch every item
    pub async fn load<A>(&mut self, api: &A) -> &ViewState<CatalogItem>
    where
        A: CatalogSource + ?Sized,
    {
        self.query = SearchQuery::new();
        self.fetch(api).await
    }

    /// Fetch items for `query`; an empty query lists everything
    pub async fn search<A>(&mut self, api: &A, query: &SearchQuery) -> &ViewState<CatalogItem>
    where
        A: CatalogSource + ?Sized,
    {
        self.query = query.clone();
        self.fetch(api).await
    }

    /// Refetch with the current query after an upload
    pub async fn refresh_after_upload<A>(&mut self, api: &A) -> &ViewState<CatalogItem>
    where
        A: CatalogSource + ?Sized,
    {
        self.fetch(api).await
    }

    /// Message for a ready view with no items
    pub fn empty_message(&self) -> &'static str {
        if self.query.is_empty() {
            "No scripts yet. Upload one to get started."
        } else {
            "No scripts match your search."
        }
    }

    /// Drop an item the server removed (e.g. after enough downvotes)
    pub fn remove(&mut self, script_id: &str) {
        if let ViewState::Ready(items) = &mut self.state {
            items.retain(|i| i.id != script_id);
        }
    }

    async fn fetch<A>(&mut self, api: &A) -> &ViewState<CatalogItem>
    where
        A: CatalogSource + ?Sized,
    {
        self.state = ViewState::Loading;
        let result = if self.query.is_empty() {
            api.list_scripts().await
        } else {
            api.search_scripts(&self.query).await
        };
        self.state = ViewState::from_result(result);
        debug!("Catalog view now has {} items", self.state.items().len());
        &self.state
    }
}

/// Change requests plus the live-stream banner
#[derive(Debug, Clone)]
pub struct RequestBoard {
    state: ViewState<ChangeRequest>,
    stream_error: Option<String>,
}

impl Default for RequestBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBoard {
    pub fn new() -> Self {
        Self {
            state: ViewState::Loading,
            stream_error: None,
        }
    }

    pub fn state(&self) -> &ViewState<ChangeRequest> {
        &self.state
    }

    /// Persistent stream error, kept apart from fetch errors
    pub fn stream_error(&self) -> Option<&str> {
        self.stream_error.as_deref()
    }

    pub async fn load<A>(&mut self, api: &A) -> &ViewState<ChangeRequest>
    where
        A: RequestSource + ?Sized,
    {
        self.state = ViewState::Loading;
        self.state = ViewState::from_result(api.list_requests().await);
        &self.state
    }

    /// React to a live event; returns whether the list was refetched
    pub async fn handle_event<A>(&mut self, event: &LiveEvent, api: &A) -> bool
    where
        A: RequestSource + ?Sized,
    {
        match event {
            LiveEvent::Connected => {
                self.stream_error = None;
                false
            }
            LiveEvent::Changed => {
                self.load(api).await;
                true
            }
            LiveEvent::Error(message) => {
                self.stream_error = Some(message.clone());
                false
            }
            LiveEvent::Closed { clean: false } => {
                self.stream_error = Some(STREAM_CLOSED_MESSAGE.to_string());
                false
            }
            LiveEvent::Closed { clean: true } => false,
        }
    }

    /// Mark a request fulfilled and drop it from the list
    pub async fn fulfill<A>(&mut self, api: &A, request_id: &str) -> ApiResult<FulfillReceipt>
    where
        A: RequestSource + ?Sized,
    {
        let receipt = api.fulfill_request(request_id).await?;
        if let ViewState::Ready(requests) = &mut self.state {
            requests.retain(|r| r.id != request_id);
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchField;
    use crate::test_support::{item, request, FakeApi};

    #[tokio::test]
    async fn test_new_view_is_loading() {
        let view = CatalogView::new();
        assert!(view.state().is_loading());
        assert!(view.state().items().is_empty());
        assert!(!view.state().is_empty());
    }

    #[tokio::test]
    async fn test_load_lists_everything() {
        let api = FakeApi::with_items(vec![item("s1", "Merge sort"), item("s2", "Port scan")]);
        let mut view = CatalogView::new();

        let state = view.load(&api).await;
        assert_eq!(state.items().len(), 2);
        assert_eq!(api.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_loading_while_fetch_in_flight() {
        let api = FakeApi::with_items(vec![item("s1", "Merge sort")]);
        let mut view = CatalogView::new();
        view.load(&api).await;

        let query = SearchQuery::new().with(SearchField::Title, "sort");
        let mut fetch = Box::pin(view.search(&api, &query));
        assert!(futures_util::poll!(fetch.as_mut()).is_pending());
        drop(fetch);
        assert!(view.state().is_loading());
    }

    #[tokio::test]
    async fn test_empty_query_lists_all() {
        let api = FakeApi::with_items(vec![item("s1", "Merge sort"), item("s2", "Port scan")]);
        let mut view = CatalogView::new();

        view.search(&api, &SearchQuery::new().with(SearchField::Title, "sort"))
            .await;
        assert_eq!(view.state().items().len(), 1);

        view.search(&api, &SearchQuery::new()).await;
        assert_eq!(view.state().items().len(), 2);
        assert_eq!(api.calls(), vec!["search sort", "list"]);
    }

    #[tokio::test]
    async fn test_failure_clears_items() {
        let api = FakeApi::with_items(vec![item("s1", "Merge sort")]);
        let mut view = CatalogView::new();
        view.load(&api).await;

        api.set_failing(true);
        view.load(&api).await;

        assert_eq!(view.state().error(), Some("Service unavailable"));
        assert!(view.state().items().is_empty());
    }

    #[tokio::test]
    async fn test_empty_state_message() {
        let api = FakeApi::new();
        let mut view = CatalogView::new();

        view.load(&api).await;
        assert!(view.state().is_empty());
        assert!(view.empty_message().starts_with("No scripts yet"));

        view.search(&api, &SearchQuery::new().with(SearchField::Tags, "rust"))
            .await;
        assert!(view.state().is_empty());
        assert_eq!(view.empty_message(), "No scripts match your search.");
    }

    #[tokio::test]
    async fn test_refresh_after_upload_keeps_query() {
        let api = FakeApi::with_items(vec![item("s1", "Merge sort")]);
        let mut view = CatalogView::new();
        let query = SearchQuery::new().with(SearchField::Title, "sort");
        view.search(&api, &query).await;

        api.items.lock().unwrap().push(item("s2", "Quick sort"));
        view.refresh_after_upload(&api).await;

        assert_eq!(view.state().items().len(), 2);
        assert_eq!(view.query(), &query);
    }

    #[tokio::test]
    async fn test_remove_drops_item() {
        let api = FakeApi::with_items(vec![item("s1", "Merge sort"), item("s2", "Port scan")]);
        let mut view = CatalogView::new();
        view.load(&api).await;

        view.remove("s1");
        assert_eq!(view.state().items()[0].id, "s2");
    }

    #[tokio::test]
    async fn test_change_event_refetches_once() {
        let api = FakeApi::with_requests(vec![request("r1", "CSV diff")]);
        let mut board = RequestBoard::new();
        board.load(&api).await;

        api.requests.lock().unwrap().push(request("r2", "Log tail"));
        assert!(board.handle_event(&LiveEvent::Changed, &api).await);

        assert_eq!(board.state().items().len(), 2);
        assert_eq!(api.call_count("requests"), 2);
    }

    #[tokio::test]
    async fn test_stream_banner_lifecycle() {
        let api = FakeApi::new();
        let mut board = RequestBoard::new();

        board
            .handle_event(&LiveEvent::Closed { clean: true }, &api)
            .await;
        assert!(board.stream_error().is_none());

        board
            .handle_event(&LiveEvent::Closed { clean: false }, &api)
            .await;
        assert_eq!(board.stream_error(), Some(STREAM_CLOSED_MESSAGE));

        board
            .handle_event(&LiveEvent::Error("WebSocket connection error: refused".into()), &api)
            .await;
        assert_eq!(board.stream_error(), Some("WebSocket connection error: refused"));

        board.handle_event(&LiveEvent::Connected, &api).await;
        assert!(board.stream_error().is_none());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_survives_fetch() {
        let api = FakeApi::new();
        let mut board = RequestBoard::new();

        board
            .handle_event(&LiveEvent::Closed { clean: false }, &api)
            .await;
        api.set_failing(true);
        board.load(&api).await;

        assert!(board.state().error().is_some());
        assert!(board.stream_error().is_some());
    }

    #[tokio::test]
    async fn test_fulfill_removes_request() {
        let api = FakeApi::with_requests(vec![request("r1", "CSV diff"), request("r2", "Log tail")]);
        let mut board = RequestBoard::new();
        board.load(&api).await;

        board.fulfill(&api, "r1").await.unwrap();
        let ids: Vec<&str> = board.state().items().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2"]);

        assert!(board.fulfill(&api, "missing").await.is_err());
        assert_eq!(board.state().items().len(), 1);
    }
}
