//! In-process fake of the Scripto API for controller tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::api::{ApiFuture, CatalogSource, RequestSource, VoteApi};
use crate::error::ApiError;
use crate::models::{
    CatalogItem, ChangeRequest, DownvoteCount, DownvoteOutcome, FulfillReceipt, LikeCount,
    SearchQuery, VoteChoice, VoteTally,
};

/// Fake server keeping one pair of counters and fixed lists
///
/// Every call yields once before answering so concurrent callers can
/// interleave the way they would around a real network request.
#[derive(Default)]
pub struct FakeApi {
    pub likes: Mutex<u64>,
    pub downvotes: Mutex<u64>,
    pub items: Mutex<Vec<CatalogItem>>,
    pub requests: Mutex<Vec<ChangeRequest>>,
    pub calls: Mutex<Vec<String>>,
    /// Every call fails with a network error while set
    pub fail: AtomicBool,
    /// Downvotes delete the script instead of counting
    pub remove_on_downvote: AtomicBool,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counts(likes: u64, downvotes: u64) -> Self {
        let api = Self::new();
        *api.likes.lock().unwrap() = likes;
        *api.downvotes.lock().unwrap() = downvotes;
        api
    }

    pub fn with_items(items: Vec<CatalogItem>) -> Self {
        let api = Self::new();
        *api.items.lock().unwrap() = items;
        api
    }

    pub fn with_requests(requests: Vec<ChangeRequest>) -> Self {
        let api = Self::new();
        *api.requests.lock().unwrap() = requests;
        api
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Record the call, yield, then fail if configured
    async fn enter(&self, call: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Network {
                status: Some(503),
                message: "Service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn like_count(&self, script_id: &str) -> LikeCount {
        LikeCount {
            script_id: script_id.to_string(),
            like_count: *self.likes.lock().unwrap(),
        }
    }

    fn downvote_count(&self, script_id: &str) -> DownvoteCount {
        DownvoteCount {
            script_id: script_id.to_string(),
            downvote_count: *self.downvotes.lock().unwrap(),
        }
    }
}

pub fn item(id: &str, title: &str) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        filename: format!("{}.py", id),
        title: title.to_string(),
        language: "Python".to_string(),
        tags: "util".to_string(),
        description: String::new(),
        how_it_works: String::new(),
        category: "Tools".to_string(),
        script_content: String::new(),
        upload_time: None,
    }
}

pub fn request(id: &str, title: &str) -> ChangeRequest {
    ChangeRequest {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        language: None,
        tags: None,
        is_fulfilled: false,
        request_time: None,
    }
}

impl CatalogSource for FakeApi {
    fn list_scripts(&self) -> ApiFuture<'_, Vec<CatalogItem>> {
        Box::pin(async move {
            self.enter("list".to_string()).await?;
            Ok(self.items.lock().unwrap().clone())
        })
    }

    fn search_scripts<'a>(&'a self, query: &'a SearchQuery) -> ApiFuture<'a, Vec<CatalogItem>> {
        Box::pin(async move {
            self.enter(format!("search {}", query.title)).await?;
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .filter(|i| i.title.contains(query.title.as_str()))
                .cloned()
                .collect())
        })
    }
}

impl VoteApi for FakeApi {
    fn like<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount> {
        Box::pin(async move {
            self.enter(format!("like {}", script_id)).await?;
            *self.likes.lock().unwrap() += 1;
            Ok(self.like_count(script_id))
        })
    }

    fn unlike<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount> {
        Box::pin(async move {
            self.enter(format!("unlike {}", script_id)).await?;
            let mut likes = self.likes.lock().unwrap();
            *likes = likes.saturating_sub(1);
            drop(likes);
            Ok(self.like_count(script_id))
        })
    }

    fn downvote<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteOutcome> {
        Box::pin(async move {
            self.enter(format!("downvote {}", script_id)).await?;
            if self.remove_on_downvote.load(Ordering::SeqCst) {
                return Ok(DownvoteOutcome::Removed {
                    detail: "Script deleted due to reaching 100 downvotes".to_string(),
                });
            }
            *self.downvotes.lock().unwrap() += 1;
            Ok(DownvoteOutcome::Counted(self.downvote_count(script_id)))
        })
    }

    fn undo_downvote<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteCount> {
        Box::pin(async move {
            self.enter(format!("undo-downvote {}", script_id)).await?;
            let mut downvotes = self.downvotes.lock().unwrap();
            *downvotes = downvotes.saturating_sub(1);
            drop(downvotes);
            Ok(self.downvote_count(script_id))
        })
    }

    fn set_vote<'a>(&'a self, script_id: &'a str, vote: VoteChoice) -> ApiFuture<'a, VoteTally> {
        Box::pin(async move {
            self.enter(format!("set-vote {} {:?}", script_id, vote)).await?;
            // The server tracks one vote per viewer; model a single viewer on
            // top of a base tally of zero.
            let (likes, downvotes) = match vote {
                VoteChoice::Like => (1, 0),
                VoteChoice::Dislike => (0, 1),
                VoteChoice::None => (0, 0),
            };
            *self.likes.lock().unwrap() = likes;
            *self.downvotes.lock().unwrap() = downvotes;
            Ok(VoteTally {
                script_id: script_id.to_string(),
                like_count: likes,
                downvote_count: downvotes,
            })
        })
    }

    fn likes<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount> {
        Box::pin(async move {
            self.enter(format!("likes {}", script_id)).await?;
            Ok(self.like_count(script_id))
        })
    }

    fn downvotes<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteCount> {
        Box::pin(async move {
            self.enter(format!("downvotes {}", script_id)).await?;
            Ok(self.downvote_count(script_id))
        })
    }
}

impl RequestSource for FakeApi {
    fn list_requests(&self) -> ApiFuture<'_, Vec<ChangeRequest>> {
        Box::pin(async move {
            self.enter("requests".to_string()).await?;
            Ok(self.requests.lock().unwrap().clone())
        })
    }

    fn fulfill_request<'a>(&'a self, request_id: &'a str) -> ApiFuture<'a, FulfillReceipt> {
        Box::pin(async move {
            self.enter(format!("fulfill {}", request_id)).await?;
            let mut requests = self.requests.lock().unwrap();
            let Some(request) = requests.iter_mut().find(|r| r.id == request_id) else {
                return Err(ApiError::Application {
                    status: 404,
                    message: "Script request not found".to_string(),
                });
            };
            request.mark_fulfilled();
            Ok(FulfillReceipt {
                message: "Script request marked as fulfilled".to_string(),
            })
        })
    }
}
