//! Transport layer for the Scripto API
//!
//! [`ApiClient`] issues one HTTP call per remote action. The controllers in
//! this crate do not talk to it directly; they depend on the narrow traits
//! below so tests can substitute in-process fakes.

mod client;

use std::future::Future;
use std::pin::Pin;

use crate::error::ApiResult;
use crate::models::{
    CatalogItem, ChangeRequest, DownvoteCount, DownvoteOutcome, FulfillReceipt, LikeCount,
    SearchQuery, VoteChoice, VoteTally,
};

pub use client::ApiClient;

/// Boxed future returned by the API traits
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = ApiResult<T>> + Send + 'a>>;

/// Source of catalog listings
pub trait CatalogSource: Send + Sync {
    /// Fetch every catalog item.
    fn list_scripts(&self) -> ApiFuture<'_, Vec<CatalogItem>>;

    /// Fetch items matching the non-empty filters of `query`.
    fn search_scripts<'a>(&'a self, query: &'a SearchQuery) -> ApiFuture<'a, Vec<CatalogItem>>;
}

/// Vote endpoints for a single script
pub trait VoteApi: Send + Sync {
    fn like<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount>;

    fn unlike<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount>;

    fn downvote<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteOutcome>;

    fn undo_downvote<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteCount>;

    /// Idempotently set the viewer's vote, returning both counters.
    fn set_vote<'a>(&'a self, script_id: &'a str, vote: VoteChoice) -> ApiFuture<'a, VoteTally>;

    fn likes<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, LikeCount>;

    fn downvotes<'a>(&'a self, script_id: &'a str) -> ApiFuture<'a, DownvoteCount>;
}

/// Change request endpoints used by the request board
pub trait RequestSource: Send + Sync {
    fn list_requests(&self) -> ApiFuture<'_, Vec<ChangeRequest>>;

    fn fulfill_request<'a>(&'a self, request_id: &'a str) -> ApiFuture<'a, FulfillReceipt>;
}
