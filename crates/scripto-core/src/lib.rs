//! Scripto Core Library
//!
//! This crate provides the client side of Scripto, a catalog of shared code
//! snippets ("scripts") served by a remote HTTP/WebSocket API.
//!
//! # Architecture
//!
//! - **Transport**: one typed operation per remote endpoint, errors normalized
//!   into [`ApiError`]
//! - **State synchronization**: optimistic vote state, debounced search and a
//!   live subscription that keeps the change-request list fresh
//!
//! Nothing is cached or persisted locally; the server is the source of truth.
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let api = ApiClient::from_config(&config)?;
//!
//! let mut catalog = CatalogView::new();
//! catalog.load(&api).await;
//!
//! let votes = VoteBoard::new(config.vote_mode);
//! votes.vote(&api, &script_id, VoteAction::Like).await?;
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP transport client and the traits the controllers depend on
//! - `models`: Catalog items, change requests, counters and search queries
//! - `vote`: Per-item like/dislike state machine
//! - `search`: Trailing-edge search debouncer
//! - `live`: WebSocket change notifications with reconnect
//! - `view`: Loading/error/ready state for the catalog and request board
//! - `config`: Application configuration

pub mod api;
pub mod config;
pub mod error;
pub mod live;
pub mod models;
pub mod search;
pub mod view;
pub mod vote;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, CatalogSource, RequestSource, VoteApi};
pub use config::{Config, VoteMode};
pub use error::{ApiError, ApiResult, FieldError};
pub use live::{spawn_subscriber, LinkStatus, LiveConfig, LiveEvent, LiveHandle};
pub use models::{
    Analytics, CatalogItem, ChangeRequest, DownvoteCount, DownvoteOutcome, LikeCount,
    NewChangeRequest, NewScript, SearchField, SearchQuery, TagColor, VoteChoice, VoteTally,
};
pub use search::SearchDebouncer;
pub use view::{CatalogView, RequestBoard, ViewState};
pub use vote::{VoteAction, VoteBoard, VoteError, VoteOutcome, VoteState, VoteStatus};
