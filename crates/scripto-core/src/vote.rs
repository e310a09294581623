//! Per-script like/dislike state
//!
//! The viewer holds at most one of liked/disliked per script. A vote is
//! applied optimistically, then either reconciled with the server's counters
//! or rolled back to exactly what was shown before the click.
//!
//! Only one vote per script may be in flight; a second one is rejected with
//! [`VoteError::Busy`] rather than queued.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::VoteApi;
use crate::config::VoteMode;
use crate::error::ApiError;
use crate::models::{DownvoteOutcome, VoteChoice};

/// The viewer's vote on one script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoteStatus {
    #[default]
    Neutral,
    Liked,
    Disliked,
}

/// Vote status plus the counters shown next to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteState {
    pub status: VoteStatus,
    pub like_count: u64,
    pub dislike_count: u64,
}

impl VoteState {
    pub fn new(like_count: u64, dislike_count: u64) -> Self {
        Self {
            status: VoteStatus::Neutral,
            like_count,
            dislike_count,
        }
    }
}

/// A click on one of the two vote buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Like,
    Dislike,
}

/// Result of a vote the server accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Updated(VoteState),
    /// The downvote pushed the script over the limit and the server removed it
    Removed(String),
}

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("A vote on this script is already in progress")]
    Busy,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Remote call a transition needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoteCall {
    Like,
    Unlike,
    Downvote,
    UndoDownvote,
    Set(VoteChoice),
}

/// Counter values returned by the server
enum Reply {
    Likes(u64),
    Dislikes(u64),
    Tally { likes: u64, dislikes: u64 },
    Removed(String),
}

#[derive(Default)]
struct BoardState {
    votes: HashMap<String, VoteState>,
    busy: HashSet<String>,
}

/// Vote state for every script the viewer has seen
pub struct VoteBoard {
    mode: VoteMode,
    inner: Mutex<BoardState>,
}

impl VoteBoard {
    pub fn new(mode: VoteMode) -> Self {
        Self {
            mode,
            inner: Mutex::new(BoardState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        // The lock is never held across an await, so a poisoned guard still
        // holds consistent data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch a script's counters and make them the displayed state
    ///
    /// A script seen for the first time starts out `Neutral`.
    pub async fn load<A>(&self, api: &A, script_id: &str) -> Result<VoteState, ApiError>
    where
        A: VoteApi + ?Sized,
    {
        let likes = api.likes(script_id).await?;
        let downvotes = api.downvotes(script_id).await?;

        let mut inner = self.lock();
        let state = inner
            .votes
            .entry(script_id.to_string())
            .or_insert_with(VoteState::default);
        state.like_count = likes.like_count;
        state.dislike_count = downvotes.downvote_count;
        Ok(*state)
    }

    /// Set a script's state from counters already in hand
    pub fn seed(&self, script_id: &str, state: VoteState) {
        self.lock().votes.insert(script_id.to_string(), state);
    }

    /// Current displayed state (zeroed and `Neutral` for unknown scripts)
    pub fn state(&self, script_id: &str) -> VoteState {
        self.lock()
            .votes
            .get(script_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn is_busy(&self, script_id: &str) -> bool {
        self.lock().busy.contains(script_id)
    }

    /// Apply a click, then settle it against the server
    pub async fn vote<A>(
        &self,
        api: &A,
        script_id: &str,
        action: VoteAction,
    ) -> Result<VoteOutcome, VoteError>
    where
        A: VoteApi + ?Sized,
    {
        let (mut pending, call) = self.begin(script_id, action)?;
        debug!("Vote {:?} on {} via {:?}", action, script_id, call);

        match self.send(api, script_id, call).await {
            Ok(reply) => Ok(pending.settle(reply)),
            Err(e) => {
                warn!("Vote on {} failed, restoring previous state: {}", script_id, e);
                pending.rollback();
                Err(VoteError::Api(e))
            }
        }
    }

    /// Mark the script busy and apply the optimistic state
    fn begin(&self, script_id: &str, action: VoteAction) -> Result<(Pending<'_>, VoteCall), VoteError> {
        let mut inner = self.lock();
        if !inner.busy.insert(script_id.to_string()) {
            return Err(VoteError::Busy);
        }

        let snapshot = inner.votes.get(script_id).copied();
        let current = snapshot.unwrap_or_default();
        let (optimistic, call) = match self.mode {
            VoteMode::Legacy => legacy_transition(current, action),
            VoteMode::SetVote => set_vote_transition(current, action),
        };
        inner.votes.insert(script_id.to_string(), optimistic);

        let pending = Pending {
            board: self,
            script_id: script_id.to_string(),
            snapshot,
            optimistic,
            settled: false,
        };
        Ok((pending, call))
    }

    async fn send<A>(&self, api: &A, script_id: &str, call: VoteCall) -> Result<Reply, ApiError>
    where
        A: VoteApi + ?Sized,
    {
        let reply = match call {
            VoteCall::Like => Reply::Likes(api.like(script_id).await?.like_count),
            VoteCall::Unlike => Reply::Likes(api.unlike(script_id).await?.like_count),
            VoteCall::Downvote => match api.downvote(script_id).await? {
                DownvoteOutcome::Counted(count) => Reply::Dislikes(count.downvote_count),
                DownvoteOutcome::Removed { detail } => Reply::Removed(detail),
            },
            VoteCall::UndoDownvote => {
                Reply::Dislikes(api.undo_downvote(script_id).await?.downvote_count)
            }
            VoteCall::Set(choice) => {
                let tally = api.set_vote(script_id, choice).await?;
                Reply::Tally {
                    likes: tally.like_count,
                    dislikes: tally.downvote_count,
                }
            }
        };
        Ok(reply)
    }
}

/// Legacy four-endpoint transitions
///
/// Switching sides only calls the endpoint for the new side; the old side's
/// counter is decremented locally and never reconciled.
fn legacy_transition(current: VoteState, action: VoteAction) -> (VoteState, VoteCall) {
    let mut next = current;
    let call = match (current.status, action) {
        (VoteStatus::Neutral, VoteAction::Like) => {
            next.status = VoteStatus::Liked;
            next.like_count += 1;
            VoteCall::Like
        }
        (VoteStatus::Liked, VoteAction::Like) => {
            next.status = VoteStatus::Neutral;
            next.like_count = next.like_count.saturating_sub(1);
            VoteCall::Unlike
        }
        (VoteStatus::Disliked, VoteAction::Like) => {
            next.status = VoteStatus::Liked;
            next.like_count += 1;
            next.dislike_count = next.dislike_count.saturating_sub(1);
            VoteCall::Like
        }
        (VoteStatus::Neutral, VoteAction::Dislike) => {
            next.status = VoteStatus::Disliked;
            next.dislike_count += 1;
            VoteCall::Downvote
        }
        (VoteStatus::Disliked, VoteAction::Dislike) => {
            next.status = VoteStatus::Neutral;
            next.dislike_count = next.dislike_count.saturating_sub(1);
            VoteCall::UndoDownvote
        }
        (VoteStatus::Liked, VoteAction::Dislike) => {
            next.status = VoteStatus::Disliked;
            next.dislike_count += 1;
            next.like_count = next.like_count.saturating_sub(1);
            VoteCall::Downvote
        }
    };
    (next, call)
}

/// Single idempotent set-vote call; counters come back from the server
fn set_vote_transition(current: VoteState, action: VoteAction) -> (VoteState, VoteCall) {
    let (next, _) = legacy_transition(current, action);
    let choice = match next.status {
        VoteStatus::Liked => VoteChoice::Like,
        VoteStatus::Disliked => VoteChoice::Dislike,
        VoteStatus::Neutral => VoteChoice::None,
    };
    (next, VoteCall::Set(choice))
}

/// An applied but unsettled vote
///
/// Dropped without settling (e.g. the caller's future was cancelled), it
/// restores the previous state and releases the busy flag.
struct Pending<'a> {
    board: &'a VoteBoard,
    script_id: String,
    snapshot: Option<VoteState>,
    optimistic: VoteState,
    settled: bool,
}

impl Pending<'_> {
    fn settle(&mut self, reply: Reply) -> VoteOutcome {
        let mut state = self.optimistic;
        let outcome = match reply {
            Reply::Likes(count) => {
                state.like_count = count;
                VoteOutcome::Updated(state)
            }
            Reply::Dislikes(count) => {
                state.dislike_count = count;
                VoteOutcome::Updated(state)
            }
            Reply::Tally { likes, dislikes } => {
                state.like_count = likes;
                state.dislike_count = dislikes;
                VoteOutcome::Updated(state)
            }
            Reply::Removed(message) => VoteOutcome::Removed(message),
        };

        let mut inner = self.board.lock();
        match &outcome {
            VoteOutcome::Updated(state) => {
                inner.votes.insert(self.script_id.clone(), *state);
            }
            VoteOutcome::Removed(_) => {
                inner.votes.remove(&self.script_id);
            }
        }
        inner.busy.remove(&self.script_id);
        self.settled = true;
        outcome
    }

    fn rollback(&mut self) {
        let mut inner = self.board.lock();
        restore(&mut inner, &self.script_id, self.snapshot);
        inner.busy.remove(&self.script_id);
        self.settled = true;
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let mut inner = self.board.lock();
            restore(&mut inner, &self.script_id, self.snapshot);
            inner.busy.remove(&self.script_id);
        }
    }
}

fn restore(inner: &mut BoardState, script_id: &str, snapshot: Option<VoteState>) {
    match snapshot {
        Some(state) => {
            inner.votes.insert(script_id.to_string(), state);
        }
        None => {
            inner.votes.remove(script_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeApi;
    use std::sync::atomic::Ordering;

    fn liked(like_count: u64, dislike_count: u64) -> VoteState {
        VoteState {
            status: VoteStatus::Liked,
            like_count,
            dislike_count,
        }
    }

    fn updated(outcome: VoteOutcome) -> VoteState {
        match outcome {
            VoteOutcome::Updated(state) => state,
            VoteOutcome::Removed(msg) => panic!("Unexpected removal: {}", msg),
        }
    }

    #[tokio::test]
    async fn test_load_starts_neutral() {
        let api = FakeApi::with_counts(7, 2);
        let board = VoteBoard::new(VoteMode::Legacy);

        let state = board.load(&api, "s1").await.unwrap();
        assert_eq!(state, VoteState::new(7, 2));
        assert_eq!(board.state("s1"), state);
    }

    #[tokio::test]
    async fn test_like_takes_server_count() {
        let api = FakeApi::with_counts(41, 0);
        let board = VoteBoard::new(VoteMode::Legacy);
        board.seed("s1", VoteState::new(10, 0));

        let state = updated(board.vote(&api, "s1", VoteAction::Like).await.unwrap());
        assert_eq!(state.status, VoteStatus::Liked);
        assert_eq!(state.like_count, 42);
        assert_eq!(board.state("s1"), state);
    }

    #[tokio::test]
    async fn test_like_twice_returns_to_neutral() {
        let api = FakeApi::with_counts(3, 0);
        let board = VoteBoard::new(VoteMode::Legacy);
        board.seed("s1", VoteState::new(3, 0));

        board.vote(&api, "s1", VoteAction::Like).await.unwrap();
        let state = updated(board.vote(&api, "s1", VoteAction::Like).await.unwrap());

        assert_eq!(state, VoteState::new(3, 0));
        assert_eq!(api.calls(), vec!["like s1", "unlike s1"]);
    }

    #[tokio::test]
    async fn test_switching_sides_is_mutually_exclusive() {
        let api = FakeApi::with_counts(5, 1);
        let board = VoteBoard::new(VoteMode::Legacy);
        board.seed("s1", liked(5, 1));

        let state = updated(board.vote(&api, "s1", VoteAction::Dislike).await.unwrap());
        assert_eq!(state.status, VoteStatus::Disliked);
        assert_eq!(state.dislike_count, 2);
        // Decremented locally, undo-like is never called
        assert_eq!(state.like_count, 4);
        assert_eq!(api.calls(), vec!["downvote s1"]);

        let state = updated(board.vote(&api, "s1", VoteAction::Like).await.unwrap());
        assert_eq!(state.status, VoteStatus::Liked);
        assert_eq!(state.dislike_count, 1);
        assert_eq!(api.call_count("undo-downvote"), 0);
    }

    #[tokio::test]
    async fn test_local_decrement_floors_at_zero() {
        let api = FakeApi::with_counts(0, 0);
        let board = VoteBoard::new(VoteMode::Legacy);
        board.seed("s1", liked(0, 0));

        let state = updated(board.vote(&api, "s1", VoteAction::Dislike).await.unwrap());
        assert_eq!(state.like_count, 0);
        assert_eq!(state.dislike_count, 1);
    }

    #[tokio::test]
    async fn test_failure_restores_previous_state() {
        let api = FakeApi::with_counts(10, 0);
        api.set_failing(true);
        let board = VoteBoard::new(VoteMode::Legacy);
        board.seed("s1", VoteState::new(10, 0));

        let err = board.vote(&api, "s1", VoteAction::Like).await.unwrap_err();
        assert!(matches!(err, VoteError::Api(ApiError::Network { .. })));
        assert_eq!(board.state("s1"), VoteState::new(10, 0));
        assert!(!board.is_busy("s1"));
    }

    #[tokio::test]
    async fn test_optimistic_state_visible_in_flight() {
        let api = FakeApi::with_counts(10, 0);
        let board = VoteBoard::new(VoteMode::Legacy);
        board.seed("s1", VoteState::new(10, 0));

        let (result, during) = tokio::join!(board.vote(&api, "s1", VoteAction::Like), async {
            (board.state("s1"), board.is_busy("s1"))
        });

        assert_eq!(during.0, liked(11, 0));
        assert!(during.1);
        assert!(result.is_ok());
        assert!(!board.is_busy("s1"));
    }

    #[tokio::test]
    async fn test_concurrent_vote_on_same_script_is_rejected() {
        let api = FakeApi::with_counts(0, 0);
        let board = VoteBoard::new(VoteMode::Legacy);

        let (first, second) = tokio::join!(
            board.vote(&api, "s1", VoteAction::Like),
            board.vote(&api, "s1", VoteAction::Like)
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(VoteError::Busy)));
        assert_eq!(api.call_count("like"), 1);
        assert_eq!(board.state("s1").status, VoteStatus::Liked);
    }

    #[tokio::test]
    async fn test_different_scripts_are_independent() {
        let api = FakeApi::with_counts(0, 0);
        let board = VoteBoard::new(VoteMode::Legacy);

        let (a, b) = tokio::join!(
            board.vote(&api, "s1", VoteAction::Like),
            board.vote(&api, "s2", VoteAction::Dislike)
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(board.state("s1").status, VoteStatus::Liked);
        assert_eq!(board.state("s2").status, VoteStatus::Disliked);
    }

    #[tokio::test]
    async fn test_set_vote_mode_takes_both_counters() {
        let api = FakeApi::new();
        let board = VoteBoard::new(VoteMode::SetVote);
        // Stale local counters are replaced, not adjusted
        board.seed("s1", liked(9, 9));

        let state = updated(board.vote(&api, "s1", VoteAction::Dislike).await.unwrap());
        assert_eq!(
            state,
            VoteState {
                status: VoteStatus::Disliked,
                like_count: 0,
                dislike_count: 1,
            }
        );
        assert_eq!(api.calls(), vec!["set-vote s1 Dislike"]);

        let state = updated(board.vote(&api, "s1", VoteAction::Dislike).await.unwrap());
        assert_eq!(state, VoteState::new(0, 0));
        assert_eq!(api.call_count("set-vote s1 None"), 1);
    }

    #[tokio::test]
    async fn test_downvote_that_removes_script() {
        let api = FakeApi::with_counts(0, 99);
        api.remove_on_downvote.store(true, Ordering::SeqCst);
        let board = VoteBoard::new(VoteMode::Legacy);
        board.seed("s1", VoteState::new(0, 99));

        let outcome = board.vote(&api, "s1", VoteAction::Dislike).await.unwrap();
        assert!(matches!(outcome, VoteOutcome::Removed(_)));
        assert_eq!(board.state("s1"), VoteState::default());
        assert!(!board.is_busy("s1"));
    }

    #[tokio::test]
    async fn test_cancelled_vote_rolls_back() {
        let api = FakeApi::with_counts(4, 0);
        let board = VoteBoard::new(VoteMode::Legacy);
        board.seed("s1", VoteState::new(4, 0));

        {
            let mut fut = Box::pin(board.vote(&api, "s1", VoteAction::Like));
            // Poll once so the optimistic state is applied, then drop
            let _ = futures_util::poll!(fut.as_mut());
            assert!(board.is_busy("s1"));
        }

        assert_eq!(board.state("s1"), VoteState::new(4, 0));
        assert!(!board.is_busy("s1"));
    }
}
