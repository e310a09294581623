//! Trailing-edge search debouncer
//!
//! Every keystroke hands the full query to [`SearchDebouncer::update`]. Only
//! the last query of a quiet period is dispatched, on the receiver returned by
//! [`SearchDebouncer::new`]. Clearing bypasses the timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::SearchQuery;

/// Default quiet period before a query is dispatched
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

struct PendingSearch {
    query: SearchQuery,
    handle: JoinHandle<()>,
}

/// Coalesces query updates into dispatches
pub struct SearchDebouncer {
    delay: Duration,
    tx: mpsc::Sender<SearchQuery>,
    pending: Option<PendingSearch>,
    last_dispatched: Arc<Mutex<Option<SearchQuery>>>,
}

impl SearchDebouncer {
    /// Create a debouncer and the receiver its dispatches arrive on
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(delay: Duration) -> (Self, mpsc::Receiver<SearchQuery>) {
        let (tx, rx) = mpsc::channel(16);
        let debouncer = Self {
            delay,
            tx,
            pending: None,
            last_dispatched: Arc::new(Mutex::new(None)),
        };
        (debouncer, rx)
    }

    /// The query waiting for its timer, if any
    pub fn pending(&self) -> Option<&SearchQuery> {
        self.pending
            .as_ref()
            .filter(|p| !p.handle.is_finished())
            .map(|p| &p.query)
    }

    /// Record the latest query, restarting the timer
    ///
    /// A query equal to the pending one (or, with nothing pending, to the last
    /// dispatched one) changes nothing and leaves the timer running. Returns
    /// whether a new dispatch was scheduled.
    pub fn update(&mut self, query: SearchQuery) -> bool {
        if self.pending() == Some(&query) {
            return false;
        }
        if self.pending().is_none() && self.last_dispatched().as_ref() == Some(&query) {
            return false;
        }

        self.cancel();

        let delay = self.delay;
        let tx = self.tx.clone();
        let last_dispatched = Arc::clone(&self.last_dispatched);
        let dispatched = query.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Dispatching search {:?}", dispatched.params());
            *lock(&last_dispatched) = Some(dispatched.clone());
            let _ = tx.send(dispatched).await;
        });

        self.pending = Some(PendingSearch { query, handle });
        true
    }

    /// Drop any pending query and dispatch an empty one right away
    pub async fn clear(&mut self) {
        self.cancel();
        let empty = SearchQuery::new();
        *lock(&self.last_dispatched) = Some(empty.clone());
        let _ = self.tx.send(empty).await;
    }

    /// Discard the pending dispatch without sending anything
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }

    fn last_dispatched(&self) -> Option<SearchQuery> {
        lock(&self.last_dispatched).clone()
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchField;
    use tokio::time::{sleep, Instant};

    fn title(value: &str) -> SearchQuery {
        SearchQuery::new().with(SearchField::Title, value)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_query_dispatched() {
        let (mut debouncer, mut rx) = SearchDebouncer::new(ms(500));
        let start = Instant::now();

        debouncer.update(title("s"));
        sleep(ms(100)).await;
        debouncer.update(title("so"));
        sleep(ms(100)).await;
        debouncer.update(title("sort"));
        sleep(ms(400)).await;
        // Same query again at t=600 keeps the t=200 timer
        assert!(!debouncer.update(title("sort")));

        let query = rx.recv().await.unwrap();
        assert_eq!(query, title("sort"));
        assert_eq!(start.elapsed(), ms(700));

        sleep(ms(2000)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_query_restarts_timer() {
        let (mut debouncer, mut rx) = SearchDebouncer::new(ms(500));
        let start = Instant::now();

        debouncer.update(title("s"));
        sleep(ms(100)).await;
        debouncer.update(title("so"));
        sleep(ms(100)).await;
        debouncer.update(title("sor"));
        sleep(ms(400)).await;
        assert!(debouncer.update(title("sort")));

        let query = rx.recv().await.unwrap();
        assert_eq!(query, title("sort"));
        assert_eq!(start.elapsed(), ms(1100));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_of_dispatched_query_is_ignored() {
        let (mut debouncer, mut rx) = SearchDebouncer::new(ms(500));

        debouncer.update(title("sort"));
        assert_eq!(rx.recv().await.unwrap(), title("sort"));
        assert!(debouncer.pending().is_none());

        assert!(!debouncer.update(title("sort")));
        sleep(ms(1000)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_dispatches_immediately() {
        let (mut debouncer, mut rx) = SearchDebouncer::new(ms(500));
        let start = Instant::now();

        debouncer.update(title("sort"));
        sleep(ms(100)).await;
        debouncer.clear().await;

        let query = rx.recv().await.unwrap();
        assert!(query.is_empty());
        assert_eq!(start.elapsed(), ms(100));

        // The superseded "sort" dispatch never arrives
        sleep(ms(1000)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending() {
        let (mut debouncer, mut rx) = SearchDebouncer::new(ms(500));

        debouncer.update(title("sort"));
        assert_eq!(debouncer.pending(), Some(&title("sort")));
        debouncer.cancel();
        assert!(debouncer.pending().is_none());

        sleep(ms(1000)).await;
        assert!(rx.try_recv().is_err());
    }
}
