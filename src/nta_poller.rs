// "Keep last valid value" poller
//
// A poller re-runs an async fetch whenever its arguments change and on a fixed
// cadence. Every run is tagged with a generation; only the result of the
// current generation is applied. Failures keep the previous value and record
// the message. The owner drives the poller (`update`, `pump`, `settled`), so
// all state changes happen on the owner's task.

use futures::future::BoxFuture;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::nta_models::{NTAError, Result};

// ============================================================================
// Cancellation
// ============================================================================

/// Handed to each fetch; flips to cancelled once the run is superseded or torn down.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    fn new(generation: u64) -> Self {
        CancelToken {
            generation,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once the run is obsolete.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(NTAError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

// ============================================================================
// Poller
// ============================================================================

pub type FetchFn<A, T> = Box<dyn Fn(A, CancelToken) -> BoxFuture<'static, Result<T>> + Send + Sync>;

struct PollRun {
    token: CancelToken,
    task: JoinHandle<()>,
}

pub struct Poller<A, T> {
    name: String,
    interval: Duration,
    fetch: FetchFn<A, T>,
    args: Option<A>,
    generation: u64,
    run: Option<PollRun>,
    next_due: Option<Instant>,
    results_tx: mpsc::UnboundedSender<(u64, Result<T>)>,
    results_rx: mpsc::UnboundedReceiver<(u64, Result<T>)>,
    last_valid: Option<T>,
    error: Option<String>,
    loading: bool,
    torn_down: bool,
}

impl<A, T> Poller<A, T>
where
    A: Clone + PartialEq + Send + 'static,
    T: Send + 'static,
{
    pub fn new<F>(name: impl Into<String>, interval: Duration, fetch: F) -> Self
    where
        F: Fn(A, CancelToken) -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
    {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Poller {
            name: name.into(),
            interval,
            fetch: Box::new(fetch),
            args: None,
            generation: 0,
            run: None,
            next_due: None,
            results_tx,
            results_rx,
            last_valid: None,
            error: None,
            loading: false,
            torn_down: false,
        }
    }

    /// Feeds the current arguments. Starts a run right away when they differ
    /// from the last run's or when the interval has elapsed; either way the
    /// cadence restarts from `now`. Returns whether a run was started.
    pub fn update(&mut self, args: A, now: Instant) -> bool {
        if self.torn_down {
            return false;
        }

        let changed = self.args.as_ref() != Some(&args);
        let due = self.next_due.is_none_or(|due| now >= due);
        if changed || due {
            self.start(args, now);
            true
        } else {
            false
        }
    }

    /// Re-runs with the last arguments regardless of the cadence.
    pub fn refresh(&mut self, now: Instant) -> bool {
        match self.args.clone() {
            Some(args) if !self.torn_down => {
                self.start(args, now);
                true
            }
            _ => false,
        }
    }

    fn start(&mut self, args: A, now: Instant) {
        self.cancel_run();
        self.generation += 1;

        let token = CancelToken::new(self.generation);
        let future = (self.fetch)(args.clone(), token.clone());
        let results_tx = self.results_tx.clone();
        let run_token = token.clone();

        let task = tokio::spawn(async move {
            let result = future.await;
            if run_token.is_cancelled() {
                return;
            }
            // The receiver only goes away with the poller itself
            let _ = results_tx.send((run_token.generation(), result));
        });

        debug!("[{}] run #{} started", self.name, self.generation);
        self.args = Some(args);
        self.run = Some(PollRun { token, task });
        self.loading = true;
        self.next_due = Some(now + self.interval);
    }

    fn cancel_run(&mut self) {
        if let Some(run) = self.run.take() {
            run.token.cancel();
            run.task.abort();
        }
    }

    fn apply(&mut self, generation: u64, result: Result<T>) -> bool {
        if self.torn_down || generation != self.generation {
            debug!(
                "[{}] discarding result of superseded run #{}",
                self.name, generation
            );
            return false;
        }

        match result {
            Err(e) if e.is_cancelled() => return false,
            Ok(value) => {
                self.last_valid = Some(value);
                self.error = None;
            }
            Err(e) => {
                warn!("[{}] fetch failed, keeping last value: {}", self.name, e);
                self.error = Some(e.to_string());
            }
        }
        self.run = None;
        self.loading = false;
        true
    }

    /// Applies every run that has already finished. Returns whether state changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok((generation, result)) = self.results_rx.try_recv() {
            changed |= self.apply(generation, result);
        }
        changed
    }

    /// Waits for the next finished run and applies it. Never resolves while
    /// nothing is in flight, which makes it safe to use as a `select!` branch.
    pub async fn settled(&mut self) -> bool {
        match self.results_rx.recv().await {
            Some((generation, result)) => self.apply(generation, result),
            None => std::future::pending().await,
        }
    }

    /// Cancels the in-flight run and stops the cadence. Observable state is
    /// frozen from here on.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.cancel_run();
        self.torn_down = true;
        self.next_due = None;
        self.results_rx.close();
        debug!("[{}] torn down", self.name);
    }
}

impl<A, T> Poller<A, T> {
    pub fn value(&self) -> Option<&T> {
        self.last_valid.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }
}

impl<A, T> Drop for Poller<A, T> {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.token.cancel();
            run.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    type Pending = Arc<Mutex<VecDeque<oneshot::Receiver<Result<u32>>>>>;

    /// Poller whose runs each wait for a value pushed through `controls`.
    fn controlled(interval_secs: u64) -> (Poller<&'static str, u32>, Pending, Arc<Mutex<Vec<&'static str>>>) {
        let pending: Pending = Arc::new(Mutex::new(VecDeque::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let fetch_pending = pending.clone();
        let fetch_seen = seen.clone();

        let poller = Poller::new(
            "test",
            Duration::from_secs(interval_secs),
            move |args: &'static str, _token: CancelToken| {
                fetch_seen.lock().unwrap().push(args);
                let rx = fetch_pending.lock().unwrap().pop_front();
                async move {
                    match rx {
                        Some(rx) => rx.await.unwrap_or(Err(NTAError::Cancelled)),
                        None => Err(NTAError::NetworkError("no scripted response".into())),
                    }
                }
                .boxed()
            },
        );
        (poller, pending, seen)
    }

    fn script(pending: &Pending) -> oneshot::Sender<Result<u32>> {
        let (tx, rx) = oneshot::channel();
        pending.lock().unwrap().push_back(rx);
        tx
    }

    #[tokio::test(start_paused = true)]
    async fn first_update_fetches_immediately() {
        let (mut poller, pending, seen) = controlled(30);
        let reply = script(&pending);
        let t0 = Instant::now();

        assert!(poller.update("0151", t0));
        assert!(poller.is_loading());
        assert_eq!(poller.value(), None);

        reply.send(Ok(7)).unwrap();
        assert!(poller.settled().await);

        assert_eq!(poller.value(), Some(&7));
        assert!(!poller.is_loading());
        assert_eq!(*seen.lock().unwrap(), ["0151"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cadence_and_argument_changes_restart_the_timer() {
        let (mut poller, pending, seen) = controlled(30);
        let t0 = Instant::now();
        let secs = Duration::from_secs;

        let _first = script(&pending);
        assert!(poller.update("a", t0));
        assert!(!poller.update("a", t0 + secs(29)));

        let _second = script(&pending);
        assert!(poller.update("b", t0 + secs(10)));
        assert_eq!(poller.next_due(), Some(t0 + secs(40)));
        assert!(!poller.update("b", t0 + secs(31)));

        let _third = script(&pending);
        assert!(poller.update("b", t0 + secs(40)));
        assert_eq!(*seen.lock().unwrap(), ["a", "b", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_the_last_value_and_success_clears_the_error() {
        let (mut poller, pending, _) = controlled(30);
        let t0 = Instant::now();

        script(&pending).send(Ok(1)).unwrap();
        poller.update("a", t0);
        poller.settled().await;

        script(&pending)
            .send(Err(NTAError::FeedError("server busy".into())))
            .unwrap();
        poller.refresh(t0);
        poller.settled().await;

        assert_eq!(poller.value(), Some(&1));
        assert_eq!(poller.error(), Some("server busy"));
        assert!(!poller.is_loading());

        script(&pending).send(Ok(2)).unwrap();
        poller.refresh(t0);
        poller.settled().await;

        assert_eq!(poller.value(), Some(&2));
        assert_eq!(poller.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_run_never_overwrites_a_newer_result() {
        let (mut poller, pending, _) = controlled(30);
        let t0 = Instant::now();

        let run_a = script(&pending);
        poller.update("a", t0);
        tokio::task::yield_now().await;

        let run_b = script(&pending);
        poller.update("b", t0);

        run_b.send(Ok(2)).unwrap();
        assert!(poller.settled().await);
        assert_eq!(poller.value(), Some(&2));

        // Run A was aborted; even a late answer has nowhere to go
        let _ = run_a.send(Ok(1));
        tokio::task::yield_now().await;
        assert!(!poller.pump());
        assert_eq!(poller.value(), Some(&2));

        // A stale generation reaching the owner is dropped as well
        assert!(!poller.apply(1, Ok(99)));
        assert_eq!(poller.value(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_results_are_silent() {
        let (mut poller, pending, _) = controlled(30);
        let t0 = Instant::now();

        script(&pending).send(Err(NTAError::Cancelled)).unwrap();
        poller.update("a", t0);
        tokio::task::yield_now().await;

        assert!(!poller.pump());
        assert_eq!(poller.error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_freezes_state() {
        let (mut poller, pending, seen) = controlled(30);
        let t0 = Instant::now();

        let reply = script(&pending);
        poller.update("a", t0);
        poller.teardown();

        let _ = reply.send(Ok(5));
        tokio::task::yield_now().await;

        assert!(!poller.pump());
        assert_eq!(poller.value(), None);
        assert_eq!(poller.next_due(), None);
        assert!(!poller.update("b", t0 + Duration::from_secs(60)));
        assert!(!poller.refresh(t0));
        assert_eq!(*seen.lock().unwrap(), ["a"]);
    }
}
