//! # Execution contexts for context-affine subscribers.
//!
//! An [`ExecutionContext`] is anything that can accept a job and run it
//! later on a thread it owns: a UI event loop, an actor mailbox, a
//! single-threaded runtime. The bus does not know how the host resolves its
//! "current" context; the host attaches one to a channel or registry.
//!
//! [`context_loop`] builds a ready-made context from an unbounded queue:
//!
//! ```text
//! publisher thread                    context thread
//!   ContextHandle::post(job) ──► [unbounded mpsc] ──► ContextLoop
//!                                                      ├─ run_pending()   (drain, non-blocking)
//!                                                      ├─ blocking_run()  (until handles dropped)
//!                                                      └─ run(cancel)     (async loop)
//! ```
//!
//! ## Rules
//! - Posting never blocks.
//! - Jobs run in posting order, one at a time.
//! - A panicking job is logged and does not stop the loop.

use std::borrow::Cow;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::delivery::{panic_message, Job};

/// Target for context-affine delivery.
pub trait ExecutionContext: Send + Sync {
    /// Queues `job`. Returns `false` if the context no longer accepts work.
    fn post(&self, job: Job) -> bool;

    /// Human-readable name (for logs).
    fn name(&self) -> &str;
}

/// Creates a queue-backed context and the loop that drives it.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use commbus::{context_loop, EventChannel, SubscribeOptions, ThreadOption};
///
/// let (handle, mut ui) = context_loop("ui");
/// let channel: EventChannel<String> = EventChannel::new();
/// channel.set_context(Arc::new(handle));
///
/// let token = channel
///     .subscribe_with_fn(|s: &String| println!("ui got {s}"),
///         SubscribeOptions::new().thread(ThreadOption::Context))
///     .unwrap();
///
/// channel.publish("hello".to_string()).unwrap();
/// assert_eq!(ui.run_pending(), 1);
/// # token.unsubscribe();
/// ```
pub fn context_loop(name: impl Into<Cow<'static, str>>) -> (ContextHandle, ContextLoop) {
    let name: Arc<str> = Arc::from(name.into().as_ref());
    let (tx, rx) = mpsc::unbounded_channel::<Job>();
    (
        ContextHandle {
            name: Arc::clone(&name),
            tx,
        },
        ContextLoop { name, rx },
    )
}

/// Posting side of a [`context_loop`]. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ContextHandle {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Job>,
}

impl ContextHandle {
    /// True once the loop has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ExecutionContext for ContextHandle {
    fn post(&self, job: Job) -> bool {
        self.tx.send(job).is_ok()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Driving side of a [`context_loop`]; runs jobs on the thread that polls it.
pub struct ContextLoop {
    name: Arc<str>,
    rx: mpsc::UnboundedReceiver<Job>,
}

impl ContextLoop {
    /// Context name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs every job queued so far and returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            self.execute(job);
            ran += 1;
        }
        ran
    }

    /// Runs jobs on the current thread until every handle is dropped.
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_run(mut self) {
        while let Some(job) = self.rx.blocking_recv() {
            self.execute(job);
        }
        tracing::debug!(context = %self.name, "context loop closed");
    }

    /// Runs jobs until `cancel` fires or every handle is dropped.
    ///
    /// Jobs still queued at cancellation are dropped without running.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => self.execute(job),
                    None => break,
                }
            }
        }
        tracing::debug!(context = %self.name, "context loop stopped");
    }

    fn execute(&self, job: Job) {
        if let Err(panic_err) = catch_unwind(AssertUnwindSafe(job)) {
            tracing::warn!(
                context = %self.name,
                panic = %panic_message(&*panic_err),
                "context job panicked"
            );
        }
    }
}

impl std::fmt::Debug for ContextLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLoop").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_run_pending_runs_in_order() {
        let (handle, mut ctx) = context_loop("ordered");
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            assert!(handle.post(Box::new(move || log.lock().push(i))));
        }
        assert_eq!(ctx.run_pending(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert_eq!(ctx.run_pending(), 0);
    }

    #[test]
    fn test_panic_does_not_stop_loop() {
        let (handle, mut ctx) = context_loop("panicky");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        handle.post(Box::new(|| panic!("job failed")));
        handle.post(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ctx.run_pending(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_post_after_loop_dropped_fails() {
        let (handle, ctx) = context_loop("gone");
        drop(ctx);
        assert!(handle.is_closed());
        assert!(!handle.post(Box::new(|| {})));
        assert_eq!(handle.name(), "gone");
    }

    #[test]
    fn test_blocking_run_on_dedicated_thread() {
        let (handle, ctx) = context_loop("worker");
        let worker = std::thread::spawn(move || {
            ctx.blocking_run();
        });
        let (tx, rx) = std::sync::mpsc::channel();
        handle.post(Box::new(move || {
            tx.send(std::thread::current().id()).unwrap();
        }));
        let ran_on = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(ran_on, worker.thread().id());
        drop(handle);
        worker.join().unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (handle, ctx) = context_loop("async");
        let cancel = CancellationToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        handle.post(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        let stop = cancel.clone();
        let runner = tokio::spawn(ctx.run(cancel));
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.cancel();
        runner.await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(handle.is_closed());
    }
}
