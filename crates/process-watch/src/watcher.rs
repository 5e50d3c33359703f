//! The watcher loop and its registration table.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::process::Child;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::WatchError;

/// Identifies one registration.
pub type WatchId = u64;

/// Callback fired when a watched process has finished.
pub type OnComplete = Box<dyn FnOnce(Completion) + Send + 'static>;

/// How a watched process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process exited on its own (successfully or not).
    Exited(ExitStatus),
    /// The deadline passed; the process was killed.
    TimedOut,
    /// The watcher shut down first; the process was killed.
    Cancelled,
    /// Querying the exit status failed.
    WaitFailed(String),
}

/// Delivered to [`OnComplete`] once per registration.
#[derive(Debug, Clone)]
pub struct Completion {
    pub id: WatchId,
    pub output_path: PathBuf,
    pub outcome: ProcessOutcome,
}

impl Completion {
    /// Returns `true` if the process exited with status zero.
    pub fn success(&self) -> bool {
        matches!(&self.outcome, ProcessOutcome::Exited(status) if status.success())
    }
}

/// Watcher tuning.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Deadline applied by [`ProcessCompletionWatcher::watch`].
    pub default_timeout: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
        }
    }
}

struct Registration {
    id: WatchId,
    child: Child,
    output_path: PathBuf,
    on_complete: OnComplete,
    /// `None` when the timeout is too large to represent.
    deadline: Option<Instant>,
}

/// Callback half of a registration, held in the table while the process runs.
struct Pending {
    output_path: PathBuf,
    on_complete: OnComplete,
}

impl Pending {
    fn complete(self, id: WatchId, outcome: ProcessOutcome) {
        tracing::debug!(
            id,
            output = %self.output_path.display(),
            ?outcome,
            "watched process completed"
        );
        (self.on_complete)(Completion {
            id,
            output_path: self.output_path,
            outcome,
        });
    }
}

type ExitFuture = Pin<Box<dyn Future<Output = (WatchId, ProcessOutcome)> + Send>>;

/// Tracks in-flight child processes from a single task.
///
/// Spawned on an explicit runtime handle; share it as `Arc<Self>`.
pub struct ProcessCompletionWatcher {
    tx: mpsc::UnboundedSender<Registration>,
    next_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    default_timeout: Duration,
    cancel: CancellationToken,
}

impl ProcessCompletionWatcher {
    /// Starts the watcher loop on `handle`.
    pub fn spawn(handle: &Handle, config: WatcherConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));

        handle.spawn(run_loop(rx, cancel.clone(), Arc::clone(&in_flight)));

        Arc::new(Self {
            tx,
            next_id: AtomicU64::new(1),
            in_flight,
            default_timeout: config.default_timeout,
            cancel,
        })
    }

    /// Registers `child` with the default deadline.
    pub fn watch(
        &self,
        child: Child,
        output_path: impl Into<PathBuf>,
        on_complete: OnComplete,
    ) -> Result<WatchId, WatchError> {
        self.watch_with_timeout(child, output_path, self.default_timeout, on_complete)
    }

    /// Registers `child`; `on_complete` fires exactly once from the watcher
    /// task after the process exits, times out or the watcher shuts down.
    ///
    /// On error the callback is dropped without firing.
    pub fn watch_with_timeout(
        &self,
        child: Child,
        output_path: impl Into<PathBuf>,
        timeout: Duration,
        on_complete: OnComplete,
    ) -> Result<WatchId, WatchError> {
        if self.cancel.is_cancelled() {
            return Err(WatchError::Stopped);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let output_path = output_path.into();
        tracing::debug!(id, output = %output_path.display(), "watching process");

        self.tx
            .send(Registration {
                id,
                child,
                output_path,
                on_complete,
                deadline: Instant::now().checked_add(timeout),
            })
            .map_err(|_| WatchError::Stopped)?;
        Ok(id)
    }

    /// Registers `child` and resolves once it has completed.
    pub async fn wait(
        &self,
        child: Child,
        output_path: &Path,
        timeout: Duration,
    ) -> Result<Completion, WatchError> {
        self.wait_with(child, output_path, timeout, ())
            .await
            .map(|(completion, ())| completion)
    }

    /// Like [`wait`](Self::wait), but `held` travels with the registration
    /// and is handed back on completion.
    ///
    /// If this future is dropped first, `held` is dropped by the watcher once
    /// the process has ended, never earlier.
    pub async fn wait_with<T: Send + 'static>(
        &self,
        child: Child,
        output_path: &Path,
        timeout: Duration,
        held: T,
    ) -> Result<(Completion, T), WatchError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.watch_with_timeout(
            child,
            output_path,
            timeout,
            Box::new(move |completion| {
                let _ = done_tx.send((completion, held));
            }),
        )?;
        done_rx.await.map_err(|_| WatchError::Stopped)
    }

    /// Number of registrations the loop currently holds.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Stops the loop. Outstanding processes are killed and completed
    /// with [`ProcessOutcome::Cancelled`].
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ProcessCompletionWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_loop(
    mut rx: mpsc::UnboundedReceiver<Registration>,
    cancel: CancellationToken,
    in_flight: Arc<AtomicUsize>,
) {
    let mut table: HashMap<WatchId, Pending> = HashMap::new();
    let mut exits: FuturesUnordered<ExitFuture> = FuturesUnordered::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            reg = rx.recv() => match reg {
                Some(reg) => register(reg, &mut table, &mut exits, &cancel),
                None => break,
            },
            Some((id, outcome)) = exits.next(), if !exits.is_empty() => {
                if let Some(pending) = table.remove(&id) {
                    pending.complete(id, outcome);
                }
            }
        }
        in_flight.store(table.len(), Ordering::Relaxed);
    }

    // Every exit future observes the cancelled token, kills its process and
    // resolves. Registrations that raced the shutdown are completed too.
    cancel.cancel();
    rx.close();
    while let Ok(reg) = rx.try_recv() {
        register(reg, &mut table, &mut exits, &cancel);
    }
    while let Some((id, outcome)) = exits.next().await {
        if let Some(pending) = table.remove(&id) {
            pending.complete(id, outcome);
        }
    }
    in_flight.store(0, Ordering::Relaxed);
    tracing::debug!("process watcher stopped");
}

fn register(
    reg: Registration,
    table: &mut HashMap<WatchId, Pending>,
    exits: &mut FuturesUnordered<ExitFuture>,
    cancel: &CancellationToken,
) {
    let Registration {
        id,
        child,
        output_path,
        on_complete,
        deadline,
    } = reg;
    table.insert(
        id,
        Pending {
            output_path,
            on_complete,
        },
    );
    exits.push(Box::pin(wait_for_exit(id, child, deadline, cancel.clone())));
}

/// Resolves when the process exits (runtime exit notification), its
/// deadline passes or the watcher shuts down. The latter two kill and reap it.
async fn wait_for_exit(
    id: WatchId,
    mut child: Child,
    deadline: Option<Instant>,
    cancel: CancellationToken,
) -> (WatchId, ProcessOutcome) {
    let expired = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };

    let stopped = tokio::select! {
        status = child.wait() => {
            let outcome = match status {
                Ok(status) => ProcessOutcome::Exited(status),
                Err(e) => ProcessOutcome::WaitFailed(e.to_string()),
            };
            return (id, outcome);
        }
        _ = expired => ProcessOutcome::TimedOut,
        _ = cancel.cancelled() => ProcessOutcome::Cancelled,
    };

    // The process may have exited in the same instant.
    if let Ok(Some(status)) = child.try_wait() {
        return (id, ProcessOutcome::Exited(status));
    }

    if stopped == ProcessOutcome::TimedOut {
        tracing::warn!(id, "process timed out, killing");
    }
    match child.start_kill() {
        Ok(()) => {
            if let Err(e) = child.wait().await {
                tracing::warn!(id, error = %e, "failed to reap killed process");
            }
        }
        Err(e) => tracing::warn!(id, error = %e, "failed to kill process"),
    }
    (id, stopped)
}
