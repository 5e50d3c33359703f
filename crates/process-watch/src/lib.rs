//! Non-blocking completion tracking for external processes.
//!
//! A single watcher task owns every registered child process. It sleeps on
//! the runtime's exit notification for each of them (plus deadlines and
//! shutdown) and fires each registration's completion callback exactly
//! once, from the watcher task itself.

mod watcher;

pub use watcher::{
    Completion, OnComplete, ProcessCompletionWatcher, ProcessOutcome, WatchId, WatcherConfig,
};

/// Errors produced by the process watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("process watcher is not running")]
    Stopped,
}
