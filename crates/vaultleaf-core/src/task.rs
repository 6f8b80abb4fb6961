//! One-shot asynchronous results.
//!
//! Background work (document extraction, OCR, speech synthesis) hands back a
//! [`Pending`] that the owner polls from the interactive thread. Nothing is
//! ever delivered to a callback on a foreign thread: whoever holds the
//! `Pending` decides when and where the result is consumed.

use crate::error::{Result, VaultError};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use tracing::{debug, error};

/// Receiving half of a one-shot result.
#[derive(Debug)]
pub struct Pending<T> {
    label: &'static str,
    rx: Receiver<Result<T>>,
}

/// Sending half; consumed by the first `complete`.
#[derive(Debug)]
pub struct Completer<T> {
    label: &'static str,
    tx: Sender<Result<T>>,
}

pub fn pending<T>(label: &'static str) -> (Completer<T>, Pending<T>) {
    let (tx, rx) = mpsc::channel();
    (Completer { label, tx }, Pending { label, rx })
}

/// A `Pending` that is already resolved.
pub fn ready<T>(label: &'static str, result: Result<T>) -> Pending<T> {
    let (completer, pending) = pending(label);
    completer.complete(result);
    pending
}

impl<T> Completer<T> {
    pub fn complete(self, result: Result<T>) {
        if self.tx.send(result).is_err() {
            debug!(task = self.label, "Result dropped; nobody is waiting any more");
        }
    }
}

impl<T> Pending<T> {
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Non-blocking check. A completer dropped without answering resolves to
    /// `Cancelled`.
    pub fn poll(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(VaultError::Cancelled)),
        }
    }

    /// Block until the result arrives.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().unwrap_or(Err(VaultError::Cancelled))
    }
}

/// Run blocking work on a named background thread.
pub fn spawn_background<T, F>(label: &'static str, work: F) -> Pending<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (completer, pending) = pending(label);
    let spawned = thread::Builder::new()
        .name(format!("bg-{label}"))
        .spawn(move || completer.complete(work()));
    if let Err(err) = spawned {
        error!(task = label, "Failed to spawn background worker: {err}");
        return ready(label, Err(VaultError::io("spawning background worker", err)));
    }
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn background_result_is_delivered_to_the_poller() {
        let mut pending = spawn_background("sum", || Ok(2 + 2));
        let mut result = None;
        for _ in 0..500 {
            if let Some(r) = pending.poll() {
                result = Some(r);
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(result.expect("worker should finish").expect("ok"), 4);
    }

    #[test]
    fn dropped_completer_reads_as_cancelled() {
        let (completer, mut pending) = pending::<()>("dropped");
        assert!(pending.poll().is_none());
        drop(completer);
        assert!(matches!(pending.poll(), Some(Err(VaultError::Cancelled))));
    }

    #[test]
    fn wait_returns_worker_error() {
        let pending = spawn_background::<(), _>("fails", || Err(VaultError::NothingToSpeak));
        assert!(matches!(pending.wait(), Err(VaultError::NothingToSpeak)));
    }
}
