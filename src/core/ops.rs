use crate::core::state::{reduce, Action, RosterState};
use crate::domain::model::Entity;
use crate::utils::error::{Result, RosterError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Shared plumbing for roster stores: the state channel, the write gate,
/// the cancellation flag and the per-operation timeout.
pub(crate) struct StoreCore<T> {
    label: &'static str,
    state: watch::Sender<RosterState<T>>,
    gate: Mutex<()>,
    cancel: watch::Sender<bool>,
    timeout: Duration,
}

impl<T: Entity> StoreCore<T> {
    pub(crate) fn new(label: &'static str, timeout: Duration) -> Self {
        let (state, _) = watch::channel(RosterState::default());
        let (cancel, _) = watch::channel(false);
        Self {
            label,
            state,
            gate: Mutex::new(()),
            cancel,
            timeout,
        }
    }

    pub(crate) fn snapshot(&self) -> RosterState<T> {
        self.state.borrow().clone()
    }

    pub(crate) fn entities(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.state.borrow().entities)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RosterState<T>> {
        self.state.subscribe()
    }

    pub(crate) fn dispatch(&self, action: Action<T>) {
        self.state.send_modify(|state| {
            let next = reduce(state, action);
            *state = next;
        });
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Runs one store operation behind the write gate.
    ///
    /// `work` is responsible for dispatching its own success actions so they
    /// land while the gate is still held. The timeout bounds `work` alone,
    /// not the wait for the gate. Any error, including timeout and
    /// cancellation, is recorded as `Action::Failed` before it is returned.
    pub(crate) async fn run<R, F>(&self, operation: &str, work: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        if self.is_cancelled() {
            return Err(self.fail(operation, RosterError::Cancelled));
        }

        let mut cancelled = self.cancel.subscribe();
        let gated = async {
            let _permit = self.gate.lock().await;
            match tokio::time::timeout(self.timeout, work).await {
                Ok(inner) => inner,
                Err(_) => Err(RosterError::TimeoutError {
                    timeout_ms: self.timeout.as_millis() as u64,
                }),
            }
        };

        let outcome = tokio::select! {
            result = gated => result,
            _ = async {
                let _ = cancelled.wait_for(|flag| *flag).await;
            } => Err(RosterError::Cancelled),
        };

        outcome.map_err(|err| self.fail(operation, err))
    }

    fn fail(&self, operation: &str, err: RosterError) -> RosterError {
        if err.kind() == crate::utils::error::ErrorKind::Cancelled {
            tracing::debug!("{} {} cancelled", self.label, operation);
        } else {
            tracing::warn!(
                "❌ {} {} failed ({}): {}",
                self.label,
                operation,
                err.kind(),
                err
            );
        }
        self.dispatch(Action::Failed(err.clone()));
        err
    }
}
