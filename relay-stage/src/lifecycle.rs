use shared::http::ShutdownOutcome;
use std::sync::Arc;
use tokio::sync::watch;

/// Phases of a stage process. States only move forward and `Stopped` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Routes and listeners are being set up.
    Starting,
    /// Accepting connections.
    Serving,
    /// No longer accepting; waiting for in-flight requests up to the shutdown timeout.
    ShuttingDown,
    Stopped(ShutdownOutcome),
}

impl LifecycleState {
    fn rank(&self) -> u8 {
        match self {
            LifecycleState::Starting => 0,
            LifecycleState::Serving => 1,
            LifecycleState::ShuttingDown => 2,
            LifecycleState::Stopped(_) => 3,
        }
    }

    pub fn can_transition_to(&self, next: &LifecycleState) -> bool {
        next.rank() > self.rank()
    }
}

/// Shared view of the current [`LifecycleState`]. Clones observe the same state.
#[derive(Clone)]
pub struct Lifecycle {
    state: Arc<watch::Sender<LifecycleState>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Lifecycle {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn is_serving(&self) -> bool {
        self.state() == LifecycleState::Serving
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Moves to `next` if that is a forward step. Returns whether the state changed.
    pub(crate) fn transition(&self, next: LifecycleState) -> bool {
        self.state.send_if_modified(|current| {
            if current.can_transition_to(&next) {
                tracing::debug!(from = ?current, to = ?next, "lifecycle transition");
                *current = next;
                true
            } else {
                tracing::warn!(
                    from = ?current,
                    to = ?next,
                    "ignoring invalid lifecycle transition"
                );
                false
            }
        })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
