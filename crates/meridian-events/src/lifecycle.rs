//! Dispatcher lifecycle: `Uninitialized → Running → Draining → Stopped`.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::error::DispatchError;

/// Lifecycle state of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherState {
    /// Created but not started; dispatch is rejected.
    Uninitialized,
    /// Accepting dispatches.
    Running,
    /// Shutdown observed; in-flight deliveries finishing, new ones rejected.
    Draining,
    /// All deliveries finished after shutdown.
    Stopped,
}

impl DispatcherState {
    /// Stable snake_case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Gate {
    state: DispatcherState,
    in_flight: usize,
}

/// State plus in-flight accounting, updated under one lock so that a
/// dispatch is either admitted before draining begins or rejected.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    gate: Mutex<Gate>,
    state_tx: watch::Sender<DispatcherState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (state_tx, _) = watch::channel(DispatcherState::Uninitialized);
        Self {
            gate: Mutex::new(Gate {
                state: DispatcherState::Uninitialized,
                in_flight: 0,
            }),
            state_tx,
        }
    }

    fn transition(&self, gate: &mut Gate, to: DispatcherState) {
        let from = gate.state;
        gate.state = to;
        self.state_tx.send_replace(to);
        info!(from = %from, to = %to, in_flight = gate.in_flight, "Dispatcher state changed");
    }

    pub(crate) fn state(&self) -> DispatcherState {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner).state
    }

    pub(crate) fn watch(&self) -> watch::Receiver<DispatcherState> {
        self.state_tx.subscribe()
    }

    /// Move to `Running`. Starting a running dispatcher is a no-op.
    pub(crate) fn start(&self) -> Result<(), DispatchError> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        match gate.state {
            DispatcherState::Uninitialized => {
                self.transition(&mut gate, DispatcherState::Running);
                Ok(())
            },
            DispatcherState::Running => Ok(()),
            DispatcherState::Draining | DispatcherState::Stopped => Err(DispatchError::Stopped),
        }
    }

    /// Admit one dispatch, or reject it if not running.
    ///
    /// The returned guard is owned so it can move into the task that
    /// performs the deliveries.
    pub(crate) fn enter(self: &Arc<Self>) -> Result<InFlight, DispatchError> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        match gate.state {
            DispatcherState::Running => {
                gate.in_flight = gate.in_flight.saturating_add(1);
                Ok(InFlight {
                    lifecycle: Arc::clone(self),
                })
            },
            DispatcherState::Uninitialized => Err(DispatchError::NotStarted),
            DispatcherState::Draining | DispatcherState::Stopped => Err(DispatchError::Stopped),
        }
    }

    /// Stop admitting dispatches. Stops immediately if nothing is in flight.
    pub(crate) fn begin_drain(&self) {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if gate.state != DispatcherState::Running {
            return;
        }
        self.transition(&mut gate, DispatcherState::Draining);
        if gate.in_flight == 0 {
            self.transition(&mut gate, DispatcherState::Stopped);
        }
    }

    fn leave(&self) {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        gate.in_flight = gate.in_flight.saturating_sub(1);
        if gate.state == DispatcherState::Draining && gate.in_flight == 0 {
            self.transition(&mut gate, DispatcherState::Stopped);
        }
    }

    pub(crate) async fn wait_stopped(&self) {
        let mut rx = self.watch();
        // The sender lives as long as `self`, so this only returns once stopped.
        let _ = rx.wait_for(|state| *state == DispatcherState::Stopped).await;
    }
}

/// Marks one admitted dispatch; released on drop.
#[derive(Debug)]
pub(crate) struct InFlight {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.lifecycle.leave();
    }
}
