use std::fmt;

use tokio::task::JoinHandle;

/// Where an agent is in the cache lifecycle.
///
/// `Disconnected → Loading → Active → Saving → Disconnected`. States of
/// different agents are independent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    /// Checkpoint load scheduled or in flight.
    Loading,
    /// Checkpoint installed; the agent's table is live in the store.
    Active,
    /// Table evicted and being written out.
    Saving,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Loading => "loading",
            Self::Active => "active",
            Self::Saving => "saving",
        };
        f.write_str(s)
    }
}

/// How a connect-triggered load ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A checkpoint with `entries` objects was installed.
    Restored { entries: usize },
    /// No checkpoint existed; an empty table was installed.
    Fresh,
    /// The checkpoint was corrupt and deleted; an empty table was installed.
    Recovered,
    /// The checkpoint could not be read; an empty table was installed.
    Unavailable,
    /// The agent disconnected first; the result was discarded.
    Cancelled,
    /// The agent was already loading or active; nothing was scheduled.
    Skipped,
}

/// What a disconnect did with the agent's table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The table was written out.
    Saved { entries: usize },
    /// The write failed. The table is gone from memory regardless.
    SaveFailed { reason: String },
    /// The agent left before its load finished; nothing was saved.
    CancelledLoad,
    /// The session was transitional; the table was dropped unsaved.
    Transitional,
    /// The agent had no table to save.
    NothingCached,
}

/// Handle to a scheduled checkpoint load.
///
/// Dropping it does not cancel the load. Await [`LoadHandle::wait`] to
/// observe when the agent's table went live.
#[derive(Debug)]
pub struct LoadHandle {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Ready(LoadOutcome),
    Pending(JoinHandle<LoadOutcome>),
}

impl LoadHandle {
    pub(crate) fn ready(outcome: LoadOutcome) -> Self {
        Self {
            inner: Inner::Ready(outcome),
        }
    }

    pub(crate) fn pending(task: JoinHandle<LoadOutcome>) -> Self {
        Self {
            inner: Inner::Pending(task),
        }
    }

    /// Returns `true` once the load has finished or was never scheduled.
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            Inner::Ready(_) => true,
            Inner::Pending(task) => task.is_finished(),
        }
    }

    /// Wait for the load to finish.
    ///
    /// An aborted load reports [`LoadOutcome::Cancelled`].
    pub async fn wait(self) -> LoadOutcome {
        match self.inner {
            Inner::Ready(outcome) => outcome,
            Inner::Pending(task) => task.await.unwrap_or(LoadOutcome::Cancelled),
        }
    }
}
