use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle on a background refresh cycle.
#[derive(Debug)]
pub(super) struct RefreshTask {
    handle: JoinHandle<()>,
    done: watch::Receiver<bool>,
}

impl RefreshTask {
    pub(super) fn new(handle: JoinHandle<()>, done: watch::Receiver<bool>) -> Self {
        Self { handle, done }
    }

    /// The task was spawned and has neither reported completion nor exited.
    pub(super) fn is_running(&self) -> bool {
        !*self.done.borrow() && !self.handle.is_finished()
    }

    /// Returns a receiver that flips to `true` once the cycle has ended.
    pub(super) fn subscribe(&self) -> watch::Receiver<bool> {
        self.done.clone()
    }
}

/// Waits until `done` flips, or its sender is gone.
pub(super) async fn wait_done(mut done: watch::Receiver<bool>) {
    // A dropped sender means the task ended without reporting.
    let _ = done.wait_for(|finished| *finished).await;
}
