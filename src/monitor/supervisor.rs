//! Task supervision
//!
//! One root cancellation token per engine lifecycle; each scan task gets a
//! child token. Stop cancels the root and awaits every task's exit.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub(crate) struct Supervisor {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub fn spawn(&mut self, future: impl Future<Output = ()> + Send + 'static) {
        self.tasks.push(tokio::spawn(future));
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal cancellation and wait until every task has exited. Safe to
    /// call more than once.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "monitoring task aborted");
            }
        }
    }
}
