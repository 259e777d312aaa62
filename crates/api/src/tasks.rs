use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// In-flight invocations. Shutdown waits for them so no accepted command is
/// dropped without its reply.
#[derive(Clone, Default)]
pub struct InvocationTasks {
    set: Arc<Mutex<JoinSet<()>>>,
}

impl InvocationTasks {
    pub async fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().await;
        // Reap finished tasks so the set only holds running ones.
        while let Some(res) = set.try_join_next() {
            log_join_error(res);
        }
        set.spawn(fut);
    }

    pub async fn in_flight(&self) -> usize {
        self.set.lock().await.len()
    }

    /// Waits for every spawned invocation. Returns how many were awaited.
    pub async fn drain(&self) -> usize {
        let mut set = self.set.lock().await;
        let mut drained = 0;
        while let Some(res) = set.join_next().await {
            log_join_error(res);
            drained += 1;
        }
        drained
    }
}

fn log_join_error(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        tracing::error!(error = %e, "invocation task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn drain_waits_for_running_invocations() {
        let tasks = InvocationTasks::default();
        let done = Arc::new(AtomicBool::new(false));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let flag = done.clone();
        tasks
            .spawn(async move {
                let _ = release_rx.await;
                flag.store(true, Ordering::SeqCst);
            })
            .await;
        assert_eq!(tasks.in_flight().await, 1);

        let drainer = tokio::spawn({
            let tasks = tasks.clone();
            async move { tasks.drain().await }
        });
        tokio::task::yield_now().await;
        assert!(!done.load(Ordering::SeqCst));

        release_tx.send(()).unwrap();
        assert_eq!(drainer.await.unwrap(), 1);
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(tasks.in_flight().await, 0);
    }

    #[tokio::test]
    async fn finished_tasks_are_reaped_on_spawn() {
        let tasks = InvocationTasks::default();
        tasks.spawn(async {}).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        tasks
            .spawn(std::future::pending::<()>())
            .await;
        assert_eq!(tasks.in_flight().await, 1);
    }
}
