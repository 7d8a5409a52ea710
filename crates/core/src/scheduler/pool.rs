//! Fixed-size worker pool over a shared task queue.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::campaign::{UploadResult, UploadTask};

/// Default number of concurrent sagas.
pub const DEFAULT_POOL_SIZE: usize = 3;

/// Executes one task to completion.
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    async fn run(&self, task: UploadTask) -> UploadResult;
}

/// Run `tasks` on `pool_size` workers.
///
/// Each worker takes one task at a time from the queue and runs it to a
/// terminal result before taking the next. Results come back in completion
/// order; exactly one per task, a panicking task included.
pub async fn run_pool(
    runner: Arc<dyn TaskRunner>,
    tasks: Vec<UploadTask>,
    pool_size: usize,
) -> Vec<UploadResult> {
    if tasks.is_empty() {
        return Vec::new();
    }
    let workers = pool_size.max(1).min(tasks.len());

    let (tx, rx) = mpsc::channel(tasks.len());
    for task in tasks {
        // Capacity equals the task count, so this never waits.
        if tx.send(task).await.is_err() {
            break;
        }
    }
    drop(tx);
    let queue = Arc::new(Mutex::new(rx));

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let queue = queue.clone();
            let runner = runner.clone();
            tokio::spawn(async move { worker_loop(worker, queue, runner).await })
        })
        .collect();

    let mut results = Vec::new();
    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok(worker_results) => results.extend(worker_results),
            Err(e) => error!("Worker task ended abnormally: {}", e),
        }
    }
    results
}

async fn worker_loop(
    worker: usize,
    queue: Arc<Mutex<mpsc::Receiver<UploadTask>>>,
    runner: Arc<dyn TaskRunner>,
) -> Vec<UploadResult> {
    let mut results = Vec::new();
    loop {
        let next = queue.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };
        let row_id = task.row_id;
        debug!(worker, row = row_id, "Worker picked up task");

        let runner = runner.clone();
        let result = match tokio::spawn(async move { runner.run(task).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(worker, row = row_id, "Task panicked: {}", e);
                UploadResult::failed(row_id, format!("Task aborted unexpectedly: {}", e))
            }
        };
        results.push(result);
    }
    debug!(worker, completed = results.len(), "Worker finished");
    results
}
