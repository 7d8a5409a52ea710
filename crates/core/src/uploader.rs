//! Upload entry point and batch driver.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::campaign::{today_display_date, SkippedRow, SourceRow, TaskPlanner, UploadResult, UploadTask};
use crate::report::{Notifier, ResultSink, RowSource, RowSourceError};
use crate::scheduler::{
    collect_results, empty_batch_message, run_pool, summarize, TaskRunner, DEFAULT_POOL_SIZE,
};

/// Run every task and return one result per task, sorted by row id.
pub async fn upload(
    runner: Arc<dyn TaskRunner>,
    tasks: Vec<UploadTask>,
    pool_size: usize,
) -> Vec<UploadResult> {
    let row_ids: Vec<u32> = tasks.iter().map(|t| t.row_id).collect();
    let started = Instant::now();
    info!(tasks = row_ids.len(), pool_size, "Starting upload");

    let results = run_pool(runner, tasks, pool_size).await;
    let results = collect_results(&row_ids, results);

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        succeeded = results.iter().filter(|r| r.is_success()).count(),
        "Upload finished"
    );
    results
}

/// Outcome of one batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub display_date: String,
    pub results: Vec<UploadResult>,
    pub skipped: Vec<SkippedRow>,
    pub succeeded: usize,
    pub failed: usize,
    /// Text sent to the notifier.
    pub summary: String,
}

/// Plans rows, uploads the tasks, records results and notifies.
pub struct BatchUploader {
    planner: TaskPlanner,
    runner: Arc<dyn TaskRunner>,
    sinks: Vec<Arc<dyn ResultSink>>,
    notifier: Option<Arc<dyn Notifier>>,
    pool_size: usize,
}

impl BatchUploader {
    pub fn new(planner: TaskPlanner, runner: Arc<dyn TaskRunner>) -> Self {
        Self {
            planner,
            runner,
            sinks: Vec::new(),
            notifier: None,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Read rows from `source` and run them as one batch.
    pub async fn run_source(
        &self,
        source: &dyn RowSource,
        display_date: Option<&str>,
    ) -> Result<BatchReport, RowSourceError> {
        let rows = source.rows().await?;
        Ok(self.run_batch(&rows, display_date, None).await)
    }

    /// Run one batch. `display_date` defaults to today; `pool_size`
    /// overrides the configured size.
    pub async fn run_batch(
        &self,
        rows: &[SourceRow],
        display_date: Option<&str>,
        pool_size: Option<usize>,
    ) -> BatchReport {
        let batch_id = Uuid::new_v4().to_string();
        let span = info_span!("batch", id = %batch_id);
        self.run_batch_in_span(batch_id, rows, display_date, pool_size)
            .instrument(span)
            .await
    }

    async fn run_batch_in_span(
        &self,
        batch_id: String,
        rows: &[SourceRow],
        display_date: Option<&str>,
        pool_size: Option<usize>,
    ) -> BatchReport {
        let display_date = display_date
            .map(|d| d.trim().replace('/', "-"))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(today_display_date);

        let plan = self.planner.plan(rows, &display_date);
        info!(
            rows = rows.len(),
            tasks = plan.tasks.len(),
            skipped = plan.skipped.len(),
            "Planned batch"
        );

        if plan.tasks.is_empty() {
            let summary = empty_batch_message(&display_date);
            self.notify(&summary).await;
            return BatchReport {
                batch_id,
                display_date,
                results: Vec::new(),
                skipped: plan.skipped,
                succeeded: 0,
                failed: 0,
                summary,
            };
        }

        let pool_size = pool_size.unwrap_or(self.pool_size).max(1);
        let results = upload(self.runner.clone(), plan.tasks, pool_size).await;

        for sink in &self.sinks {
            if let Err(e) = sink.record(&batch_id, &results).await {
                warn!("Failed to record batch results: {}", e);
            }
        }

        let summary = summarize(&results);
        self.notify(&summary).await;

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        BatchReport {
            batch_id,
            display_date,
            failed: results.len() - succeeded,
            succeeded,
            results,
            skipped: plan.skipped,
            summary,
        }
    }

    async fn notify(&self, summary: &str) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(summary).await {
                warn!("Failed to send batch notification: {}", e);
            }
        }
    }
}
