//! Bounded-concurrency task scheduling.
//!
//! [`run_pool`] executes tasks on a fixed number of workers and returns
//! results in completion order; [`collect_results`] restores row order.

mod collector;
mod pool;

pub use collector::{
    collect_results, empty_batch_message, summarize, truncate_detail, MAX_DETAIL_LEN,
    MAX_SUMMARY_ERRORS_LEN,
};
pub use pool::{run_pool, TaskRunner, DEFAULT_POOL_SIZE};
