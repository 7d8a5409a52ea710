//! Retry executor and the per-operation policy table.

mod executor;
mod policy;

pub use executor::{execute_with_policy, Attempt, RetryError, RetryExecutor, Retryable};
pub use policy::{OperationClass, RetryPolicy, RetryPolicyTable};
