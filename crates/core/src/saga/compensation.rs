//! Best-effort reverse-order deletion of created resources.

use serde::Serialize;
use tracing::{debug, warn};

use crate::metrics;
use crate::platform::{AdsPlatform, ResourceHandle};
use crate::retry::{OperationClass, RetryExecutor};

/// Result of a compensation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompensationResult {
    /// Handles deleted, in deletion order.
    pub deleted: Vec<ResourceHandle>,
    /// One message per failed delete.
    pub errors: Vec<String>,
    /// Whether every delete succeeded.
    pub success: bool,
}

/// Delete `handles` newest first.
///
/// Each delete runs under the `delete` retry policy. A failure is logged and
/// recorded, and the remaining handles are still deleted. Never fails.
pub async fn compensate(
    platform: &dyn AdsPlatform,
    retry: &RetryExecutor,
    handles: &[ResourceHandle],
) -> CompensationResult {
    let mut result = CompensationResult::default();

    for handle in handles.iter().rev() {
        let outcome = retry
            .execute(OperationClass::Delete, |_| {
                platform.delete(handle.kind, &handle.id)
            })
            .await;

        match outcome {
            Ok(()) => {
                debug!(kind = %handle.kind, id = %handle.id, "Deleted");
                metrics::COMPENSATION_DELETES
                    .with_label_values(&[handle.kind.as_str(), "deleted"])
                    .inc();
                result.deleted.push(handle.clone());
            }
            Err(e) => {
                warn!(kind = %handle.kind, id = %handle.id, error = %e, "Compensating delete failed");
                metrics::COMPENSATION_DELETES
                    .with_label_values(&[handle.kind.as_str(), "failed"])
                    .inc();
                result
                    .errors
                    .push(format!("Failed to delete {} {}: {}", handle.kind, handle.id, e));
            }
        }
    }

    result.success = result.errors.is_empty();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformError, ResourceKind};
    use crate::retry::{RetryPolicy, RetryPolicyTable};
    use crate::testing::MockAdsPlatform;
    use std::time::Duration;

    fn executor() -> RetryExecutor {
        RetryExecutor::new(RetryPolicyTable::uniform(RetryPolicy::new(
            1,
            Duration::from_secs(5),
            Duration::ZERO,
        )))
    }

    fn handles() -> Vec<ResourceHandle> {
        vec![
            ResourceHandle::new(ResourceKind::Campaign, "c1"),
            ResourceHandle::new(ResourceKind::AdSet, "s1"),
            ResourceHandle::new(ResourceKind::Creative, "cr1"),
            ResourceHandle::new(ResourceKind::Ad, "a1"),
        ]
    }

    #[tokio::test]
    async fn test_deletes_in_reverse_order() {
        let platform = MockAdsPlatform::new();
        let result = compensate(&platform, &executor(), &handles()).await;

        assert!(result.success);
        let ids: Vec<String> = platform.deleted().await.into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["a1", "cr1", "s1", "c1"]);
        assert_eq!(result.deleted.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_stop_the_rest() {
        let platform = MockAdsPlatform::new();
        platform
            .fail_delete("s1", PlatformError::permanent("cannot delete"))
            .await;

        let result = compensate(&platform, &executor(), &handles()).await;

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("ad_set s1"));
        let ids: Vec<String> = platform.deleted().await.into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["a1", "cr1", "c1"]);
    }

    #[tokio::test]
    async fn test_empty_handle_list() {
        let platform = MockAdsPlatform::new();
        let result = compensate(&platform, &executor(), &[]).await;
        assert!(result.success);
        assert!(result.deleted.is_empty());
    }
}
