//! Restores input order and builds the batch summary.

use std::collections::{HashMap, VecDeque};

use crate::campaign::UploadResult;

/// Longest detail kept per result.
pub const MAX_DETAIL_LEN: usize = 100;

/// Longest error list kept in a batch summary.
pub const MAX_SUMMARY_ERRORS_LEN: usize = 300;

/// Cut `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate_detail(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

/// One result per entry of `row_ids`, sorted by row, details truncated.
///
/// Tasks sharing a row id each keep their own result. A task with no result
/// is reported as FAILED; results beyond the task count are dropped.
pub fn collect_results(row_ids: &[u32], results: Vec<UploadResult>) -> Vec<UploadResult> {
    let mut by_row: HashMap<u32, VecDeque<UploadResult>> = HashMap::with_capacity(results.len());
    for result in results {
        by_row.entry(result.row_id).or_default().push_back(result);
    }

    let mut ordered: Vec<UploadResult> = row_ids
        .iter()
        .map(|row_id| {
            by_row
                .get_mut(row_id)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| UploadResult::failed(*row_id, "No result produced"))
        })
        .collect();
    // Stable, so tasks sharing a row keep their completion order.
    ordered.sort_by_key(|r| r.row_id);

    for result in &mut ordered {
        result.detail = truncate_detail(&result.detail, MAX_DETAIL_LEN);
    }
    ordered
}

/// Human-readable batch summary.
pub fn summarize(results: &[UploadResult]) -> String {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let failed = results.len() - succeeded;
    let mut summary = format!(
        "Upload complete: {} succeeded, {} failed out of {}.",
        succeeded,
        failed,
        results.len()
    );

    if failed > 0 {
        let errors = results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| truncate_detail(&r.detail, MAX_DETAIL_LEN))
            .collect::<Vec<_>>()
            .join(" | ");
        summary.push_str(" Errors: ");
        summary.push_str(&truncate_detail(&errors, MAX_SUMMARY_ERRORS_LEN));
    }
    summary
}

/// Message sent when no row was selected for upload.
pub fn empty_batch_message(display_date: &str) -> String {
    format!("No campaigns to upload for {}.", display_date)
}
