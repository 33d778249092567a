//! Mapping of processing errors onto the stored failure cause.

use payout_snapshot_types::entities::AssetSnapshotFailureCause;

/// Message of RPC providers refusing a log query with too many results.
pub const LOG_RESPONSE_SIZE_EXCEEDED: &str = "Log response size exceeded";

/// Classifies the error that failed a snapshot. Every cause in the chain is
/// inspected, so context added on the way up does not hide the provider message.
pub fn classify_failure(error: &anyhow::Error) -> AssetSnapshotFailureCause {
    let log_limit_exceeded = error
        .chain()
        .any(|cause| cause.to_string().contains(LOG_RESPONSE_SIZE_EXCEEDED));

    if log_limit_exceeded {
        AssetSnapshotFailureCause::LogResponseLimit
    } else {
        AssetSnapshotFailureCause::Other
    }
}
