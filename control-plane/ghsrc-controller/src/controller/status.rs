use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::crd::GitHubSourceStatus;

/// Whether `desired` must be written back. Transition times only move when a
/// status changes, so a plain comparison does not cause timestamp churn.
pub fn should_patch_status(
    current: Option<&GitHubSourceStatus>,
    desired: &GitHubSourceStatus,
) -> bool {
    match current {
        None => {
            debug!("should_patch_status: no current status, patching");
            true
        }
        Some(cur) if cur != desired => {
            debug!(
                "should_patch_status: status differs, patching\ncurrent={}\ndesired={}",
                serde_json::to_string(cur).unwrap_or_default(),
                serde_json::to_string(desired).unwrap_or_default()
            );
            true
        }
        Some(_) => {
            trace!("should_patch_status: status identical, skipping patch");
            false
        }
    }
}

/// Merge patch body for `status`. Optional fields are always present so a
/// value cleared during the pass is sent as null and removed on the server.
pub fn status_patch(status: &GitHubSourceStatus) -> Value {
    json!({
        "status": {
            "observedGeneration": status.observed_generation,
            "conditions": status.conditions,
            "sinkUri": status.sink_uri,
            "webhookIDKey": status.webhook_id_key,
        }
    })
}
