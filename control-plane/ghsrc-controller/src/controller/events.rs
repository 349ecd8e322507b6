use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder};
use tracing::debug;

pub const REASON_WEBHOOK_CREATED: &str = "WebhookCreated";
pub const REASON_WEBHOOK_DELETED: &str = "WebhookDeleted";

pub async fn emit_event(
    recorder: &Recorder,
    obj_ref: &ObjectReference,
    reason: &str,
    action: &str,
    note: Option<String>,
) {
    if let Err(e) = recorder
        .publish(
            &Event {
                type_: EventType::Normal,
                reason: reason.into(),
                note,
                action: action.into(),
                secondary: None,
            },
            obj_ref,
        )
        .await
    {
        debug!(error = %e, reason, "failed to publish event");
    }
}
