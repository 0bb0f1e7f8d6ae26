use serde::{Deserialize, Serialize};
use tracing::info;

use super::{side_effect_failure, CrmService, WorkflowError};

fn default_kind() -> String {
    "announcement".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkNotification {
    #[serde(alias = "recipientIds")]
    pub recipient_ids: Vec<String>,
    pub title: String,
    pub message: String,
    #[serde(default = "default_kind")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationResult {
    pub recipient_id: String,
    pub notification_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkNotificationOutcome {
    pub delivered: usize,
    pub failed: usize,
    pub results: Vec<NotificationResult>,
}

impl CrmService {
    /// Create one notification per recipient and report each outcome; one
    /// failure does not roll back or hide the others.
    pub fn notify_many(
        &self,
        request: BulkNotification,
    ) -> Result<BulkNotificationOutcome, WorkflowError> {
        if request.title.trim().is_empty() || request.recipient_ids.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "title and at least one recipient are required".to_string(),
            ));
        }

        let results: Vec<NotificationResult> = request
            .recipient_ids
            .iter()
            .map(|recipient_id| {
                match self.notify(
                    recipient_id,
                    &request.kind,
                    &request.title,
                    request.message.clone(),
                ) {
                    Ok(notification) => NotificationResult {
                        recipient_id: recipient_id.clone(),
                        notification_id: Some(notification.id),
                        error: None,
                    },
                    Err(error) => NotificationResult {
                        recipient_id: recipient_id.clone(),
                        notification_id: None,
                        error: Some(side_effect_failure(
                            &format!("notification to {recipient_id}"),
                            &error,
                        )),
                    },
                }
            })
            .collect();

        let delivered = results
            .iter()
            .filter(|result| result.notification_id.is_some())
            .count();
        let failed = results.len() - delivered;
        info!(delivered, failed, "bulk notification sent");
        Ok(BulkNotificationOutcome {
            delivered,
            failed,
            results,
        })
    }
}
