use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::request::{RequestId, RequestStatus, StoredRequest};
use crate::ports::{IntakeNotifier, RequestSheet, SheetError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusChange {
    NotFound(RequestId),
    Unchanged(StoredRequest),
    Updated { request: StoredRequest, previous: RequestStatus, agent_notified: bool },
}

/// Applies admin status changes and tells the agent when work starts on their request.
pub struct StatusBridge {
    sheet: Arc<dyn RequestSheet>,
    notifier: Arc<dyn IntakeNotifier>,
}

impl StatusBridge {
    pub fn new(sheet: Arc<dyn RequestSheet>, notifier: Arc<dyn IntakeNotifier>) -> Self {
        Self { sheet, notifier }
    }

    pub async fn set_status(
        &self,
        id: RequestId,
        status: RequestStatus,
    ) -> Result<StatusChange, SheetError> {
        let Some(mut request) = self.sheet.get_row(id).await? else {
            return Ok(StatusChange::NotFound(id));
        };

        let previous = request.row.status;
        if previous == status {
            return Ok(StatusChange::Unchanged(request));
        }

        self.sheet.update_status(id, status).await?;
        request.row.status = status;
        info!(
            event_name = "requests.status.updated",
            request_id = %id,
            from = %previous,
            to = %status,
            "request status changed"
        );

        let mut agent_notified = false;
        if RequestStatus::notifies_agent(previous, status) {
            match self.notifier.notify_status_change(request.row.agent_id, &request, previous).await {
                Ok(()) => agent_notified = true,
                Err(error) => warn!(
                    event_name = "requests.status.notify_failed",
                    request_id = %id,
                    user_id = %request.row.agent_id,
                    error = %error,
                    "agent was not told about the status change"
                ),
            }
        }

        Ok(StatusChange::Updated { request, previous, agent_notified })
    }
}
