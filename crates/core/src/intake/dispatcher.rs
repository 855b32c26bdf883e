use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::domain::request::{RequestId, RequestRow, RequestStatus};
use crate::domain::user::ChatId;
use crate::errors::DomainError;
use crate::flows::{IntakeData, Session, SessionState};
use crate::ports::{IntakeNotifier, NotifyError, RequestSheet, SheetError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("could not persist request rows: {0}")]
    Persistence(#[from] SheetError),
    #[error("rows {persisted:?} were saved but the operations alert failed: {source}")]
    Notification { persisted: Vec<RequestId>, source: NotifyError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub request_ids: Vec<RequestId>,
}

impl SubmissionReceipt {
    pub fn product_count(&self) -> usize {
        self.request_ids.len()
    }
}

/// Turns a confirmed session into one row per product plus a single operations alert.
pub struct SubmissionDispatcher {
    sheet: Arc<dyn RequestSheet>,
    notifier: Arc<dyn IntakeNotifier>,
    operations_chat: ChatId,
}

impl SubmissionDispatcher {
    pub fn new(
        sheet: Arc<dyn RequestSheet>,
        notifier: Arc<dyn IntakeNotifier>,
        operations_chat: ChatId,
    ) -> Self {
        Self { sheet, notifier, operations_chat }
    }

    /// The caller discards the session only on `Ok`. When the alert fails after the rows
    /// were saved, their ids are kept on the session and a later confirm only re-sends the
    /// alert.
    pub async fn submit(&self, session: &mut Session) -> Result<SubmissionReceipt, DispatchError> {
        if session.state != SessionState::Confirming {
            return Err(DomainError::InvariantViolation(format!(
                "submission requires a confirming session, found {:?}",
                session.state
            ))
            .into());
        }
        if session.data.selected_products.is_empty() {
            return Err(DomainError::InvariantViolation(
                "submission requires at least one selected product".to_owned(),
            )
            .into());
        }

        let agent_id = session.data.agent_id;
        let request_ids = match session.data.persisted.clone() {
            Some(request_ids) => {
                info!(
                    event_name = "intake.submission.alert_retry",
                    user_id = %agent_id,
                    request_ids = ?request_ids,
                    "rows already saved; re-sending operations alert only"
                );
                request_ids
            }
            None => self.persist(&session.data).await?,
        };

        if let Err(source) =
            self.notifier.announce_submission(self.operations_chat, &session.data).await
        {
            error!(
                event_name = "intake.submission.failed",
                user_id = %agent_id,
                stage = "notify",
                error = %source,
                "operations alert was not delivered"
            );
            session.data.persisted = Some(request_ids.clone());
            return Err(DispatchError::Notification { persisted: request_ids, source });
        }

        Ok(SubmissionReceipt { request_ids })
    }

    async fn persist(&self, data: &IntakeData) -> Result<Vec<RequestId>, DispatchError> {
        let request_ids = self.sheet.append_rows(rows_for_submission(data)).await.map_err(|error| {
            error!(
                event_name = "intake.submission.failed",
                user_id = %data.agent_id,
                stage = "persist",
                error = %error,
                "request rows were not saved"
            );
            error
        })?;
        info!(
            event_name = "intake.submission.persisted",
            user_id = %data.agent_id,
            request_ids = ?request_ids,
            "request rows saved"
        );
        Ok(request_ids)
    }
}

/// One row per selected product, sharing the client and agent fields.
pub fn rows_for_submission(data: &IntakeData) -> Vec<RequestRow> {
    let gender = data.client_gender.map(|gender| gender.as_str()).unwrap_or_default();
    let smoking = data.smoking.map(|smoking| smoking.as_str()).unwrap_or_default();

    data.selected_products
        .iter()
        .map(|selection| RequestRow {
            submitted_at: data.started_at,
            agent_id: data.agent_id,
            agent_name: data.agent_name.clone(),
            client_name: data.client_name.clone(),
            client_dob: data.client_dob.clone(),
            client_gender: gender.to_owned(),
            smoking: smoking.to_owned(),
            product: selection.product.display_name().to_owned(),
            amount: selection.amount.clone(),
            term_payment: selection.term_payment.clone(),
            notes: data.notes.clone(),
            status: RequestStatus::Pending,
        })
        .collect()
}
