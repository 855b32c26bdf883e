//! Test doubles for the intake collaborators.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::request::{RequestId, RequestRow, RequestStatus, StoredRequest};
use crate::domain::user::{ChatId, UserId};
use crate::flows::IntakeData;
use crate::ports::{IntakeNotifier, NotifyError, RequestSheet, SheetError};

#[derive(Default)]
pub struct FakeSheet {
    pub rows: Mutex<Vec<RequestRow>>,
    pub appends: Mutex<Vec<usize>>,
    pub fail_appends: Mutex<bool>,
}

impl FakeSheet {
    pub fn rows(&self) -> Vec<RequestRow> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    pub fn append_batches(&self) -> Vec<usize> {
        self.appends.lock().map(|appends| appends.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.fail_appends.lock() {
            *flag = failing;
        }
    }
}

#[async_trait]
impl RequestSheet for FakeSheet {
    async fn append_rows(&self, rows: Vec<RequestRow>) -> Result<Vec<RequestId>, SheetError> {
        if self.fail_appends.lock().map(|flag| *flag).unwrap_or(false) {
            return Err(SheetError::Unavailable("sheet offline".to_owned()));
        }
        let mut stored = self.rows.lock().map_err(|_| SheetError::Unavailable("poisoned".to_owned()))?;
        if let Ok(mut appends) = self.appends.lock() {
            appends.push(rows.len());
        }
        let start = stored.len();
        stored.extend(rows);
        Ok((start..stored.len()).map(|index| RequestId(index as u32 + 1)).collect())
    }

    async fn update_status(&self, id: RequestId, status: RequestStatus) -> Result<(), SheetError> {
        let mut stored = self.rows.lock().map_err(|_| SheetError::Unavailable("poisoned".to_owned()))?;
        match id.0.checked_sub(1).and_then(|index| stored.get_mut(index as usize)) {
            Some(row) => {
                row.status = status;
                Ok(())
            }
            None => Err(SheetError::Unavailable(format!("row {id} missing"))),
        }
    }

    async fn get_row(&self, id: RequestId) -> Result<Option<StoredRequest>, SheetError> {
        let stored = self.rows.lock().map_err(|_| SheetError::Unavailable("poisoned".to_owned()))?;
        Ok(id
            .0
            .checked_sub(1)
            .and_then(|index| stored.get(index as usize))
            .map(|row| StoredRequest { id, row: row.clone() }))
    }

    async fn list_rows(
        &self,
        status: Option<RequestStatus>,
        limit: usize,
    ) -> Result<Vec<StoredRequest>, SheetError> {
        let stored = self.rows.lock().map_err(|_| SheetError::Unavailable("poisoned".to_owned()))?;
        Ok(stored
            .iter()
            .enumerate()
            .filter(|(_, row)| status.map_or(true, |status| row.status == status))
            .take(limit)
            .map(|(index, row)| StoredRequest { id: RequestId(index as u32 + 1), row: row.clone() })
            .collect())
    }

    async fn list_rows_by_agent(&self, agent: UserId) -> Result<Vec<StoredRequest>, SheetError> {
        let stored = self.rows.lock().map_err(|_| SheetError::Unavailable("poisoned".to_owned()))?;
        Ok(stored
            .iter()
            .enumerate()
            .filter(|(_, row)| row.agent_id == agent)
            .map(|(index, row)| StoredRequest { id: RequestId(index as u32 + 1), row: row.clone() })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Submission { destination: ChatId, client_name: String, products: usize },
    StatusChange { agent: UserId, id: RequestId, previous: RequestStatus, current: RequestStatus },
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
    pub fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|notices| notices.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.fail.lock() {
            *flag = failing;
        }
    }

    fn record(&self, notice: Notice) -> Result<(), NotifyError> {
        if self.fail.lock().map(|flag| *flag).unwrap_or(false) {
            return Err(NotifyError("chat unreachable".to_owned()));
        }
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
        Ok(())
    }
}

#[async_trait]
impl IntakeNotifier for RecordingNotifier {
    async fn announce_submission(
        &self,
        destination: ChatId,
        data: &IntakeData,
    ) -> Result<(), NotifyError> {
        self.record(Notice::Submission {
            destination,
            client_name: data.client_name.clone(),
            products: data.selected_products.len(),
        })
    }

    async fn notify_status_change(
        &self,
        agent: UserId,
        request: &StoredRequest,
        previous: RequestStatus,
    ) -> Result<(), NotifyError> {
        self.record(Notice::StatusChange {
            agent,
            id: request.id,
            previous,
            current: request.row.status,
        })
    }
}
