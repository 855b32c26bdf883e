use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use illustra_core::domain::request::{RequestId, RequestRow, RequestStatus, StoredRequest};
use illustra_core::domain::user::UserId;
use illustra_core::ports::{RequestSheet, SheetError};

/// Volatile sheet for tests and throwaway runs.
#[derive(Default)]
pub struct InMemoryRequestSheet {
    rows: RwLock<Vec<RequestRow>>,
    failing: AtomicBool,
}

impl InMemoryRequestSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<RequestRow>) -> Self {
        Self { rows: RwLock::new(rows), failing: AtomicBool::new(false) }
    }

    /// While set, every operation fails with `SheetError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn rows(&self) -> Vec<RequestRow> {
        self.rows.read().await.clone()
    }

    fn check_available(&self) -> Result<(), SheetError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SheetError::Unavailable("in-memory sheet marked failing".to_owned()));
        }
        Ok(())
    }
}

fn position(index: usize) -> RequestId {
    RequestId(index as u32 + 1)
}

fn index_of(id: RequestId) -> Option<usize> {
    id.0.checked_sub(1).map(|index| index as usize)
}

#[async_trait]
impl RequestSheet for InMemoryRequestSheet {
    async fn append_rows(&self, rows: Vec<RequestRow>) -> Result<Vec<RequestId>, SheetError> {
        self.check_available()?;
        let mut stored = self.rows.write().await;
        let start = stored.len();
        stored.extend(rows);
        Ok((start..stored.len()).map(position).collect())
    }

    async fn update_status(&self, id: RequestId, status: RequestStatus) -> Result<(), SheetError> {
        self.check_available()?;
        let mut stored = self.rows.write().await;
        match index_of(id).and_then(|index| stored.get_mut(index)) {
            Some(row) => {
                row.status = status;
                Ok(())
            }
            None => Err(SheetError::Unavailable(format!("request {id} does not exist"))),
        }
    }

    async fn get_row(&self, id: RequestId) -> Result<Option<StoredRequest>, SheetError> {
        self.check_available()?;
        let stored = self.rows.read().await;
        Ok(index_of(id)
            .and_then(|index| stored.get(index))
            .map(|row| StoredRequest { id, row: row.clone() }))
    }

    async fn list_rows(
        &self,
        status: Option<RequestStatus>,
        limit: usize,
    ) -> Result<Vec<StoredRequest>, SheetError> {
        self.check_available()?;
        let stored = self.rows.read().await;
        Ok(stored
            .iter()
            .enumerate()
            .filter(|(_, row)| status.map_or(true, |status| row.status == status))
            .take(limit)
            .map(|(index, row)| StoredRequest { id: position(index), row: row.clone() })
            .collect())
    }

    async fn list_rows_by_agent(&self, agent: UserId) -> Result<Vec<StoredRequest>, SheetError> {
        self.check_available()?;
        let stored = self.rows.read().await;
        Ok(stored
            .iter()
            .enumerate()
            .filter(|(_, row)| row.agent_id == agent)
            .map(|(index, row)| StoredRequest { id: position(index), row: row.clone() })
            .collect())
    }
}
