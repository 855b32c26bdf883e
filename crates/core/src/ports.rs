//! Collaborator seams consumed by the intake core. Implementations live in `illustra-db`
//! (persistence, ledger files) and `illustra-chat` (notifications).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::access::{AuthorizationRecord, PendingAccessRequest};
use crate::domain::request::{RequestId, RequestRow, RequestStatus, StoredRequest};
use crate::domain::user::{ChatId, UserId};
use crate::flows::IntakeData;

/// Rows returned by `/lists` when no explicit limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 20;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SheetError {
    #[error("request sheet database error: {0}")]
    Database(String),
    #[error("request sheet row could not be decoded: {0}")]
    Decode(String),
    #[error("request sheet unavailable: {0}")]
    Unavailable(String),
}

/// Append-ordered request rows addressed by 1-based position.
#[async_trait]
pub trait RequestSheet: Send + Sync {
    /// Appends in order and returns the positions assigned to each row.
    async fn append_rows(&self, rows: Vec<RequestRow>) -> Result<Vec<RequestId>, SheetError>;
    async fn update_status(&self, id: RequestId, status: RequestStatus) -> Result<(), SheetError>;
    async fn get_row(&self, id: RequestId) -> Result<Option<StoredRequest>, SheetError>;
    /// Oldest first, at most `limit` rows.
    async fn list_rows(
        &self,
        status: Option<RequestStatus>,
        limit: usize,
    ) -> Result<Vec<StoredRequest>, SheetError>;
    async fn list_rows_by_agent(&self, agent: UserId) -> Result<Vec<StoredRequest>, SheetError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait IntakeNotifier: Send + Sync {
    /// One alert for the whole submission, sent to the operations chat.
    async fn announce_submission(
        &self,
        destination: ChatId,
        data: &IntakeData,
    ) -> Result<(), NotifyError>;

    async fn notify_status_change(
        &self,
        agent: UserId,
        request: &StoredRequest,
        previous: RequestStatus,
    ) -> Result<(), NotifyError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("ledger store i/o failure: {0}")]
    Io(String),
    #[error("ledger store holds unreadable data: {0}")]
    Corrupt(String),
    #[error("ledger store could not encode data: {0}")]
    Encode(String),
}

/// Two independently durable collections. `Ok(None)` means the collection has never been
/// written, as opposed to being unreadable.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load_authorizations(&self) -> Result<Option<AuthorizationRecord>, StoreError>;
    async fn save_authorizations(&self, record: &AuthorizationRecord) -> Result<(), StoreError>;
    async fn load_pending(&self) -> Result<Option<Vec<PendingAccessRequest>>, StoreError>;
    async fn save_pending(&self, pending: &[PendingAccessRequest]) -> Result<(), StoreError>;
}
