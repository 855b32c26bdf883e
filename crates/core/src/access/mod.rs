//! Authorization ledger: admins, authorized users and pending access requests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::domain::access::{AuthorizationRecord, PendingAccessRequest};
use crate::domain::user::UserId;
use crate::ports::{LedgerStore, StoreError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Membership checks and mutations over a [`LedgerStore`]. Mutations are serialized
/// in-process; every read goes to the store so external edits are observed.
pub struct AccessLedger {
    store: Arc<dyn LedgerStore>,
    initial_admins: Vec<UserId>,
    write_lock: Mutex<()>,
}

impl AccessLedger {
    /// Seeds collections that have never been written. Unreadable collections fail.
    pub async fn open(
        store: Arc<dyn LedgerStore>,
        initial_admins: &[UserId],
    ) -> Result<Self, LedgerError> {
        if store.load_authorizations().await?.is_none() {
            let record = AuthorizationRecord::seeded(initial_admins);
            store.save_authorizations(&record).await?;
            info!(
                event_name = "access.ledger.seeded",
                admins = record.admins.len(),
                "seeded authorization record"
            );
        }
        if store.load_pending().await?.is_none() {
            store.save_pending(&[]).await?;
            debug!(event_name = "access.pending.seeded", "seeded empty pending request list");
        }

        Ok(Self { store, initial_admins: initial_admins.to_vec(), write_lock: Mutex::new(()) })
    }

    pub async fn is_admin(&self, user: UserId) -> Result<bool, LedgerError> {
        Ok(self.authorizations().await?.is_admin(user))
    }

    pub async fn is_authorized(&self, user: UserId) -> Result<bool, LedgerError> {
        Ok(self.authorizations().await?.is_authorized(user))
    }

    pub async fn add_admin(&self, user: UserId) -> Result<bool, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.authorizations().await?;
        if record.admins.contains(&user) {
            return Ok(false);
        }
        record.admins.push(user);
        self.store.save_authorizations(&record).await?;
        info!(event_name = "access.admin.added", user_id = %user, "admin added");
        Ok(true)
    }

    /// Inserts only when the id is neither admin nor user, then drops any pending request.
    pub async fn add_user(&self, user: UserId) -> Result<bool, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.authorizations().await?;
        if record.is_authorized(user) {
            return Ok(false);
        }
        record.users.push(user);
        self.store.save_authorizations(&record).await?;
        self.remove_pending_locked(user).await?;
        info!(event_name = "access.user.added", user_id = %user, "user authorized");
        Ok(true)
    }

    /// Removes from `users` only; admins are never demoted here.
    pub async fn remove_user(&self, user: UserId) -> Result<bool, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.authorizations().await?;
        let before = record.users.len();
        record.users.retain(|existing| *existing != user);
        if record.users.len() == before {
            return Ok(false);
        }
        self.store.save_authorizations(&record).await?;
        info!(event_name = "access.user.removed", user_id = %user, "user access revoked");
        Ok(true)
    }

    pub async fn add_pending_request(
        &self,
        user: UserId,
        user_name: &str,
        user_username: Option<&str>,
    ) -> Result<bool, LedgerError> {
        let _guard = self.write_lock.lock().await;
        let mut pending = self.pending_requests().await?;
        if pending.iter().any(|request| request.user_id == user) {
            return Ok(false);
        }
        pending.push(PendingAccessRequest {
            user_id: user,
            user_name: user_name.to_owned(),
            user_username: user_username.map(str::to_owned),
            timestamp: Utc::now(),
        });
        self.store.save_pending(&pending).await?;
        info!(event_name = "access.pending.added", user_id = %user, "access request recorded");
        Ok(true)
    }

    pub async fn remove_pending_request(&self, user: UserId) -> Result<(), LedgerError> {
        let _guard = self.write_lock.lock().await;
        self.remove_pending_locked(user).await
    }

    pub async fn pending_request(
        &self,
        user: UserId,
    ) -> Result<Option<PendingAccessRequest>, LedgerError> {
        Ok(self.pending_requests().await?.into_iter().find(|request| request.user_id == user))
    }

    pub async fn pending_requests(&self) -> Result<Vec<PendingAccessRequest>, LedgerError> {
        Ok(self.store.load_pending().await?.unwrap_or_default())
    }

    /// Snapshot of admins and users. A collection deleted after startup reads as freshly
    /// seeded.
    pub async fn authorizations(&self) -> Result<AuthorizationRecord, LedgerError> {
        Ok(self
            .store
            .load_authorizations()
            .await?
            .unwrap_or_else(|| AuthorizationRecord::seeded(&self.initial_admins)))
    }

    async fn remove_pending_locked(&self, user: UserId) -> Result<(), LedgerError> {
        let mut pending = self.pending_requests().await?;
        let before = pending.len();
        pending.retain(|request| request.user_id != user);
        if pending.len() != before {
            self.store.save_pending(&pending).await?;
            debug!(event_name = "access.pending.removed", user_id = %user, "pending request cleared");
        }
        Ok(())
    }
}

/// Ledger store held in memory; nothing survives the process.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    authorizations: RwLock<Option<AuthorizationRecord>>,
    pending: RwLock<Option<Vec<PendingAccessRequest>>>,
}

impl InMemoryLedgerStore {
    pub fn with_record(record: AuthorizationRecord) -> Self {
        Self { authorizations: RwLock::new(Some(record)), pending: RwLock::new(None) }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn load_authorizations(&self) -> Result<Option<AuthorizationRecord>, StoreError> {
        Ok(self.authorizations.read().await.clone())
    }

    async fn save_authorizations(&self, record: &AuthorizationRecord) -> Result<(), StoreError> {
        *self.authorizations.write().await = Some(record.clone());
        Ok(())
    }

    async fn load_pending(&self) -> Result<Option<Vec<PendingAccessRequest>>, StoreError> {
        Ok(self.pending.read().await.clone())
    }

    async fn save_pending(&self, pending: &[PendingAccessRequest]) -> Result<(), StoreError> {
        *self.pending.write().await = Some(pending.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{AccessLedger, InMemoryLedgerStore, LedgerError};
    use crate::domain::access::{AuthorizationRecord, PendingAccessRequest};
    use crate::domain::user::UserId;
    use crate::ports::{LedgerStore, StoreError};

    const ADMIN: UserId = UserId(1);
    const AGENT: UserId = UserId(200);

    async fn ledger() -> (AccessLedger, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::default());
        let ledger = AccessLedger::open(store.clone(), &[ADMIN]).await.expect("open ledger");
        (ledger, store)
    }

    #[tokio::test]
    async fn open_seeds_missing_collections() {
        let (ledger, store) = ledger().await;

        assert_eq!(
            store.load_authorizations().await.expect("load"),
            Some(AuthorizationRecord { admins: vec![ADMIN], users: Vec::new() })
        );
        assert_eq!(store.load_pending().await.expect("load"), Some(Vec::new()));
        assert!(ledger.is_admin(ADMIN).await.expect("read"));
    }

    #[tokio::test]
    async fn open_keeps_existing_record() {
        let store = Arc::new(InMemoryLedgerStore::with_record(AuthorizationRecord {
            admins: vec![UserId(5)],
            users: vec![AGENT],
        }));
        let ledger = AccessLedger::open(store, &[ADMIN]).await.expect("open");

        assert!(!ledger.is_admin(ADMIN).await.expect("read"));
        assert!(ledger.is_authorized(AGENT).await.expect("read"));
    }

    #[tokio::test]
    async fn membership_follows_add_and_remove() {
        let (ledger, _) = ledger().await;

        assert!(!ledger.is_authorized(AGENT).await.expect("read"));
        assert!(ledger.add_user(AGENT).await.expect("add"));
        assert!(ledger.is_authorized(AGENT).await.expect("read"));
        assert!(!ledger.is_admin(AGENT).await.expect("read"));

        assert!(ledger.remove_user(AGENT).await.expect("remove"));
        assert!(!ledger.is_authorized(AGENT).await.expect("read"));
        assert!(!ledger.remove_user(AGENT).await.expect("remove again"));
    }

    #[tokio::test]
    async fn remove_user_never_demotes_admins() {
        let (ledger, _) = ledger().await;

        assert!(!ledger.remove_user(ADMIN).await.expect("remove"));
        assert!(ledger.is_admin(ADMIN).await.expect("read"));
        assert!(ledger.is_authorized(ADMIN).await.expect("read"));
    }

    #[tokio::test]
    async fn add_user_is_idempotent_and_skips_admins() {
        let (ledger, _) = ledger().await;

        assert!(ledger.add_user(AGENT).await.expect("first"));
        assert!(!ledger.add_user(AGENT).await.expect("second"));
        assert!(!ledger.add_user(ADMIN).await.expect("admin"));

        let record = ledger.authorizations().await.expect("snapshot");
        assert_eq!(record.users, vec![AGENT]);
    }

    #[tokio::test]
    async fn add_admin_is_idempotent() {
        let (ledger, _) = ledger().await;

        assert!(ledger.add_admin(UserId(2)).await.expect("first"));
        assert!(!ledger.add_admin(UserId(2)).await.expect("second"));
        assert_eq!(ledger.authorizations().await.expect("snapshot").admins, vec![ADMIN, UserId(2)]);
    }

    #[tokio::test]
    async fn pending_requests_are_unique_per_user() {
        let (ledger, _) = ledger().await;

        assert!(ledger.add_pending_request(AGENT, "Sari Dewi", Some("sari")).await.expect("add"));
        assert!(!ledger.add_pending_request(AGENT, "Sari D.", None).await.expect("add again"));

        let pending = ledger.pending_requests().await.expect("list");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user_name, "Sari Dewi");
        assert_eq!(pending[0].user_username.as_deref(), Some("sari"));
    }

    #[tokio::test]
    async fn add_user_clears_pending_request() {
        let (ledger, _) = ledger().await;
        ledger.add_pending_request(AGENT, "Sari Dewi", None).await.expect("add pending");
        ledger.add_pending_request(UserId(300), "Andi", None).await.expect("add pending");

        assert!(ledger.add_user(AGENT).await.expect("approve"));
        assert_eq!(ledger.pending_request(AGENT).await.expect("lookup"), None);
        assert!(ledger.pending_request(UserId(300)).await.expect("lookup").is_some());
    }

    #[tokio::test]
    async fn remove_pending_request_tolerates_absence() {
        let (ledger, _) = ledger().await;
        ledger.remove_pending_request(AGENT).await.expect("absent is fine");
        ledger.add_pending_request(AGENT, "Sari", None).await.expect("add");
        ledger.remove_pending_request(AGENT).await.expect("remove");
        assert!(ledger.pending_requests().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn concurrent_mutations_do_not_lose_updates() {
        let (ledger, _) = ledger().await;
        let ledger = Arc::new(ledger);

        let mut handles = Vec::new();
        for id in 100..120 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move { ledger.add_user(UserId(id)).await }));
        }
        for handle in handles {
            assert!(handle.await.expect("join").expect("add"));
        }
        assert_eq!(ledger.authorizations().await.expect("snapshot").users.len(), 20);
    }

    struct CorruptStore;

    #[async_trait]
    impl LedgerStore for CorruptStore {
        async fn load_authorizations(&self) -> Result<Option<AuthorizationRecord>, StoreError> {
            Err(StoreError::Corrupt("expected value at line 1 column 1".to_owned()))
        }

        async fn save_authorizations(&self, _: &AuthorizationRecord) -> Result<(), StoreError> {
            Ok(())
        }

        async fn load_pending(&self) -> Result<Option<Vec<PendingAccessRequest>>, StoreError> {
            Ok(None)
        }

        async fn save_pending(&self, _: &[PendingAccessRequest]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn corrupt_store_is_fatal_at_open() {
        let error = AccessLedger::open(Arc::new(CorruptStore), &[ADMIN]).await.err();
        assert!(matches!(error, Some(LedgerError::Store(StoreError::Corrupt(_)))));
    }
}
