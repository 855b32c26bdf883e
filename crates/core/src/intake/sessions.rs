use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::user::UserId;
use crate::flows::Session;

type Slot = Arc<AsyncMutex<Option<Session>>>;

/// In-memory sessions keyed by user. Nothing survives a restart. A user only has an entry
/// while a session exists or an event for them is in flight.
#[derive(Default)]
pub struct SessionStore {
    slots: Mutex<HashMap<UserId, Slot>>,
}

/// Exclusive access to one user's session slot. Held across collaborator calls so that
/// events for the same user are handled one at a time. Dropping an empty slot that no other
/// event is waiting on removes the user's entry.
pub struct SessionSlot<'a> {
    store: &'a SessionStore,
    user: UserId,
    guard: OwnedMutexGuard<Option<Session>>,
}

impl SessionStore {
    pub async fn lock(&self, user: UserId) -> SessionSlot<'_> {
        let slot = self.slots().entry(user).or_default().clone();
        SessionSlot { store: self, user, guard: slot.lock_owned().await }
    }

    pub async fn has_session(&self, user: UserId) -> bool {
        self.lock(user).await.is_some()
    }

    /// Users currently holding an entry.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<UserId, Slot>> {
        match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Deref for SessionSlot<'_> {
    type Target = Option<Session>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for SessionSlot<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for SessionSlot<'_> {
    fn drop(&mut self) {
        if self.guard.is_some() {
            return;
        }
        let mut slots = self.store.slots();
        // Two holders means the map and this guard; anyone else waiting has cloned the slot.
        let idle = slots.get(&self.user).is_some_and(|slot| Arc::strong_count(slot) == 2);
        if idle {
            slots.remove(&self.user);
        }
    }
}
