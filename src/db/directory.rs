use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::db::models::{NewUser, UserRecord};
use crate::error::DatabaseError;

/// Persistent store of user records, owned outside the auth core.
///
/// Implementations must enforce email uniqueness themselves: the service
/// pre-checks, but two concurrent registrations can both pass that check.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, DatabaseError>;

    /// Persist a new record. Fails with [`DatabaseError::Duplicate`] when the
    /// email is already taken.
    async fn insert(&self, user: NewUser) -> Result<UserRecord, DatabaseError>;
}

/// Process-local directory, used for tests and `database.backend = "memory"`.
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<i64, UserRecord>>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Drop a record, as an administrator deleting an account would.
    pub async fn remove(&self, id: i64) -> Option<UserRecord> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, DatabaseError> {
        // Uniqueness check and insert happen under one write lock.
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate);
        }

        let record = UserRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }
}
