//! # Student Directory
//!
//! Existence checks for the students and sessions an invoice refers to.
//! Those records belong to the admin database; the ledger only stores their
//! ids and asks the directory once, when the invoice is created.
//!
//! A failed lookup is reported as `DIRECTORY_UNAVAILABLE` and not retried.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// The directory could not answer.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DirectoryError(pub String);

/// Source of truth for students and sessions.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn student_exists(&self, student_id: i64) -> Result<bool, DirectoryError>;

    async fn session_exists(&self, session_id: i64) -> Result<bool, DirectoryError>;
}

/// Directory held in memory, for tests and the seed binary.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    students: RwLock<HashSet<i64>>,
    sessions: RwLock<HashSet<i64>>,
    offline: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory pre-filled with the given ids.
    pub fn with_records(
        students: impl IntoIterator<Item = i64>,
        sessions: impl IntoIterator<Item = i64>,
    ) -> Self {
        InMemoryDirectory {
            students: RwLock::new(students.into_iter().collect()),
            sessions: RwLock::new(sessions.into_iter().collect()),
            offline: AtomicBool::new(false),
        }
    }

    pub async fn add_student(&self, student_id: i64) {
        self.students.write().await.insert(student_id);
    }

    pub async fn add_session(&self, session_id: i64) {
        self.sessions.write().await.insert(session_id);
    }

    pub async fn remove_session(&self, session_id: i64) -> bool {
        self.sessions.write().await.remove(&session_id)
    }

    /// Makes every lookup fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), DirectoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DirectoryError("directory is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn student_exists(&self, student_id: i64) -> Result<bool, DirectoryError> {
        self.check_online()?;
        Ok(self.students.read().await.contains(&student_id))
    }

    async fn session_exists(&self, session_id: i64) -> Result<bool, DirectoryError> {
        self.check_online()?;
        Ok(self.sessions.read().await.contains(&session_id))
    }
}
