/// MCP session tracking
///
/// Each protocol session holds one reference to the shared node database for
/// its whole lifetime: acquired when the session opens, released when it ends.

use crate::database::{SharedDatabase, SharedDatabaseError, SharedDatabaseState};
use chrono::{DateTime, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A live protocol session
#[derive(Debug)]
pub struct Session {
    /// Session identifier sent back in the `mcp-session-id` header
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// This session's reference to the shared node database
    pub database: Arc<SharedDatabaseState>,
}

/// Registry of open sessions bound to the shared database
#[derive(Debug)]
pub struct SessionManager {
    shared: Arc<SharedDatabase>,
    db_path: String,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(shared: Arc<SharedDatabase>, db_path: impl Into<String>) -> Self {
        Self {
            shared,
            db_path: db_path.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a session, acquiring the shared database for it
    pub async fn open_session(&self) -> Result<Arc<Session>, SharedDatabaseError> {
        let database = self.shared.acquire(&self.db_path).await?;

        let session = Arc::new(Session {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            database,
        });

        self.sessions
            .write()
            .await
            .insert(session.id.clone(), Arc::clone(&session));

        tracing::info!(
            session_id = %session.id,
            ref_count = self.shared.ref_count(),
            "🔌 Session opened"
        );

        Ok(session)
    }

    pub async fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// End a session and release its database reference
    ///
    /// Returns false when the session is unknown.
    pub async fn close_session(&self, id: &str) -> bool {
        let Some(session) = self.sessions.write().await.remove(id) else {
            return false;
        };

        self.shared.release(Some(&session.database));

        tracing::info!(
            session_id = %session.id,
            lifetime_secs = (Utc::now() - session.created_at).num_seconds(),
            ref_count = self.shared.ref_count(),
            "Session closed"
        );

        true
    }

    /// End every session (process shutdown); returns how many were open
    pub async fn close_all(&self) -> usize {
        let drained: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();

        for session in &drained {
            self.shared.release(Some(&session.database));
        }

        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Closed all sessions");
        }

        drained.len()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{adapter::IN_MEMORY_PATH, SqliteNodeConnector};

    fn manager() -> (SessionManager, Arc<SharedDatabase>) {
        let shared = Arc::new(SharedDatabase::new(SqliteNodeConnector));
        (SessionManager::new(Arc::clone(&shared), IN_MEMORY_PATH), shared)
    }

    #[tokio::test]
    async fn test_sessions_share_one_database() {
        let (sessions, shared) = manager();

        let first = sessions.open_session().await.unwrap();
        let second = sessions.open_session().await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(Arc::ptr_eq(&first.database, &second.database));
        assert_eq!(shared.ref_count(), 2);
        assert_eq!(sessions.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_close_session_releases_without_closing() {
        let (sessions, shared) = manager();
        let session = sessions.open_session().await.unwrap();

        assert!(sessions.close_session(&session.id).await);
        assert!(!sessions.close_session(&session.id).await);

        assert_eq!(shared.ref_count(), 0);
        assert!(shared.is_initialized());
        assert!(!session.database.db.is_closed());
        assert!(sessions.get_session(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn test_close_all_releases_every_session() {
        let (sessions, shared) = manager();
        for _ in 0..3 {
            sessions.open_session().await.unwrap();
        }

        assert_eq!(sessions.close_all().await, 3);

        assert_eq!(shared.ref_count(), 0);
        assert_eq!(sessions.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_open_session_propagates_path_conflict() {
        let (sessions, shared) = manager();
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other.db");
        shared.acquire(other.to_str().unwrap()).await.unwrap();

        let err = sessions.open_session().await.unwrap_err();

        assert!(matches!(err, SharedDatabaseError::PathConflict { .. }));
        assert_eq!(sessions.session_count().await, 0);
        shared.force_close().await;
    }
}
