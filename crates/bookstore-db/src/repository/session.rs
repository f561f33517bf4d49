//! # Session Repository
//!
//! Live logins, keyed by bearer token.
//!
//! ```text
//! login   ──► replace()      DELETE old row for the user, INSERT new one
//! request ──► find_valid()   purge expired rows, then look the token up
//! logout  ──► delete()
//! ```
//!
//! Expired rows are only removed lazily, on lookup.

use bookstore_core::Session;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for login sessions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Stores a session, replacing any the user already had.
    pub async fn replace(&self, session: &Session) -> DbResult<()> {
        debug!(username = %session.username, expires_at = %session.expires_at, "Replacing session");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sessions WHERE username = ?")
            .bind(&session.username)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO sessions (token, username, employee_id, is_supervisor, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.token)
        .bind(&session.username)
        .bind(&session.employee_id)
        .bind(session.is_supervisor)
        .bind(session.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Looks up an unexpired session.
    pub async fn find_valid(&self, token: &str, now: DateTime<Utc>) -> DbResult<Option<Session>> {
        self.purge_expired(now).await?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, username, employee_id, is_supervisor, expires_at
            FROM sessions
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session.filter(|s| !s.is_expired(now)))
    }

    /// Removes every session that expired at or before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            debug!(purged = result.rows_affected(), "Purged expired sessions");
        }

        Ok(result.rows_affected())
    }

    /// Ends a session. Returns whether it existed.
    pub async fn delete(&self, token: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Ends every session of a user.
    pub async fn delete_for_user(&self, username: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{new_user, test_db};
    use chrono::Duration;

    fn session(token: &str, username: &str, expires_at: DateTime<Utc>) -> Session {
        Session {
            token: token.to_string(),
            username: username.to_string(),
            employee_id: "E1".to_string(),
            is_supervisor: false,
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_login_replaces_previous_session() {
        let db = test_db().await;
        db.users().create(&new_user("alice", "E1", false)).await.unwrap();
        let later = Utc::now() + Duration::hours(1);

        db.sessions().replace(&session("first", "alice", later)).await.unwrap();
        db.sessions().replace(&session("second", "alice", later)).await.unwrap();

        let now = Utc::now();
        assert!(db.sessions().find_valid("first", now).await.unwrap().is_none());
        let live = db.sessions().find_valid("second", now).await.unwrap().unwrap();
        assert_eq!(live.operator().employee_id, "E1");
    }

    #[tokio::test]
    async fn test_expired_sessions_are_purged_on_lookup() {
        let db = test_db().await;
        db.users().create(&new_user("alice", "E1", false)).await.unwrap();
        db.users().create(&new_user("bob", "E2", false)).await.unwrap();

        let now = Utc::now();
        db.sessions()
            .replace(&session("old", "alice", now - Duration::minutes(1)))
            .await
            .unwrap();
        db.sessions()
            .replace(&session("new", "bob", now + Duration::minutes(1)))
            .await
            .unwrap();

        assert!(db.sessions().find_valid("old", now).await.unwrap().is_none());
        assert_eq!(db.sessions().purge_expired(now).await.unwrap(), 0);
        assert!(db.sessions().find_valid("new", now).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout() {
        let db = test_db().await;
        db.users().create(&new_user("alice", "E1", false)).await.unwrap();
        db.sessions()
            .replace(&session("t", "alice", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        assert!(db.sessions().delete("t").await.unwrap());
        assert!(!db.sessions().delete("t").await.unwrap());
        assert_eq!(db.sessions().delete_for_user("alice").await.unwrap(), 0);
    }
}
