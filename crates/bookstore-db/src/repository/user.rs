//! # User Repository
//!
//! Staff accounts. Passwords arrive already hashed; this layer never sees
//! plaintext.
//!
//! A user's live session caches the employee id and supervisor flag, so
//! `update` rewrites the session row in the same transaction and `delete`
//! drops it.

use bookstore_core::query::{TextMatch, UserFilter};
use bookstore_core::validation::{
    validate_age, validate_employee_id, validate_true_name, validate_username,
};
use bookstore_core::{CoreError, Gender, NewUser, Page, User, UserChanges};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::filter::{fetch_page, Conditions};

const USER_COLUMNS: &str =
    "username, employee_id, true_name, gender, age, is_supervisor, password_hash";

/// Repository for staff accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers an account.
    ///
    /// ## Returns
    /// * `Err(Domain(Duplicate))` - username or employee id already taken
    pub async fn create(&self, user: &NewUser) -> DbResult<User> {
        validate_username(&user.username)?;
        validate_employee_id(&user.employee_id)?;
        validate_true_name(&user.true_name)?;
        if let Some(age) = user.age {
            validate_age(age)?;
        }

        debug!(username = %user.username, "Creating user");

        sqlx::query(
            r#"
            INSERT INTO users (
                username, employee_id, true_name, gender, age, is_supervisor, password_hash
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.employee_id)
        .bind(&user.true_name)
        .bind(user.gender)
        .bind(user.age)
        .bind(user.is_supervisor)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_account(e, &user.username, &user.employee_id))?;

        info!(
            username = %user.username,
            employee_id = %user.employee_id,
            is_supervisor = user.is_supervisor,
            "User created"
        );

        Ok(User {
            username: user.username.clone(),
            employee_id: user.employee_id.clone(),
            true_name: user.true_name.clone(),
            gender: user.gender,
            age: user.age,
            is_supervisor: user.is_supervisor,
            password_hash: user.password_hash.clone(),
        })
    }

    /// Gets an account by username.
    pub async fn find(&self, username: &str) -> DbResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, username).await
    }

    /// Gets an account by username, failing with `UserNotFound` when absent.
    pub async fn get(&self, username: &str) -> DbResult<User> {
        self.find(username)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(username.to_string()).into())
    }

    /// Counts accounts. Zero means the bootstrap supervisor is still due.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Applies profile changes and refreshes the user's live session.
    pub async fn update(&self, username: &str, changes: &UserChanges) -> DbResult<User> {
        if let Some(employee_id) = &changes.employee_id {
            validate_employee_id(employee_id)?;
        }
        if let Some(true_name) = &changes.true_name {
            validate_true_name(true_name)?;
        }
        if let Some(age) = changes.age {
            validate_age(age)?;
        }

        debug!(username = %username, "Updating user");

        let mut tx = self.pool.begin().await?;

        let current = load(&mut tx, username)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(username.to_string()))?;

        let updated = User {
            username: current.username,
            employee_id: changes.employee_id.clone().unwrap_or(current.employee_id),
            true_name: changes.true_name.clone().unwrap_or(current.true_name),
            gender: changes.gender.unwrap_or(current.gender),
            age: changes.age.or(current.age),
            is_supervisor: changes.is_supervisor.unwrap_or(current.is_supervisor),
            password_hash: changes.password_hash.clone().unwrap_or(current.password_hash),
        };

        sqlx::query(
            r#"
            UPDATE users SET
                employee_id = ?,
                true_name = ?,
                gender = ?,
                age = ?,
                is_supervisor = ?,
                password_hash = ?
            WHERE username = ?
            "#,
        )
        .bind(&updated.employee_id)
        .bind(&updated.true_name)
        .bind(updated.gender)
        .bind(updated.age)
        .bind(updated.is_supervisor)
        .bind(&updated.password_hash)
        .bind(username)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_account(e, username, &updated.employee_id))?;

        sqlx::query("UPDATE sessions SET employee_id = ?, is_supervisor = ? WHERE username = ?")
            .bind(&updated.employee_id)
            .bind(updated.is_supervisor)
            .bind(username)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(username = %username, "User updated");
        Ok(updated)
    }

    /// Deletes a non-supervisor account together with its session.
    ///
    /// ## Returns
    /// * `Err(Domain(UserNotFound))` - no such account
    /// * `Err(Domain(PermissionDenied))` - the account is a supervisor
    pub async fn delete(&self, username: &str) -> DbResult<()> {
        debug!(username = %username, "Deleting user");

        let mut tx = self.pool.begin().await?;

        let user = load(&mut tx, username)
            .await?
            .ok_or_else(|| CoreError::UserNotFound(username.to_string()))?;

        if user.is_supervisor {
            return Err(CoreError::PermissionDenied(
                "supervisor accounts cannot be deleted".to_string(),
            )
            .into());
        }

        sqlx::query("DELETE FROM sessions WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(username = %username, "User deleted");
        Ok(())
    }

    /// Lists accounts matching the filter.
    pub async fn list(&self, filter: &UserFilter) -> DbResult<Page<User>> {
        let page = filter.validate()?;

        let mut conditions = Conditions::new();
        conditions
            .text(
                "username",
                TextMatch::from_query(filter.username.as_deref(), filter.exact_username),
            )
            .text(
                "employee_id",
                TextMatch::from_query(filter.employee_id.as_deref(), filter.exact_employee_id),
            )
            .text(
                "true_name",
                TextMatch::from_query(filter.true_name.as_deref(), filter.exact_true_name),
            )
            .eq_text("gender", filter.gender.as_ref().map(Gender::as_str))
            .eq_i64("is_supervisor", filter.is_supervisor.map(i64::from));

        let order_by = format!(
            "{} {}, username ASC",
            filter.sort_by.column(),
            filter.sort_order.as_sql()
        );

        fetch_page(&self.pool, USER_COLUMNS, "users", &conditions, &order_by, page).await
    }
}

async fn load(conn: &mut SqliteConnection, username: &str) -> DbResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(user)
}

/// Maps a UNIQUE violation on either account key to `Duplicate`.
fn duplicate_account(err: sqlx::Error, username: &str, employee_id: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.contains("employee_id") => {
            CoreError::duplicate("Employee id", employee_id).into()
        }
        DbError::UniqueViolation { .. } => CoreError::duplicate("Username", username).into(),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{new_user, test_db};
    use bookstore_core::{ErrorKind, Session};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        assert_eq!(db.users().count().await.unwrap(), 0);

        let created = db.users().create(&new_user("alice", "E1", false)).await.unwrap();
        assert_eq!(db.users().get("alice").await.unwrap(), created);
        assert_eq!(db.users().count().await.unwrap(), 1);

        let err = db.users().get("bob").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_keys_conflict() {
        let db = test_db().await;
        db.users().create(&new_user("alice", "E1", false)).await.unwrap();

        let err = db.users().create(&new_user("alice", "E2", false)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("Username"));

        let err = db.users().create(&new_user("bob", "E1", false)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("Employee id"));
    }

    #[tokio::test]
    async fn test_update_refreshes_session() {
        let db = test_db().await;
        db.users().create(&new_user("alice", "E1", false)).await.unwrap();
        db.sessions()
            .replace(&Session {
                token: "t1".into(),
                username: "alice".into(),
                employee_id: "E1".into(),
                is_supervisor: false,
                expires_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();

        let changes = UserChanges {
            true_name: Some("Alice Liddell".into()),
            is_supervisor: Some(true),
            ..Default::default()
        };
        let updated = db.users().update("alice", &changes).await.unwrap();
        assert_eq!(updated.true_name, "Alice Liddell");
        assert!(updated.is_supervisor);
        assert_eq!(updated.employee_id, "E1");

        let session = db.sessions().find_valid("t1", Utc::now()).await.unwrap().unwrap();
        assert!(session.is_supervisor);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let db = test_db().await;
        db.users().create(&new_user("boss", "E0", true)).await.unwrap();
        db.users().create(&new_user("alice", "E1", false)).await.unwrap();

        let err = db.users().delete("boss").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        db.users().delete("alice").await.unwrap();
        assert!(db.users().find("alice").await.unwrap().is_none());

        let err = db.users().delete("alice").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        db.users().create(&new_user("boss", "E0", true)).await.unwrap();
        db.users().create(&new_user("alice", "E1", false)).await.unwrap();
        db.users().create(&new_user("alan", "E2", false)).await.unwrap();

        let page = db
            .users()
            .list(&UserFilter {
                username: Some("al".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].username, "alan");

        let supervisors = db
            .users()
            .list(&UserFilter {
                is_supervisor: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(supervisors.total, 1);
        assert_eq!(supervisors.items[0].username, "boss");
    }
}
