/// User store implementation using runtime queries
///
/// All check-then-write sequences (uniqueness check + insert, admin-count
/// check + promote) run inside a single transaction so concurrent callers
/// cannot interleave between the check and the write.

use crate::{
    auth,
    db::models::{NewUser, Role, User},
    error::{CoreError, CoreResult},
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// Ceiling on concurrently-held admin roles
pub const MAX_ADMINS: usize = 2;

/// Credential store service
#[derive(Clone)]
pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a new user. Fails with `DuplicateEmail` if the address is
    /// taken, or `AdminLimitExceeded` if the record would breach the admin
    /// ceiling. Id and join timestamp are generated here.
    pub async fn create_user(&self, new_user: NewUser) -> CoreResult<User> {
        let email = normalize_email(&new_user.email);
        let password_hash = auth::hash_secret(&new_user.secret)?;

        let mut tx = self.db.begin().await?;

        let email_taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(&email)
            .fetch_one(&mut *tx)
            .await?;
        if email_taken > 0 {
            return Err(CoreError::DuplicateEmail);
        }

        if new_user.role == Role::Admin {
            let admins: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
                    .fetch_one(&mut *tx)
                    .await?;
            if admins as usize >= MAX_ADMINS {
                return Err(CoreError::AdminLimitExceeded(MAX_ADMINS));
            }
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, role, display_name, joined_at,
                                recovery_question, recovery_answer, avatar_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&password_hash)
        .bind(new_user.role.as_str())
        .bind(&new_user.display_name)
        .bind(now)
        .bind(&new_user.recovery_question)
        .bind(&new_user.recovery_answer)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %id, role = new_user.role.as_str(), "Created user");

        Ok(User {
            id,
            email,
            password_hash,
            role: new_user.role,
            display_name: new_user.display_name,
            joined_at: now,
            recovery_question: new_user.recovery_question,
            recovery_answer: new_user.recovery_answer,
            avatar_ref: None,
        })
    }

    /// Find a user by email. `None` is a normal outcome, not an error.
    pub async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query(&format!("{} WHERE email = ?1", SELECT_USER))
            .bind(normalize_email(email))
            .fetch_optional(&self.db)
            .await?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// Find a user by id.
    pub async fn find_by_id(&self, id: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query(&format!("{} WHERE id = ?1", SELECT_USER))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(|r| row_to_user(&r)).transpose()
    }

    /// List all users in insertion order.
    pub async fn list_users(&self) -> CoreResult<Vec<User>> {
        let rows = sqlx::query(&format!("{} ORDER BY seq ASC", SELECT_USER))
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(row_to_user).collect()
    }

    /// Full-record replace by id. `joined_at` and the password hash are
    /// immutable through this path; the secret only changes via
    /// `change_password`. A role change to admin is subject to the ceiling.
    pub async fn update_user(&self, user: &User) -> CoreResult<()> {
        let email = normalize_email(&user.email);

        let mut tx = self.db.begin().await?;

        let current_role: Option<String> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = ?1")
                .bind(&user.id)
                .fetch_optional(&mut *tx)
                .await?;
        let current_role = match current_role {
            Some(r) => Role::from_str(&r)?,
            None => return Err(CoreError::NotFound(format!("User {} not found", user.id))),
        };

        let email_taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1 AND id != ?2")
                .bind(&email)
                .bind(&user.id)
                .fetch_one(&mut *tx)
                .await?;
        if email_taken > 0 {
            return Err(CoreError::DuplicateEmail);
        }

        if user.role == Role::Admin && current_role != Role::Admin {
            let admins: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
                    .fetch_one(&mut *tx)
                    .await?;
            if admins as usize >= MAX_ADMINS {
                return Err(CoreError::AdminLimitExceeded(MAX_ADMINS));
            }
        }

        sqlx::query(
            "UPDATE users SET email = ?1, role = ?2, display_name = ?3,
                    recovery_question = ?4, recovery_answer = ?5, avatar_ref = ?6
             WHERE id = ?7",
        )
        .bind(&email)
        .bind(user.role.as_str())
        .bind(&user.display_name)
        .bind(&user.recovery_question)
        .bind(&user.recovery_answer)
        .bind(&user.avatar_ref)
        .bind(&user.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Replace a user's secret. Re-hashes with a fresh salt.
    pub async fn change_password(&self, id: &str, new_secret: &str) -> CoreResult<()> {
        let password_hash = auth::hash_secret(new_secret)?;

        let result = sqlx::query("UPDATE users SET password_hash = ?1 WHERE id = ?2")
            .bind(&password_hash)
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }

    /// Delete a user. History items keep their dangling `user_id` (the audit
    /// trail outlives the account); the user's sessions are revoked.
    pub async fn delete_user(&self, id: &str) -> CoreResult<()> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("User {} not found", id)));
        }

        sqlx::query("DELETE FROM sessions WHERE user_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %id, "Deleted user");

        Ok(())
    }

    /// Promote a user to admin. The count check and role flip share one
    /// transaction, so concurrent promotions cannot both pass a full ceiling.
    pub async fn promote_to_admin(&self, id: &str) -> CoreResult<()> {
        let mut tx = self.db.begin().await?;

        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let role = match role {
            Some(r) => Role::from_str(&r)?,
            None => return Err(CoreError::NotFound(format!("User {} not found", id))),
        };

        if role == Role::Admin {
            // Already an admin; nothing to do.
            return Ok(());
        }

        let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&mut *tx)
            .await?;
        if admins as usize >= MAX_ADMINS {
            return Err(CoreError::AdminLimitExceeded(MAX_ADMINS));
        }

        sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %id, "Promoted user to admin");

        Ok(())
    }

    /// Check a login attempt. Returns the user on success, `None` otherwise;
    /// an unknown email and a wrong secret are indistinguishable.
    pub async fn verify_credentials(&self, email: &str, secret: &str) -> CoreResult<Option<User>> {
        let user = match self.find_by_email(email).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        if auth::verify_secret(secret, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn user_count(&self) -> CoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }

    pub async fn admin_count(&self) -> CoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }
}

const SELECT_USER: &str = "SELECT id, email, password_hash, role, display_name, joined_at,
        recovery_question, recovery_answer, avatar_ref FROM users";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn row_to_user(row: &SqliteRow) -> CoreResult<User> {
    let role: String = row.get("role");
    let joined_at: DateTime<Utc> = row.get("joined_at");

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: Role::from_str(&role)?,
        display_name: row.get("display_name"),
        joined_at,
        recovery_question: row.get("recovery_question"),
        recovery_answer: row.get("recovery_answer"),
        avatar_ref: row.get("avatar_ref"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            secret: "hunter2!".to_string(),
            role,
            display_name: email.split('@').next().unwrap().to_string(),
            recovery_question: None,
            recovery_answer: None,
        }
    }

    async fn store() -> UserStore {
        UserStore::new(db::memory_pool().await)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = store().await;

        let user = store.create_user(new_user("a@x.com", Role::User)).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "hunter2!");

        let found = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.find_by_email("missing@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_is_normalized() {
        let store = store().await;
        store.create_user(new_user("A@X.com", Role::User)).await.unwrap();

        assert!(store.find_by_email("a@x.com").await.unwrap().is_some());
        let err = store.create_user(new_user("a@X.COM", Role::User)).await;
        assert!(matches!(err, Err(CoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_store_unchanged() {
        let store = store().await;
        store.create_user(new_user("a@x.com", Role::User)).await.unwrap();

        let err = store.create_user(new_user("a@x.com", Role::User)).await;
        assert!(matches!(err, Err(CoreError::DuplicateEmail)));
        assert_eq!(store.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_admin_ceiling_on_create_and_promote() {
        let store = store().await;
        store.create_user(new_user("a@x.com", Role::Admin)).await.unwrap();
        store.create_user(new_user("b@x.com", Role::Admin)).await.unwrap();

        let err = store.create_user(new_user("c@x.com", Role::Admin)).await;
        assert!(matches!(err, Err(CoreError::AdminLimitExceeded(2))));

        let carol = store.create_user(new_user("c@x.com", Role::User)).await.unwrap();
        let err = store.promote_to_admin(&carol.id).await;
        assert!(matches!(err, Err(CoreError::AdminLimitExceeded(2))));

        // Failed promotion must not mutate anything
        assert_eq!(store.admin_count().await.unwrap(), 2);
        let carol = store.find_by_id(&carol.id).await.unwrap().unwrap();
        assert_eq!(carol.role, Role::User);
    }

    #[tokio::test]
    async fn test_promote_flips_role() {
        let store = store().await;
        store.create_user(new_user("a@x.com", Role::Admin)).await.unwrap();
        let bob = store.create_user(new_user("b@x.com", Role::User)).await.unwrap();

        store.promote_to_admin(&bob.id).await.unwrap();
        let bob = store.find_by_id(&bob.id).await.unwrap().unwrap();
        assert_eq!(bob.role, Role::Admin);
        assert_eq!(store.admin_count().await.unwrap(), 2);

        // Promoting an existing admin is a no-op, not an error
        store.promote_to_admin(&bob.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_promote_missing_user() {
        let store = store().await;
        let err = store.promote_to_admin("no-such-id").await;
        assert!(matches!(err, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_users_insertion_order() {
        let store = store().await;
        for email in ["a@x.com", "b@x.com", "c@x.com"] {
            store.create_user(new_user(email, Role::User)).await.unwrap();
        }

        let emails: Vec<String> = store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, vec!["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[tokio::test]
    async fn test_update_user_profile_fields() {
        let store = store().await;
        let mut user = store.create_user(new_user("a@x.com", Role::User)).await.unwrap();

        user.display_name = "Alice".to_string();
        user.avatar_ref = Some("avatar:1".to_string());
        store.update_user(&user).await.unwrap();

        let fetched = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.display_name, "Alice");
        assert_eq!(fetched.avatar_ref.as_deref(), Some("avatar:1"));
        // joined_at stays what creation assigned
        assert_eq!(fetched.joined_at, user.joined_at);
    }

    #[tokio::test]
    async fn test_update_user_cannot_steal_email() {
        let store = store().await;
        store.create_user(new_user("a@x.com", Role::User)).await.unwrap();
        let mut bob = store.create_user(new_user("b@x.com", Role::User)).await.unwrap();

        bob.email = "a@x.com".to_string();
        let err = store.update_user(&bob).await;
        assert!(matches!(err, Err(CoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_update_user_respects_admin_ceiling() {
        let store = store().await;
        store.create_user(new_user("a@x.com", Role::Admin)).await.unwrap();
        store.create_user(new_user("b@x.com", Role::Admin)).await.unwrap();
        let mut carol = store.create_user(new_user("c@x.com", Role::User)).await.unwrap();

        carol.role = Role::Admin;
        let err = store.update_user(&carol).await;
        assert!(matches!(err, Err(CoreError::AdminLimitExceeded(2))));
    }

    #[tokio::test]
    async fn test_change_password() {
        let store = store().await;
        let user = store.create_user(new_user("a@x.com", Role::User)).await.unwrap();

        store.change_password(&user.id, "new-secret").await.unwrap();
        assert!(store
            .verify_credentials("a@x.com", "new-secret")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .verify_credentials("a@x.com", "hunter2!")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let store = store().await;
        let user = store.create_user(new_user("a@x.com", Role::User)).await.unwrap();

        store.delete_user(&user.id).await.unwrap();
        assert!(store.find_by_id(&user.id).await.unwrap().is_none());

        let err = store.delete_user(&user.id).await;
        assert!(matches!(err, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_verify_credentials_uniform_failure() {
        let store = store().await;
        store.create_user(new_user("a@x.com", Role::User)).await.unwrap();

        // Unknown email and wrong secret are the same None
        assert!(store
            .verify_credentials("missing@x.com", "hunter2!")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .verify_credentials("a@x.com", "wrong")
            .await
            .unwrap()
            .is_none());
    }
}
