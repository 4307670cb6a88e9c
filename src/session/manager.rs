/// Session manager implementation
///
/// Sessions live in a table keyed by opaque token, each row referencing a
/// user id and carrying a fixed expiry (default seven days from issuance).
/// Login and register apply a simulated network delay before any store
/// mutation happens, so an abandoned call leaves no half-written state.

use crate::{
    db::models::{NewUser, Role, User},
    error::{CoreError, CoreResult},
    users::UserStore,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Proof that a request acts on behalf of an authenticated user
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
    pub issued_at: DateTime<Utc>,
}

/// Authentication state restored from a persisted token
#[derive(Debug, Clone)]
pub enum SessionState {
    Anonymous,
    Authenticated(AuthSession),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Session manager service
#[derive(Clone)]
pub struct SessionManager {
    db: SqlitePool,
    users: Arc<UserStore>,
    session_ttl: Duration,
    login_delay: StdDuration,
}

impl SessionManager {
    pub fn new(
        db: SqlitePool,
        users: Arc<UserStore>,
        session_ttl_secs: u64,
        login_delay_ms: u64,
    ) -> Self {
        Self {
            db,
            users,
            session_ttl: Duration::seconds(session_ttl_secs as i64),
            login_delay: StdDuration::from_millis(login_delay_ms),
        }
    }

    /// Authenticate and open a session. Fails uniformly with
    /// `InvalidCredentials` whether the email is unknown or the secret is
    /// wrong.
    pub async fn login(&self, email: &str, secret: &str) -> CoreResult<AuthSession> {
        // Simulated network latency. Cancelling the call here costs nothing:
        // the store is untouched until the delay completes.
        tokio::time::sleep(self.login_delay).await;

        let user = self
            .users
            .verify_credentials(email, secret)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Failed login attempt");
                CoreError::InvalidCredentials
            })?;

        self.open_session(user).await
    }

    /// Create an account and log it in. A successful registration always
    /// yields an authenticated session.
    pub async fn register(
        &self,
        display_name: &str,
        email: &str,
        secret: &str,
        recovery_question: &str,
        recovery_answer: &str,
    ) -> CoreResult<AuthSession> {
        self.users
            .create_user(NewUser {
                email: email.to_string(),
                secret: secret.to_string(),
                role: Role::User,
                display_name: display_name.to_string(),
                recovery_question: Some(recovery_question.to_string()),
                recovery_answer: Some(recovery_answer.to_string()),
            })
            .await?;

        self.login(email, secret).await
    }

    /// Close a session. Idempotent: an unknown token is a no-op.
    pub async fn logout(&self, token: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?1")
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// Restore authentication state from a persisted token. Expired tokens
    /// and tokens whose user has been deleted read as `Anonymous` and are
    /// cleaned up on sight.
    pub async fn current_session(&self, token: &str) -> CoreResult<SessionState> {
        let row = sqlx::query("SELECT user_id, created_at, expires_at FROM sessions WHERE token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(SessionState::Anonymous),
        };

        let user_id: String = row.get("user_id");
        let issued_at: DateTime<Utc> = row.get("created_at");
        let expires_at: DateTime<Utc> = row.get("expires_at");

        if Utc::now() > expires_at {
            self.logout(token).await?;
            return Ok(SessionState::Anonymous);
        }

        match self.users.find_by_id(&user_id).await? {
            Some(user) => Ok(SessionState::Authenticated(AuthSession {
                user,
                token: token.to_string(),
                issued_at,
            })),
            None => {
                // Orphaned session; the user is gone.
                self.logout(token).await?;
                Ok(SessionState::Anonymous)
            }
        }
    }

    /// Update a user's profile. Existing sessions keep their tokens; the
    /// refreshed snapshot is whatever `current_session` re-reads.
    pub async fn update_profile(&self, user: &User) -> CoreResult<()> {
        self.users.update_user(user).await
    }

    /// Remove expired session rows. Returns how many were swept.
    pub async fn purge_expired(&self) -> CoreResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    async fn open_session(&self, user: User) -> CoreResult<AuthSession> {
        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&token)
        .bind(&user.id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        tracing::debug!(user_id = %user.id, "Opened session");

        Ok(AuthSession {
            user,
            token,
            issued_at: now,
        })
    }
}

/// Generate an opaque session token
fn generate_token() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();

    (0..32)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
