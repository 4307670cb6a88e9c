/// Application context and dependency injection
use crate::{
    analytics::Analytics,
    config::CoreConfig,
    db,
    db::models::{NewUser, Role},
    error::CoreResult,
    history::HistoryStore,
    session::SessionManager,
    users::UserStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<CoreConfig>,
    pub db: SqlitePool,
    pub users: Arc<UserStore>,
    pub sessions: Arc<SessionManager>,
    pub history: Arc<HistoryStore>,
    pub analytics: Arc<Analytics>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: CoreConfig) -> CoreResult<Self> {
        config.validate()?;

        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        let pool = db::create_pool(&config.storage.store_db, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let users = Arc::new(UserStore::new(pool.clone()));
        let history = Arc::new(HistoryStore::new(pool.clone()));
        let sessions = Arc::new(SessionManager::new(
            pool.clone(),
            users.clone(),
            config.auth.session_ttl_secs,
            config.auth.login_delay_ms,
        ));
        let analytics = Arc::new(Analytics::new(users.clone(), history.clone()));

        let ctx = Self {
            config: Arc::new(config),
            db: pool,
            users,
            sessions,
            history,
            analytics,
        };

        ctx.seed_bootstrap_admin().await?;

        Ok(ctx)
    }

    /// Seed the configured bootstrap admin, but only into an empty store.
    async fn seed_bootstrap_admin(&self) -> CoreResult<()> {
        let Some(admin) = &self.config.auth.bootstrap_admin else {
            return Ok(());
        };

        if self.users.user_count().await? > 0 {
            return Ok(());
        }

        tracing::info!("User table is empty; seeding bootstrap admin");
        self.users
            .create_user(NewUser {
                email: admin.email.clone(),
                secret: admin.secret.clone(),
                role: Role::Admin,
                display_name: admin.display_name.clone(),
                recovery_question: None,
                recovery_answer: None,
            })
            .await?;

        Ok(())
    }

    /// Flush and close the underlying pool. Call on shutdown.
    pub async fn close(&self) {
        self.db.close().await;
    }
}
