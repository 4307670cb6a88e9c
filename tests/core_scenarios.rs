/// End-to-end scenarios against a file-backed store, exercising the full
/// context lifecycle the way an embedding application would.

use anyhow::Result;
use async_trait::async_trait;
use codegenie_core::{
    analytics, config::{AuthConfig, BootstrapAdmin, CoreConfig, LoggingConfig, StorageConfig},
    AppContext, Assistant, CodeEngine, CoreError, CoreResult, Feedback, Language, ModelLabel, Role,
    SessionState,
};
use std::path::Path;
use std::sync::Arc;

struct CannedEngine;

#[async_trait]
impl CodeEngine for CannedEngine {
    async fn generate(
        &self,
        prompt: &str,
        _language: Language,
        _model_label: ModelLabel,
    ) -> CoreResult<String> {
        Ok(format!("# solution\n# {}", prompt))
    }

    async fn explain(&self, _code: &str, _language: Language) -> CoreResult<String> {
        Ok("Slices the list back to front.".to_string())
    }
}

fn test_config(data_dir: &Path, login_delay_ms: u64) -> CoreConfig {
    CoreConfig {
        storage: StorageConfig {
            data_directory: data_dir.to_path_buf(),
            store_db: data_dir.join("codegenie.sqlite"),
        },
        auth: AuthConfig {
            session_ttl_secs: 3600,
            login_delay_ms,
            bootstrap_admin: Some(BootstrapAdmin {
                email: "a@x.com".to_string(),
                secret: "secret1".to_string(),
                display_name: "System Admin".to_string(),
            }),
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}

#[tokio::test]
async fn admin_ceiling_walkthrough() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = AppContext::new(test_config(dir.path(), 0)).await?;

    // The seeded admin can log in; a bad secret fails like an unknown email
    let admin = ctx.sessions.login("a@x.com", "secret1").await?;
    assert_eq!(admin.user.role, Role::Admin);
    assert!(matches!(
        ctx.sessions.login("a@x.com", "wrong").await,
        Err(CoreError::InvalidCredentials)
    ));

    // Registration yields an authenticated ordinary user
    let bob = ctx
        .sessions
        .register("Bob", "b@x.com", "secret2", "First pet?", "rex")
        .await?;
    assert_eq!(bob.user.role, Role::User);

    // Second admin fits under the ceiling, a third does not
    ctx.users.promote_to_admin(&bob.user.id).await?;
    assert_eq!(ctx.users.admin_count().await?, 2);

    let carol = ctx
        .sessions
        .register("Carol", "c@x.com", "secret3", "q", "a")
        .await?;
    assert!(matches!(
        ctx.users.promote_to_admin(&carol.user.id).await,
        Err(CoreError::AdminLimitExceeded(2))
    ));
    assert_eq!(ctx.users.admin_count().await?, 2);

    ctx.close().await;
    Ok(())
}

#[tokio::test]
async fn feedback_walkthrough() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = AppContext::new(test_config(dir.path(), 0)).await?;
    let assistant = Assistant::new(Arc::new(CannedEngine), ctx.history.clone());

    let bob = ctx
        .sessions
        .register("Bob", "b@x.com", "secret2", "q", "a")
        .await?;

    let item = assistant
        .generate_code(
            &bob.user.id,
            "reverse a list",
            Language::Python,
            ModelLabel::GeminiFlash,
        )
        .await?;

    ctx.history
        .attach_feedback(&item.id, Feedback::new(4, "nice")?)
        .await?;
    assert!(matches!(
        ctx.history
            .attach_feedback(&item.id, Feedback::new(2, "")?)
            .await,
        Err(CoreError::FeedbackAlreadyPresent)
    ));

    let bobs_history = ctx.history.list_by_user(&bob.user.id).await?;
    assert_eq!(analytics::average_rating(&bobs_history), Some(4.0));

    ctx.close().await;
    Ok(())
}

#[tokio::test]
async fn sessions_and_seed_survive_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let token = {
        let ctx = AppContext::new(test_config(dir.path(), 0)).await?;
        let session = ctx
            .sessions
            .register("Bob", "b@x.com", "secret2", "q", "a")
            .await?;
        ctx.close().await;
        session.token
    };

    // A fresh context over the same files restores the session by token
    let ctx = AppContext::new(test_config(dir.path(), 0)).await?;
    match ctx.sessions.current_session(&token).await? {
        SessionState::Authenticated(auth) => assert_eq!(auth.user.email, "b@x.com"),
        SessionState::Anonymous => panic!("persisted session should restore"),
    }

    // The bootstrap admin is not reseeded into a non-empty store
    assert_eq!(ctx.users.user_count().await?, 2);

    ctx.close().await;
    Ok(())
}

#[tokio::test]
async fn abandoned_login_leaves_no_session() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = AppContext::new(test_config(dir.path(), 500)).await?;

    // Give up before the simulated latency elapses
    let attempt = tokio::time::timeout(
        std::time::Duration::from_millis(10),
        ctx.sessions.login("a@x.com", "secret1"),
    )
    .await;
    assert!(attempt.is_err());

    let open_sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(&ctx.db)
        .await?;
    assert_eq!(open_sessions, 0);

    ctx.close().await;
    Ok(())
}

#[tokio::test]
async fn analytics_summary_recomputes_from_stores() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ctx = AppContext::new(test_config(dir.path(), 0)).await?;
    let assistant = Assistant::new(Arc::new(CannedEngine), ctx.history.clone());

    let bob = ctx
        .sessions
        .register("Bob", "b@x.com", "secret2", "q", "a")
        .await?;

    let summary = ctx.analytics.summary().await?;
    assert_eq!(summary.interaction_count, 0);
    assert_eq!(summary.average_rating, None);

    assistant
        .generate_code(&bob.user.id, "fizzbuzz", Language::Python, ModelLabel::Gemma)
        .await?;
    assistant
        .explain_code(&bob.user.id, "SELECT 1", Language::Sql)
        .await?;

    let summary = ctx.analytics.summary().await?;
    assert_eq!(summary.user_count, 2); // seeded admin + Bob
    assert_eq!(summary.interaction_count, 2);
    assert_eq!(summary.kind_counts.generations, 1);
    assert_eq!(summary.kind_counts.explanations, 1);
    assert_eq!(summary.language_histogram.get(&Language::Python), Some(&1));
    assert_eq!(summary.language_histogram.get(&Language::Sql), Some(&1));

    // Deleting the user leaves the audit trail intact
    ctx.users.delete_user(&bob.user.id).await?;
    let summary = ctx.analytics.summary().await?;
    assert_eq!(summary.user_count, 1);
    assert_eq!(summary.interaction_count, 2);

    ctx.close().await;
    Ok(())
}
