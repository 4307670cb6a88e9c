/// CodeGenie Core
///
/// Identity, session, and interaction-history backing store for the
/// CodeGenie coding assistant: user accounts with an admin ceiling,
/// token-based sessions, an append-style history log with at-most-once
/// feedback, and on-demand analytics over all of it. Rendering, transport
/// framing, and the generation engine itself live elsewhere; the engine is
/// consumed through the `CodeEngine` trait.

pub mod analytics;
pub mod assistant;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod error;
pub mod history;
pub mod session;
pub mod users;

pub use assistant::Assistant;
pub use config::CoreConfig;
pub use context::AppContext;
pub use db::models::{
    Feedback, HistoryItem, HistoryKind, Language, ModelLabel, NewHistoryItem, NewUser, Role, User,
};
pub use engine::CodeEngine;
pub use error::{CoreError, CoreResult};
pub use history::HistoryStore;
pub use session::{AuthSession, SessionManager, SessionState};
pub use users::{UserStore, MAX_ADMINS};

/// Initialize logging for embedding binaries. Honors `RUST_LOG`, falling
/// back to the given level.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("codegenie_core={}", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
