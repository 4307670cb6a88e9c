/// History store implementation
///
/// Items are append-only: `input`/`output` never change after acceptance,
/// and the only later mutation is attaching feedback, exactly once. The
/// newest-first ordering is reconstructed from the timestamp with insertion
/// order as the tie-break; it is never stored on the item.

use crate::{
    db::models::{Feedback, HistoryItem, HistoryKind, Language, ModelLabel, NewHistoryItem},
    error::{CoreError, CoreResult},
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

/// History store service
#[derive(Clone)]
pub struct HistoryStore {
    db: SqlitePool,
}

impl HistoryStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append an interaction. The store assigns id and timestamp.
    pub async fn record(&self, item: NewHistoryItem) -> CoreResult<HistoryItem> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO history (id, user_id, kind, model_label, language, input, output, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&id)
        .bind(&item.user_id)
        .bind(item.kind.as_str())
        .bind(item.model_label.as_str())
        .bind(item.language.as_str())
        .bind(&item.input)
        .bind(&item.output)
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::debug!(history_id = %id, kind = item.kind.as_str(), "Recorded interaction");

        Ok(HistoryItem {
            id,
            user_id: item.user_id,
            kind: item.kind,
            model_label: item.model_label,
            language: item.language,
            input: item.input,
            output: item.output,
            created_at: now,
            feedback: None,
        })
    }

    /// All items, newest first.
    pub async fn list_all(&self) -> CoreResult<Vec<HistoryItem>> {
        let rows = sqlx::query(&format!("{} ORDER BY created_at DESC, seq DESC", SELECT_ITEM))
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(row_to_item).collect()
    }

    /// One user's items, newest first (same relative order as `list_all`).
    pub async fn list_by_user(&self, user_id: &str) -> CoreResult<Vec<HistoryItem>> {
        let rows = sqlx::query(&format!(
            "{} WHERE user_id = ?1 ORDER BY created_at DESC, seq DESC",
            SELECT_ITEM
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    pub async fn find_by_id(&self, id: &str) -> CoreResult<Option<HistoryItem>> {
        let row = sqlx::query(&format!("{} WHERE id = ?1", SELECT_ITEM))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.map(|r| row_to_item(&r)).transpose()
    }

    /// Attach feedback to an item. At-most-once: the guarded update only
    /// lands on a row that has never carried feedback, so two racing calls
    /// cannot both succeed.
    pub async fn attach_feedback(&self, history_id: &str, feedback: Feedback) -> CoreResult<()> {
        let result = sqlx::query(
            "UPDATE history SET feedback_rating = ?1, feedback_comment = ?2
             WHERE id = ?3 AND feedback_rating IS NULL",
        )
        .bind(feedback.rating as i64)
        .bind(&feedback.comment)
        .bind(history_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history WHERE id = ?1")
                .bind(history_id)
                .fetch_one(&self.db)
                .await?;
            if exists == 0 {
                return Err(CoreError::NotFound(format!(
                    "History item {} not found",
                    history_id
                )));
            }
            return Err(CoreError::FeedbackAlreadyPresent);
        }

        Ok(())
    }

    pub async fn interaction_count(&self) -> CoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }
}

const SELECT_ITEM: &str = "SELECT id, user_id, kind, model_label, language, input, output,
        created_at, feedback_rating, feedback_comment FROM history";

fn row_to_item(row: &SqliteRow) -> CoreResult<HistoryItem> {
    let kind: String = row.get("kind");
    let model_label: String = row.get("model_label");
    let language: String = row.get("language");
    let created_at: DateTime<Utc> = row.get("created_at");

    let feedback = match row.get::<Option<i64>, _>("feedback_rating") {
        Some(rating) => Some(Feedback {
            rating: rating as u8,
            comment: row.get::<Option<String>, _>("feedback_comment").unwrap_or_default(),
        }),
        None => None,
    };

    Ok(HistoryItem {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: HistoryKind::from_str(&kind)?,
        model_label: ModelLabel::from_str(&model_label)?,
        language: Language::from_str(&language)?,
        input: row.get("input"),
        output: row.get("output"),
        created_at,
        feedback,
    })
}
