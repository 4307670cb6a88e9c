/// Analytics aggregator
///
/// Read-only summaries recomputed from current store contents on every call;
/// nothing here persists aggregate state or mutates a store. The slice-level
/// functions are pure so they can be applied to any snapshot (global history
/// or a single user's).

use crate::{
    db::models::{HistoryItem, HistoryKind, Language},
    error::CoreResult,
    history::HistoryStore,
    users::UserStore,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Interaction counts split by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub generations: u64,
    pub explanations: u64,
}

/// One recomputed snapshot of the admin-facing numbers
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub user_count: u64,
    pub interaction_count: u64,
    pub language_histogram: BTreeMap<Language, u64>,
    /// `None` means no item carries feedback yet; never zero
    pub average_rating: Option<f64>,
    pub kind_counts: KindCounts,
}

/// How many items were recorded per language.
pub fn language_histogram(history: &[HistoryItem]) -> BTreeMap<Language, u64> {
    let mut histogram = BTreeMap::new();
    for item in history {
        *histogram.entry(item.language).or_insert(0) += 1;
    }
    histogram
}

/// Mean feedback rating over the items that have feedback. `None` when no
/// item has any, which is distinct from a genuine average of zero stars
/// (impossible anyway, ratings start at 1).
pub fn average_rating(history: &[HistoryItem]) -> Option<f64> {
    let ratings: Vec<u8> = history
        .iter()
        .filter_map(|item| item.feedback.as_ref().map(|f| f.rating))
        .collect();

    if ratings.is_empty() {
        return None;
    }

    let total: u64 = ratings.iter().map(|&r| r as u64).sum();
    Some(total as f64 / ratings.len() as f64)
}

/// Split the item count by interaction kind.
pub fn count_by_kind(history: &[HistoryItem]) -> KindCounts {
    let generations = history
        .iter()
        .filter(|item| item.kind == HistoryKind::Generation)
        .count() as u64;

    KindCounts {
        generations,
        explanations: history.len() as u64 - generations,
    }
}

/// Aggregator bound to the two stores it reads from
#[derive(Clone)]
pub struct Analytics {
    users: Arc<UserStore>,
    history: Arc<HistoryStore>,
}

impl Analytics {
    pub fn new(users: Arc<UserStore>, history: Arc<HistoryStore>) -> Self {
        Self { users, history }
    }

    /// Recompute everything from one fetched history snapshot, so the
    /// numbers in a single summary are mutually consistent.
    pub async fn summary(&self) -> CoreResult<AnalyticsSummary> {
        let history = self.history.list_all().await?;

        Ok(AnalyticsSummary {
            user_count: self.users.user_count().await?,
            interaction_count: history.len() as u64,
            language_histogram: language_histogram(&history),
            average_rating: average_rating(&history),
            kind_counts: count_by_kind(&history),
        })
    }
}
