/// Assistant service: invokes the external code engine and records the
/// outcome as history. An engine failure is surfaced to the caller as-is
/// and leaves no trace in the store.

use crate::{
    db::models::{HistoryItem, HistoryKind, Language, ModelLabel, NewHistoryItem},
    engine::CodeEngine,
    error::CoreResult,
    history::HistoryStore,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Assistant {
    engine: Arc<dyn CodeEngine>,
    history: Arc<HistoryStore>,
}

impl Assistant {
    pub fn new(engine: Arc<dyn CodeEngine>, history: Arc<HistoryStore>) -> Self {
        Self { engine, history }
    }

    /// Generate code and record the interaction for `user_id`.
    pub async fn generate_code(
        &self,
        user_id: &str,
        prompt: &str,
        language: Language,
        model_label: ModelLabel,
    ) -> CoreResult<HistoryItem> {
        let output = self.engine.generate(prompt, language, model_label).await?;

        self.history
            .record(NewHistoryItem {
                user_id: user_id.to_string(),
                kind: HistoryKind::Generation,
                model_label,
                language,
                input: prompt.to_string(),
                output,
            })
            .await
    }

    /// Explain code and record the interaction for `user_id`.
    pub async fn explain_code(
        &self,
        user_id: &str,
        code: &str,
        language: Language,
    ) -> CoreResult<HistoryItem> {
        let output = self.engine.explain(code, language).await?;

        self.history
            .record(NewHistoryItem {
                user_id: user_id.to_string(),
                kind: HistoryKind::Explanation,
                // Explanations always run on the flagship engine
                model_label: ModelLabel::GeminiFlash,
                language,
                input: code.to_string(),
                output,
            })
            .await
    }
}
