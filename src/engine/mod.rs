/// External code engine boundary
///
/// The generation/explanation capability lives outside this crate. Callers
/// hand the core an implementation of `CodeEngine`; the core only records
/// what comes back and surfaces `ServiceUnavailable` untouched. No retry,
/// no fallback.

use crate::db::models::{Language, ModelLabel};
use crate::error::CoreResult;
use async_trait::async_trait;

#[async_trait]
pub trait CodeEngine: Send + Sync {
    /// Generate code for a prompt. Fails with `ServiceUnavailable` on
    /// transport or model failure.
    async fn generate(
        &self,
        prompt: &str,
        language: Language,
        model_label: ModelLabel,
    ) -> CoreResult<String>;

    /// Explain a piece of code. Fails with `ServiceUnavailable` on transport
    /// or model failure.
    async fn explain(&self, code: &str, language: Language) -> CoreResult<String>;
}
