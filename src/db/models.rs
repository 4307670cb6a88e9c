/// Row models shared by the core stores
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(CoreError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Programming language tag on a history item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Sql,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Sql => "sql",
        }
    }

    pub fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::Javascript),
            "sql" => Ok(Language::Sql),
            _ => Err(CoreError::Validation(format!("Invalid language: {}", s))),
        }
    }
}

/// Model configuration tag on a history item. Descriptive only; the engine
/// decides what actually serves the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelLabel {
    #[serde(rename = "deepseek-coder-1.3b-instruct")]
    DeepseekCoder,
    #[serde(rename = "gemma-2b")]
    Gemma,
    #[serde(rename = "codebert-base")]
    Codebert,
    #[serde(rename = "gemini-2.5-flash")]
    GeminiFlash,
}

impl ModelLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelLabel::DeepseekCoder => "deepseek-coder-1.3b-instruct",
            ModelLabel::Gemma => "gemma-2b",
            ModelLabel::Codebert => "codebert-base",
            ModelLabel::GeminiFlash => "gemini-2.5-flash",
        }
    }

    pub fn from_str(s: &str) -> CoreResult<Self> {
        match s {
            "deepseek-coder-1.3b-instruct" => Ok(ModelLabel::DeepseekCoder),
            "gemma-2b" => Ok(ModelLabel::Gemma),
            "codebert-base" => Ok(ModelLabel::Codebert),
            "gemini-2.5-flash" => Ok(ModelLabel::GeminiFlash),
            _ => Err(CoreError::Validation(format!("Invalid model label: {}", s))),
        }
    }
}

/// Kind of recorded interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Generation,
    Explanation,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Generation => "generation",
            HistoryKind::Explanation => "explanation",
        }
    }

    pub fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "generation" => Ok(HistoryKind::Generation),
            "explanation" => Ok(HistoryKind::Explanation),
            _ => Err(CoreError::Validation(format!("Invalid history kind: {}", s))),
        }
    }
}

/// User record in the database. The raw secret never appears here; only the
/// argon2 PHC hash is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub recovery_question: Option<String>,
    pub recovery_answer: Option<String>,
    /// Opaque reference to a small avatar payload; size is the caller's problem
    pub avatar_ref: Option<String>,
}

/// Parameters for creating a user. The secret arrives raw and is hashed by
/// the store before anything touches the database.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub secret: String,
    pub role: Role,
    pub display_name: String,
    pub recovery_question: Option<String>,
    pub recovery_answer: Option<String>,
}

/// Session record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Feedback attached to a history item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// 1-5 star rating
    pub rating: u8,
    pub comment: String,
}

impl Feedback {
    /// Validated constructor; rating must be in 1..=5.
    pub fn new(rating: u8, comment: impl Into<String>) -> CoreResult<Self> {
        if !(1..=5).contains(&rating) {
            return Err(CoreError::Validation(format!(
                "Rating must be between 1 and 5, got {}",
                rating
            )));
        }
        Ok(Self {
            rating,
            comment: comment.into(),
        })
    }
}

/// One recorded generation-or-explanation interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    /// Owning user. History outlives user deletion, so this may dangle.
    pub user_id: String,
    pub kind: HistoryKind,
    pub model_label: ModelLabel,
    pub language: Language,
    pub input: String,
    pub output: String,
    pub created_at: DateTime<Utc>,
    pub feedback: Option<Feedback>,
}

/// Parameters for recording a history item. Id and timestamp are assigned by
/// the store.
#[derive(Debug, Clone)]
pub struct NewHistoryItem {
    pub user_id: String,
    pub kind: HistoryKind,
    pub model_label: ModelLabel,
    pub language: Language,
    pub input: String,
    pub output: String,
}
