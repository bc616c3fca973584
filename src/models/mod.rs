use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::blank_slots;

/// Quiz-taking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    /// Immediate per-question feedback, running score.
    Practice,
    /// Answers recorded silently, graded only at final aggregation.
    Exam,
}

impl Default for QuizMode {
    fn default() -> Self {
        QuizMode::Practice
    }
}

/// Scope of the countdown timer, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Question,
    Quiz,
    None,
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    #[serde(default)]
    pub mode: TimerMode,
    #[serde(default)]
    pub limit_seconds: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleConfig {
    #[serde(default)]
    pub questions: bool,
    #[serde(default)]
    pub answers: bool,
}

/// Question variants. The serde tag matches the transport format; a payload
/// without a `type` field is a multiple-choice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    Numeric,
    FillBlank,
    TrueFalse,
    Text,
    ImageUpload,
}

impl Default for QuestionType {
    fn default() -> Self {
        QuestionType::MultipleChoice
    }
}

/// How `tolerance_value` on a numeric question is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToleranceType {
    Absolute,
    Percentage,
}

impl Default for ToleranceType {
    fn default() -> Self {
        ToleranceType::Absolute
    }
}

/// One answer option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Choice {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: short_id(),
            text: text.into(),
            is_correct,
            image: None,
        }
    }
}

/// A quiz question. Kept flat: every variant-specific field is optional and
/// only meaningful for its `question_type`, mirroring the transport format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    pub prompt: String,
    /// Data URI, http(s) URL, or `local:<id>` registry token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    // multiple-choice
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub allow_multiple_answers: bool,

    // numeric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_value: Option<f64>,
    #[serde(default)]
    pub tolerance_type: ToleranceType,

    // fill-blank, slot positions implied by ___ tokens in the prompt
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blank_answers: Vec<String>,

    // true-false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_true: Option<bool>,

    // text (never auto-graded)
    #[serde(default)]
    pub is_long_answer: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_keywords: Vec<String>,
}

impl Question {
    pub fn new(question_type: QuestionType, prompt: impl Into<String>) -> Self {
        Self {
            id: short_id(),
            question_type,
            prompt: prompt.into(),
            image: None,
            choices: Vec::new(),
            allow_multiple_answers: false,
            correct_answer_number: None,
            tolerance_value: None,
            tolerance_type: ToleranceType::Absolute,
            blank_answers: Vec::new(),
            is_true: None,
            is_long_answer: false,
            expected_keywords: Vec::new(),
        }
    }

    /// Ids of the choices flagged correct.
    pub fn correct_choice_ids(&self) -> Vec<&str> {
        self.choices
            .iter()
            .filter(|c| c.is_correct)
            .map(|c| c.id.as_str())
            .collect()
    }
}

fn default_true() -> bool {
    true
}

/// Authoring-time quiz definition. Immutable once a session is created from
/// it; sessions work on a deep clone of `questions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub mode: QuizMode,
    #[serde(default)]
    pub timer_config: TimerConfig,
    #[serde(default)]
    pub shuffle_config: ShuffleConfig,
    #[serde(default = "default_true")]
    pub show_detailed_results: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            mode: QuizMode::Practice,
            timer_config: TimerConfig::default(),
            shuffle_config: ShuffleConfig::default(),
            show_detailed_results: true,
            questions: Vec::new(),
        }
    }

    /// Authoring-level validation, run before a session is ever constructed.
    /// The session itself assumes a structurally usable quiz.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("quiz title must not be empty".to_string());
        }
        if self.questions.is_empty() {
            return Err("quiz must contain at least one question".to_string());
        }
        for q in &self.questions {
            if q.question_type == QuestionType::FillBlank {
                if q.blank_answers.is_empty() {
                    return Err(format!(
                        "fill-blank question {} has no configured answers",
                        q.id
                    ));
                }
                if blank_slots(&q.prompt) == 0 {
                    return Err(format!(
                        "fill-blank question {} has no ___ slots in its prompt",
                        q.id
                    ));
                }
            }
            if q.question_type == QuestionType::MultipleChoice && q.choices.is_empty() {
                return Err(format!("multiple-choice question {} has no choices", q.id));
            }
        }
        Ok(())
    }
}

/// A submitted answer. The shape varies with the question type; the grader
/// dispatches on the question's type tag, never on the answer's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Bool(bool),
    One(String),
    Many(Vec<String>),
}

/// Grading outcome. `pending_review` marks answers that need a human grader,
/// distinct from incorrect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_correct: bool,
    pub pending_review: bool,
}

impl Verdict {
    pub const INCORRECT: Verdict = Verdict {
        is_correct: false,
        pending_review: false,
    };

    pub const PENDING: Verdict = Verdict {
        is_correct: false,
        pending_review: true,
    };
}

/// Per-question line of a finalized report. Derived, never stored on the
/// session itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
    pub is_correct: bool,
    pub pending_review: bool,
    pub time_spent_ms: u64,
}

/// Aggregated report for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizReport {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub total_time_ms: u64,
    pub question_results: Vec<QuestionResult>,
}

/// Persisted attempt record. History is append-only: records are added or
/// wholesale-cleared, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub name: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: u32,
    pub max_score: u32,
    pub date: DateTime<Utc>,
    pub details: Vec<QuestionResult>,
}

/// Short single-use token for question/choice ids.
fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
