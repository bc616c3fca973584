//! Grading engine.
//! Pure verdict computation for every question type; no side effects.

use std::collections::HashSet;

use crate::models::{Answer, Question, QuestionType, ToleranceType, Verdict};

/// Absorbs float rounding on numeric tolerance boundaries. Load-bearing:
/// changing it flips verdicts at the boundary.
const NUMERIC_EPSILON: f64 = 1e-6;

/// Grades one question against a submitted answer. Total over all question
/// types and answer shapes: an unanswered question (`None`) is incorrect,
/// not pending; an answer of the wrong shape is incorrect, not an error.
pub fn grade(question: &Question, answer: Option<&Answer>) -> Verdict {
    let answer = match answer {
        Some(a) => a,
        None => return Verdict::INCORRECT,
    };

    match question.question_type {
        QuestionType::MultipleChoice => grade_multiple_choice(question, answer),
        QuestionType::Numeric => grade_numeric(question, answer),
        QuestionType::FillBlank => grade_fill_blank(question, answer),
        QuestionType::TrueFalse => grade_true_false(question, answer),
        // Human-graded types are consistently flagged for review, never
        // auto-scored.
        QuestionType::Text | QuestionType::ImageUpload => Verdict::PENDING,
    }
}

/// Correct iff the submitted choice-id set equals the correct set exactly.
/// No partial credit.
fn grade_multiple_choice(question: &Question, answer: &Answer) -> Verdict {
    // scalars wrap into a single-element set, whatever their shape
    let submitted: HashSet<&str> = match answer {
        Answer::One(id) => [id.as_str()].into_iter().collect(),
        Answer::Many(ids) => ids.iter().map(String::as_str).collect(),
        Answer::Bool(b) => [if *b { "true" } else { "false" }].into_iter().collect(),
    };
    let correct: HashSet<&str> = question.correct_choice_ids().into_iter().collect();

    Verdict {
        is_correct: submitted == correct,
        pending_review: false,
    }
}

fn grade_numeric(question: &Question, answer: &Answer) -> Verdict {
    let parsed = match answer {
        Answer::One(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    let (parsed, expected) = match (parsed, question.correct_answer_number) {
        (Some(p), Some(e)) if !p.is_nan() => (p, e),
        _ => return Verdict::INCORRECT,
    };

    let tolerance_value = question.tolerance_value.unwrap_or(0.0);
    let tolerance = match question.tolerance_type {
        ToleranceType::Percentage => expected.abs() * tolerance_value / 100.0,
        ToleranceType::Absolute => tolerance_value,
    };

    Verdict {
        is_correct: (parsed - expected).abs() <= tolerance + NUMERIC_EPSILON,
        pending_review: false,
    }
}

/// Every blank must match case-insensitively after trimming; a missing
/// student entry compares as the empty string. A question with no configured
/// answers can never be satisfied.
fn grade_fill_blank(question: &Question, answer: &Answer) -> Verdict {
    if question.blank_answers.is_empty() {
        return Verdict::INCORRECT;
    }

    let submitted: Vec<&str> = match answer {
        Answer::Many(entries) => entries.iter().map(String::as_str).collect(),
        Answer::One(entry) => vec![entry.as_str()],
        Answer::Bool(_) => Vec::new(),
    };

    let all_match = question.blank_answers.iter().enumerate().all(|(i, expected)| {
        let given = submitted.get(i).copied().unwrap_or("");
        given.trim().to_lowercase() == expected.trim().to_lowercase()
    });

    Verdict {
        is_correct: all_match,
        pending_review: false,
    }
}

fn grade_true_false(question: &Question, answer: &Answer) -> Verdict {
    let coerced = matches!(answer, Answer::Bool(true))
        || matches!(answer, Answer::One(text) if text == "true");

    Verdict {
        is_correct: question.is_true == Some(coerced),
        pending_review: false,
    }
}

/// Which of a text question's expected keywords appear in the answer.
/// Informational only, for human graders; never affects the verdict.
pub fn keyword_hits<'a>(question: &'a Question, answer: Option<&Answer>) -> Vec<&'a str> {
    let text = match answer {
        Some(Answer::One(t)) => t.to_lowercase(),
        _ => return Vec::new(),
    };
    question
        .expected_keywords
        .iter()
        .filter(|kw| !kw.trim().is_empty() && text.contains(&kw.trim().to_lowercase()))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Choice;

    fn mc_question(correct: &[&str], incorrect: &[&str]) -> Question {
        let mut q = Question::new(QuestionType::MultipleChoice, "Pick");
        for id in correct {
            let mut c = Choice::new(format!("choice {id}"), true);
            c.id = id.to_string();
            q.choices.push(c);
        }
        for id in incorrect {
            let mut c = Choice::new(format!("choice {id}"), false);
            c.id = id.to_string();
            q.choices.push(c);
        }
        q
    }

    fn numeric_question(expected: f64, tolerance: f64, kind: ToleranceType) -> Question {
        let mut q = Question::new(QuestionType::Numeric, "Compute");
        q.correct_answer_number = Some(expected);
        q.tolerance_value = Some(tolerance);
        q.tolerance_type = kind;
        q
    }

    fn many(ids: &[&str]) -> Answer {
        Answer::Many(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_mc_exact_match_required() {
        let q = mc_question(&["a"], &["b", "c"]);
        assert!(grade(&q, Some(&many(&["a"]))).is_correct);
        assert!(!grade(&q, Some(&many(&["a", "b"]))).is_correct);
        assert!(!grade(&q, Some(&many(&["b"]))).is_correct);
        assert!(!grade(&q, Some(&many(&[]))).is_correct);
    }

    #[test]
    fn test_mc_scalar_answer_wrapped() {
        let q = mc_question(&["a"], &["b"]);
        assert!(grade(&q, Some(&Answer::One("a".to_string()))).is_correct);
    }

    #[test]
    fn test_mc_multi_answer_set_equality() {
        let q = mc_question(&["a", "c"], &["b"]);
        assert!(grade(&q, Some(&many(&["c", "a"]))).is_correct);
        assert!(!grade(&q, Some(&many(&["a"]))).is_correct);
        assert!(!grade(&q, Some(&many(&["a", "b", "c"]))).is_correct);
    }

    #[test]
    fn test_numeric_absolute_tolerance_boundary() {
        let q = numeric_question(10.0, 1.0, ToleranceType::Absolute);
        assert!(grade(&q, Some(&Answer::One("11.0".to_string()))).is_correct);
        assert!(grade(&q, Some(&Answer::One("11.000001".to_string()))).is_correct);
        assert!(!grade(&q, Some(&Answer::One("11.1".to_string()))).is_correct);
    }

    #[test]
    fn test_numeric_percentage_tolerance() {
        let q = numeric_question(200.0, 5.0, ToleranceType::Percentage);
        assert!(grade(&q, Some(&Answer::One("210".to_string()))).is_correct);
        assert!(!grade(&q, Some(&Answer::One("211".to_string()))).is_correct);
    }

    #[test]
    fn test_numeric_garbage_is_incorrect() {
        let q = numeric_question(10.0, 0.0, ToleranceType::Absolute);
        let verdict = grade(&q, Some(&Answer::One("ten".to_string())));
        assert!(!verdict.is_correct);
        assert!(!verdict.pending_review);
    }

    #[test]
    fn test_numeric_missing_expected_is_incorrect() {
        let mut q = Question::new(QuestionType::Numeric, "Compute");
        q.correct_answer_number = None;
        assert!(!grade(&q, Some(&Answer::One("10".to_string()))).is_correct);
    }

    #[test]
    fn test_fill_blank_case_and_whitespace_insensitive() {
        let mut q = Question::new(QuestionType::FillBlank, "Capital: ___");
        q.blank_answers = vec!["Paris".to_string()];
        assert!(grade(&q, Some(&many(&[" paris "]))).is_correct);
        assert!(!grade(&q, Some(&many(&["London"]))).is_correct);
    }

    #[test]
    fn test_fill_blank_missing_entries_compare_empty() {
        let mut q = Question::new(QuestionType::FillBlank, "___ and ___");
        q.blank_answers = vec!["salt".to_string(), "pepper".to_string()];
        assert!(!grade(&q, Some(&many(&["salt"]))).is_correct);
        assert!(grade(&q, Some(&many(&["SALT", "Pepper "]))).is_correct);
    }

    #[test]
    fn test_fill_blank_no_configured_answers_never_correct() {
        let q = Question::new(QuestionType::FillBlank, "___");
        assert!(!grade(&q, Some(&many(&[""]))).is_correct);
        assert!(!grade(&q, Some(&many(&["anything"]))).is_correct);
    }

    #[test]
    fn test_true_false_coercion() {
        let mut q = Question::new(QuestionType::TrueFalse, "Sky is blue");
        q.is_true = Some(true);
        assert!(grade(&q, Some(&Answer::Bool(true))).is_correct);
        assert!(grade(&q, Some(&Answer::One("true".to_string()))).is_correct);
        assert!(!grade(&q, Some(&Answer::Bool(false))).is_correct);

        q.is_true = Some(false);
        assert!(grade(&q, Some(&Answer::One("false".to_string()))).is_correct);
    }

    #[test]
    fn test_text_and_image_upload_always_pending() {
        let text = Question::new(QuestionType::Text, "Explain");
        let upload = Question::new(QuestionType::ImageUpload, "Sketch");
        let verdict = grade(&text, Some(&Answer::One("an essay".to_string())));
        assert!(!verdict.is_correct);
        assert!(verdict.pending_review);
        let verdict = grade(&upload, Some(&Answer::One("iVBORw0KGgo=".to_string())));
        assert!(verdict.pending_review);
    }

    #[test]
    fn test_unanswered_always_incorrect_not_pending() {
        let questions = [
            mc_question(&["a"], &[]),
            numeric_question(1.0, 0.0, ToleranceType::Absolute),
            Question::new(QuestionType::FillBlank, "___"),
            Question::new(QuestionType::TrueFalse, "?"),
            Question::new(QuestionType::Text, "?"),
            Question::new(QuestionType::ImageUpload, "?"),
        ];
        for q in &questions {
            assert_eq!(grade(q, None), Verdict::INCORRECT);
        }
    }

    #[test]
    fn test_keyword_hits_informational_only() {
        let mut q = Question::new(QuestionType::Text, "Explain photosynthesis");
        q.expected_keywords = vec!["chlorophyll".to_string(), "sunlight".to_string()];
        let answer = Answer::One("Plants use Sunlight to make food".to_string());
        assert_eq!(keyword_hits(&q, Some(&answer)), vec!["sunlight"]);
        // a full keyword hit still grades as pending
        assert!(grade(&q, Some(&answer)).pending_review);
    }
}
