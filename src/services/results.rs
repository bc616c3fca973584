//! Result aggregation.
//! Derives a finalized report from a session snapshot. Pure and idempotent:
//! calling it repeatedly on an unmodified session yields identical output,
//! so exam results can be previewed without re-grading side effects.

use chrono::Utc;

use crate::models::{QuestionResult, QuizReport, ResultRecord};
use crate::services::grading::grade;
use crate::services::session::Session;

/// Builds the report over every question in the session's working copy.
/// Unanswered questions grade through the unanswered rule and score as
/// incorrect, so the breakdown always covers the full quiz.
pub fn results(session: &Session) -> QuizReport {
    let mut question_results = Vec::with_capacity(session.questions().len());
    let mut score: u32 = 0;

    for question in session.questions() {
        let answer = session.answer_for(&question.id);
        let verdict = grade(question, answer);
        if verdict.is_correct {
            score += 1;
        }
        question_results.push(QuestionResult {
            question_id: question.id.clone(),
            prompt: question.prompt.clone(),
            question_type: question.question_type,
            answer: answer.cloned(),
            is_correct: verdict.is_correct,
            pending_review: verdict.pending_review,
            time_spent_ms: session
                .time_spent(&question.id)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        });
    }

    let total = question_results.len() as u32;
    let percentage = if total == 0 {
        0
    } else {
        (f64::from(score) / f64::from(total) * 100.0).round() as u32
    };

    QuizReport {
        score,
        total,
        percentage,
        total_time_ms: session.total_time().as_millis() as u64,
        question_results,
    }
}

/// Packages the report for the append-only result history, stamped with the
/// completion time. Callers skip persisting it for preview sessions.
pub fn to_record(session: &Session, name: impl Into<String>) -> ResultRecord {
    let report = results(session);
    ResultRecord {
        name: name.into(),
        quiz_id: session.quiz().id.clone(),
        quiz_title: session.quiz().title.clone(),
        score: report.score,
        max_score: report.total,
        date: Utc::now(),
        details: report.question_results,
    }
}
