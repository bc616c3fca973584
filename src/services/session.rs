//! Session state machine.
//! Owns one quiz attempt: question traversal, answer capture, per-question
//! timing and the practice-mode running score. All operations are total;
//! invalid ids or indices are ignored rather than raised.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::models::{Answer, Question, Quiz, QuizMode};
use crate::services::grading::grade;

/// One active quiz attempt. Works on a deep-cloned, possibly shuffled copy
/// of the quiz's questions; the authoring template is never mutated.
#[derive(Debug)]
pub struct Session {
    quiz: Quiz,
    questions: Vec<Question>,
    current_index: usize,
    has_answered: bool,
    score: u32,
    preview: bool,
    started_at: Instant,
    answers: HashMap<String, Answer>,
    question_started: HashMap<String, Instant>,
    question_durations: HashMap<String, Duration>,
}

impl Session {
    /// Starts an attempt. Clones the questions, applies independent
    /// Fisher-Yates shuffles per the quiz's shuffle config, and timestamps
    /// the first question. Assumes the quiz has at least one question;
    /// authoring validation runs before this point.
    pub fn new(quiz: &Quiz) -> Self {
        let mut questions = quiz.questions.clone();
        let mut rng = thread_rng();

        if quiz.shuffle_config.questions {
            questions.shuffle(&mut rng);
        }
        if quiz.shuffle_config.answers {
            for question in &mut questions {
                question.choices.shuffle(&mut rng);
            }
        }

        let mut session = Self {
            quiz: quiz.clone(),
            questions,
            current_index: 0,
            has_answered: false,
            score: 0,
            preview: false,
            started_at: Instant::now(),
            answers: HashMap::new(),
            question_started: HashMap::new(),
            question_durations: HashMap::new(),
        };
        session.mark_visited(0);
        session
    }

    /// Preview attempts grade and aggregate normally; the flag only tells
    /// the caller not to persist the result.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    /// Records an answer for the target question (explicit id, else the
    /// current one) and grades it immediately. Answer storage is
    /// last-write-wins — a `None` answer (timeout force-submit) overwrites
    /// any prior answer, so the question grades as unanswered. The recorded
    /// duration is first-write-wins so repeated edits never inflate the
    /// time spent.
    ///
    /// Practice mode surfaces the verdict and bumps the running score; exam
    /// mode records silently and always returns `false`.
    pub fn submit_answer(&mut self, answer: Option<Answer>, question_id: Option<&str>) -> bool {
        let index = match question_id {
            Some(id) => match self.questions.iter().position(|q| q.id == id) {
                Some(i) => i,
                None => return false,
            },
            None => self.current_index,
        };
        let qid = self.questions[index].id.clone();

        match answer {
            Some(answer) => {
                self.answers.insert(qid.clone(), answer);
            }
            None => {
                self.answers.remove(&qid);
            }
        }

        if !self.question_durations.contains_key(&qid) {
            let started = self
                .question_started
                .get(&qid)
                .copied()
                .unwrap_or(self.started_at);
            self.question_durations.insert(qid.clone(), started.elapsed());
        }

        let verdict = grade(&self.questions[index], self.answers.get(&qid));

        match self.quiz.mode {
            QuizMode::Practice => {
                self.has_answered = true;
                if verdict.is_correct {
                    self.score += 1;
                }
                verdict.is_correct
            }
            // Correctness is deferred to aggregation; no mid-exam feedback.
            QuizMode::Exam => false,
        }
    }

    /// Advances to the next question. No-op on the last question.
    pub fn next_question(&mut self) {
        if self.is_last_question() {
            return;
        }
        self.current_index += 1;
        self.has_answered = false;
        self.mark_visited(self.current_index);
    }

    /// Non-linear navigation for exam mode. Out-of-range indices are
    /// silently ignored.
    pub fn jump_to_question(&mut self, index: usize) {
        if index >= self.questions.len() {
            return;
        }
        self.current_index = index;
        self.mark_visited(index);
    }

    fn mark_visited(&mut self, index: usize) {
        if let Some(question) = self.questions.get(index) {
            self.question_started
                .entry(question.id.clone())
                .or_insert_with(Instant::now);
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    /// Elapsed wall time of the whole attempt. Monotonic non-decreasing.
    pub fn total_time(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn has_answered(&self) -> bool {
        self.has_answered
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// The shuffled working copy the attempt runs over.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    pub fn time_spent(&self, question_id: &str) -> Option<Duration> {
        self.question_durations.get(question_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, QuestionType};

    fn sample_quiz(mode: QuizMode) -> Quiz {
        let mut quiz = Quiz::new("Sample");
        quiz.mode = mode;
        for i in 0..3 {
            let mut q = Question::new(QuestionType::MultipleChoice, format!("Question {i}"));
            q.id = format!("q{i}");
            let mut right = Choice::new("right", true);
            right.id = format!("q{i}-right");
            let mut wrong = Choice::new("wrong", false);
            wrong.id = format!("q{i}-wrong");
            q.choices = vec![right, wrong];
            quiz.questions.push(q);
        }
        quiz
    }

    fn answer_for(question: usize, correct: bool) -> Answer {
        let suffix = if correct { "right" } else { "wrong" };
        Answer::Many(vec![format!("q{question}-{suffix}")])
    }

    #[test]
    fn test_practice_mode_surfaces_verdict_and_scores() {
        let quiz = sample_quiz(QuizMode::Practice);
        let mut session = Session::new(&quiz);

        assert!(session.submit_answer(Some(answer_for(0, true)), None));
        assert!(session.has_answered());
        assert_eq!(session.score(), 1);

        session.next_question();
        assert!(!session.has_answered());
        assert!(!session.submit_answer(Some(answer_for(1, false)), None));
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn test_exam_mode_defers_everything() {
        let quiz = sample_quiz(QuizMode::Exam);
        let mut session = Session::new(&quiz);

        // correct answers still return false and never touch the score
        assert!(!session.submit_answer(Some(answer_for(0, true)), None));
        assert_eq!(session.score(), 0);
        session.next_question();
        assert!(!session.submit_answer(Some(answer_for(1, true)), None));
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_exam_mode_allows_answer_edits() {
        let quiz = sample_quiz(QuizMode::Exam);
        let mut session = Session::new(&quiz);

        session.submit_answer(Some(answer_for(0, false)), Some("q0"));
        session.submit_answer(Some(answer_for(0, true)), Some("q0"));
        assert_eq!(session.answer_for("q0"), Some(&answer_for(0, true)));
    }

    #[test]
    fn test_first_duration_wins() {
        let quiz = sample_quiz(QuizMode::Exam);
        let mut session = Session::new(&quiz);

        session.submit_answer(Some(answer_for(0, false)), Some("q0"));
        let first = session.time_spent("q0").unwrap();
        std::thread::sleep(Duration::from_millis(10));
        session.submit_answer(Some(answer_for(0, true)), Some("q0"));
        assert_eq!(session.time_spent("q0").unwrap(), first);
    }

    #[test]
    fn test_next_question_stops_at_last() {
        let quiz = sample_quiz(QuizMode::Practice);
        let mut session = Session::new(&quiz);

        session.next_question();
        session.next_question();
        assert!(session.is_last_question());
        session.next_question();
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn test_jump_out_of_range_ignored() {
        let quiz = sample_quiz(QuizMode::Exam);
        let mut session = Session::new(&quiz);

        session.jump_to_question(99);
        assert_eq!(session.current_index(), 0);
        session.jump_to_question(2);
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn test_submit_with_unknown_id_ignored() {
        let quiz = sample_quiz(QuizMode::Practice);
        let mut session = Session::new(&quiz);

        assert!(!session.submit_answer(Some(answer_for(0, true)), Some("missing")));
        assert_eq!(session.score(), 0);
        assert!(session.answer_for("missing").is_none());
    }

    #[test]
    fn test_force_submit_overwrites_prior_answer() {
        let quiz = sample_quiz(QuizMode::Practice);
        let mut session = Session::new(&quiz);

        assert!(session.submit_answer(Some(answer_for(0, true)), None));
        assert_eq!(session.score(), 1);

        // the timeout null submit wipes the stale answer and cannot
        // re-score the question
        assert!(!session.submit_answer(None, None));
        assert!(session.answer_for("q0").is_none());
        assert_eq!(session.score(), 1);

        let report = crate::services::results::results(&session);
        let line = report
            .question_results
            .iter()
            .find(|r| r.question_id == "q0")
            .unwrap();
        assert!(line.answer.is_none());
        assert!(!line.is_correct);
    }

    #[test]
    fn test_timeout_force_submit_records_no_answer() {
        let quiz = sample_quiz(QuizMode::Practice);
        let mut session = Session::new(&quiz);

        assert!(!session.submit_answer(None, None));
        assert!(session.has_answered());
        assert!(session.answer_for("q0").is_none());
        assert!(session.time_spent("q0").is_some());
    }

    #[test]
    fn test_shuffle_preserves_question_and_choice_sets() {
        let mut quiz = sample_quiz(QuizMode::Practice);
        quiz.shuffle_config.questions = true;
        quiz.shuffle_config.answers = true;

        let session = Session::new(&quiz);

        let mut original_ids: Vec<&str> =
            quiz.questions.iter().map(|q| q.id.as_str()).collect();
        let mut shuffled_ids: Vec<&str> =
            session.questions().iter().map(|q| q.id.as_str()).collect();
        original_ids.sort_unstable();
        shuffled_ids.sort_unstable();
        assert_eq!(original_ids, shuffled_ids);

        for original in &quiz.questions {
            let shuffled = session
                .questions()
                .iter()
                .find(|q| q.id == original.id)
                .unwrap();
            let mut original_choices: Vec<&str> =
                original.choices.iter().map(|c| c.id.as_str()).collect();
            let mut shuffled_choices: Vec<&str> =
                shuffled.choices.iter().map(|c| c.id.as_str()).collect();
            original_choices.sort_unstable();
            shuffled_choices.sort_unstable();
            assert_eq!(original_choices, shuffled_choices);
        }
    }

    #[test]
    fn test_shuffle_never_mutates_template() {
        let mut quiz = sample_quiz(QuizMode::Practice);
        quiz.shuffle_config.questions = true;
        let snapshot = quiz.clone();
        let _session = Session::new(&quiz);
        assert_eq!(quiz, snapshot);
    }

    #[test]
    fn test_visited_questions_are_timestamped_once() {
        let quiz = sample_quiz(QuizMode::Exam);
        let mut session = Session::new(&quiz);

        session.jump_to_question(1);
        let started = *session.question_started.get("q1").unwrap();
        session.jump_to_question(0);
        session.jump_to_question(1);
        assert_eq!(*session.question_started.get("q1").unwrap(), started);
    }

    #[test]
    fn test_preview_flag_does_not_change_grading() {
        let quiz = sample_quiz(QuizMode::Practice);
        let mut session = Session::new(&quiz).with_preview(true);
        assert!(session.is_preview());
        assert!(session.submit_answer(Some(answer_for(0, true)), None));
        assert_eq!(session.score(), 1);
    }
}
