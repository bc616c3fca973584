//! Local-first quiz engine.
//!
//! Students take quizzes of six question types under optional timers, in
//! immediate-feedback practice mode or deferred-grading exam mode; authors
//! share quizzes as compact Base64 codes and review historical results.
//! The embedding UI owns rendering and event wiring; everything here is
//! synchronous engine state driven by discrete UI events.

pub mod models;
pub mod services;
pub mod utils;

pub use models::{
    Answer, Choice, Question, QuestionResult, QuestionType, Quiz, QuizMode, QuizReport,
    ResultRecord, ShuffleConfig, TimerConfig, TimerMode, ToleranceType, Verdict,
};
pub use services::{
    decode, encode, grade, results, to_record, EncodedQuiz, Session, Store, TimerSupervisor,
    TransportError,
};
