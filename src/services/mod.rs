// Core services: grading, session traversal, aggregation, transport,
// timing and persistence.

pub mod grading;
pub mod results;
pub mod session;
pub mod storage;
pub mod timer;
pub mod transport;

pub use grading::{grade, keyword_hits};
pub use results::{results, to_record};
pub use session::Session;
pub use storage::Store;
pub use timer::TimerSupervisor;
pub use transport::{decode, encode, resolve_quiz_param, EncodedQuiz, TransportError};
