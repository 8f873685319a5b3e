pub mod exam_session;
pub mod exam_type;
pub mod leaderboard;
pub mod question;
pub mod subject;
pub use exam_session::{Answer, ExamSession, SubjectScore};
pub use exam_type::ExamType;
pub use leaderboard::LeaderboardEntry;
pub use question::{Question, QuestionKey, QuestionSource};
pub use subject::Subject;
