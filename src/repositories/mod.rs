pub mod exam_session_repository;
pub mod question_repository;
pub mod subject_repository;

pub use exam_session_repository::{ExamSessionRepository, MongoExamSessionRepository};
pub use question_repository::{MongoQuestionRepository, QuestionRepository};
pub use subject_repository::{MongoSubjectRepository, SubjectRepository};

#[cfg(test)]
pub use exam_session_repository::MockExamSessionRepository;
#[cfg(test)]
pub use question_repository::MockQuestionRepository;
#[cfg(test)]
pub use subject_repository::MockSubjectRepository;
