pub mod acquisition_service;
pub mod answer_normalization;
pub mod duration_format;
pub mod exam_session_service;
pub mod leaderboard_service;
pub mod session_locks;

pub use acquisition_service::AcquisitionService;
pub use exam_session_service::ExamSessionService;
pub use leaderboard_service::LeaderboardService;
pub use session_locks::SessionLocks;
