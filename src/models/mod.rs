pub mod application;
pub mod candidate;
pub mod interview;
pub mod position;

pub use application::{Application, ApplicationStatus, CandidateSnapshot};
pub use candidate::{AcademicRecord, Candidate, CandidateUpsert, SkillSet};
pub use interview::{Interview, InterviewStatus};
pub use position::{Position, PositionStatus};
