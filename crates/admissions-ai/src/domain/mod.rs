//! Plain records mirrored from the entity store. Joins between them happen by
//! id in memory; a dangling reference is tolerated and simply skipped.

mod application;
mod catalog;
mod derived;
mod engagement;
mod outreach;
mod student;

pub use application::{Application, ApplicationStatus, Milestone, MilestoneEntry};
pub use catalog::{Course, University};
pub use derived::{
    CounselorInteraction, LeadScore, LeadTier, PerformanceMetrics, ScholarshipMatch,
    ScholarshipRecommendation, ScoreFactor,
};
pub use engagement::{
    Badge, Communication, CommunicationDirection, Notification, OnboardingProgress, QuizAttempt,
    Sentiment, Task, TaskPriority, TaskStatus,
};
pub use outreach::{OutreachCampaign, OutreachStatus, UniversityOutreach};
pub use student::{DegreeLevel, LeadStatus, StudentProfile};
