use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub id: String,
    pub student_id: String,
    pub counselor_id: String,
    pub channel: String,
    pub direction: CommunicationDirection,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    /// Hours the counselor took to answer; only set on outbound replies.
    #[serde(default)]
    pub response_time_hours: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub assignee_id: String,
    #[serde(default)]
    pub student_id: Option<String>,
    /// Record that caused the task, e.g. an outreach or lead score id.
    #[serde(default)]
    pub related_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub holder_id: String,
    pub badge_type: String,
    pub label: String,
    pub awarded_at: DateTime<Utc>,
}

impl Badge {
    /// Append `badge` unless the holder already carries one of the same type.
    pub fn award(badges: &mut Vec<Badge>, badge: Badge) -> bool {
        let duplicate = badges
            .iter()
            .any(|held| held.holder_id == badge.holder_id && held.badge_type == badge.badge_type);
        if duplicate {
            return false;
        }
        badges.push(badge);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: String,
    pub participant_id: String,
    pub quiz_id: String,
    pub score: f64,
    pub passed: bool,
    pub feedback: String,
    pub graded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingProgress {
    pub id: String,
    pub counselor_id: String,
    pub completed_modules: Vec<String>,
    pub module_scores: BTreeMap<String, f64>,
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}
