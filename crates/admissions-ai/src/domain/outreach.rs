use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// AI-drafted inquiry email sent to a university on a student's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversityOutreach {
    pub id: String,
    pub university_id: String,
    #[serde(default)]
    pub student_id: Option<String>,
    pub counselor_id: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub status: OutreachStatus,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response_summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutreachStatus {
    Draft,
    Sent,
    Responded,
    FollowUpNeeded,
}

impl OutreachStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OutreachStatus::Draft => "draft",
            OutreachStatus::Sent => "sent",
            OutreachStatus::Responded => "responded",
            OutreachStatus::FollowUpNeeded => "follow_up_needed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachCampaign {
    pub id: String,
    pub name: String,
    pub counselor_id: String,
    pub university_ids: Vec<String>,
    pub outreach_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}
