use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prospective or active student, including the fields the scoring workflows rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub nationality: String,
    #[serde(default)]
    pub preferred_countries: Vec<String>,
    #[serde(default)]
    pub preferred_fields: Vec<String>,
    pub degree_level: DegreeLevel,
    /// Annual tuition ceiling in the catalog currency.
    #[serde(default)]
    pub budget_max: Option<u32>,
    #[serde(default)]
    pub gpa: Option<f32>,
    #[serde(default)]
    pub english_score: Option<f32>,
    pub profile_completeness: u8,
    #[serde(default)]
    pub lead_score: Option<u8>,
    pub lead_status: LeadStatus,
    #[serde(default)]
    pub counselor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeLevel {
    Foundation,
    Diploma,
    Bachelor,
    Master,
    Phd,
}

impl DegreeLevel {
    pub const fn label(self) -> &'static str {
        match self {
            DegreeLevel::Foundation => "foundation",
            DegreeLevel::Diploma => "diploma",
            DegreeLevel::Bachelor => "bachelor",
            DegreeLevel::Master => "master",
            DegreeLevel::Phd => "phd",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }
}
