use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached lead-scoring output; recomputed wholesale on every recalculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub id: String,
    pub student_id: String,
    pub score: u8,
    pub tier: LeadTier,
    pub factors: Vec<ScoreFactor>,
    pub next_actions: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadTier {
    Hot,
    Warm,
    Cold,
}

impl LeadTier {
    pub const fn label(self) -> &'static str {
        match self {
            LeadTier::Hot => "hot",
            LeadTier::Warm => "warm",
            LeadTier::Cold => "cold",
        }
    }
}

/// One line of the scoring audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    pub impact: i16,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarshipRecommendation {
    pub id: String,
    pub student_id: String,
    pub matches: Vec<ScholarshipMatch>,
    pub summary: String,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarshipMatch {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub estimated_amount: Option<u32>,
    pub fit_score: u8,
    pub rationale: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Counselor performance snapshot plus the reasoner's coaching notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounselorInteraction {
    pub id: String,
    pub counselor_id: String,
    pub metrics: PerformanceMetrics,
    pub strengths: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub assigned_students: usize,
    pub total_applications: usize,
    pub enrolled_applications: usize,
    pub conversion_rate: f64,
    pub avg_response_time_hours: f64,
    pub sentiment_score: f64,
    pub communications: usize,
    pub applications_by_status: BTreeMap<String, usize>,
    pub students_by_country: BTreeMap<String, usize>,
    pub enrollment_trend: BTreeMap<String, usize>,
}
