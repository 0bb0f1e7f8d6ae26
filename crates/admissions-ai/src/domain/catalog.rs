use serde::{Deserialize, Serialize};

use super::student::DegreeLevel;

/// Catalog entry authored outside this service; treated as read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub ranking: Option<u32>,
    #[serde(default)]
    pub partner: bool,
    #[serde(default)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub university_id: String,
    pub name: String,
    pub field: String,
    pub degree_level: DegreeLevel,
    pub country: String,
    /// Annual tuition in the catalog currency.
    pub tuition_fee: u32,
    pub duration_months: u16,
    #[serde(default)]
    pub min_gpa: Option<f32>,
    #[serde(default)]
    pub min_english_score: Option<f32>,
    #[serde(default)]
    pub scholarships_available: bool,
}
