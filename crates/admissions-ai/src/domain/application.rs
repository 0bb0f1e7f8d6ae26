use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Student x university x course triple tracked through the admissions lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub student_id: String,
    pub university_id: String,
    pub course_id: String,
    #[serde(default)]
    pub counselor_id: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub milestones: BTreeMap<Milestone, MilestoneEntry>,
    #[serde(default)]
    pub intake: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn milestone_completed(&self, milestone: Milestone) -> bool {
        self.milestones
            .get(&milestone)
            .map(|entry| entry.completed)
            .unwrap_or(false)
    }

    pub fn complete_milestone(
        &mut self,
        milestone: Milestone,
        date: NaiveDate,
        notes: Option<String>,
    ) {
        let entry = self.milestones.entry(milestone).or_default();
        entry.completed = true;
        entry.date = Some(date);
        if notes.is_some() {
            entry.notes = notes;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Offer,
    Enrolled,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Enrolled => "enrolled",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn ordered() -> [ApplicationStatus; 7] {
        [
            ApplicationStatus::Draft,
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ApplicationStatus::Offer,
            ApplicationStatus::Enrolled,
            ApplicationStatus::Rejected,
            ApplicationStatus::Withdrawn,
        ]
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Enrolled | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }
}

/// Named checkpoint within an application's progress map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    DocumentsSubmitted,
    ApplicationSubmitted,
    OfferReceived,
    OfferAccepted,
    VisaApplied,
    VisaApproved,
    Enrolled,
}

impl Milestone {
    pub const fn label(self) -> &'static str {
        match self {
            Milestone::DocumentsSubmitted => "documents_submitted",
            Milestone::ApplicationSubmitted => "application_submitted",
            Milestone::OfferReceived => "offer_received",
            Milestone::OfferAccepted => "offer_accepted",
            Milestone::VisaApplied => "visa_applied",
            Milestone::VisaApproved => "visa_approved",
            Milestone::Enrolled => "enrolled",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneEntry {
    pub completed: bool,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}
