use std::collections::BTreeSet;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{side_effect_failure, CrmService, WorkflowError};
use crate::domain::{
    Course, OutreachCampaign, OutreachStatus, StudentProfile, Task, TaskPriority, University,
    UniversityOutreach,
};
use crate::lifecycle::advance_outreach;
use crate::prompt::{Field, OutputSchema, PromptBuilder};
use crate::store::next_id;

#[derive(Debug, Clone, Deserialize)]
pub struct OutreachRequest {
    #[serde(alias = "campaignName")]
    pub campaign_name: String,
    #[serde(alias = "universityIds")]
    pub university_ids: Vec<String>,
    #[serde(default, alias = "studentId")]
    pub student_id: Option<String>,
    pub purpose: String,
    #[serde(default)]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutreachResult {
    pub university_id: String,
    pub outreach_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutreachCampaignOutcome {
    pub campaign: OutreachCampaign,
    pub drafted: usize,
    pub failed: usize,
    pub results: Vec<OutreachResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    Responded,
    FollowUpNeeded,
}

impl ResponseOutcome {
    fn status(self) -> OutreachStatus {
        match self {
            ResponseOutcome::Responded => OutreachStatus::Responded,
            ResponseOutcome::FollowUpNeeded => OutreachStatus::FollowUpNeeded,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseLog {
    pub outcome: ResponseOutcome,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutreachResponseOutcome {
    pub outreach: UniversityOutreach,
    pub follow_up_task: Option<Task>,
    pub follow_up_error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DraftOutput {
    subject: String,
    body: String,
}

impl CrmService {
    /// Draft one inquiry per university. Calls run concurrently, paced by the
    /// reasoner's throttle; a failed draft is reported without sinking the
    /// rest of the campaign.
    pub async fn generate_outreach(
        &self,
        counselor_id: &str,
        request: OutreachRequest,
    ) -> Result<OutreachCampaignOutcome, WorkflowError> {
        let mut seen = BTreeSet::new();
        let university_ids: Vec<String> = request
            .university_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();
        if university_ids.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "at least one university_id is required".to_string(),
            ));
        }
        if request.purpose.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("purpose is required".to_string()));
        }

        let student = match &request.student_id {
            Some(student_id) => Some(self.store.students.require(student_id)?),
            None => None,
        };
        let campaign_id = next_id::<OutreachCampaign>();

        let drafts = university_ids.iter().map(|university_id| {
            self.draft_outreach(
                counselor_id,
                &campaign_id,
                university_id,
                student.as_ref(),
                &request,
            )
        });
        let outcomes = join_all(drafts).await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (university_id, outcome) in university_ids.iter().zip(outcomes) {
            results.push(match outcome {
                Ok(outreach) => OutreachResult {
                    university_id: university_id.clone(),
                    outreach_id: Some(outreach.id),
                    error: None,
                },
                Err(error) => OutreachResult {
                    university_id: university_id.clone(),
                    outreach_id: None,
                    error: Some(side_effect_failure("outreach draft", &error)),
                },
            });
        }

        let campaign = self.store.campaigns.create(OutreachCampaign {
            id: campaign_id,
            name: request.campaign_name.trim().to_string(),
            counselor_id: counselor_id.to_string(),
            university_ids,
            outreach_ids: results
                .iter()
                .filter_map(|result| result.outreach_id.clone())
                .collect(),
            created_at: Utc::now(),
        })?;
        let drafted = campaign.outreach_ids.len();
        let failed = results.len() - drafted;
        info!(campaign_id = %campaign.id, drafted, failed, "outreach campaign drafted");

        Ok(OutreachCampaignOutcome {
            campaign,
            drafted,
            failed,
            results,
        })
    }

    async fn draft_outreach(
        &self,
        counselor_id: &str,
        campaign_id: &str,
        university_id: &str,
        student: Option<&StudentProfile>,
        request: &OutreachRequest,
    ) -> Result<UniversityOutreach, WorkflowError> {
        let university: University = self.store.universities.require(university_id)?;
        let owner = university.id.clone();
        let courses = self.select(self.store.courses.as_ref(), move |course: &Course| {
            course.university_id == owner
        })?;

        let mut prompt = PromptBuilder::new(
            "outreach_email",
            "You write concise, professional emails from an international education consultancy to university admissions teams.",
        )
        .json("University", &university)
        .excerpt("Courses of interest", &courses, self.limits.outreach_courses)
        .context("Purpose", request.purpose.trim())
        .context("Tone", request.tone.as_deref().unwrap_or("professional and warm"));
        if let Some(student) = student {
            prompt = prompt
                .context("On behalf of", &student.full_name)
                .context("Intended level", student.degree_level.label())
                .context("Fields", student.preferred_fields.join(", "));
        }
        let prompt = prompt
            .output("subject: email subject line")
            .output("body: plain-text email body signed by the counselor")
            .build(
                OutputSchema::object()
                    .required("subject", Field::string())
                    .required("body", Field::string()),
            )?;

        let draft: DraftOutput = self.reasoner.complete(&prompt).await?;
        let outreach = self.store.outreach.create(UniversityOutreach {
            id: next_id::<UniversityOutreach>(),
            university_id: university.id,
            student_id: student.map(|student| student.id.clone()),
            counselor_id: counselor_id.to_string(),
            campaign_id: Some(campaign_id.to_string()),
            subject: draft.subject,
            body: draft.body,
            status: OutreachStatus::Draft,
            sent_at: None,
            responded_at: None,
            response_summary: None,
            created_at: Utc::now(),
        })?;
        Ok(outreach)
    }

    pub fn mark_outreach_sent(&self, outreach_id: &str) -> Result<UniversityOutreach, WorkflowError> {
        let mut outreach = self.store.outreach.require(outreach_id)?;
        advance_outreach(&mut outreach, OutreachStatus::Sent, Utc::now())?;
        let outreach = self.store.outreach.update(outreach)?;
        info!(outreach_id = %outreach.id, "outreach marked sent");
        Ok(outreach)
    }

    /// Log a university's reply. `follow_up_needed` opens a task for the
    /// counselor who owns the outreach; if that task cannot be saved the
    /// logged response still stands and the failure is reported.
    pub fn record_outreach_response(
        &self,
        outreach_id: &str,
        log: ResponseLog,
    ) -> Result<OutreachResponseOutcome, WorkflowError> {
        let mut outreach = self.store.outreach.require(outreach_id)?;
        advance_outreach(&mut outreach, log.outcome.status(), Utc::now())?;
        if let Some(summary) = log.summary.filter(|summary| !summary.trim().is_empty()) {
            outreach.response_summary = Some(summary);
        }
        let outreach = self.store.outreach.update(outreach)?;

        let (follow_up_task, follow_up_error) = match log.outcome {
            ResponseOutcome::FollowUpNeeded => match self.create_follow_up(
                &outreach.counselor_id,
                format!("Follow up: {}", outreach.subject),
                outreach
                    .response_summary
                    .clone()
                    .unwrap_or_else(|| "University requested a follow-up.".to_string()),
                outreach.student_id.clone(),
                Some(outreach.id.clone()),
                TaskPriority::Medium,
            ) {
                Ok(task) => (Some(task), None),
                Err(error) => {
                    (None, Some(side_effect_failure("outreach follow-up task", &error)))
                }
            },
            ResponseOutcome::Responded => (None, None),
        };
        info!(
            outreach_id = %outreach.id,
            status = outreach.status.label(),
            "outreach response recorded"
        );

        Ok(OutreachResponseOutcome {
            outreach,
            follow_up_task,
            follow_up_error,
        })
    }
}
