use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{side_effect_failure, CrmService, WorkflowError};
use crate::analytics::aggregate::{
    average_response_hours, communication_sentiment, count_where, status_breakdown,
};
use crate::domain::{
    Application, Communication, CommunicationDirection, LeadScore, LeadTier, ScoreFactor,
    StudentProfile, Task, TaskPriority,
};
use crate::prompt::{Field, OutputSchema, PromptBuilder};
use crate::store::next_id;

#[derive(Debug, Clone, Deserialize)]
pub struct LeadScoreRequest {
    #[serde(alias = "studentProfileId", alias = "student_profile_id")]
    pub student_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadScoreOutcome {
    pub lead_score: LeadScore,
    pub follow_up_task: Option<Task>,
    pub follow_up_error: Option<String>,
}

/// Engagement numbers the reasoner scores against.
#[derive(Debug, Clone, Serialize)]
struct EngagementSignals {
    profile_completeness: u8,
    applications: usize,
    applications_by_status: BTreeMap<String, usize>,
    communications: usize,
    inbound_messages: usize,
    avg_response_time_hours: f64,
    sentiment_score: f64,
    days_since_last_contact: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LeadScoreOutput {
    score: u8,
    tier: LeadTier,
    factors: Vec<ScoreFactor>,
    next_actions: Vec<String>,
}

fn signals(
    student: &StudentProfile,
    applications: &[Application],
    communications: &[Communication],
) -> EngagementSignals {
    let last_contact = communications.iter().map(|entry| entry.occurred_at).max();
    EngagementSignals {
        profile_completeness: student.profile_completeness,
        applications: applications.len(),
        applications_by_status: status_breakdown(applications),
        communications: communications.len(),
        inbound_messages: count_where(communications, |entry| {
            entry.direction == CommunicationDirection::Inbound
        }),
        avg_response_time_hours: average_response_hours(communications),
        sentiment_score: communication_sentiment(communications),
        days_since_last_contact: last_contact.map(|at| (Utc::now() - at).num_days()),
    }
}

fn output_schema() -> OutputSchema {
    let factor = OutputSchema::object()
        .required("name", Field::string())
        .required("impact", Field::integer().range(-100.0, 100.0))
        .required("detail", Field::string());
    OutputSchema::object()
        .required("score", Field::integer().range(0.0, 100.0))
        .required("tier", Field::one_of(&["hot", "warm", "cold"]))
        .required("factors", Field::array(Field::object(factor)))
        .required("next_actions", Field::array(Field::string()))
}

impl CrmService {
    /// Score a lead from its profile and engagement history, cache the result
    /// and open a follow-up task for hot leads with an assigned counselor.
    /// The score is kept even when the task cannot be saved.
    pub async fn score_lead(&self, student_id: &str) -> Result<LeadScoreOutcome, WorkflowError> {
        let mut student = self.store.students.require(student_id)?;
        let owner = student.id.clone();
        let applications = self.select(self.store.applications.as_ref(), {
            let owner = owner.clone();
            move |application: &Application| application.student_id == owner
        })?;
        let mut communications = self.select(
            self.store.communications.as_ref(),
            move |entry: &Communication| entry.student_id == owner,
        )?;
        communications.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        let signals = signals(&student, &applications, &communications);
        let request = PromptBuilder::new(
            "lead_score",
            "You are an admissions analyst at an international education consultancy. Score how likely this lead is to enrol through us.",
        )
        .json("Student profile", &student)
        .json("Engagement signals", &signals)
        .excerpt(
            "Applications",
            &applications,
            self.limits.lead_applications,
        )
        .excerpt(
            "Recent communications",
            &communications,
            self.limits.lead_communications,
        )
        .instruction("Weigh profile completeness, application progress, responsiveness and sentiment.")
        .output("score: 0-100 likelihood of enrolment")
        .output("tier: hot, warm or cold")
        .output("factors: the signals that moved the score, with signed impact")
        .output("next_actions: concrete steps for the counselor")
        .build(output_schema())?;

        let output: LeadScoreOutput = self.reasoner.complete(&request).await?;

        let lead_score = self.store.lead_scores.create(LeadScore {
            id: next_id::<LeadScore>(),
            student_id: student.id.clone(),
            score: output.score,
            tier: output.tier,
            factors: output.factors,
            next_actions: output.next_actions,
            computed_at: Utc::now(),
        })?;

        student.lead_score = Some(lead_score.score);
        let student = self.store.students.update(student)?;
        info!(
            student_id = %student.id,
            score = lead_score.score,
            tier = lead_score.tier.label(),
            "lead scored"
        );

        let (follow_up_task, follow_up_error) = match &student.counselor_id {
            Some(counselor_id) if self.rules.is_hot_lead(lead_score.score) => {
                let next_step = lead_score
                    .next_actions
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Contact the student".to_string());
                match self.create_follow_up(
                    counselor_id,
                    format!("Follow up with hot lead {}", student.full_name),
                    format!("Lead score {}. {next_step}", lead_score.score),
                    Some(student.id.clone()),
                    Some(lead_score.id.clone()),
                    TaskPriority::High,
                ) {
                    Ok(task) => (Some(task), None),
                    Err(error) => {
                        (None, Some(side_effect_failure("hot lead follow-up task", &error)))
                    }
                }
            }
            _ => (None, None),
        };

        Ok(LeadScoreOutcome {
            lead_score,
            follow_up_task,
            follow_up_error,
        })
    }
}
