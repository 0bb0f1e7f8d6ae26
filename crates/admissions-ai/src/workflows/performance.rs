use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CrmService, WorkflowError};
use crate::analytics::aggregate::{
    average_response_hours, communication_sentiment, conversion_rate, group_count, monthly_trend,
    status_breakdown,
};
use crate::domain::{
    Application, ApplicationStatus, Communication, CounselorInteraction, PerformanceMetrics,
    StudentProfile,
};
use crate::prompt::{Field, OutputSchema, PromptBuilder};
use crate::store::next_id;

#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceRequest {
    #[serde(alias = "counselorId")]
    pub counselor_id: String,
}

#[derive(Debug, Deserialize)]
struct PerformanceOutput {
    strengths: Vec<String>,
    improvement_areas: Vec<String>,
    recommendations: Vec<String>,
}

/// Compact per-student row for the prompt.
#[derive(Debug, Serialize)]
struct StudentSummary<'a> {
    full_name: &'a str,
    nationality: &'a str,
    lead_status: &'static str,
    lead_score: Option<u8>,
    profile_completeness: u8,
}

/// Pure aggregation over one counselor's caseload.
pub fn performance_metrics(
    students: &[StudentProfile],
    applications: &[Application],
    communications: &[Communication],
) -> PerformanceMetrics {
    let enrolled: Vec<Application> = applications
        .iter()
        .filter(|application| application.status == ApplicationStatus::Enrolled)
        .cloned()
        .collect();

    PerformanceMetrics {
        assigned_students: students.len(),
        total_applications: applications.len(),
        enrolled_applications: enrolled.len(),
        conversion_rate: conversion_rate(applications),
        avg_response_time_hours: average_response_hours(communications),
        sentiment_score: communication_sentiment(communications),
        communications: communications.len(),
        applications_by_status: status_breakdown(applications),
        students_by_country: group_count(students, |student| student.nationality.clone()),
        enrollment_trend: monthly_trend(&enrolled, |application| Some(application.updated_at)),
    }
}

impl CrmService {
    /// Aggregate a counselor's caseload and persist the reasoner's coaching notes.
    pub async fn counselor_performance(
        &self,
        counselor_id: &str,
    ) -> Result<CounselorInteraction, WorkflowError> {
        let counselor = counselor_id.trim().to_string();
        if counselor.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "counselor_id is required".to_string(),
            ));
        }

        let students = self.select(self.store.students.as_ref(), {
            let counselor = counselor.clone();
            move |student: &StudentProfile| {
                student.counselor_id.as_deref() == Some(counselor.as_str())
            }
        })?;
        let student_ids: BTreeSet<String> =
            students.iter().map(|student| student.id.clone()).collect();
        let applications = self.select(self.store.applications.as_ref(), {
            let counselor = counselor.clone();
            move |application: &Application| {
                application.counselor_id.as_deref() == Some(counselor.as_str())
                    || student_ids.contains(&application.student_id)
            }
        })?;
        let communications = self.select(self.store.communications.as_ref(), {
            let counselor = counselor.clone();
            move |entry: &Communication| entry.counselor_id == counselor
        })?;

        let metrics = performance_metrics(&students, &applications, &communications);
        let caseload: Vec<StudentSummary<'_>> = students
            .iter()
            .map(|student| StudentSummary {
                full_name: &student.full_name,
                nationality: &student.nationality,
                lead_status: student.lead_status.label(),
                lead_score: student.lead_score,
                profile_completeness: student.profile_completeness,
            })
            .collect();

        let request = PromptBuilder::new(
            "counselor_performance",
            "You are a performance coach for education counselors. Review the metrics and caseload below.",
        )
        .context("Counselor", &counselor)
        .json("Performance metrics", &metrics)
        .excerpt("Caseload", &caseload, self.limits.performance_students)
        .instruction("Metrics default to neutral values (0 for rates, 50 for sentiment) when there is no data; say so rather than over-reading them.")
        .output("strengths: what the counselor does well")
        .output("improvement_areas: where results lag")
        .output("recommendations: specific next steps")
        .build(
            OutputSchema::object()
                .required("strengths", Field::array(Field::string()))
                .required("improvement_areas", Field::array(Field::string()))
                .required("recommendations", Field::array(Field::string())),
        )?;

        let output: PerformanceOutput = self.reasoner.complete(&request).await?;
        let interaction = self
            .store
            .counselor_interactions
            .create(CounselorInteraction {
                id: next_id::<CounselorInteraction>(),
                counselor_id: counselor.clone(),
                metrics,
                strengths: output.strengths,
                improvement_areas: output.improvement_areas,
                recommendations: output.recommendations,
                generated_at: Utc::now(),
            })?;

        info!(
            counselor_id = %counselor,
            conversion_rate = interaction.metrics.conversion_rate,
            "counselor performance analysed"
        );
        Ok(interaction)
    }
}
