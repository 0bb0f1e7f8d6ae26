use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::matching::prioritise_fields;
use super::{CrmService, WorkflowError};
use crate::analytics::filter::{self, Criteria, Selector};
use crate::domain::{Course, ScholarshipMatch, ScholarshipRecommendation};
use crate::prompt::{Field, OutputSchema, PromptBuilder};
use crate::store::next_id;

#[derive(Debug, Clone, Deserialize)]
pub struct ScholarshipRequest {
    #[serde(alias = "studentProfileId", alias = "student_profile_id")]
    pub student_id: String,
}

#[derive(Debug, Deserialize)]
struct ScholarshipOutput {
    matches: Vec<ScholarshipMatch>,
    summary: String,
}

/// Catalog row trimmed to what matters for funding.
#[derive(Debug, Serialize)]
struct FundingCandidate<'a> {
    course_id: &'a str,
    name: &'a str,
    field: &'a str,
    country: &'a str,
    tuition_fee: u32,
}

impl CrmService {
    /// Recommend scholarships among courses that advertise funding in the
    /// student's preferred destinations. Budget is not applied here since
    /// funding may close the gap.
    pub async fn recommend_scholarships(
        &self,
        student_id: &str,
    ) -> Result<ScholarshipRecommendation, WorkflowError> {
        let student = self.store.students.require(student_id)?;
        let criteria = Criteria {
            degree_level: Selector::Only(student.degree_level),
            preferred_countries: student.preferred_countries.clone(),
            applicant_gpa: student.gpa,
            applicant_english_score: student.english_score,
            ..Criteria::default()
        };
        let funded: Vec<Course> = self
            .fetch(self.store.courses.as_ref())?
            .into_iter()
            .filter(|course| course.scholarships_available)
            .collect();
        let mut candidates = filter::apply(funded, &criteria);
        prioritise_fields(&mut candidates, &student.preferred_fields);

        let rows: Vec<FundingCandidate<'_>> = candidates
            .iter()
            .map(|course| FundingCandidate {
                course_id: &course.id,
                name: &course.name,
                field: &course.field,
                country: &course.country,
                tuition_fee: course.tuition_fee,
            })
            .collect();

        let scholarship = OutputSchema::object()
            .required("name", Field::string())
            .required("provider", Field::string())
            .required("fit_score", Field::integer().range(0.0, 100.0))
            .required("rationale", Field::string())
            .optional("course_id", Field::string())
            .optional("estimated_amount", Field::integer().range(0.0, 1_000_000.0))
            .optional("deadline", Field::string());
        let request = PromptBuilder::new(
            "scholarship_recommendation",
            "You are a scholarship advisor for international students.",
        )
        .json("Student profile", &student)
        .excerpt(
            "Courses with scholarships",
            &rows,
            self.limits.scholarship_candidates,
        )
        .instruction("Include well-known government and university scholarships the student is eligible for. Link a course_id only when the award belongs to a listed course.")
        .output("matches: scholarship name, provider, fit_score 0-100, rationale, optional course_id, estimated_amount and deadline")
        .output("summary: short overview for the student")
        .build(
            OutputSchema::object()
                .required("matches", Field::array(Field::object(scholarship)))
                .required("summary", Field::string()),
        )?;

        let output: ScholarshipOutput = self.reasoner.complete(&request).await?;
        let known: HashSet<&str> = candidates.iter().map(|course| course.id.as_str()).collect();
        let mut matches = output.matches;
        for entry in &mut matches {
            if entry
                .course_id
                .as_deref()
                .is_some_and(|course_id| !known.contains(course_id))
            {
                entry.course_id = None;
            }
        }
        matches.sort_by(|a, b| b.fit_score.cmp(&a.fit_score));

        let recommendation = self
            .store
            .scholarships
            .create(ScholarshipRecommendation {
                id: next_id::<ScholarshipRecommendation>(),
                student_id: student.id.clone(),
                matches,
                summary: output.summary,
                computed_at: Utc::now(),
            })?;
        info!(
            student_id = %student.id,
            matches = recommendation.matches.len(),
            "scholarships recommended"
        );
        Ok(recommendation)
    }
}
