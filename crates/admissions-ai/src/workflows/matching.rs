use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CrmService, WorkflowError};
use crate::analytics::filter::{self, Criteria, Selector};
use crate::domain::{Course, StudentProfile, University};
use crate::prompt::{Field, OutputSchema, PromptBuilder};

#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    #[serde(alias = "studentProfileId", alias = "student_profile_id")]
    pub student_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseMatch {
    pub course_id: String,
    pub course_name: String,
    pub university_id: String,
    pub university_name: Option<String>,
    pub country: String,
    pub tuition_fee: u32,
    pub fit_score: u8,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseMatchResult {
    pub student_id: String,
    pub candidates_considered: usize,
    pub matches: Vec<CourseMatch>,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct RankedCourse {
    course_id: String,
    fit_score: u8,
    reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MatchOutput {
    matches: Vec<RankedCourse>,
    summary: String,
}

/// Criteria derived from a student's stated preferences and academic record.
pub fn criteria_for(student: &StudentProfile) -> Criteria {
    Criteria {
        degree_level: Selector::Only(student.degree_level),
        preferred_countries: student.preferred_countries.clone(),
        max_tuition: student.budget_max,
        applicant_gpa: student.gpa,
        applicant_english_score: student.english_score,
        ..Criteria::default()
    }
}

/// Courses in the student's preferred fields first, input order otherwise.
pub(crate) fn prioritise_fields(courses: &mut [Course], fields: &[String]) {
    courses.sort_by_key(|course| {
        !fields
            .iter()
            .any(|field| field.eq_ignore_ascii_case(&course.field))
    });
}

impl CrmService {
    /// Narrow the catalog to courses the student qualifies for and let the
    /// reasoner rank them. Rankings that name unknown courses are dropped.
    pub async fn match_courses(&self, student_id: &str) -> Result<CourseMatchResult, WorkflowError> {
        let student = self.store.students.require(student_id)?;
        let courses = self.fetch(self.store.courses.as_ref())?;
        let universities: HashMap<String, University> = self
            .fetch(self.store.universities.as_ref())?
            .into_iter()
            .map(|university| (university.id.clone(), university))
            .collect();

        let mut candidates = filter::apply(courses, &criteria_for(&student));
        prioritise_fields(&mut candidates, &student.preferred_fields);
        let considered = candidates.len();

        if candidates.is_empty() {
            info!(student_id = %student.id, "no courses satisfy the student's criteria");
            return Ok(CourseMatchResult {
                student_id: student.id,
                candidates_considered: 0,
                matches: Vec::new(),
                summary: "No courses match the student's preferences, budget and entry requirements."
                    .to_string(),
            });
        }

        candidates.truncate(self.limits.match_candidates);
        let request = PromptBuilder::new(
            "course_match",
            "You are an admissions counselor matching a student to university courses.",
        )
        .json("Student profile", &student)
        .excerpt("Eligible courses", &candidates, self.limits.match_candidates)
        .instruction("Only rank courses from the list above and refer to them by their id.")
        .output("matches: course_id, fit_score 0-100 and reasons, best fit first")
        .output("summary: two or three sentences for the student")
        .build(
            OutputSchema::object()
                .required(
                    "matches",
                    Field::array(Field::object(
                        OutputSchema::object()
                            .required("course_id", Field::string())
                            .required("fit_score", Field::integer().range(0.0, 100.0))
                            .required("reasons", Field::array(Field::string())),
                    )),
                )
                .required("summary", Field::string()),
        )?;

        let output: MatchOutput = self.reasoner.complete(&request).await?;
        let by_id: HashMap<&str, &Course> = candidates
            .iter()
            .map(|course| (course.id.as_str(), course))
            .collect();

        let mut matches = Vec::with_capacity(output.matches.len());
        for ranked in output.matches {
            let Some(course) = by_id.get(ranked.course_id.as_str()) else {
                warn!(course_id = %ranked.course_id, "reasoner ranked an unknown course; dropped");
                continue;
            };
            if matches.iter().any(|seen: &CourseMatch| seen.course_id == course.id) {
                continue;
            }
            matches.push(CourseMatch {
                course_id: course.id.clone(),
                course_name: course.name.clone(),
                university_id: course.university_id.clone(),
                university_name: universities
                    .get(&course.university_id)
                    .map(|university| university.name.clone()),
                country: course.country.clone(),
                tuition_fee: course.tuition_fee,
                fit_score: ranked.fit_score,
                reasons: ranked.reasons,
            });
        }
        matches.sort_by(|a, b| b.fit_score.cmp(&a.fit_score));

        Ok(CourseMatchResult {
            student_id: student.id,
            candidates_considered: considered,
            matches,
            summary: output.summary,
        })
    }
}
