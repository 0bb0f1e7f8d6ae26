use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CrmService, WorkflowError};
use crate::analytics::aggregate::{
    average, conversion_rate, group_count, round_one_decimal, status_breakdown,
};
use crate::analytics::filter::{self, Criteria, Selector};
use crate::domain::{Application, Course, StudentProfile, University};
use crate::export::{CsvReport, CsvSection, ExportError};
use crate::prompt::{Field, OutputSchema, PromptBuilder};

const DEFAULT_TITLE: &str = "Custom Report";
const UNASSIGNED: &str = "unassigned";
const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

/// Application filters; `"all"` or an absent key leaves a dimension open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportFilters {
    #[serde(default)]
    pub status: Selector<String>,
    /// Destination country of the application's university.
    #[serde(default)]
    pub country: Selector<String>,
    #[serde(default, alias = "counselorId")]
    pub counselor_id: Selector<String>,
    #[serde(default, alias = "dateFrom")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, alias = "dateTo")]
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filters: ReportFilters,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default, alias = "includeInsights")]
    pub include_insights: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_applications: usize,
    pub total_students: usize,
    pub conversion_rate: f64,
    pub average_profile_completeness: f64,
    pub applications_by_status: BTreeMap<String, usize>,
    pub applications_by_country: BTreeMap<String, usize>,
    pub applications_by_counselor: BTreeMap<String, usize>,
    pub students_by_lead_status: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub application_id: String,
    pub student: String,
    pub university: String,
    pub course: String,
    pub country: String,
    pub counselor_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInsights {
    pub highlights: Vec<String>,
    pub risks: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub filters: ReportFilters,
    pub summary: ReportSummary,
    pub insights: Option<ReportInsights>,
    pub applications: Vec<ReportRow>,
}

#[derive(Debug, Clone)]
pub enum ReportOutput {
    Json(CustomReport),
    Csv(String),
}

/// Catalog lookups used to resolve an application's destination.
pub struct ReportCatalog<'a> {
    pub students: &'a [StudentProfile],
    pub universities: &'a [University],
    pub courses: &'a [Course],
}

/// Filter applications and aggregate the report body. Pure; no insights.
pub fn build_report(
    title: &str,
    applications: Vec<Application>,
    catalog: &ReportCatalog<'_>,
    filters: &ReportFilters,
    generated_at: DateTime<Utc>,
) -> CustomReport {
    let students: HashMap<&str, &StudentProfile> = catalog
        .students
        .iter()
        .map(|student| (student.id.as_str(), student))
        .collect();
    let universities: HashMap<&str, &University> = catalog
        .universities
        .iter()
        .map(|university| (university.id.as_str(), university))
        .collect();
    let courses: HashMap<&str, &Course> = catalog
        .courses
        .iter()
        .map(|course| (course.id.as_str(), course))
        .collect();

    let destination = |application: &Application| -> Option<String> {
        universities
            .get(application.university_id.as_str())
            .map(|university| university.country.clone())
            .or_else(|| {
                courses
                    .get(application.course_id.as_str())
                    .map(|course| course.country.clone())
            })
    };

    let by_status = Criteria {
        status: filters.status.clone(),
        ..Criteria::default()
    };
    let selected: Vec<Application> = filter::apply(applications, &by_status)
        .into_iter()
        .filter(|application| match filters.country.as_only() {
            Some(country) => destination(application).as_deref() == Some(country.as_str()),
            None => true,
        })
        .filter(|application| match filters.counselor_id.as_only() {
            Some(counselor) => application.counselor_id.as_deref() == Some(counselor.as_str()),
            None => true,
        })
        .filter(|application| {
            let day = application.created_at.date_naive();
            filters.date_from.map_or(true, |from| day >= from)
                && filters.date_to.map_or(true, |to| day <= to)
        })
        .collect();

    let student_ids: BTreeSet<&str> = selected
        .iter()
        .map(|application| application.student_id.as_str())
        .collect();
    let involved: Vec<&StudentProfile> = student_ids
        .iter()
        .filter_map(|id| students.get(id).copied())
        .collect();
    let completeness_total: f64 = involved
        .iter()
        .map(|student| f64::from(student.profile_completeness))
        .sum();

    let summary = ReportSummary {
        total_applications: selected.len(),
        total_students: student_ids.len(),
        conversion_rate: conversion_rate(&selected),
        average_profile_completeness: round_one_decimal(average(
            completeness_total,
            involved.len(),
        )),
        applications_by_status: status_breakdown(&selected),
        applications_by_country: group_count(&selected, |application| {
            destination(application).unwrap_or_else(|| UNKNOWN.to_string())
        }),
        applications_by_counselor: group_count(&selected, |application| {
            application
                .counselor_id
                .clone()
                .unwrap_or_else(|| UNASSIGNED.to_string())
        }),
        students_by_lead_status: group_count(&involved, |student| {
            student.lead_status.label().to_string()
        }),
    };

    let rows = selected
        .iter()
        .map(|application| ReportRow {
            application_id: application.id.clone(),
            student: students
                .get(application.student_id.as_str())
                .map(|student| student.full_name.clone())
                .unwrap_or_else(|| application.student_id.clone()),
            university: universities
                .get(application.university_id.as_str())
                .map(|university| university.name.clone())
                .unwrap_or_else(|| application.university_id.clone()),
            course: courses
                .get(application.course_id.as_str())
                .map(|course| course.name.clone())
                .unwrap_or_else(|| application.course_id.clone()),
            country: destination(application).unwrap_or_else(|| UNKNOWN.to_string()),
            counselor_id: application
                .counselor_id
                .clone()
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            status: application.status.label().to_string(),
            created_at: application.created_at,
        })
        .collect();

    CustomReport {
        title: title.to_string(),
        generated_at,
        filters: filters.clone(),
        summary,
        insights: None,
        applications: rows,
    }
}

fn counts_section(title: &str, key: &str, counts: &BTreeMap<String, usize>) -> CsvSection {
    counts
        .iter()
        .fold(CsvSection::new(title, &[key, "Count"]), |section, (name, count)| {
            section.row([name.clone(), count.to_string()])
        })
}

impl CustomReport {
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let summary = &self.summary;
        let mut report = CsvReport::new(&self.title, self.generated_at);
        report.push(
            CsvSection::new("Summary", &["Metric", "Value"])
                .row([
                    "Total applications".to_string(),
                    summary.total_applications.to_string(),
                ])
                .row(["Total students".to_string(), summary.total_students.to_string()])
                .row([
                    "Conversion rate (%)".to_string(),
                    format!("{:.1}", summary.conversion_rate),
                ])
                .row([
                    "Average profile completeness".to_string(),
                    format!("{:.1}", summary.average_profile_completeness),
                ]),
        );
        report.push(counts_section(
            "Applications by status",
            "Status",
            &summary.applications_by_status,
        ));
        report.push(counts_section(
            "Applications by country",
            "Country",
            &summary.applications_by_country,
        ));
        report.push(counts_section(
            "Applications by counselor",
            "Counselor",
            &summary.applications_by_counselor,
        ));

        if let Some(insights) = &self.insights {
            let mut section = CsvSection::new("Insights", &["Kind", "Insight"]);
            for (kind, entries) in [
                ("highlight", &insights.highlights),
                ("risk", &insights.risks),
                ("recommendation", &insights.recommendations),
            ] {
                for entry in entries {
                    section = section.row([kind.to_string(), entry.clone()]);
                }
            }
            report.push(section);
        }

        let detail = self.applications.iter().fold(
            CsvSection::new(
                "Applications",
                &[
                    "Application", "Student", "University", "Course", "Country", "Counselor",
                    "Status", "Created",
                ],
            ),
            |section, row| {
                section.row([
                    row.application_id.clone(),
                    row.student.clone(),
                    row.university.clone(),
                    row.course.clone(),
                    row.country.clone(),
                    row.counselor_id.clone(),
                    row.status.clone(),
                    row.created_at.to_rfc3339(),
                ])
            },
        );
        report.push(detail);
        report.render()
    }
}

impl CrmService {
    /// Build a filtered application report, optionally with reasoner insights,
    /// rendered as JSON or CSV.
    pub async fn generate_report(
        &self,
        request: ReportRequest,
    ) -> Result<ReportOutput, WorkflowError> {
        let filters = &request.filters;
        if let (Some(from), Some(to)) = (filters.date_from, filters.date_to) {
            if from > to {
                return Err(WorkflowError::InvalidInput(format!(
                    "date_from {from} is after date_to {to}"
                )));
            }
        }

        let applications = self.fetch(self.store.applications.as_ref())?;
        let students = self.fetch(self.store.students.as_ref())?;
        let universities = self.fetch(self.store.universities.as_ref())?;
        let courses = self.fetch(self.store.courses.as_ref())?;
        let catalog = ReportCatalog {
            students: &students,
            universities: &universities,
            courses: &courses,
        };

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(DEFAULT_TITLE);
        let mut report = build_report(title, applications, &catalog, filters, Utc::now());

        if request.include_insights {
            let prompt = PromptBuilder::new(
                "report_insights",
                "You are a business analyst for an international education consultancy.",
            )
            .json("Filters", &report.filters)
            .json("Summary", &report.summary)
            .excerpt("Applications", &report.applications, self.limits.report_records)
            .output("highlights: notable positive trends")
            .output("risks: pipeline risks or bottlenecks")
            .output("recommendations: actions for management")
            .build(
                OutputSchema::object()
                    .required("highlights", Field::array(Field::string()))
                    .required("risks", Field::array(Field::string()))
                    .required("recommendations", Field::array(Field::string())),
            )?;
            report.insights = Some(self.reasoner.complete(&prompt).await?);
        }

        info!(
            applications = report.summary.total_applications,
            format = ?request.format,
            insights = report.insights.is_some(),
            "custom report generated"
        );
        match request.format {
            ReportFormat::Json => Ok(ReportOutput::Json(report)),
            ReportFormat::Csv => Ok(ReportOutput::Csv(report.to_csv()?)),
        }
    }
}
