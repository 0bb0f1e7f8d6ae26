use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use admissions_ai::config::AppConfig;
use admissions_ai::domain::{
    Application, ApplicationStatus, Communication, CommunicationDirection, Course, DegreeLevel,
    LeadStatus, Sentiment, StudentProfile, University,
};
use admissions_ai::error::AppError;
use admissions_ai::reasoning::reasoner_from_config;
use admissions_ai::store::{CrmStore, MemoryRepository};
use admissions_ai::workflows::CrmService;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the sample store and the configured reasoner into a service.
pub(crate) fn build_service(config: &AppConfig) -> Result<Arc<CrmService>, AppError> {
    let reasoner = reasoner_from_config(&config.reasoner, &config.throttle)?;
    let service = CrmService::new(
        Arc::new(sample_store()),
        Arc::new(reasoner),
        config.rules.clone(),
    )
    .with_fetch_limit(config.store.fetch_limit);
    Ok(Arc::new(service))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn university(id: &str, name: &str, country: &str, ranking: u32) -> University {
    University {
        id: id.to_string(),
        name: name.to_string(),
        country: country.to_string(),
        ranking: Some(ranking),
        partner: true,
        contact_email: Some(format!("international@{id}.example.edu")),
    }
}

struct CourseSeed {
    id: &'static str,
    university_id: &'static str,
    name: &'static str,
    field: &'static str,
    level: DegreeLevel,
    country: &'static str,
    tuition_fee: u32,
    scholarships: bool,
}

const COURSES: &[CourseSeed] = &[
    CourseSeed {
        id: "crs-101",
        university_id: "uni-101",
        name: "MSc Computer Science",
        field: "Computer Science",
        level: DegreeLevel::Master,
        country: "Canada",
        tuition_fee: 27_500,
        scholarships: true,
    },
    CourseSeed {
        id: "crs-102",
        university_id: "uni-101",
        name: "MBA",
        field: "Business",
        level: DegreeLevel::Master,
        country: "Canada",
        tuition_fee: 48_000,
        scholarships: true,
    },
    CourseSeed {
        id: "crs-201",
        university_id: "uni-201",
        name: "Master of Data Science",
        field: "Data Science",
        level: DegreeLevel::Master,
        country: "Australia",
        tuition_fee: 31_000,
        scholarships: false,
    },
    CourseSeed {
        id: "crs-202",
        university_id: "uni-201",
        name: "Bachelor of Nursing",
        field: "Nursing",
        level: DegreeLevel::Bachelor,
        country: "Australia",
        tuition_fee: 29_000,
        scholarships: true,
    },
    CourseSeed {
        id: "crs-301",
        university_id: "uni-301",
        name: "MSc Public Health",
        field: "Public Health",
        level: DegreeLevel::Master,
        country: "United Kingdom",
        tuition_fee: 22_000,
        scholarships: true,
    },
];

#[allow(clippy::too_many_arguments)]
fn student(
    id: &str,
    name: &str,
    nationality: &str,
    countries: &[&str],
    fields: &[&str],
    level: DegreeLevel,
    status: LeadStatus,
    counselor_id: &str,
) -> StudentProfile {
    StudentProfile {
        id: id.to_string(),
        full_name: name.to_string(),
        email: format!("{id}@students.example.com"),
        nationality: nationality.to_string(),
        preferred_countries: countries.iter().map(|value| value.to_string()).collect(),
        preferred_fields: fields.iter().map(|value| value.to_string()).collect(),
        degree_level: level,
        budget_max: Some(32_000),
        gpa: Some(3.3),
        english_score: Some(7.0),
        profile_completeness: 75,
        lead_score: None,
        lead_status: status,
        counselor_id: Some(counselor_id.to_string()),
        created_at: day(2025, 1, 6),
    }
}

fn application(
    id: &str,
    student_id: &str,
    course: &CourseSeed,
    counselor_id: &str,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
) -> Application {
    Application {
        id: id.to_string(),
        student_id: student_id.to_string(),
        university_id: course.university_id.to_string(),
        course_id: course.id.to_string(),
        counselor_id: Some(counselor_id.to_string()),
        status,
        milestones: BTreeMap::new(),
        intake: Some("2025-09".to_string()),
        created_at,
        updated_at: created_at,
    }
}

fn message(
    id: &str,
    student_id: &str,
    counselor_id: &str,
    direction: CommunicationDirection,
    sentiment: Sentiment,
    response_time_hours: Option<f64>,
    occurred_at: DateTime<Utc>,
) -> Communication {
    Communication {
        id: id.to_string(),
        student_id: student_id.to_string(),
        counselor_id: counselor_id.to_string(),
        channel: "whatsapp".to_string(),
        direction,
        sentiment: Some(sentiment),
        response_time_hours,
        occurred_at,
    }
}

/// Small catalog and caseload so the service and demo run without a hosted store.
pub(crate) fn sample_store() -> CrmStore {
    let universities = vec![
        university("uni-101", "Lakeshore University", "Canada", 120),
        university("uni-201", "Coral Coast University", "Australia", 210),
        university("uni-301", "Northgate College London", "United Kingdom", 95),
    ];
    let courses: Vec<Course> = COURSES
        .iter()
        .map(|seed| Course {
            id: seed.id.to_string(),
            university_id: seed.university_id.to_string(),
            name: seed.name.to_string(),
            field: seed.field.to_string(),
            degree_level: seed.level,
            country: seed.country.to_string(),
            tuition_fee: seed.tuition_fee,
            duration_months: if seed.level == DegreeLevel::Bachelor { 36 } else { 24 },
            min_gpa: Some(3.0),
            min_english_score: Some(6.5),
            scholarships_available: seed.scholarships,
        })
        .collect();
    let students = vec![
        student(
            "stu-101",
            "Aarav Shrestha",
            "Nepal",
            &["Canada", "Australia"],
            &["Computer Science", "Data Science"],
            DegreeLevel::Master,
            LeadStatus::Qualified,
            "cns-101",
        ),
        student(
            "stu-102",
            "Ngozi Okafor",
            "Nigeria",
            &["United Kingdom"],
            &["Public Health"],
            DegreeLevel::Master,
            LeadStatus::Converted,
            "cns-101",
        ),
        student(
            "stu-103",
            "Linh Tran",
            "Vietnam",
            &["Australia"],
            &["Nursing"],
            DegreeLevel::Bachelor,
            LeadStatus::Contacted,
            "cns-102",
        ),
    ];
    let applications = vec![
        application(
            "app-101",
            "stu-101",
            &COURSES[0],
            "cns-101",
            ApplicationStatus::UnderReview,
            day(2025, 2, 3),
        ),
        application(
            "app-102",
            "stu-102",
            &COURSES[4],
            "cns-101",
            ApplicationStatus::Enrolled,
            day(2025, 1, 20),
        ),
        application(
            "app-103",
            "stu-101",
            &COURSES[2],
            "cns-101",
            ApplicationStatus::Rejected,
            day(2025, 2, 11),
        ),
        application(
            "app-104",
            "stu-103",
            &COURSES[3],
            "cns-102",
            ApplicationStatus::Draft,
            day(2025, 3, 2),
        ),
    ];
    let communications = vec![
        message(
            "com-101",
            "stu-101",
            "cns-101",
            CommunicationDirection::Inbound,
            Sentiment::Positive,
            None,
            day(2025, 3, 1),
        ),
        message(
            "com-102",
            "stu-101",
            "cns-101",
            CommunicationDirection::Outbound,
            Sentiment::Neutral,
            Some(3.5),
            day(2025, 3, 1),
        ),
        message(
            "com-103",
            "stu-102",
            "cns-101",
            CommunicationDirection::Outbound,
            Sentiment::Positive,
            Some(1.5),
            day(2025, 2, 14),
        ),
        message(
            "com-104",
            "stu-103",
            "cns-102",
            CommunicationDirection::Inbound,
            Sentiment::Negative,
            None,
            day(2025, 3, 4),
        ),
    ];

    CrmStore {
        students: Arc::new(MemoryRepository::with_records(students)),
        applications: Arc::new(MemoryRepository::with_records(applications)),
        universities: Arc::new(MemoryRepository::with_records(universities)),
        courses: Arc::new(MemoryRepository::with_records(courses)),
        communications: Arc::new(MemoryRepository::with_records(communications)),
        ..CrmStore::in_memory()
    }
}
