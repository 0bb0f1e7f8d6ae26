use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::config::BusinessRules;
use crate::domain::{
    Application, ApplicationStatus, Communication, CommunicationDirection, Course, DegreeLevel,
    LeadStatus, Notification, Sentiment, StudentProfile, University,
};
use crate::prompt::PromptRequest;
use crate::reasoning::{Reasoner, ReasoningError, StructuredReasoner, Throttle};
use crate::store::{CrmStore, MemoryRepository, Repository, RepositoryError};
use crate::workflows::CrmService;

type Reply = dyn Fn(&PromptRequest) -> Result<Value, ReasoningError> + Send + Sync;

/// Reasoner double that answers from a closure and records every prompt.
pub(super) struct ScriptedReasoner {
    reply: Box<Reply>,
    prompts: Mutex<Vec<PromptRequest>>,
}

impl ScriptedReasoner {
    pub(super) fn new<F>(reply: F) -> Arc<Self>
    where
        F: Fn(&PromptRequest) -> Result<Value, ReasoningError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn replying(value: Value) -> Arc<Self> {
        Self::new(move |_| Ok(value.clone()))
    }

    pub(super) fn failing() -> Arc<Self> {
        Self::new(|_| Err(ReasoningError::Unavailable("reasoner offline".to_string())))
    }

    pub(super) fn prompts(&self) -> Vec<PromptRequest> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }

    pub(super) fn calls(&self) -> usize {
        self.prompts.lock().expect("prompt log poisoned").len()
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn invoke(&self, request: &PromptRequest) -> Result<Value, ReasoningError> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(request.clone());
        (self.reply)(request)
    }
}

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn university(id: &str, name: &str, country: &str) -> University {
    University {
        id: id.to_string(),
        name: name.to_string(),
        country: country.to_string(),
        ranking: None,
        partner: true,
        contact_email: Some(format!("admissions@{id}.example.test")),
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn course(
    id: &str,
    university_id: &str,
    name: &str,
    field: &str,
    level: DegreeLevel,
    country: &str,
    tuition_fee: u32,
    scholarships_available: bool,
) -> Course {
    Course {
        id: id.to_string(),
        university_id: university_id.to_string(),
        name: name.to_string(),
        field: field.to_string(),
        degree_level: level,
        country: country.to_string(),
        tuition_fee,
        duration_months: 24,
        min_gpa: Some(3.0),
        min_english_score: Some(6.5),
        scholarships_available,
    }
}

pub(super) fn student(
    id: &str,
    name: &str,
    nationality: &str,
    countries: &[&str],
    level: DegreeLevel,
    status: LeadStatus,
    counselor_id: Option<&str>,
) -> StudentProfile {
    StudentProfile {
        id: id.to_string(),
        full_name: name.to_string(),
        email: format!("{id}@example.test"),
        nationality: nationality.to_string(),
        preferred_countries: countries.iter().map(|country| country.to_string()).collect(),
        preferred_fields: vec!["Computer Science".to_string()],
        degree_level: level,
        budget_max: Some(30_000),
        gpa: Some(3.4),
        english_score: Some(7.0),
        profile_completeness: 80,
        lead_score: None,
        lead_status: status,
        counselor_id: counselor_id.map(str::to_string),
        created_at: at(2025, 1, 2),
    }
}

pub(super) fn application(
    id: &str,
    student_id: &str,
    university_id: &str,
    course_id: &str,
    counselor_id: &str,
    status: ApplicationStatus,
    created_at: DateTime<Utc>,
) -> Application {
    Application {
        id: id.to_string(),
        student_id: student_id.to_string(),
        university_id: university_id.to_string(),
        course_id: course_id.to_string(),
        counselor_id: Some(counselor_id.to_string()),
        status,
        milestones: BTreeMap::new(),
        intake: Some("2025-09".to_string()),
        created_at,
        updated_at: created_at,
    }
}

fn communication(
    id: &str,
    student_id: &str,
    counselor_id: &str,
    direction: CommunicationDirection,
    sentiment: Option<Sentiment>,
    response_time_hours: Option<f64>,
    occurred_at: DateTime<Utc>,
) -> Communication {
    Communication {
        id: id.to_string(),
        student_id: student_id.to_string(),
        counselor_id: counselor_id.to_string(),
        channel: "email".to_string(),
        direction,
        sentiment,
        response_time_hours,
        occurred_at,
    }
}

pub(super) fn universities() -> Vec<University> {
    vec![
        university("uni-1", "Harbour University", "Canada"),
        university("uni-2", "Southern Cross University", "Australia"),
        university("uni-3", "Alpine Institute", "Germany"),
    ]
}

pub(super) fn courses() -> Vec<Course> {
    vec![
        course(
            "crs-1",
            "uni-1",
            "MSc Computer Science",
            "Computer Science",
            DegreeLevel::Master,
            "Canada",
            25_000,
            true,
        ),
        course(
            "crs-2",
            "uni-2",
            "Master of Data Science",
            "Data Science",
            DegreeLevel::Master,
            "Australia",
            28_000,
            false,
        ),
        course(
            "crs-3",
            "uni-1",
            "MBA",
            "Business",
            DegreeLevel::Master,
            "Canada",
            45_000,
            true,
        ),
        course(
            "crs-4",
            "uni-3",
            "MSc Informatics",
            "Computer Science",
            DegreeLevel::Master,
            "Germany",
            1_500,
            true,
        ),
        course(
            "crs-5",
            "uni-2",
            "Bachelor of IT",
            "Computer Science",
            DegreeLevel::Bachelor,
            "Australia",
            20_000,
            false,
        ),
    ]
}

pub(super) fn students() -> Vec<StudentProfile> {
    vec![
        student(
            "stu-1",
            "Asha Gurung",
            "Nepal",
            &["Canada", "Australia"],
            DegreeLevel::Master,
            LeadStatus::Qualified,
            Some("cns-1"),
        ),
        student(
            "stu-2",
            "Bikram Rao",
            "India",
            &["Australia"],
            DegreeLevel::Bachelor,
            LeadStatus::Converted,
            Some("cns-1"),
        ),
        student(
            "stu-3",
            "Chen Wei",
            "China",
            &["Australia"],
            DegreeLevel::Master,
            LeadStatus::Contacted,
            Some("cns-2"),
        ),
        student(
            "stu-4",
            "Dana Ortiz",
            "Mexico",
            &["Iceland"],
            DegreeLevel::Phd,
            LeadStatus::New,
            None,
        ),
    ]
}

/// cns-1 owns two enrolled applications and one rejection.
pub(super) fn applications() -> Vec<Application> {
    let mut enrolled = application(
        "app-1",
        "stu-1",
        "uni-1",
        "crs-1",
        "cns-1",
        ApplicationStatus::Enrolled,
        at(2025, 1, 10),
    );
    enrolled.updated_at = at(2025, 6, 1);
    let mut second = application(
        "app-2",
        "stu-2",
        "uni-2",
        "crs-5",
        "cns-1",
        ApplicationStatus::Enrolled,
        at(2025, 2, 5),
    );
    second.updated_at = at(2025, 6, 20);
    vec![
        enrolled,
        second,
        application(
            "app-3",
            "stu-1",
            "uni-2",
            "crs-2",
            "cns-1",
            ApplicationStatus::Rejected,
            at(2025, 2, 20),
        ),
        application(
            "app-4",
            "stu-3",
            "uni-2",
            "crs-2",
            "cns-2",
            ApplicationStatus::Submitted,
            at(2025, 3, 15),
        ),
        application(
            "app-5",
            "stu-3",
            "uni-1",
            "crs-1",
            "cns-2",
            ApplicationStatus::Draft,
            at(2025, 4, 1),
        ),
    ]
}

pub(super) fn communications() -> Vec<Communication> {
    vec![
        communication(
            "com-1",
            "stu-1",
            "cns-1",
            CommunicationDirection::Inbound,
            Some(Sentiment::Positive),
            None,
            at(2025, 5, 1),
        ),
        communication(
            "com-2",
            "stu-1",
            "cns-1",
            CommunicationDirection::Outbound,
            Some(Sentiment::Neutral),
            Some(4.0),
            at(2025, 5, 2),
        ),
        communication(
            "com-3",
            "stu-2",
            "cns-1",
            CommunicationDirection::Outbound,
            Some(Sentiment::Negative),
            Some(2.0),
            at(2025, 4, 11),
        ),
        communication(
            "com-4",
            "stu-3",
            "cns-2",
            CommunicationDirection::Inbound,
            None,
            None,
            at(2025, 3, 20),
        ),
    ]
}

pub(super) fn seeded_store() -> CrmStore {
    CrmStore {
        students: Arc::new(MemoryRepository::with_records(students())),
        applications: Arc::new(MemoryRepository::with_records(applications())),
        universities: Arc::new(MemoryRepository::with_records(universities())),
        courses: Arc::new(MemoryRepository::with_records(courses())),
        communications: Arc::new(MemoryRepository::with_records(communications())),
        ..CrmStore::in_memory()
    }
}

pub(super) fn service_with_store(
    store: CrmStore,
    reasoner: Arc<ScriptedReasoner>,
) -> (Arc<CrmService>, Arc<CrmStore>) {
    let store = Arc::new(store);
    let structured = StructuredReasoner::new(reasoner, Throttle::unlimited());
    let service = CrmService::new(
        Arc::clone(&store),
        Arc::new(structured),
        BusinessRules::default(),
    );
    (Arc::new(service), store)
}

pub(super) fn build_service(reasoner: Arc<ScriptedReasoner>) -> (Arc<CrmService>, Arc<CrmStore>) {
    service_with_store(seeded_store(), reasoner)
}

/// Notification collection that rejects writes for one recipient.
pub(super) struct FlakyNotifications {
    inner: MemoryRepository<Notification>,
    broken_recipient: String,
}

impl FlakyNotifications {
    pub(super) fn failing_for(recipient_id: &str) -> Self {
        Self {
            inner: MemoryRepository::default(),
            broken_recipient: recipient_id.to_string(),
        }
    }
}

impl Repository<Notification> for FlakyNotifications {
    fn list(&self, limit: usize) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.list(limit)
    }

    fn filter(
        &self,
        predicate: &(dyn Fn(&Notification) -> bool + Send + Sync),
        limit: usize,
    ) -> Result<Vec<Notification>, RepositoryError> {
        self.inner.filter(predicate, limit)
    }

    fn get(&self, id: &str) -> Result<Option<Notification>, RepositoryError> {
        self.inner.get(id)
    }

    fn create(&self, record: Notification) -> Result<Notification, RepositoryError> {
        if record.recipient_id == self.broken_recipient {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.inner.create(record)
    }

    fn update(&self, record: Notification) -> Result<Notification, RepositoryError> {
        self.inner.update(record)
    }

    fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.inner.delete(id)
    }
}

/// Collection whose every call fails as if the hosted store were down.
pub(super) struct OfflineRepository;

impl<T: crate::store::Entity> Repository<T> for OfflineRepository {
    fn list(&self, _limit: usize) -> Result<Vec<T>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn filter(
        &self,
        _predicate: &(dyn Fn(&T) -> bool + Send + Sync),
        _limit: usize,
    ) -> Result<Vec<T>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn get(&self, _id: &str) -> Result<Option<T>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn create(&self, _record: T) -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn update(&self, _record: T) -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    fn delete(&self, _id: &str) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }
}

pub(super) fn lead_score_reply(score: u8, tier: &str) -> Value {
    json!({
        "score": score,
        "tier": tier,
        "factors": [
            { "name": "profile_completeness", "impact": 15, "detail": "Profile is 80% complete" }
        ],
        "next_actions": ["Book a call about the September intake"]
    })
}

pub(super) fn post_json(uri: &str, role: Option<(&str, &str)>, body: &Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some((user_id, role)) = role {
        builder = builder
            .header(USER_ID_HEADER, user_id)
            .header(USER_ROLE_HEADER, role);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json payload")
}
