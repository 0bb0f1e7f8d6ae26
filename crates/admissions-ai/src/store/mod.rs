//! Typed repository seam over the hosted entity store.
//!
//! Every workflow receives a [`CrmStore`] instead of reaching for a global
//! client, so tests and the demo binary can swap in [`MemoryRepository`].

mod memory;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{
    Application, Badge, Communication, CounselorInteraction, Course, LeadScore, Notification,
    OnboardingProgress, OutreachCampaign, QuizAttempt, ScholarshipRecommendation,
    StudentProfile, Task, University, UniversityOutreach,
};

pub use memory::MemoryRepository;

/// Record stored under a collection name with a string identifier.
pub trait Entity: Clone + Send + Sync + 'static {
    const KIND: &'static str;
    const ID_PREFIX: &'static str;

    fn id(&self) -> &str;
}

/// CRUD/query surface of one entity collection.
pub trait Repository<T: Entity>: Send + Sync {
    /// Whole-collection fetch, capped at `limit` records.
    fn list(&self, limit: usize) -> Result<Vec<T>, RepositoryError>;
    fn filter(
        &self,
        predicate: &(dyn Fn(&T) -> bool + Send + Sync),
        limit: usize,
    ) -> Result<Vec<T>, RepositoryError>;
    fn get(&self, id: &str) -> Result<Option<T>, RepositoryError>;
    fn create(&self, record: T) -> Result<T, RepositoryError>;
    fn update(&self, record: T) -> Result<T, RepositoryError>;
    fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    fn require(&self, id: &str) -> Result<T, RepositoryError> {
        self.get(id)?.ok_or_else(|| RepositoryError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{kind} {id} already exists")]
    Conflict { kind: &'static str, id: String },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

static RECORD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh identifier for `T`, e.g. `lsc-000042`.
pub fn next_id<T: Entity>() -> String {
    let id = RECORD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{id:06}", T::ID_PREFIX)
}

/// Fetch a whole collection the way every workflow does: no cursor, fixed cap.
pub fn fetch_all<T, R>(repository: &R, limit: usize) -> Result<Vec<T>, RepositoryError>
where
    T: Entity,
    R: Repository<T> + ?Sized,
{
    let records = repository.list(limit)?;
    if records.len() >= limit {
        warn!(kind = T::KIND, limit, "collection fetch hit the record cap");
    } else {
        debug!(kind = T::KIND, count = records.len(), "collection fetched");
    }
    Ok(records)
}

macro_rules! entity {
    ($ty:ty, $kind:literal, $prefix:literal) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;
            const ID_PREFIX: &'static str = $prefix;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

entity!(StudentProfile, "student_profile", "stu");
entity!(Application, "application", "app");
entity!(University, "university", "uni");
entity!(Course, "course", "crs");
entity!(Communication, "communication", "com");
entity!(UniversityOutreach, "university_outreach", "out");
entity!(OutreachCampaign, "outreach_campaign", "cmp");
entity!(LeadScore, "lead_score", "lsc");
entity!(ScholarshipRecommendation, "scholarship_recommendation", "sch");
entity!(CounselorInteraction, "counselor_interaction", "cni");
entity!(Task, "task", "tsk");
entity!(Notification, "notification", "ntf");
entity!(Badge, "badge", "bdg");
entity!(QuizAttempt, "quiz_attempt", "qza");
entity!(OnboardingProgress, "onboarding_progress", "onb");

/// One injected repository per entity collection.
#[derive(Clone)]
pub struct CrmStore {
    pub students: Arc<dyn Repository<StudentProfile>>,
    pub applications: Arc<dyn Repository<Application>>,
    pub universities: Arc<dyn Repository<University>>,
    pub courses: Arc<dyn Repository<Course>>,
    pub communications: Arc<dyn Repository<Communication>>,
    pub outreach: Arc<dyn Repository<UniversityOutreach>>,
    pub campaigns: Arc<dyn Repository<OutreachCampaign>>,
    pub lead_scores: Arc<dyn Repository<LeadScore>>,
    pub scholarships: Arc<dyn Repository<ScholarshipRecommendation>>,
    pub counselor_interactions: Arc<dyn Repository<CounselorInteraction>>,
    pub tasks: Arc<dyn Repository<Task>>,
    pub notifications: Arc<dyn Repository<Notification>>,
    pub badges: Arc<dyn Repository<Badge>>,
    pub quiz_attempts: Arc<dyn Repository<QuizAttempt>>,
    pub onboarding: Arc<dyn Repository<OnboardingProgress>>,
}

fn memory<T: Entity>() -> Arc<dyn Repository<T>> {
    Arc::new(MemoryRepository::<T>::default())
}

impl CrmStore {
    pub fn in_memory() -> Self {
        Self {
            students: memory(),
            applications: memory(),
            universities: memory(),
            courses: memory(),
            communications: memory(),
            outreach: memory(),
            campaigns: memory(),
            lead_scores: memory(),
            scholarships: memory(),
            counselor_interactions: memory(),
            tasks: memory(),
            notifications: memory(),
            badges: memory(),
            quiz_attempts: memory(),
            onboarding: memory(),
        }
    }
}

impl Default for CrmStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
