//! Aggregate-filter-score workflows. Each operation fetches whole collections
//! from the store, aggregates and filters in memory, asks the reasoner for a
//! schema-checked verdict and persists the result plus any rule-driven side
//! effects (tasks, notifications, badges).

pub mod applications;
pub mod lead_scoring;
pub mod matching;
pub mod notifications;
pub mod onboarding;
pub mod outreach;
pub mod performance;
pub mod quiz;
pub mod reports;
pub mod router;
pub mod scholarships;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::auth::AuthError;
use crate::config::BusinessRules;
use crate::domain::{Badge, Notification, Task, TaskPriority, TaskStatus};
use crate::export::ExportError;
use crate::lifecycle::TransitionError;
use crate::prompt::{PromptError, PromptLimits};
use crate::reasoning::{ReasoningError, StructuredReasoner};
use crate::store::{fetch_all, next_id, CrmStore, Entity, Repository, RepositoryError};

pub use applications::{ApplicationTransition, MilestoneUpdate, TransitionRequest};
pub use lead_scoring::{LeadScoreOutcome, LeadScoreRequest};
pub use matching::{CourseMatch, CourseMatchResult, MatchRequest};
pub use notifications::{BulkNotification, BulkNotificationOutcome, NotificationResult};
pub use onboarding::{OnboardingOutcome, OnboardingSubmission};
pub use outreach::{
    OutreachCampaignOutcome, OutreachRequest, OutreachResponseOutcome, OutreachResult,
    ResponseLog, ResponseOutcome,
};
pub use performance::PerformanceRequest;
pub use quiz::{QuizAnswer, QuizOutcome, QuizSubmission};
pub use reports::{CustomReport, ReportFilters, ReportFormat, ReportOutput, ReportRequest};
pub use router::crm_router;
pub use scholarships::ScholarshipRequest;

/// Service composing the entity store, the reasoner and the business rules.
pub struct CrmService {
    store: Arc<CrmStore>,
    reasoner: Arc<StructuredReasoner>,
    rules: BusinessRules,
    limits: PromptLimits,
    fetch_limit: usize,
    awards: Mutex<()>,
}

const DEFAULT_FETCH_LIMIT: usize = 500;

impl CrmService {
    pub fn new(
        store: Arc<CrmStore>,
        reasoner: Arc<StructuredReasoner>,
        rules: BusinessRules,
    ) -> Self {
        Self {
            store,
            reasoner,
            rules,
            limits: PromptLimits::default(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            awards: Mutex::new(()),
        }
    }

    pub fn with_limits(mut self, limits: PromptLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_fetch_limit(mut self, fetch_limit: usize) -> Self {
        self.fetch_limit = fetch_limit.max(1);
        self
    }

    pub fn store(&self) -> &CrmStore {
        &self.store
    }

    pub fn rules(&self) -> &BusinessRules {
        &self.rules
    }

    fn fetch<T, R>(&self, repository: &R) -> Result<Vec<T>, WorkflowError>
    where
        T: Entity,
        R: Repository<T> + ?Sized,
    {
        Ok(fetch_all(repository, self.fetch_limit)?)
    }

    fn select<T, R, F>(&self, repository: &R, predicate: F) -> Result<Vec<T>, WorkflowError>
    where
        T: Entity,
        R: Repository<T> + ?Sized,
        F: Fn(&T) -> bool + Send + Sync,
    {
        Ok(repository.filter(&predicate, self.fetch_limit)?)
    }

    /// Follow-up task due `follow_up_days` from now.
    fn create_follow_up(
        &self,
        assignee_id: &str,
        title: String,
        description: String,
        student_id: Option<String>,
        related_id: Option<String>,
        priority: TaskPriority,
    ) -> Result<Task, WorkflowError> {
        let now = Utc::now();
        let task = Task {
            id: next_id::<Task>(),
            title,
            description,
            assignee_id: assignee_id.to_string(),
            student_id,
            related_id,
            due_date: Some((now + Duration::days(self.rules.follow_up_days)).date_naive()),
            priority,
            status: TaskStatus::Open,
            created_at: now,
        };
        let task = self.store.tasks.create(task)?;
        info!(task_id = %task.id, assignee = %task.assignee_id, "follow-up task created");
        Ok(task)
    }

    fn notify(
        &self,
        recipient_id: &str,
        kind: &str,
        title: &str,
        message: String,
    ) -> Result<Notification, WorkflowError> {
        let notification = Notification {
            id: next_id::<Notification>(),
            recipient_id: recipient_id.to_string(),
            title: title.to_string(),
            message,
            kind: kind.to_string(),
            read: false,
            created_at: Utc::now(),
        };
        Ok(self.store.notifications.create(notification)?)
    }

    /// Persist a badge unless the holder already has one of that type.
    /// The check and the write happen under one lock, so concurrent passes
    /// through this service award at most one badge per type.
    fn award_badge(
        &self,
        holder_id: &str,
        badge_type: &str,
        label: &str,
    ) -> Result<Option<Badge>, WorkflowError> {
        let _guard = self.awards.lock().unwrap_or_else(PoisonError::into_inner);
        let holder = holder_id.to_string();
        let mut held = self.select(self.store.badges.as_ref(), move |badge: &Badge| {
            badge.holder_id == holder
        })?;
        let badge = Badge {
            id: next_id::<Badge>(),
            holder_id: holder_id.to_string(),
            badge_type: badge_type.to_string(),
            label: label.to_string(),
            awarded_at: Utc::now(),
        };
        if !Badge::award(&mut held, badge.clone()) {
            return Ok(None);
        }
        let badge = self.store.badges.create(badge)?;
        info!(holder = %badge.holder_id, badge_type = %badge.badge_type, "badge awarded");
        Ok(Some(badge))
    }
}

/// Outcome text for a side effect that failed after the primary write:
/// server-side failures collapse to their stable code.
fn side_effect_failure(what: &str, error: &WorkflowError) -> String {
    warn!(%error, "{what} failed");
    error
        .details()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Error raised by CRM workflows.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { kind, id } => WorkflowError::NotFound { kind, id },
            other => WorkflowError::Repository(other),
        }
    }
}

impl WorkflowError {
    pub fn status(&self) -> StatusCode {
        match self {
            WorkflowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Auth(AuthError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            WorkflowError::Auth(AuthError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Transition(_) => StatusCode::CONFLICT,
            WorkflowError::Repository(RepositoryError::Conflict { .. }) => StatusCode::CONFLICT,
            WorkflowError::Repository(_)
            | WorkflowError::Reasoning(_)
            | WorkflowError::Prompt(_)
            | WorkflowError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine code for server-side failures; the cause itself stays in the logs.
    pub fn details(&self) -> Option<&'static str> {
        match self {
            WorkflowError::Repository(RepositoryError::Conflict { .. }) => None,
            WorkflowError::Repository(_) => Some("store_unavailable"),
            WorkflowError::Reasoning(error) if error.is_invalid_output() => {
                Some("reasoning_invalid_output")
            }
            WorkflowError::Reasoning(_) | WorkflowError::Prompt(_) => Some("reasoning_failed"),
            WorkflowError::Export(_) => Some("export_failed"),
            _ => None,
        }
    }
}
