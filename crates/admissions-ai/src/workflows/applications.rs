use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{side_effect_failure, CrmService, WorkflowError};
use crate::domain::{Application, ApplicationStatus, Milestone};
use crate::lifecycle::advance_application;

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneUpdate {
    pub milestone: Milestone,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationTransition {
    pub application: Application,
    pub previous_status: ApplicationStatus,
    /// Set when the transition was saved but the student could not be told.
    pub notification_error: Option<String>,
}

impl CrmService {
    /// Move an application through the transition table and tell the student.
    /// A failed notification is reported on the outcome; the transition stands.
    pub fn transition_application(
        &self,
        application_id: &str,
        request: TransitionRequest,
    ) -> Result<ApplicationTransition, WorkflowError> {
        let mut application = self.store.applications.require(application_id)?;
        let previous_status = match advance_application(
            &mut application,
            request.status,
            Utc::now(),
            request.note,
        ) {
            Ok(previous) => previous,
            Err(error) => {
                warn!(application_id, %error, "application transition rejected");
                return Err(error.into());
            }
        };
        let application = self.store.applications.update(application)?;
        info!(
            application_id = %application.id,
            from = previous_status.label(),
            to = application.status.label(),
            "application status changed"
        );

        let notification_error = self
            .notify(
                &application.student_id,
                "application_status",
                "Application updated",
                format!(
                    "Your application {} moved from {} to {}.",
                    application.id,
                    previous_status.label(),
                    application.status.label()
                ),
            )
            .err()
            .map(|error| side_effect_failure("status notification", &error));

        Ok(ApplicationTransition {
            application,
            previous_status,
            notification_error,
        })
    }

    /// Record a milestone, e.g. documents submitted ahead of submission.
    pub fn complete_milestone(
        &self,
        application_id: &str,
        update: MilestoneUpdate,
    ) -> Result<Application, WorkflowError> {
        let mut application = self.store.applications.require(application_id)?;
        if application.status.is_terminal() {
            return Err(WorkflowError::InvalidInput(format!(
                "application {} is {} and can no longer change",
                application.id,
                application.status.label()
            )));
        }
        let now = Utc::now();
        application.complete_milestone(
            update.milestone,
            update.date.unwrap_or_else(|| now.date_naive()),
            update.notes,
        );
        application.updated_at = now;
        let application = self.store.applications.update(application)?;
        info!(
            application_id = %application.id,
            milestone = update.milestone.label(),
            "milestone completed"
        );
        Ok(application)
    }
}
