use chrono::{DateTime, Utc};

use super::TransitionError;
use crate::domain::{Application, ApplicationStatus, Milestone};

use ApplicationStatus::*;

struct Rule {
    from: ApplicationStatus,
    to: ApplicationStatus,
    requires: Option<Milestone>,
    stamps: Option<Milestone>,
}

const fn rule(
    from: ApplicationStatus,
    to: ApplicationStatus,
    requires: Option<Milestone>,
    stamps: Option<Milestone>,
) -> Rule {
    Rule {
        from,
        to,
        requires,
        stamps,
    }
}

const RULES: &[Rule] = &[
    rule(
        Draft,
        Submitted,
        Some(Milestone::DocumentsSubmitted),
        Some(Milestone::ApplicationSubmitted),
    ),
    rule(Draft, Withdrawn, None, None),
    rule(Submitted, UnderReview, None, None),
    rule(Submitted, Rejected, None, None),
    rule(Submitted, Withdrawn, None, None),
    rule(UnderReview, Offer, None, Some(Milestone::OfferReceived)),
    rule(UnderReview, Rejected, None, None),
    rule(UnderReview, Withdrawn, None, None),
    rule(
        Offer,
        Enrolled,
        Some(Milestone::OfferAccepted),
        Some(Milestone::Enrolled),
    ),
    rule(Offer, Withdrawn, None, None),
];

fn find_rule(from: ApplicationStatus, to: ApplicationStatus) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.from == from && rule.to == to)
}

/// Validate moving `application` to `target` without mutating it.
pub fn check_application_transition(
    application: &Application,
    target: ApplicationStatus,
) -> Result<(), TransitionError> {
    let from = application.status;
    let rule = find_rule(from, target).ok_or(TransitionError::Illegal {
        from: from.label(),
        to: target.label(),
    })?;

    if let Some(required) = rule.requires {
        if !application.milestone_completed(required) {
            return Err(TransitionError::GuardFailed {
                from: from.label(),
                to: target.label(),
                reason: format!("milestone {} is not complete", required.label()),
            });
        }
    }
    Ok(())
}

/// Apply a legal transition, stamping the milestone it implies. Returns the
/// previous status.
pub fn advance_application(
    application: &mut Application,
    target: ApplicationStatus,
    now: DateTime<Utc>,
    note: Option<String>,
) -> Result<ApplicationStatus, TransitionError> {
    check_application_transition(application, target)?;
    let previous = application.status;

    if let Some(stamp) = find_rule(previous, target).and_then(|rule| rule.stamps) {
        application.complete_milestone(stamp, now.date_naive(), note);
    }
    application.status = target;
    application.updated_at = now;
    Ok(previous)
}

impl ApplicationStatus {
    /// Statuses reachable in one step, ignoring milestone guards.
    pub fn next_statuses(self) -> Vec<ApplicationStatus> {
        RULES
            .iter()
            .filter(|rule| rule.from == self)
            .map(|rule| rule.to)
            .collect()
    }
}
