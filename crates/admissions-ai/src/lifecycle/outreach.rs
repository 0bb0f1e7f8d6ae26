use chrono::{DateTime, Utc};

use super::TransitionError;
use crate::domain::{OutreachStatus, UniversityOutreach};

use OutreachStatus::*;

const TRANSITIONS: &[(OutreachStatus, OutreachStatus)] = &[
    (Draft, Sent),
    (Sent, Responded),
    (Sent, FollowUpNeeded),
    (FollowUpNeeded, Sent),
    (FollowUpNeeded, Responded),
];

pub fn check_outreach_transition(
    from: OutreachStatus,
    to: OutreachStatus,
) -> Result<(), TransitionError> {
    if TRANSITIONS.contains(&(from, to)) {
        Ok(())
    } else {
        Err(TransitionError::Illegal {
            from: from.label(),
            to: to.label(),
        })
    }
}

/// Move an outreach record along its response-tracking lifecycle and stamp
/// `sent_at` / `responded_at`.
pub fn advance_outreach(
    outreach: &mut UniversityOutreach,
    target: OutreachStatus,
    now: DateTime<Utc>,
) -> Result<OutreachStatus, TransitionError> {
    let previous = outreach.status;
    check_outreach_transition(previous, target)?;
    match target {
        Sent => outreach.sent_at = Some(now),
        Responded => outreach.responded_at = Some(now),
        Draft | FollowUpNeeded => {}
    }
    outreach.status = target;
    Ok(previous)
}
