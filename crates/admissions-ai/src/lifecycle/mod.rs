//! Authoritative transition tables for the two record types with a status
//! lifecycle. Handlers never assign a status directly; they go through here.

mod application;
mod outreach;

pub use application::{advance_application, check_application_transition};
pub use outreach::{advance_outreach, check_outreach_transition};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("illegal transition from {from} to {to}")]
    Illegal { from: &'static str, to: &'static str },
    #[error("transition from {from} to {to} blocked: {reason}")]
    GuardFailed {
        from: &'static str,
        to: &'static str,
        reason: String,
    },
}
