//! Admissions CRM automation: aggregate records from the entity store, narrow
//! them with declarative criteria, hand a prompt plus output schema to an
//! external reasoner, and persist what comes back.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod prompt;
pub mod reasoning;
pub mod store;
pub mod telemetry;
pub mod workflows;
