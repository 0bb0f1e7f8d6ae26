//! Prompt synthesis: text for the reasoner paired with the JSON schema its
//! answer has to satisfy.

mod builder;
mod schema;

pub use builder::{PromptBuilder, PromptError, PromptRequest};
pub use schema::{Field, OutputSchema};

/// How many records each call site copies into its prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub lead_communications: usize,
    pub lead_applications: usize,
    pub performance_students: usize,
    pub match_candidates: usize,
    pub scholarship_candidates: usize,
    pub report_records: usize,
    pub outreach_courses: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            lead_communications: 10,
            lead_applications: 5,
            performance_students: 20,
            match_candidates: 30,
            scholarship_candidates: 15,
            report_records: 50,
            outreach_courses: 3,
        }
    }
}
