use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CrmService, WorkflowError};
use crate::domain::{Badge, OnboardingProgress};
use crate::prompt::{Field, OutputSchema, PromptBuilder};
use crate::store::next_id;

pub const ONBOARDING_BADGE: &str = "onboarding_complete";

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingSubmission {
    #[serde(alias = "moduleId")]
    pub module_id: String,
    #[serde(default, alias = "moduleTitle")]
    pub module_title: Option<String>,
    pub responses: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnboardingOutcome {
    pub progress: OnboardingProgress,
    pub module_passed: bool,
    pub score: f64,
    pub feedback: String,
    pub badge: Option<Badge>,
}

#[derive(Debug, Deserialize)]
struct EvaluationOutput {
    score: f64,
    feedback: String,
}

impl CrmService {
    /// Evaluate one onboarding module. A module counts once, however many
    /// times it is passed; finishing the required number completes onboarding.
    pub async fn evaluate_onboarding(
        &self,
        counselor_id: &str,
        submission: OnboardingSubmission,
    ) -> Result<OnboardingOutcome, WorkflowError> {
        let module_id = submission.module_id.trim().to_string();
        if module_id.is_empty() || submission.responses.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "module_id and at least one response are required".to_string(),
            ));
        }

        let title = submission.module_title.as_deref().unwrap_or(&module_id);
        let request = PromptBuilder::new(
            "onboarding_evaluation",
            "You are a training lead evaluating a new education counselor's onboarding exercise.",
        )
        .context("Module", title)
        .json("Responses", &submission.responses)
        .output("score: 0-100 mastery of the module")
        .output("feedback: what was done well and what to revisit")
        .build(
            OutputSchema::object()
                .required("score", Field::number().range(0.0, 100.0))
                .required("feedback", Field::string()),
        )?;
        let evaluation: EvaluationOutput = self.reasoner.complete(&request).await?;
        let module_passed = self.rules.quiz_passes(evaluation.score);

        let owner = counselor_id.to_string();
        let existing = self
            .select(self.store.onboarding.as_ref(), move |progress: &OnboardingProgress| {
                progress.counselor_id == owner
            })?
            .into_iter()
            .next();
        let is_new = existing.is_none();
        let mut progress = existing.unwrap_or_else(|| OnboardingProgress {
            id: next_id::<OnboardingProgress>(),
            counselor_id: counselor_id.to_string(),
            completed_modules: Vec::new(),
            module_scores: Default::default(),
            completed: false,
            updated_at: Utc::now(),
        });

        progress
            .module_scores
            .insert(module_id.clone(), evaluation.score);
        if module_passed && !progress.completed_modules.contains(&module_id) {
            progress.completed_modules.push(module_id.clone());
        }
        let newly_completed = !progress.completed
            && self
                .rules
                .onboarding_complete(progress.completed_modules.len());
        if newly_completed {
            progress.completed = true;
        }
        progress.updated_at = Utc::now();

        let progress = if is_new {
            self.store.onboarding.create(progress)?
        } else {
            self.store.onboarding.update(progress)?
        };
        info!(
            counselor_id = %counselor_id,
            module = %module_id,
            score = evaluation.score,
            completed_modules = progress.completed_modules.len(),
            "onboarding module evaluated"
        );

        let badge = if progress.completed {
            self.award_badge(counselor_id, ONBOARDING_BADGE, "Onboarding complete")?
        } else {
            None
        };
        if newly_completed {
            self.notify(
                counselor_id,
                "onboarding",
                "Onboarding complete",
                format!(
                    "All {} required onboarding modules are complete.",
                    self.rules.onboarding_required_modules
                ),
            )?;
        }

        Ok(OnboardingOutcome {
            progress,
            module_passed,
            score: evaluation.score,
            feedback: evaluation.feedback,
            badge,
        })
    }
}
