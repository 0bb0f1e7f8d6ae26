use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CrmService, WorkflowError};
use crate::domain::{Badge, Notification, QuizAttempt};
use crate::prompt::{Field, OutputSchema, PromptBuilder};
use crate::store::next_id;

pub const QUIZ_BADGE: &str = "quiz_passed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub expected: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizSubmission {
    #[serde(alias = "quizId")]
    pub quiz_id: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub answers: Vec<QuizAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizOutcome {
    pub attempt: QuizAttempt,
    pub badge: Option<Badge>,
    pub notification: Option<Notification>,
}

#[derive(Debug, Deserialize)]
struct GradeOutput {
    score: f64,
    feedback: String,
}

impl CrmService {
    /// Grade a quiz attempt. Passing is decided here from the configured
    /// threshold, never by the reasoner.
    pub async fn grade_quiz(
        &self,
        participant_id: &str,
        submission: QuizSubmission,
    ) -> Result<QuizOutcome, WorkflowError> {
        if submission.answers.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "a quiz submission needs at least one answer".to_string(),
            ));
        }

        let topic = submission.topic.as_deref().unwrap_or("counselor training");
        let request = PromptBuilder::new(
            "quiz_grade",
            "You are grading a training quiz for education counselors.",
        )
        .context("Quiz", &submission.quiz_id)
        .context("Topic", topic)
        .json("Answers", &submission.answers)
        .instruction("Grade each answer for accuracy and completeness against the expected answer when one is given.")
        .output("score: overall percentage 0-100")
        .output("feedback: short, encouraging explanation of what to review")
        .build(
            OutputSchema::object()
                .required("score", Field::number().range(0.0, 100.0))
                .required("feedback", Field::string()),
        )?;

        let graded: GradeOutput = self.reasoner.complete(&request).await?;
        let passed = self.rules.quiz_passes(graded.score);
        let attempt = self.store.quiz_attempts.create(QuizAttempt {
            id: next_id::<QuizAttempt>(),
            participant_id: participant_id.to_string(),
            quiz_id: submission.quiz_id.clone(),
            score: graded.score,
            passed,
            feedback: graded.feedback,
            graded_at: Utc::now(),
        })?;
        info!(
            participant = %participant_id,
            quiz_id = %attempt.quiz_id,
            score = attempt.score,
            passed,
            "quiz graded"
        );

        if !passed {
            return Ok(QuizOutcome {
                attempt,
                badge: None,
                notification: None,
            });
        }

        let badge = self.award_badge(participant_id, QUIZ_BADGE, "Quiz passed")?;
        let notification = self.notify(
            participant_id,
            "quiz",
            "Quiz passed",
            format!(
                "You scored {:.1} on {} and passed.",
                attempt.score, attempt.quiz_id
            ),
        )?;
        Ok(QuizOutcome {
            attempt,
            badge,
            notification: Some(notification),
        })
    }
}
