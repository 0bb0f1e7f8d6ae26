use std::fmt::{Display, Write as _};

use serde::Serialize;
use serde_json::Value;

use super::OutputSchema;

/// Prompt text plus the schema its answer must satisfy. Every reasoning call
/// carries both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptRequest {
    pub name: String,
    pub prompt: String,
    pub schema: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("failed to serialize prompt section `{label}`: {source}")]
    Serialize {
        label: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Assembles persona, context, JSON excerpts, instructions and a numbered list
/// of requested outputs into one block of text.
#[derive(Debug)]
pub struct PromptBuilder {
    name: String,
    persona: String,
    sections: Vec<String>,
    instructions: Vec<String>,
    outputs: Vec<String>,
    failure: Option<PromptError>,
}

impl PromptBuilder {
    pub fn new(name: &str, persona: &str) -> Self {
        Self {
            name: name.to_string(),
            persona: persona.to_string(),
            sections: Vec::new(),
            instructions: Vec::new(),
            outputs: Vec::new(),
            failure: None,
        }
    }

    pub fn context(mut self, label: &str, value: impl Display) -> Self {
        self.sections.push(format!("{label}: {value}"));
        self
    }

    /// Pretty-printed JSON of a single value, e.g. an aggregated metrics struct.
    pub fn json<T: Serialize + ?Sized>(mut self, label: &str, value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(rendered) => self.sections.push(format!("## {label}\n{rendered}")),
            Err(source) => self.fail(label, source),
        }
        self
    }

    /// First `limit` items as pretty JSON, noting how many were left out.
    pub fn excerpt<T: Serialize>(mut self, label: &str, items: &[T], limit: usize) -> Self {
        let shown = &items[..items.len().min(limit)];
        match serde_json::to_string_pretty(shown) {
            Ok(rendered) => {
                let mut section = format!("## {label}\n{rendered}");
                if shown.len() < items.len() {
                    let _ = write!(section, "\n(showing {} of {})", shown.len(), items.len());
                }
                self.sections.push(section);
            }
            Err(source) => self.fail(label, source),
        }
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.instructions.push(text.into());
        self
    }

    pub fn output(mut self, text: impl Into<String>) -> Self {
        self.outputs.push(text.into());
        self
    }

    pub fn build(self, schema: OutputSchema) -> Result<PromptRequest, PromptError> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }

        let mut prompt = self.persona;
        for section in &self.sections {
            prompt.push_str("\n\n");
            prompt.push_str(section);
        }
        if !self.instructions.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.instructions.join("\n"));
        }
        if !self.outputs.is_empty() {
            prompt.push_str("\n\nProvide:");
            for (index, output) in self.outputs.iter().enumerate() {
                let _ = write!(prompt, "\n{}. {output}", index + 1);
            }
        }

        Ok(PromptRequest {
            name: self.name,
            prompt,
            schema: schema.into_value(),
        })
    }

    fn fail(&mut self, label: &str, source: serde_json::Error) {
        if self.failure.is_none() {
            self.failure = Some(PromptError::Serialize {
                label: label.to_string(),
                source,
            });
        }
    }
}
