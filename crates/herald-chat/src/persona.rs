//! Persona definition and prompt rendering

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the user's question
pub const QUESTION_PLACEHOLDER: &str = "{question}";

/// Turns the user's text into the prompt sent upstream
pub trait PromptRenderer: Send + Sync {
    fn render(&self, user_text: &str) -> String;
}

impl<F> PromptRenderer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn render(&self, user_text: &str) -> String {
        self(user_text)
    }
}

/// A prompt template with a `{question}` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Whether the template references the question at all
    pub fn has_placeholder(&self) -> bool {
        self.0.contains(QUESTION_PLACEHOLDER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PromptRenderer for PromptTemplate {
    fn render(&self, user_text: &str) -> String {
        if self.has_placeholder() {
            self.0.replace(QUESTION_PLACEHOLDER, user_text)
        } else {
            // A template without the placeholder still has to carry the question.
            format!("{}\n\n{}", self.0, user_text)
        }
    }
}

/// Everything that makes the assistant a particular historical figure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Display name
    pub name: String,
    /// Short subtitle shown under the name
    #[serde(default)]
    pub title: Option<String>,
    /// Opening message of every conversation
    pub greeting: String,
    /// Prompt template wrapped around each question
    pub template: PromptTemplate,
    /// Fixed reply shown when the service fails
    pub fallback: String,
    /// Example questions offered to new users
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl Persona {
    /// Look up a suggestion by its 1-based position
    pub fn suggestion(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.suggestions.get(i))
            .map(String::as_str)
    }
}
