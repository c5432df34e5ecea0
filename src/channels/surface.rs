//! Chat surface abstraction: where prompts are shown and interactions come from.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::triage::prompt::Prompt;

/// Surface-assigned identity of a presented prompt (e.g. a message id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromptId(String);

impl PromptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PromptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the operator did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionAction {
    /// Picked the option with this value.
    Select(String),
    /// Submitted free text.
    SubmitText(String),
}

/// An operator interaction, tagged with the prompt it was made on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub prompt_id: PromptId,
    pub action: InteractionAction,
    /// Who acted, for logging.
    pub user: String,
}

impl Interaction {
    pub fn select(prompt_id: PromptId, value: impl Into<String>) -> Self {
        Self {
            prompt_id,
            action: InteractionAction::Select(value.into()),
            user: String::new(),
        }
    }

    pub fn submit_text(prompt_id: PromptId, text: impl Into<String>) -> Self {
        Self {
            prompt_id,
            action: InteractionAction::SubmitText(text.into()),
            user: String::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }
}

pub type InteractionStream = Pin<Box<dyn Stream<Item = Interaction> + Send>>;

/// A chat transport able to present prompts and report interactions on them.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    fn name(&self) -> &str;

    /// Begin listening for interactions.
    async fn start(&self) -> Result<InteractionStream, ChannelError>;

    /// Post `prompt` as a new message and return its id.
    async fn send_prompt(&self, prompt: &Prompt) -> Result<PromptId, ChannelError>;

    /// Render a resolved prompt's controls inert, marking `chosen` if given.
    async fn disable_prompt(
        &self,
        id: &PromptId,
        prompt: &Prompt,
        chosen: Option<&str>,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;
}
