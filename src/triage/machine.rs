//! Categorization state machine: one instance per presented transaction.
//!
//! Progresses: AwaitingCategory → AwaitingSubcategory → AwaitingRemarkChoice →
//! (AwaitingRemarkText) → Committing → Committed. Every transition out of an
//! awaiting state is driven by an operator interaction addressed to the
//! machine's currently active prompt; anything else is stale.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::prompt::{self, Prompt, REMARK_NO, REMARK_YES};
use crate::channels::{InteractionAction, PromptId};
use crate::error::TriageError;
use crate::transaction::{Category, Transaction};

/// Where a machine is in the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageState {
    AwaitingCategory,
    AwaitingSubcategory {
        category: Category,
    },
    AwaitingRemarkChoice {
        category: Category,
        subcategory: &'static str,
    },
    AwaitingRemarkText {
        category: Category,
        subcategory: &'static str,
    },
    Committing,
    Committed,
}

impl TriageState {
    /// Whether the machine is waiting on the operator.
    pub fn is_awaiting_input(&self) -> bool {
        matches!(
            self,
            Self::AwaitingCategory
                | Self::AwaitingSubcategory { .. }
                | Self::AwaitingRemarkChoice { .. }
                | Self::AwaitingRemarkText { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingCategory => "awaiting_category",
            Self::AwaitingSubcategory { .. } => "awaiting_subcategory",
            Self::AwaitingRemarkChoice { .. } => "awaiting_remark_choice",
            Self::AwaitingRemarkText { .. } => "awaiting_remark_text",
            Self::Committing => "committing",
            Self::Committed => "committed",
        }
    }
}

impl std::fmt::Display for TriageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the caller must do after a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Present this prompt as a new message and attach its id.
    Prompt(Prompt),
    /// Hand this fully-categorized record to the commit dispatcher.
    Commit(Transaction),
}

/// The prompt currently accepting interactions.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivePrompt {
    pub id: PromptId,
    pub prompt: Prompt,
}

#[derive(Debug)]
pub struct TriageMachine {
    id: Uuid,
    transaction: Transaction,
    state: TriageState,
    active: Option<ActivePrompt>,
    commit_attempted: bool,
    created_at: DateTime<Utc>,
}

impl TriageMachine {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction,
            state: TriageState::AwaitingCategory,
            active: None,
            commit_attempted: false,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn state(&self) -> TriageState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn active_prompt(&self) -> Option<&ActivePrompt> {
        self.active.as_ref()
    }

    /// Prompt that opens the dialogue.
    pub fn initial_prompt(&self) -> Prompt {
        prompt::category_prompt(&self.transaction)
    }

    /// Record the id the surface assigned to the prompt just presented.
    pub fn attach_prompt(&mut self, id: PromptId, prompt: Prompt) {
        self.active = Some(ActivePrompt { id, prompt });
    }

    /// Apply an operator interaction addressed to `prompt_id`.
    ///
    /// On success the active prompt is consumed; the caller presents the next
    /// prompt (and attaches it) or commits. On error the machine is unchanged.
    pub fn handle(
        &mut self,
        prompt_id: &PromptId,
        action: &InteractionAction,
    ) -> Result<Step, TriageError> {
        let is_active = self.active.as_ref().is_some_and(|a| &a.id == prompt_id);
        if !is_active || !self.state.is_awaiting_input() {
            return Err(TriageError::StaleInteraction {
                prompt_id: prompt_id.to_string(),
                state: self.state.to_string(),
            });
        }

        let (next, step) = match (self.state, action) {
            (TriageState::AwaitingCategory, InteractionAction::Select(value)) => {
                let category = Category::from_name(value).ok_or_else(|| self.invalid(value))?;
                (
                    TriageState::AwaitingSubcategory { category },
                    Step::Prompt(prompt::subcategory_prompt(category)),
                )
            }
            (TriageState::AwaitingSubcategory { category }, InteractionAction::Select(value)) => {
                let subcategory = category
                    .subcategory(value)
                    .ok_or_else(|| self.invalid(value))?;
                (
                    TriageState::AwaitingRemarkChoice {
                        category,
                        subcategory,
                    },
                    Step::Prompt(prompt::remark_choice_prompt()),
                )
            }
            (
                TriageState::AwaitingRemarkChoice {
                    category,
                    subcategory,
                },
                InteractionAction::Select(value),
            ) => match value.as_str() {
                REMARK_YES => (
                    TriageState::AwaitingRemarkText {
                        category,
                        subcategory,
                    },
                    Step::Prompt(prompt::remark_input_prompt()),
                ),
                REMARK_NO => self.enter_committing(category, subcategory, None)?,
                _ => return Err(self.invalid(value)),
            },
            (
                TriageState::AwaitingRemarkText {
                    category,
                    subcategory,
                },
                InteractionAction::SubmitText(text),
            ) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(TriageError::EmptyRemark);
                }
                self.enter_committing(category, subcategory, Some(text.to_string()))?
            }
            (_, InteractionAction::Select(value) | InteractionAction::SubmitText(value)) => {
                return Err(self.invalid(value));
            }
        };

        self.state = next;
        self.active = None;
        Ok(step)
    }

    /// Dispatch succeeded and the queue was updated.
    pub fn commit_succeeded(&mut self) {
        if self.state == TriageState::Committing {
            self.state = TriageState::Committed;
        }
    }

    /// Dispatch failed. The machine stays in `Committing` and will not commit
    /// again; the transaction is picked up by a fresh machine next cycle.
    pub fn commit_failed(&mut self) {
        debug_assert_eq!(self.state, TriageState::Committing);
    }

    fn enter_committing(
        &mut self,
        category: Category,
        subcategory: &'static str,
        remarks: Option<String>,
    ) -> Result<(TriageState, Step), TriageError> {
        if self.commit_attempted {
            return Err(TriageError::StaleInteraction {
                prompt_id: self
                    .active
                    .as_ref()
                    .map(|a| a.id.to_string())
                    .unwrap_or_default(),
                state: self.state.to_string(),
            });
        }
        let mut record = self.transaction.clone();
        record.categorize(category, subcategory, remarks)?;
        self.transaction = record.clone();
        self.commit_attempted = true;
        Ok((TriageState::Committing, Step::Commit(record)))
    }

    fn invalid(&self, value: &str) -> TriageError {
        TriageError::InvalidOption {
            value: value.to_string(),
            state: self.state.to_string(),
        }
    }
}
