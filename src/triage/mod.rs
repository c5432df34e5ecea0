//! Interactive categorization: prompts, the per-transaction state machine,
//! and the engine that routes operator interactions to it.

pub mod engine;
pub mod machine;
pub mod prompt;

pub use engine::{Outcome, TriageEngine};
pub use machine::{Step, TriageMachine, TriageState};
pub use prompt::{Controls, Prompt, PromptOption};
