//! Prompt rendering: what the operator sees at each step.

use crate::transaction::{ButtonStyle, Category, Transaction};

/// Option value for "yes, add remarks".
pub const REMARK_YES: &str = "yes";
/// Option value for "no remarks".
pub const REMARK_NO: &str = "no";

/// A single selectable control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOption {
    /// Text shown on the control.
    pub label: String,
    /// Value delivered back when the control is selected.
    pub value: String,
    pub style: ButtonStyle,
}

impl PromptOption {
    fn new(label: impl Into<String>, value: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            style,
        }
    }
}

/// Interactive part of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controls {
    /// A row of buttons; exactly one may be chosen.
    Buttons(Vec<PromptOption>),
    /// A single required free-text field.
    TextInput {
        title: String,
        label: String,
        placeholder: String,
    },
    /// Plain message, nothing to interact with.
    None,
}

/// A message to present to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub controls: Controls,
}

impl Prompt {
    /// Values the operator can pick, empty for non-button prompts.
    pub fn option_values(&self) -> Vec<&str> {
        match &self.controls {
            Controls::Buttons(options) => options.iter().map(|o| o.value.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

/// First prompt for a transaction: its details plus the category buttons.
pub fn category_prompt(txn: &Transaction) -> Prompt {
    let text = format!(
        "Transaction ID: {}\nDate-Time: {}-{}\nAmount: {}\nRecipient: {}\n\n\
         Please categorize this transaction:",
        txn.reference, txn.date, txn.time, txn.amount, txn.recipient
    );
    let options = Category::ALL
        .iter()
        .map(|c| PromptOption::new(c.as_str(), c.as_str(), c.button_style()))
        .collect();
    Prompt {
        text,
        controls: Controls::Buttons(options),
    }
}

/// Subcategory buttons scoped to `category`.
pub fn subcategory_prompt(category: Category) -> Prompt {
    let options = category
        .subcategories()
        .iter()
        .map(|s| PromptOption::new(*s, *s, ButtonStyle::Primary))
        .collect();
    Prompt {
        text: format!("Please sub-categorize this transaction as {category}-:"),
        controls: Controls::Buttons(options),
    }
}

pub fn remark_choice_prompt() -> Prompt {
    Prompt {
        text: "Would you like to add remarks?".to_string(),
        controls: Controls::Buttons(vec![
            PromptOption::new("Yes", REMARK_YES, ButtonStyle::Primary),
            PromptOption::new("No", REMARK_NO, ButtonStyle::Secondary),
        ]),
    }
}

pub fn remark_input_prompt() -> Prompt {
    Prompt {
        text: "Enter your remarks".to_string(),
        controls: Controls::TextInput {
            title: "Enter your remarks".to_string(),
            label: "Remarks".to_string(),
            placeholder: "Enter your remarks here".to_string(),
        },
    }
}

pub fn confirmation_prompt(category: Category, subcategory: &str) -> Prompt {
    Prompt {
        text: format!(
            "Transaction saved with category: {category} and subcategory: {subcategory}"
        ),
        controls: Controls::None,
    }
}

pub fn dispatch_failed_prompt(txn: &Transaction, reason: &str) -> Prompt {
    Prompt {
        text: format!(
            "Failed to save transaction {}: {reason}. \
             It will be offered again on the next refresh.",
            txn.reference
        ),
        controls: Controls::None,
    }
}
