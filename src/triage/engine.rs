//! Triage engine: routes operator interactions to state machines.
//!
//! Every presented transaction gets its own [`TriageMachine`], kept behind its
//! own async mutex. An interaction is applied only if that mutex is free, so a
//! machine is never advanced twice at once and double-clicks resolve once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::machine::{Step, TriageMachine};
use super::prompt::{self, Prompt};
use crate::channels::{ChatSurface, Interaction, InteractionAction, PromptId};
use crate::error::ChannelError;
use crate::queue::PendingQueue;
use crate::remote::CommitDispatcher;
use crate::transaction::Transaction;

/// What handling one interaction amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Stale, unknown, concurrent, or invalid; nothing changed.
    Ignored,
    /// The machine moved to the named state and a new prompt was presented.
    Advanced { state: &'static str },
    /// Dispatched downstream and removed from the pending queue.
    Committed { uuid: String },
    /// Dispatch failed; the transaction stays pending.
    CommitFailed { uuid: String, reason: String },
    /// The follow-up prompt could not be presented; the machine was dropped.
    PresentFailed { uuid: String },
}

#[derive(Default)]
struct Registry {
    prompts: HashMap<PromptId, Uuid>,
    machines: HashMap<Uuid, Arc<Mutex<TriageMachine>>>,
    by_transaction: HashMap<String, Uuid>,
}

pub struct TriageEngine {
    surface: Arc<dyn ChatSurface>,
    dispatcher: Arc<dyn CommitDispatcher>,
    queue: Arc<PendingQueue>,
    registry: RwLock<Registry>,
}

impl TriageEngine {
    pub fn new(
        surface: Arc<dyn ChatSurface>,
        dispatcher: Arc<dyn CommitDispatcher>,
        queue: Arc<PendingQueue>,
    ) -> Arc<Self> {
        Arc::new(Self {
            surface,
            dispatcher,
            queue,
            registry: RwLock::new(Registry::default()),
        })
    }

    /// Post a transaction's category prompt and attach a fresh machine to it.
    pub async fn present(&self, transaction: Transaction) -> Result<Uuid, ChannelError> {
        let mut machine = TriageMachine::new(transaction);
        let prompt = machine.initial_prompt();
        let prompt_id = self.surface.send_prompt(&prompt).await?;
        machine.attach_prompt(prompt_id.clone(), prompt);

        let machine_id = machine.id();
        let uuid = machine.transaction().uuid.clone();
        debug!(uuid = %uuid, prompt_id = %prompt_id, "Transaction presented");

        let mut registry = self.registry.write().await;
        if let Some(previous) = registry.by_transaction.insert(uuid, machine_id) {
            registry.machines.remove(&previous);
            registry.prompts.retain(|_, id| *id != previous);
        }
        registry.prompts.insert(prompt_id, machine_id);
        registry
            .machines
            .insert(machine_id, Arc::new(Mutex::new(machine)));
        Ok(machine_id)
    }

    /// Whether a machine for `uuid` is still waiting on (or handling) operator input.
    pub async fn has_live_machine(&self, uuid: &str) -> bool {
        let registry = self.registry.read().await;
        let Some(machine) = registry
            .by_transaction
            .get(uuid)
            .and_then(|id| registry.machines.get(id))
        else {
            return false;
        };
        match machine.try_lock() {
            Ok(m) => m.state().is_awaiting_input(),
            // Busy means an interaction is being applied right now.
            Err(_) => true,
        }
    }

    /// Drop machines whose transaction the source no longer lists.
    ///
    /// Their open prompts are made inert. A machine busy with an interaction
    /// is left alone this round. Returns how many were retired.
    pub async fn retire_missing(&self, listed: &HashSet<&str>) -> usize {
        let candidates: Vec<(Uuid, Arc<Mutex<TriageMachine>>)> = {
            let registry = self.registry.read().await;
            registry
                .by_transaction
                .iter()
                .filter(|(uuid, _)| !listed.contains(uuid.as_str()))
                .filter_map(|(_, id)| registry.machines.get(id).map(|m| (*id, Arc::clone(m))))
                .collect()
        };

        let mut retired = 0;
        for (machine_id, machine) in candidates {
            let Ok(machine) = machine.try_lock() else {
                continue;
            };

            let age = Utc::now() - machine.created_at();
            info!(
                uuid = %machine.transaction().uuid,
                state = %machine.state(),
                age_secs = age.num_seconds(),
                "Transaction no longer pending; retiring its prompt"
            );

            if let Some(active) = machine.active_prompt() {
                if let Err(e) = self
                    .surface
                    .disable_prompt(&active.id, &active.prompt, None)
                    .await
                {
                    warn!(prompt_id = %active.id, "Failed to disable retired prompt: {e}");
                }
            }

            self.forget(machine_id).await;
            retired += 1;
        }
        retired
    }

    /// Number of machines currently tracked.
    pub async fn machine_count(&self) -> usize {
        self.registry.read().await.machines.len()
    }

    /// Apply one operator interaction.
    pub async fn handle_interaction(&self, interaction: Interaction) -> Outcome {
        let Interaction {
            prompt_id,
            action,
            user,
        } = interaction;

        let machine = {
            let registry = self.registry.read().await;
            registry
                .prompts
                .get(&prompt_id)
                .and_then(|id| registry.machines.get(id))
                .cloned()
        };
        let Some(machine) = machine else {
            debug!(prompt_id = %prompt_id, "Interaction on unknown or resolved prompt ignored");
            return Outcome::Ignored;
        };
        let Ok(mut machine) = machine.try_lock() else {
            debug!(prompt_id = %prompt_id, "Interaction while machine busy ignored");
            return Outcome::Ignored;
        };

        let Some(resolved) = machine.active_prompt().cloned() else {
            return Outcome::Ignored;
        };
        let step = match machine.handle(&prompt_id, &action) {
            Ok(step) => step,
            Err(e) => {
                debug!(prompt_id = %prompt_id, user = %user, "Interaction ignored: {e}");
                return Outcome::Ignored;
            }
        };

        let uuid = machine.transaction().uuid.clone();
        info!(
            uuid = %uuid,
            reference = %machine.transaction().reference,
            state = %machine.state(),
            user = %user,
            "Triage advanced"
        );

        self.registry.write().await.prompts.remove(&prompt_id);

        let chosen = match &action {
            InteractionAction::Select(value) => Some(value.as_str()),
            InteractionAction::SubmitText(_) => None,
        };
        if let Err(e) = self
            .surface
            .disable_prompt(&resolved.id, &resolved.prompt, chosen)
            .await
        {
            warn!(prompt_id = %prompt_id, "Failed to disable resolved prompt: {e}");
        }

        match step {
            Step::Prompt(next) => match self.surface.send_prompt(&next).await {
                Ok(next_id) => {
                    machine.attach_prompt(next_id.clone(), next);
                    self.registry
                        .write()
                        .await
                        .prompts
                        .insert(next_id, machine.id());
                    Outcome::Advanced {
                        state: machine.state().name(),
                    }
                }
                Err(e) => {
                    error!(uuid = %uuid, "Failed to present next prompt: {e}");
                    self.forget(machine.id()).await;
                    Outcome::PresentFailed { uuid }
                }
            },
            Step::Commit(record) => self.commit(&mut machine, record).await,
        }
    }

    /// Dispatch, then drop from the queue (and cache), then confirm.
    async fn commit(&self, machine: &mut TriageMachine, record: Transaction) -> Outcome {
        let uuid = record.uuid.clone();

        if let Err(e) = self.dispatcher.dispatch(&record).await {
            error!(uuid = %uuid, reference = %record.reference, "Commit dispatch failed: {e}");
            machine.commit_failed();
            self.notify(&prompt::dispatch_failed_prompt(&record, &e.to_string()))
                .await;
            self.forget(machine.id()).await;
            return Outcome::CommitFailed {
                uuid,
                reason: e.to_string(),
            };
        }

        info!(uuid = %uuid, reference = %record.reference, "Transaction committed");

        // A failed write is logged and retried by the queue itself.
        let _ = self.queue.resolve(&uuid).await;
        machine.commit_succeeded();

        if let (Some(category), Some(subcategory)) = (record.category(), record.subcategory()) {
            self.notify(&prompt::confirmation_prompt(category, subcategory))
                .await;
        }
        self.forget(machine.id()).await;
        Outcome::Committed { uuid }
    }

    async fn notify(&self, message: &Prompt) {
        if let Err(e) = self.surface.send_prompt(message).await {
            warn!("Failed to notify operator: {e}");
        }
    }

    /// Stop tracking a machine and every prompt that pointed at it.
    async fn forget(&self, machine_id: Uuid) {
        let mut registry = self.registry.write().await;
        registry.machines.remove(&machine_id);
        registry.prompts.retain(|_, id| *id != machine_id);
        registry.by_transaction.retain(|_, id| *id != machine_id);
    }
}
