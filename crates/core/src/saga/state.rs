//! Saga state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// States of a resource creation saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaState {
    Pending,
    CampaignCreated,
    AdsetCreated,
    ItemsProcessing,
    Completed,
    Compensating,
    Compensated,
    Failed,
}

impl SagaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Pending => "PENDING",
            SagaState::CampaignCreated => "CAMPAIGN_CREATED",
            SagaState::AdsetCreated => "ADSET_CREATED",
            SagaState::ItemsProcessing => "ITEMS_PROCESSING",
            SagaState::Completed => "COMPLETED",
            SagaState::Compensating => "COMPENSATING",
            SagaState::Compensated => "COMPENSATED",
            SagaState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    /// Whether `next` may follow this state.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        use SagaState::*;
        matches!(
            (self, next),
            (Pending, CampaignCreated)
                | (Pending, Failed)
                | (CampaignCreated, AdsetCreated)
                | (CampaignCreated, Compensating)
                | (AdsetCreated, ItemsProcessing)
                | (AdsetCreated, Compensating)
                | (ItemsProcessing, Completed)
                | (ItemsProcessing, Compensating)
                | (Compensating, Compensated)
                | (Compensated, Failed)
        )
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid saga transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: SagaState,
    pub to: SagaState,
}

/// Current state plus the path taken to reach it.
#[derive(Debug, Clone)]
pub struct SagaStateMachine {
    history: Vec<SagaState>,
}

impl Default for SagaStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SagaStateMachine {
    pub fn new() -> Self {
        Self {
            history: vec![SagaState::Pending],
        }
    }

    pub fn state(&self) -> SagaState {
        *self.history.last().unwrap_or(&SagaState::Pending)
    }

    pub fn history(&self) -> &[SagaState] {
        &self.history
    }

    pub fn transition(&mut self, next: SagaState) -> Result<(), InvalidTransition> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(InvalidTransition {
                from: current,
                to: next,
            });
        }
        self.history.push(next);
        Ok(())
    }

    pub fn into_history(self) -> Vec<SagaState> {
        self.history
    }
}
