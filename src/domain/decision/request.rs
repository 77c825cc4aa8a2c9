//! Decision request submitted by calling code.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::foundation::RequestId;

use super::{CancelHandle, Decision};

/// A request for a decision within a domain.
///
/// Built once by the caller and never mutated afterwards, except for
/// `retry_count`, which only the engine updates on its own copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    /// Request identifier (generated if the caller does not supply one).
    #[serde(default)]
    pub id: RequestId,
    /// Domain whose strategy handles the request (e.g., "medical").
    pub domain: String,
    /// Kind of decision within the domain (e.g., "triage").
    pub decision_type: String,
    /// Free-form input describing the case.
    pub input: String,
    /// Structured context for the strategy's prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, Value>>,
    /// Earlier decisions in the same thread, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_decisions: Vec<Decision>,
    /// Preferred provider name, tried before the configured defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Caller-assigned priority (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default)]
    retry_count: u32,
    #[serde(skip)]
    cancellation: CancelHandle,
}

impl DecisionRequest {
    /// Creates a new request with the required fields.
    pub fn new(
        domain: impl Into<String>,
        decision_type: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            domain: domain.into(),
            decision_type: decision_type.into(),
            input: input.into(),
            context: None,
            previous_decisions: Vec::new(),
            provider: None,
            priority: None,
            retry_count: 0,
            cancellation: CancelHandle::new(),
        }
    }

    /// Adds a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Appends a prior decision for contextual continuity.
    pub fn with_previous_decision(mut self, decision: Decision) -> Self {
        self.previous_decisions.push(decision);
        self
    }

    /// Sets the preferred provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the caller priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches a cancellation handle the caller keeps a clone of.
    pub fn with_cancellation(mut self, cancellation: CancelHandle) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Number of retry attempts already made for this request.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// The request's cancellation handle.
    pub fn cancellation(&self) -> &CancelHandle {
        &self.cancellation
    }

    /// Returns true if the caller has cancelled this request.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub(crate) fn set_retry_count(&mut self, retry_count: u32) {
        self.retry_count = retry_count;
    }
}
