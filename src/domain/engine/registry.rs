//! Strategy and provider registries.
//!
//! Both are populated once at startup. Afterwards only a provider's health
//! fields change, and only through the engine's health check.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::ports::{DecisionStrategy, ProviderAdapter, ProviderMetadata};

/// Registration options for a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOptions {
    pub enabled: bool,
    /// Lower values sort first in listings.
    pub priority: i32,
    /// Restricts the decision types served; `None` uses the strategy's own
    /// declaration.
    pub supported_types: Option<Vec<String>>,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 0,
            supported_types: None,
        }
    }
}

impl StrategyOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_supported_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_types = Some(types.into_iter().map(Into::into).collect());
        self
    }
}

/// A registered strategy.
#[derive(Clone)]
pub struct StrategyEntry {
    pub strategy: Arc<dyn DecisionStrategy>,
    pub enabled: bool,
    pub priority: i32,
    pub supported_types: Vec<String>,
}

impl StrategyEntry {
    /// Whether this entry serves the given decision type.
    pub fn supports(&self, decision_type: &str) -> bool {
        self.supported_types.iter().any(|t| t == decision_type)
    }
}

/// Domain name → strategy.
#[derive(Default)]
pub struct StrategyRegistry {
    entries: HashMap<String, StrategyEntry>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy, replacing any previous one for the domain.
    pub fn register(
        &mut self,
        domain: impl Into<String>,
        strategy: Arc<dyn DecisionStrategy>,
        options: StrategyOptions,
    ) {
        let supported_types = options
            .supported_types
            .unwrap_or_else(|| strategy.supported_decision_types());
        self.entries.insert(
            domain.into(),
            StrategyEntry {
                strategy,
                enabled: options.enabled,
                priority: options.priority,
                supported_types,
            },
        );
    }

    /// The enabled strategy for a domain.
    pub fn resolve(&self, domain: &str) -> Option<&StrategyEntry> {
        self.entries.get(domain).filter(|entry| entry.enabled)
    }

    /// Registered domain names, ordered by priority then name.
    pub fn domains(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &StrategyEntry)> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.1.priority.cmp(&b.1.priority).then_with(|| a.0.cmp(b.0)));
        entries.into_iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registration options for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderOptions {
    pub enabled: bool,
    /// Lower values sort first in listings.
    pub priority: i32,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: 0,
        }
    }
}

impl ProviderOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Provider health as last observed by a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No health check has run yet.
    Unknown,
    /// Probe succeeded promptly.
    Healthy,
    /// Probe succeeded but took more than half the call timeout.
    Degraded,
    /// Probe failed or timed out.
    Unhealthy,
}

/// A registered provider.
#[derive(Clone)]
pub struct ProviderEntry {
    pub adapter: Arc<dyn ProviderAdapter>,
    pub enabled: bool,
    pub priority: i32,
    pub health_status: HealthStatus,
    pub last_health_check_at: Option<Timestamp>,
}

/// Snapshot of a provider for operational listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub enabled: bool,
    pub available: bool,
    pub priority: i32,
    pub health_status: HealthStatus,
    pub last_health_check_at: Option<Timestamp>,
    pub metadata: ProviderMetadata,
}

/// Provider name → adapter.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: HashMap<String, ProviderEntry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter, replacing any previous one under the name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        adapter: Arc<dyn ProviderAdapter>,
        options: ProviderOptions,
    ) {
        self.entries.insert(
            name.into(),
            ProviderEntry {
                adapter,
                enabled: options.enabled,
                priority: options.priority,
                health_status: HealthStatus::Unknown,
                last_health_check_at: None,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ProviderEntry> {
        self.entries.get(name)
    }

    /// True if the provider is registered and enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|entry| entry.enabled)
    }

    /// The adapter for an enabled provider.
    pub fn enabled_adapter(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.entries
            .get(name)
            .filter(|entry| entry.enabled)
            .map(|entry| Arc::clone(&entry.adapter))
    }

    /// Every registered adapter, for health checks.
    pub fn adapters(&self) -> Vec<(String, Arc<dyn ProviderAdapter>)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.adapter)))
            .collect()
    }

    /// Records a health check outcome. Unknown names are ignored.
    pub fn record_health(&mut self, name: &str, status: HealthStatus, checked_at: Timestamp) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.health_status = status;
            entry.last_health_check_at = Some(checked_at);
        }
    }

    /// Provider snapshots ordered by priority then name.
    pub fn statuses(&self) -> Vec<ProviderStatus> {
        let mut statuses: Vec<ProviderStatus> = self
            .entries
            .iter()
            .map(|(name, entry)| ProviderStatus {
                name: name.clone(),
                enabled: entry.enabled,
                available: entry.adapter.is_available(),
                priority: entry.priority,
                health_status: entry.health_status,
                last_health_check_at: entry.last_health_check_at,
                metadata: entry.adapter.metadata(),
            })
            .collect();
        statuses.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        statuses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockProvider;
    use crate::adapters::strategies::MedicalStrategy;

    #[test]
    fn strategy_uses_declared_types_by_default() {
        let mut registry = StrategyRegistry::new();
        registry.register("medical", Arc::new(MedicalStrategy::new()), StrategyOptions::default());

        let entry = registry.resolve("medical").unwrap();
        assert!(entry.supports("triage"));
        assert!(entry.supports("diagnosis"));
        assert!(!entry.supports("billing"));
    }

    #[test]
    fn strategy_options_can_narrow_types() {
        let mut registry = StrategyRegistry::new();
        registry.register(
            "medical",
            Arc::new(MedicalStrategy::new()),
            StrategyOptions::default().with_supported_types(["triage"]),
        );

        let entry = registry.resolve("medical").unwrap();
        assert!(entry.supports("triage"));
        assert!(!entry.supports("diagnosis"));
    }

    #[test]
    fn disabled_strategy_does_not_resolve() {
        let mut registry = StrategyRegistry::new();
        registry.register("medical", Arc::new(MedicalStrategy::new()), StrategyOptions::disabled());

        assert!(registry.resolve("medical").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn domains_are_ordered_by_priority() {
        let mut registry = StrategyRegistry::new();
        registry.register(
            "b-domain",
            Arc::new(MedicalStrategy::new()),
            StrategyOptions::default().with_priority(2),
        );
        registry.register(
            "a-domain",
            Arc::new(MedicalStrategy::new()),
            StrategyOptions::default().with_priority(5),
        );
        registry.register(
            "c-domain",
            Arc::new(MedicalStrategy::new()),
            StrategyOptions::default().with_priority(1),
        );

        assert_eq!(registry.domains(), vec!["c-domain", "b-domain", "a-domain"]);
    }

    #[test]
    fn provider_enabled_checks() {
        let mut registry = ProviderRegistry::new();
        registry.register("on", Arc::new(MockProvider::new("on")), ProviderOptions::default());
        registry.register("off", Arc::new(MockProvider::new("off")), ProviderOptions::disabled());

        assert!(registry.is_enabled("on"));
        assert!(!registry.is_enabled("off"));
        assert!(!registry.is_enabled("missing"));
        assert!(registry.enabled_adapter("on").is_some());
        assert!(registry.enabled_adapter("off").is_none());
    }

    #[test]
    fn record_health_updates_status() {
        let mut registry = ProviderRegistry::new();
        registry.register("mock", Arc::new(MockProvider::new("mock")), ProviderOptions::default());
        assert_eq!(registry.get("mock").unwrap().health_status, HealthStatus::Unknown);

        let now = Timestamp::now();
        registry.record_health("mock", HealthStatus::Unhealthy, now);

        let entry = registry.get("mock").unwrap();
        assert_eq!(entry.health_status, HealthStatus::Unhealthy);
        assert_eq!(entry.last_health_check_at, Some(now));
    }

    #[test]
    fn statuses_are_ordered_and_describe_providers() {
        let mut registry = ProviderRegistry::new();
        registry.register(
            "second",
            Arc::new(MockProvider::new("second")),
            ProviderOptions::default().with_priority(2),
        );
        registry.register(
            "first",
            Arc::new(MockProvider::new("first").unavailable()),
            ProviderOptions::default().with_priority(1),
        );

        let statuses = registry.statuses();
        assert_eq!(statuses[0].name, "first");
        assert!(!statuses[0].available);
        assert_eq!(statuses[1].name, "second");
        assert!(statuses[1].available);
        assert_eq!(statuses[1].metadata.name, "second");
    }
}
