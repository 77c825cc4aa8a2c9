//! The decision engine: routing, retries, confidence gating and fallback.

use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::decision::{
    ConfidenceAssessment, Decision, DecisionKind, DecisionPayload, DecisionRequest,
    DecisionResponse, ValidationResults, FALLBACK_CONFIDENCE,
};
use crate::domain::foundation::{ErrorCode, Timestamp};
use crate::ports::{DecisionStrategy, ProviderAdapter, ProviderError};

use super::cache::{cache_key, DecisionCache};
use super::parsing::extract_json_object;
use super::retry::BackoffPolicy;
use super::routing::resolve_provider_order;
use super::{
    EngineConfig, EngineConfigUpdate, EngineError, EngineMetrics, HealthStatus, ProviderOptions,
    ProviderRegistry, ProviderStatus, StrategyOptions, StrategyRegistry,
};

const FALLBACK_WARNING: &str = "Fallback decision used";
const NO_PROVIDER_CALLED: &str = "no available provider could be called";

/// Orchestrates decisions across registered strategies and providers.
///
/// Shared between tasks behind an `Arc`; every method takes `&self`.
pub struct DecisionEngine {
    config: RwLock<EngineConfig>,
    strategies: RwLock<StrategyRegistry>,
    providers: RwLock<ProviderRegistry>,
    metrics: Mutex<EngineMetrics>,
    cache: Mutex<DecisionCache>,
}

impl DecisionEngine {
    /// Creates an engine with empty registries.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let cache = DecisionCache::new(config.cache_config());
        Ok(Self {
            config: RwLock::new(config),
            strategies: RwLock::new(StrategyRegistry::new()),
            providers: RwLock::new(ProviderRegistry::new()),
            metrics: Mutex::new(EngineMetrics::default()),
            cache: Mutex::new(cache),
        })
    }

    pub async fn register_strategy(
        &self,
        domain: impl Into<String>,
        strategy: Arc<dyn DecisionStrategy>,
        options: StrategyOptions,
    ) {
        let domain = domain.into();
        info!(domain = %domain, enabled = options.enabled, "Registering decision strategy");
        self.strategies
            .write()
            .await
            .register(domain, strategy, options);
    }

    pub async fn register_provider(
        &self,
        name: impl Into<String>,
        adapter: Arc<dyn ProviderAdapter>,
        options: ProviderOptions,
    ) {
        let name = name.into();
        info!(
            provider = %name,
            enabled = options.enabled,
            available = adapter.is_available(),
            "Registering provider"
        );
        self.providers.write().await.register(name, adapter, options);
    }

    /// Produces a decision for `request`.
    ///
    /// Returns a response for every outcome except configuration errors,
    /// cancellation, and exhaustion with fallback disabled.
    pub async fn make_decision(
        &self,
        request: DecisionRequest,
    ) -> Result<DecisionResponse, EngineError> {
        let started = Instant::now();
        let config = self.config.read().await.clone();
        let request_id = request.id;

        self.metrics.lock().await.record_request(&request.domain);
        info!(
            request_id = %request_id,
            domain = %request.domain,
            decision_type = %request.decision_type,
            "Decision requested"
        );

        let key = config.enable_caching.then(|| cache_key(&request));
        if let Some(key) = &key {
            let cached = self.cache.lock().await.get(key);
            if let Some(mut response) = cached {
                response.latency_ms = elapsed_ms(started);
                self.metrics.lock().await.record_cache_hit();
                debug!(request_id = %request_id, cache_key = %key, "Cache hit");
                return Ok(response);
            }
        }

        match self.decide(request, &config, started).await {
            Ok(response) if response.success => {
                self.metrics.lock().await.record_success(
                    &response.provider,
                    response.latency_ms,
                    response.confidence,
                );
                if let Some(key) = key {
                    self.cache.lock().await.insert(key, response.clone());
                }
                info!(
                    request_id = %request_id,
                    provider = %response.provider,
                    confidence = response.confidence,
                    retry_count = response.retry_count,
                    latency_ms = response.latency_ms,
                    "Decision accepted"
                );
                Ok(response)
            }
            Ok(response) => {
                self.metrics.lock().await.record_fallback();
                warn!(
                    request_id = %request_id,
                    retry_count = response.retry_count,
                    error = response.error.as_deref().unwrap_or_default(),
                    "Returning fallback decision"
                );
                Ok(response)
            }
            Err(err) => {
                self.metrics.lock().await.record_failure(err.code());
                warn!(request_id = %request_id, code = %err.code(), error = %err, "Decision failed");
                Err(err)
            }
        }
    }

    async fn decide(
        &self,
        request: DecisionRequest,
        config: &EngineConfig,
        started: Instant,
    ) -> Result<DecisionResponse, EngineError> {
        let entry = {
            let strategies = self.strategies.read().await;
            strategies
                .resolve(&request.domain)
                .cloned()
                .ok_or_else(|| EngineError::NoStrategyForDomain {
                    domain: request.domain.clone(),
                })?
        };

        if !entry.supports(&request.decision_type) {
            return Err(EngineError::UnsupportedDecisionType {
                domain: request.domain.clone(),
                decision_type: request.decision_type.clone(),
            });
        }

        let strategy = entry.strategy;
        let mut request = strategy.pre_process_request(request);

        let order = {
            let providers = self.providers.read().await;
            resolve_provider_order(request.provider.as_deref(), config, &providers)?
        };

        let system_prompt = format!(
            "{}\n\n{}",
            strategy.build_system_prompt(&request.decision_type, &request),
            strategy.build_json_format_requirements(&request.decision_type)
        );

        let attempts = config.attempts();
        let backoff = BackoffPolicy::from_millis(config.backoff_base_ms);
        let mut excluded: HashSet<String> = HashSet::new();
        let mut last_error: Option<String> = None;

        for attempt in 0..attempts {
            request.set_retry_count(attempt);
            let mut called = 0usize;

            for name in &order {
                if request.is_cancelled() {
                    return Err(EngineError::RequestAborted {
                        request_id: request.id,
                    });
                }
                if excluded.contains(name) {
                    continue;
                }

                let adapter = self.providers.read().await.enabled_adapter(name);
                let adapter = match adapter {
                    Some(adapter) if adapter.is_available() => adapter,
                    _ => {
                        debug!(request_id = %request.id, provider = %name, "Skipping unavailable provider");
                        continue;
                    }
                };

                called += 1;
                match self
                    .attempt_provider(adapter.as_ref(), name, strategy.as_ref(), &system_prompt, &request, config)
                    .await
                {
                    Ok(decision) => {
                        let decision = strategy.post_process_decision(decision, &request);
                        return Ok(DecisionResponse::accepted(
                            decision,
                            name.clone(),
                            elapsed_ms(started),
                            attempt,
                        ));
                    }
                    Err(err) if err.code == ErrorCode::RequestAborted => {
                        return Err(EngineError::RequestAborted {
                            request_id: request.id,
                        });
                    }
                    Err(err) => {
                        warn!(
                            request_id = %request.id,
                            provider = %name,
                            attempt = attempt,
                            code = %err.code,
                            retryable = err.retryable,
                            error = %err.message,
                            "Provider attempt failed"
                        );
                        if !err.retryable {
                            excluded.insert(name.clone());
                        }
                        last_error = Some(err.to_string());
                    }
                }
            }

            if attempt + 1 >= attempts {
                break;
            }
            if called == 0 || order.iter().all(|name| excluded.contains(name)) {
                debug!(request_id = %request.id, attempt = attempt, "No provider left to retry");
                break;
            }

            let delay = backoff.delay_for_attempt(attempt);
            debug!(
                request_id = %request.id,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Backing off before retry"
            );
            tokio::select! {
                _ = request.cancellation().cancelled() => {
                    return Err(EngineError::RequestAborted { request_id: request.id });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let last_error = last_error.unwrap_or_else(|| NO_PROVIDER_CALLED.to_string());
        // Exhaustion reports the full retry budget, including when no provider
        // was left to retry and the loop ended early.
        let retry_count = attempts - 1;

        if !config.enable_fallback {
            return Err(EngineError::AllProvidersFailed {
                last_error,
                retry_count,
            });
        }

        let decision = fallback_decision(strategy.as_ref(), &request, &last_error);
        Ok(DecisionResponse::fallback(
            decision,
            last_error,
            elapsed_ms(started),
            retry_count,
        ))
    }

    /// One provider call, parsed, validated and scored.
    async fn attempt_provider(
        &self,
        adapter: &dyn ProviderAdapter,
        name: &str,
        strategy: &dyn DecisionStrategy,
        system_prompt: &str,
        request: &DecisionRequest,
        config: &EngineConfig,
    ) -> Result<Decision, ProviderError> {
        let call = adapter.make_decision_request(system_prompt, &request.input, request);
        let response = tokio::select! {
            _ = request.cancellation().cancelled() => return Err(ProviderError::aborted(name)),
            result = tokio::time::timeout(config.timeout(), call) => match result {
                Ok(response) => response?,
                Err(_) => return Err(ProviderError::timeout(name, config.timeout_ms)),
            },
        };

        let raw = extract_json_object(&response.content)
            .map_err(|message| ProviderError::parse(name, message))?;

        let validation = if config.enable_validation {
            let result = strategy.validate_decision_structure(&raw, &request.decision_type);
            if !result.valid {
                return Err(ProviderError::new(
                    ErrorCode::ValidationFailed,
                    name,
                    result.errors.join("; "),
                )
                .with_retryable(true));
            }
            Some(ValidationResults::from(result))
        } else {
            None
        };

        let mut decision = Decision::new(
            request.domain.clone(),
            request.decision_type.clone(),
            DecisionPayload::new(raw),
        )
        .with_metadata("provider", name);
        if let Some(model) = response.model {
            decision = decision.with_metadata("model", model);
        }
        decision.validation_results = validation;

        let assessment = strategy.calculate_confidence(&decision, &request.decision_type, request);
        decision.confidence = assessment.final_confidence.clamp(0.0, 1.0);
        decision.confidence_assessment = Some(assessment);

        if decision.confidence.is_nan() || decision.confidence < config.confidence_threshold {
            return Err(ProviderError::new(
                ErrorCode::ConfidenceBelowThreshold,
                name,
                format!(
                    "confidence {:.2} below threshold {:.2}",
                    decision.confidence, config.confidence_threshold
                ),
            )
            .with_retryable(true));
        }

        Ok(decision)
    }

    /// Current configuration.
    pub async fn config(&self) -> EngineConfig {
        self.config.read().await.clone()
    }

    /// Replaces the given fields. Metrics and cached entries are kept.
    pub async fn update_config(
        &self,
        update: EngineConfigUpdate,
    ) -> Result<EngineConfig, EngineError> {
        let mut config = self.config.write().await;
        let next = update.apply_to(&config);
        next.validate()?;
        self.cache.lock().await.reconfigure(next.cache_config());
        *config = next.clone();
        info!("Engine configuration updated");
        Ok(next)
    }

    /// Snapshot of the metrics.
    pub async fn metrics(&self) -> EngineMetrics {
        self.metrics.lock().await.clone()
    }

    pub async fn reset_metrics(&self) {
        self.metrics.lock().await.reset();
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
        debug!("Decision cache cleared");
    }

    /// Probes every registered provider concurrently and records the result.
    ///
    /// Probes are bounded by the call timeout. A probe slower than half the
    /// timeout marks the provider degraded but still reports it healthy.
    pub async fn health_check(&self) -> BTreeMap<String, bool> {
        let adapters = self.providers.read().await.adapters();
        let timeout = self.config.read().await.timeout();

        let probes = adapters.into_iter().map(|(name, adapter)| async move {
            let started = Instant::now();
            let passed = matches!(
                tokio::time::timeout(timeout, adapter.health_check()).await,
                Ok(true)
            );
            let status = if !passed {
                HealthStatus::Unhealthy
            } else if started.elapsed() > timeout / 2 {
                HealthStatus::Degraded
            } else {
                HealthStatus::Healthy
            };
            (name, status)
        });
        let results = join_all(probes).await;

        let checked_at = Timestamp::now();
        let mut providers = self.providers.write().await;
        let mut report = BTreeMap::new();
        for (name, status) in results {
            if status == HealthStatus::Unhealthy {
                warn!(provider = %name, "Provider health check failed");
            }
            providers.record_health(&name, status, checked_at);
            report.insert(name, status != HealthStatus::Unhealthy);
        }
        report
    }

    pub async fn provider_statuses(&self) -> Vec<ProviderStatus> {
        self.providers.read().await.statuses()
    }

    pub async fn registered_domains(&self) -> Vec<String> {
        self.strategies.read().await.domains()
    }
}

fn fallback_decision(
    strategy: &dyn DecisionStrategy,
    request: &DecisionRequest,
    last_error: &str,
) -> Decision {
    let mut decision = strategy.create_fallback_decision(&request.decision_type, request);
    decision.kind = DecisionKind::Fallback;
    decision.confidence = FALLBACK_CONFIDENCE;
    if decision.confidence_assessment.is_none() {
        decision.confidence_assessment = Some(ConfidenceAssessment::fixed(FALLBACK_CONFIDENCE));
    }

    let mut validation = decision.validation_results.take().unwrap_or(ValidationResults {
        structure_valid: true,
        content_valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
    });
    validation.warnings.push(FALLBACK_WARNING.to_string());
    decision.validation_results = Some(validation);
    decision
        .metadata
        .insert("fallbackReason".to_string(), Value::String(last_error.to_string()));
    decision
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
