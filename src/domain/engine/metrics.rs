//! Engine counters and running averages.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::ErrorCode;

/// Aggregate metrics since startup or the last reset.
///
/// Every request ends in exactly one of success, failure or cache hit, so
/// `successful_requests + failed_requests + cache_hits == total_requests`
/// once all in-flight requests have completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    /// Failed requests answered with a fallback decision.
    pub fallback_responses: u64,
    /// Mean latency over successful requests.
    pub average_latency_ms: f64,
    /// Mean confidence over successful requests.
    pub average_confidence: f64,
    /// Successful requests per provider.
    pub provider_usage: BTreeMap<String, u64>,
    /// Requests per domain.
    pub domain_usage: BTreeMap<String, u64>,
    /// Failed requests per terminal error code.
    pub errors_by_type: BTreeMap<ErrorCode, u64>,
}

impl EngineMetrics {
    pub fn record_request(&mut self, domain: &str) {
        self.total_requests += 1;
        *self.domain_usage.entry(domain.to_string()).or_insert(0) += 1;
    }

    pub fn record_success(&mut self, provider: &str, latency_ms: u64, confidence: f64) {
        self.successful_requests += 1;
        let n = self.successful_requests as f64;
        self.average_latency_ms += (latency_ms as f64 - self.average_latency_ms) / n;
        self.average_confidence += (confidence - self.average_confidence) / n;
        *self.provider_usage.entry(provider.to_string()).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, code: ErrorCode) {
        self.failed_requests += 1;
        *self.errors_by_type.entry(code).or_insert(0) += 1;
    }

    /// A failure that was still answered, with a fallback decision.
    pub fn record_fallback(&mut self) {
        self.fallback_responses += 1;
        self.record_failure(ErrorCode::AllProvidersFailed);
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
