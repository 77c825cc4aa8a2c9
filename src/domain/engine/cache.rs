//! Response cache keyed by request content.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::domain::decision::{DecisionRequest, DecisionResponse};

use super::CacheConfig;

/// Cache key for a request: `domain:decisionType:sha256(input, context)`.
///
/// Context is a sorted map, so equal contexts serialize identically.
pub fn cache_key(request: &DecisionRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.input.as_bytes());
    hasher.update([0u8]);
    if let Some(context) = &request.context {
        let rendered = serde_json::to_string(context).unwrap_or_default();
        hasher.update(rendered.as_bytes());
    }
    format!(
        "{}:{}:{:x}",
        request.domain,
        request.decision_type,
        hasher.finalize()
    )
}

struct CacheEntry {
    response: DecisionResponse,
    inserted_at: Instant,
}

/// Bounded response cache with oldest-first eviction.
pub struct DecisionCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    ttl: Option<Duration>,
    max_size: usize,
}

impl DecisionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl: ttl_from_secs(config.ttl_secs),
            max_size: config.max_size,
        }
    }

    /// Applies new sizing, evicting down to the new bound.
    pub fn reconfigure(&mut self, config: CacheConfig) {
        self.ttl = ttl_from_secs(config.ttl_secs);
        self.max_size = config.max_size;
        self.evict_to(self.max_size);
    }

    /// A live cached response. Expired entries are dropped on read.
    pub fn get(&mut self, key: &str) -> Option<DecisionResponse> {
        let expired = match self.entries.get(key) {
            Some(entry) => self
                .ttl
                .is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl),
            None => return None,
        };

        if expired {
            self.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.response.clone())
    }

    /// Stores a response as the newest entry, evicting the oldest on
    /// overflow.
    pub fn insert(&mut self, key: String, response: DecisionResponse) {
        if self.max_size == 0 {
            return;
        }

        if self.entries.contains_key(&key) {
            self.order.retain(|existing| existing != &key);
        } else {
            self.evict_to(self.max_size - 1);
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|existing| existing != key);
    }

    fn evict_to(&mut self, bound: usize) {
        while self.entries.len() > bound {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

fn ttl_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
