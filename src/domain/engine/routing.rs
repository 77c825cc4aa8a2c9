//! Provider priority resolution.

use super::{EngineConfig, EngineError, ProviderRegistry};

/// Ordered, de-duplicated provider candidates for one request.
///
/// `[preferred, default, ...fallbacks]`, each included only if registered
/// and enabled, and only the first time it appears.
pub fn resolve_provider_order(
    preferred: Option<&str>,
    config: &EngineConfig,
    registry: &ProviderRegistry,
) -> Result<Vec<String>, EngineError> {
    let candidates = preferred
        .into_iter()
        .chain(config.default_provider.as_deref())
        .chain(config.fallback_providers.iter().map(String::as_str));

    let mut order: Vec<String> = Vec::new();
    for name in candidates {
        if registry.is_enabled(name) && !order.iter().any(|existing| existing == name) {
            order.push(name.to_string());
        }
    }

    if order.is_empty() {
        return Err(EngineError::NoProvidersAvailable);
    }

    Ok(order)
}
