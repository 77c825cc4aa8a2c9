//! Decision Engine CLI
//!
//! Loads configuration, registers the medical strategy and the configured
//! providers, then either submits one decision request or probes provider
//! health. Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use decision_engine::adapters::ai::{
    AnthropicProvider, MockProvider, OpenAIProvider, ANTHROPIC_PROVIDER, OPENAI_PROVIDER,
};
use decision_engine::adapters::strategies::medical::{DIAGNOSIS, MEDICAL_DOMAIN};
use decision_engine::adapters::strategies::MedicalStrategy;
use decision_engine::config::{AppConfig, LogFormat, LoggingConfig};
use decision_engine::domain::decision::{CancelHandle, DecisionRequest};
use decision_engine::domain::engine::{
    DecisionEngine, EngineConfig, ProviderOptions, StrategyOptions,
};

mod cli;

use cli::{Cli, Commands, DecideArgs};

const MOCK_PROVIDER: &str = "mock";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config.logging, cli.verbose, cli.json);

    let engine = build_engine(&config, &cli).await?;

    match cli.command {
        Commands::Decide(args) => decide(&engine, args).await,
        Commands::Health => health(&engine).await,
    }
}

/// Initialize tracing/logging based on configuration, verbosity and format.
fn init_tracing(logging: &LoggingConfig, verbose: u8, json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => logging.env_filter(),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    if json || logging.format == LogFormat::Json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(verbose > 1)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn build_engine(config: &AppConfig, cli: &Cli) -> Result<DecisionEngine> {
    let mut registered = Vec::new();
    let mut engine_config = config.engine.clone();

    if cli.mock {
        registered.push(MOCK_PROVIDER.to_string());
        engine_config.default_provider = Some(MOCK_PROVIDER.to_string());
        engine_config.fallback_providers.clear();
    } else {
        if config.providers.has_openai() {
            registered.push(OPENAI_PROVIDER.to_string());
        }
        if config.providers.has_anthropic() {
            registered.push(ANTHROPIC_PROVIDER.to_string());
        }
        engine_config = with_default_routing(engine_config, &registered);
    }

    let engine = DecisionEngine::new(engine_config).context("failed to create engine")?;

    engine
        .register_strategy(
            MEDICAL_DOMAIN,
            Arc::new(MedicalStrategy::new()),
            StrategyOptions::default(),
        )
        .await;

    if cli.mock {
        let decision_type = match &cli.command {
            Commands::Decide(args) => args.decision_type.as_str(),
            Commands::Health => "",
        };
        let mock = MockProvider::new(MOCK_PROVIDER)
            .with_default_response(canned_response(decision_type).to_string());
        engine
            .register_provider(MOCK_PROVIDER, Arc::new(mock), ProviderOptions::default())
            .await;
    } else {
        if config.providers.has_openai() {
            let provider = OpenAIProvider::new(config.providers.openai_config());
            engine
                .register_provider(OPENAI_PROVIDER, Arc::new(provider), ProviderOptions::default())
                .await;
        }
        if config.providers.has_anthropic() {
            let provider = AnthropicProvider::new(config.providers.anthropic_config());
            engine
                .register_provider(
                    ANTHROPIC_PROVIDER,
                    Arc::new(provider),
                    ProviderOptions::default(),
                )
                .await;
        }
    }

    if registered.is_empty() {
        warn!("No provider API keys configured; pass --mock to use the canned provider");
    } else {
        info!(providers = ?registered, "Providers registered");
    }

    Ok(engine)
}

/// Routes through every registered provider when the configuration names none.
fn with_default_routing(mut config: EngineConfig, registered: &[String]) -> EngineConfig {
    if config.default_provider.is_none() && config.fallback_providers.is_empty() {
        let mut names = registered.iter().cloned();
        config.default_provider = names.next();
        config.fallback_providers = names.collect();
    }
    config
}

async fn decide(engine: &DecisionEngine, args: DecideArgs) -> Result<()> {
    let cancellation = CancelHandle::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut request = DecisionRequest::new(args.domain, args.decision_type, args.input)
        .with_cancellation(cancellation);
    for (key, value) in args.context {
        request = request.with_context(key, value);
    }
    if let Some(provider) = args.provider {
        request = request.with_provider(provider);
    }

    let response = engine.make_decision(request).await?;
    if !response.success {
        warn!(
            error = response.error.as_deref().unwrap_or_default(),
            "Returned a fallback decision"
        );
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn health(engine: &DecisionEngine) -> Result<()> {
    let healthy = engine.health_check().await;
    let statuses = engine.provider_statuses().await;

    let report = json!({
        "healthy": healthy,
        "providers": statuses,
        "domains": engine.registered_domains().await,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn canned_response(decision_type: &str) -> serde_json::Value {
    if decision_type == DIAGNOSIS {
        json!({
            "primaryDiagnosis": {"condition": "Viral upper respiratory infection", "probability": 0.72},
            "differentialDiagnoses": [
                {"condition": "Streptococcal pharyngitis", "probability": 0.15},
                {"condition": "Allergic rhinitis", "probability": 0.08}
            ],
            "recommendedTests": ["Rapid strep test"],
            "redFlags": [],
            "reasoning": "Symptom pattern and timeline fit a self-limiting viral illness; a rapid strep test rules out the main bacterial differential."
        })
    } else {
        json!({
            "urgency": "semi_urgent",
            "disposition": "Primary care visit",
            "redFlags": [],
            "timeToTreatmentMinutes": 120,
            "reasoning": "Stable presentation without red flags; symptoms warrant same-day assessment but not emergency department resources."
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_routing_uses_registered_order() {
        let registered = vec!["openai".to_string(), "anthropic".to_string()];
        let config = with_default_routing(EngineConfig::default(), &registered);
        assert_eq!(config.default_provider.as_deref(), Some("openai"));
        assert_eq!(config.fallback_providers, vec!["anthropic".to_string()]);
    }

    #[test]
    fn test_configured_routing_is_kept() {
        let configured = EngineConfig {
            default_provider: Some("anthropic".to_string()),
            ..Default::default()
        };
        let config = with_default_routing(configured, &["openai".to_string()]);
        assert_eq!(config.default_provider.as_deref(), Some("anthropic"));
        assert!(config.fallback_providers.is_empty());
    }
}
