//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

/// Decision Engine - route a decision request through strategies and AI providers
#[derive(Parser, Debug)]
#[command(name = "decision-engine")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); overrides the configured level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a canned mock provider instead of the configured AI providers
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit one decision request and print the response
    Decide(DecideArgs),

    /// Probe every registered provider
    Health,
}

/// Arguments for the decide command.
#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Decision type within the domain (e.g. triage, diagnosis)
    pub decision_type: String,

    /// Case description passed to the strategy
    pub input: String,

    /// Decision domain
    #[arg(short, long, default_value = "medical")]
    pub domain: String,

    /// Context entry as key=value; values are parsed as JSON when possible
    #[arg(short, long = "context", value_parser = parse_context_entry)]
    pub context: Vec<(String, Value)>,

    /// Preferred provider, tried before the configured default
    #[arg(short, long)]
    pub provider: Option<String>,
}

fn parse_context_entry(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty context key in '{}'", raw));
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
