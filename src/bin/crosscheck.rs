//! `crosscheck` — compare a document service's invoice OCR against a vision
//! model, from the command line.
//!
//! ```text
//! crosscheck <DOCUMENT_ID> [--push] [--json] [--model gpt-4o]
//! ```
//!
//! Credentials come from `SCANYE_API_KEY` and `OPENAI_API_KEY`. Exit code is
//! non-zero on failure; a finished run with mismatches still exits zero —
//! mismatches are the product, not an error.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use invoice_crosscheck::{
    ComparisonEngine, ComparisonOutcome, CredentialStore, EngineConfig, MemoryCredentials,
    MISSING, MODEL_API_KEY, SERVICE_API_KEY,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "crosscheck",
    version,
    about = "Cross-check invoice OCR results against a vision language model"
)]
struct Cli {
    /// Document id on the service.
    document_id: String,

    /// After the comparison, push the model's extraction back to the service.
    #[arg(long)]
    push: bool,

    /// Emit the full outcome as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Vision model identifier.
    #[arg(long, default_value = "gpt-4o")]
    model: String,

    /// Document-service base URL.
    #[arg(long, env = "SCANYE_BASE_URL", default_value = invoice_crosscheck::config::DEFAULT_SERVICE_BASE_URL)]
    service_url: String,

    /// Model API base URL.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = invoice_crosscheck::config::DEFAULT_MODEL_BASE_URL)]
    model_url: String,

    /// Document-service API key.
    #[arg(long, env = "SCANYE_API_KEY", hide_env_values = true)]
    service_key: Option<String>,

    /// Model API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    model_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let credentials = MemoryCredentials::new();
    match &cli.service_key {
        Some(key) if !key.is_empty() => credentials.set(SERVICE_API_KEY, key),
        _ => bail!("No service API key. Set SCANYE_API_KEY or pass --service-key."),
    }
    match &cli.model_key {
        Some(key) if !key.is_empty() => credentials.set(MODEL_API_KEY, key),
        _ => bail!("No model API key. Set OPENAI_API_KEY or pass --model-key."),
    }

    let config = EngineConfig::builder()
        .service_base_url(&cli.service_url)
        .model_base_url(&cli.model_url)
        .model(&cli.model)
        .build()
        .context("invalid configuration")?;

    let engine = ComparisonEngine::new(config, Arc::new(credentials))?;

    let spinner = spinner(&format!("Comparing document {}…", cli.document_id));
    let outcome = engine.run(&cli.document_id).await;
    spinner.finish_and_clear();

    let outcome = outcome?.context("a run was already in flight")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    } else {
        print_table(&outcome);
    }

    if cli.push {
        let spinner = self::spinner("Pushing corrections…");
        let pushed = engine
            .push_corrections(&cli.document_id, &outcome.model_fields)
            .await;
        spinner.finish_and_clear();
        if pushed? {
            eprintln!("Corrections pushed to document {}.", cli.document_id);
        }
    } else if !cli.json {
        println!();
        println!("Update payload (dry run, pass --push to apply):");
        println!(
            "{}",
            serde_json::to_string_pretty(&invoice_crosscheck::update_payload(
                &outcome.model_fields
            ))?
        );
    }

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message.to_string());
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn print_table(outcome: &ComparisonOutcome) {
    const LABEL: usize = 16;
    const VALUE: usize = 34;

    println!(
        "{:<LABEL$} {:<VALUE$} {:<VALUE$} {}",
        "Field", "Service", "Model", "Match"
    );
    println!("{}", "-".repeat(LABEL + 2 * VALUE + 8));

    for row in &outcome.report.rows {
        println!(
            "{:<LABEL$} {:<VALUE$} {:<VALUE$} {}",
            row.field.label(),
            clip(&row.service_value, VALUE),
            clip(&row.model_value, VALUE),
            if row.matched { "yes" } else { "NO" }
        );
    }

    println!();
    println!(
        "{}/{} fields match",
        outcome.report.matched_count(),
        outcome.report.rows.len()
    );

    if !outcome.model_fields.items.is_empty() {
        println!();
        println!("Line items (model only):");
        for item in &outcome.model_fields.items {
            println!(
                "  {} x{} @ {} = {}",
                item.description.as_deref().unwrap_or(MISSING),
                item.quantity.as_deref().unwrap_or(MISSING),
                item.unit_price.as_deref().unwrap_or(MISSING),
                item.total.as_deref().unwrap_or(MISSING),
            );
        }
    }
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}
