//! Language distribution of a single capture, without pairing.
//!
//! Usage:
//!   cargo run --bin distribution -- captures/settings.ja.txt
//!
//! Useful for a quick look at a page where no source-language capture exists.

use anyhow::{Context, Result};
use locale_coverage::coverage::analyze_capture;
use locale_coverage::i18n::CaptureMetrics;
use locale_coverage::normalize::split_capture;
use locale_coverage::{Config, CoverageEngine};
use tracing::info;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("distribution=info".parse()?)
                .add_directive("locale_coverage=info".parse()?),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .context("Usage: distribution <capture-file>")?;

    let config = Config::from_env()?;
    let engine = CoverageEngine::from_config(&config)?;

    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read capture {}", path))?;
    let mut metrics = CaptureMetrics::new();
    let texts: Vec<String> = engine
        .prepare(&split_capture(&bytes), &mut metrics)
        .into_iter()
        .map(|text| text.value)
        .collect();

    let analysis = analyze_capture(engine.classifier(), &texts);
    info!(
        "{}: {} strings, {} in {} ({:.2}%)",
        path,
        analysis.total,
        analysis.target_detected,
        config.target_language.name(),
        analysis.coverage_percent
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "capture": path,
            "metrics": metrics.report(),
            "analysis": analysis,
        }))?
    );

    Ok(())
}
