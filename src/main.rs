//! Batch validation of localized pages.
//!
//! Usage:
//!   locale-coverage <manifest.json>
//!
//! The manifest lists one entry per page. Capture files hold one raw UI
//! string per line; relative paths are resolved against the manifest's
//! directory:
//!
//! ```json
//! {
//!   "pages": [
//!     {
//!       "url": "https://app.example.com/settings",
//!       "before_capture": "captures/settings.en.txt",
//!       "after_capture": "captures/settings.ja.txt",
//!       "before_screenshot": "shots/settings.en.png",
//!       "after_screenshot": "shots/settings.ja.png",
//!       "current_screenshot": "shots/settings.ja.png"
//!     }
//!   ]
//! }
//! ```
//!
//! Configuration comes from the environment (see `Config::from_env`). The
//! process exits non-zero when any page misses the coverage minimum or the
//! visual threshold.

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use locale_coverage::normalize::split_capture;
use locale_coverage::report::PageValidation;
use locale_coverage::visual::snapshot_file_name;
use locale_coverage::{Config, CoverageEngine};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct Manifest {
    pages: Vec<PageEntry>,
}

impl Manifest {
    /// Parse a manifest, rejecting duplicate URLs: artifacts are named after
    /// the URL, so two entries for one page would overwrite each other.
    fn parse(json: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(json).context("Failed to parse manifest")?;
        let mut seen = HashSet::new();
        for page in &manifest.pages {
            if !seen.insert(page.url.as_str()) {
                bail!("Manifest lists {} more than once", page.url);
            }
        }
        Ok(manifest)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PageEntry {
    url: String,
    before_capture: PathBuf,
    after_capture: PathBuf,
    #[serde(default)]
    before_screenshot: Option<PathBuf>,
    #[serde(default)]
    after_screenshot: Option<PathBuf>,
    #[serde(default)]
    current_screenshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locale_coverage=info".parse()?),
        )
        .init();

    let manifest_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("Usage: locale-coverage <manifest.json>")?;

    let config = Config::from_env()?;
    let manifest = Manifest::parse(
        &std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?,
    )?;

    info!("Validating {} pages", manifest.pages.len());

    let engine = Arc::new(CoverageEngine::from_config(&config)?);
    let base_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let dirs = Arc::new((config.reports_dir.clone(), config.snapshots_dir.clone()));

    let tasks = manifest.pages.into_iter().map(|page| {
        let engine = Arc::clone(&engine);
        let base_dir = base_dir.clone();
        let dirs = Arc::clone(&dirs);
        tokio::task::spawn_blocking(move || {
            validate_page(&engine, &page, &base_dir, &dirs.0, &dirs.1)
        })
    });

    let mut pages = Vec::new();
    for joined in join_all(tasks).await {
        pages.push(joined.context("Page validation task panicked")??);
    }

    println!("{}", serde_json::to_string_pretty(&pages)?);

    let failed: Vec<&str> = pages
        .iter()
        .filter(|page| !page.passed())
        .map(|page| page.url.as_str())
        .collect();
    if !failed.is_empty() {
        for url in &failed {
            warn!("Validation failed: {}", url);
        }
        bail!("{} of {} pages failed validation", failed.len(), pages.len());
    }

    info!("All {} pages passed", pages.len());
    Ok(())
}

fn validate_page(
    engine: &CoverageEngine,
    page: &PageEntry,
    base_dir: &Path,
    reports_dir: &Path,
    snapshots_dir: &Path,
) -> Result<PageValidation> {
    let before = read_capture(&base_dir.join(&page.before_capture))?;
    let after = read_capture(&base_dir.join(&page.after_capture))?;
    let before_lines = split_capture(&before);
    let after_lines = split_capture(&after);

    let mut validation = engine.analyze(&page.url, &before_lines, &after_lines);

    let shot_name = snapshot_file_name(&page.url);
    if let (Some(before_shot), Some(after_shot)) = (&page.before_screenshot, &page.after_screenshot)
    {
        let diff_out = reports_dir.join("visual_diffs").join(&shot_name);
        let result = engine.compare_screenshots(
            &base_dir.join(before_shot),
            &base_dir.join(after_shot),
            &diff_out,
        );
        validation = validation.with_visual(result, engine.diff_threshold());
    }

    if let Some(current) = &page.current_screenshot {
        // the baseline store takes ownership of the file, so compare a copy
        let outcome = engine.check_current_screenshot(
            &base_dir.join(current),
            &reports_dir.join("current").join(&shot_name),
            &snapshots_dir.join(&shot_name),
            &reports_dir.join("baseline_diffs").join(&shot_name),
        );
        validation = validation.with_baseline(outcome);
    }

    Ok(validation)
}

fn read_capture(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read capture {}", path.display()))
}
