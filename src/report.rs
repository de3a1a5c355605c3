//! Per-page report model. Pure data assembly; nothing here touches the disk.

use crate::coverage::{CoverageDetails, CoverageSummary, PairDetail, ScoredCoverage};
use crate::i18n::{LocaleFormatReport, MetricsReport, ValidationReport};
use crate::visual::{BaselineOutcome, VisualDiffResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Untranslated sources longer than this are high priority.
const HIGH_PRIORITY_CHARS: usize = 20;

/// Untranslated sources longer than this are at least medium priority.
const MEDIUM_PRIORITY_CHARS: usize = 10;

/// Coverage of one page. Built once per validation run and never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub summary: CoverageSummary,
    pub details: CoverageDetails,
}

impl CoverageReport {
    pub fn new(url: impl Into<String>, scored: ScoredCoverage) -> Self {
        Self::at(Utc::now(), url, scored)
    }

    /// Report with a fixed timestamp.
    pub fn at(timestamp: DateTime<Utc>, url: impl Into<String>, scored: ScoredCoverage) -> Self {
        Self {
            timestamp,
            url: url.into(),
            summary: scored.summary,
            details: scored.details,
        }
    }

    pub fn meets(&self, min_coverage_percent: f64) -> bool {
        self.summary.coverage_percent >= min_coverage_percent
    }

    /// Untranslated strings, longest source first. Only the rows kept in the
    /// report details are listed.
    pub fn untranslated_worklist(&self) -> Vec<WorklistItem> {
        let mut items: Vec<WorklistItem> = self
            .details
            .not_translated
            .iter()
            .map(WorklistItem::from)
            .collect();
        // stable: equal lengths keep page order
        items.sort_by(|a, b| b.source_chars.cmp(&a.source_chars));
        items
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn for_length(chars: usize) -> Self {
        if chars > HIGH_PRIORITY_CHARS {
            Priority::High
        } else if chars > MEDIUM_PRIORITY_CHARS {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// One string a translator still has to handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorklistItem {
    pub source: String,
    pub current_target: String,
    pub source_chars: usize,
    pub priority: Priority,
}

impl From<&PairDetail> for WorklistItem {
    fn from(detail: &PairDetail) -> Self {
        let source_chars = detail.source.chars().count();
        Self {
            source: detail.source.clone(),
            current_target: detail.target.clone(),
            source_chars,
            priority: Priority::for_length(source_chars),
        }
    }
}

/// Everything known about one page after validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageValidation {
    pub url: String,
    pub coverage: CoverageReport,
    pub min_coverage_percent: f64,
    pub coverage_passed: bool,

    pub before_capture: Option<MetricsReport>,
    pub after_capture: Option<MetricsReport>,

    pub translation_checks: ValidationReport,
    pub locale_format: Option<LocaleFormatReport>,

    pub visual: Option<VisualDiffResult>,
    pub baseline: Option<BaselineOutcome>,
    pub visual_passed: bool,
}

impl PageValidation {
    pub fn new(coverage: CoverageReport, min_coverage_percent: f64) -> Self {
        Self {
            url: coverage.url.clone(),
            coverage_passed: coverage.meets(min_coverage_percent),
            coverage,
            min_coverage_percent,
            before_capture: None,
            after_capture: None,
            translation_checks: ValidationReport::new(),
            locale_format: None,
            visual: None,
            baseline: None,
            visual_passed: true,
        }
    }

    pub fn with_capture_metrics(mut self, before: MetricsReport, after: MetricsReport) -> Self {
        self.before_capture = Some(before);
        self.after_capture = Some(after);
        self
    }

    pub fn with_translation_checks(mut self, checks: ValidationReport) -> Self {
        self.translation_checks = checks;
        self
    }

    pub fn with_locale_format(mut self, report: LocaleFormatReport) -> Self {
        self.locale_format = Some(report);
        self
    }

    /// Merge the before/after screenshot delta. A ratio above
    /// `diff_threshold` fails the page.
    pub fn with_visual(mut self, result: VisualDiffResult, diff_threshold: f64) -> Self {
        if result.diff_ratio > diff_threshold {
            self.visual_passed = false;
        }
        self.visual = Some(result);
        self
    }

    pub fn with_baseline(mut self, outcome: BaselineOutcome) -> Self {
        if let BaselineOutcome::Compared { passed: false, .. } = outcome {
            self.visual_passed = false;
        }
        self.baseline = Some(outcome);
        self
    }

    pub fn passed(&self) -> bool {
        self.coverage_passed && self.visual_passed
    }
}
