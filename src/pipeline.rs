//! The coverage engine: raw captures in, one page validation out.
//!
//! raw -> normalize -> noise filter -> pair -> score -> report. Every stage
//! consumes its input and hands a new collection downstream. The engine
//! itself is immutable once built, so one instance can serve many pages
//! concurrently.

use crate::config::{Config, DetailCap};
use crate::coverage::{Bucket, CoverageScorer};
use crate::error::{CoverageError, Result};
use crate::i18n::{
    CaptureMetrics, LanguageClassifier, LocaleFormatValidator, TranslationValidator,
    ValidationReport,
};
use crate::noise::{IgnoreRules, NoiseFilter};
use crate::normalize::{decode_raw, NormalizedText, TextNormalizer};
use crate::pairing::{PairingStrategy, TextPair};
use crate::report::{CoverageReport, PageValidation};
use crate::visual::{compare_to_baseline, BaselineOutcome, VisualDiffEngine, VisualDiffResult};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct CoverageEngine {
    normalizer: TextNormalizer,
    filter: NoiseFilter,
    classifier: LanguageClassifier,
    pairing: Box<dyn PairingStrategy>,
    locale_format: LocaleFormatValidator,
    visual: VisualDiffEngine,
    detail_cap: DetailCap,
    drop_ignored_before_pairing: bool,
    min_coverage_percent: f64,
    diff_threshold: f64,
    update_snapshots: bool,
}

impl CoverageEngine {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let normalizer = TextNormalizer::new(
            &config.target_script_ranges,
            config.min_text_length,
            config.max_text_length,
        )?;
        let filter = NoiseFilter::new(
            config.min_text_length,
            IgnoreRules::new(&config.ignore_words),
        );

        Ok(Self {
            normalizer,
            filter,
            classifier: LanguageClassifier::from_config(config),
            pairing: config.pairing.strategy(),
            locale_format: LocaleFormatValidator::new(&config.locale_format)?,
            visual: VisualDiffEngine::new(config.write_triptych),
            detail_cap: config.detail_cap,
            drop_ignored_before_pairing: config.drop_ignored_before_pairing,
            min_coverage_percent: config.min_coverage_percent,
            diff_threshold: config.diff_threshold,
            update_snapshots: config.update_snapshots,
        })
    }

    pub fn with_pairing(mut self, pairing: Box<dyn PairingStrategy>) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn classifier(&self) -> &LanguageClassifier {
        &self.classifier
    }

    /// Normalize and filter one capture.
    pub fn prepare<T: AsRef<[u8]>>(
        &self,
        raws: &[T],
        metrics: &mut CaptureMetrics,
    ) -> Vec<NormalizedText> {
        self.normalizer
            .normalize_capture(raws.iter(), metrics)
            .into_iter()
            .filter(|text| {
                if self.filter.is_noise(&text.value) {
                    metrics.record_noise();
                    return false;
                }
                if self.drop_ignored_before_pairing && self.filter.matches_ignore_rule(&text.value)
                {
                    metrics.record_ignored();
                    return false;
                }
                true
            })
            .collect()
    }

    /// Validate one page from its before/after text captures.
    pub fn analyze<T: AsRef<[u8]>>(&self, url: &str, before: &[T], after: &[T]) -> PageValidation {
        let mut before_metrics = CaptureMetrics::new();
        let mut after_metrics = CaptureMetrics::new();
        let source = self.prepare(before, &mut before_metrics);
        let target = self.prepare(after, &mut after_metrics);

        let pairs = self.pairing.pair(source, target);
        debug!("Paired {} strings with {} strategy", pairs.len(), self.pairing.name());
        let scorer = CoverageScorer::new(&self.classifier, &self.filter, self.detail_cap);
        let checks = self.translation_checks(&scorer, &pairs);
        let coverage = CoverageReport::new(url, scorer.score(pairs));

        let summary = &coverage.summary;
        info!(
            "{}: {} pairs, {} translated, {} not translated, {} ignored ({:.2}%)",
            url,
            summary.total,
            summary.translated,
            summary.not_translated,
            summary.ignored,
            summary.coverage_percent
        );
        if !coverage.meets(self.min_coverage_percent) {
            warn!(
                "{}: coverage {:.2}% is below the minimum {:.2}%",
                url, summary.coverage_percent, self.min_coverage_percent
            );
        }

        let locale_format = self.locale_format.check(&decoded_body(after));

        PageValidation::new(coverage, self.min_coverage_percent)
            .with_capture_metrics(before_metrics.report(), after_metrics.report())
            .with_translation_checks(checks)
            .with_locale_format(locale_format)
    }

    /// Pixel delta between the before and after screenshots.
    pub fn compare_screenshots(&self, before: &Path, after: &Path, diff_out: &Path) -> VisualDiffResult {
        self.visual.diff_files(before, after, diff_out)
    }

    pub fn diff_threshold(&self) -> f64 {
        self.diff_threshold
    }

    /// Compare a screenshot against its stored baseline, approving it when
    /// snapshots are being updated or no baseline exists.
    pub fn check_baseline(
        &self,
        current: &Path,
        baseline: &Path,
        diff_out: &Path,
    ) -> Result<BaselineOutcome> {
        compare_to_baseline(
            &self.visual,
            current,
            baseline,
            diff_out,
            self.update_snapshots,
            self.diff_threshold,
        )
    }

    /// Stage a copy of `current` at `staged` and check it against its
    /// baseline. A screenshot that cannot be staged or compared is logged and
    /// reported as a failed maximal diff, so one bad page never aborts a batch.
    pub fn check_current_screenshot(
        &self,
        current: &Path,
        staged: &Path,
        baseline: &Path,
        diff_out: &Path,
    ) -> BaselineOutcome {
        match self.stage_and_check(current, staged, baseline, diff_out) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Baseline check skipped for {}: {}", current.display(), e);
                BaselineOutcome::Compared {
                    result: VisualDiffResult::maximal(),
                    passed: false,
                }
            }
        }
    }

    fn stage_and_check(
        &self,
        current: &Path,
        staged: &Path,
        baseline: &Path,
        diff_out: &Path,
    ) -> Result<BaselineOutcome> {
        let to_error = |source| CoverageError::BaselineIo {
            path: staged.to_path_buf(),
            source,
        };
        if let Some(parent) = staged.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(to_error)?;
        }
        std::fs::copy(current, staged).map_err(to_error)?;
        self.check_baseline(staged, baseline, diff_out)
    }

    fn translation_checks(&self, scorer: &CoverageScorer<'_>, pairs: &[TextPair]) -> ValidationReport {
        let mut report = ValidationReport::new();
        for pair in pairs {
            if pair.source.is_none() || scorer.bucket(pair) != Bucket::Translated {
                continue;
            }
            report.absorb(
                pair.source_str(),
                TranslationValidator::validate(pair.source_str(), pair.target_str()),
            );
        }
        report
    }
}

/// Whole after-capture text, decoded but not normalized, so currency
/// symbols and date separators survive for the locale format checks.
fn decoded_body<T: AsRef<[u8]>>(raws: &[T]) -> String {
    raws.iter()
        .filter_map(|raw| decode_raw(raw.as_ref()).ok())
        .map(|decoded| decoded.text.into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::PairingMode;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn config() -> Config {
        Config {
            use_statistical_detector: false,
            ignore_words: vec!["VWO".to_string()],
            ..Config::default()
        }
    }

    fn engine(config: &Config) -> CoverageEngine {
        CoverageEngine::from_config(config).unwrap()
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let config = Config {
            diff_threshold: 3.0,
            ..config()
        };
        assert!(CoverageEngine::from_config(&config).is_err());
    }

    // ==================== Prepare Tests ====================

    #[test]
    fn test_prepare_drops_noise_and_counts() {
        let engine = engine(&config());
        let mut metrics = CaptureMetrics::new();
        let texts = engine.prepare(&["Settings", "1,234", "x", "VWO Insights"], &mut metrics);

        let values: Vec<&str> = texts.iter().map(|t| t.as_str()).collect();
        assert_eq!(values, vec!["Settings", "VWO Insights"]);

        let report = metrics.report();
        assert_eq!(report.noise_dropped, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.ignored_dropped, 0);
    }

    #[test]
    fn test_prepare_legacy_drops_ignored() {
        let engine = engine(&Config {
            drop_ignored_before_pairing: true,
            ..config()
        });
        let mut metrics = CaptureMetrics::new();
        let texts = engine.prepare(&["Settings", "VWO Insights"], &mut metrics);
        assert_eq!(texts.len(), 1);
        assert_eq!(metrics.report().ignored_dropped, 1);
    }

    // ==================== Analyze Tests ====================

    #[test]
    fn test_analyze_page() {
        let engine = engine(&config());
        let page = engine.analyze(
            "https://app.example.com/",
            &["Settings", "VWO Insights", "Save", "2024"],
            &["設定", "VWO インサイト", "Save", "2024"],
        );

        let summary = &page.coverage.summary;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.translated, 1);
        assert_eq!(summary.not_translated, 1);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.coverage_percent, 50.0);
        assert!(!page.coverage_passed);
        assert_eq!(page.before_capture.as_ref().unwrap().noise_dropped, 1);
    }

    #[test]
    fn test_analyze_runs_translation_checks_on_translated_pairs() {
        let engine = engine(&config());
        let page = engine.analyze(
            "https://app.example.com/",
            &["Delete 3 items", "Hello {name}"],
            &["アイテムを削除", "こんにちは {name}"],
        );
        assert_eq!(page.translation_checks.warnings.len(), 1);
        assert!(page.translation_checks.warnings[0].starts_with("Delete 3 items"));
        assert!(page.translation_checks.errors.is_empty());
    }

    #[test]
    fn test_analyze_locale_format_uses_raw_text() {
        let engine = engine(&config());
        let page = engine.analyze(
            "https://app.example.com/billing",
            &["Total"],
            &["合計 ¥12,800 (2024/03/15)"],
        );
        let format = page.locale_format.unwrap();
        assert!(format.currency_symbol_present);
        assert!(format.number_grouping_ok);
        assert!(format.date_ok);
    }

    #[test]
    fn test_capture_order_pairing_from_config() {
        let engine = engine(&Config {
            pairing: PairingMode::CaptureOrder,
            ..config()
        });
        // the "x" entry is rejected on one side only
        let page = engine.analyze("u", &["x", "Settings"], &["ヘルプ", "設定"]);
        assert_eq!(page.coverage.summary.total, 2);
        assert_eq!(page.coverage.details.translated.len(), 2);
        assert_eq!(page.coverage.details.translated[1].source, "Settings");
    }

    #[test]
    fn test_default_config_counts_kanji_only_translation() {
        let engine = CoverageEngine::from_config(&Config::default()).unwrap();
        let page = engine.analyze("u", &["Total 100"], &["合計 100"]);
        assert_eq!(page.coverage.summary.translated, 1);
        assert_eq!(page.coverage.summary.coverage_percent, 100.0);
    }

    // ==================== Baseline Tests ====================

    #[test]
    fn test_missing_current_screenshot_fails_without_error() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&config());
        let outcome = engine.check_current_screenshot(
            &dir.path().join("absent.png"),
            &dir.path().join("current").join("home.png"),
            &dir.path().join("snapshots").join("home.png"),
            &dir.path().join("diffs").join("home.png"),
        );

        match outcome {
            BaselineOutcome::Compared { result, passed } => {
                assert!(!passed);
                assert_eq!(result.diff_ratio, 1.0);
            }
            other => panic!("expected a failed comparison, got {:?}", other),
        }
        assert!(!dir.path().join("snapshots").join("home.png").exists());
    }

    #[test]
    fn test_current_screenshot_is_staged_then_approved() {
        let dir = TempDir::new().unwrap();
        let current = dir.path().join("shot.png");
        RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]))
            .save(&current)
            .unwrap();
        let baseline = dir.path().join("snapshots").join("home.png");

        let outcome = engine(&config()).check_current_screenshot(
            &current,
            &dir.path().join("current").join("home.png"),
            &baseline,
            &dir.path().join("diffs").join("home.png"),
        );

        assert_eq!(
            outcome,
            BaselineOutcome::Approved {
                baseline: baseline.clone()
            }
        );
        assert!(baseline.exists());
        // the manifest's own file is left in place
        assert!(current.exists());
    }
}
