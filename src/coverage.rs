//! Coverage scoring.
//!
//! Each pair lands in exactly one bucket: `ignored` when an ignore rule
//! matches its source side, otherwise `translated` or `not_translated`
//! depending on the target side's language. Coverage is
//! `translated / (translated + not_translated)`; ignored pairs count in
//! neither.

use crate::config::DetailCap;
use crate::i18n::{LanguageClassifier, LanguageLabel};
use crate::noise::NoiseFilter;
use crate::pairing::TextPair;
use serde::Serialize;

/// Maximum number of non-target samples kept in a capture analysis.
const SAMPLE_LIMIT: usize = 3;

/// Samples longer than this many characters are truncated.
const SAMPLE_MAX_CHARS: usize = 140;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Translated,
    NotTranslated,
    Ignored,
}

/// A pair as it appears in report details. Missing sides are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairDetail {
    pub source: String,
    pub target: String,
}

impl From<&TextPair> for PairDetail {
    fn from(pair: &TextPair) -> Self {
        Self {
            source: pair.source_str().to_string(),
            target: pair.target_str().to_string(),
        }
    }
}

/// Uncapped bucket counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub total: usize,
    pub translated: usize,
    pub not_translated: usize,
    pub ignored: usize,
    pub coverage_percent: f64,
}

/// Detail rows per bucket, subject to the configured caps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageDetails {
    pub translated: Vec<PairDetail>,
    pub not_translated: Vec<PairDetail>,
    pub ignored: Vec<PairDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCoverage {
    pub summary: CoverageSummary,
    pub details: CoverageDetails,
}

/// `part / max(whole, 1) * 100`, rounded to two decimals.
pub fn percent(part: usize, whole: usize) -> f64 {
    let raw = part as f64 / whole.max(1) as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

pub struct CoverageScorer<'a> {
    classifier: &'a LanguageClassifier,
    filter: &'a NoiseFilter,
    cap: DetailCap,
}

impl<'a> CoverageScorer<'a> {
    pub fn new(classifier: &'a LanguageClassifier, filter: &'a NoiseFilter, cap: DetailCap) -> Self {
        Self {
            classifier,
            filter,
            cap,
        }
    }

    /// Bucket for a single pair. A pair without a source side is never
    /// ignored; it is judged on its target side alone.
    pub fn bucket(&self, pair: &TextPair) -> Bucket {
        if let Some(source) = &pair.source {
            if self.filter.matches_ignore_rule(&source.value) {
                return Bucket::Ignored;
            }
        }
        if self.classifier.is_translated(pair.target_str()) {
            Bucket::Translated
        } else {
            Bucket::NotTranslated
        }
    }

    pub fn score(&self, pairs: Vec<TextPair>) -> ScoredCoverage {
        let mut translated = 0;
        let mut not_translated = 0;
        let mut ignored = 0;
        let mut details = CoverageDetails::default();

        for pair in &pairs {
            let (count, rows, cap) = match self.bucket(pair) {
                Bucket::Translated => (&mut translated, &mut details.translated, self.cap.translated),
                Bucket::NotTranslated => (
                    &mut not_translated,
                    &mut details.not_translated,
                    self.cap.not_translated,
                ),
                Bucket::Ignored => (&mut ignored, &mut details.ignored, self.cap.ignored),
            };
            *count += 1;
            if cap.map_or(true, |limit| rows.len() < limit) {
                rows.push(PairDetail::from(pair));
            }
        }

        ScoredCoverage {
            summary: CoverageSummary {
                total: pairs.len(),
                translated,
                not_translated,
                ignored,
                coverage_percent: percent(translated, translated + not_translated),
            },
            details,
        }
    }
}

/// Language make-up of a single capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LanguageDistribution {
    pub source: usize,
    pub target: usize,
    pub other: usize,
    pub unknown: usize,
    /// target / (target + source) as a percentage
    pub coverage_percent: f64,
}

/// Target-language detection over one capture, without pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureAnalysis {
    pub total: usize,
    pub target_detected: usize,
    /// target / total as a percentage
    pub coverage_percent: f64,
    pub non_target_samples: Vec<String>,
    pub distribution: LanguageDistribution,
}

/// Classify every string of one capture and summarize the result.
pub fn analyze_capture<S: AsRef<str>>(
    classifier: &LanguageClassifier,
    texts: &[S],
) -> CaptureAnalysis {
    let mut distribution = LanguageDistribution::default();
    let mut samples = Vec::new();

    for text in texts {
        let text = text.as_ref();
        match classifier.classify(text) {
            LanguageLabel::Source => distribution.source += 1,
            LanguageLabel::Target => distribution.target += 1,
            LanguageLabel::Other => distribution.other += 1,
            LanguageLabel::Unknown => distribution.unknown += 1,
        }
        if !classifier.is_translated(text) && samples.len() < SAMPLE_LIMIT {
            samples.push(truncate_sample(text));
        }
    }

    distribution.coverage_percent =
        percent(distribution.target, distribution.target + distribution.source);

    CaptureAnalysis {
        total: texts.len(),
        target_detected: distribution.target,
        coverage_percent: percent(distribution.target, texts.len()),
        non_target_samples: samples,
        distribution,
    }
}

fn truncate_sample(text: &str) -> String {
    // a sample that reaches the limit is marked as cut too
    if text.chars().count() < SAMPLE_MAX_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(SAMPLE_MAX_CHARS).collect();
    truncated.push('…');
    truncated
}
