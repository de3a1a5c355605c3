//! Language classification by target-script character ratio.
//!
//! The ratio test decides on its own. A statistical detector can be attached
//! to double-check texts the ratio calls `target` while sitting within the
//! ambiguity margin of the threshold. It may only downgrade such a text, never
//! promote one, so raising the threshold never turns a non-target text into a
//! target one.
//!
//! A downgrade also needs script evidence: the text must contain a character
//! of the detected language's script that the target script does not cover
//! (kana in a text classified against a Chinese target, say). Ideographs
//! shared by Japanese and Chinese carry no such evidence, so kanji-only
//! Japanese is never demoted on the detector's word alone.

use crate::config::Config;
use crate::i18n::script::TargetScript;
use crate::i18n::Language;
use crate::normalize::NormalizedText;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Language label assigned to a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageLabel {
    Source,
    Target,
    Other,
    Unknown,
}

impl fmt::Display for LanguageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LanguageLabel::Source => "source",
            LanguageLabel::Target => "target",
            LanguageLabel::Other => "other",
            LanguageLabel::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A normalized string with its language label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedText {
    pub text: NormalizedText,
    pub language: LanguageLabel,
}

/// Statistical language identification, restricted to a fixed candidate set.
pub trait LanguageDetector: Send + Sync {
    /// Best guess for `text`, or `None` when the detector is not confident.
    fn detect(&self, text: &str) -> Option<Language>;
}

/// `whatlang` detector limited to the registered languages.
pub struct WhatlangDetector {
    detector: whatlang::Detector,
}

impl WhatlangDetector {
    /// Build a detector whose candidates are `candidates` (unknown codes are
    /// skipped).
    pub fn new(candidates: &[Language]) -> Self {
        let allowlist = candidates
            .iter()
            .filter_map(|lang| whatlang::Lang::from_code(lang.config().iso639_3))
            .collect();
        Self {
            detector: whatlang::Detector::with_allowlist(allowlist),
        }
    }

    /// Target, source and the two CJK disambiguation languages.
    pub fn for_pair(source: Language, target: Language) -> Self {
        let mut candidates = vec![target, source];
        for code in ["zh", "ko"] {
            if let Ok(lang) = Language::from_code(code) {
                if !candidates.contains(&lang) {
                    candidates.push(lang);
                }
            }
        }
        Self::new(&candidates)
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<Language> {
        let info = self.detector.detect(text)?;
        Language::from_iso639_3(info.lang().code())
    }
}

/// Immutable classifier built once per run and passed to every stage that
/// needs a language decision.
pub struct LanguageClassifier {
    script: TargetScript,
    threshold: f64,
    ambiguity_margin: f64,
    target: Language,
    detector: Option<Box<dyn LanguageDetector>>,
}

impl LanguageClassifier {
    pub fn new(script: TargetScript, threshold: f64, target: Language) -> Self {
        Self {
            script,
            threshold,
            ambiguity_margin: 0.0,
            target,
            detector: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let classifier = Self::new(
            TargetScript::new(config.target_script_ranges.clone()),
            config.translated_ratio_threshold,
            config.target_language,
        );
        if config.use_statistical_detector {
            classifier.with_detector(
                Box::new(WhatlangDetector::for_pair(
                    config.source_language,
                    config.target_language,
                )),
                config.ambiguity_margin,
            )
        } else {
            classifier
        }
    }

    /// Attach a detector consulted for target-side calls within `margin` of
    /// the threshold.
    pub fn with_detector(mut self, detector: Box<dyn LanguageDetector>, margin: f64) -> Self {
        self.detector = Some(detector);
        self.ambiguity_margin = margin;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn script(&self) -> &TargetScript {
        &self.script
    }

    pub fn target_ratio(&self, text: &str) -> f64 {
        self.script.ratio(text)
    }

    pub fn classify(&self, text: &str) -> LanguageLabel {
        if text.trim().is_empty() {
            return LanguageLabel::Unknown;
        }

        let ratio = self.target_ratio(text);
        if ratio > self.threshold {
            return self.confirm_target(text, ratio);
        }
        if text.is_ascii() {
            LanguageLabel::Source
        } else {
            LanguageLabel::Other
        }
    }

    /// Whether a target-side string counts as translated.
    pub fn is_translated(&self, text: &str) -> bool {
        self.classify(text) == LanguageLabel::Target
    }

    pub fn classify_all(&self, texts: Vec<NormalizedText>) -> Vec<ClassifiedText> {
        texts
            .into_iter()
            .map(|text| {
                let language = self.classify(&text.value);
                ClassifiedText { text, language }
            })
            .collect()
    }

    fn confirm_target(&self, text: &str, ratio: f64) -> LanguageLabel {
        let Some(detector) = &self.detector else {
            return LanguageLabel::Target;
        };
        if ratio - self.threshold > self.ambiguity_margin {
            return LanguageLabel::Target;
        }

        match detector.detect(text) {
            Some(lang)
                if lang != self.target
                    && !lang.is_canonical()
                    && self.has_foreign_script(text, lang) =>
            {
                debug!(
                    "Ratio {:.2} near threshold; detector says '{}' for {:?}",
                    ratio,
                    lang.code(),
                    text
                );
                LanguageLabel::Other
            }
            _ => LanguageLabel::Target,
        }
    }

    /// Whether `text` has a character written in `lang`'s script but outside
    /// the target script.
    fn has_foreign_script(&self, text: &str, lang: Language) -> bool {
        let foreign = lang.script_ranges();
        text.chars()
            .any(|c| !self.script.contains(c) && foreign.iter().any(|range| range.contains(c)))
    }
}
