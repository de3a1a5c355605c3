use crate::error::CoverageError;
use crate::i18n::script::{parse_ranges, ScriptRange};
use crate::i18n::Language;
use crate::noise::load_ignore_words;
use crate::pairing::PairingMode;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Per-bucket limits on how many detail rows a report keeps. `None` keeps all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetailCap {
    pub translated: Option<usize>,
    pub not_translated: Option<usize>,
    pub ignored: Option<usize>,
}

/// Patterns checked against the localized page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleFormatRules {
    pub date_pattern: Option<String>,
    pub number_pattern: Option<String>,
    pub currency_symbol: String,
}

impl Default for LocaleFormatRules {
    fn default() -> Self {
        Self {
            date_pattern: Some(r"\d{4}[年/\-]\d{1,2}[月/\-]\d{1,2}日?".to_string()),
            number_pattern: Some(r"\d{1,3}(,\d{3})+".to_string()),
            currency_symbol: "¥".to_string(),
        }
    }
}

/// Every threshold and switch used by the pipeline. Built once at startup and
/// shared read-only by all stages.
#[derive(Debug, Clone)]
pub struct Config {
    // Languages
    pub source_language: Language,
    pub target_language: Language,
    pub target_script_ranges: Vec<ScriptRange>,

    // Classification
    pub translated_ratio_threshold: f64,
    pub ambiguity_margin: f64,
    pub use_statistical_detector: bool,

    // Normalization
    pub min_text_length: usize,
    pub max_text_length: usize,

    // Ignore rules
    pub ignore_words: Vec<String>,
    pub drop_ignored_before_pairing: bool,

    // Pairing and scoring
    pub pairing: PairingMode,
    pub min_coverage_percent: f64,
    pub detail_cap: DetailCap,

    // Visual
    pub diff_threshold: f64,
    pub write_triptych: bool,
    pub reports_dir: PathBuf,
    pub snapshots_dir: PathBuf,
    pub update_snapshots: bool,

    // Locale formatting
    pub locale_format: LocaleFormatRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_language: Language::ENGLISH,
            target_language: Language::JAPANESE,
            target_script_ranges: Language::JAPANESE.script_ranges().to_vec(),
            translated_ratio_threshold: 0.3,
            ambiguity_margin: 0.1,
            use_statistical_detector: true,
            min_text_length: 2,
            max_text_length: 100,
            ignore_words: Vec::new(),
            drop_ignored_before_pairing: false,
            pairing: PairingMode::Positional,
            min_coverage_percent: 70.0,
            detail_cap: DetailCap::default(),
            diff_threshold: 0.02,
            write_triptych: true,
            reports_dir: PathBuf::from("reports"),
            snapshots_dir: PathBuf::from("snapshots"),
            update_snapshots: false,
            locale_format: LocaleFormatRules::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        // Languages
        let source_language = match std::env::var("SOURCE_LANGUAGE") {
            Ok(code) => Language::from_code(&code).context("SOURCE_LANGUAGE is invalid")?,
            Err(_) => defaults.source_language,
        };
        let target_language = match std::env::var("TARGET_LANGUAGE") {
            Ok(code) => Language::from_code(&code).context("TARGET_LANGUAGE is invalid")?,
            Err(_) => defaults.target_language,
        };

        let mut target_script_ranges = match std::env::var("TARGET_SCRIPT_RANGES") {
            Ok(list) => parse_ranges(&list).context("TARGET_SCRIPT_RANGES is invalid")?,
            Err(_) => target_language.script_ranges().to_vec(),
        };
        if env_or("INCLUDE_EXTENDED_CJK", false)?
            && !target_script_ranges.contains(&ScriptRange::CJK_EXTENSION_A)
        {
            target_script_ranges.push(ScriptRange::CJK_EXTENSION_A);
        }

        // Ignore words: inline list plus optional file
        let mut ignore_words: Vec<String> = std::env::var("IGNORE_WORDS")
            .map(|list| {
                list.split(',')
                    .map(|word| word.trim().to_string())
                    .filter(|word| !word.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if let Ok(path) = std::env::var("IGNORED_WORDS_FILE") {
            ignore_words.extend(load_ignore_words(&path));
        }

        let config = Self {
            source_language,
            target_language,
            target_script_ranges,

            translated_ratio_threshold: env_or(
                "TRANSLATED_RATIO_THRESHOLD",
                defaults.translated_ratio_threshold,
            )?,
            ambiguity_margin: env_or("AMBIGUITY_MARGIN", defaults.ambiguity_margin)?,
            use_statistical_detector: env_or(
                "USE_STATISTICAL_DETECTOR",
                defaults.use_statistical_detector,
            )?,

            min_text_length: env_or("MIN_TEXT_LENGTH", defaults.min_text_length)?,
            max_text_length: env_or("MAX_TEXT_LENGTH", defaults.max_text_length)?,

            ignore_words,
            drop_ignored_before_pairing: env_or(
                "DROP_IGNORED_BEFORE_PAIRING",
                defaults.drop_ignored_before_pairing,
            )?,

            pairing: env_or("PAIRING_STRATEGY", defaults.pairing)?,
            min_coverage_percent: env_or("MIN_COVERAGE_PERCENT", defaults.min_coverage_percent)?,
            detail_cap: DetailCap {
                translated: env_opt("DETAIL_CAP_TRANSLATED")?,
                not_translated: env_opt("DETAIL_CAP_NOT_TRANSLATED")?,
                ignored: env_opt("DETAIL_CAP_IGNORED")?,
            },

            diff_threshold: env_or("DIFF_THRESHOLD", defaults.diff_threshold)?,
            write_triptych: env_or("WRITE_TRIPTYCH", defaults.write_triptych)?,
            reports_dir: std::env::var("REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.reports_dir),
            snapshots_dir: std::env::var("SNAPSHOTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshots_dir),
            update_snapshots: env_or("UPDATE_SNAPSHOTS", defaults.update_snapshots)?,

            locale_format: LocaleFormatRules {
                date_pattern: std::env::var("LOCALE_DATE_REGEX")
                    .ok()
                    .or(defaults.locale_format.date_pattern),
                number_pattern: std::env::var("LOCALE_NUMBER_REGEX")
                    .ok()
                    .or(defaults.locale_format.number_pattern),
                currency_symbol: std::env::var("LOCALE_CURRENCY_SYMBOL")
                    .unwrap_or(defaults.locale_format.currency_symbol),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> std::result::Result<(), CoverageError> {
        let fail = |msg: String| Err(CoverageError::Configuration(msg));

        if self.source_language == self.target_language {
            return fail(format!(
                "source and target language are both '{}'",
                self.target_language.code()
            ));
        }
        if self.target_script_ranges.is_empty() {
            return fail("target script ranges are empty".to_string());
        }
        if let Some(range) = self.target_script_ranges.iter().find(|r| r.start > r.end) {
            return fail(format!("script range {} is reversed", range));
        }
        if !(0.0..=1.0).contains(&self.translated_ratio_threshold) {
            return fail(format!(
                "translated ratio threshold {} is outside [0, 1]",
                self.translated_ratio_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.ambiguity_margin) {
            return fail(format!(
                "ambiguity margin {} is outside [0, 1]",
                self.ambiguity_margin
            ));
        }
        if self.min_text_length == 0 {
            return fail("min text length must be at least 1".to_string());
        }
        if self.max_text_length <= self.min_text_length {
            return fail(format!(
                "max text length {} must exceed min text length {}",
                self.max_text_length, self.min_text_length
            ));
        }
        if !(0.0..=100.0).contains(&self.min_coverage_percent) {
            return fail(format!(
                "min coverage {} is outside [0, 100]",
                self.min_coverage_percent
            ));
        }
        if !(0.0..=1.0).contains(&self.diff_threshold) {
            return fail(format!(
                "diff threshold {} is outside [0, 1]",
                self.diff_threshold
            ));
        }
        for pattern in [
            &self.locale_format.date_pattern,
            &self.locale_format.number_pattern,
        ]
        .into_iter()
        .flatten()
        {
            if let Err(e) = Regex::new(pattern) {
                return fail(format!("locale pattern '{}' does not compile: {}", pattern, e));
            }
        }
        Ok(())
    }
}

/// Read and parse an environment variable, falling back to `default` when it
/// is unset. A value that is set but unparsable is an error.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: EnvValue,
{
    match std::env::var(key) {
        Ok(raw) => T::parse_env(raw.trim()).with_context(|| format!("{} has invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

fn env_opt<T>(key: &str) -> Result<Option<T>>
where
    T: EnvValue,
{
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => T::parse_env(raw.trim())
            .map(Some)
            .with_context(|| format!("{} has invalid value '{}'", key, raw)),
        Err(_) => Ok(None),
    }
}

/// Parsing for values read from the environment.
trait EnvValue: Sized {
    fn parse_env(raw: &str) -> Result<Self>;
}

macro_rules! env_value_from_str {
    ($($ty:ty),*) => {
        $(impl EnvValue for $ty {
            fn parse_env(raw: &str) -> Result<Self> {
                Ok(<$ty as FromStr>::from_str(raw)?)
            }
        })*
    };
}

env_value_from_str!(f64, usize, PairingMode);

impl EnvValue for bool {
    fn parse_env(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("expected a boolean, got '{}'", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "SOURCE_LANGUAGE",
        "TARGET_LANGUAGE",
        "TARGET_SCRIPT_RANGES",
        "INCLUDE_EXTENDED_CJK",
        "TRANSLATED_RATIO_THRESHOLD",
        "MIN_TEXT_LENGTH",
        "MAX_TEXT_LENGTH",
        "IGNORE_WORDS",
        "IGNORED_WORDS_FILE",
        "PAIRING_STRATEGY",
        "MIN_COVERAGE_PERCENT",
        "DIFF_THRESHOLD",
        "DETAIL_CAP_TRANSLATED",
        "UPDATE_SNAPSHOTS",
        "LOCALE_DATE_REGEX",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    // ==================== Default Tests ====================

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.translated_ratio_threshold, 0.3);
        assert_eq!(config.min_text_length, 2);
        assert_eq!(config.max_text_length, 100);
        assert_eq!(config.min_coverage_percent, 70.0);
        assert_eq!(config.diff_threshold, 0.02);
        assert_eq!(config.pairing, PairingMode::Positional);
        assert_eq!(config.target_script_ranges.len(), 3);
        assert!(config.validate().is_ok());
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        let config = Config {
            translated_ratio_threshold: 1.5,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoverageError::Configuration(_)));
        assert!(err.to_string().contains("ratio threshold"));
    }

    #[test]
    fn test_validate_rejects_inverted_lengths() {
        let config = Config {
            min_text_length: 10,
            max_text_length: 10,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_ranges() {
        let config = Config {
            target_script_ranges: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_same_languages() {
        let config = Config {
            target_language: Language::ENGLISH,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_locale_regex() {
        let mut config = Config::default();
        config.locale_format.date_pattern = Some("(unclosed".to_string());
        assert!(config.validate().is_err());
    }

    // ==================== Environment Tests ====================

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.target_language, Language::JAPANESE);
        assert_eq!(config.translated_ratio_threshold, 0.3);
        assert!(config.ignore_words.is_empty());
        assert_eq!(config.detail_cap, DetailCap::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("TRANSLATED_RATIO_THRESHOLD", "0.5");
        std::env::set_var("MIN_COVERAGE_PERCENT", "85");
        std::env::set_var("IGNORE_WORDS", "VWO, Copyright ,");
        std::env::set_var("PAIRING_STRATEGY", "capture-order");
        std::env::set_var("DETAIL_CAP_TRANSLATED", "25");
        std::env::set_var("INCLUDE_EXTENDED_CJK", "true");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.translated_ratio_threshold, 0.5);
        assert_eq!(config.min_coverage_percent, 85.0);
        assert_eq!(config.ignore_words, vec!["VWO", "Copyright"]);
        assert_eq!(config.pairing, PairingMode::CaptureOrder);
        assert_eq!(config.detail_cap.translated, Some(25));
        assert_eq!(config.detail_cap.ignored, None);
        assert!(config
            .target_script_ranges
            .contains(&ScriptRange::CJK_EXTENSION_A));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_ignore_file() {
        clear_env();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ignored.txt");
        std::fs::write(&path, "Dashboard\n\n  API key  \n").unwrap();
        std::env::set_var("IGNORED_WORDS_FILE", &path);

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.ignore_words, vec!["Dashboard", "API key"]);
    }

    #[test]
    #[serial]
    fn test_from_env_unparsable_value_is_error() {
        clear_env();
        std::env::set_var("MIN_TEXT_LENGTH", "two");
        let result = Config::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("MIN_TEXT_LENGTH"));
    }

    #[test]
    #[serial]
    fn test_from_env_out_of_range_is_configuration_error() {
        clear_env();
        std::env::set_var("DIFF_THRESHOLD", "2.0");
        let result = Config::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(err.downcast_ref::<CoverageError>().is_some());
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_language() {
        clear_env();
        std::env::set_var("TARGET_LANGUAGE", "xx");
        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_custom_ranges() {
        clear_env();
        std::env::set_var("TARGET_SCRIPT_RANGES", "3040-309F");
        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.target_script_ranges, vec![ScriptRange::HIRAGANA]);
    }
}
