//! Language knowledge: which languages exist, which scripts they use, and how
//! a captured string is assigned to one of them.
//!
//! # Architecture
//!
//! - `registry`: single source of truth for supported languages and their metadata
//! - `language`: copyable `Language` handle resolved through the registry
//! - `script`: Unicode ranges that make up a target script
//! - `classifier`: script-ratio classification with an optional statistical detector
//! - `validator`: per-pair consistency checks and page locale format checks
//! - `metrics`: per-capture counters
//!
//! # Example
//!
//! ```rust,ignore
//! use locale_coverage::i18n::{Language, LanguageClassifier};
//! use locale_coverage::i18n::script::TargetScript;
//!
//! let japanese = Language::from_code("ja")?;
//! let classifier = LanguageClassifier::new(
//!     TargetScript::new(japanese.script_ranges().to_vec()),
//!     0.3,
//!     japanese,
//! );
//! assert!(classifier.is_translated("設定"));
//! ```

pub mod classifier;
mod language;
pub mod metrics;
mod registry;
pub mod script;
mod validator;

pub use classifier::{
    ClassifiedText, LanguageClassifier, LanguageDetector, LanguageLabel, WhatlangDetector,
};
pub use language::Language;
pub use metrics::{CaptureMetrics, MetricsReport};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use validator::{
    LocaleFormatReport, LocaleFormatValidator, TranslationValidator, ValidationReport,
};
