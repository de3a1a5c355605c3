//! Translation quality checks.
//!
//! `TranslationValidator` compares one source string with its translation and
//! flags tokens that must survive translation unchanged (numbers and
//! interpolation placeholders). `LocaleFormatValidator` looks at the whole
//! localized page for locale-specific formatting. Neither affects coverage.

use crate::config::LocaleFormatRules;
use crate::error::{CoverageError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Problems that break the rendered string (lost placeholders)
    pub errors: Vec<String>,

    /// Likely mistakes worth a look
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// No errors or warnings.
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }

    /// Append another report's findings, prefixing each with `context`.
    pub fn absorb(&mut self, context: &str, other: ValidationReport) {
        self.errors
            .extend(other.errors.into_iter().map(|e| format!("{}: {}", context, e)));
        self.warnings
            .extend(other.warnings.into_iter().map(|w| format!("{}: {}", context, w)));
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TranslationValidator;

static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Check that a translation keeps the numbers and placeholders of its
    /// source.
    ///
    /// Numbers are compared by their digits, so `1,000` and `1000` match.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let orig_placeholders = Self::extract_placeholders(original);
        let trans_placeholders = Self::extract_placeholders(translated);
        let missing: Vec<&String> = orig_placeholders.difference(&trans_placeholders).collect();
        if !missing.is_empty() {
            report.errors.push(format!(
                "Placeholder mismatch: translation is missing {:?}",
                missing
            ));
        }

        let orig_numbers = Self::extract_numbers(original);
        let trans_numbers = Self::extract_numbers(translated);
        let missing: Vec<&String> = orig_numbers.difference(&trans_numbers).collect();
        if !missing.is_empty() {
            report.warnings.push(format!(
                "Number mismatch: translation is missing {:?}",
                missing
            ));
        }

        report
    }

    /// Digit sequences with grouping and decimal separators removed.
    fn extract_numbers(text: &str) -> BTreeSet<String> {
        let regex =
            NUMBER_REGEX.get_or_init(|| Regex::new(r"[0-9]+(?:[.,][0-9]+)*").unwrap());

        regex
            .find_iter(text)
            .map(|m| m.as_str().chars().filter(char::is_ascii_digit).collect())
            .collect()
    }

    /// `{name}`, `{{name}}`, `{0}`, `%s`, `%d`, `%1$s` and similar.
    fn extract_placeholders(text: &str) -> BTreeSet<String> {
        let regex = PLACEHOLDER_REGEX.get_or_init(|| {
            Regex::new(r"\{\{?\s*[A-Za-z0-9_.]*\s*\}?\}|%(?:[0-9]+\$)?[sdif@]").unwrap()
        });

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Outcome of the locale format checks on one page. Checks that are switched
/// off count as passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleFormatReport {
    pub date_ok: bool,
    pub number_grouping_ok: bool,
    pub currency_symbol_present: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LocaleFormatValidator {
    date: Option<Regex>,
    number: Option<Regex>,
    currency_symbol: String,
}

impl LocaleFormatValidator {
    pub fn new(rules: &LocaleFormatRules) -> Result<Self> {
        let compile = |pattern: &Option<String>| -> Result<Option<Regex>> {
            pattern
                .as_deref()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        CoverageError::Configuration(format!(
                            "locale pattern '{}' does not compile: {}",
                            p, e
                        ))
                    })
                })
                .transpose()
        };

        Ok(Self {
            date: compile(&rules.date_pattern)?,
            number: compile(&rules.number_pattern)?,
            currency_symbol: rules.currency_symbol.clone(),
        })
    }

    /// Look for locale-formatted dates, grouped numbers and the currency
    /// symbol anywhere in `body`.
    pub fn check(&self, body: &str) -> LocaleFormatReport {
        let mut warnings = Vec::new();

        let date_ok = self.date.as_ref().map_or(true, |re| re.is_match(body));
        if !date_ok {
            warnings.push("No date in the expected locale format".to_string());
        }

        let number_grouping_ok = self.number.as_ref().map_or(true, |re| re.is_match(body));
        if !number_grouping_ok {
            warnings.push("No number with locale digit grouping".to_string());
        }

        let currency_symbol_present =
            self.currency_symbol.is_empty() || body.contains(&self.currency_symbol);
        if !currency_symbol_present {
            warnings.push(format!("Currency symbol '{}' not found", self.currency_symbol));
        }

        LocaleFormatReport {
            date_ok,
            number_grouping_ok,
            currency_symbol_present,
            warnings,
        }
    }
}
