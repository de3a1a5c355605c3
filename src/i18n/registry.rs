//! Language registry: Single source of truth for the languages the engine knows about.
//!
//! The registry is immutable reference data (codes, names, scripts) and is shared
//! through a `OnceLock`. It holds no classification state; classifiers are built
//! explicitly from a `Config`.

use crate::i18n::script::ScriptRange;
use std::sync::OnceLock;

/// Configuration for a known language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// ISO 639-1 language code (e.g., "en", "ja")
    pub code: &'static str,

    /// ISO 639-3 code, used to map onto the statistical detector
    pub iso639_3: &'static str,

    /// English name of the language (e.g., "English", "Japanese")
    pub name: &'static str,

    /// Native name of the language (e.g., "English", "日本語")
    pub native_name: &'static str,

    /// Unicode blocks that identify text written in this language's script.
    /// Empty for Latin-script languages, which are recognized as ASCII instead.
    pub script_ranges: &'static [ScriptRange],

    /// Whether this is the canonical/source language (only one should be true)
    pub is_canonical: bool,

    /// Whether this language is enabled for use
    pub enabled: bool,
}

/// Global language registry.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

const JAPANESE_RANGES: &[ScriptRange] = &[
    ScriptRange::HIRAGANA,
    ScriptRange::KATAKANA,
    ScriptRange::CJK_UNIFIED,
];

const CHINESE_RANGES: &[ScriptRange] = &[ScriptRange::CJK_UNIFIED];

const KOREAN_RANGES: &[ScriptRange] = &[
    ScriptRange::new(0x1100, 0x11FF),
    ScriptRange::new(0xAC00, 0xD7AF),
];

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its ISO 639-1 code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Get all enabled languages.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get all languages (including disabled ones).
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    /// Get the canonical (source) language configuration.
    ///
    /// Falls back to the first registered language if no entry is flagged
    /// canonical; the default table always flags English.
    pub fn canonical(&self) -> &LanguageConfig {
        self.languages
            .iter()
            .find(|lang| lang.is_canonical)
            .unwrap_or(&self.languages[0])
    }

    /// Check if a language code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.enabled)
            .unwrap_or(false)
    }
}

/// Default language table.
///
/// English is the source language and Japanese the usual target. Chinese and
/// Korean are registered so the statistical detector can tell CJK text that is
/// not Japanese apart from a real translation.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            iso639_3: "eng",
            name: "English",
            native_name: "English",
            script_ranges: &[],
            is_canonical: true,
            enabled: true,
        },
        LanguageConfig {
            code: "ja",
            iso639_3: "jpn",
            name: "Japanese",
            native_name: "日本語",
            script_ranges: JAPANESE_RANGES,
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "zh",
            iso639_3: "cmn",
            name: "Chinese",
            native_name: "中文",
            script_ranges: CHINESE_RANGES,
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "ko",
            iso639_3: "kor",
            name: "Korean",
            native_name: "한국어",
            script_ranges: KOREAN_RANGES,
            is_canonical: false,
            enabled: true,
        },
    ]
}
