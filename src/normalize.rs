//! Text normalization for captured UI strings.
//!
//! Characters outside the allow-list are stripped first, then whitespace runs
//! are collapsed and the ends trimmed. Doing it in that order keeps
//! `normalize(normalize(x)) == normalize(x)`.

use crate::error::{CoverageError, Result};
use crate::i18n::metrics::CaptureMetrics;
use crate::i18n::script::ScriptRange;
use encoding_rs::{Encoding, EUC_JP, SHIFT_JIS, UTF_8};
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::debug;

/// Punctuation kept by normalization, as a regex class fragment.
const ALLOWED_PUNCTUATION: &str = r#".,!\?;:\(\)\[\]\{\}"'\-"#;

/// Encodings tried, in order, when a capture is not valid UTF-8.
const FALLBACK_ENCODINGS: &[&Encoding] = &[SHIFT_JIS, EUC_JP];

static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();

/// A cleaned capture string and its position in the capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedText {
    pub value: String,
    pub order: usize,
}

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Text decoded from raw capture bytes.
#[derive(Debug, Clone)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    pub encoding: &'static Encoding,
}

impl Decoded<'_> {
    pub fn used_fallback(&self) -> bool {
        self.encoding != UTF_8
    }
}

/// Decode capture bytes as UTF-8, falling back to Japanese legacy encodings.
/// Decoders never substitute replacement characters; a buffer that no
/// encoding accepts is a `Decode` error.
pub fn decode_raw(bytes: &[u8]) -> Result<Decoded<'_>> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(Decoded {
            text: Cow::Borrowed(text),
            encoding: UTF_8,
        });
    }

    FALLBACK_ENCODINGS
        .iter()
        .find_map(|&encoding| {
            encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| Decoded { text, encoding })
        })
        .ok_or(CoverageError::Decode { len: bytes.len() })
}

/// Split a capture file into its entries: one raw string per line, with a
/// trailing `\r` removed.
pub fn split_capture(bytes: &[u8]) -> Vec<&[u8]> {
    if bytes.is_empty() {
        return Vec::new();
    }
    bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

#[derive(Debug, Clone)]
pub struct TextNormalizer {
    disallowed: Regex,
    min_length: usize,
    max_length: usize,
}

impl TextNormalizer {
    /// Build a normalizer that keeps word characters, the given script ranges
    /// and the fixed punctuation set, and accepts lengths in
    /// `[min_length, max_length)`.
    pub fn new(ranges: &[ScriptRange], min_length: usize, max_length: usize) -> Result<Self> {
        let script_class: String = ranges.iter().map(ScriptRange::class_fragment).collect();
        let pattern = format!(r"[^\w\s{}{}]", script_class, ALLOWED_PUNCTUATION);
        let disallowed = Regex::new(&pattern).map_err(|e| {
            CoverageError::Configuration(format!("normalizer pattern does not compile: {}", e))
        })?;

        Ok(Self {
            disallowed,
            min_length,
            max_length,
        })
    }

    /// Clean one string. Returns `None` when nothing usable remains or the
    /// result is outside the length bounds.
    pub fn normalize(&self, raw: &str, order: usize) -> Option<NormalizedText> {
        let stripped = self.disallowed.replace_all(raw, "");
        let whitespace = WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").unwrap());
        let collapsed = whitespace.replace_all(&stripped, " ");
        let value = collapsed.trim();

        let length = value.chars().count();
        if value.is_empty() || length < self.min_length || length >= self.max_length {
            return None;
        }

        Some(NormalizedText {
            value: value.to_string(),
            order,
        })
    }

    /// Decode and clean one raw byte buffer. Never fails; undecodable input is
    /// dropped.
    pub fn normalize_bytes(&self, raw: &[u8], order: usize) -> Option<NormalizedText> {
        match decode_raw(raw) {
            Ok(decoded) => self.normalize(&decoded.text, order),
            Err(e) => {
                debug!("Dropping capture entry {}: {}", order, e);
                None
            }
        }
    }

    /// Normalize a whole capture, keeping the capture order index of each
    /// surviving string and counting what was dropped.
    pub fn normalize_capture<I, T>(&self, raws: I, metrics: &mut CaptureMetrics) -> Vec<NormalizedText>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut out = Vec::new();
        for (order, raw) in raws.into_iter().enumerate() {
            metrics.record_raw();
            let decoded = match decode_raw(raw.as_ref()) {
                Ok(decoded) => decoded,
                Err(e) => {
                    debug!("Dropping capture entry {}: {}", order, e);
                    metrics.record_decode_failure();
                    continue;
                }
            };
            if decoded.used_fallback() {
                debug!(
                    "Capture entry {} decoded as {}",
                    order,
                    decoded.encoding.name()
                );
                metrics.record_fallback_decode();
            }
            match self.normalize(&decoded.text, order) {
                Some(text) => out.push(text),
                None => metrics.record_rejected(),
            }
        }
        out
    }
}
