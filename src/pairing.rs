//! Pairing of source-language and target-language captures.
//!
//! No element identity survives a locale switch, so the default strategy pairs
//! strings by their position in the filtered captures. It assumes the page
//! renders its elements in the same order in both languages. This is a known
//! approximation: an element that appears in only one capture shifts every
//! pair after it. Strategies are pluggable so a stronger alignment can replace
//! positional pairing without touching the scorer.

use crate::error::CoverageError;
use crate::normalize::NormalizedText;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One source-side string and its target-side counterpart. Either side may be
/// missing when the captures differ in length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextPair {
    pub source: Option<NormalizedText>,
    pub target: Option<NormalizedText>,
}

impl TextPair {
    pub fn source_str(&self) -> &str {
        self.source.as_ref().map(NormalizedText::as_str).unwrap_or("")
    }

    pub fn target_str(&self) -> &str {
        self.target.as_ref().map(NormalizedText::as_str).unwrap_or("")
    }

    pub fn is_one_sided(&self) -> bool {
        self.source.is_none() || self.target.is_none()
    }
}

pub trait PairingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn pair(&self, source: Vec<NormalizedText>, target: Vec<NormalizedText>) -> Vec<TextPair>;
}

/// Pairs the i-th source string with the i-th target string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalPairing;

impl PairingStrategy for PositionalPairing {
    fn name(&self) -> &'static str {
        "positional"
    }

    fn pair(&self, source: Vec<NormalizedText>, target: Vec<NormalizedText>) -> Vec<TextPair> {
        let len = source.len().max(target.len());
        let mut source = source.into_iter();
        let mut target = target.into_iter();

        (0..len)
            .map(|_| TextPair {
                source: source.next(),
                target: target.next(),
            })
            .collect()
    }
}

/// Pairs strings that share the same capture order index (their position in
/// the raw capture, before any string was dropped). Useful when both captures
/// come from the same DOM walk and filtering removed different entries on
/// each side.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOrderPairing;

impl PairingStrategy for CaptureOrderPairing {
    fn name(&self) -> &'static str {
        "capture-order"
    }

    fn pair(&self, source: Vec<NormalizedText>, target: Vec<NormalizedText>) -> Vec<TextPair> {
        let mut slots: BTreeMap<usize, TextPair> = BTreeMap::new();
        for text in source {
            slots
                .entry(text.order)
                .or_insert(TextPair {
                    source: None,
                    target: None,
                })
                .source
                .get_or_insert(text);
        }
        for text in target {
            slots
                .entry(text.order)
                .or_insert(TextPair {
                    source: None,
                    target: None,
                })
                .target
                .get_or_insert(text);
        }
        slots.into_values().collect()
    }
}

/// Positional pairing.
pub fn pair(source: Vec<NormalizedText>, target: Vec<NormalizedText>) -> Vec<TextPair> {
    PositionalPairing.pair(source, target)
}

/// Configured pairing strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairingMode {
    #[default]
    Positional,
    CaptureOrder,
}

impl PairingMode {
    pub fn strategy(self) -> Box<dyn PairingStrategy> {
        match self {
            PairingMode::Positional => Box::new(PositionalPairing),
            PairingMode::CaptureOrder => Box::new(CaptureOrderPairing),
        }
    }
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingMode::Positional => f.write_str("positional"),
            PairingMode::CaptureOrder => f.write_str("capture-order"),
        }
    }
}

impl FromStr for PairingMode {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(PairingMode::Positional),
            "capture-order" | "capture_order" => Ok(PairingMode::CaptureOrder),
            other => Err(CoverageError::Configuration(format!(
                "unknown pairing strategy '{}'",
                other
            ))),
        }
    }
}
