//! Unicode block ranges and target-script ratio measurement.

use crate::error::{CoverageError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An inclusive range of Unicode code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScriptRange {
    pub start: u32,
    pub end: u32,
}

impl ScriptRange {
    pub const HIRAGANA: ScriptRange = ScriptRange::new(0x3040, 0x309F);
    pub const KATAKANA: ScriptRange = ScriptRange::new(0x30A0, 0x30FF);
    pub const CJK_UNIFIED: ScriptRange = ScriptRange::new(0x4E00, 0x9FFF);
    pub const CJK_EXTENSION_A: ScriptRange = ScriptRange::new(0x3400, 0x4DBF);

    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, c: char) -> bool {
        let cp = c as u32;
        cp >= self.start && cp <= self.end
    }

    /// Regex character-class fragment for this range, e.g. `\x{3040}-\x{309F}`.
    pub fn class_fragment(&self) -> String {
        format!("\\x{{{:X}}}-\\x{{{:X}}}", self.start, self.end)
    }
}

impl fmt::Display for ScriptRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}-{:04X}", self.start, self.end)
    }
}

/// Parses `3040-309F` (hex, optional `U+` / `0x` prefixes).
impl FromStr for ScriptRange {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoverageError::Configuration(format!("invalid script range '{}'", s));

        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let parse = |part: &str| {
            let part = part.trim();
            let digits = part
                .strip_prefix("U+")
                .or_else(|| part.strip_prefix("u+"))
                .or_else(|| part.strip_prefix("0x"))
                .unwrap_or(part);
            u32::from_str_radix(digits, 16).map_err(|_| invalid())
        };

        let range = ScriptRange::new(parse(start)?, parse(end)?);
        if range.start > range.end || char::from_u32(range.end).is_none() {
            return Err(invalid());
        }
        Ok(range)
    }
}

/// Parse a comma-separated list of ranges.
pub fn parse_ranges(list: &str) -> Result<Vec<ScriptRange>> {
    list.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// The set of Unicode blocks that count as "written in the target language".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetScript {
    ranges: Vec<ScriptRange>,
}

impl TargetScript {
    pub fn new(ranges: Vec<ScriptRange>) -> Self {
        Self { ranges }
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|range| range.contains(c))
    }

    pub fn count_in(&self, text: &str) -> usize {
        text.chars().filter(|&c| self.contains(c)).count()
    }

    /// Target-script characters divided by total characters (spaces included).
    /// Empty text has ratio 0.0.
    pub fn ratio(&self, text: &str) -> f64 {
        let total = text.chars().count();
        if total == 0 {
            return 0.0;
        }
        self.count_in(text) as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn japanese() -> TargetScript {
        TargetScript::new(vec![
            ScriptRange::HIRAGANA,
            ScriptRange::KATAKANA,
            ScriptRange::CJK_UNIFIED,
        ])
    }

    // ==================== Range Parsing Tests ====================

    #[test]
    fn test_parse_plain_hex() {
        let range: ScriptRange = "3040-309F".parse().unwrap();
        assert_eq!(range, ScriptRange::HIRAGANA);
    }

    #[test]
    fn test_parse_prefixed_hex() {
        let range: ScriptRange = "U+4E00-U+9FFF".parse().unwrap();
        assert_eq!(range, ScriptRange::CJK_UNIFIED);
        let range: ScriptRange = "0x3400 - 0x4DBF".parse().unwrap();
        assert_eq!(range, ScriptRange::CJK_EXTENSION_A);
    }

    #[test]
    fn test_parse_rejects_reversed_range() {
        assert!("309F-3040".parse::<ScriptRange>().is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("hiragana".parse::<ScriptRange>().is_err());
        assert!("3040".parse::<ScriptRange>().is_err());
        assert!("3040-zzzz".parse::<ScriptRange>().is_err());
    }

    #[test]
    fn test_parse_ranges_list() {
        let ranges = parse_ranges("3040-309F, 30A0-30FF,").unwrap();
        assert_eq!(ranges, vec![ScriptRange::HIRAGANA, ScriptRange::KATAKANA]);
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        let text = ScriptRange::KATAKANA.to_string();
        assert_eq!(text, "30A0-30FF");
        assert_eq!(text.parse::<ScriptRange>().unwrap(), ScriptRange::KATAKANA);
    }

    #[test]
    fn test_class_fragment() {
        assert_eq!(ScriptRange::HIRAGANA.class_fragment(), "\\x{3040}-\\x{309F}");
    }

    // ==================== Ratio Tests ====================

    #[test]
    fn test_ratio_all_japanese() {
        assert_eq!(japanese().ratio("設定"), 1.0);
        assert_eq!(japanese().ratio("こんにちは"), 1.0);
    }

    #[test]
    fn test_ratio_ascii() {
        assert_eq!(japanese().ratio("Settings"), 0.0);
    }

    #[test]
    fn test_ratio_counts_spaces_in_denominator() {
        // 2 target chars out of 4 total
        assert_eq!(japanese().ratio("設定 a"), 0.5);
    }

    #[test]
    fn test_ratio_empty_is_zero() {
        assert_eq!(japanese().ratio(""), 0.0);
    }

    #[test]
    fn test_extension_a_not_included_by_default() {
        // U+3400 is the first Extension A ideograph
        assert_eq!(japanese().count_in("\u{3400}"), 0);
        let extended = TargetScript::new(vec![ScriptRange::CJK_EXTENSION_A]);
        assert_eq!(extended.count_in("\u{3400}"), 1);
    }
}
