//! Error taxonomy for the coverage engine.
//!
//! Only `Configuration` is meant to reach the caller as a hard failure. Decode
//! and image errors are recovered inside the stage that produced them (the
//! string is dropped, or the page is scored as a maximal visual diff).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverageError {
    /// Captured bytes could not be decoded as UTF-8 or any fallback encoding.
    #[error("could not decode captured text ({len} bytes) as UTF-8, Shift_JIS or EUC-JP")]
    Decode { len: usize },

    /// A screenshot could not be read, decoded or written.
    #[error("image I/O failed for {}: {source}", path.display())]
    ImageIo {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Moving a screenshot into the baseline store failed.
    #[error("baseline I/O failed for {}: {source}", path.display())]
    BaselineIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing or out-of-range configuration. Fatal at startup.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, CoverageError>;
