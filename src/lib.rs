//! Translation coverage and visual drift analysis for localized web UIs.
//!
//! Two text captures of the same page, taken before and after a locale
//! switch, are normalized, filtered, paired and scored; two screenshots are
//! compared pixel by pixel. Everything ends up in one [`report::PageValidation`]
//! per page.

pub mod config;
pub mod coverage;
pub mod error;
pub mod i18n;
pub mod noise;
pub mod normalize;
pub mod pairing;
pub mod pipeline;
pub mod report;
pub mod visual;

pub use config::Config;
pub use error::{CoverageError, Result};
pub use pipeline::CoverageEngine;
