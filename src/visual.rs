//! Visual delta between two screenshots of the same viewport.
//!
//! The ratio is the share of pixels whose RGB channels differ at all; alpha
//! is ignored. A screenshot that cannot be read is treated as a full-page
//! regression (ratio 1.0) instead of an error, so a missing asset can never
//! pass silently.

use crate::error::{CoverageError, Result};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Height of the label band above each panel of the triptych.
const LABEL_BAND: u32 = 24;

/// Width of the separator between triptych panels.
const SEPARATOR: u32 = 4;

const LABEL_SCALE: u32 = 2;

/// Width and height of a `font8x8` glyph.
const GLYPH_SIZE: u32 = 8;

const SEPARATOR_COLOR: Rgba<u8> = Rgba([128, 128, 128, 255]);
const LABEL_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualDiffResult {
    /// Share of differing pixels, in `[0, 1]`
    pub diff_ratio: f64,

    /// Where the difference image was written, if it was
    pub diff_image_path: Option<PathBuf>,
}

impl VisualDiffResult {
    /// Result used when an input could not be read.
    pub fn maximal() -> Self {
        Self {
            diff_ratio: 1.0,
            diff_image_path: None,
        }
    }
}

/// Resample `current` to `reference`'s size when they differ. The reference
/// is never resized.
pub fn align_to(reference: &RgbaImage, current: RgbaImage) -> RgbaImage {
    if reference.dimensions() == current.dimensions() {
        return current;
    }
    let (w, h) = reference.dimensions();
    debug!(
        "Resampling {}x{} screenshot to {}x{}",
        current.width(),
        current.height(),
        w,
        h
    );
    imageops::resize(&current, w, h, FilterType::Lanczos3)
}

/// Per-channel absolute difference of two equally sized images and the share
/// of pixels with any RGB difference. The output is opaque.
pub fn difference(a: &RgbaImage, b: &RgbaImage) -> (RgbaImage, f64) {
    let (w, h) = a.dimensions();
    let mut diff = RgbaImage::new(w, h);
    let mut changed: u64 = 0;

    for ((out, pa), pb) in diff
        .chunks_exact_mut(4)
        .zip(a.as_raw().chunks_exact(4))
        .zip(b.as_raw().chunks_exact(4))
    {
        let dr = pa[0].abs_diff(pb[0]);
        let dg = pa[1].abs_diff(pb[1]);
        let db = pa[2].abs_diff(pb[2]);
        out.copy_from_slice(&[dr, dg, db, 255]);
        if dr | dg | db != 0 {
            changed += 1;
        }
    }

    let total = (w as u64) * (h as u64);
    let ratio = if total > 0 {
        changed as f64 / total as f64
    } else {
        0.0
    };
    (diff, ratio)
}

/// Align and diff two decoded images.
pub fn diff_images(a: &RgbaImage, b: RgbaImage) -> (RgbaImage, RgbaImage, f64) {
    let b = align_to(a, b);
    let (diff, ratio) = difference(a, &b);
    (b, diff, ratio)
}

/// Screenshot comparison with optional review artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualDiffEngine {
    write_triptych: bool,
}

impl VisualDiffEngine {
    pub fn new(write_triptych: bool) -> Self {
        Self { write_triptych }
    }

    /// Compare two screenshot files and write the difference image to
    /// `diff_out`. Never fails; unreadable inputs give a ratio of 1.0.
    pub fn diff_files(&self, a: &Path, b: &Path, diff_out: &Path) -> VisualDiffResult {
        let loaded = open_rgba(a).and_then(|img_a| Ok((img_a, open_rgba(b)?)));
        match loaded {
            Ok((img_a, img_b)) => self.finish(&img_a, img_b, diff_out),
            Err(e) => {
                warn!("Visual diff treated as maximal: {}", e);
                VisualDiffResult::maximal()
            }
        }
    }

    /// Compare two encoded screenshot buffers (PNG, JPEG, ...).
    pub fn diff_bytes(&self, a: &[u8], b: &[u8], diff_out: &Path) -> VisualDiffResult {
        let decode = |bytes: &[u8], label: &str| {
            image::load_from_memory(bytes)
                .map(|img| img.to_rgba8())
                .map_err(|source| CoverageError::ImageIo {
                    path: PathBuf::from(label),
                    source,
                })
        };
        match decode(a, "<buffer a>").and_then(|img_a| Ok((img_a, decode(b, "<buffer b>")?))) {
            Ok((img_a, img_b)) => self.finish(&img_a, img_b, diff_out),
            Err(e) => {
                warn!("Visual diff treated as maximal: {}", e);
                VisualDiffResult::maximal()
            }
        }
    }

    fn finish(&self, a: &RgbaImage, b: RgbaImage, diff_out: &Path) -> VisualDiffResult {
        let (b, diff, ratio) = diff_images(a, b);

        let diff_image_path = match save(&diff, diff_out) {
            Ok(()) => Some(diff_out.to_path_buf()),
            Err(e) => {
                warn!("Could not write diff image: {}", e);
                None
            }
        };

        if self.write_triptych {
            let path = triptych_path(diff_out);
            if let Err(e) = save(&triptych(a, &b, &diff), &path) {
                warn!("Could not write triptych: {}", e);
            }
        }

        VisualDiffResult {
            diff_ratio: ratio,
            diff_image_path,
        }
    }
}

fn open_rgba(path: &Path) -> Result<RgbaImage> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| CoverageError::ImageIo {
            path: path.to_path_buf(),
            source,
        })
}

fn save(img: &RgbaImage, path: &Path) -> Result<()> {
    let to_error = |source| CoverageError::ImageIo {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| to_error(image::ImageError::IoError(e)))?;
    }
    img.save(path).map_err(to_error)
}

/// `reports/diff.png` -> `reports/diff_triptych.png`
pub fn triptych_path(diff_out: &Path) -> PathBuf {
    let stem = diff_out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "diff".to_string());
    diff_out.with_file_name(format!("{}_triptych.png", stem))
}

// ==================== Triptych ====================

/// before | after | diff, side by side under a labelled band.
pub fn triptych(before: &RgbaImage, after: &RgbaImage, diff: &RgbaImage) -> RgbaImage {
    let (w, h) = before.dimensions();
    let width = w * 3 + SEPARATOR * 2;
    let height = h + LABEL_BAND;
    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

    for (index, (panel, label)) in [(before, "BEFORE"), (after, "AFTER"), (diff, "DIFF")]
        .into_iter()
        .enumerate()
    {
        let x = index as u32 * (w + SEPARATOR);
        imageops::replace(&mut canvas, panel, x as i64, LABEL_BAND as i64);
        draw_label(&mut canvas, label, x + 6, (LABEL_BAND - GLYPH_SIZE * LABEL_SCALE) / 2);
    }

    // vertical separators
    for sep in 1..3u32 {
        let x0 = sep * w + (sep - 1) * SEPARATOR;
        fill_rect(&mut canvas, x0, 0, SEPARATOR, height, SEPARATOR_COLOR);
    }
    // line under the labels
    fill_rect(&mut canvas, 0, LABEL_BAND - 1, width, 1, SEPARATOR_COLOR);

    canvas
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    let x_end = (x + w).min(canvas.width());
    let y_end = (y + h).min(canvas.height());
    for yy in y..y_end {
        for xx in x..x_end {
            canvas.put_pixel(xx, yy, color);
        }
    }
}

fn draw_label(canvas: &mut RgbaImage, text: &str, x: u32, y: u32) {
    let advance = GLYPH_SIZE * LABEL_SCALE;
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = BASIC_FONTS.get(c) else { continue };
        let gx = x + i as u32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                // bit 0 is the leftmost column
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                fill_rect(
                    canvas,
                    gx + col * LABEL_SCALE,
                    y + row as u32 * LABEL_SCALE,
                    LABEL_SCALE,
                    LABEL_SCALE,
                    LABEL_COLOR,
                );
            }
        }
    }
}

// ==================== Baselines ====================

/// File name for a page's screenshot, derived from its URL.
pub fn snapshot_file_name(url: &str) -> String {
    format!(
        "{}.png",
        url.replace("://", "_").replace(['/', '?'], "_")
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BaselineOutcome {
    /// The current screenshot became the baseline.
    Approved { baseline: PathBuf },

    /// The current screenshot was compared with the existing baseline.
    Compared {
        result: VisualDiffResult,
        passed: bool,
    },
}

/// Compare `current` with the stored `baseline`, or approve `current` as the
/// new baseline when `update` is set or no baseline exists yet.
pub fn compare_to_baseline(
    engine: &VisualDiffEngine,
    current: &Path,
    baseline: &Path,
    diff_out: &Path,
    update: bool,
    threshold: f64,
) -> Result<BaselineOutcome> {
    if update || !baseline.exists() {
        approve(current, baseline)?;
        info!("Approved {} as baseline", baseline.display());
        return Ok(BaselineOutcome::Approved {
            baseline: baseline.to_path_buf(),
        });
    }

    let result = engine.diff_files(baseline, current, diff_out);
    let passed = result.diff_ratio <= threshold;
    if !passed {
        warn!(
            "Visual diff {:.2}% exceeds threshold {:.2}% for {}",
            result.diff_ratio * 100.0,
            threshold * 100.0,
            baseline.display()
        );
    }
    Ok(BaselineOutcome::Compared { result, passed })
}

fn approve(current: &Path, baseline: &Path) -> Result<()> {
    let to_error = |source| CoverageError::BaselineIo {
        path: baseline.to_path_buf(),
        source,
    };
    if let Some(parent) = baseline.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    if std::fs::rename(current, baseline).is_err() {
        // rename fails across filesystems
        std::fs::copy(current, baseline).map_err(to_error)?;
        std::fs::remove_file(current).map_err(to_error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    fn write(dir: &TempDir, name: &str, img: &RgbaImage) -> PathBuf {
        let path = dir.path().join(name);
        img.save(&path).unwrap();
        path
    }

    // ==================== Difference Tests ====================

    #[test]
    fn test_identical_images_have_zero_ratio() {
        let a = solid(20, 10, [10, 20, 30, 255]);
        let (diff, ratio) = difference(&a, &a.clone());
        assert_eq!(ratio, 0.0);
        assert!(diff.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_single_changed_pixel() {
        let a = solid(10, 10, [0, 0, 0, 255]);
        let mut b = a.clone();
        b.put_pixel(3, 4, Rgba([0, 1, 0, 255]));
        let (diff, ratio) = difference(&a, &b);
        assert_eq!(ratio, 0.01);
        assert_eq!(diff.get_pixel(3, 4).0, [0, 1, 0, 255]);
    }

    #[test]
    fn test_alpha_only_change_is_ignored() {
        let a = solid(4, 4, [50, 50, 50, 255]);
        let b = solid(4, 4, [50, 50, 50, 0]);
        let (_, ratio) = difference(&a, &b);
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn test_second_image_is_resampled_to_first() {
        let a = solid(8, 6, [255, 255, 255, 255]);
        let b = solid(4, 3, [0, 0, 0, 255]);
        let (aligned, diff, ratio) = diff_images(&a, b);
        assert_eq!(aligned.dimensions(), (8, 6));
        assert_eq!(diff.dimensions(), (8, 6));
        assert_eq!(ratio, 1.0);
    }

    // ==================== File Tests ====================

    #[test]
    fn test_diff_files_writes_diff_and_triptych() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.png", &solid(10, 10, [0, 0, 0, 255]));
        let b = write(&dir, "b.png", &solid(10, 10, [0, 0, 0, 255]));
        let out = dir.path().join("out").join("diff.png");

        let result = VisualDiffEngine::new(true).diff_files(&a, &b, &out);
        assert_eq!(result.diff_ratio, 0.0);
        assert_eq!(result.diff_image_path.as_deref(), Some(out.as_path()));
        assert!(out.exists());

        let triptych = image::open(triptych_path(&out)).unwrap();
        assert_eq!(triptych.width(), 10 * 3 + SEPARATOR * 2);
        assert_eq!(triptych.height(), 10 + LABEL_BAND);
    }

    #[test]
    fn test_missing_file_is_maximal_diff() {
        let dir = TempDir::new().unwrap();
        let b = write(&dir, "b.png", &solid(10, 10, [0, 0, 0, 255]));
        let result = VisualDiffEngine::default().diff_files(
            &dir.path().join("missing.png"),
            &b,
            &dir.path().join("diff.png"),
        );
        assert_eq!(result, VisualDiffResult::maximal());
    }

    #[test]
    fn test_corrupt_bytes_are_maximal_diff() {
        let dir = TempDir::new().unwrap();
        let result = VisualDiffEngine::default().diff_bytes(
            b"not an image",
            b"also not",
            &dir.path().join("diff.png"),
        );
        assert_eq!(result.diff_ratio, 1.0);
    }

    #[test]
    fn test_diff_bytes_png() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.png", &solid(6, 6, [9, 9, 9, 255]));
        let bytes = std::fs::read(&path).unwrap();
        let result =
            VisualDiffEngine::default().diff_bytes(&bytes, &bytes, &dir.path().join("d.png"));
        assert_eq!(result.diff_ratio, 0.0);
    }

    // ==================== Triptych Tests ====================

    #[test]
    fn test_triptych_layout() {
        let before = solid(5, 5, [255, 0, 0, 255]);
        let after = solid(5, 5, [0, 255, 0, 255]);
        let diff = solid(5, 5, [0, 0, 255, 255]);
        let canvas = triptych(&before, &after, &diff);

        assert_eq!(canvas.dimensions(), (5 * 3 + SEPARATOR * 2, 5 + LABEL_BAND));
        assert_eq!(canvas.get_pixel(0, LABEL_BAND).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(5, LABEL_BAND).0, SEPARATOR_COLOR.0);
        assert_eq!(canvas.get_pixel(5 + SEPARATOR, LABEL_BAND).0, [0, 255, 0, 255]);
        assert_eq!(
            canvas.get_pixel(2 * (5 + SEPARATOR), LABEL_BAND).0,
            [0, 0, 255, 255]
        );
    }

    #[test]
    fn test_labels_are_drawn() {
        let img = solid(40, 10, [255, 255, 255, 255]);
        let canvas = triptych(&img, &img, &img);
        let band_has_ink = (0..LABEL_BAND - 1)
            .flat_map(|y| (0..40).map(move |x| (x, y)))
            .any(|(x, y)| canvas.get_pixel(x, y).0 == LABEL_COLOR.0);
        assert!(band_has_ink);
    }

    #[test]
    fn test_label_glyph_matches_font() {
        let img = solid(120, 10, [255, 255, 255, 255]);
        let canvas = triptych(&img, &img, &img);
        let rows = BASIC_FONTS.get('B').unwrap();
        let (x0, y0) = (6, (LABEL_BAND - GLYPH_SIZE * LABEL_SCALE) / 2);

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                let inked = (bits >> col) & 1 == 1;
                let px = canvas.get_pixel(x0 + col * LABEL_SCALE, y0 + row as u32 * LABEL_SCALE);
                assert_eq!(px.0 == LABEL_COLOR.0, inked, "row {} col {}", row, col);
            }
        }
    }

    #[test]
    fn test_triptych_path() {
        assert_eq!(
            triptych_path(Path::new("reports/visual_diffs/home.png")),
            PathBuf::from("reports/visual_diffs/home_triptych.png")
        );
    }

    // ==================== Baseline Tests ====================

    #[test]
    fn test_snapshot_file_name() {
        assert_eq!(
            snapshot_file_name("https://app.example.com/settings?tab=1"),
            "https_app.example.com_settings_tab=1.png"
        );
    }

    #[test]
    fn test_missing_baseline_is_approved() {
        let dir = TempDir::new().unwrap();
        let current = write(&dir, "current.png", &solid(4, 4, [1, 2, 3, 255]));
        let baseline = dir.path().join("snapshots").join("page.png");

        let outcome = compare_to_baseline(
            &VisualDiffEngine::default(),
            &current,
            &baseline,
            &dir.path().join("diff.png"),
            false,
            0.02,
        )
        .unwrap();

        assert_eq!(
            outcome,
            BaselineOutcome::Approved {
                baseline: baseline.clone()
            }
        );
        assert!(baseline.exists());
        assert!(!current.exists());
    }

    #[test]
    fn test_existing_baseline_is_compared() {
        let dir = TempDir::new().unwrap();
        let baseline = write(&dir, "baseline.png", &solid(10, 10, [0, 0, 0, 255]));
        let mut changed = solid(10, 10, [0, 0, 0, 255]);
        for x in 0..10 {
            changed.put_pixel(x, 0, Rgba([255, 255, 255, 255]));
        }
        let current = write(&dir, "current.png", &changed);

        let outcome = compare_to_baseline(
            &VisualDiffEngine::default(),
            &current,
            &baseline,
            &dir.path().join("diff.png"),
            false,
            0.02,
        )
        .unwrap();

        match outcome {
            BaselineOutcome::Compared { result, passed } => {
                assert_eq!(result.diff_ratio, 0.1);
                assert!(!passed);
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_update_replaces_baseline() {
        let dir = TempDir::new().unwrap();
        let baseline = write(&dir, "baseline.png", &solid(4, 4, [0, 0, 0, 255]));
        let current = write(&dir, "current.png", &solid(4, 4, [200, 0, 0, 255]));

        let outcome = compare_to_baseline(
            &VisualDiffEngine::default(),
            &current,
            &baseline,
            &dir.path().join("diff.png"),
            true,
            0.02,
        )
        .unwrap();

        assert!(matches!(outcome, BaselineOutcome::Approved { .. }));
        let stored = image::open(&baseline).unwrap().to_rgba8();
        assert_eq!(stored.get_pixel(0, 0).0, [200, 0, 0, 255]);
    }
}
