//! Flat-region scanning.
//!
//! Cloned or digitally erased areas tend to be unnaturally uniform. The scanner
//! walks non-overlapping square tiles in row-major order and reports every tile
//! whose population standard deviation of grayscale intensity is below the
//! threshold. Trailing tiles narrower than the patch size are ignored.

use std::{
    collections::BTreeSet,
    fs,
    path::Path,
};

use image::{DynamicImage, ImageFormat, RgbImage};
use log::{debug, info};
use ndarray::s;
use statrs::statistics::Statistics;

use crate::{
    FlatPatchRecord, ForensicsConfig,
    config::has_reserved_suffix,
    error::{ForensicsError, Result},
    file_name_of,
    image_utils::{gray_to_array, open_image, open_image_with_format, save_image, to_gray},
    report::{FlatPatchOverlay, visualization::Visualizer},
    workspace::overlay_name,
};

pub struct FlatRegionScanner {
    patch_size: u32,
    std_threshold: f64,
    reserved_suffixes: BTreeSet<String>,
    overlay_url_prefix: String,
}

impl FlatRegionScanner {
    pub fn new(patch_size: u32, std_threshold: f64) -> Result<Self> {
        if patch_size == 0 {
            return Err(ForensicsError::InvalidParameter(
                "Patch size must be at least 1".into(),
            ));
        }
        if !std_threshold.is_finite() || std_threshold < 0.0 {
            return Err(ForensicsError::InvalidParameter(format!(
                "Standard deviation threshold must be non-negative, got {std_threshold}"
            )));
        }

        let defaults = ForensicsConfig::default();
        Ok(Self {
            patch_size,
            std_threshold,
            reserved_suffixes: defaults.reserved_suffixes,
            overlay_url_prefix: defaults.overlay_url_prefix,
        })
    }

    /// Builds a scanner from an already validated configuration.
    pub fn from_config(config: &ForensicsConfig) -> Self {
        Self {
            patch_size: config.patch_size,
            std_threshold: config.std_threshold,
            reserved_suffixes: config.reserved_suffixes.clone(),
            overlay_url_prefix: config.overlay_url_prefix.clone(),
        }
    }

    pub fn patch_size(&self) -> u32 {
        self.patch_size
    }

    pub fn std_threshold(&self) -> f64 {
        self.std_threshold
    }

    /// Flat tiles of `image`, in row-major order.
    pub fn scan(&self, image: &DynamicImage) -> Vec<FlatPatchRecord> {
        let pixels = gray_to_array(&to_gray(image));
        let (height, width) = pixels.dim();
        let size = self.patch_size as usize;
        let mut patches = Vec::new();

        if width < size || height < size {
            return patches;
        }

        for y in (0..=height - size).step_by(size) {
            for x in (0..=width - size).step_by(size) {
                let tile = pixels.slice(s![y..y + size, x..x + size]);
                let std_dev = tile.iter().population_std_dev();

                if std_dev < self.std_threshold {
                    patches.push(FlatPatchRecord {
                        x: x as u32,
                        y: y as u32,
                        std_dev,
                    });
                }
            }
        }

        patches
    }

    fn is_reserved(&self, path: &Path) -> bool {
        has_reserved_suffix(path, &self.reserved_suffixes)
    }

    /// Loads and scans the file at `path`. Files named like derived artifacts
    /// are skipped and yield no patches.
    pub fn scan_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<FlatPatchRecord>> {
        let path = path.as_ref();
        if self.is_reserved(path) {
            debug!("skipping derived artifact {}", path.display());
            return Ok(Vec::new());
        }

        let image = open_image(path)?;
        Ok(self.scan(&image))
    }

    /// Color copy of `image` with every flagged tile outlined.
    pub fn render_overlay(&self, image: &DynamicImage, patches: &[FlatPatchRecord]) -> RgbImage {
        Visualizer::new().visualize_flat_patches(&image.to_rgb8(), patches, self.patch_size)
    }

    /// Scans `source` and, when at least one flat tile is found, writes the
    /// overlay as `<stem>_overlay.<ext>` under `overlay_dir`.
    pub fn write_overlay<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        overlay_dir: Q,
    ) -> Result<Option<FlatPatchOverlay>> {
        let source = source.as_ref();
        if self.is_reserved(source) {
            debug!("skipping derived artifact {}", source.display());
            return Ok(None);
        }

        let (image, format) = open_image_with_format(source)?;
        self.write_overlay_for(&file_name_of(source), &image, format, overlay_dir)
    }

    /// Like [`write_overlay`](Self::write_overlay) for an image already in
    /// memory; `source_name` determines the overlay filename. `format` is used
    /// when that name carries no usable extension.
    pub fn write_overlay_for<Q: AsRef<Path>>(
        &self,
        source_name: &str,
        image: &DynamicImage,
        format: Option<ImageFormat>,
        overlay_dir: Q,
    ) -> Result<Option<FlatPatchOverlay>> {
        if self.is_reserved(Path::new(source_name)) {
            return Ok(None);
        }

        let patches = self.scan(image);
        if patches.is_empty() {
            return Ok(None);
        }

        let overlay_dir = overlay_dir.as_ref();
        fs::create_dir_all(overlay_dir)?;
        let name = overlay_name(source_name);
        let path = overlay_dir.join(&name);
        let overlay = DynamicImage::ImageRgb8(self.render_overlay(image, &patches));
        save_image(&overlay, &path, format)?;
        info!(
            "{} flat patch(es) in {}, overlay written to {}",
            patches.len(),
            source_name,
            path.display()
        );

        Ok(Some(FlatPatchOverlay {
            suspicious_flat_regions: !patches.is_empty(),
            overlay_image_url: format!("{}{}", self.overlay_url_prefix, name),
        }))
    }
}

impl Default for FlatRegionScanner {
    fn default() -> Self {
        Self::from_config(&ForensicsConfig::default())
    }
}
