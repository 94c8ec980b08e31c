//! Tunable parameters for the forensic pipeline.
//!
//! Every threshold and naming rule the detectors depend on lives in
//! [`ForensicsConfig`], which is passed in at construction. The struct can be
//! built programmatically or loaded from JSON; missing keys fall back to the
//! defaults.

use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{ForensicsError, Result};

/// Hysteresis thresholds for Canny edge detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeThresholds {
    pub low: f32,
    pub high: f32,
}

impl EdgeThresholds {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Thresholds used to isolate the document outline before cropping.
    pub const CROP: EdgeThresholds = EdgeThresholds::new(30.0, 150.0);

    /// Thresholds used for the coarse edge profile.
    pub const PROFILE: EdgeThresholds = EdgeThresholds::new(100.0, 200.0);

    fn validate(&self, name: &str) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low < 0.0 {
            return Err(ForensicsError::InvalidParameter(format!(
                "{name} thresholds must be finite and non-negative"
            )));
        }
        if self.low > self.high {
            return Err(ForensicsError::InvalidParameter(format!(
                "{name} low threshold {} exceeds high threshold {}",
                self.low, self.high
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForensicsConfig {
    /// Edge length of the square tiles examined by the flat-region scan.
    pub patch_size: u32,
    /// Tiles with a population standard deviation strictly below this are flat.
    pub std_threshold: f64,
    pub crop_edge_thresholds: EdgeThresholds,
    pub edge_profile_thresholds: EdgeThresholds,
    /// File-stem suffixes marking derived artifacts that must not be re-scanned.
    pub reserved_suffixes: BTreeSet<String>,
    /// Working copies larger than this on their longest side are downscaled.
    pub max_dimension: u32,
    /// Prepended to overlay filenames to form `overlay_image_url`.
    pub overlay_url_prefix: String,
}

pub const OVERLAY_SUFFIX: &str = "_overlay";
pub const CROPPED_SUFFIX: &str = "_cropped";

impl Default for ForensicsConfig {
    fn default() -> Self {
        Self {
            patch_size: 30,
            std_threshold: 3.0,
            crop_edge_thresholds: EdgeThresholds::CROP,
            edge_profile_thresholds: EdgeThresholds::PROFILE,
            reserved_suffixes: [OVERLAY_SUFFIX, "-overlay", CROPPED_SUFFIX, "-cropped-debug"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_dimension: 1600,
            overlay_url_prefix: "/overlays/".into(),
        }
    }
}

impl ForensicsConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_patch_size(mut self, patch_size: u32) -> Self {
        self.patch_size = patch_size;
        self
    }

    pub fn with_std_threshold(mut self, std_threshold: f64) -> Self {
        self.std_threshold = std_threshold;
        self
    }

    pub fn with_crop_edge_thresholds(mut self, thresholds: EdgeThresholds) -> Self {
        self.crop_edge_thresholds = thresholds;
        self
    }

    pub fn with_edge_profile_thresholds(mut self, thresholds: EdgeThresholds) -> Self {
        self.edge_profile_thresholds = thresholds;
        self
    }

    pub fn with_reserved_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.reserved_suffixes.insert(suffix.into());
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_overlay_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.overlay_url_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.patch_size == 0 {
            return Err(ForensicsError::InvalidParameter(
                "patch_size must be at least 1".into(),
            ));
        }
        if !self.std_threshold.is_finite() || self.std_threshold < 0.0 {
            return Err(ForensicsError::InvalidParameter(format!(
                "std_threshold must be finite and non-negative, got {}",
                self.std_threshold
            )));
        }
        if self.max_dimension == 0 {
            return Err(ForensicsError::InvalidParameter(
                "max_dimension must be at least 1".into(),
            ));
        }
        self.crop_edge_thresholds.validate("crop edge")?;
        self.edge_profile_thresholds.validate("edge profile")?;
        Ok(())
    }

    /// True when the file stem ends with one of the reserved suffixes, i.e.
    /// the file is a byproduct of an earlier run.
    pub fn is_derived_artifact<P: AsRef<Path>>(&self, path: P) -> bool {
        has_reserved_suffix(path.as_ref(), &self.reserved_suffixes)
    }
}

/// True when the file stem of `path` ends with any non-empty suffix in
/// `suffixes`.
pub fn has_reserved_suffix(path: &Path, suffixes: &BTreeSet<String>) -> bool {
    let Some(stem) = path.file_stem() else {
        return false;
    };
    let stem = stem.to_string_lossy();
    suffixes
        .iter()
        .any(|suffix| !suffix.is_empty() && stem.ends_with(suffix.as_str()))
}
