use std::{collections::HashMap, path::Path};

use image::DynamicImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    analysis::{edge_profile::EdgeProfileAnalyzer, flat_region::FlatRegionScanner},
    detection::region::RegionExtractor,
    error::{ForensicsError, Result},
    metadata::{anomalies::derive_anomalies, exif::MetadataInspector},
    image_utils::open_image,
    report::{ForensicReport, ForensicReportEntry},
    workspace::list_regular_files,
};

pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod image_utils;
pub mod metadata;
pub mod ocr;
pub mod pipeline;
pub mod report;
pub mod workspace;

pub use config::{EdgeThresholds, ForensicsConfig};

/// Runs the per-image detectors with one shared configuration.
pub struct ForensicsAnalyzer {
    config: ForensicsConfig,
}

impl ForensicsAnalyzer {
    pub fn new() -> Self {
        Self {
            config: ForensicsConfig::default(),
        }
    }

    pub fn with_config(config: ForensicsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForensicsConfig {
        &self.config
    }

    pub fn region_extractor(&self) -> RegionExtractor {
        RegionExtractor::new(self.config.crop_edge_thresholds)
    }

    pub fn flat_region_scanner(&self) -> FlatRegionScanner {
        FlatRegionScanner::from_config(&self.config)
    }

    pub fn edge_analyzer(&self) -> EdgeProfileAnalyzer {
        EdgeProfileAnalyzer::new(self.config.edge_profile_thresholds)
    }

    pub fn extract_region(&self, image: &DynamicImage) -> Result<DynamicImage> {
        self.region_extractor().extract(image)
    }

    pub fn scan_flat_regions<P: AsRef<Path>>(&self, path: P) -> Result<Vec<FlatPatchRecord>> {
        self.flat_region_scanner().scan_file(path)
    }

    pub fn inspect_metadata<P: AsRef<Path>>(&self, path: P) -> MetadataRecord {
        MetadataInspector::inspect(path)
    }

    pub fn analyze_edges<P: AsRef<Path>>(&self, path: P) -> EdgeProfile {
        self.edge_analyzer().analyze_file(path)
    }

    /// Metadata and edge findings for one file, decoded from disk.
    pub fn build_finding<P: AsRef<Path>>(&self, path: P) -> ForensicFinding {
        let path = path.as_ref();
        let image = open_image(path);
        self.finding_from(path, image.as_ref())
    }

    /// Metadata is always read from `source`; the edge profile is computed on
    /// `working`, which may be a cropped derivative of it.
    pub fn finding_from(
        &self,
        source: &Path,
        working: std::result::Result<&DynamicImage, &ForensicsError>,
    ) -> ForensicFinding {
        let metadata = self.inspect_metadata(source);
        let edges = match working {
            Ok(image) => self.edge_analyzer().analyze(image),
            Err(err) => EdgeProfile::failed(err.to_string()),
        };
        let anomalies = derive_anomalies(&metadata);

        ForensicFinding {
            metadata,
            edges,
            anomalies,
        }
    }

    /// One entry per regular file in `directory`, in listing order. Files that
    /// fail to decode still produce an entry carrying error payloads.
    pub fn build_report<P: AsRef<Path>>(&self, directory: P) -> Result<ForensicReport> {
        let files = list_regular_files(directory.as_ref())?;
        let mut reports = Vec::with_capacity(files.len());

        for path in files {
            let filename = file_name_of(&path);
            debug!("building finding for {}", filename);
            let finding = self.build_finding(&path);
            if let EdgeProfile::Failed(ref payload) = finding.edges {
                warn!("{}: {}", filename, payload.error);
            }
            reports.push(ForensicReportEntry::new(filename, finding));
        }

        Ok(ForensicReport { reports })
    }

    /// Builds the base report, then scans every file for flat regions and
    /// merges the resulting overlay links by filename.
    pub fn build_report_with_overlays<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        directory: P,
        overlay_dir: Q,
    ) -> Result<ForensicReport> {
        let base = self.build_report(&directory)?;
        let scanner = self.flat_region_scanner();
        let mut overlays = HashMap::new();

        for path in list_regular_files(directory.as_ref())? {
            match scanner.write_overlay(&path, overlay_dir.as_ref()) {
                Ok(Some(overlay)) => {
                    overlays.insert(file_name_of(&path), overlay);
                }
                Ok(None) => {}
                Err(err) => warn!("flat-region scan skipped for {}: {}", path.display(), err),
            }
        }

        Ok(base.merge_overlays(&overlays))
    }
}

impl Default for ForensicsAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Axis-aligned rectangle in pixel coordinates; covers `x..x + width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A tile whose intensity standard deviation fell below the flatness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatPatchRecord {
    pub x: u32,
    pub y: u32,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorPayload {
    pub error: String,
}

/// Tag name to value, in the order the tags appear in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataRecord {
    Failed(ErrorPayload),
    Tags(Map<String, Value>),
}

impl MetadataRecord {
    pub fn empty() -> Self {
        MetadataRecord::Tags(Map::new())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        MetadataRecord::Failed(ErrorPayload {
            error: message.into(),
        })
    }

    pub fn get(&self, tag: &str) -> Option<&Value> {
        match self {
            MetadataRecord::Tags(tags) => tags.get(tag),
            MetadataRecord::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            MetadataRecord::Failed(payload) => Some(&payload.error),
            MetadataRecord::Tags(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MetadataRecord::Tags(tags) if tags.is_empty())
    }
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnomalyFlags {
    pub missing_datetime: bool,
    pub strange_orientation: bool,
}

impl AnomalyFlags {
    pub fn any(&self) -> bool {
        self.missing_datetime || self.strange_orientation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeProfile {
    Computed {
        edges_detected: bool,
        /// `(height, width)` of the edge map.
        shape: (u32, u32),
    },
    Failed(ErrorPayload),
}

impl EdgeProfile {
    pub fn failed(message: impl Into<String>) -> Self {
        EdgeProfile::Failed(ErrorPayload {
            error: message.into(),
        })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            EdgeProfile::Failed(payload) => Some(&payload.error),
            EdgeProfile::Computed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicFinding {
    pub metadata: MetadataRecord,
    pub edges: EdgeProfile,
    pub anomalies: AnomalyFlags,
}
