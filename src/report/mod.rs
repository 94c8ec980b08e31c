pub mod store;
pub mod visualization;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ForensicFinding, error::Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatPatchOverlay {
    pub suspicious_flat_regions: bool,
    pub overlay_image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicReportEntry {
    pub filename: String,
    /// Set from metadata anomalies only. Edge and flat-region evidence is
    /// carried for review but does not change the verdict.
    pub flagged: bool,
    pub findings: ForensicFinding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_patch_overlay: Option<FlatPatchOverlay>,
}

impl ForensicReportEntry {
    pub fn new(filename: impl Into<String>, findings: ForensicFinding) -> Self {
        Self {
            filename: filename.into(),
            flagged: findings.anomalies.any(),
            findings,
            flat_patch_overlay: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForensicReport {
    pub reports: Vec<ForensicReportEntry>,
}

impl ForensicReport {
    /// Attaches overlay links to the entries whose filename has one. Entries
    /// without a matching overlay keep whatever they already carried.
    pub fn merge_overlays(self, overlays: &HashMap<String, FlatPatchOverlay>) -> Self {
        let reports = self
            .reports
            .into_iter()
            .map(|entry| match overlays.get(&entry.filename) {
                Some(overlay) => ForensicReportEntry {
                    flat_patch_overlay: Some(overlay.clone()),
                    ..entry
                },
                None => entry,
            })
            .collect();

        Self { reports }
    }

    pub fn flagged(&self) -> impl Iterator<Item = &ForensicReportEntry> {
        self.reports.iter().filter(|entry| entry.flagged)
    }

    pub fn entry(&self, filename: &str) -> Option<&ForensicReportEntry> {
        self.reports.iter().find(|entry| entry.filename == filename)
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
