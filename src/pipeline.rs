//! Directory-level analysis run.
//!
//! For every upload, in listing order:
//!
//! 1. decode and crop to the document region (falls back to the full frame
//!    when no outline is found), downscale to `max_dimension`, and save the
//!    result as the derived working copy
//! 2. metadata from the untouched upload, edge profile from the working copy
//! 3. flat-region scan of the working copy, writing an overlay when any tile
//!    is flagged
//!
//! The base report and the overlay links are then merged by filename and
//! published as a new run in the report store. Images are processed one at a
//! time; a failure in one file is recorded in its entry and never aborts the
//! run.

use std::{collections::HashMap, path::Path};

use image::{DynamicImage, ImageFormat};
use log::{debug, info, warn};

use crate::{
    ForensicsAnalyzer, ForensicsConfig,
    error::{ForensicsError, Result},
    file_name_of,
    image_utils::{downscale_to_fit, open_image_with_format, save_image},
    report::{FlatPatchOverlay, ForensicReport, ForensicReportEntry, store::RunId},
    workspace::Workspace,
};

pub struct Pipeline {
    analyzer: ForensicsAnalyzer,
    workspace: Workspace,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub report: ForensicReport,
}

impl RunSummary {
    pub fn flagged_count(&self) -> usize {
        self.report.flagged().count()
    }
}

impl Pipeline {
    pub fn new(workspace: Workspace, config: ForensicsConfig) -> Result<Self> {
        Ok(Self {
            analyzer: ForensicsAnalyzer::with_config(config)?,
            workspace,
        })
    }

    pub fn analyzer(&self) -> &ForensicsAnalyzer {
        &self.analyzer
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Decoded, cropped, and downscaled copy of `source`. The copy is also
    /// written to the derived directory; failing to write it only logs.
    pub fn prepare_working_copy(&self, source: &Path) -> Result<DynamicImage> {
        self.working_copy(source).map(|(image, _)| image)
    }

    fn working_copy(&self, source: &Path) -> Result<(DynamicImage, Option<ImageFormat>)> {
        let filename = file_name_of(source);
        let (image, format) = open_image_with_format(source)?;
        let config = self.analyzer.config();

        if config.is_derived_artifact(source) {
            debug!("{} is a derived artifact, analyzing as-is", filename);
            return Ok((image, format));
        }

        let cropped = match self.analyzer.extract_region(&image) {
            Ok(cropped) => cropped,
            Err(ForensicsError::NoContentFound) => {
                warn!("no document outline in {}, using full frame", filename);
                image
            }
            Err(err) => return Err(err),
        };
        let working = downscale_to_fit(cropped, config.max_dimension);

        match self.workspace.derived_path(&filename) {
            Ok(path) => {
                if let Err(err) = save_image(&working, &path, format) {
                    warn!("could not save working copy {}: {}", path.display(), err);
                }
            }
            Err(err) => warn!("no derived path for {}: {}", filename, err),
        }

        Ok((working, format))
    }

    /// Report entry for one upload plus its overlay link, if one was written.
    pub fn analyze_file(&self, source: &Path) -> (ForensicReportEntry, Option<FlatPatchOverlay>) {
        let filename = file_name_of(source);
        let working = self.working_copy(source);
        if let Err(ref err) = working {
            warn!("{}: {}", filename, err);
        }

        let finding = self
            .analyzer
            .finding_from(source, working.as_ref().map(|(image, _)| image));
        let entry = ForensicReportEntry::new(filename.clone(), finding);

        let overlay = match working {
            Ok((ref image, format)) => match self.analyzer.flat_region_scanner().write_overlay_for(
                &filename,
                image,
                format,
                &self.workspace.overlays,
            ) {
                Ok(overlay) => overlay,
                Err(err) => {
                    warn!("overlay for {} not written: {}", filename, err);
                    None
                }
            },
            Err(_) => None,
        };

        (entry, overlay)
    }

    /// Analyzes every upload and publishes the merged report.
    pub fn run(&self) -> Result<RunSummary> {
        self.workspace.ensure_dirs()?;
        let files = self.workspace.list_uploads()?;
        info!("analyzing {} file(s) in {}", files.len(), self.workspace.uploads.display());

        let mut reports = Vec::with_capacity(files.len());
        let mut overlays = HashMap::new();

        for path in &files {
            let (entry, overlay) = self.analyze_file(path);
            if let Some(overlay) = overlay {
                overlays.insert(entry.filename.clone(), overlay);
            }
            reports.push(entry);
        }

        let report = ForensicReport { reports }.merge_overlays(&overlays);
        let run_id = self.workspace.report_store().publish(&report)?;

        Ok(RunSummary { run_id, report })
    }

    pub fn current_report(&self) -> Result<Option<ForensicReport>> {
        self.workspace.report_store().load_current()
    }
}
