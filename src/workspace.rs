//! On-disk layout for uploads and the artifacts derived from them.
//!
//! ```text
//! <root>/uploads/receipt1.jpg            source image, never modified
//! <root>/derived/receipt1_cropped.jpg    cropped and downscaled working copy
//! <root>/overlays/receipt1_overlay.jpg   flat-region overlay
//! <root>/reports/...                     versioned reports, see ReportStore
//! ```

use std::{
    fs,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use log::info;

use crate::{
    config::{CROPPED_SUFFIX, OVERLAY_SUFFIX},
    error::{ForensicsError, Result},
    report::store::ReportStore,
};

#[derive(Debug, Clone)]
pub struct Workspace {
    pub uploads: PathBuf,
    pub derived: PathBuf,
    pub overlays: PathBuf,
    pub reports: PathBuf,
}

impl Workspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            uploads: root.join("uploads"),
            derived: root.join("derived"),
            overlays: root.join("overlays"),
            reports: root.join("reports"),
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.uploads, &self.derived, &self.overlays, &self.reports] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn report_store(&self) -> ReportStore {
        ReportStore::new(&self.reports)
    }

    pub fn upload_path(&self, filename: &str) -> Result<PathBuf> {
        Ok(self.uploads.join(checked_name(filename)?))
    }

    pub fn derived_path(&self, filename: &str) -> Result<PathBuf> {
        Ok(self.derived.join(cropped_name(checked_name(filename)?)))
    }

    pub fn overlay_path(&self, filename: &str) -> Result<PathBuf> {
        Ok(self.overlays.join(overlay_name(checked_name(filename)?)))
    }

    /// Copies `bytes` into the upload directory under `filename`.
    pub fn store_upload(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.upload_path(filename)?;
        fs::create_dir_all(&self.uploads)?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn list_uploads(&self) -> Result<Vec<PathBuf>> {
        list_regular_files(&self.uploads)
    }

    /// Removes an upload together with its cropped copy and overlay. Fails
    /// with `NotFound` if the upload itself does not exist; missing derived
    /// artifacts are ignored.
    pub fn delete_image(&self, filename: &str) -> Result<()> {
        fs::remove_file(self.upload_path(filename)?)?;

        for artifact in [self.derived_path(filename)?, self.overlay_path(filename)?] {
            match fs::remove_file(&artifact) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }

        info!("deleted {} and its derived artifacts", filename);
        Ok(())
    }
}

fn checked_name(filename: &str) -> Result<&str> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(filename),
        _ => Err(ForensicsError::InvalidParameter(format!(
            "not a plain file name: {filename:?}"
        ))),
    }
}

/// `<stem><suffix>.<ext>`, or `<stem><suffix>` when there is no extension.
pub fn derived_name(filename: &str, suffix: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());

    match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    }
}

pub fn overlay_name(filename: &str) -> String {
    derived_name(filename, OVERLAY_SUFFIX)
}

pub fn cropped_name(filename: &str) -> String {
    derived_name(filename, CROPPED_SUFFIX)
}

/// Regular files directly inside `dir`, ordered by file name so that repeated
/// listings of the same directory agree.
pub fn list_regular_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
