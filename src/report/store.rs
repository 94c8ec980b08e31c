//! Versioned report persistence.
//!
//! Each analysis run is written to its own file, `runs/report-<id>.json`, with
//! a monotonically increasing run id. A small `current` file names the run id
//! of the latest published report and is replaced atomically (write to a temp
//! file in the same directory, then rename), so readers always see either the
//! previous or the new report, never a partial one.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use log::info;
use tempfile::NamedTempFile;

use crate::{error::Result, report::ForensicReport};

pub type RunId = u64;

const RUNS_DIR: &str = "runs";
const CURRENT_POINTER: &str = "current";
const RUN_PREFIX: &str = "report-";
const RUN_EXTENSION: &str = ".json";

pub struct ReportStore {
    root: PathBuf,
}

impl ReportStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_path(&self, run_id: RunId) -> PathBuf {
        self.root
            .join(RUNS_DIR)
            .join(format!("{RUN_PREFIX}{run_id:06}{RUN_EXTENSION}"))
    }

    /// Writes `report` as a new run and points `current` at it.
    pub fn publish(&self, report: &ForensicReport) -> Result<RunId> {
        let runs = self.root.join(RUNS_DIR);
        fs::create_dir_all(&runs)?;

        let run_id = self.claim_next_run()?;
        write_atomic(&self.run_path(run_id), report.to_json()?.as_bytes())?;
        write_atomic(&self.root.join(CURRENT_POINTER), run_id.to_string().as_bytes())?;

        info!(
            "published report run {} with {} entries",
            run_id,
            report.reports.len()
        );
        Ok(run_id)
    }

    /// Reserves the next free run id by creating its file exclusively, so two
    /// publishers never share an id.
    fn claim_next_run(&self) -> Result<RunId> {
        let mut run_id = self.list_runs()?.last().map_or(1, |last| last + 1);

        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.run_path(run_id))
            {
                Ok(_) => return Ok(run_id),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => run_id += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn current_run(&self) -> Result<Option<RunId>> {
        match fs::read_to_string(self.root.join(CURRENT_POINTER)) {
            Ok(text) => Ok(text.trim().parse().ok()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// The latest published report, or `None` before the first run.
    pub fn load_current(&self) -> Result<Option<ForensicReport>> {
        match self.current_run()? {
            Some(run_id) => self.load(run_id).map(Some),
            None => Ok(None),
        }
    }

    pub fn load(&self, run_id: RunId) -> Result<ForensicReport> {
        let text = fs::read_to_string(self.run_path(run_id))?;
        ForensicReport::from_json(&text)
    }

    /// Run ids present on disk, ascending.
    pub fn list_runs(&self) -> Result<Vec<RunId>> {
        let entries = match fs::read_dir(self.root.join(RUNS_DIR)) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut runs = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(run_id) = name
                .strip_prefix(RUN_PREFIX)
                .and_then(|rest| rest.strip_suffix(RUN_EXTENSION))
                .and_then(|digits| digits.parse::<RunId>().ok())
            {
                runs.push(run_id);
            }
        }

        runs.sort_unstable();
        Ok(runs)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
