//! Out-of-band text extraction.
//!
//! OCR runs independently of the forensic pipeline. A [`TextRecognizer`] turns
//! a preprocessed grayscale image into text; [`OcrQueue`] runs recognitions on
//! the rayon thread pool and keeps their status so callers can poll or wait.
//! Task results are always strings: the trimmed text on success, or an error
//! message on failure.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::Command,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use image::{GrayImage, ImageFormat, imageops::FilterType};
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ForensicsError, Result},
    image_utils::{open_image, to_gray},
};

pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<String>;
}

/// Loads the image, halves both dimensions, and converts it to grayscale.
pub fn preprocess_for_ocr<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let image = open_image(path)?;
    let width = (image.width() / 2).max(1);
    let height = (image.height() / 2).max(1);
    let small = image.resize_exact(width, height, FilterType::Triangle);
    Ok(to_gray(&small))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed(String),
    Failed(String),
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

/// Runs one recognition to completion. Never panics on bad input: decode and
/// engine failures come back as `Failed` with a readable message.
pub fn run_ocr<P: AsRef<Path>>(recognizer: &dyn TextRecognizer, path: P) -> TaskStatus {
    let path = path.as_ref();
    debug!("OCR started for {}", path.display());

    let gray = match preprocess_for_ocr(path) {
        Ok(gray) => gray,
        Err(err) => {
            warn!("OCR preprocessing failed for {}: {}", path.display(), err);
            return TaskStatus::Failed("Could not load image.".into());
        }
    };

    match recognizer.recognize(&gray) {
        Ok(text) => {
            let text = text.trim().to_string();
            info!("OCR complete for {}: {} characters", path.display(), text.len());
            TaskStatus::Completed(text)
        }
        Err(err) => TaskStatus::Failed(format!("Error during OCR: {err}")),
    }
}

/// Recognizer backed by the `tesseract` command-line program. Each call blocks
/// on the subprocess, so inside an [`OcrQueue`] it holds a rayon worker for the
/// whole recognition.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: Option<String>,
}

impl TesseractCli {
    pub fn new<P: Into<PathBuf>>(binary: P) -> Self {
        Self {
            binary: binary.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &GrayImage) -> Result<String> {
        let input = tempfile::Builder::new().suffix(".png").tempfile()?;
        image.save_with_format(input.path(), ImageFormat::Png)?;

        let mut command = Command::new(&self.binary);
        command.arg(input.path()).arg("stdout");
        if let Some(ref language) = self.language {
            command.arg("-l").arg(language);
        }

        let output = command.output().map_err(|err| {
            ForensicsError::Ocr(format!("failed to run {}: {}", self.binary.display(), err))
        })?;
        if !output.status.success() {
            return Err(ForensicsError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub type TaskId = u64;

struct TaskTable {
    tasks: Mutex<HashMap<TaskId, TaskStatus>>,
    finished: Condvar,
}

pub struct OcrQueue {
    recognizer: Arc<dyn TextRecognizer>,
    table: Arc<TaskTable>,
    next_id: AtomicU64,
}

impl OcrQueue {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer,
            table: Arc::new(TaskTable {
                tasks: Mutex::new(HashMap::new()),
                finished: Condvar::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queues recognition of the image at `path` and returns immediately.
    pub fn submit<P: Into<PathBuf>>(&self, path: P) -> TaskId {
        let path = path.into();
        let task_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.table.tasks.lock().insert(task_id, TaskStatus::Pending);
        info!("OCR task {} queued for {}", task_id, path.display());

        let recognizer = Arc::clone(&self.recognizer);
        let table = Arc::clone(&self.table);
        rayon::spawn(move || {
            let status = run_ocr(recognizer.as_ref(), &path);
            table.tasks.lock().insert(task_id, status);
            table.finished.notify_all();
        });

        task_id
    }

    pub fn status(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.table.tasks.lock().get(&task_id).cloned()
    }

    /// Removes and returns a finished task's status. Pending tasks are left in
    /// place and yield `None`, as do unknown ids.
    pub fn take(&self, task_id: TaskId) -> Option<TaskStatus> {
        let mut tasks = self.table.tasks.lock();
        if tasks.get(&task_id)?.is_finished() {
            tasks.remove(&task_id)
        } else {
            None
        }
    }

    /// Number of tasks whose status is still held, finished or not.
    pub fn len(&self) -> usize {
        self.table.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks until the task finishes or `timeout` elapses, returning the
    /// latest status. `None` for unknown task ids.
    pub fn wait(&self, task_id: TaskId, timeout: Duration) -> Option<TaskStatus> {
        let deadline = Instant::now() + timeout;
        let mut tasks = self.table.tasks.lock();

        loop {
            let status = tasks.get(&task_id)?.clone();
            if status.is_finished() {
                return Some(status);
            }
            if self
                .table
                .finished
                .wait_until(&mut tasks, deadline)
                .timed_out()
            {
                return tasks.get(&task_id).cloned();
            }
        }
    }
}
