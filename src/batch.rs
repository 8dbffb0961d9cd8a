//! Batch orchestration.
//!
//! [`batch_convert`] runs one converter over an ordered list of files. Each
//! file is converted on its own, in order, and always yields exactly one
//! [`ConversionOutcome`], whether the converter succeeds, fails or panics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::category::MediaCategory;
use crate::convert::Converter;
use crate::options::ConversionOptions;

pub const SUCCESS_MESSAGE: &str = "Success";

/// Receives the completed percentage of a batch after each file
pub type ProgressSink<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Result of converting one file of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Source path as it was submitted
    pub file: PathBuf,
    /// Where the converted file was (or would have been) written
    pub output: PathBuf,
    pub success: bool,
    /// `"Success"` or the failure reason
    pub message: String,
}

impl ConversionOutcome {
    fn succeeded(file: PathBuf, output: PathBuf) -> Self {
        Self {
            file,
            output,
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    fn failed<S: Into<String>>(file: PathBuf, output: PathBuf, message: S) -> Self {
        Self {
            file,
            output,
            success: false,
            message: message.into(),
        }
    }
}

/// Everything the caller gets back once a batch has finished
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub id: Uuid,
    pub category: MediaCategory,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<ConversionOutcome>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

/// `output_dir/<input stem>.<format>`, or `None` when the input has no file name
pub fn output_path_for(input: &Path, output_dir: &Path, format: &str) -> Option<PathBuf> {
    let stem = input.file_stem()?.to_string_lossy();
    Some(output_dir.join(format!("{}.{}", stem, format.to_lowercase())))
}

/// Percentage of a batch of `total` files done after file `index` (0-based)
pub fn progress_fraction(index: usize, total: usize) -> f64 {
    (index + 1) as f64 / total as f64 * 100.0
}

/// Convert `files` one after another into `output_dir`.
///
/// Returns one outcome per input, in input order. `output_dir` must exist.
/// After every file, success or not, `progress` receives the completed
/// percentage; the last value is exactly 100. An empty batch returns
/// immediately without calling `progress`.
pub async fn batch_convert(
    converter: Arc<dyn Converter>,
    files: &[PathBuf],
    output_dir: &Path,
    options: Arc<ConversionOptions>,
    progress: Option<ProgressSink<'_>>,
) -> Vec<ConversionOutcome> {
    let total = files.len();
    let mut outcomes = Vec::with_capacity(total);
    if total == 0 {
        return outcomes;
    }

    let category = converter.category();
    let format = options.target_format(category);
    info!(
        "Starting {} batch: {} file(s) -> {} into {}",
        category,
        total,
        format,
        output_dir.display()
    );

    for (index, file) in files.iter().enumerate() {
        let outcome = match output_path_for(file, output_dir, &format) {
            Some(output) => convert_one(Arc::clone(&converter), file, output, Arc::clone(&options)).await,
            None => ConversionOutcome::failed(file.clone(), output_dir.to_path_buf(), "Invalid file name"),
        };

        if outcome.success {
            info!("[{}/{}] {} -> {}", index + 1, total, file.display(), outcome.output.display());
        } else {
            warn!("[{}/{}] {} failed: {}", index + 1, total, file.display(), outcome.message);
        }
        outcomes.push(outcome);

        if let Some(sink) = progress {
            sink(progress_fraction(index, total));
        }
    }

    let succeeded = outcomes.iter().filter(|o| o.success).count();
    info!("Batch finished: {} of {} succeeded", succeeded, total);
    outcomes
}

/// Run one conversion in its own task so a panicking converter only fails this file
async fn convert_one(
    converter: Arc<dyn Converter>,
    file: &Path,
    output: PathBuf,
    options: Arc<ConversionOptions>,
) -> ConversionOutcome {
    let input = file.to_path_buf();
    let task_output = output.clone();
    let handle = tokio::spawn(async move {
        converter.convert(&input, &task_output, &options).await
    });

    match handle.await {
        Ok(Ok(())) => ConversionOutcome::succeeded(file.to_path_buf(), output),
        Ok(Err(e)) => ConversionOutcome::failed(file.to_path_buf(), output, e.to_string()),
        Err(e) => ConversionOutcome::failed(file.to_path_buf(), output, join_error_message(e)),
    }
}

fn join_error_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => format!("Converter panicked: {}", panic_text(payload.as_ref())),
        Err(err) => format!("Converter task failed: {}", err),
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
