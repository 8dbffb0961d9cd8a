//! Background execution of batches.
//!
//! A [`BatchWorker`] runs at most one batch at a time on a spawned task and
//! reports back over a channel, so the caller's own loop stays free and only
//! ever touches the outcomes once the `Completed` event arrives.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};
use uuid::Uuid;

use crate::batch::{batch_convert, BatchSummary};
use crate::category::MediaCategory;
use crate::convert::ConverterRegistry;
use crate::error::{FileConError, Result};
use crate::options::ConversionOptions;

/// One batch to run
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub category: MediaCategory,
    pub files: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub options: ConversionOptions,
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Percentage of the batch done, sent after each file
    Progress(f64),
    /// Sent once, after the last file
    Completed(BatchSummary),
}

/// Clears the busy flag when the batch task ends, however it ends
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct BatchWorker {
    registry: Arc<ConverterRegistry>,
    busy: Arc<AtomicBool>,
}

impl BatchWorker {
    pub fn new(registry: Arc<ConverterRegistry>) -> Self {
        Self {
            registry,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a batch is currently running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start `request` in the background. Must be called inside a Tokio runtime.
    ///
    /// Fails without starting anything when the request has no files, when
    /// its output directory does not exist, or while another batch runs.
    pub fn submit(&self, request: BatchRequest) -> Result<UnboundedReceiver<BatchEvent>> {
        if request.files.is_empty() {
            return Err(FileConError::NoFiles);
        }
        if !request.output_dir.is_dir() {
            return Err(FileConError::OutputDirMissing(request.output_dir));
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(FileConError::BatchInProgress);
        }

        let guard = BusyGuard(Arc::clone(&self.busy));
        let converter = self.registry.converter(request.category);
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        info!(
            "Submitting batch {} ({}, {} file(s))",
            id,
            request.category,
            request.files.len()
        );

        tokio::spawn(async move {
            let started_at = Utc::now();
            let progress_tx = tx.clone();
            let sink = move |fraction: f64| {
                // A closed receiver only means the caller stopped listening
                let _ = progress_tx.send(BatchEvent::Progress(fraction));
            };

            let outcomes = batch_convert(
                converter,
                &request.files,
                &request.output_dir,
                Arc::new(request.options),
                Some(&sink),
            )
            .await;

            let summary = BatchSummary {
                id,
                category: request.category,
                output_dir: request.output_dir,
                started_at,
                finished_at: Utc::now(),
                outcomes,
            };

            // Free the worker before announcing completion so the caller may resubmit at once
            drop(guard);
            if tx.send(BatchEvent::Completed(summary)).is_err() {
                debug!("Batch {} finished with nobody listening", id);
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::MockConverter;
    use tempfile::tempdir;

    fn registry_with_images(mock: MockConverter) -> Arc<ConverterRegistry> {
        let images = Arc::new(mock);
        Arc::new(ConverterRegistry::with_converters(
            images.clone(),
            images.clone(),
            images.clone(),
            images,
        ))
    }

    fn ok_mock() -> MockConverter {
        let mut mock = MockConverter::new();
        mock.expect_category().return_const(MediaCategory::Images);
        mock.expect_convert().returning(|_, _, _| Ok(()));
        mock
    }

    fn request(output_dir: PathBuf, files: &[&str]) -> BatchRequest {
        BatchRequest {
            category: MediaCategory::Images,
            files: files.iter().map(PathBuf::from).collect(),
            output_dir,
            options: ConversionOptions::new(),
        }
    }

    #[tokio::test]
    async fn test_rejects_empty_batch() {
        let dir = tempdir().unwrap();
        let worker = BatchWorker::new(registry_with_images(ok_mock()));

        let result = worker.submit(request(dir.path().to_path_buf(), &[]));
        assert!(matches!(result, Err(FileConError::NoFiles)));
        assert!(!worker.is_busy());
    }

    #[tokio::test]
    async fn test_rejects_missing_output_dir() {
        let dir = tempdir().unwrap();
        let worker = BatchWorker::new(registry_with_images(ok_mock()));

        let result = worker.submit(request(dir.path().join("nope"), &["a.png"]));
        assert!(matches!(result, Err(FileConError::OutputDirMissing(_))));
        assert!(!worker.is_busy());
    }

    #[tokio::test]
    async fn test_events_end_with_completion() {
        let dir = tempdir().unwrap();
        let worker = BatchWorker::new(registry_with_images(ok_mock()));

        let mut rx = worker
            .submit(request(dir.path().to_path_buf(), &["a.png", "b.png"]))
            .unwrap();

        let mut progress = Vec::new();
        let mut summary = None;
        while let Some(event) = rx.recv().await {
            match event {
                BatchEvent::Progress(value) => progress.push(value),
                BatchEvent::Completed(done) => summary = Some(done),
            }
        }

        assert_eq!(progress, vec![50.0, 100.0]);
        let summary = summary.expect("completion event");
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.succeeded(), 2);
        assert!(!worker.is_busy());
    }
}
