// Single-file converters, one per media category
//
// Every converter implements the same contract: given an input path, an
// output path and the batch options, produce exactly one output file or
// return the reason it could not. Converters never panic on bad input.

pub mod audio;
pub mod document;
pub mod image;
pub mod pdf;
pub mod video;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::debug;

use crate::category::MediaCategory;
use crate::config::Config;
use crate::error::{FileConError, Result};
use crate::media::MediaProcessorFactory;
use crate::options::ConversionOptions;

pub use self::audio::AudioConverter;
pub use self::document::DocumentConverter;
pub use self::image::ImageConverter;
pub use self::video::VideoConverter;

/// Format conversion for one media category
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Converter: Send + Sync {
    /// Category this converter handles
    fn category(&self) -> MediaCategory;

    /// Convert `input_path` into `output_path`.
    ///
    /// The parent directory of `output_path` must exist. Output is staged
    /// under a temporary name and only moved to `output_path` on success, so
    /// a failed conversion never touches a file already there.
    async fn convert(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &ConversionOptions,
    ) -> Result<()>;
}

/// Factory for creating converter instances
pub struct ConverterFactory;

impl ConverterFactory {
    pub fn create_converter(category: MediaCategory, config: &Config) -> Arc<dyn Converter> {
        match category {
            MediaCategory::Images => Arc::new(ImageConverter::new()),
            MediaCategory::Audio => Arc::new(AudioConverter::new(
                MediaProcessorFactory::create_processor(config.media.clone()),
            )),
            MediaCategory::Video => Arc::new(VideoConverter::new(
                MediaProcessorFactory::create_processor(config.media.clone()),
            )),
            MediaCategory::Documents => {
                Arc::new(DocumentConverter::new(pdf::PageLayout::from(&config.documents)))
            }
        }
    }
}

/// Fixed mapping from category to converter, built once and shared by batches
pub struct ConverterRegistry {
    images: Arc<dyn Converter>,
    audio: Arc<dyn Converter>,
    video: Arc<dyn Converter>,
    documents: Arc<dyn Converter>,
}

impl ConverterRegistry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            images: ConverterFactory::create_converter(MediaCategory::Images, config),
            audio: ConverterFactory::create_converter(MediaCategory::Audio, config),
            video: ConverterFactory::create_converter(MediaCategory::Video, config),
            documents: ConverterFactory::create_converter(MediaCategory::Documents, config),
        }
    }

    /// Build a registry from explicit converters
    pub fn with_converters(
        images: Arc<dyn Converter>,
        audio: Arc<dyn Converter>,
        video: Arc<dyn Converter>,
        documents: Arc<dyn Converter>,
    ) -> Self {
        Self {
            images,
            audio,
            video,
            documents,
        }
    }

    pub fn converter(&self, category: MediaCategory) -> Arc<dyn Converter> {
        match category {
            MediaCategory::Images => Arc::clone(&self.images),
            MediaCategory::Audio => Arc::clone(&self.audio),
            MediaCategory::Video => Arc::clone(&self.video),
            MediaCategory::Documents => Arc::clone(&self.documents),
        }
    }
}

/// Fail early when the input is not a readable regular file
pub(crate) fn ensure_input(input_path: &Path) -> Result<()> {
    if input_path.is_file() {
        Ok(())
    } else {
        Err(FileConError::FileNotFound(input_path.display().to_string()))
    }
}

/// Lowercase extension of `path` including the leading dot, or `""`
pub(crate) fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Converter output written under a temporary name beside its final path.
///
/// Dropping it deletes the temporary file; [`StagedOutput::commit`] renames
/// it over the final path.
pub(crate) struct StagedOutput {
    temp: TempPath,
    target: PathBuf,
}

impl StagedOutput {
    /// Refuses an output that is the input file itself
    pub(crate) fn new(input_path: &Path, output_path: &Path) -> Result<Self> {
        if same_file(input_path, output_path) {
            return Err(FileConError::OutputIsInput(output_path.to_path_buf()));
        }

        let parent = output_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        // Keep the extension, ffmpeg picks the container from it
        let suffix = output_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let temp = tempfile::Builder::new()
            .prefix(".filecon-")
            .suffix(&suffix)
            .tempfile_in(parent)?
            .into_temp_path();
        debug!("Staging {} at {}", output_path.display(), temp.display());

        Ok(Self {
            temp,
            target: output_path.to_path_buf(),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.temp
    }

    /// Move the staged file to the final output path
    pub(crate) fn commit(self) -> Result<()> {
        self.temp
            .persist(&self.target)
            .map_err(|e| FileConError::Io(e.error))?;
        Ok(())
    }
}

/// Whether both paths resolve to the same existing file
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Run a blocking conversion step off the async runtime
pub(crate) async fn run_blocking<F, T>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| FileConError::Worker(format!("Conversion task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_registry_resolves_every_category() {
        let registry = ConverterRegistry::from_config(&Config::default());
        for category in MediaCategory::ALL {
            assert_eq!(registry.converter(category).category(), category);
        }
    }

    #[test]
    fn test_ensure_input_rejects_missing_and_directories() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ensure_input(&dir.path().join("missing.png")),
            Err(FileConError::FileNotFound(_))
        ));
        assert!(ensure_input(dir.path()).is_err());

        let file = dir.path().join("present.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(ensure_input(&file).is_ok());
    }

    #[test]
    fn test_dotted_extension() {
        assert_eq!(dotted_extension(Path::new("Report.DOCX")), ".docx");
        assert_eq!(dotted_extension(Path::new("README")), "");
    }

    #[test]
    fn test_staged_output_rejects_input_as_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("song.mp3");
        std::fs::write(&input, b"ID3").unwrap();

        let same = dir.path().join(".").join("song.mp3");
        assert!(matches!(
            StagedOutput::new(&input, &same),
            Err(FileConError::OutputIsInput(_))
        ));
        assert_eq!(std::fs::read(&input).unwrap(), b"ID3");
    }

    #[test]
    fn test_dropped_stage_leaves_existing_output_alone() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.txt");
        let output = dir.path().join("a.pdf");
        std::fs::write(&input, "x").unwrap();
        std::fs::write(&output, b"earlier").unwrap();

        let staged = StagedOutput::new(&input, &output).unwrap();
        let temp = staged.path().to_path_buf();
        assert_eq!(temp.parent(), Some(dir.path()));
        assert_eq!(temp.extension().and_then(|e| e.to_str()), Some("pdf"));
        std::fs::write(&temp, b"half").unwrap();
        drop(staged);

        assert!(!temp.exists());
        assert_eq!(std::fs::read(&output).unwrap(), b"earlier");
    }

    #[test]
    fn test_commit_replaces_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.txt");
        let output = dir.path().join("a.pdf");
        std::fs::write(&input, "x").unwrap();
        std::fs::write(&output, b"earlier").unwrap();

        let staged = StagedOutput::new(&input, &output).unwrap();
        std::fs::write(staged.path(), b"fresh").unwrap();
        staged.commit().unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"fresh");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_run_blocking_reports_panics_as_errors() {
        let result: Result<()> = run_blocking(|| panic!("decoder exploded")).await;
        assert!(matches!(result, Err(FileConError::Worker(_))));
    }
}
