// Media processing over an external ffmpeg binary
//
// - Processor: implementation of MediaProcessorTrait on top of ffmpeg
// - Commands: command builders and encoder settings

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use commands::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Media operations the audio and video converters delegate to
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Re-encode an audio file into the container implied by `output_path`
    async fn transcode_audio(
        &self,
        input_path: &Path,
        output_path: &Path,
        encoding: &AudioEncoding,
    ) -> Result<()>;

    /// Write only the audio stream of a video file
    async fn extract_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        encoding: &AudioEncoding,
    ) -> Result<()>;

    /// Re-encode a video file into the container implied by `output_path`
    async fn transcode_video(
        &self,
        input_path: &Path,
        output_path: &Path,
        encoding: &VideoEncoding,
    ) -> Result<()>;

    /// Check if media processor is available
    fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Arc<dyn MediaProcessorTrait> {
        Arc::new(processor::MediaProcessorImpl::new(config))
    }
}
