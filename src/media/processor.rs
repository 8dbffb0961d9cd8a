use async_trait::async_trait;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use super::{AudioEncoding, MediaCommandBuilder, MediaProcessorTrait, VideoEncoding};
use crate::config::MediaConfig;
use crate::error::{FileConError, Result};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn transcode_audio(
        &self,
        input_path: &Path,
        output_path: &Path,
        encoding: &AudioEncoding,
    ) -> Result<()> {
        info!("Converting audio {} -> {}", input_path.display(), output_path.display());

        self.command_builder
            .transcode_audio(input_path, output_path, encoding)
            .execute()
            .await
    }

    async fn extract_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        encoding: &AudioEncoding,
    ) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.command_builder
            .extract_audio(video_path, audio_path, encoding)
            .execute()
            .await
    }

    async fn transcode_video(
        &self,
        input_path: &Path,
        output_path: &Path,
        encoding: &VideoEncoding,
    ) -> Result<()> {
        info!(
            "Converting video {} -> {} ({}/{})",
            input_path.display(),
            output_path.display(),
            encoding.video_codec,
            encoding.audio_codec
        );

        self.command_builder
            .transcode_video(input_path, output_path, encoding)
            .execute()
            .await
    }

    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| FileConError::Media(format!("Media processor not found: {}", e)))?;

        if output.status.success() {
            info!("Media processor is available");
            Ok(())
        } else {
            Err(FileConError::Media("Media processor version check failed".to_string()))
        }
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let command = self.command_builder.version_check();
        let output = tokio::process::Command::new(&command.binary_path)
            .args(&command.args)
            .output()
            .await
            .map_err(|e| FileConError::Media(format!("Failed to execute media processor: {}", e)))?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            // First line carries the version
            let first_line = version_info.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(FileConError::Media(format!("Media processor version check failed: {}", stderr)))
        }
    }
}
