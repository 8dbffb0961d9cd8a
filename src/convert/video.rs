use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::audio::audio_encoding;
use super::{ensure_input, Converter, StagedOutput};
use crate::category::{MediaCategory, AUDIO_ONLY_TARGETS};
use crate::error::{FileConError, Result};
use crate::media::{MediaProcessorTrait, VideoEncoding};
use crate::options::ConversionOptions;

/// Video conversion and audio extraction through the media processor
pub struct VideoConverter {
    media: Arc<dyn MediaProcessorTrait>,
}

impl VideoConverter {
    pub fn new(media: Arc<dyn MediaProcessorTrait>) -> Self {
        Self { media }
    }
}

/// Codecs a container gets when the options leave them unset
fn container_codecs(format: &str) -> (&'static str, &'static str) {
    match format {
        "webm" => ("libvpx-vp9", "libopus"),
        _ => ("libx264", "aac"),
    }
}

pub(crate) fn video_encoding(format: &str, options: &ConversionOptions) -> VideoEncoding {
    let (video_codec, audio_codec) = container_codecs(format);
    VideoEncoding {
        video_codec: options.codec.clone().unwrap_or_else(|| video_codec.to_string()),
        audio_codec: options.audio_codec.clone().unwrap_or_else(|| audio_codec.to_string()),
        height: options.resolution.map(|r| r.height),
    }
}

#[async_trait]
impl Converter for VideoConverter {
    fn category(&self) -> MediaCategory {
        MediaCategory::Video
    }

    async fn convert(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &ConversionOptions,
    ) -> Result<()> {
        ensure_input(input_path)?;

        let format = options.target_format(MediaCategory::Video);
        if !MediaCategory::Video.supports_target(&format) {
            return Err(FileConError::UnsupportedFormat(format));
        }

        let staged = StagedOutput::new(input_path, output_path)?;
        if AUDIO_ONLY_TARGETS.contains(&format.as_str()) {
            info!("Target {} is audio only, extracting audio stream", format);
            let encoding = audio_encoding(&format, options);
            self.media.extract_audio(input_path, staged.path(), &encoding).await?;
        } else {
            let encoding = video_encoding(&format, options);
            self.media.transcode_video(input_path, staged.path(), &encoding).await?;
        }
        staged.commit()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::AudioEncoding;
    use crate::options::Resolution;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Media processor double that records calls and writes a stub output
    #[derive(Default)]
    pub(crate) struct RecordingMedia {
        calls: Mutex<Vec<String>>,
        pub(crate) fail_with: Option<String>,
    }

    impl RecordingMedia {
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String, output: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            std::fs::write(output, b"partial")?;
            match &self.fail_with {
                Some(message) => Err(FileConError::Media(message.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl MediaProcessorTrait for RecordingMedia {
        async fn transcode_audio(&self, _input: &Path, output: &Path, encoding: &AudioEncoding) -> Result<()> {
            let bitrate = encoding.bitrate.clone().unwrap_or_else(|| "none".to_string());
            self.record(format!("transcode_audio:{}", bitrate), output)
        }

        async fn extract_audio(&self, _video: &Path, audio: &Path, _encoding: &AudioEncoding) -> Result<()> {
            self.record("extract_audio".to_string(), audio)
        }

        async fn transcode_video(&self, _input: &Path, output: &Path, encoding: &VideoEncoding) -> Result<()> {
            self.record(format!("transcode_video:{}", encoding.video_codec), output)
        }

        fn check_availability(&self) -> Result<()> {
            Ok(())
        }

        async fn get_version_info(&self) -> Result<String> {
            Ok("recording".to_string())
        }
    }

    fn video_input(dir: &Path) -> std::path::PathBuf {
        let input = dir.join("clip.mp4");
        std::fs::write(&input, b"ftyp").unwrap();
        input
    }

    #[tokio::test]
    async fn test_audio_target_extracts_audio_only() {
        let dir = tempdir().unwrap();
        let input = video_input(dir.path());
        let media = Arc::new(RecordingMedia::default());

        VideoConverter::new(media.clone())
            .convert(&input, &dir.path().join("clip.mp3"), &ConversionOptions::new().with_format("MP3 (Audio)"))
            .await
            .unwrap();

        assert_eq!(media.calls(), vec!["extract_audio".to_string()]);
    }

    #[tokio::test]
    async fn test_video_target_transcodes() {
        let dir = tempdir().unwrap();
        let input = video_input(dir.path());
        let media = Arc::new(RecordingMedia::default());

        VideoConverter::new(media.clone())
            .convert(&input, &dir.path().join("clip.webm"), &ConversionOptions::new().with_format("webm"))
            .await
            .unwrap();

        assert_eq!(media.calls(), vec!["transcode_video:libvpx-vp9".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_transcode_removes_partial_output() {
        let dir = tempdir().unwrap();
        let input = video_input(dir.path());
        let output = dir.path().join("clip.mkv");
        let media = Arc::new(RecordingMedia {
            fail_with: Some("Unknown encoder".to_string()),
            ..Default::default()
        });

        let result = VideoConverter::new(media)
            .convert(&input, &output, &ConversionOptions::new().with_format("mkv"))
            .await;

        assert!(matches!(result, Err(FileConError::Media(m)) if m == "Unknown encoder"));
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_failed_transcode_keeps_existing_output() {
        let dir = tempdir().unwrap();
        let input = video_input(dir.path());
        let output = dir.path().join("clip.webm");
        std::fs::write(&output, b"earlier render").unwrap();
        let media = Arc::new(RecordingMedia {
            fail_with: Some("Invalid data found when processing input".to_string()),
            ..Default::default()
        });

        let result = VideoConverter::new(media)
            .convert(&input, &output, &ConversionOptions::new().with_format("webm"))
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&output).unwrap(), b"earlier render");
    }

    #[test]
    fn test_video_encoding_honours_options() {
        let options = ConversionOptions::new()
            .with_codec("libx265")
            .with_resolution(Resolution { width: 1280, height: 720 });
        let encoding = video_encoding("mkv", &options);

        assert_eq!(encoding.video_codec, "libx265");
        assert_eq!(encoding.audio_codec, "aac");
        assert_eq!(encoding.height, Some(720));
    }
}
