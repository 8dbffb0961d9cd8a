use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::{ensure_input, Converter, StagedOutput};
use crate::category::MediaCategory;
use crate::error::{FileConError, Result};
use crate::media::{AudioEncoding, MediaProcessorTrait};
use crate::options::ConversionOptions;

/// Targets where a bitrate means nothing to the encoder
const LOSSLESS_AUDIO: &[&str] = &["wav", "flac"];

/// Audio conversion through the media processor
pub struct AudioConverter {
    media: Arc<dyn MediaProcessorTrait>,
}

impl AudioConverter {
    pub fn new(media: Arc<dyn MediaProcessorTrait>) -> Self {
        Self { media }
    }
}

/// Encoder settings for an audio target format
pub(crate) fn audio_encoding(format: &str, options: &ConversionOptions) -> AudioEncoding {
    if LOSSLESS_AUDIO.contains(&format) {
        AudioEncoding::default()
    } else {
        AudioEncoding {
            bitrate: Some(options.bitrate().to_string()),
        }
    }
}

#[async_trait]
impl Converter for AudioConverter {
    fn category(&self) -> MediaCategory {
        MediaCategory::Audio
    }

    async fn convert(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &ConversionOptions,
    ) -> Result<()> {
        ensure_input(input_path)?;

        let format = options.target_format(MediaCategory::Audio);
        if !MediaCategory::Audio.supports_target(&format) {
            return Err(FileConError::UnsupportedFormat(format));
        }

        let encoding = audio_encoding(&format, options);
        let staged = StagedOutput::new(input_path, output_path)?;
        self.media.transcode_audio(input_path, staged.path(), &encoding).await?;
        staged.commit()
    }
}
