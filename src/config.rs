use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FileConError, Result};
use crate::options::{ConversionOptions, DEFAULT_BITRATE, DEFAULT_QUALITY};

/// Name of the configuration file picked up from the current directory
pub const DEFAULT_CONFIG_FILE: &str = "filecon.toml";

const DEFAULT_OUTPUT_DIR_NAME: &str = "FileCon_Conversions";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub media: MediaConfig,
    pub images: ImageConfig,
    pub audio: AudioConfig,
    pub video: VideoConfig,
    pub documents: DocumentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory converted files are written to
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Encoder quality for lossy targets (1-100)
    pub quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Bitrate for lossy audio targets
    pub bitrate: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Video codec; when unset the target container picks one
    pub codec: Option<String>,
    /// Audio codec; when unset the target container picks one
    pub audio_codec: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Body text size in points
    pub font_size: f32,
    /// Distance between body text baselines in points
    pub line_height: f32,
    /// Page margin in points
    pub margin: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bitrate: DEFAULT_BITRATE.to_string(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            line_height: 14.0,
            margin: 50.0,
        }
    }
}

/// `~/FileCon_Conversions`, or a relative directory when no home is known
pub fn default_output_dir() -> PathBuf {
    UserDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_OUTPUT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR_NAME))
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FileConError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| FileConError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FileConError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| FileConError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Options every batch starts from before command line overrides
    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            format: None,
            bitrate: Some(self.audio.bitrate.clone()),
            quality: Some(self.images.quality),
            codec: self.video.codec.clone(),
            audio_codec: self.video.audio_codec.clone(),
            resolution: None,
        }
    }
}
