use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::category::{normalize_format_label, MediaCategory};
use crate::error::{FileConError, Result};

pub const DEFAULT_BITRATE: &str = "192k";
pub const DEFAULT_QUALITY: u8 = 95;

/// Options shared by every file of one batch.
///
/// Every key is optional; converters fall back to their category defaults.
/// Keys a category does not understand are ignored, and unknown keys in a
/// serialized options document are dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Target format or extension, e.g. `"jpeg"` or `"MP3 (Audio)"`
    pub format: Option<String>,
    /// Audio bitrate passed to the encoder, e.g. `"192k"`
    pub bitrate: Option<String>,
    /// Image encoder quality, 1-100
    pub quality: Option<u8>,
    /// Video codec
    pub codec: Option<String>,
    /// Audio codec used when transcoding video
    pub audio_codec: Option<String>,
    /// Target video resolution; only the height is applied
    pub resolution: Option<Resolution>,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_bitrate<S: Into<String>>(mut self, bitrate: S) -> Self {
        self.bitrate = Some(bitrate.into());
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_codec<S: Into<String>>(mut self, codec: S) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Layer `overrides` on top of `self`; keys set in `overrides` win
    pub fn overlay(self, overrides: ConversionOptions) -> Self {
        Self {
            format: overrides.format.or(self.format),
            bitrate: overrides.bitrate.or(self.bitrate),
            quality: overrides.quality.or(self.quality),
            codec: overrides.codec.or(self.codec),
            audio_codec: overrides.audio_codec.or(self.audio_codec),
            resolution: overrides.resolution.or(self.resolution),
        }
    }

    /// Normalized lowercase target format, or the category default
    pub fn target_format(&self, category: MediaCategory) -> String {
        self.format
            .as_deref()
            .map(normalize_format_label)
            .filter(|format| !format.is_empty())
            .unwrap_or_else(|| category.default_format().to_string())
    }

    pub fn bitrate(&self) -> &str {
        self.bitrate.as_deref().unwrap_or(DEFAULT_BITRATE)
    }

    pub fn quality(&self) -> u8 {
        self.quality.unwrap_or(DEFAULT_QUALITY).clamp(1, 100)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Video frame size written as `WIDTHxHEIGHT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Resolution {
    type Err = FileConError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FileConError::Config(format!("Invalid resolution '{}', expected WIDTHxHEIGHT", s));
        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = FileConError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
