use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Audio containers a video can be reduced to by dropping its video stream
pub const AUDIO_ONLY_TARGETS: &[&str] = &["mp3", "wav", "ogg", "aac"];

const VIDEO_CONTAINERS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm"];

/// Media family a batch belongs to. Every category has exactly one converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Images,
    Audio,
    Video,
    Documents,
}

impl MediaCategory {
    pub const ALL: [MediaCategory; 4] = [
        MediaCategory::Images,
        MediaCategory::Audio,
        MediaCategory::Video,
        MediaCategory::Documents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MediaCategory::Images => "Images",
            MediaCategory::Audio => "Audio",
            MediaCategory::Video => "Video",
            MediaCategory::Documents => "Documents",
        }
    }

    /// Target format used when the options do not name one
    pub fn default_format(&self) -> &'static str {
        match self {
            MediaCategory::Images => "png",
            MediaCategory::Audio => "mp3",
            MediaCategory::Video => "mp4",
            MediaCategory::Documents => "pdf",
        }
    }

    /// Target formats offered to the user, as display labels
    pub fn target_formats(&self) -> &'static [&'static str] {
        match self {
            MediaCategory::Images => &["PNG", "JPEG", "WEBP", "ICO", "BMP"],
            MediaCategory::Audio => &["MP3", "WAV", "FLAC", "OGG", "AAC"],
            MediaCategory::Video => &["MP4", "MKV", "MOV", "AVI", "WEBM", "MP3 (Audio)"],
            MediaCategory::Documents => &["PDF"],
        }
    }

    /// Input file extensions picked up when scanning a directory
    pub fn input_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaCategory::Images => &["png", "jpg", "jpeg", "webp", "bmp", "gif"],
            MediaCategory::Audio => &["mp3", "wav", "flac", "ogg", "m4a", "aac"],
            MediaCategory::Video => &["mp4", "mkv", "mov", "avi", "webm"],
            MediaCategory::Documents => &["docx", "txt", "md"],
        }
    }

    pub fn accepts<P: AsRef<Path>>(&self, path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.input_extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    /// Whether the converter for this category can produce `format`.
    /// `format` must already be normalized.
    pub fn supports_target(&self, format: &str) -> bool {
        match self {
            MediaCategory::Images => matches!(
                format,
                "png" | "jpeg" | "jpg" | "webp" | "ico" | "bmp" | "gif"
            ),
            MediaCategory::Video => {
                VIDEO_CONTAINERS.contains(&format) || AUDIO_ONLY_TARGETS.contains(&format)
            }
            _ => self
                .target_formats()
                .iter()
                .any(|label| normalize_format_label(label) == format),
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Turn a display label such as `"MP3 (Audio)"` into a bare lowercase format
pub fn normalize_format_label(label: &str) -> String {
    label
        .trim()
        .trim_end_matches("(Audio)")
        .trim()
        .trim_start_matches('.')
        .to_lowercase()
}
