use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{FileConError, Result};

/// Encoder settings for an audio output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioEncoding {
    /// Target bitrate; `None` leaves the encoder default (lossless targets)
    pub bitrate: Option<String>,
}

/// Encoder settings for a video output
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEncoding {
    pub video_codec: String,
    pub audio_codec: String,
    /// Scale to this height, keeping the aspect ratio
    pub height: Option<u32>,
}

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Only print errors on stderr
    pub fn quiet(self) -> Self {
        self.arg("-hide_banner").arg("-loglevel").arg("error")
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    /// Disable video
    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Apply an audio encoding, skipping unset values
    fn audio_encoding(self, encoding: &AudioEncoding) -> Self {
        match &encoding.bitrate {
            Some(bitrate) => self.audio_bitrate(bitrate.clone()),
            None => self,
        }
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| FileConError::Media(format!("Failed to execute media processor: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FileConError::Media(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Builder for the ffmpeg invocations the converters need
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build audio transcode command
    pub fn transcode_audio<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        encoding: &AudioEncoding,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio conversion")
            .quiet()
            .overwrite()
            .input(input_path)
            .no_video()
            .audio_encoding(encoding)
            .output(output_path)
    }

    /// Build audio extraction command; the video stream is dropped, never transcoded
    pub fn extract_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        encoding: &AudioEncoding,
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Audio extraction")
            .quiet()
            .overwrite()
            .input(video_path)
            .no_video()
            .audio_encoding(encoding)
            .output(audio_path)
    }

    /// Build video transcode command
    pub fn transcode_video<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: P,
        encoding: &VideoEncoding,
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, "Video conversion")
            .quiet()
            .overwrite()
            .input(input_path);

        if let Some(height) = encoding.height {
            // -2 keeps the width even, which most encoders require
            cmd = cmd.video_filter(format!("scale=-2:{}", height));
        }

        cmd.video_codec(encoding.video_codec.clone())
            .audio_codec(encoding.audio_codec.clone())
            .output(output_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &MediaCommand) -> Vec<&str> {
        cmd.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_transcode_audio_sets_bitrate() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let encoding = AudioEncoding {
            bitrate: Some("192k".to_string()),
        };
        let cmd = builder.transcode_audio("in.wav", "out.mp3", &encoding);

        assert_eq!(cmd.binary_path, "ffmpeg");
        let args = args(&cmd);
        assert!(args.windows(2).any(|w| w == ["-i", "in.wav"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "192k"]));
        assert_eq!(args.last(), Some(&"out.mp3"));
    }

    #[test]
    fn test_lossless_audio_has_no_bitrate() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let cmd = builder.transcode_audio("in.mp3", "out.flac", &AudioEncoding::default());
        assert!(!args(&cmd).contains(&"-b:a"));
    }

    #[test]
    fn test_extract_audio_drops_video_stream() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let cmd = builder.extract_audio("clip.mp4", "clip.mp3", &AudioEncoding::default());
        let args = args(&cmd);

        assert!(args.contains(&"-vn"));
        assert!(!args.contains(&"-c:v"));
        assert_eq!(cmd.description, "Audio extraction");
    }

    #[test]
    fn test_transcode_video_scales_to_height() {
        let builder = MediaCommandBuilder::new("/opt/ffmpeg");
        let encoding = VideoEncoding {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            height: Some(720),
        };
        let cmd = builder.transcode_video("clip.mov", "clip.mp4", &encoding);
        let args = args(&cmd);

        assert_eq!(cmd.binary_path, "/opt/ffmpeg");
        assert!(args.windows(2).any(|w| w == ["-vf", "scale=-2:720"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-c:a", "aac"]));
        assert!(args.contains(&"-y"));
    }

    #[tokio::test]
    async fn test_execute_reports_missing_binary() {
        let cmd = MediaCommand::new("/nonexistent/ffmpeg-binary", "Probe").arg("-version");
        match cmd.execute().await {
            Err(FileConError::Media(message)) => assert!(message.contains("Failed to execute")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
