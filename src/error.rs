use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileConError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Output directory does not exist: {}", .0.display())]
    OutputDirMissing(PathBuf),

    #[error("Output would overwrite the input file: {}", .0.display())]
    OutputIsInput(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported conversion: {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    #[error("A batch conversion is already running")]
    BatchInProgress,

    #[error("No files to convert")]
    NoFiles,

    #[error("Worker error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, FileConError>;
