use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::category::MediaCategory;
use crate::options::Resolution;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert files (or every matching file in given directories)
    Convert {
        /// Media category of the inputs
        #[arg(short = 'k', long, value_enum)]
        category: MediaCategory,

        /// Target format, e.g. PNG, MP3 or "MP3 (Audio)"
        #[arg(short, long)]
        format: Option<String>,

        /// Output directory, created when missing
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Audio bitrate, e.g. 192k
        #[arg(long)]
        bitrate: Option<String>,

        /// Image quality (1-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,

        /// Video codec, e.g. libx264
        #[arg(long)]
        codec: Option<String>,

        /// Video resolution as WIDTHxHEIGHT
        #[arg(long)]
        resolution: Option<Resolution>,

        /// JSON file with conversion options; flags given here take precedence
        #[arg(long = "options", value_name = "FILE")]
        options_file: Option<PathBuf>,

        /// Print the batch summary as JSON
        #[arg(long)]
        json: bool,

        /// Files or directories to convert
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List target formats and accepted inputs
    Formats {
        /// Only show this category
        #[arg(short = 'k', long, value_enum)]
        category: Option<MediaCategory>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Destination (default: ./filecon.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let args = Args::try_parse_from([
            "filecon", "convert", "-k", "video", "--format", "MP3 (Audio)", "--resolution", "1280x720",
            "a.mp4", "b.mkv",
        ])
        .unwrap();

        match args.command {
            Commands::Convert { category, format, resolution, paths, .. } => {
                assert_eq!(category, MediaCategory::Video);
                assert_eq!(format.as_deref(), Some("MP3 (Audio)"));
                assert_eq!(resolution.map(|r| r.height), Some(720));
                assert_eq!(paths.len(), 2);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_parse_options_file() {
        let args = Args::try_parse_from([
            "filecon", "convert", "-k", "audio", "--options", "opts.json", "--bitrate", "256k", "song.wav",
        ])
        .unwrap();

        match args.command {
            Commands::Convert { options_file, bitrate, .. } => {
                assert_eq!(options_file, Some(PathBuf::from("opts.json")));
                assert_eq!(bitrate.as_deref(), Some("256k"));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_convert_requires_paths() {
        assert!(Args::try_parse_from(["filecon", "convert", "-k", "images"]).is_err());
    }
}
