mod config;
mod logger;
mod merger;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::merger::VideoMerge;

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Merge duplicated video parts into single files losslessly using ffmpeg"
)]
pub(crate) struct Args {
    /// Input video files or directories
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    paths: Vec<PathBuf>,

    /// Output directory for merged files
    #[arg(short = 'o', long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    output: Option<PathBuf>,

    /// Duplicate marker to strip from file names
    #[arg(short = 'm', long, num_args = 1, action = clap::ArgAction::Append, value_name = "MARKER")]
    marker: Vec<String>,

    /// File extension for merged files
    #[arg(short = 'x', long, value_name = "EXTENSION")]
    extension: Option<String>,

    /// Video file extensions to include when scanning directories
    #[arg(short = 'e', long = "include", num_args = 1, action = clap::ArgAction::Append, value_name = "EXTENSION")]
    include: Vec<String>,

    /// Path to the ffmpeg binary
    #[arg(short = 'b', long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    ffmpeg: Option<PathBuf>,

    /// Only print groups without merging
    #[arg(short = 'p', long)]
    print: bool,

    /// Recurse into subdirectories
    #[arg(short = 'r', long)]
    recurse: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, value_name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        video_merge::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        VideoMerge::new(args)?.run()
    }
}

#[cfg(test)]
mod cli_args_tests {
    use super::*;

    #[test]
    fn parses_multiple_paths() {
        let args = Args::try_parse_from(["test", "one.mp4", "two - 複製.mp4", "/videos"]).expect("should parse");
        assert_eq!(args.paths.len(), 3);
        assert_eq!(args.paths[1], PathBuf::from("two - 複製.mp4"));
    }

    #[test]
    fn parses_multiple_marker_args() {
        let args = Args::try_parse_from(["test", "-m", " - 複製", "--marker", " - Copy"]).expect("should parse");
        assert_eq!(args.marker, vec![" - 複製", " - Copy"]);
    }

    #[test]
    fn parses_output_and_extension() {
        let args = Args::try_parse_from(["test", "-o", "/out", "-x", "mkv", "clip.mkv"]).expect("should parse");
        assert_eq!(args.output, Some(PathBuf::from("/out")));
        assert_eq!(args.extension.as_deref(), Some("mkv"));
        assert_eq!(args.paths, vec![PathBuf::from("clip.mkv")]);
    }

    #[test]
    fn parses_include_extensions() {
        let args = Args::try_parse_from(["test", "-e", "mp4", "-e", "ts"]).expect("should parse");
        assert_eq!(args.include, vec!["mp4", "ts"]);
    }

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from(["test", "-p", "-r", "-v", "-b", "/opt/ffmpeg"]).expect("should parse");
        assert!(args.print);
        assert!(args.recurse);
        assert!(args.verbose);
        assert_eq!(args.ffmpeg, Some(PathBuf::from("/opt/ffmpeg")));
    }

    #[test]
    fn defaults_are_empty() {
        let args = Args::try_parse_from(["test"]).expect("should parse");
        assert!(args.paths.is_empty());
        assert!(args.marker.is_empty());
        assert!(args.output.is_none());
        assert!(!args.print);
    }

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }
}
