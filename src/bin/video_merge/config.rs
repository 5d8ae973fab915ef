use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Deserialize;

use video_merge::merge::DEFAULT_MARKER;
use video_merge::print_error;

use crate::Args;

/// Video extensions picked up when scanning directories.
const DEFAULT_INPUT_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];

/// Extension for merged output files.
const DEFAULT_OUTPUT_EXTENSION: &str = "mp4";

/// User configuration from the config file.
#[derive(Debug, Default, Deserialize)]
pub struct VideoMergeConfig {
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    extension: Option<String>,
    #[serde(default)]
    ffmpeg: Option<PathBuf>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    markers: Vec<String>,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    recurse: bool,
    #[serde(default)]
    verbose: bool,
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub(crate) dryrun: bool,
    pub(crate) extension: String,
    pub(crate) ffmpeg: Option<PathBuf>,
    pub(crate) include: Vec<String>,
    pub(crate) markers: Vec<String>,
    pub(crate) output: Option<PathBuf>,
    pub(crate) paths: Vec<PathBuf>,
    pub(crate) recurse: bool,
    pub(crate) verbose: bool,
}

/// Wrapper needed for parsing the user config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    video_merge: VideoMergeConfig,
}

impl VideoMergeConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    pub fn get_user_config() -> Self {
        video_merge::config::CONFIG_PATH
            .as_deref()
            .filter(|path| path.exists())
            .and_then(|path| {
                fs::read_to_string(path)
                    .map_err(|e| {
                        print_error!("Error reading config file {}: {e}", path.display());
                    })
                    .ok()
            })
            .and_then(|config_string| {
                Self::from_toml_str(&config_string)
                    .map_err(|e| {
                        print_error!("{e:#}");
                    })
                    .ok()
            })
            .unwrap_or_default()
    }

    /// Parse the `[video_merge]` section from a config file string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.video_merge)
            .context("Error reading config file")
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    pub(crate) fn try_from_args(args: Args, user_config: VideoMergeConfig) -> Result<Self> {
        let paths = args
            .paths
            .iter()
            .map(|path| video_merge::resolve_input_path(Some(path)))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unique()
            .collect();

        let output = args
            .output
            .or(user_config.output)
            .map(|path| dunce::simplified(&path).to_path_buf());

        let mut markers: Vec<String> = args
            .marker
            .into_iter()
            .chain(user_config.markers)
            .filter(|marker| !marker.is_empty())
            .unique()
            .collect();
        if markers.is_empty() {
            markers.push(DEFAULT_MARKER.to_string());
        }

        let extension = args
            .extension
            .or(user_config.extension)
            .map(|extension| Self::normalize_extension(&extension))
            .filter(|extension| !extension.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_EXTENSION.to_string());

        let include = if !args.include.is_empty() {
            Self::normalize_extensions(&args.include)
        } else if !user_config.include.is_empty() {
            Self::normalize_extensions(&user_config.include)
        } else {
            Self::normalize_extensions(DEFAULT_INPUT_EXTENSIONS)
        };

        Ok(Self {
            dryrun: args.print || user_config.dryrun,
            extension,
            ffmpeg: args.ffmpeg.or(user_config.ffmpeg),
            include,
            markers,
            output,
            paths,
            recurse: args.recurse || user_config.recurse,
            verbose: args.verbose || user_config.verbose,
        })
    }

    /// Lowercase extension without the leading dot.
    fn normalize_extension(extension: &str) -> String {
        extension.trim().trim_start_matches('.').to_lowercase()
    }

    fn normalize_extensions(slice: &[impl AsRef<str>]) -> Vec<String> {
        slice
            .iter()
            .map(|extension| Self::normalize_extension(extension.as_ref()))
            .filter(|extension| !extension.is_empty())
            .unique()
            .collect()
    }
}
