//! Grouping of duplicated video parts and lossless concatenation with ffmpeg.
//!
//! Files are grouped by their base name after stripping duplicate markers
//! such as `" - 複製"` that file managers append when copying a file.
//! Every group with at least two members is concatenated into a single
//! `Final_<name>.<ext>` file with the ffmpeg concat demuxer using stream copy.

mod ffmpeg;
mod group;
mod manifest;
mod orchestrator;

pub use ffmpeg::{
    BinaryDiscovery, BundledBinary, EnvironmentVariable, ExplicitPath, FFMPEG_COMMAND, FFMPEG_ENV_VAR, Ffmpeg,
    FfmpegLocator, MediaTool, ToolOutput, concat_args,
};
pub use group::{DEFAULT_MARKER, Group, GroupResolver, member_order};
pub use manifest::{ConcatManifest, MANIFEST_PREFIX, MANIFEST_SUFFIX, UnsupportedPath, manifest_line, manifest_text};
pub use orchestrator::{
    ERROR_PREVIEW_CHARS, FailureReason, GroupResult, MergeEvent, MergeOrchestrator, MergeOutcome, MergeReport,
    OUTPUT_PREFIX, check_inputs, output_file_name, sanitize_group_key,
};
