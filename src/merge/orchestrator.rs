//! Sequential merge of resolved groups.
//!
//! Each group goes through the same steps:
//! write the manifest, run the media tool, record the outcome, remove the manifest.
//! A failure in any step only fails that group, and the manifest is always removed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;

use crate::merge::ffmpeg::{MediaTool, ToolOutput};
use crate::merge::group::Group;
use crate::merge::manifest::{self, ConcatManifest, UnsupportedPath};

/// Filename prefix for merged output files.
pub const OUTPUT_PREFIX: &str = "Final_";

/// Number of characters of ffmpeg error output shown per failed group.
pub const ERROR_PREVIEW_CHARS: usize = 100;

/// Characters that are not allowed in filenames on Windows.
static RE_ILLEGAL_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("Invalid filename regex"));

/// Why merging a group failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// A member path cannot be written to the manifest.
    UnsupportedPath(UnsupportedPath),
    /// The manifest file could not be created or written.
    ManifestWrite(String),
    /// The media tool ran but exited with a failure status.
    Invocation { exit_code: Option<i32>, stderr: String },
    /// Any other fault, such as the media tool failing to start.
    Unexpected(String),
}

/// Result of merging one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Succeeded { output: PathBuf },
    Failed { reason: FailureReason },
}

/// A processed group with its members in concatenation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResult {
    pub key: String,
    pub members: Vec<PathBuf>,
    pub outcome: MergeOutcome,
}

/// Progress notifications emitted while running.
#[derive(Debug)]
pub enum MergeEvent<'a> {
    /// About to merge a group. `position` starts from 1.
    GroupStarted {
        position: usize,
        total: usize,
        key: &'a str,
        members: &'a [PathBuf],
    },
    /// A group has been processed and its manifest removed.
    GroupFinished(&'a GroupResult),
    /// Cancellation was requested, `remaining` groups were not attempted.
    Cancelled { remaining: usize },
}

/// Summary of a whole run.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Results for every attempted group in processing order.
    pub results: Vec<GroupResult>,
    pub success_count: usize,
    /// Groups with a single member.
    pub skipped_count: usize,
    pub cancelled: bool,
}

/// Merges groups one at a time with the given media tool.
#[derive(Debug)]
pub struct MergeOrchestrator<T: MediaTool> {
    tool: T,
    extension: String,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl MergeOutcome {
    const fn failed(reason: FailureReason) -> Self {
        Self::Failed { reason }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

impl GroupResult {
    /// One line summary for the user.
    #[must_use]
    pub fn log_line(&self) -> String {
        match &self.outcome {
            MergeOutcome::Succeeded { output } => {
                format!("Merged [{}]: {}", self.key, crate::path_to_filename_string(output))
            }
            MergeOutcome::Failed {
                reason: reason @ FailureReason::Invocation { .. },
            } => format!("Failed [{}]: {reason}", self.key),
            MergeOutcome::Failed { reason } => format!("Error [{}]: {reason}", self.key),
        }
    }
}

impl MergeReport {
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| !result.outcome.is_success())
            .count()
    }

    #[must_use]
    pub fn log_lines(&self) -> Vec<String> {
        self.results.iter().map(GroupResult::log_line).collect()
    }
}

impl<T: MediaTool> MergeOrchestrator<T> {
    /// Create an orchestrator writing `Final_<name>.<extension>` files.
    pub fn new(tool: T, extension: &str) -> Self {
        Self {
            tool,
            extension: extension.trim().trim_start_matches('.').to_string(),
            cancel_flag: None,
        }
    }

    /// Stop before the next group once the flag is set.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub const fn tool(&self) -> &T {
        &self.tool
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Target file for the given group key.
    #[must_use]
    pub fn output_path(&self, key: &str, output_dir: &Path) -> PathBuf {
        output_dir.join(output_file_name(key, &self.extension))
    }

    /// Merge every group with at least two members.
    ///
    /// Groups are processed sequentially in the given order.
    /// Failed groups never stop the run; only the cancel flag does.
    pub fn run<F>(&self, groups: &[Group], output_dir: &Path, mut on_event: F) -> MergeReport
    where
        F: FnMut(&MergeEvent),
    {
        let mergeable: Vec<&Group> = groups.iter().filter(|group| group.is_mergeable()).collect();
        let total = mergeable.len();
        let mut report = MergeReport {
            skipped_count: groups.len() - total,
            ..MergeReport::default()
        };

        for (index, group) in mergeable.into_iter().enumerate() {
            if self.is_cancelled() {
                report.cancelled = true;
                on_event(&MergeEvent::Cancelled {
                    remaining: total - index,
                });
                break;
            }

            let members = group.ordered_members();
            on_event(&MergeEvent::GroupStarted {
                position: index + 1,
                total,
                key: group.key(),
                members: &members,
            });

            let outcome = self.merge_group(group.key(), &members, output_dir);
            if outcome.is_success() {
                report.success_count += 1;
            }

            let result = GroupResult {
                key: group.key().to_string(),
                members,
                outcome,
            };
            on_event(&MergeEvent::GroupFinished(&result));
            report.results.push(result);
        }

        report
    }

    /// Merge a single group whose members are already in concatenation order.
    fn merge_group(&self, key: &str, members: &[PathBuf], output_dir: &Path) -> MergeOutcome {
        let contents = match manifest::manifest_text(members) {
            Ok(contents) => contents,
            Err(error) => return MergeOutcome::failed(FailureReason::UnsupportedPath(error)),
        };

        let manifest = match ConcatManifest::write(output_dir, &contents) {
            Ok(manifest) => manifest,
            Err(error) => return MergeOutcome::failed(FailureReason::ManifestWrite(format!("{error:#}"))),
        };

        let output = self.output_path(key, output_dir);
        let outcome = match self.tool.concat(manifest.path(), &output) {
            Ok(result) if result.success() => MergeOutcome::Succeeded { output },
            Ok(ToolOutput { exit_code, stderr }) => {
                MergeOutcome::failed(FailureReason::Invocation { exit_code, stderr })
            }
            Err(error) => MergeOutcome::failed(FailureReason::Unexpected(format!("{error:#}"))),
        };

        if let Err(error) = manifest.remove() {
            crate::print_warning!("{error:#}");
        }

        outcome
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPath(error) => write!(f, "{error}"),
            Self::ManifestWrite(error) | Self::Unexpected(error) => write!(f, "{error}"),
            Self::Invocation { exit_code, stderr } => {
                let preview: String = stderr.trim_start().chars().take(ERROR_PREVIEW_CHARS).collect();
                if !preview.trim().is_empty() {
                    write!(f, "{}", preview.trim_end())
                } else if let Some(code) = exit_code {
                    write!(f, "ffmpeg exited with code {code}")
                } else {
                    write!(f, "ffmpeg was terminated by a signal")
                }
            }
        }
    }
}

/// Make a group key safe to use in a filename.
///
/// Removes characters not allowed on Windows and replaces spaces with underscores.
///
/// ```rust
/// use video_merge::merge::sanitize_group_key;
///
/// assert_eq!(sanitize_group_key("My Clip: part?"), "My_Clip_part");
/// ```
#[must_use]
pub fn sanitize_group_key(key: &str) -> String {
    RE_ILLEGAL_FILENAME_CHARS.replace_all(key, "").replace(' ', "_")
}

/// Output filename for a merged group: `Final_<sanitized key>.<extension>`.
#[must_use]
pub fn output_file_name(key: &str, extension: &str) -> String {
    format!(
        "{OUTPUT_PREFIX}{}.{}",
        sanitize_group_key(key),
        extension.trim_start_matches('.')
    )
}

/// Check that there is something to do before touching any group.
///
/// Returns the output directory on success.
pub fn check_inputs(paths: &[PathBuf], output_dir: Option<&Path>) -> Result<PathBuf> {
    if paths.is_empty() {
        anyhow::bail!("No input files selected");
    }
    let Some(output_dir) = output_dir else {
        anyhow::bail!("No output directory selected");
    };
    if !output_dir.is_dir() {
        anyhow::bail!("Output directory does not exist: {}", output_dir.display());
    }
    Ok(output_dir.to_path_buf())
}
