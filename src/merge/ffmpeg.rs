//! Locating and running the ffmpeg binary.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Bare command name resolved through `PATH` when no other candidate exists.
pub const FFMPEG_COMMAND: &str = "ffmpeg";

/// Environment variable media libraries use to point at a specific ffmpeg binary.
pub const FFMPEG_ENV_VAR: &str = "FFMPEG_BINARY";

/// One way of finding the ffmpeg binary.
pub trait BinaryDiscovery: fmt::Debug {
    /// Short description shown in verbose output.
    fn name(&self) -> &'static str;

    /// Candidate path, if this strategy has one.
    /// The locator checks that the path exists.
    fn candidate(&self) -> Option<PathBuf>;
}

/// Path given on the command line or in the user config.
#[derive(Debug, Clone)]
pub struct ExplicitPath(pub PathBuf);

/// Binary shipped in the same directory as the running executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledBinary;

/// Path read from an environment variable.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentVariable(pub &'static str);

/// Ordered list of discovery strategies where the first existing path wins.
#[derive(Debug)]
pub struct FfmpegLocator {
    strategies: Vec<Box<dyn BinaryDiscovery>>,
}

/// Result of a finished external process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Diagnostic output from stderr.
    pub stderr: String,
}

/// External media tool that can concatenate the files listed in a manifest.
pub trait MediaTool {
    /// Run the concatenation and block until it has finished.
    ///
    /// Returns an error only if the tool could not be run at all.
    /// A non-zero exit is reported through [`ToolOutput`].
    fn concat(&self, manifest: &Path, output: &Path) -> Result<ToolOutput>;
}

/// The ffmpeg binary.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
}

impl BinaryDiscovery for ExplicitPath {
    fn name(&self) -> &'static str {
        "explicit path"
    }

    fn candidate(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

impl BinaryDiscovery for BundledBinary {
    fn name(&self) -> &'static str {
        "bundled binary"
    }

    fn candidate(&self) -> Option<PathBuf> {
        let executable = env::current_exe().ok()?;
        let dir = executable.parent()?;
        Some(dir.join(format!("{FFMPEG_COMMAND}{}", env::consts::EXE_SUFFIX)))
    }
}

impl BinaryDiscovery for EnvironmentVariable {
    fn name(&self) -> &'static str {
        "environment variable"
    }

    fn candidate(&self) -> Option<PathBuf> {
        env::var_os(self.0).filter(|value| !value.is_empty()).map(PathBuf::from)
    }
}

impl FfmpegLocator {
    /// Default discovery chain: explicit path, bundled binary, then `FFMPEG_BINARY`.
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let mut strategies: Vec<Box<dyn BinaryDiscovery>> = Vec::new();
        if let Some(path) = explicit {
            strategies.push(Box::new(ExplicitPath(path)));
        }
        strategies.push(Box::new(BundledBinary));
        strategies.push(Box::new(EnvironmentVariable(FFMPEG_ENV_VAR)));
        Self::with_strategies(strategies)
    }

    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn BinaryDiscovery>>) -> Self {
        Self { strategies }
    }

    /// Find the first existing candidate and the name of the strategy that found it.
    #[must_use]
    pub fn find(&self) -> Option<(&'static str, PathBuf)> {
        self.strategies.iter().find_map(|strategy| {
            strategy
                .candidate()
                .filter(|path| path.is_file())
                .map(|path| (strategy.name(), path))
        })
    }

    /// Path to the ffmpeg binary, falling back to the bare command name.
    #[must_use]
    pub fn locate(&self) -> PathBuf {
        self.find()
            .map_or_else(|| PathBuf::from(FFMPEG_COMMAND), |(_, path)| path)
    }
}

impl Default for FfmpegLocator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ToolOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Check that the binary can be executed.
    pub fn check_available(&self) -> Result<()> {
        let mut command = Command::new(&self.binary);
        command.arg("-version").stdin(Stdio::null());
        hide_console_window(&mut command);
        let output = command.output().with_context(|| {
            format!(
                "ffmpeg not found at '{}'. Install ffmpeg first and make sure it is in PATH",
                self.binary.display()
            )
        })?;
        if !output.status.success() {
            anyhow::bail!("'{} -version' failed with {}", self.binary.display(), output.status);
        }
        Ok(())
    }

    /// Build the concat command without running it.
    #[must_use]
    pub fn concat_command(&self, manifest: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(concat_args(manifest, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        hide_console_window(&mut command);
        isolate_process_group(&mut command);
        command
    }
}

impl MediaTool for Ffmpeg {
    fn concat(&self, manifest: &Path, output: &Path) -> Result<ToolOutput> {
        let result = self
            .concat_command(manifest, output)
            .output()
            .with_context(|| format!("Failed to execute {}", self.binary.display()))?;

        Ok(ToolOutput {
            exit_code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        })
    }
}

/// Arguments for a lossless concat:
/// overwrite output, concat demuxer, allow absolute paths, and copy streams without re-encoding.
#[must_use]
pub fn concat_args(manifest: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-y", "-f", "concat", "-safe", "0", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(manifest.as_os_str().to_owned());
    args.extend(["-c", "copy"].into_iter().map(OsString::from));
    args.push(output.as_os_str().to_owned());
    args
}

/// Do not open a console window for ffmpeg when running from a GUI context on Windows.
#[cfg(windows)]
fn hide_console_window(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(CREATE_NO_WINDOW | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(windows))]
const fn hide_console_window(_command: &mut Command) {}

/// Put ffmpeg in its own process group so Ctrl+C only stops the batch, not the running merge.
#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
const fn isolate_process_group(_command: &mut Command) {}
