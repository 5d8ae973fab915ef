use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;

use video_merge::merge::{FailureReason, GroupResult, MergeOutcome, MergeReport};

use crate::config::Config;

/// Simple file logger for merge runs with buffered writes
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/video-merge/video_merge_<timestamp>.log
    pub(crate) fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        let log_dir = home_dir.join("logs").join(env!("CARGO_PKG_NAME"));
        Self::new_in(&log_dir)
    }

    /// Create a new file logger in the given directory.
    pub(crate) fn new_in(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let path = log_dir.join(format!(
            "video_merge_{}.log",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        ));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log settings when starting a run
    pub(crate) fn log_init(&mut self, config: &Config, ffmpeg: &Path, output_dir: &Path) {
        let _ = writeln!(self.writer, "[{}] INIT \"{}\"", Self::timestamp(), output_dir.display());
        let _ = writeln!(self.writer, "  ffmpeg: {}", ffmpeg.display());
        let _ = writeln!(self.writer, "  inputs: {}", config.paths.len());
        let _ = writeln!(self.writer, "  markers: {:?}", config.markers);
        let _ = writeln!(self.writer, "  extension: {}", config.extension);
        let _ = writeln!(self.writer, "  recurse: {}", config.recurse);
        let _ = self.writer.flush();
    }

    /// Log when starting to merge a group
    pub(crate) fn log_start(&mut self, position: usize, total: usize, key: &str, members: &[PathBuf]) {
        let _ = writeln!(
            self.writer,
            "[{}] START   [{position}/{total}] \"{key}\" | {} files",
            Self::timestamp(),
            members.len()
        );
        for member in members {
            let _ = writeln!(self.writer, "  {}", member.display());
        }
        let _ = self.writer.flush();
    }

    /// Log the outcome of a group, including the full ffmpeg error output on failure
    pub(crate) fn log_result(&mut self, result: &GroupResult) {
        match &result.outcome {
            MergeOutcome::Succeeded { output } => {
                let _ = writeln!(
                    self.writer,
                    "[{}] SUCCESS \"{}\" | \"{}\"",
                    Self::timestamp(),
                    result.key,
                    output.display()
                );
            }
            MergeOutcome::Failed { reason } => {
                let _ = writeln!(
                    self.writer,
                    "[{}] ERROR   \"{}\" | {}",
                    Self::timestamp(),
                    result.key,
                    reason
                );
                if let FailureReason::Invocation { stderr, .. } = reason {
                    for line in stderr.lines().filter(|line| !line.trim().is_empty()) {
                        let _ = writeln!(self.writer, "  {line}");
                    }
                }
            }
        }
        let _ = self.writer.flush();
    }

    /// Log when the run was cancelled
    pub(crate) fn log_cancelled(&mut self, remaining: usize) {
        let _ = writeln!(
            self.writer,
            "[{}] CANCEL  {remaining} group(s) not attempted",
            Self::timestamp()
        );
        let _ = self.writer.flush();
    }

    /// Log final statistics
    pub(crate) fn log_summary(&mut self, report: &MergeReport, duration: Duration) {
        let _ = writeln!(self.writer, "[{}] SUMMARY", Self::timestamp());
        let _ = writeln!(self.writer, "  Groups merged: {}", report.success_count);
        let _ = writeln!(self.writer, "  Groups failed: {}", report.failed_count());
        let _ = writeln!(self.writer, "  Single files:  {}", report.skipped_count);
        let _ = writeln!(
            self.writer,
            "  Total time: {}",
            video_merge::format_duration(duration)
        );
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
