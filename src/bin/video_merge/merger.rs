use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use itertools::Itertools;
use walkdir::WalkDir;

use video_merge::merge::{
    Ffmpeg, FfmpegLocator, Group, GroupResolver, MergeEvent, MergeOrchestrator, MergeOutcome, MergeReport,
    check_inputs, output_file_name,
};
use video_merge::{print_error, print_warning};

use crate::Args;
use crate::config::{Config, VideoMergeConfig};
use crate::logger::FileLogger;

/// Merges duplicated video parts found in the given inputs.
pub struct VideoMerge {
    config: Config,
}

impl VideoMerge {
    pub fn new(args: Args) -> Result<Self> {
        let user_config = VideoMergeConfig::get_user_config();
        let config = Config::try_from_args(args, user_config)?;
        Ok(Self { config })
    }

    pub fn run(&self) -> Result<()> {
        let files = self.gather_video_files()?;
        let output_dir = check_inputs(&files, self.config.output.as_deref())?;

        if self.config.verbose {
            println!("Found {} video file(s)", files.len());
        }

        let resolver = GroupResolver::new(&self.config.markers);
        let groups = resolver.resolve(&files);
        let mergeable = groups.iter().filter(|group| group.is_mergeable()).count();
        if mergeable == 0 {
            print_warning!("No duplicated videos to merge");
            return Ok(());
        }

        if self.config.dryrun {
            self.print_plan(&groups, &output_dir);
            return Ok(());
        }

        let ffmpeg = self.find_ffmpeg();

        let cancel_flag = Arc::new(AtomicBool::new(false));
        let cancel_flag_handler = Arc::clone(&cancel_flag);
        ctrlc::set_handler(move || {
            if cancel_flag_handler.load(Ordering::SeqCst) {
                std::process::exit(130);
            }
            println!("\n{}", "Received Ctrl+C, finishing current group...".yellow().bold());
            cancel_flag_handler.store(true, Ordering::SeqCst);
        })
        .context("Failed to set Ctrl+C handler")?;

        let mut logger = match FileLogger::new() {
            Ok(logger) => Some(logger),
            Err(error) => {
                print_warning!("Logging to file disabled: {error:#}");
                None
            }
        };
        if let Some(logger) = logger.as_mut() {
            logger.log_init(&self.config, ffmpeg.binary(), &output_dir);
            if self.config.verbose {
                println!("Log file: {}", logger.path().display());
            }
        }

        let start = Instant::now();
        let orchestrator = MergeOrchestrator::new(ffmpeg, &self.config.extension).with_cancel_flag(cancel_flag);
        let report = orchestrator.run(&groups, &output_dir, |event| {
            Self::print_event(event);
            if let Some(logger) = logger.as_mut() {
                match event {
                    MergeEvent::GroupStarted {
                        position,
                        total,
                        key,
                        members,
                    } => logger.log_start(*position, *total, key, members),
                    MergeEvent::GroupFinished(result) => logger.log_result(result),
                    MergeEvent::Cancelled { remaining } => logger.log_cancelled(*remaining),
                }
            }
        });
        let duration = start.elapsed();

        if let Some(logger) = logger.as_mut() {
            logger.log_summary(&report, duration);
        }
        Self::print_summary(&report, duration);

        Ok(())
    }

    /// Collect input video files.
    ///
    /// Files are used as given, directories are scanned for files with an included extension.
    fn gather_video_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in &self.config.paths {
            if path.is_file() {
                files.push(path.clone());
            } else if path.is_dir() {
                files.extend(self.scan_directory(path));
            } else {
                anyhow::bail!("Input path '{}' does not exist or is not accessible", path.display());
            }
        }
        Ok(files.into_iter().unique().collect())
    }

    fn scan_directory(&self, dir: &Path) -> Vec<PathBuf> {
        let max_depth = if self.config.recurse { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !video_merge::is_hidden(entry))
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file() || entry.path().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| self.is_included(path))
            .collect();

        files.sort();
        files
    }

    fn is_included(&self, path: &Path) -> bool {
        let extension = video_merge::path_to_file_extension_string(path).to_lowercase();
        self.config.include.contains(&extension)
    }

    /// Pick the ffmpeg binary and check that it can be run.
    fn find_ffmpeg(&self) -> Ffmpeg {
        if let Some(explicit) = &self.config.ffmpeg
            && !explicit.is_file()
        {
            print_warning!("ffmpeg binary not found: {}", explicit.display());
        }

        let locator = FfmpegLocator::new(self.config.ffmpeg.clone());
        let ffmpeg = match locator.find() {
            Some((source, binary)) => {
                if self.config.verbose {
                    println!("Using ffmpeg from {source}: {}", binary.display());
                }
                Ffmpeg::new(binary)
            }
            None => {
                if self.config.verbose {
                    println!("Using ffmpeg from PATH");
                }
                Ffmpeg::new(locator.locate())
            }
        };

        if let Err(error) = ffmpeg.check_available() {
            print_warning!("{error:#}");
        }

        ffmpeg
    }

    /// Show what would be merged without touching any files.
    fn print_plan(&self, groups: &[Group], output_dir: &Path) {
        let mergeable: Vec<&Group> = groups.iter().filter(|group| group.is_mergeable()).collect();
        let total = mergeable.len();
        println!("{}", format!("Merging {total} group(s)").bold());
        for (index, group) in mergeable.into_iter().enumerate() {
            let output = output_dir.join(output_file_name(group.key(), &self.config.extension));
            println!(
                "{} {}",
                format!("[{}/{total}]", index + 1).bold(),
                group.key().magenta()
            );
            for member in group.ordered_members() {
                println!("  {}", video_merge::path_to_string(&member));
            }
            println!("  {} {}", "→".green(), video_merge::path_to_string(&output));
        }

        let single = groups.len() - total;
        if single > 0 && self.config.verbose {
            println!("Single files: {single}");
        }
    }

    fn print_event(event: &MergeEvent) {
        match event {
            MergeEvent::GroupStarted {
                position,
                total,
                key,
                members,
            } => {
                println!(
                    "{} {} ({} files)",
                    format!("[{position}/{total}]").bold(),
                    key.magenta(),
                    members.len()
                );
            }
            MergeEvent::GroupFinished(result) => match &result.outcome {
                MergeOutcome::Succeeded { .. } => println!("{}", format!("✓ {}", result.log_line()).green()),
                MergeOutcome::Failed { .. } => print_error!("✗ {}", result.log_line()),
            },
            MergeEvent::Cancelled { remaining } => {
                println!("{}", format!("Skipping {remaining} remaining group(s)").yellow());
            }
        }
    }

    fn print_summary(report: &MergeReport, duration: std::time::Duration) {
        if report.cancelled {
            println!("\n{}", "Aborted by user".bold().red());
        }

        println!("\n{}", "Summary".bold());
        println!("  Merged:       {}", report.success_count.to_string().green());
        let failed = report.failed_count();
        if failed > 0 {
            println!("  Failed:       {}", failed.to_string().red());
        } else {
            println!("  Failed:       {failed}");
        }
        println!("  Single files: {}", report.skipped_count);
        println!("  Total time:   {}", video_merge::format_duration(duration));
    }
}
