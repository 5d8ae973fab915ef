//! End-to-end merge run against a fake ffmpeg script.
//!
//! Kept as a single test so the script is never executed while another thread is still writing it.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use video_merge::merge::{
    FailureReason, Ffmpeg, GroupResolver, MANIFEST_PREFIX, MergeEvent, MergeOrchestrator, MergeOutcome,
};

/// Copies the concat list to the output file,
/// or fails like ffmpeg does when the list mentions a broken input.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    echo "ffmpeg version fake"
    exit 0
fi
manifest="$7"
for last; do :; done
if grep -q "broken" "$manifest"; then
    echo "$manifest: Invalid data found when processing input" >&2
    exit 1
fi
cat "$manifest" > "$last"
"#;

fn write_fake_ffmpeg(dir: &Path) -> PathBuf {
    let path = dir.join("ffmpeg");
    fs::write(&path, FAKE_FFMPEG).expect("Failed to write fake ffmpeg");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("Failed to set permissions");
    path
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"video").expect("Failed to create input file");
    path
}

#[test]
fn merges_groups_with_external_binary() {
    let tools = tempdir().unwrap();
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();

    let ffmpeg = Ffmpeg::new(write_fake_ffmpeg(tools.path()));
    ffmpeg.check_available().expect("fake ffmpeg should run");

    let files = vec![
        touch(input.path(), "Trip - 複製 - 複製.mp4"),
        touch(input.path(), "Trip.mp4"),
        touch(input.path(), "Trip - 複製.mp4"),
        touch(input.path(), "broken.mp4"),
        touch(input.path(), "broken - 複製.mp4"),
        touch(input.path(), "Lonely.mp4"),
        touch(input.path(), "it's here.mp4"),
        touch(input.path(), "it's here - 複製.mp4"),
    ];

    let groups = GroupResolver::default().resolve(&files);
    assert_eq!(groups.len(), 4);

    let orchestrator = MergeOrchestrator::new(ffmpeg, "mp4");
    let mut started = Vec::new();
    let report = orchestrator.run(&groups, output.path(), |event| {
        if let MergeEvent::GroupStarted { key, .. } = event {
            started.push((*key).to_string());
        }
    });

    assert_eq!(started, vec!["Trip", "broken", "it's here"]);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.skipped_count, 1);
    assert!(!report.cancelled);

    let trip = fs::read_to_string(output.path().join("Final_Trip.mp4")).expect("Final_Trip.mp4 should exist");
    let lines: Vec<&str> = trip.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("/Trip.mp4'"));
    assert!(lines[1].ends_with("/Trip - 複製.mp4'"));
    assert!(lines[2].ends_with("/Trip - 複製 - 複製.mp4'"));

    let quoted = fs::read_to_string(output.path().join("Final_it's_here.mp4")).expect("quoted output should exist");
    assert!(quoted.contains(r"it'\''s here.mp4'"));

    assert!(!output.path().join("Final_broken.mp4").exists());
    let broken = report
        .results
        .iter()
        .find(|result| result.key == "broken")
        .expect("broken group should be attempted");
    match &broken.outcome {
        MergeOutcome::Failed {
            reason: FailureReason::Invocation { exit_code, stderr },
        } => {
            assert_eq!(*exit_code, Some(1));
            assert!(stderr.contains("Invalid data found when processing input"));
        }
        other => panic!("Unexpected outcome: {other:?}"),
    }
    assert!(broken.log_line().starts_with("Failed [broken]: "));

    let leftovers: Vec<_> = fs::read_dir(output.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(MANIFEST_PREFIX))
        .collect();
    assert!(leftovers.is_empty(), "Concat lists left behind: {leftovers:?}");
}
