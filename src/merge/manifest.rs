//! Concat demuxer manifest files.
//!
//! The manifest lists one member per line as `file '<path>'`.
//! Single quotes inside a path are escaped by closing the quoted string,
//! adding an escaped quote, and reopening it: `'\''`.

use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Filename prefix for manifest files created in the output directory.
pub const MANIFEST_PREFIX: &str = "list_";

/// Filename suffix for manifest files created in the output directory.
pub const MANIFEST_SUFFIX: &str = ".txt";

/// A path that cannot be expressed as a manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedPath {
    pub path: PathBuf,
    pub reason: &'static str,
}

/// Manifest file that lives only for the duration of one ffmpeg invocation.
///
/// The file is removed when [`ConcatManifest::remove`] is called or when the value is dropped.
#[derive(Debug)]
pub struct ConcatManifest {
    file: NamedTempFile,
}

impl ConcatManifest {
    /// Write the manifest contents to a new uniquely named file in the given directory.
    pub fn write(dir: &Path, contents: &str) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(MANIFEST_PREFIX)
            .suffix(MANIFEST_SUFFIX)
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create manifest file in {}", dir.display()))?;

        let mut writer = BufWriter::new(file.as_file());
        writer
            .write_all(contents.as_bytes())
            .and_then(|()| writer.flush())
            .with_context(|| format!("Failed to write manifest file {}", file.path().display()))?;
        drop(writer);

        Ok(Self { file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the manifest file.
    pub fn remove(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .with_context(|| format!("Failed to remove manifest file {}", path.display()))
    }
}

impl fmt::Display for UnsupportedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported path for concat manifest ({}): {}", self.reason, self.path.display())
    }
}

impl std::error::Error for UnsupportedPath {}

/// Format a single manifest line for the given path, including the trailing newline.
///
/// ```rust
/// use std::path::Path;
/// use video_merge::merge::manifest_line;
///
/// let line = manifest_line(Path::new("/videos/it's.mp4")).unwrap();
/// assert_eq!(line, "file '/videos/it'\\''s.mp4'\n");
/// ```
pub fn manifest_line(path: &Path) -> Result<String, UnsupportedPath> {
    let unsupported = |reason| UnsupportedPath {
        path: path.to_path_buf(),
        reason,
    };

    let path_str = path.to_str().ok_or_else(|| unsupported("not valid UTF-8"))?;
    if path_str.contains(['\n', '\r']) {
        return Err(unsupported("contains a line break"));
    }
    if path_str.contains('\0') {
        return Err(unsupported("contains a null character"));
    }

    let escaped = path_str.replace('\'', r"'\''");
    Ok(format!("file '{escaped}'\n"))
}

/// Build the full manifest contents for the given members in order.
///
/// Relative paths are made absolute since ffmpeg resolves them relative to the manifest location.
pub fn manifest_text(members: &[PathBuf]) -> Result<String, UnsupportedPath> {
    members
        .iter()
        .map(|member| {
            let absolute = std::path::absolute(member).map_err(|_| UnsupportedPath {
                path: member.clone(),
                reason: "cannot be made absolute",
            })?;
            manifest_line(dunce::simplified(&absolute)).map_err(|error| UnsupportedPath {
                path: member.clone(),
                ..error
            })
        })
        .collect()
}
