//! Group input files by their duplicate-stripped base name.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Duplicate marker appended by Windows Explorer with a Traditional Chinese locale.
pub const DEFAULT_MARKER: &str = " - 複製";

/// Files that share the same base name.
///
/// Members are kept in arrival order.
/// Use [`Group::ordered_members`] for the concatenation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    key: String,
    members: Vec<PathBuf>,
}

/// Maps input files to groups by stripping duplicate markers from the file stem.
#[derive(Debug, Clone)]
pub struct GroupResolver {
    markers: Vec<String>,
}

impl Group {
    fn new(key: String) -> Self {
        Self {
            key,
            members: Vec::new(),
        }
    }

    /// Shared base name of the members.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Members in the order they were given.
    #[must_use]
    pub fn members(&self) -> &[PathBuf] {
        &self.members
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A single file has nothing to be merged with.
    #[must_use]
    pub const fn is_mergeable(&self) -> bool {
        self.members.len() >= 2
    }

    /// Members in concatenation order: shortest filename first, then alphabetical.
    #[must_use]
    pub fn ordered_members(&self) -> Vec<PathBuf> {
        let mut members = self.members.clone();
        members.sort_by(|a, b| member_order(a, b));
        members
    }
}

impl Default for GroupResolver {
    fn default() -> Self {
        Self::new([DEFAULT_MARKER])
    }
}

impl GroupResolver {
    /// Create a resolver that strips the given duplicate markers.
    ///
    /// Empty markers are ignored since they would match everywhere.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers = markers
            .into_iter()
            .map(Into::into)
            .filter(|marker: &String| !marker.is_empty())
            .collect();

        Self { markers }
    }

    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Derive the group key for a single file.
    ///
    /// Markers are removed until none remain,
    /// so a copy of a copy ends up in the same group as the original.
    /// The file stem is composed to NFC first, so names that only differ in
    /// Unicode normalization form (macOS stores NFD) share a key.
    /// Keys are otherwise compared exactly and case-sensitively.
    ///
    /// ```rust
    /// use std::path::Path;
    /// use video_merge::merge::GroupResolver;
    ///
    /// let resolver = GroupResolver::default();
    /// assert_eq!(resolver.group_key(Path::new("clip - 複製 - 複製.mp4")), "clip");
    /// assert_eq!(resolver.group_key(Path::new("clip.mp4")), "clip");
    /// ```
    #[must_use]
    pub fn group_key(&self, path: &Path) -> String {
        let mut name = crate::path_to_normalized_file_stem(path);
        while let Some(marker) = self.markers.iter().find(|marker| name.contains(marker.as_str())) {
            name = name.replace(marker.as_str(), "");
        }
        name.trim().to_string()
    }

    /// Partition the given paths into groups.
    ///
    /// Groups are returned in the order their key was first seen,
    /// and each path ends up in exactly one group.
    #[must_use]
    pub fn resolve(&self, paths: &[PathBuf]) -> Vec<Group> {
        let mut groups: Vec<Group> = Vec::new();
        let mut index_for_key: HashMap<String, usize> = HashMap::new();

        for path in paths {
            let key = self.group_key(path);
            let index = *index_for_key.entry(key).or_insert_with_key(|key| {
                groups.push(Group::new(key.clone()));
                groups.len() - 1
            });
            groups[index].members.push(path.clone());
        }

        groups
    }
}

/// Concatenation order for group members.
///
/// Compares filename length in characters, then the filename itself,
/// so the original file sorts before its copies.
/// The full path is the final tie-break for identical names in different directories.
#[must_use]
pub fn member_order(a: &Path, b: &Path) -> Ordering {
    let name_a = crate::path_to_filename_string(a);
    let name_b = crate::path_to_filename_string(b);
    name_a
        .chars()
        .count()
        .cmp(&name_b.chars().count())
        .then_with(|| name_a.cmp(&name_b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn keys(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(Group::key).collect()
    }

    #[test]
    fn strips_single_marker() {
        let resolver = GroupResolver::default();
        assert_eq!(resolver.group_key(Path::new("/videos/A - 複製.mp4")), "A");
    }

    #[test]
    fn strips_repeated_markers() {
        let resolver = GroupResolver::default();
        assert_eq!(resolver.group_key(Path::new("clip - 複製 - 複製.mp4")), "clip");
        assert_eq!(resolver.group_key(Path::new("clip - 複製 - 複製 - 複製.mov")), "clip");
        assert_eq!(
            resolver.group_key(Path::new("clip - 複製 - 複製.mp4")),
            resolver.group_key(Path::new("clip.mp4"))
        );
    }

    #[test]
    fn strips_marker_formed_by_previous_removal() {
        let resolver = GroupResolver::default();
        // Removing the inner marker joins the outer halves into a new marker.
        assert_eq!(resolver.group_key(Path::new("clip - 複 - 複製製.mp4")), "clip");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let resolver = GroupResolver::default();
        assert_eq!(resolver.group_key(Path::new("  clip  - 複製.mp4")), "clip");
    }

    #[test]
    fn marker_only_name_gives_empty_key() {
        let resolver = GroupResolver::default();
        assert_eq!(resolver.group_key(Path::new(" - 複製.mp4")), "");

        let groups = resolver.resolve(&paths(&[" - 複製.mp4", " - 複製 - 複製.mp4"]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key(), "");
        assert!(groups[0].is_mergeable());
    }

    #[test]
    fn keys_are_case_sensitive() {
        let resolver = GroupResolver::default();
        let groups = resolver.resolve(&paths(&["clip.mp4", "Clip.mp4"]));
        assert_eq!(keys(&groups), vec!["clip", "Clip"]);
    }

    #[test]
    fn decomposed_and_composed_names_share_a_key() {
        let resolver = GroupResolver::default();
        let groups = resolver.resolve(&paths(&["Ka\u{0308}rnten.mp4", "K\u{00e4}rnten - 複製.mp4"]));
        assert_eq!(keys(&groups), vec!["K\u{00e4}rnten"]);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn uses_configured_markers() {
        let resolver = GroupResolver::new([" - Copy", " (copy)"]);
        assert_eq!(resolver.group_key(Path::new("clip - Copy (copy).mp4")), "clip");
        assert_eq!(resolver.group_key(Path::new("clip - 複製.mp4")), "clip - 複製");
    }

    #[test]
    fn ignores_empty_markers() {
        let resolver = GroupResolver::new(["", " - 複製"]);
        assert_eq!(resolver.markers(), [" - 複製"]);
        assert_eq!(resolver.group_key(Path::new("clip - 複製.mp4")), "clip");
    }

    #[test]
    fn only_the_last_extension_is_removed() {
        let resolver = GroupResolver::default();
        assert_eq!(resolver.group_key(Path::new("part.one - 複製.mp4")), "part.one");
    }

    #[test]
    fn resolves_scenario_groups() {
        let resolver = GroupResolver::default();
        let groups = resolver.resolve(&paths(&["A.mp4", "A - 複製.mp4", "B.mp4"]));

        assert_eq!(keys(&groups), vec!["A", "B"]);
        assert_eq!(groups[0].members(), paths(&["A.mp4", "A - 複製.mp4"]).as_slice());
        assert_eq!(groups[1].members(), paths(&["B.mp4"]).as_slice());
        assert!(groups[0].is_mergeable());
        assert!(!groups[1].is_mergeable());
    }

    #[test]
    fn every_path_lands_in_exactly_one_group() {
        let resolver = GroupResolver::default();
        let input = paths(&[
            "/a/x.mp4",
            "/a/y - 複製.mp4",
            "/b/x - 複製.mp4",
            "/b/y.mp4",
            "/c/z.mkv",
            "/c/x - 複製 - 複製.avi",
        ]);
        let groups = resolver.resolve(&input);

        let total: usize = groups.iter().map(Group::len).sum();
        assert_eq!(total, input.len());
        for path in &input {
            let count = groups.iter().filter(|group| group.members().contains(path)).count();
            assert_eq!(count, 1, "{} should be in exactly one group", path.display());
        }
    }

    #[test]
    fn members_keep_arrival_order() {
        let resolver = GroupResolver::default();
        let groups = resolver.resolve(&paths(&["x - 複製.mp4", "x.mp4"]));
        assert_eq!(groups[0].members(), paths(&["x - 複製.mp4", "x.mp4"]).as_slice());
    }

    #[test]
    fn ordered_members_sort_by_length_then_name() {
        let resolver = GroupResolver::default();
        let groups = resolver.resolve(&paths(&[
            "/v/clip - 複製 - 複製.mp4",
            "/v/clip - 複製.mp4",
            "/v/clip.mp4",
            "/v/clip.mkv",
        ]));
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].ordered_members(),
            paths(&[
                "/v/clip.mkv",
                "/v/clip.mp4",
                "/v/clip - 複製.mp4",
                "/v/clip - 複製 - 複製.mp4"
            ])
        );
    }

    #[test]
    fn ordering_counts_characters_not_bytes() {
        // "複製" is six bytes in UTF-8 but two characters.
        let short = Path::new("複製.mp4");
        let long = Path::new("abcd.mp4");
        assert_eq!(member_order(short, long), Ordering::Less);
    }

    #[test]
    fn ordering_breaks_ties_by_full_path() {
        let a = Path::new("/a/clip.mp4");
        let b = Path::new("/b/clip.mp4");
        assert_eq!(member_order(a, b), Ordering::Less);
        assert_eq!(member_order(b, a), Ordering::Greater);
        assert_eq!(member_order(a, a), Ordering::Equal);
    }

    #[test]
    fn resolution_is_deterministic() {
        let resolver = GroupResolver::default();
        let input = paths(&["b - 複製.mp4", "a.mp4", "b.mp4", "a - 複製.mp4", "c.mp4"]);

        let first = resolver.resolve(&input);
        let second = resolver.resolve(&input);
        assert_eq!(first, second);
        assert_eq!(keys(&first), vec!["b", "a", "c"]);

        let first_order: Vec<_> = first.iter().map(Group::ordered_members).collect();
        let second_order: Vec<_> = second.iter().map(Group::ordered_members).collect();
        assert_eq!(first_order, second_order);
    }

    #[test]
    fn empty_input_gives_no_groups() {
        let resolver = GroupResolver::default();
        assert!(resolver.resolve(&[]).is_empty());
    }
}
