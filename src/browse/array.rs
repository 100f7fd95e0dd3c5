use std::fs;
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Media-file suffixes included in the catalog when the config does not
/// override them.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "oga", "opus", "wav", "m4a", "aac", "wma", "mka",
];

/// Expansion and span metadata carried by every directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirMeta {
    /// User toggled this directory open.
    pub manually_expanded: bool,
    /// An entry inside this directory is currently selected.
    pub auto_expanded: bool,
    /// Index of the previous directory at the same depth under the same
    /// parent, if any.
    pub prev_sibling_dir: Option<usize>,
    /// Exclusive index one past the last descendant.
    pub end_index: usize,
    /// Raw directory-entry count after extension filtering.
    pub child_count: usize,
}

impl DirMeta {
    /// A directory is open for rendering and traversal if either flag is set.
    pub fn expanded(&self) -> bool {
        self.manually_expanded || self.auto_expanded
    }
}

/// What an entry is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory(DirMeta),
    Song,
}

/// One node in the flattened browse structure.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    /// Distance from the root entry; the root itself is 0.
    pub depth: usize,
    pub kind: EntryKind,
}

impl Entry {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory(_))
    }

    pub fn dir(&self) -> Option<&DirMeta> {
        match &self.kind {
            EntryKind::Directory(meta) => Some(meta),
            EntryKind::Song => None,
        }
    }

    pub fn dir_mut(&mut self) -> Option<&mut DirMeta> {
        match &mut self.kind {
            EntryKind::Directory(meta) => Some(meta),
            EntryKind::Song => None,
        }
    }
}

/// Pre-order, index-addressed flattening of a directory tree.
///
/// Invariant: for every directory entry at index `i`, all entries in
/// `[i + 1, end_index)` are its descendants and no entry outside that range
/// is. Subtree slicing is therefore a plain range check.
#[derive(Debug)]
pub struct BrowseArray {
    entries: Vec<Entry>,
}

impl BrowseArray {
    /// Build the array by recursively listing `root`, then compute every
    /// directory's `end_index` and sibling links in a second pass.
    ///
    /// Fails with [`AppError::MalformedTree`] if a computed span runs past
    /// the end of the array.
    pub fn build(root: &Path, extensions: &[String]) -> Result<Self> {
        let mut entries = Vec::new();
        scan_directory(root, 0, extensions, &mut entries)?;
        let mut array = Self { entries };
        array.link_spans(0)?;
        Ok(array)
    }

    /// Construct directly from entries, still running the span pass.
    /// Used by tests that hand-build malformed input.
    #[cfg(test)]
    pub fn from_entries(entries: Vec<Entry>) -> Result<Self> {
        let mut array = Self { entries };
        array.link_spans(0)?;
        Ok(array)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Walk the subtree rooted at `dir_index`, filling in `end_index` and
    /// `prev_sibling_dir`. Returns the number of descendants.
    fn link_spans(&mut self, dir_index: usize) -> Result<usize> {
        let (depth, child_count) = match &self.entries[dir_index] {
            Entry {
                depth,
                kind: EntryKind::Directory(meta),
                ..
            } => (*depth, meta.child_count),
            entry => {
                return Err(AppError::MalformedTree(format!(
                    "span pass reached non-directory entry {}",
                    entry.path.display()
                )))
            }
        };

        // The naive end is off whenever a subdirectory is non-empty; each
        // recursive call widens it by that subtree's descendant count.
        let mut end = dir_index + child_count + 1;
        let mut i = dir_index + 1;
        while i < end {
            if self.entries.get(i).is_some_and(Entry::is_dir) {
                let descendants = self.link_spans(i)?;
                end += descendants;
                i += 1 + descendants;
            } else {
                i += 1;
            }
        }

        if end > self.entries.len() {
            return Err(AppError::MalformedTree(format!(
                "directory {} spans to {} but the array has {} entries",
                self.entries[dir_index].path.display(),
                end,
                self.entries.len()
            )));
        }

        if let Some(meta) = self.entries[dir_index].dir_mut() {
            meta.end_index = end;
        }
        if end < self.entries.len() && self.entries[end].depth == depth {
            if let Some(meta) = self.entries[end].dir_mut() {
                meta.prev_sibling_dir = Some(dir_index);
            }
        }

        Ok(end - dir_index - 1)
    }
}

impl Index<usize> for BrowseArray {
    type Output = Entry;

    fn index(&self, index: usize) -> &Entry {
        &self.entries[index]
    }
}

impl IndexMut<usize> for BrowseArray {
    fn index_mut(&mut self, index: usize) -> &mut Entry {
        &mut self.entries[index]
    }
}

/// Recursively append `root` and its contents in pre-order: the directory
/// itself, subdirectories in lexicographic order, then matching files in
/// lexicographic order.
fn scan_directory(
    root: &Path,
    depth: usize,
    extensions: &[String],
    out: &mut Vec<Entry>,
) -> Result<()> {
    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();

    let dir_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string_lossy().to_string());

    let dir_position = out.len();
    out.push(Entry {
        name: dir_name,
        path: root.to_path_buf(),
        depth,
        kind: EntryKind::Directory(DirMeta {
            child_count: names.len(),
            ..DirMeta::default()
        }),
    });

    let mut filtered = 0usize;
    for name in &names {
        let path = root.join(name);
        if path.is_dir() {
            scan_directory(&path, depth + 1, extensions, out)?;
        }
    }
    for name in &names {
        let path = root.join(name);
        if path.is_dir() {
            continue;
        }
        if matches_extension(&path, extensions) {
            out.push(Entry {
                name: name.clone(),
                path,
                depth: depth + 1,
                kind: EntryKind::Song,
            });
        } else {
            // Keep child_count consistent with what actually landed in the
            // array, otherwise the span pass would overrun.
            filtered += 1;
        }
    }

    if let Some(meta) = out[dir_position].dir_mut() {
        meta.child_count -= filtered;
    }
    Ok(())
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
}
