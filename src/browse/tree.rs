use crate::browse::array::{BrowseArray, Entry, EntryKind};
use crate::error::{AppError, Result};

/// Cursor, selection, and search state over a [`BrowseArray`].
///
/// Created once at startup and owned for the process lifetime. All mutation
/// happens on the single control-flow thread.
#[derive(Debug)]
pub struct DirTree {
    array: BrowseArray,
    current: usize,
    search: String,
}

impl DirTree {
    pub fn new(array: BrowseArray) -> Self {
        let mut tree = Self {
            array,
            current: 0,
            search: String::new(),
        };
        // Root starts selected; mark its ancestors (none) and itself visible.
        tree.mark_auto_expanded(true);
        tree
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_entry(&self) -> &Entry {
        &self.array[self.current]
    }

    pub fn item_count(&self) -> usize {
        self.array.len()
    }

    pub fn is_in_range(&self, index: usize) -> bool {
        index < self.array.len()
    }

    pub fn entry(&self, index: usize) -> &Entry {
        &self.array[index]
    }

    pub fn array(&self) -> &BrowseArray {
        &self.array
    }

    pub fn depth(&self, index: usize) -> usize {
        self.array[index].depth
    }

    pub fn is_dir(&self, index: usize) -> bool {
        self.array[index].is_dir()
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.array[index].dir().is_some_and(|d| d.expanded())
    }

    /// Move the cursor, transferring auto-expansion from the old selection's
    /// ancestors to the new selection's ancestors.
    pub fn select(&mut self, index: usize) {
        debug_assert!(index < self.array.len());
        self.mark_auto_expanded(false);
        self.current = index;
        self.mark_auto_expanded(true);
    }

    /// Walk upward from the current selection, setting or clearing
    /// `auto_expanded` on every ancestor directory.
    ///
    /// Scanning backward in pre-order, the first entry at each successively
    /// smaller depth is exactly the ancestor at that depth.
    fn mark_auto_expanded(&mut self, value: bool) {
        let mut depth = self.array[self.current].depth;
        let mut i = self.current;
        while i > 0 && depth > 0 {
            i -= 1;
            if self.array[i].depth + 1 == depth {
                depth -= 1;
                if let Some(meta) = self.array[i].dir_mut() {
                    meta.auto_expanded = value;
                }
            }
        }
    }

    /// Select the visually previous entry, skipping over the contents of
    /// collapsed directories.
    ///
    /// Scans backward from `current - 1` with a shrinking minimum depth;
    /// each unexpanded directory seen at a new minimum depth becomes the
    /// candidate target, so a closed subtree counts as a single line.
    pub fn select_up(&mut self) {
        if self.current == 0 {
            return;
        }

        let current_depth = self.array[self.current].depth;
        let mut target = self.current - 1;
        let mut min_depth = self.array[target].depth;

        let mut i = target;
        loop {
            let entry = &self.array[i];
            if entry.depth < current_depth {
                break;
            }
            if entry.depth < min_depth {
                if let EntryKind::Directory(meta) = &entry.kind {
                    min_depth = entry.depth;
                    if !meta.expanded() {
                        target = i;
                    }
                }
            }
            if i == 0 {
                break;
            }
            i -= 1;
        }
        self.select(target);
    }

    /// Select the visually next entry: step past a closed directory's whole
    /// subtree, otherwise advance by one.
    pub fn select_down(&mut self) {
        if self.current + 1 >= self.array.len() {
            return;
        }

        let closed_span = self.array[self.current]
            .dir()
            .filter(|meta| !meta.expanded())
            .map(|meta| meta.end_index);
        match closed_span {
            // A closed final directory has nothing after its span.
            Some(end) if end != self.array.len() => self.select(end),
            Some(_) => {}
            None => self.select(self.current + 1),
        }
    }

    /// Select the directory enclosing `index`. No-op at the root.
    pub fn select_enclosing(&mut self, index: usize) {
        if index == 0 {
            return;
        }
        let target_depth = self.array[index].depth - 1;
        let mut i = index;
        while i > 0 && self.array[i].depth != target_depth {
            i -= 1;
        }
        self.select(i);
    }

    /// Flip `manually_expanded` on a directory entry.
    pub fn toggle(&mut self, index: usize) -> Result<()> {
        match self.array[index].dir_mut() {
            Some(meta) => {
                meta.manually_expanded = !meta.manually_expanded;
                Ok(())
            }
            None => Err(AppError::NotADirectory(self.array[index].name.clone())),
        }
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Scan forward from `from` (inclusive) for an entry whose name contains
    /// the current search term. An empty term matches every entry.
    pub fn next_match(&self, from: usize) -> Option<usize> {
        (from..self.array.len()).find(|&i| self.array[i].name.contains(&self.search))
    }

    /// Scan backward from `from` (inclusive) for an entry whose name
    /// contains the current search term.
    pub fn prev_match(&self, from: usize) -> Option<usize> {
        if from >= self.array.len() {
            return None;
        }
        (0..=from).rev().find(|&i| self.array[i].name.contains(&self.search))
    }
}
