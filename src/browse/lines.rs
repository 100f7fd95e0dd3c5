use std::ops::Range;

use crate::browse::array::EntryKind;
use crate::browse::tree::DirTree;

/// One render-ready line of the browse pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub text: String,
    pub is_dir: bool,
    pub selected: bool,
}

/// Walk the array once, emitting a line per visible entry. Closed
/// directories contribute a single line and skip straight to their
/// `end_index`. Returns the lines and the selected line's position.
pub fn tree_lines(tree: &DirTree, width: usize) -> (Vec<TreeLine>, usize) {
    let mut lines = Vec::new();
    let mut selected_line = 0;
    let array = tree.array();

    let mut i = 0;
    while i < array.len() {
        let entry = &array[i];
        let selected = i == tree.current_index();
        if selected {
            selected_line = lines.len();
        }
        match &entry.kind {
            EntryKind::Directory(meta) => {
                lines.push(TreeLine {
                    text: dir_line(width, entry.depth, &entry.name, meta.expanded(), selected),
                    is_dir: true,
                    selected,
                });
                i = if meta.expanded() { i + 1 } else { meta.end_index };
            }
            EntryKind::Song => {
                lines.push(TreeLine {
                    text: song_line(width, entry.depth, &entry.name, selected),
                    is_dir: false,
                    selected,
                });
                i += 1;
            }
        }
    }
    (lines, selected_line)
}

/// Choose the vertical window into the line list.
///
/// Everything fits, or the selection sits above center: show from the top.
/// Selection within one screen of the end: show the tail. Otherwise center
/// the selection.
pub fn viewport(total: usize, selected: usize, height: usize) -> Range<usize> {
    if total <= height || height == 0 {
        return 0..total;
    }
    let center = height / 2;
    if selected < center {
        0..height
    } else if selected >= total - (height - center) {
        total - height..total
    } else {
        selected - center..selected - center + height
    }
}

fn dir_line(width: usize, indent: usize, name: &str, open: bool, selected: bool) -> String {
    let lead = if selected {
        "=>"
    } else if open {
        "v "
    } else {
        "> "
    };
    format!(
        "{}{}",
        " ".repeat(indent),
        truncate(&format!("{lead}{name}"), width.saturating_sub(indent))
    )
}

fn song_line(width: usize, indent: usize, name: &str, selected: bool) -> String {
    let lead = if selected { "=>" } else { "o " };
    format!(
        "{}{}",
        " ".repeat(indent),
        truncate(&format!("{lead}{name}"), width.saturating_sub(indent))
    )
}

/// Char-boundary-safe truncation to `limit` characters.
fn truncate(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browse::array::BrowseArray;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["mp3".into()]
    }

    /// root(0) > alpha(1) > x.mp3(2), y.mp3(3)
    fn fixture() -> (TempDir, DirTree) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        File::create(dir.path().join("alpha").join("x.mp3")).unwrap();
        File::create(dir.path().join("y.mp3")).unwrap();
        let array = BrowseArray::build(dir.path(), &exts()).unwrap();
        (dir, DirTree::new(array))
    }

    #[test]
    fn closed_directory_renders_one_line() {
        let (_dir, mut tree) = fixture();
        tree.select(0);
        let (lines, selected) = tree_lines(&tree, 80);
        // root is closed when nothing inside it is selected
        assert_eq!(lines.len(), 1);
        assert_eq!(selected, 0);
        assert!(lines[0].text.starts_with("=>"));
    }

    #[test]
    fn prefixes_reflect_state() {
        let (_dir, mut tree) = fixture();
        tree.select(3); // y.mp3: root auto-expands, alpha stays closed
        let (lines, selected) = tree_lines(&tree, 80);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].text.starts_with("v "), "open dir: {}", lines[0].text);
        assert!(lines[1].text.starts_with(" > "), "closed dir: {}", lines[1].text);
        assert!(lines[2].text.starts_with(" =>"), "selection: {}", lines[2].text);
        assert_eq!(selected, 2);
        assert!(lines[1].is_dir);
        assert!(!lines[2].is_dir);
        assert!(lines[2].selected);
    }

    #[test]
    fn songs_get_circle_prefix() {
        let (_dir, mut tree) = fixture();
        tree.select(2); // alpha/x.mp3: both dirs auto-expand
        let (lines, _) = tree_lines(&tree, 80);
        assert_eq!(lines.len(), 4);
        let y_line = &lines[3];
        assert!(y_line.text.trim_start().starts_with("o "), "{}", y_line.text);
    }

    #[test]
    fn indentation_matches_depth() {
        let (_dir, mut tree) = fixture();
        tree.select(2);
        let (lines, _) = tree_lines(&tree, 80);
        assert!(!lines[0].text.starts_with(' '));
        assert!(lines[1].text.starts_with(' ') && !lines[1].text.starts_with("  "));
        assert!(lines[2].text.starts_with("  "));
    }

    #[test]
    fn long_names_truncate_to_width() {
        let (_dir, mut tree) = fixture();
        tree.select(3);
        let (lines, _) = tree_lines(&tree, 6);
        for line in &lines {
            assert!(line.text.chars().count() <= 6 + 2, "{}", line.text);
        }
    }

    #[test]
    fn viewport_fits_entirely() {
        assert_eq!(viewport(5, 3, 10), 0..5);
    }

    #[test]
    fn viewport_selection_above_center() {
        assert_eq!(viewport(100, 2, 10), 0..10);
    }

    #[test]
    fn viewport_selection_near_end_shows_tail() {
        assert_eq!(viewport(100, 97, 10), 90..100);
        assert_eq!(viewport(100, 99, 10), 90..100);
    }

    #[test]
    fn viewport_centers_selection() {
        let range = viewport(100, 50, 10);
        assert_eq!(range, 45..55);
    }

    #[test]
    fn viewport_zero_height() {
        assert_eq!(viewport(100, 50, 0), 0..100);
    }
}
