//! Oldest-first selection until a byte excess is covered

use crate::types::FileRecord;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Directories chosen by one capacity pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacitySelection {
    /// Parent directories to delete, oldest first, each once
    pub dirs: Vec<PathBuf>,
    /// Number of files in the selected prefix
    pub files: usize,
    /// Sum of the selected files' sizes
    pub freed: u64,
}

/// Bytes above the limit, or 0 when within budget
pub fn excess(total_size: u64, limit: u64) -> u64 {
    total_size.saturating_sub(limit)
}

/// Greedily take files in ascending creation order until their sizes cover
/// `excess`.
///
/// Overshoot is expected. Files directly in `root` are skipped since their
/// parent is the root itself.
pub fn select_victims(root: &Path, files: &[FileRecord], excess: u64) -> CapacitySelection {
    let mut selection = CapacitySelection::default();
    if excess == 0 {
        return selection;
    }

    let mut ordered: Vec<&FileRecord> = files.iter().filter(|f| !f.is_root_level(root)).collect();
    ordered.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut scheduled = HashSet::new();
    for file in ordered {
        if selection.freed >= excess {
            break;
        }
        if scheduled.insert(file.parent.as_path()) {
            selection.dirs.push(file.parent.clone());
        }
        selection.files += 1;
        selection.freed += file.size;
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record(path: &str, size: u64, age_rank: i64) -> FileRecord {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(age_rank);
        FileRecord::new(PathBuf::from(path), size, created).unwrap()
    }

    #[test]
    fn test_within_budget_selects_nothing() {
        let files = vec![record("/c/a/a.1.jpg", 100, 0), record("/c/b/b.1.jpg", 50, 1)];
        let total: u64 = files.iter().map(|f| f.size).sum();

        let selection = select_victims(Path::new("/c"), &files, excess(total, 150));
        assert_eq!(selection, CapacitySelection::default());

        let selection = select_victims(Path::new("/c"), &files, excess(total, 1000));
        assert!(selection.dirs.is_empty());
        assert_eq!(selection.freed, 0);
    }

    #[test]
    fn test_takes_second_file_when_first_is_short() {
        // total 300, limit 150: 100 < 150 so the 200-byte file goes too
        let files = vec![record("/c/b/b.1.jpg", 200, 1), record("/c/a/a.1.jpg", 100, 0)];
        let selection = select_victims(Path::new("/c"), &files, excess(300, 150));

        assert_eq!(selection.freed, 300);
        assert_eq!(selection.files, 2);
        assert_eq!(
            selection.dirs,
            vec![PathBuf::from("/c/a"), PathBuf::from("/c/b")]
        );
    }

    #[test]
    fn test_stops_at_shortest_sufficient_prefix() {
        let files = vec![
            record("/c/a/a.1.jpg", 60, 0),
            record("/c/b/b.1.jpg", 60, 1),
            record("/c/c/c.1.jpg", 500, 2),
            record("/c/d/d.1.jpg", 10, 3),
        ];
        let selection = select_victims(Path::new("/c"), &files, 100);

        assert_eq!(selection.files, 2);
        assert_eq!(selection.freed, 120);
        assert_eq!(selection.dirs, vec![PathBuf::from("/c/a"), PathBuf::from("/c/b")]);
    }

    #[test]
    fn test_exact_cover_stops() {
        let files = vec![record("/c/a/a.1.jpg", 100, 0), record("/c/b/b.1.jpg", 100, 1)];
        let selection = select_victims(Path::new("/c"), &files, 100);
        assert_eq!(selection.files, 1);
        assert_eq!(selection.dirs, vec![PathBuf::from("/c/a")]);
    }

    #[test]
    fn test_shared_parent_scheduled_once() {
        let files = vec![
            record("/c/a/a.1.jpg", 40, 0),
            record("/c/a/a.1.webp", 40, 1),
            record("/c/b/b.1.jpg", 40, 2),
        ];
        let selection = select_victims(Path::new("/c"), &files, 80);

        assert_eq!(selection.files, 2);
        assert_eq!(selection.freed, 80);
        assert_eq!(selection.dirs, vec![PathBuf::from("/c/a")]);
    }

    #[test]
    fn test_root_level_files_ignored() {
        let files = vec![record("/c/stray.bin", 1000, 0), record("/c/a/a.1.jpg", 10, 1)];
        let selection = select_victims(Path::new("/c"), &files, 5);

        assert_eq!(selection.dirs, vec![PathBuf::from("/c/a")]);
        assert_eq!(selection.freed, 10);
    }

    #[test]
    fn test_excess_saturates() {
        assert_eq!(excess(100, 150), 0);
        assert_eq!(excess(150, 150), 0);
        assert_eq!(excess(300, 150), 150);
    }
}
