//! Expiry-based selection
//!
//! Cache files are named `<id>.<expiresAtMs>.<ext>`; the second
//! dot-delimited field is the expiry as Unix epoch milliseconds.

use crate::types::FileRecord;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Parse the expiry timestamp embedded in a cache file name
pub fn expiry_of(file_name: &str) -> Option<i64> {
    file_name.split('.').nth(1)?.parse().ok()
}

/// Parent directories of every file whose expiry is strictly before `now_ms`.
///
/// Each directory appears once even when several of its files expired.
/// Files with an unparsable name are never selected.
pub fn expired_dirs<'a, I>(root: &Path, files: I, now_ms: i64) -> Vec<PathBuf>
where
    I: IntoIterator<Item = &'a FileRecord>,
{
    let mut dirs = BTreeSet::new();

    for file in files {
        let Some(expires_at) = expiry_of(&file.file_name) else {
            warn!(path = %file.path.display(), "Cannot parse expiry from file name, skipping");
            continue;
        };

        if expires_at >= now_ms {
            continue;
        }

        if file.is_root_level(root) {
            warn!(path = %file.path.display(), "Expired file sits in the cache root, not deleting root");
            continue;
        }

        dirs.insert(file.parent.clone());
    }

    dirs.into_iter().collect()
}
