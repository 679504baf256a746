//! Walking a target directory for parseable tool output

use crate::parser::SourceFile;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Every file under `root` with a recognized extension, in path order
///
/// Unreadable directory entries are skipped; files whose extension has no
/// parser are ignored.
pub fn discover_files(root: &Path) -> Vec<SourceFile> {
    let files: Vec<SourceFile> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| SourceFile::from_path(e.into_path()))
        .collect();

    debug!(root = %root.display(), files = files.len(), "discovered input files");
    files
}
