use super::File;
use crate::web::preview;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The source directory holds no regular files. Also caught by
    /// validation, but re-checked here since the filesystem may have
    /// changed between validation and load.
    #[error("no files to organize")]
    NoFiles,
    #[error("failed to read source directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Enumerates the regular files under `dir`, recursing into subdirectories
/// when `include_subdirs` is set.
///
/// Files are ordered lexicographically by full path; ids are assigned
/// 1-based in that order and stay stable for the lifetime of the session.
pub fn index_files(dir: &str, include_subdirs: bool) -> Result<Vec<File>, IndexError> {
    let root = Path::new(dir);
    let max_depth = if include_subdirs { usize::MAX } else { 1 };

    let mut files = Vec::new();
    for entry in WalkDir::new(root).max_depth(max_depth) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let meta = entry.metadata()?;
        let path = entry.path();
        files.push(File {
            id: 0, // assigned after sorting
            name: entry.file_name().to_string_lossy().to_string(),
            dir: path
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default(),
            path: path.to_string_lossy().to_string(),
            ext: path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
            size: meta.len(),
            url: preview::file_url(root, path),
        });
    }

    if files.is_empty() {
        return Err(IndexError::NoFiles);
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    for (i, file) in files.iter_mut().enumerate() {
        file.id = i as i64 + 1;
    }

    debug!("indexed {} files under {}", files.len(), dir);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_index_orders_by_path_and_assigns_sequential_ids() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("20.gif"), "bb").unwrap();
        fs::write(dir.path().join("10.gif"), "a").unwrap();

        let files = index_files(&dir.path().to_string_lossy(), false).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, 1);
        assert_eq!(files[0].name, "10.gif");
        assert_eq!(files[0].ext, "gif");
        assert_eq!(files[0].size, 1);
        assert_eq!(files[0].dir, dir.path().to_string_lossy());
        assert_eq!(files[1].id, 2);
        assert_eq!(files[1].name, "20.gif");
        assert_eq!(files[1].size, 2);
    }

    #[test]
    fn test_index_without_subdirs_skips_nested_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("top.txt"), "x").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("nested.txt"), "x").unwrap();

        let files = index_files(&dir.path().to_string_lossy(), false).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "top.txt");

        let files = index_files(&dir.path().to_string_lossy(), true).unwrap();
        assert_eq!(files.len(), 2);
        // Lexicographic full-path order puts sub/nested.txt before top.txt.
        assert_eq!(files[0].name, "nested.txt");
        assert_eq!(files[1].name, "top.txt");
    }

    #[test]
    fn test_index_empty_dir_fails() {
        let dir = tempdir().unwrap();
        let err = index_files(&dir.path().to_string_lossy(), true).unwrap_err();
        assert!(matches!(err, IndexError::NoFiles));
    }

    #[test]
    fn test_preview_urls_are_relative_to_the_source_root() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("pic.gif"), "x").unwrap();

        let files = index_files(&dir.path().to_string_lossy(), true).unwrap();
        assert_eq!(
            files[0].url,
            format!("{}/sub/pic.gif", preview::PREVIEW_BASE_URL)
        );
    }
}
