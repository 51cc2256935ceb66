//! Workbook discovery under a site directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use log::debug;
use pandora_workbook::derive_folder_name;

use crate::spec::{IngestError, SpecDiscoverOptions, SpecWorkbookFile};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

fn _compile(patterns: &[String]) -> Result<Vec<GlobMatcher>, IngestError> {
    let mut l_glob = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let matcher = Glob::new(pattern)
            .map_err(|e| IngestError::InvalidPattern(e.to_string()))?
            .compile_matcher();
        l_glob.push(matcher);
    }
    Ok(l_glob)
}

fn _is_pattern_matching(value: &str, patterns: &[GlobMatcher]) -> bool {
    patterns.iter().any(|p| p.is_match(value))
}

fn _io_error(path: &Path, err: std::io::Error) -> IngestError {
    IngestError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Discover

/// Collect workbook files below `dir`, sorted by path.
///
/// A file is kept when its basename matches an include pattern and no
/// exclude pattern. Directories deeper than `depth_limit` are not entered.
pub fn discover_workbooks(
    dir: impl AsRef<Path>,
    options: &SpecDiscoverOptions,
) -> Result<Vec<SpecWorkbookFile>, IngestError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound(dir.to_path_buf()));
    }
    let l_include = _compile(&options.patterns_include)?;
    let l_exclude = _compile(&options.patterns_exclude)?;

    let mut l_files = Vec::new();
    let mut l_stack: Vec<(PathBuf, usize)> = vec![(dir.to_path_buf(), 0)];
    while let Some((path_dir, n_depth)) = l_stack.pop() {
        let entries = fs::read_dir(&path_dir).map_err(|e| _io_error(&path_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| _io_error(&path_dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                if options.depth_limit.is_none_or(|n| n_depth < n) {
                    l_stack.push((path, n_depth + 1));
                }
                continue;
            }
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !_is_pattern_matching(name, &l_include) || _is_pattern_matching(name, &l_exclude) {
                continue;
            }
            let workbook_name = name.to_string();
            let folder_name = derive_folder_name(&path).unwrap_or_default();
            l_files.push(SpecWorkbookFile {
                path,
                workbook_name,
                folder_name,
            });
        }
    }

    l_files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Discovered {} workbooks under {}", l_files.len(), dir.display());
    Ok(l_files)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestDir, write_text};

    #[test]
    fn discover_filters_lock_files_and_sorts() {
        let tmp = TestDir::new();
        let dir = tmp.path().join("CUH");
        write_text(&dir.join("b.xlsx"), "x");
        write_text(&dir.join("a.xlsx"), "x");
        write_text(&dir.join("~$a.xlsx"), "x");
        write_text(&dir.join("notes.txt"), "x");
        write_text(&dir.join("old/c.xlsx"), "x");

        let l_files = discover_workbooks(&dir, &SpecDiscoverOptions::default()).unwrap();
        let l_names: Vec<&str> = l_files.iter().map(|f| f.workbook_name.as_str()).collect();
        assert_eq!(l_names, vec!["a.xlsx", "b.xlsx"]);
        assert!(l_files.iter().all(|f| f.folder_name == "CUH"));
    }

    #[test]
    fn discover_descends_without_depth_limit() {
        let tmp = TestDir::new();
        write_text(&tmp.path().join("NUH/wb_1.xlsx"), "x");
        write_text(&tmp.path().join("CUH/wb_2.xlsx"), "x");

        let options = SpecDiscoverOptions {
            depth_limit: None,
            ..Default::default()
        };
        let l_files = discover_workbooks(tmp.path(), &options).unwrap();
        let l_folders: Vec<&str> = l_files.iter().map(|f| f.folder_name.as_str()).collect();
        assert_eq!(l_folders, vec!["CUH", "NUH"]);
    }

    #[test]
    fn discover_missing_directory_is_error() {
        let tmp = TestDir::new();
        let err = discover_workbooks(tmp.path().join("absent"), &SpecDiscoverOptions::default())
            .unwrap_err();
        assert!(matches!(err, IngestError::DirectoryNotFound(_)));
    }

    #[test]
    fn discover_invalid_pattern_is_error() {
        let tmp = TestDir::new();
        let options = SpecDiscoverOptions {
            patterns_include: vec!["[".to_string()],
            ..Default::default()
        };
        let err = discover_workbooks(tmp.path(), &options).unwrap_err();
        assert!(matches!(err, IngestError::InvalidPattern(_)));
    }
}
