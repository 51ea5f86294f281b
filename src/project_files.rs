//! Applies `testMatch`/`testIgnore`/CLI file filters/extension filter to a
//! project's collected file list (§4.1, "the caller subsequently applies").

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSetBuilder};

use crate::config::TestFileFilter;
use crate::error::Result;
use crate::model::Project;

const DEFAULT_TEST_MATCH: &str = "**/*.spec.rs";

/// Narrows `collected` down to the files this project actually wants to run:
/// `testMatch` (default `**/*.spec.rs` if unset), minus `testIgnore`, minus
/// anything excluded by a CLI file filter (when any filter targets this
/// project's files at all).
pub fn select_project_files(
    project: &Project,
    collected: &[PathBuf],
    cli_filters: &[TestFileFilter],
) -> Result<Vec<PathBuf>> {
    let match_patterns: Vec<String> = if project.test_match.is_empty() {
        vec![DEFAULT_TEST_MATCH.to_string()]
    } else {
        project.test_match.clone()
    };
    let match_set = build_set(&match_patterns)?;
    let ignore_set = if project.test_ignore.is_empty() {
        None
    } else {
        Some(build_set(&project.test_ignore)?)
    };

    let mut selected: Vec<PathBuf> = collected
        .iter()
        .filter(|f| match_set.is_match(f.as_path()))
        .filter(|f| ignore_set.as_ref().is_none_or(|s| !s.is_match(f.as_path())))
        .cloned()
        .collect();

    if !cli_filters.is_empty() {
        selected.retain(|f| cli_filters.iter().any(|filter| file_pattern_matches(&filter.file_pattern, f)));
    }

    selected.sort();
    Ok(selected)
}

fn build_set(patterns: &[String]) -> Result<globset::GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(false).build()?);
    }
    Ok(builder.build()?)
}

fn file_pattern_matches(pattern: &str, file: &Path) -> bool {
    let file_str = file.to_string_lossy();
    if file_str.contains(pattern) {
        return true;
    }
    GlobBuilder::new(pattern)
        .literal_separator(false)
        .build()
        .map(|g| g.compile_matcher().is_match(file))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::new("chromium", "tests")
    }

    #[test]
    fn default_match_selects_spec_rs_files() {
        let files = vec![PathBuf::from("tests/a.spec.rs"), PathBuf::from("tests/a.rs")];
        let selected = select_project_files(&project(), &files, &[]).unwrap();
        assert_eq!(selected, vec![PathBuf::from("tests/a.spec.rs")]);
    }

    #[test]
    fn test_ignore_removes_matching_files() {
        let mut p = project();
        p.test_ignore = vec!["**/skip/**".to_string()];
        let files = vec![PathBuf::from("tests/a.spec.rs"), PathBuf::from("tests/skip/b.spec.rs")];
        let selected = select_project_files(&p, &files, &[]).unwrap();
        assert_eq!(selected, vec![PathBuf::from("tests/a.spec.rs")]);
    }

    #[test]
    fn cli_filter_narrows_by_substring() {
        let files = vec![PathBuf::from("tests/a.spec.rs"), PathBuf::from("tests/b.spec.rs")];
        let filters = vec![TestFileFilter { file_pattern: "a.spec".to_string(), line: None, column: None }];
        let selected = select_project_files(&project(), &files, &filters).unwrap();
        assert_eq!(selected, vec![PathBuf::from("tests/a.spec.rs")]);
    }
}
