//! Path validation for session directories.

use std::path::Path;

use crate::config::Config;

/// Check if metadata indicates a valid directory (pure function).
/// Returns an error message if validation fails, None if valid.
fn check_directory_metadata(is_dir: bool) -> Option<String> {
    if !is_dir {
        Some("Path is not a directory".to_string())
    } else {
        None
    }
}

/// Convert an I/O error to an appropriate error message for directory validation.
fn directory_error_message(error: &std::io::Error) -> String {
    match error.kind() {
        std::io::ErrorKind::NotFound => "Directory not found".to_string(),
        std::io::ErrorKind::PermissionDenied => "Cannot access directory".to_string(),
        _ => "Invalid path".to_string(),
    }
}

/// Validate that a path points to an existing directory.
/// Returns an error message if validation fails, None if valid.
pub fn validate_directory_exists(path: &str) -> Option<String> {
    if path.is_empty() {
        return Some("Path cannot be empty".to_string());
    }

    let expanded = Config::expand_tilde(path);

    match std::fs::metadata(&expanded) {
        Ok(metadata) => check_directory_metadata(metadata.is_dir()),
        Err(e) => Some(directory_error_message(&e)),
    }
}

/// Check the configured tier and entity locations under a session root.
///
/// Returns one message per problem. An empty session still works (nothing is
/// loaded), so callers report these as warnings.
pub fn validate_session_layout(root: &Path, config: &Config) -> Vec<String> {
    let tiers = &config.tiers;
    let mut problems = Vec::new();

    for entry in tiers.always.iter().chain(&tiers.periodic) {
        if !Config::resolve(root, entry).exists() {
            problems.push(format!("{}: Path not found", entry));
        }
    }

    let mut found_entity_dir = false;
    for entry in &tiers.entity_dirs {
        let dir = Config::resolve(root, entry);
        match std::fs::metadata(&dir) {
            Ok(metadata) => {
                if let Some(problem) = check_directory_metadata(metadata.is_dir()) {
                    problems.push(format!("{}: {}", entry, problem));
                } else {
                    found_entity_dir = true;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => problems.push(format!("{}: {}", entry, directory_error_message(&e))),
        }
    }
    if !found_entity_dir {
        problems.push("No entity directory found".to_string());
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // Tests for check_directory_metadata (pure function)

    #[test]
    fn test_check_directory_metadata_valid_directory() {
        let result = check_directory_metadata(true);
        assert_eq!(result, None);
    }

    #[test]
    fn test_check_directory_metadata_not_a_directory() {
        let result = check_directory_metadata(false);
        assert_eq!(result, Some("Path is not a directory".to_string()));
    }

    // Tests for directory_error_message (pure function)

    #[test]
    fn test_directory_error_message_not_found() {
        let error = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        assert_eq!(directory_error_message(&error), "Directory not found");
    }

    #[test]
    fn test_directory_error_message_permission_denied() {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(directory_error_message(&error), "Cannot access directory");
    }

    #[test]
    fn test_validate_directory_exists() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.md");
        fs::write(&file, "x").unwrap();

        assert_eq!(validate_directory_exists(""), Some("Path cannot be empty".to_string()));
        assert_eq!(validate_directory_exists(dir.path().to_str().unwrap()), None);
        assert_eq!(
            validate_directory_exists(file.to_str().unwrap()),
            Some("Path is not a directory".to_string())
        );
        assert_eq!(
            validate_directory_exists(dir.path().join("missing").to_str().unwrap()),
            Some("Directory not found".to_string())
        );
    }

    // Tests for validate_session_layout

    #[test]
    fn test_validate_session_layout_complete() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["core", "guidelines", "characters"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        assert!(validate_session_layout(dir.path(), &Config::default()).is_empty());
    }

    #[test]
    fn test_validate_session_layout_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let problems = validate_session_layout(dir.path(), &Config::default());
        assert_eq!(
            problems,
            vec![
                "core: Path not found".to_string(),
                "guidelines: Path not found".to_string(),
                "No entity directory found".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_session_layout_entity_path_is_file() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["core", "guidelines", "characters"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        fs::write(dir.path().join("entities"), "oops").unwrap();
        let problems = validate_session_layout(dir.path(), &Config::default());
        assert_eq!(problems, vec!["entities: Path is not a directory".to_string()]);
    }
}
