use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary theme directory
pub fn create_test_theme_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a file below the theme directory, creating parent folders
pub fn create_test_file(theme_dir: &TempDir, relative: &str, content: &str) -> PathBuf {
    let file_path = theme_dir.path().join(relative);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&file_path, content).unwrap();
    file_path
}
