use crate::definition::DESCRIPTOR_FILE;
use relative_path::RelativePathBuf;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid blocks directory: {0}")]
    InvalidBlocksDir(String),
}

/// Read a file by absolute path
pub fn read_path(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}

/// Scan the blocks directory for block descriptors, sorted by path
pub fn discover_blocks(blocks_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    validate_blocks_dir(blocks_root)?;

    let mut descriptors = Vec::new();
    scan_directory_recursive(blocks_root, &mut descriptors)?;
    descriptors.sort();
    Ok(descriptors)
}

/// Paths relative to `root`, sorted, for listing what a bootstrap loaded
pub fn relative_paths(root: &Path, files: &[PathBuf]) -> Vec<RelativePathBuf> {
    let mut relative: Vec<RelativePathBuf> = files
        .iter()
        .filter_map(|file| file.strip_prefix(root).ok())
        .filter_map(|file| RelativePathBuf::from_path(file).ok())
        .collect();
    relative.sort();
    relative
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(name) = path.file_name()
            && name == DESCRIPTOR_FILE
        {
            files.push(path);
        }
    }

    Ok(())
}

pub fn validate_blocks_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidBlocksDir(format!(
            "blocks directory not found: {}",
            path.display()
        )));
    }

    Ok(())
}
