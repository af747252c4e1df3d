//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Remove a file or symlink, if it exists.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    if path.symlink_metadata().is_ok() {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove file: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Copy a file, overwriting the destination. Symlinks are copied as links.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    let meta = src
        .symlink_metadata()
        .with_context(|| format!("failed to stat {}", src.display()))?;

    if meta.file_type().is_symlink() {
        remove_file_if_exists(dst)?;
        let target = fs::read_link(src)
            .with_context(|| format!("failed to read link {}", src.display()))?;
        symlink(&target, dst)
            .with_context(|| format!("failed to link {} to {}", dst.display(), target.display()))?;
    } else {
        fs::copy(src, dst).with_context(|| {
            format!("failed to copy {} to {}", src.display(), dst.display())
        })?;
    }
    Ok(())
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = read_to_string(path)?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse JSON: {}", path.display()))
}

/// Serialize a value as indented JSON with a trailing newline.
pub fn write_json<T: Serialize>(path: &Path, value: &T, indent: usize) -> Result<()> {
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .with_context(|| format!("failed to serialize JSON for {}", path.display()))?;
    buf.push(b'\n');

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, buf).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Find directories matching a glob pattern relative to a base directory.
pub fn glob_dirs(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = base.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let mut results = Vec::new();
    for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))? {
        match entry {
            Ok(path) => {
                if path.is_dir() {
                    results.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    results.sort();
    Ok(results)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Create a symlink (platform-aware).
#[cfg(unix)]
pub fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
pub fn symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}
