//! One-level directory listings with display metadata.
//!
//! Listings power the `/_ls` endpoint: immediate children only, split into
//! directories and files, each with the relative path, a human-readable
//! size (files only), and a local-time mtime string.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use super::resolve::{PathResolver, ResolveError};

/// Errors that can occur while listing a directory.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The path failed resolution or escaped the root.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The target exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One directory or file as rendered in listings and search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Base name of the entry.
    pub name: String,

    /// Root-relative path, forward slashes on every platform.
    pub relpath: String,

    /// Human-readable size; absent for directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Last modification time, `YYYY-MM-DD HH:MM:SS` in local time.
    pub mtime: String,
}

/// Response body for a directory listing.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    /// Immediate child directories, sorted by name.
    pub dirs: Vec<Entry>,

    /// Immediate child files, sorted by name.
    pub files: Vec<Entry>,

    /// The listed path as given, `"."` for the root itself.
    pub cwd: String,
}

/// List the immediate children of the directory at `rel` under the root.
///
/// Children are sorted by name and split into directories and files.
/// Entries that are neither regular files nor directories, and children
/// whose names or metadata cannot be read, are skipped.
pub fn list_dir(resolver: &PathResolver, rel: &str) -> Result<Listing, ListingError> {
    let dir = resolver.resolve(rel)?;

    let metadata = fs::metadata(&dir)?;
    if !metadata.is_dir() {
        return Err(ListingError::NotADirectory(rel.to_string()));
    }

    let mut names = Vec::new();
    for child in fs::read_dir(&dir)? {
        let child = match child {
            Ok(c) => c,
            Err(_) => continue,
        };
        match child.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(_) => continue, // skip non-UTF8 names
        }
    }
    names.sort();

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for name in names {
        let metadata = match fs::metadata(dir.join(&name)) {
            Ok(m) => m,
            Err(_) => continue, // skip unreadable and dangling entries
        };
        let relpath = join_relpath(rel, &name);
        let mtime = format_mtime(&metadata);

        if metadata.is_dir() {
            dirs.push(Entry {
                name,
                relpath,
                size: None,
                mtime,
            });
        } else if metadata.is_file() {
            files.push(Entry {
                name,
                relpath,
                size: Some(human_size(metadata.len())),
                mtime,
            });
        }
    }

    Ok(Listing {
        dirs,
        files,
        cwd: cwd_display(rel),
    })
}

/// Format a byte count with binary-scaled units and one decimal place.
///
/// Units run `B, KB, MB, GB, TB`, dividing by 1024 at each step; anything
/// past `TB` falls back to a `PB`-scaled figure. `0` formats as `"0.0B"`,
/// `1536` as `"1.5KB"`.
pub fn human_size(bytes: u64) -> String {
    let mut n = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if n < 1024.0 {
            return format!("{:.1}{}", n, unit);
        }
        n /= 1024.0;
    }
    format!("{:.1}PB", n)
}

/// Render a metadata mtime as `YYYY-MM-DD HH:MM:SS` in local time.
pub(crate) fn format_mtime(metadata: &fs::Metadata) -> String {
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    DateTime::<Local>::from(modified)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Join a parent relative path and a child name with forward slashes.
pub(crate) fn join_relpath(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() || parent == "." {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// The `cwd` echoed in listing responses: the root shows as `"."`.
fn cwd_display(rel: &str) -> String {
    let trimmed = rel.trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        ".".to_string()
    } else {
        trimmed.to_string()
    }
}
