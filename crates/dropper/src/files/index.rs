//! Recursive file index and substring search.
//!
//! The index is a flat list of every file under the root, rebuilt from
//! scratch on each search request. There is no cache and no incremental
//! update; the trees this serves are small and local, and a stale index
//! would be worse than a slow one.

use std::fs;
use std::path::Path;

use super::listing::{format_mtime, human_size, join_relpath, Entry};
use super::resolve::PathResolver;

/// Walk the whole tree under the root, producing one entry per file.
///
/// Each directory's files are visited before its subdirectories, both in
/// sorted name order, so the sequence is stable for an unchanged tree.
/// Symlinks to files index like ordinary files, but symlinked directories
/// are never descended: every physical file appears exactly once, and a
/// link pointing back into the tree cannot recurse. Unreadable subtrees
/// and non-UTF8 names are skipped rather than failing the walk.
pub fn build_index(resolver: &PathResolver) -> Vec<Entry> {
    let mut out = Vec::new();
    walk(resolver.root(), "", &mut out);
    out
}

fn walk(dir: &Path, rel: &str, out: &mut Vec<Entry>) {
    let read = match fs::read_dir(dir) {
        Ok(r) => r,
        Err(_) => return,
    };

    let mut names = Vec::new();
    for child in read {
        let child = match child {
            Ok(c) => c,
            Err(_) => continue,
        };
        if let Ok(name) = child.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();

    let mut subdirs = Vec::new();
    for name in names {
        let path = dir.join(&name);
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(_) => continue,
        };
        let relpath = join_relpath(rel, &name);

        if metadata.is_dir() {
            // Never descend a symlinked directory; each physical file must
            // index exactly once and a link back into the tree must not
            // recurse
            match fs::symlink_metadata(&path) {
                Ok(m) if !m.file_type().is_symlink() => subdirs.push((path, relpath)),
                _ => {}
            }
        } else if metadata.is_file() {
            out.push(Entry {
                name,
                size: Some(human_size(metadata.len())),
                mtime: format_mtime(&metadata),
                relpath,
            });
        }
    }

    for (path, relpath) in subdirs {
        walk(&path, &relpath, out);
    }
}

/// Case-insensitive substring search over a freshly built index.
///
/// The query is trimmed before matching; an empty or all-whitespace query
/// matches nothing. An entry is a hit when the query occurs in either its
/// bare name or its relative path, both compared lower-cased.
pub fn search(resolver: &PathResolver, query: &str) -> Vec<Entry> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return Vec::new();
    }

    build_index(resolver)
        .into_iter()
        .filter(|e| e.name.to_lowercase().contains(&q) || e.relpath.to_lowercase().contains(&q))
        .collect()
}
