//! Path confinement for untrusted relative paths.
//!
//! Every path that arrives over HTTP is resolved against the serving root
//! and verified to still be inside it before any filesystem operation runs.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while resolving a user-supplied path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolved path escapes the serving root.
    #[error("path escapes the serving root: {0}")]
    OutsideRoot(PathBuf),

    /// The path does not exist under the root.
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),

    /// Permission denied while resolving.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves untrusted root-relative paths against a fixed root directory.
///
/// The root is canonicalized once at construction. Every lookup joins the
/// request path onto it, canonicalizes the result (following symlinks and
/// `..` segments), and checks ancestry component-wise. A sibling directory
/// whose name merely starts with the root's name does not pass.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Canonical root directory every lookup is confined to.
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`, canonicalizing it up front.
    ///
    /// Fails if the root does not exist or cannot be resolved.
    pub fn new(root: &Path) -> Result<Self, ResolveError> {
        let root = fs::canonicalize(root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResolveError::NotFound(root.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ResolveError::PermissionDenied(root.to_path_buf()),
            _ => ResolveError::Io(e),
        })?;
        Ok(Self { root })
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a root-relative path to a verified absolute path.
    ///
    /// The input may contain `..`, `.`, or even absolute segments; after
    /// full resolution the result must be the root itself or a descendant,
    /// otherwise the lookup fails. Callers surface every failure here as a
    /// plain not-found so existence outside the root never leaks.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, ResolveError> {
        let joined = self.root.join(rel);
        let canonical = fs::canonicalize(&joined).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResolveError::NotFound(joined.clone()),
            std::io::ErrorKind::PermissionDenied => ResolveError::PermissionDenied(joined.clone()),
            _ => ResolveError::Io(e),
        })?;

        if !canonical.starts_with(&self.root) {
            return Err(ResolveError::OutsideRoot(canonical));
        }

        Ok(canonical)
    }
}
