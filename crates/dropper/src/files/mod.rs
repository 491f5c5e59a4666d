//! Filesystem views over the serving root.
//!
//! Everything Dropper knows about the tree it serves lives here:
//! - Path resolution that confines untrusted relative paths to the root
//! - One-level directory listings with display metadata
//! - A per-request recursive index with substring search
//! - The startup-computed short-name table for `/drop/` links
//!
//! # Security
//!
//! Every path that reaches the filesystem goes through [`PathResolver`],
//! which canonicalizes the request path and ancestry-checks it against the
//! canonical root. Escaped paths are indistinguishable from missing ones
//! to callers, so nothing outside the root leaks.

pub mod index;
pub mod listing;
pub mod resolve;
pub mod shortname;

pub use index::{build_index, search};
pub use listing::{human_size, list_dir, Entry, Listing, ListingError};
pub use resolve::{PathResolver, ResolveError};
pub use shortname::ShortNames;
