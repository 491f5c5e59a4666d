//! Short download names, built once at startup.
//!
//! Every file in the tree gets a bare-filename key for `/drop/<name>`
//! lookups. When two files share a base name, later ones (in walk order)
//! get `_1`, `_2`, … inserted before the extension until a free key is
//! found. The table is never refreshed while the process runs: a file
//! added later is reachable by relative path but gains no short name
//! until restart.

use std::collections::HashMap;

use super::index::build_index;
use super::resolve::PathResolver;

/// Immutable mapping from short name to root-relative path.
#[derive(Debug, Default)]
pub struct ShortNames {
    map: HashMap<String, String>,
}

impl ShortNames {
    /// Build the table by walking the whole tree once.
    ///
    /// The first file with a given base name keeps it; later ones are
    /// disambiguated with a numeric suffix.
    pub fn build(resolver: &PathResolver) -> Self {
        let mut map = HashMap::new();
        for entry in build_index(resolver) {
            let short = disambiguate(&map, &entry.name);
            map.insert(short, entry.relpath);
        }
        Self { map }
    }

    /// Look up the relative path registered for a short name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Number of registered short names.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no files were found at startup.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Pick an unused short name for `name`, suffixing `_1`, `_2`, … before
/// the extension on collision.
fn disambiguate(map: &HashMap<String, String>, name: &str) -> String {
    if !map.contains_key(name) {
        return name.to_string();
    }

    let (stem, ext) = split_ext(name);
    let mut i = 1;
    loop {
        let candidate = format!("{}_{}{}", stem, i, ext);
        if !map.contains_key(&candidate) {
            return candidate;
        }
        i += 1;
    }
}

/// Split a file name into stem and extension.
///
/// The extension starts at the last dot, except that leading dots never
/// begin one: `".bashrc"` has no extension, `"archive.tar.gz"` splits as
/// `("archive.tar", ".gz")`.
fn split_ext(name: &str) -> (&str, &str) {
    let stripped = name.trim_start_matches('.');
    match stripped.rfind('.') {
        Some(idx) => name.split_at(name.len() - stripped.len() + idx),
        None => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn build_from(dir: &Path) -> ShortNames {
        let resolver = PathResolver::new(dir).unwrap();
        ShortNames::build(&resolver)
    }

    #[test]
    fn test_unique_names_map_directly() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        fs::write(temp_dir.path().join("sub/b.txt"), "b").unwrap();

        let table = build_from(temp_dir.path());
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a.txt"), Some("a.txt"));
        assert_eq!(table.get("b.txt"), Some("sub/b.txt"));
    }

    #[test]
    fn test_collision_gets_numeric_suffix() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("report.pdf"), "one").unwrap();
        fs::write(temp_dir.path().join("sub/report.pdf"), "two").unwrap();

        let table = build_from(temp_dir.path());

        // Root files are walked first, so the root copy keeps the bare name
        assert_eq!(table.get("report.pdf"), Some("report.pdf"));
        assert_eq!(table.get("report_1.pdf"), Some("sub/report.pdf"));
    }

    #[test]
    fn test_collision_skips_taken_suffixes() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("x.txt"), "1").unwrap();
        fs::write(temp_dir.path().join("x_1.txt"), "2").unwrap();
        fs::write(temp_dir.path().join("sub/x.txt"), "3").unwrap();

        let table = build_from(temp_dir.path());

        assert_eq!(table.get("x.txt"), Some("x.txt"));
        assert_eq!(table.get("x_1.txt"), Some("x_1.txt"));
        assert_eq!(table.get("x_2.txt"), Some("sub/x.txt"));
    }

    #[test]
    fn test_three_way_collision() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        fs::create_dir_all(temp_dir.path().join("b")).unwrap();
        fs::create_dir_all(temp_dir.path().join("c")).unwrap();
        fs::write(temp_dir.path().join("a/notes.md"), "a").unwrap();
        fs::write(temp_dir.path().join("b/notes.md"), "b").unwrap();
        fs::write(temp_dir.path().join("c/notes.md"), "c").unwrap();

        let table = build_from(temp_dir.path());

        assert_eq!(table.get("notes.md"), Some("a/notes.md"));
        assert_eq!(table.get("notes_1.md"), Some("b/notes.md"));
        assert_eq!(table.get("notes_2.md"), Some("c/notes.md"));
    }

    #[test]
    fn test_collision_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("Makefile"), "1").unwrap();
        fs::write(temp_dir.path().join("sub/Makefile"), "2").unwrap();

        let table = build_from(temp_dir.path());

        assert_eq!(table.get("Makefile"), Some("Makefile"));
        assert_eq!(table.get("Makefile_1"), Some("sub/Makefile"));
    }

    #[test]
    fn test_collision_on_dotfile() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join(".env"), "1").unwrap();
        fs::write(temp_dir.path().join("sub/.env"), "2").unwrap();

        let table = build_from(temp_dir.path());

        assert_eq!(table.get(".env"), Some(".env"));
        assert_eq!(table.get(".env_1"), Some("sub/.env"));
    }

    #[test]
    fn test_unknown_name() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();

        let table = build_from(temp_dir.path());
        assert_eq!(table.get("missing.txt"), None);
    }

    #[test]
    fn test_empty_tree() {
        let temp_dir = TempDir::new().unwrap();
        let table = build_from(temp_dir.path());
        assert!(table.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_dir_adds_no_short_names() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub/b.txt"), "bravo").unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("sub"),
            temp_dir.path().join("alias"),
        )
        .unwrap();

        let table = build_from(temp_dir.path());

        // One physical file, one short name; the link must not mint a
        // suffixed duplicate for the same bytes
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("b.txt"), Some("sub/b.txt"));
        assert_eq!(table.get("b_1.txt"), None);
    }

    #[test]
    fn test_split_ext() {
        assert_eq!(split_ext("file.txt"), ("file", ".txt"));
        assert_eq!(split_ext("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_ext("Makefile"), ("Makefile", ""));
        assert_eq!(split_ext(".bashrc"), (".bashrc", ""));
        assert_eq!(split_ext("trailing."), ("trailing", "."));
        assert_eq!(split_ext("..config.yml"), ("..config", ".yml"));
    }
}
