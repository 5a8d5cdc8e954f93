//! Reference image enumeration.
//!
//! Layout: `root/<set_name>/<number_in_set>.<ext>`. Sets are ordered by
//! name, cards within a set by the numeric value of their file stem. This
//! order is the id assignment order, so it must not depend on how the
//! filesystem happens to list a directory.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CardsightError, Result};

/// One reference card image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub set_name: String,
    pub number_in_set: String,
    pub path: PathBuf,
}

impl ReferenceImage {
    /// Whether the stem is purely decimal digits.
    pub fn has_numeric_stem(&self) -> bool {
        is_numeric(&self.number_in_set)
    }

    fn sort_key(&self) -> u64 {
        non_numeric_sorts_first(&self.number_in_set)
    }
}

fn is_numeric(stem: &str) -> bool {
    !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit())
}

/// Sort key for a card file stem.
///
/// Purely numeric stems sort by value (`"007"` is 7). Anything else sorts as
/// zero, ahead of card number 1. Stems too large for `u64` sort last.
pub fn non_numeric_sorts_first(stem: &str) -> u64 {
    if is_numeric(stem) {
        stem.parse().unwrap_or(u64::MAX)
    } else {
        0
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
}

fn read_dir_names(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| CardsightError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CardsightError::io(dir, e))?;
        let path = entry.path();
        match entry.file_name().into_string() {
            Ok(name) if !is_hidden(&name) => names.push((name, path)),
            Ok(_) => {}
            Err(raw) => warn!(name = ?raw, dir = %dir.display(), "Skipping non UTF-8 entry"),
        }
    }
    Ok(names)
}

/// List every reference image under `root` in id assignment order.
///
/// A missing root is an empty reference set, not an error.
pub fn scan_reference_set(root: &Path, extensions: &[String]) -> Result<Vec<ReferenceImage>> {
    if !root.is_dir() {
        debug!(root = %root.display(), "Reference root not found");
        return Ok(Vec::new());
    }

    let mut sets: Vec<(String, PathBuf)> = read_dir_names(root)?
        .into_iter()
        .filter(|(_, path)| path.is_dir())
        .collect();
    sets.sort_by(|a, b| a.0.cmp(&b.0));

    let mut images = Vec::new();
    for (set_name, set_path) in sets {
        let mut cards: Vec<ReferenceImage> = read_dir_names(&set_path)?
            .into_iter()
            .filter(|(_, path)| path.is_file() && has_extension(path, extensions))
            .filter_map(|(_, path)| {
                let stem = path.file_stem()?.to_str()?.to_string();
                Some(ReferenceImage {
                    set_name: set_name.clone(),
                    number_in_set: stem,
                    path,
                })
            })
            .collect();
        // Equal keys (several non-numeric stems) fall back to the file name.
        cards.sort_by(|a, b| match a.sort_key().cmp(&b.sort_key()) {
            Ordering::Equal => a.path.file_name().cmp(&b.path.file_name()),
            other => other,
        });
        images.extend(cards);
    }

    Ok(images)
}

/// Number of reference images under `root`, without decoding any of them.
pub fn count_reference_images(root: &Path, extensions: &[String]) -> Result<usize> {
    scan_reference_set(root, extensions).map(|images| images.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png() -> Vec<String> {
        vec!["png".to_string()]
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"not decoded during scan").unwrap();
    }

    #[test]
    fn test_non_numeric_sorts_first() {
        assert_eq!(non_numeric_sorts_first("12"), 12);
        assert_eq!(non_numeric_sorts_first("007"), 7);
        assert_eq!(non_numeric_sorts_first("H12"), 0);
        assert_eq!(non_numeric_sorts_first(""), 0);
        assert_eq!(non_numeric_sorts_first("99999999999999999999999"), u64::MAX);
    }

    #[test]
    fn test_scan_orders_sets_and_numbers() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for file in ["zeta/1.png", "alpha/10.png", "alpha/2.png", "alpha/1.png", "alpha/SV01.png"] {
            touch(&root.join(file));
        }

        let images = scan_reference_set(root, &png()).unwrap();
        let order: Vec<_> = images
            .iter()
            .map(|i| format!("{}/{}", i.set_name, i.number_in_set))
            .collect();
        assert_eq!(order, ["alpha/SV01", "alpha/1", "alpha/2", "alpha/10", "zeta/1"]);
        assert!(!images[0].has_numeric_stem());
        assert!(images[1].has_numeric_stem());
    }

    #[test]
    fn test_scan_skips_hidden_and_foreign_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join(".cache/1.png"));
        touch(&root.join("base/.1.png"));
        touch(&root.join("base/1.PNG"));
        touch(&root.join("base/2.jpg"));
        touch(&root.join("base/notes.txt"));
        touch(&root.join("loose.png"));

        let images = scan_reference_set(root, &png()).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].number_in_set, "1");
        assert_eq!(images[0].set_name, "base");
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert_eq!(count_reference_images(&missing, &png()).unwrap(), 0);
    }
}
