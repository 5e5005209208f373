//! Input discovery.
//!
//! Expands the paths given on the command line into the list of map images
//! to convert. Files are taken as-is; directories are walked recursively for
//! `.png` files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, TmxError};

/// Expand input paths into image files, in a stable order.
///
/// Explicit files keep their command-line order. Files found by walking a
/// directory are sorted and filtered through the config's exclude patterns.
pub fn discover_images(inputs: &[PathBuf], config: &Config) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();

    for input in inputs {
        if input.is_dir() {
            images.extend(scan_directory(input, config));
        } else if input.exists() {
            images.push(input.clone());
        } else {
            return Err(TmxError::Io {
                path: input.clone(),
                message: "File not found".to_string(),
            });
        }
    }

    images.dedup();
    Ok(images)
}

/// Recursively collect `.png` files under `root`.
pub fn scan_directory(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_png(p) && !config.is_excluded(p))
        .collect();

    found.sort();
    found
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_png() {
        assert!(is_png(Path::new("cave.png")));
        assert!(is_png(Path::new("maps/CAVE.PNG")));
        assert!(!is_png(Path::new("cave.tmx")));
        assert!(!is_png(Path::new("png")));
    }

    #[test]
    fn test_scan_directory() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.png"), b"").unwrap();
        fs::write(dir.path().join("a.png"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(dir.path().join("sub").join("c.png"), b"").unwrap();

        let found = scan_directory(dir.path(), &Config::default());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b.png"),
                PathBuf::from("sub").join("c.png"),
            ]
        );
    }

    #[test]
    fn test_scan_directory_excludes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("cave.png"), b"").unwrap();
        fs::write(dir.path().join("cave-tileset.png"), b"").unwrap();

        let config = Config {
            excludes: vec!["*-tileset.png".to_string()],
            ..Default::default()
        };
        let found = scan_directory(dir.path(), &config);
        assert_eq!(found, vec![dir.path().join("cave.png")]);
    }

    #[test]
    fn test_discover_mixed_inputs() {
        let dir = tempdir().unwrap();
        let maps = dir.path().join("maps");
        fs::create_dir(&maps).unwrap();
        fs::write(maps.join("one.png"), b"").unwrap();
        let single = dir.path().join("single.png");
        fs::write(&single, b"").unwrap();

        let found = discover_images(&[single.clone(), maps.clone()], &Config::default()).unwrap();
        assert_eq!(found, vec![single, maps.join("one.png")]);
    }

    #[test]
    fn test_discover_missing_input() {
        let dir = tempdir().unwrap();
        let result = discover_images(&[dir.path().join("nope.png")], &Config::default());
        assert!(matches!(result, Err(TmxError::Io { .. })));
    }
}
