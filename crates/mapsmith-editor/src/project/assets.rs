use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProjectError, ProjectResult};

/// Every `.png` under `root` (extension case-insensitive), sorted by path.
///
/// Entries whose file name is listed in `ignore` are skipped, directories
/// and files alike. Linked directories are not followed.
pub fn scan_png_assets(root: &Path, ignore: &[String]) -> ProjectResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(root, ignore, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(dir: &Path, ignore: &[String], found: &mut Vec<PathBuf>) -> ProjectResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| ProjectError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| ProjectError::io(dir, e))?;
        let path = entry.path();

        let name = entry.file_name();
        if ignore.iter().any(|i| name.to_string_lossy() == i.as_str()) {
            log::debug!("asset scan skips {}", path.display());
            continue;
        }

        let file_type = entry.file_type().map_err(|e| ProjectError::io(&path, e))?;
        if file_type.is_dir() {
            walk(&path, ignore, found)?;
        } else if file_type.is_symlink() {
            // Linked files count; linked directories are not followed.
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() && is_png(&path) => found.push(path),
                Ok(meta) if meta.is_dir() => {
                    log::debug!("asset scan skips linked directory {}", path.display())
                }
                Ok(_) => {}
                Err(e) => log::warn!("asset scan skips broken link {}: {e}", path.display()),
            }
        } else if is_png(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn collects_pngs_recursively_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Sprites/b.png");
        touch(root, "Sprites/a.PNG");
        touch(root, "Sprites/a.png.meta");
        touch(root, "Tiles/deep/c.png");
        touch(root, "readme.txt");

        let found = scan_png_assets(root, &[]).unwrap();
        let rel: Vec<_> = found.iter().map(|p| p.strip_prefix(root).unwrap()).collect();
        assert_eq!(
            rel,
            [
                Path::new("Sprites/a.PNG"),
                Path::new("Sprites/b.png"),
                Path::new("Tiles/deep/c.png"),
            ]
        );
    }

    #[test]
    fn ignored_names_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "TextMesh Pro/Fonts/atlas.png");
        touch(root, "Sprites/hero.png");
        touch(root, "Sprites/skip.png");

        let ignore = ["TextMesh Pro".to_string(), "skip.png".to_string()];
        let found = scan_png_assets(root, &ignore).unwrap();
        assert_eq!(found, [root.join("Sprites/hero.png")]);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            scan_png_assets(&dir.path().join("Assets"), &[]),
            Err(ProjectError::Io { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn linked_directories_are_not_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Sprites/a.png");
        touch(root, "Shared/b.png");
        symlink(root, root.join("Sprites/loop")).unwrap();
        symlink(root.join("Shared/b.png"), root.join("Sprites/b.png")).unwrap();
        symlink(root.join("missing.png"), root.join("Sprites/broken.png")).unwrap();

        let found = scan_png_assets(root, &[]).unwrap();
        let rel: Vec<_> = found.iter().map(|p| p.strip_prefix(root).unwrap()).collect();
        assert_eq!(
            rel,
            [
                Path::new("Shared/b.png"),
                Path::new("Sprites/a.png"),
                Path::new("Sprites/b.png"),
            ]
        );
    }
}
