use std::path::{Path, PathBuf};
use thiserror::Error;

/// Case-sensitive: `logo.PNG` is not picked up.
pub const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to list media directory {}: {source}", .dir.display())]
    Read {
        dir: PathBuf,
        source: std::io::Error,
    },
}

pub fn is_image_name(name: &str) -> bool {
    IMAGE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// List the images in `dir` that may be attached to a tweet, sorted by path.
pub fn list_media(dir: &Path) -> Result<Vec<PathBuf>, MediaError> {
    let read_err = |source: std::io::Error| MediaError::Read {
        dir: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::debug!("Skipping non UTF-8 file name in {}", dir.display());
            continue;
        };
        if is_image_name(&name) {
            files.push(path);
        }
    }
    files.sort();

    tracing::info!("Found {} images in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn suffix_match_is_case_sensitive() {
        assert!(is_image_name("logo.png"));
        assert!(is_image_name("banner.jpg"));
        assert!(is_image_name("pig.jpeg"));
        assert!(!is_image_name("logo.PNG"));
        assert!(!is_image_name("anim.gif"));
        assert!(!is_image_name("png"));
        assert!(!is_image_name("notes.png.txt"));
    }

    #[test]
    fn lists_only_images() {
        let dir = tempdir().unwrap();
        for name in ["logo.png", "banner.jpeg", "readme.md", "LOUD.JPG"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = list_media(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("banner.jpeg"), dir.path().join("logo.png")]
        );
    }

    #[test]
    fn empty_directory_gives_empty_set() {
        let dir = tempdir().unwrap();
        assert!(list_media(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let err = list_media(&dir.path().join("assets")).unwrap_err();
        assert!(matches!(err, MediaError::Read { .. }));
    }
}
