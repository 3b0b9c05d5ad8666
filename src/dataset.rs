// Locating score files in a dataset directory tree

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use score_io::is_score_file;

/// All kern and MIDI files under `dir`, in a stable order
pub fn find_score_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read dataset directory: {}", dir.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if is_score_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_nested_scores() {
        let root = std::env::temp_dir().join(format!("melodygen_dataset_{}", std::process::id()));
        let nested = root.join("europa").join("deutschl");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.join("a.krn"), "**kern\n*-\n").unwrap();
        fs::write(nested.join("b.mid"), b"").unwrap();
        fs::write(nested.join("notes.txt"), "ignored").unwrap();

        let files = find_score_files(&root).unwrap();
        assert_eq!(files, vec![root.join("a.krn"), nested.join("b.mid")]);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_directory() {
        let err = find_score_files(Path::new("/definitely/not/here")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here"));
    }
}
