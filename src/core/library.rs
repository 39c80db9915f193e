use std::path::{Path, PathBuf};

/// Extensions the player will pick up (lowercase, no dot).
pub const SUPPORTED_FORMATS: [&str; 6] = ["mp3", "wav", "flac", "ogg", "m4a", "aac"];

pub fn scan_audio_files(root: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut out = Vec::new();
    walk_dir(root, &mut out)?;
    Ok(out)
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            walk_dir(&path, out)?;
        } else if is_supported(&path) {
            out.push(path);
        }
    }

    Ok(())
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_FORMATS.iter().any(|f| ext.eq_ignore_ascii_case(f)))
        .unwrap_or(false)
}
