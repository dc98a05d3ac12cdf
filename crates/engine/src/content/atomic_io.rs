use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes `bytes` next to `path` first and then renames the temporary file over
/// it, so readers only ever observe the previous contents or the new ones.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path_for(path);
    if let Err(error) = write_and_sync(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    replace_file(&tmp_path, path)
}

pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    write_bytes_atomic(path, text.as_bytes())
}

fn write_and_sync(tmp_path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// `fs::rename` replaces an existing destination on every supported platform;
// the old file is never removed ahead of the rename.
fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn write_creates_parent_dirs_and_leaves_no_temp_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("nested").join("slot_0.save.json");

        write_text_atomic(&path, "{}").expect("write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn write_replaces_previous_contents() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("doc.json");

        write_text_atomic(&path, "first").expect("first write");
        write_text_atomic(&path, "second").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("doc.json");
        write_text_atomic(&path, "kept").expect("write");

        // A directory squatting on the temp name makes the temp write fail.
        fs::create_dir_all(temp_path_for(&path)).expect("block temp path");
        assert!(write_text_atomic(&path, "lost").is_err());

        assert_eq!(fs::read_to_string(&path).expect("read"), "kept");
    }

    #[test]
    fn temp_path_sits_next_to_target() {
        let path = Path::new("saves").join("slot_1.save.json");
        assert_eq!(
            temp_path_for(&path),
            Path::new("saves").join("slot_1.save.json.tmp")
        );
    }
}
