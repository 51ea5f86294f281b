//! Output directory cleanup (§4.8).

use std::path::Path;

use crate::error::Result;

/// Best-effort-removes `output_dir`. If the OS reports the directory as busy
/// (typical of mounted volumes), falls back to removing its immediate
/// children instead of the directory itself. Any other I/O error fails the
/// run.
pub fn clean(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        return Ok(());
    }
    match std::fs::remove_dir_all(output_dir) {
        Ok(()) => Ok(()),
        Err(err) if is_directory_busy(&err) => {
            for entry in std::fs::read_dir(output_dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    std::fs::remove_dir_all(&path)?;
                } else {
                    std::fs::remove_file(&path)?;
                }
            }
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn is_directory_busy(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::ResourceBusy
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn removes_an_existing_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out");
        fs::create_dir_all(target.join("nested")).unwrap();
        fs::write(target.join("nested/file.txt"), "x").unwrap();

        clean(&target).unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn missing_directory_is_a_no_op() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("does-not-exist");
        clean(&target).unwrap();
    }
}
