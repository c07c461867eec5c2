//! Atomic file writes.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ForgeError, Result};

/// Suffix of the temporary file used during a write.
const TEMP_SUFFIX: &str = ".acforge-tmp";

/// Write `content` to `path` atomically.
///
/// The content goes to `.<name>.acforge-tmp` in the same directory, which is
/// then renamed over `path`. Parent directories are created as needed. A
/// reader never sees a partially written file.
pub fn write_atomic(path: &Path, content: &[u8], executable: bool) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let temp = temp_path(path)?;
    if let Err(e) = write_temp(&temp, content, executable) {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }

    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| ForgeError::ConfigValidationError {
            message: format!("cannot write to {}: no file name", path.display()),
        })?
        .to_string_lossy();
    Ok(path.with_file_name(format!(".{}{}", name, TEMP_SUFFIX)))
}

fn write_temp(temp: &Path, content: &[u8], executable: bool) -> Result<()> {
    fs::write(temp, content)?;
    if executable {
        set_executable(temp)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
