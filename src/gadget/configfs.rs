//! ConfigFS file operations for USB gadgets

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::error::{AppError, Result};

/// ConfigFS base path for USB gadgets
pub const CONFIGFS_PATH: &str = "/sys/kernel/config/usb_gadget";

/// UDC class directory listing the available device controllers
pub const UDC_CLASS_PATH: &str = "/sys/class/udc";

/// Default gadget name
pub const DEFAULT_GADGET_NAME: &str = "g0";

/// Find an available UDC (USB Device Controller).
///
/// The first controller listed by the kernel is used.
pub fn find_udc(udc_dir: &Path) -> Option<String> {
    fs::read_dir(udc_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .next()
}

/// Write string content to a ConfigFS attribute.
///
/// sysfs attributes require a single write() syscall; the kernel processes
/// the value on the first write. The complete buffer (including a trailing
/// newline) is built before writing.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .open(path)
        .or_else(|e| {
            if path.exists() {
                Err(e)
            } else {
                File::create(path)
            }
        })
        .map_err(|e| AppError::Gadget(format!("Failed to open {}: {}", path.display(), e)))?;

    let data: std::borrow::Cow<[u8]> = if content.ends_with('\n') {
        content.as_bytes().into()
    } else {
        let mut buf = content.as_bytes().to_vec();
        buf.push(b'\n');
        buf.into()
    };

    file.write_all(&data)
        .map_err(|e| AppError::Gadget(format!("Failed to write to {}: {}", path.display(), e)))?;

    Ok(())
}

/// Write binary content to a file (report descriptors)
pub fn write_bytes(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path)
        .map_err(|e| AppError::Gadget(format!("Failed to create {}: {}", path.display(), e)))?;

    file.write_all(data)
        .map_err(|e| AppError::Gadget(format!("Failed to write to {}: {}", path.display(), e)))?;

    Ok(())
}

/// Create directory if not exists
pub fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        AppError::Gadget(format!(
            "Failed to create directory {}: {}",
            path.display(),
            e
        ))
    })
}

/// Remove a symlink or file, best effort
pub fn remove_link(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Remove a directory, best effort.
///
/// ConfigFS directories contain kernel-owned attribute files that cannot be
/// unlinked, but a bare rmdir on the directory succeeds. Plain directory
/// trees (used by the tests) need the recursive fallback.
pub fn remove_dir_best_effort(path: &Path) {
    if !path.exists() {
        return;
    }
    if fs::remove_dir(path).is_ok() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(path) {
        warn!("Failed to remove directory {}: {}", path.display(), e);
    }
}

/// Create symlink
pub fn create_symlink(src: &Path, dest: &Path) -> Result<()> {
    std::os::unix::fs::symlink(src, dest).map_err(|e| {
        AppError::Gadget(format!(
            "Failed to create symlink {} -> {}: {}",
            dest.display(),
            src.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_file_appends_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attr");

        write_file(&path, "7531").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "7531\n");
    }

    #[test]
    fn write_file_empty_content_is_bare_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("UDC");

        write_file(&path, "").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "\n");
    }

    #[test]
    fn find_udc_returns_first_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("fe980000.usb")).unwrap();

        assert_eq!(find_udc(dir.path()).as_deref(), Some("fe980000.usb"));
        assert_eq!(find_udc(&dir.path().join("missing")), None);
    }

    #[test]
    fn remove_dir_best_effort_handles_non_empty_tree() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("hid.keyboard");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("protocol"), "1").unwrap();

        remove_dir_best_effort(&target);
        assert!(!target.exists());
    }
}
