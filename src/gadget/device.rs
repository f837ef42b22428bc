//! Character device resolution for gadget functions
//!
//! After binding, the kernel assigns each HID function a character device
//! (`/dev/hidgN`). The function's ConfigFS directory exposes the assigned
//! `major:minor` pair in its `dev` attribute; the device node is found by
//! scanning `/dev` for a character device with a matching rdev.

use std::fs;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Default directory scanned for device nodes
pub const DEV_DIR: &str = "/dev";

/// Parse the content of a `dev` attribute (`"major:minor\n"`)
pub fn parse_dev_attr(text: &str) -> Result<(u64, u64)> {
    let mut parts = text.trim().split(':');
    let major = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::Gadget(format!("Malformed dev attribute: {text:?}")))?;
    let minor = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::Gadget(format!("Malformed dev attribute: {text:?}")))?;
    Ok((major, minor))
}

/// Resolve the device node backing a gadget function.
///
/// Returns the first character device in `dev_dir` whose (major, minor)
/// matches the function's `dev` attribute.
pub fn resolve(function_dir: &Path, dev_dir: &Path) -> Result<PathBuf> {
    let attr_path = function_dir.join("dev");
    let text = fs::read_to_string(&attr_path).map_err(|e| {
        AppError::Gadget(format!("Failed to read {}: {}", attr_path.display(), e))
    })?;
    let (major, minor) = parse_dev_attr(&text)?;

    let entries = fs::read_dir(dev_dir)
        .map_err(|e| AppError::Gadget(format!("Failed to read {}: {}", dev_dir.display(), e)))?;

    for entry in entries.flatten() {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.file_type().is_char_device() {
            continue;
        }
        let rdev = meta.rdev();
        if rdev / 256 == major && rdev % 256 == minor {
            return Ok(entry.path());
        }
    }

    Err(AppError::DeviceNotFound(format!(
        "No character device with {}:{} under {}",
        major,
        minor,
        dev_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dev_attr_accepts_trailing_newline() {
        assert_eq!(parse_dev_attr("239:0\n").unwrap(), (239, 0));
        assert_eq!(parse_dev_attr("511:42").unwrap(), (511, 42));
    }

    #[test]
    fn parse_dev_attr_rejects_garbage() {
        assert!(parse_dev_attr("").is_err());
        assert!(parse_dev_attr("239").is_err());
        assert!(parse_dev_attr("a:b").is_err());
    }

    #[test]
    fn resolve_reports_device_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let function_dir = dir.path().join("hid.keyboard");
        fs::create_dir(&function_dir).unwrap();
        fs::write(function_dir.join("dev"), "239:0\n").unwrap();

        // A plain temp directory holds no character devices
        let err = resolve(&function_dir, dir.path()).unwrap_err();
        assert!(matches!(err, AppError::DeviceNotFound(_)));
    }

    #[test]
    fn resolve_fails_without_dev_attribute() {
        let dir = tempfile::tempdir().unwrap();
        let function_dir = dir.path().join("hid.keyboard");
        fs::create_dir(&function_dir).unwrap();

        assert!(resolve(&function_dir, dir.path()).is_err());
    }
}
