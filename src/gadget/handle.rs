//! Typed send operations over the gadget character devices

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::builder::UsbGadget;
use super::device::{self, DEV_DIR};
use super::function::HidFunctionKind;
use super::reports::{
    gamepad_report, keyboard_report, mouse_abs_report, mouse_report, touch_report, KeyModifiers,
    MouseCursor,
};
use crate::error::Result;

/// Device binding of one gadget function.
///
/// The character device path is resolved on first send and cached for the
/// rest of the session.
#[derive(Debug)]
struct FunctionBinding {
    function_dir: PathBuf,
    dev_dir: PathBuf,
    device: Option<PathBuf>,
}

impl FunctionBinding {
    fn new(function_dir: PathBuf, dev_dir: PathBuf) -> Self {
        Self {
            function_dir,
            dev_dir,
            device: None,
        }
    }

    #[cfg(test)]
    fn with_device(device: PathBuf) -> Self {
        Self {
            function_dir: PathBuf::new(),
            dev_dir: PathBuf::new(),
            device: Some(device),
        }
    }

    fn device(&mut self) -> Result<PathBuf> {
        if let Some(device) = &self.device {
            return Ok(device.clone());
        }

        let path = device::resolve(&self.function_dir, &self.dev_dir)?;
        debug!(
            "Resolved {} to {}",
            self.function_dir.display(),
            path.display()
        );
        self.device = Some(path.clone());
        Ok(path)
    }

    /// Write one report as a single write syscall
    fn write_report(&mut self, report: &[u8]) -> Result<()> {
        let path = self.device()?;
        let mut file = OpenOptions::new().write(true).open(&path)?;
        file.write_all(report)?;
        trace!("Sent report to {}: {:02X?}", path.display(), report);
        Ok(())
    }
}

/// Keyboard send handle
#[derive(Debug)]
pub struct Keyboard {
    binding: FunctionBinding,
}

impl Keyboard {
    pub fn send(&mut self, codes: &[u8], modifiers: KeyModifiers) -> Result<()> {
        self.binding.write_report(&keyboard_report(codes, modifiers))
    }
}

/// Relative mouse send handle; owns the session cursor state
#[derive(Debug)]
pub struct RelativeMouse {
    binding: FunctionBinding,
    cursor: MouseCursor,
}

impl RelativeMouse {
    pub fn send(&mut self, buttons: u8, x: i32, y: i32) -> Result<()> {
        let (dx, dy) = self.cursor.delta_to(x, y);
        self.binding.write_report(&mouse_report(buttons, dx, dy))
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.cursor.position()
    }
}

/// Absolute mouse send handle
#[derive(Debug)]
pub struct AbsoluteMouse {
    binding: FunctionBinding,
}

impl AbsoluteMouse {
    pub fn send(&mut self, buttons: u8, x: u16, y: u16) -> Result<()> {
        self.binding.write_report(&mouse_abs_report(buttons, x, y))
    }
}

/// Touchscreen send handle
#[derive(Debug)]
pub struct TouchScreen {
    binding: FunctionBinding,
}

impl TouchScreen {
    pub fn send(&mut self, buttons: u8, x: u16, y: u16) -> Result<()> {
        self.binding.write_report(&touch_report(buttons, x, y))
    }
}

/// Gamepad send handle
#[derive(Debug)]
pub struct Gamepad {
    binding: FunctionBinding,
}

impl Gamepad {
    pub fn send(&mut self, buttons: &[bool], axes: &[f64]) -> Result<()> {
        self.binding.write_report(&gamepad_report(buttons, axes))
    }
}

/// Send handles for the enabled gadget functions.
///
/// A message for a function that was not enabled finds `None` here and
/// dispatches to a no-op arm.
#[derive(Debug, Default)]
pub struct GadgetHandles {
    pub mouse: Option<RelativeMouse>,
    pub mouse_abs: Option<AbsoluteMouse>,
    pub touch_screen: Option<TouchScreen>,
    pub keyboard: Option<Keyboard>,
    pub gamepad: Option<Gamepad>,
}

impl GadgetHandles {
    /// Build handles for every function registered on a started gadget
    pub fn attach(gadget: &UsbGadget) -> Self {
        Self::attach_with_dev_dir(gadget, Path::new(DEV_DIR))
    }

    /// Build handles resolving device nodes under an explicit directory
    pub fn attach_with_dev_dir(gadget: &UsbGadget, dev_dir: &Path) -> Self {
        let mut handles = Self::default();

        for kind in gadget.functions() {
            let binding =
                FunctionBinding::new(gadget.function_path(*kind), dev_dir.to_path_buf());
            match kind {
                HidFunctionKind::MouseRelative => {
                    handles.mouse = Some(RelativeMouse {
                        binding,
                        cursor: MouseCursor::default(),
                    });
                }
                HidFunctionKind::MouseAbsolute => {
                    handles.mouse_abs = Some(AbsoluteMouse { binding });
                }
                HidFunctionKind::TouchScreen => {
                    handles.touch_screen = Some(TouchScreen { binding });
                }
                HidFunctionKind::Keyboard => {
                    handles.keyboard = Some(Keyboard { binding });
                }
                HidFunctionKind::Gamepad => {
                    handles.gamepad = Some(Gamepad { binding });
                }
            }
        }

        handles
    }

    /// Drop every handle (device paths are forgotten with them)
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn binding_to_file(dir: &tempfile::TempDir, name: &str) -> (FunctionBinding, PathBuf) {
        let path = dir.path().join(name);
        fs::write(&path, b"").unwrap();
        (FunctionBinding::with_device(path.clone()), path)
    }

    #[test]
    fn keyboard_send_writes_full_report() {
        let dir = tempfile::tempdir().unwrap();
        let (binding, path) = binding_to_file(&dir, "hidg0");
        let mut keyboard = Keyboard { binding };

        keyboard.send(&[4], KeyModifiers::default()).unwrap();
        assert_eq!(
            fs::read(path).unwrap(),
            vec![0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn relative_mouse_tracks_cursor_across_sends() {
        let dir = tempfile::tempdir().unwrap();
        let (binding, path) = binding_to_file(&dir, "hidg1");
        let mut mouse = RelativeMouse {
            binding,
            cursor: MouseCursor::default(),
        };

        mouse.send(0, 10, 20).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0x00, 0x0A, 0x14]);

        mouse.send(1, 200, 220).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0x01, 0x7F, 0x7F]);
        assert_eq!(mouse.cursor(), (200, 220));
    }

    #[test]
    fn unresolved_binding_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let function_dir = dir.path().join("hid.gamepad");
        fs::create_dir(&function_dir).unwrap();
        fs::write(function_dir.join("dev"), "240:3\n").unwrap();

        let binding = FunctionBinding::new(function_dir, dir.path().to_path_buf());
        let mut gamepad = Gamepad { binding };
        assert!(gamepad.send(&[true], &[]).is_err());
    }

    #[test]
    fn attach_builds_only_registered_handles() {
        let dir = tempfile::tempdir().unwrap();
        let configfs = dir.path().join("usb_gadget");
        let udc = dir.path().join("udc");
        fs::create_dir_all(&configfs).unwrap();
        fs::create_dir_all(udc.join("dummy_udc")).unwrap();

        let mut gadget = UsbGadget::with_roots("g0", &configfs, &udc);
        gadget.add_function(HidFunctionKind::Keyboard);
        gadget.add_function(HidFunctionKind::Gamepad);

        let handles = GadgetHandles::attach(&gadget);
        assert!(handles.keyboard.is_some());
        assert!(handles.gamepad.is_some());
        assert!(handles.mouse.is_none());
        assert!(handles.mouse_abs.is_none());
        assert!(handles.touch_screen.is_none());
    }
}
