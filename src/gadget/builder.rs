//! Composite gadget construction and teardown in ConfigFS

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::configfs::{
    create_dir, create_symlink, find_udc, remove_dir_best_effort, remove_link, write_bytes,
    write_file, CONFIGFS_PATH, UDC_CLASS_PATH,
};
use super::function::HidFunctionKind;
use crate::error::{AppError, Result};

/// USB device descriptor values for the composite gadget
#[derive(Debug, Clone)]
pub struct GadgetDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub usb_version: u16,
    pub device_version: u16,
    pub max_packet_size: u8,
    pub lang_id: u16,
    pub manufacturer: String,
    pub product: String,
    pub serial_number: String,
}

impl Default for GadgetDescriptor {
    fn default() -> Self {
        Self {
            vendor_id: 0x1D6B,       // The Linux Foundation
            product_id: 0x0104,      // Multifunction Composite Gadget
            usb_version: 0x0200,     // USB 2.0
            device_version: 0x0100,  // v1.0.0
            max_packet_size: 64,
            lang_id: 0x0409, // en-US
            manufacturer: "The Linux Foundation".to_string(),
            product: "Generic USB Device".to_string(),
            serial_number: "00000000".to_string(),
        }
    }
}

/// Composite USB gadget materialized under
/// `/sys/kernel/config/usb_gadget/<name>/`.
///
/// `start` creates every ConfigFS object in dependency order and binds the
/// gadget to the first UDC the kernel lists; `stop` reverses the steps.
/// Teardown is best effort: a failing path is logged and the remaining
/// steps still run.
pub struct UsbGadget {
    name: String,
    gadget_path: PathBuf,
    config_path: PathBuf,
    udc_dir: PathBuf,
    descriptor: GadgetDescriptor,
    functions: Vec<HidFunctionKind>,
    bound_udc: Option<String>,
}

impl UsbGadget {
    /// Create a gadget rooted at the system ConfigFS mount
    pub fn new(name: &str) -> Self {
        Self::with_roots(name, Path::new(CONFIGFS_PATH), Path::new(UDC_CLASS_PATH))
    }

    /// Create a gadget against explicit filesystem roots
    pub fn with_roots(name: &str, configfs_root: &Path, udc_dir: &Path) -> Self {
        let gadget_path = configfs_root.join(name);
        let config_path = gadget_path.join("configs/c.1");

        Self {
            name: name.to_string(),
            gadget_path,
            config_path,
            udc_dir: udc_dir.to_path_buf(),
            descriptor: GadgetDescriptor::default(),
            functions: Vec::with_capacity(5),
            bound_udc: None,
        }
    }

    /// Register a HID function; the gadget materializes it on `start`
    pub fn add_function(&mut self, kind: HidFunctionKind) {
        if !self.functions.contains(&kind) {
            self.functions.push(kind);
        }
    }

    /// Registered functions
    pub fn functions(&self) -> &[HidFunctionKind] {
        &self.functions
    }

    /// ConfigFS directory of a registered function
    pub fn function_path(&self, kind: HidFunctionKind) -> PathBuf {
        kind.function_path(&self.gadget_path)
    }

    /// Name of the UDC the gadget is currently bound to
    pub fn bound_udc(&self) -> Option<&str> {
        self.bound_udc.as_deref()
    }

    /// Materialize the gadget and bind it to a UDC
    pub fn start(&mut self) -> Result<()> {
        info!("Starting USB gadget: {}", self.name);

        // A leftover gadget from an interrupted session blocks the symlink
        // step; clear it before building
        if self.gadget_path.exists() {
            warn!("Gadget {} already exists, removing stale state", self.name);
            self.stop();
        }

        create_dir(&self.gadget_path)?;
        self.write_device_descriptors()?;
        self.create_strings()?;
        create_dir(&self.config_path)?;

        for kind in &self.functions {
            let func_path = kind.function_path(&self.gadget_path);
            create_dir(&func_path)?;

            write_file(&func_path.join("protocol"), &kind.protocol().to_string())?;
            write_file(&func_path.join("subclass"), &kind.subclass().to_string())?;
            write_file(
                &func_path.join("report_length"),
                &kind.report_length().to_string(),
            )?;
            write_bytes(&func_path.join("report_desc"), kind.report_desc())?;

            // Drop the interrupt OUT endpoint where the kernel supports it
            let no_out = func_path.join("no_out_endpoint");
            if no_out.exists() && kind.no_out_endpoint() {
                write_file(&no_out, "1")?;
            }

            create_symlink(&func_path, &self.config_path.join(kind.function_name()))?;
            debug!("Created function {}", kind.function_name());
        }

        self.bind()
    }

    /// Bind the gadget to the first available UDC
    fn bind(&mut self) -> Result<()> {
        let udc = find_udc(&self.udc_dir).ok_or_else(|| {
            AppError::Gadget("No USB Device Controller (UDC) found".to_string())
        })?;

        info!("Binding gadget {} to UDC: {}", self.name, udc);
        write_file(&self.gadget_path.join("UDC"), &udc)?;
        self.bound_udc = Some(udc);

        Ok(())
    }

    /// Detach the gadget from its UDC (a bare newline write)
    pub fn unbind(&mut self) {
        if let Err(e) = write_file(&self.gadget_path.join("UDC"), "") {
            warn!("Failed to unbind gadget {}: {}", self.name, e);
        }
        self.bound_udc = None;
    }

    /// Tear the gadget down, reversing `start` step by step.
    ///
    /// Individual failures are logged and do not abort the remaining steps.
    pub fn stop(&mut self) {
        info!("Stopping USB gadget: {}", self.name);

        self.unbind();

        for kind in self.functions.iter().rev() {
            remove_link(&self.config_path.join(kind.function_name()));
        }
        for kind in self.functions.iter().rev() {
            remove_dir_best_effort(&kind.function_path(&self.gadget_path));
        }

        remove_dir_best_effort(&self.config_path);
        remove_dir_best_effort(&self.gadget_path.join("strings").join(self.lang_dir()));
        // The kernel's default groups (configs/, functions/, strings/) go
        // away with the gadget root itself
        remove_dir_best_effort(&self.gadget_path);

        info!("USB gadget {} removed", self.name);
    }

    fn lang_dir(&self) -> String {
        format!("0x{:04x}", self.descriptor.lang_id)
    }

    fn write_device_descriptors(&self) -> Result<()> {
        let d = &self.descriptor;
        write_file(
            &self.gadget_path.join("bMaxPacketSize0"),
            &d.max_packet_size.to_string(),
        )?;
        write_file(&self.gadget_path.join("idVendor"), &d.vendor_id.to_string())?;
        write_file(
            &self.gadget_path.join("idProduct"),
            &d.product_id.to_string(),
        )?;
        write_file(&self.gadget_path.join("bcdUSB"), &d.usb_version.to_string())?;
        write_file(
            &self.gadget_path.join("bcdDevice"),
            &d.device_version.to_string(),
        )?;
        debug!("Set device descriptors for {}", self.name);
        Ok(())
    }

    fn create_strings(&self) -> Result<()> {
        let strings_path = self.gadget_path.join("strings").join(self.lang_dir());
        create_dir(&strings_path)?;

        let d = &self.descriptor;
        write_file(&strings_path.join("serialnumber"), &d.serial_number)?;
        write_file(&strings_path.join("manufacturer"), &d.manufacturer)?;
        write_file(&strings_path.join("product"), &d.product)?;
        debug!("Created string descriptors for {}", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn gadget_in(dir: &Path) -> UsbGadget {
        let configfs = dir.join("usb_gadget");
        let udc = dir.join("udc");
        fs::create_dir_all(&configfs).unwrap();
        fs::create_dir_all(udc.join("dummy_udc")).unwrap();
        UsbGadget::with_roots("g0", &configfs, &udc)
    }

    #[test]
    fn start_materializes_all_objects() {
        let dir = tempfile::tempdir().unwrap();
        let mut gadget = gadget_in(dir.path());
        gadget.add_function(HidFunctionKind::Keyboard);
        gadget.add_function(HidFunctionKind::MouseRelative);
        gadget.start().unwrap();

        let root = dir.path().join("usb_gadget/g0");
        assert_eq!(fs::read_to_string(root.join("idVendor")).unwrap(), "7531\n");
        assert_eq!(fs::read_to_string(root.join("idProduct")).unwrap(), "260\n");
        assert_eq!(fs::read_to_string(root.join("bcdUSB")).unwrap(), "512\n");
        assert_eq!(fs::read_to_string(root.join("bcdDevice")).unwrap(), "256\n");
        assert_eq!(
            fs::read_to_string(root.join("bMaxPacketSize0")).unwrap(),
            "64\n"
        );

        let strings = root.join("strings/0x0409");
        assert_eq!(
            fs::read_to_string(strings.join("manufacturer")).unwrap(),
            "The Linux Foundation\n"
        );
        assert_eq!(
            fs::read_to_string(strings.join("product")).unwrap(),
            "Generic USB Device\n"
        );
        assert_eq!(
            fs::read_to_string(strings.join("serialnumber")).unwrap(),
            "00000000\n"
        );

        let kb = root.join("functions/hid.keyboard");
        assert_eq!(fs::read_to_string(kb.join("protocol")).unwrap(), "1\n");
        assert_eq!(fs::read_to_string(kb.join("subclass")).unwrap(), "1\n");
        assert_eq!(fs::read_to_string(kb.join("report_length")).unwrap(), "8\n");
        assert_eq!(
            fs::read(kb.join("report_desc")).unwrap(),
            HidFunctionKind::Keyboard.report_desc()
        );

        let link = root.join("configs/c.1/hid.keyboard");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());

        // Bound to the first (only) controller
        assert_eq!(
            fs::read_to_string(root.join("UDC")).unwrap().trim(),
            "dummy_udc"
        );
        assert_eq!(gadget.bound_udc(), Some("dummy_udc"));
    }

    #[test]
    fn unbind_writes_bare_newline() {
        let dir = tempfile::tempdir().unwrap();
        let mut gadget = gadget_in(dir.path());
        gadget.add_function(HidFunctionKind::Keyboard);
        gadget.start().unwrap();

        gadget.unbind();
        let udc_file = dir.path().join("usb_gadget/g0/UDC");
        assert_eq!(fs::read_to_string(udc_file).unwrap(), "\n");
        assert_eq!(gadget.bound_udc(), None);
    }

    #[test]
    fn stop_leaves_no_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut gadget = gadget_in(dir.path());
        for kind in HidFunctionKind::ALL {
            gadget.add_function(kind);
        }
        gadget.start().unwrap();

        gadget.stop();
        assert!(!dir.path().join("usb_gadget/g0").exists());
    }

    #[test]
    fn start_fails_without_udc() {
        let dir = tempfile::tempdir().unwrap();
        let configfs = dir.path().join("usb_gadget");
        let udc = dir.path().join("udc");
        fs::create_dir_all(&configfs).unwrap();
        fs::create_dir_all(&udc).unwrap(); // empty: no controllers

        let mut gadget = UsbGadget::with_roots("g0", &configfs, &udc);
        gadget.add_function(HidFunctionKind::Keyboard);
        assert!(gadget.start().is_err());
    }

    #[test]
    fn add_function_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut gadget = gadget_in(dir.path());
        gadget.add_function(HidFunctionKind::Gamepad);
        gadget.add_function(HidFunctionKind::Gamepad);
        assert_eq!(gadget.functions().len(), 1);
    }
}
