//! USB gadget synthesis through the Linux ConfigFS filesystem.
//!
//! Layout:
//! ```text
//! UsbGadget (builder.rs)          gadget lifecycle in ConfigFS
//!     ├── HidFunctionKind         per-class descriptors and attributes
//!     └── find_udc / write_file   ConfigFS primitives
//! GadgetHandles (handle.rs)       typed send operations per function
//!     ├── reports.rs              bit-exact HID report encoding
//!     └── device.rs               (major, minor) -> /dev/hidgN resolution
//! ```

pub mod builder;
pub mod configfs;
pub mod device;
pub mod function;
pub mod handle;
pub mod report_desc;
pub mod reports;

pub use builder::{GadgetDescriptor, UsbGadget};
pub use function::HidFunctionKind;
pub use handle::GadgetHandles;
