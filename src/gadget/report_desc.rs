//! HID Report Descriptors

/// Relative Mouse HID Report Descriptor (3 bytes report)
/// Report format:
///   [0] Buttons (3 bits) + padding (5 bits)
///   [1] X movement (signed 8-bit)
///   [2] Y movement (signed 8-bit)
pub const MOUSE_RELATIVE: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    // Buttons (3 bits)
    0x95, 0x03, //     Report Count (3)
    0x75, 0x01, //     Report Size (1)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (1)
    0x29, 0x03, //     Usage Maximum (3)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute) - Button bits
    // Padding (5 bits)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x05, //     Report Size (5)
    0x81, 0x01, //     Input (Constant) - Padding
    // X, Y movement
    0x75, 0x08, //     Report Size (8)
    0x95, 0x02, //     Report Count (2)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x81, 0x06, //     Input (Data, Variable, Relative) - X, Y
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Absolute Mouse HID Report Descriptor (6 bytes report)
/// Report format:
///   [0] Buttons (3 bits) + padding (13 bits)
///   [2-3] X position (16-bit, 0-32767)
///   [4-5] Y position (16-bit, 0-32767)
pub const MOUSE_ABSOLUTE: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    // Buttons (3 bits)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (1)
    0x29, 0x03, //     Usage Maximum (3)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x03, //     Report Count (3)
    0x81, 0x02, //     Input (Data, Variable, Absolute) - Button bits
    // Padding (13 bits)
    0x75, 0x0D, //     Report Size (13)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x01, //     Input (Constant) - Padding
    // X, Y position (16-bit absolute)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x00, //     Logical Minimum (0)
    0x26, 0xFF, 0x7F, // Logical Maximum (32767)
    0x75, 0x10, //     Report Size (16)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute) - X, Y
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Touchscreen HID Report Descriptor (7 bytes report)
/// Report format:
///   [0] Contact count
///   [1] Contact identifier
///   [2] Tip Switch (bit 0) + In Range (bit 1) + padding
///   [3-4] X position (16-bit, 0-32767)
///   [5-6] Y position (16-bit, 0-32767)
pub const TOUCH_SCREEN: &[u8] = &[
    0x05, 0x0D, // Usage Page (Digitizers)
    0x09, 0x04, // Usage (Touch Screen)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x55, //   Usage (Contact Count Maximum)
    0x25, 0x01, //   Logical Maximum (1)
    0xB1, 0x02, //   Feature (Data, Variable, Absolute)
    // Contact count
    0x09, 0x54, //   Usage (Contact Count)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x09, 0x22, //   Usage (Finger)
    0xA1, 0x02, //   Collection (Logical)
    // Contact identifier
    0x09, 0x51, //     Usage (Contact Identifier)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    // Tip Switch, In Range (1 bit each) + padding (6 bits)
    0x09, 0x42, //     Usage (Tip Switch)
    0x09, 0x32, //     Usage (In Range)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    0x95, 0x06, //     Report Count (6)
    0x81, 0x01, //     Input (Constant) - Padding
    // X, Y position (16-bit absolute)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x15, 0x00, //     Logical Minimum (0)
    0x26, 0xFF, 0x7F, // Logical Maximum (32767)
    0x55, 0x00, //     Unit Exponent (0)
    0x65, 0x00, //     Unit (None)
    0x75, 0x10, //     Report Size (16)
    0x95, 0x02, //     Report Count (2)
    0x81, 0x02, //     Input (Data, Variable, Absolute) - X, Y
    0xC0, //   End Collection
    0xC0, // End Collection
];

/// Keyboard HID Report Descriptor (no LED output - saves 1 endpoint)
/// Report format (8 bytes input):
///   [0] Modifier keys (8 bits)
///   [1] Reserved
///   [2-7] Key codes (6 keys)
pub const KEYBOARD: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    // Modifier keys input (8 bits)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224) - Left Control
    0x29, 0xE7, //   Usage Maximum (231) - Right GUI
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute) - Modifier byte
    // Reserved byte
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x01, //   Input (Constant) - Reserved byte
    // Key array (6 bytes)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x06, //   Report Count (6)
    0x81, 0x00, //   Input (Data, Array) - Key array (6 keys)
    0xC0, // End Collection
];

/// Gamepad HID Report Descriptor (7 bytes report)
/// Report format:
///   [0] Hat switch (4 bits) + padding (4 bits)
///   [1-2] Buttons (13 bits) + padding (3 bits)
///   [3-6] X, Y, Z, Rz axes (8 bits each)
pub const GAMEPAD: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x04, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    // Hat switch (4 bits)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x39, //     Usage (Hat switch)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x07, //     Logical Maximum (7)
    0x35, 0x00, //     Physical Minimum (0)
    0x46, 0x3B, 0x01, // Physical Maximum (315)
    0x65, 0x14, //     Unit (Degrees)
    0x75, 0x04, //     Report Size (4)
    0x95, 0x01, //     Report Count (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute)
    // Padding (4 bits)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x04, //     Report Size (4)
    0x81, 0x01, //     Input (Constant) - Padding
    // Buttons (13 bits)
    0x05, 0x09, //     Usage Page (Button)
    0x19, 0x01, //     Usage Minimum (1)
    0x29, 0x0D, //     Usage Maximum (13)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x35, 0x00, //     Physical Minimum (0)
    0x45, 0x01, //     Physical Maximum (1)
    0x65, 0x00, //     Unit (None)
    0x75, 0x01, //     Report Size (1)
    0x95, 0x0D, //     Report Count (13)
    0x81, 0x02, //     Input (Data, Variable, Absolute) - Button bits
    // Padding (3 bits)
    0x95, 0x01, //     Report Count (1)
    0x75, 0x03, //     Report Size (3)
    0x81, 0x01, //     Input (Constant) - Padding
    // X, Y, Z, Rz axes (8 bits each)
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x32, //     Usage (Z)
    0x09, 0x35, //     Usage (Rz)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0xFF, //     Logical Maximum (255)
    0x35, 0x00, //     Physical Minimum (0)
    0x45, 0xFF, //     Physical Maximum (255)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x04, //     Report Count (4)
    0x81, 0x02, //     Input (Data, Variable, Absolute) - Axes
    0xC0, //   End Collection
    0xC0, // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_lengths() {
        assert_eq!(MOUSE_RELATIVE.len(), 50);
        assert_eq!(MOUSE_ABSOLUTE.len(), 51);
        assert_eq!(TOUCH_SCREEN.len(), 73);
        assert_eq!(KEYBOARD.len(), 45);
        assert_eq!(GAMEPAD.len(), 91);
    }

    #[test]
    fn descriptors_are_well_formed() {
        // Every descriptor starts with a Usage Page item and ends the
        // outermost collection
        for desc in [MOUSE_RELATIVE, MOUSE_ABSOLUTE, TOUCH_SCREEN, KEYBOARD, GAMEPAD] {
            assert_eq!(desc[0], 0x05);
            assert_eq!(desc[desc.len() - 1], 0xC0);
        }
    }
}
