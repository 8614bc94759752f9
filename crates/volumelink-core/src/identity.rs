//! USB identity of the volume display.

use std::fmt;

use crate::error::{Error, Result};

/// STMicroelectronics USB Vendor ID
pub const DISPLAY_VID: u16 = 0x0483;
/// Knob display (virtual COM port) USB Product ID
pub const DISPLAY_PID: u16 = 0x5750;

/// The (VID, PID) pair a serial port must report to receive volume updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
}

impl DeviceIdentity {
    #[must_use]
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self { vendor_id, product_id }
    }

    /// Parse an identity from two hex ids as they appear in the config file.
    ///
    /// # Errors
    /// Returns [`Error::InvalidUsbId`] if either id is not valid hex.
    pub fn from_hex(vendor_id: &str, product_id: &str) -> Result<Self> {
        Ok(Self::new(parse_usb_id(vendor_id)?, parse_usb_id(product_id)?))
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self::new(DISPLAY_VID, DISPLAY_PID)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Parse a 16-bit USB id written in hex, with or without a `0x` prefix.
///
/// # Errors
/// Returns [`Error::InvalidUsbId`] for empty, non-hex, or oversized input.
pub fn parse_usb_id(s: &str) -> Result<u16> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidUsbId(s.to_string()));
    }

    u16::from_str_radix(digits, 16).map_err(|_| Error::InvalidUsbId(s.to_string()))
}
