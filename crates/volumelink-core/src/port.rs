//! Serial port descriptors produced by enumeration.

use crate::identity::DeviceIdentity;

/// A serial port seen during one enumeration pass.
///
/// Descriptors are rebuilt from a fresh OS query on every tick and never
/// cached, so hot-plugged devices show up (and vanish) on the next poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    /// OS port name or path (`COM5`, `/dev/ttyACM0`)
    pub name: String,
    /// USB identity, `None` for ports that are not USB devices
    pub usb: Option<DeviceIdentity>,
    /// USB serial number string, if reported
    pub serial_number: Option<String>,
    /// USB product string, if reported
    pub product: Option<String>,
}

impl PortDescriptor {
    /// Describe a USB serial port.
    #[must_use]
    pub fn usb(name: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        Self {
            name: name.into(),
            usb: Some(DeviceIdentity::new(vendor_id, product_id)),
            serial_number: None,
            product: None,
        }
    }

    /// Describe a port without USB information (PCI, Bluetooth, built-in UART).
    #[must_use]
    pub fn other(name: impl Into<String>) -> Self {
        Self { name: name.into(), usb: None, serial_number: None, product: None }
    }

    /// Whether both VID and PID equal `target`.
    #[must_use]
    pub fn matches(&self, target: DeviceIdentity) -> bool {
        self.usb == Some(target)
    }
}
