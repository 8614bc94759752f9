//! `serialport`-backed enumeration and port opening.

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits};
use tracing::trace;
use volumelink_core::{DeviceIdentity, LinkSettings, PortDescriptor, SerialBackend};

use crate::error::{SerialError, SerialResult};

/// Serial ports as seen by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortBackend;

impl SerialPortBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SerialBackend for SerialPortBackend {
    type Link = Box<dyn SerialPort>;
    type Error = SerialError;

    fn available_ports(&self) -> SerialResult<Vec<PortDescriptor>> {
        let ports = serialport::available_ports().map_err(SerialError::Enumeration)?;
        trace!(count = ports.len(), "Serial ports enumerated");
        Ok(ports.into_iter().map(describe).collect())
    }

    fn open(&self, port: &str, settings: &LinkSettings) -> SerialResult<Box<dyn SerialPort>> {
        serialport::new(port, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.timeout)
            .open()
            .map_err(|source| SerialError::Open { port: port.to_string(), source })
    }
}

/// Convert an enumerated port into a descriptor.
#[must_use]
pub fn describe(info: SerialPortInfo) -> PortDescriptor {
    match info.port_type {
        SerialPortType::UsbPort(usb) => PortDescriptor {
            name: info.port_name,
            usb: Some(DeviceIdentity::new(usb.vid, usb.pid)),
            serial_number: usb.serial_number,
            product: usb.product,
        },
        SerialPortType::PciPort | SerialPortType::BluetoothPort | SerialPortType::Unknown => {
            PortDescriptor::other(info.port_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use serialport::UsbPortInfo;

    use super::*;

    fn usb_port(name: &str, vid: u16, pid: u16) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid,
                serial_number: Some("205E3072594D".to_string()),
                manufacturer: Some("STMicroelectronics".to_string()),
                product: Some("Volume Knob".to_string()),
            }),
        }
    }

    #[test]
    fn test_describe_usb_port() {
        let port = describe(usb_port("/dev/ttyACM0", 0x0483, 0x5750));

        assert_eq!(port.name, "/dev/ttyACM0");
        assert_eq!(port.usb, Some(DeviceIdentity::new(0x0483, 0x5750)));
        assert_eq!(port.serial_number.as_deref(), Some("205E3072594D"));
        assert_eq!(port.product.as_deref(), Some("Volume Knob"));
        assert!(port.matches(DeviceIdentity::default()));
    }

    #[test]
    fn test_describe_non_usb_ports() {
        for port_type in [SerialPortType::PciPort, SerialPortType::BluetoothPort, SerialPortType::Unknown] {
            let port = describe(SerialPortInfo { port_name: "/dev/ttyS0".to_string(), port_type });
            assert_eq!(port, PortDescriptor::other("/dev/ttyS0"));
            assert!(!port.matches(DeviceIdentity::default()));
        }
    }

    #[test]
    fn test_open_missing_port_names_it() {
        let err = SerialPortBackend::new()
            .open("/dev/volumelink-does-not-exist", &LinkSettings::default())
            .err()
            .expect("port should not exist");

        assert!(matches!(&err, SerialError::Open { port, .. } if port == "/dev/volumelink-does-not-exist"));
        assert!(err.to_string().contains("/dev/volumelink-does-not-exist"));
    }
}
