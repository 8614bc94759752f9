//! Delivery of volume levels to matching serial devices.
//!
//! Every call enumerates ports afresh and opens, writes, and closes each
//! matching port in turn. No handle is kept between calls; a replugged
//! display is picked up by the next call's enumeration.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::identity::DeviceIdentity;
use crate::level::VolumeLevel;
use crate::port::PortDescriptor;

/// Default baud rate of the display's virtual COM port.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Default open/write timeout. Kept short so a wedged device can't stall the loop.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);

/// Line settings used when opening a port (always 8-N-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self { baud_rate: DEFAULT_BAUD_RATE, timeout: DEFAULT_TIMEOUT }
    }
}

/// OS serial port access.
pub trait SerialBackend {
    /// An open port. Dropping it closes the port.
    type Link: Write;
    /// Error raised by enumeration or open.
    type Error: std::error::Error + Send + Sync + 'static;

    /// List the serial ports currently attached.
    ///
    /// # Errors
    /// Returns an error if the OS refuses the query.
    fn available_ports(&self) -> Result<Vec<PortDescriptor>, Self::Error>;

    /// Open `port` for writing.
    ///
    /// # Errors
    /// Returns an error if the port is busy, gone, or not accessible.
    fn open(&self, port: &str, settings: &LinkSettings) -> Result<Self::Link, Self::Error>;
}

/// Result of one delivery attempt to one matched port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The byte was written and the port closed.
    Delivered,
    /// Skipped: this level was already delivered to this port.
    Unchanged,
    /// Open or write failed; the reason is the underlying error.
    Unreachable(String),
}

/// Outcomes of one poll, one entry per matched port in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickDelivery {
    pub attempts: Vec<(String, SendOutcome)>,
}

impl TickDelivery {
    /// Number of ports that matched the target identity.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.attempts.len()
    }

    /// Number of ports that received the byte.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.attempts.iter().filter(|(_, o)| *o == SendOutcome::Delivered).count()
    }

    /// Outcome for a given port, if it matched.
    #[must_use]
    pub fn outcome(&self, port: &str) -> Option<&SendOutcome> {
        self.attempts.iter().find(|(name, _)| name == port).map(|(_, o)| o)
    }
}

/// What happened on a port the last time it was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortRecord {
    Delivered(VolumeLevel),
    Failed,
}

/// An open port, owned for exactly one write.
struct TransportSession<L: Write> {
    link: L,
}

impl<L: Write> TransportSession<L> {
    /// Write the level byte and close the port, on success or failure.
    fn send(mut self, level: VolumeLevel) -> std::io::Result<()> {
        self.link.write_all(&[level.to_byte()])?;
        self.link.flush()
    }
}

/// Sends volume levels to every attached port matching a target identity.
pub struct Transport<B> {
    backend: B,
    settings: LinkSettings,
    skip_unchanged: bool,
    records: HashMap<String, PortRecord>,
}

impl<B: SerialBackend> Transport<B> {
    #[must_use]
    pub fn new(backend: B, settings: LinkSettings) -> Self {
        Self { backend, settings, skip_unchanged: false, records: HashMap::new() }
    }

    /// Skip ports that already hold the current level.
    #[must_use]
    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    /// Enumerate ports and write `level` to each one matching `target`.
    ///
    /// Never fails: enumeration errors yield an empty delivery, and per-port
    /// errors are reported as [`SendOutcome::Unreachable`] without affecting
    /// the remaining ports.
    pub fn poll_and_send(&mut self, level: VolumeLevel, target: DeviceIdentity) -> TickDelivery {
        let ports = match self.backend.available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate serial ports");
                return TickDelivery::default();
            }
        };

        let matched: Vec<PortDescriptor> = ports.into_iter().filter(|p| p.matches(target)).collect();
        self.forget_vanished(&matched);

        let mut delivery = TickDelivery::default();
        for port in matched {
            let outcome = self.send_to(&port, level);
            delivery.attempts.push((port.name, outcome));
        }
        delivery
    }

    fn forget_vanished(&mut self, matched: &[PortDescriptor]) {
        self.records.retain(|name, _| {
            let present = matched.iter().any(|p| &p.name == name);
            if !present {
                info!(port = %name, "Display disconnected");
            }
            present
        });
    }

    fn send_to(&mut self, port: &PortDescriptor, level: VolumeLevel) -> SendOutcome {
        let previous = self.records.get(&port.name).copied();
        if previous.is_none() {
            info!(
                port = %port.name,
                serial = port.serial_number.as_deref().unwrap_or("unknown"),
                product = port.product.as_deref().unwrap_or("unknown"),
                "Display connected"
            );
        }

        if self.skip_unchanged && previous == Some(PortRecord::Delivered(level)) {
            return SendOutcome::Unchanged;
        }

        let result = self
            .backend
            .open(&port.name, &self.settings)
            .map_err(|e| e.to_string())
            .and_then(|link| TransportSession { link }.send(level).map_err(|e| e.to_string()));

        match result {
            Ok(()) => {
                debug!(port = %port.name, %level, "Volume delivered");
                self.records.insert(port.name.clone(), PortRecord::Delivered(level));
                SendOutcome::Delivered
            }
            Err(reason) => {
                if previous == Some(PortRecord::Failed) {
                    debug!(port = %port.name, error = %reason, "Display still unreachable");
                } else {
                    warn!(port = %port.name, error = %reason, "Display unreachable");
                }
                self.records.insert(port.name.clone(), PortRecord::Failed);
                SendOutcome::Unreachable(reason)
            }
        }
    }

    /// Access the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Recording serial backend for tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::io;
    use std::rc::Rc;

    use super::{LinkSettings, SerialBackend};
    use crate::port::PortDescriptor;

    #[derive(Default)]
    pub struct Journal {
        /// Bytes seen by each link, recorded when the link is closed.
        pub writes: RefCell<Vec<(String, Vec<u8>)>>,
        /// Every open attempt, successful or not.
        pub opens: RefCell<Vec<String>>,
        pub enumerations: Cell<usize>,
        pub open_now: Cell<usize>,
        pub max_open: Cell<usize>,
    }

    #[derive(Default)]
    pub struct FakeBackend {
        pub ports: RefCell<Vec<PortDescriptor>>,
        pub refuse_open: RefCell<HashSet<String>>,
        pub refuse_write: RefCell<HashSet<String>>,
        pub enumeration_fails: Cell<bool>,
        pub journal: Rc<Journal>,
    }

    impl FakeBackend {
        pub fn with_ports(ports: Vec<PortDescriptor>) -> Self {
            Self { ports: RefCell::new(ports), ..Self::default() }
        }

        pub fn writes(&self) -> Vec<(String, Vec<u8>)> {
            self.journal.writes.borrow().clone()
        }
    }

    pub struct FakeLink {
        port: String,
        bytes: Vec<u8>,
        fail_write: bool,
        journal: Rc<Journal>,
    }

    impl io::Write for FakeLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_write {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
            }
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for FakeLink {
        fn drop(&mut self) {
            self.journal.open_now.set(self.journal.open_now.get() - 1);
            if !self.bytes.is_empty() {
                self.journal.writes.borrow_mut().push((self.port.clone(), std::mem::take(&mut self.bytes)));
            }
        }
    }

    impl SerialBackend for FakeBackend {
        type Link = FakeLink;
        type Error = io::Error;

        fn available_ports(&self) -> io::Result<Vec<PortDescriptor>> {
            self.journal.enumerations.set(self.journal.enumerations.get() + 1);
            if self.enumeration_fails.get() {
                return Err(io::Error::other("udev unavailable"));
            }
            Ok(self.ports.borrow().clone())
        }

        fn open(&self, port: &str, _settings: &LinkSettings) -> io::Result<FakeLink> {
            self.journal.opens.borrow_mut().push(port.to_string());
            if self.refuse_open.borrow().contains(port) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "port busy"));
            }
            let open_now = self.journal.open_now.get() + 1;
            self.journal.open_now.set(open_now);
            self.journal.max_open.set(self.journal.max_open.get().max(open_now));
            Ok(FakeLink {
                port: port.to_string(),
                bytes: Vec::new(),
                fail_write: self.refuse_write.borrow().contains(port),
                journal: Rc::clone(&self.journal),
            })
        }
    }
}
