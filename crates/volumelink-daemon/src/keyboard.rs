//! Unbuffered keyboard input from the controlling terminal.
//!
//! The platform implementation is picked at build time; the control loop
//! only sees [`KeyInput`].

use std::io::{self, IsTerminal};

use volumelink_core::KeyInput;

#[cfg(unix)]
use posix::TerminalKeys;
#[cfg(windows)]
use console::TerminalKeys;

/// Keyboard input, or nothing when no terminal is attached.
pub enum Keyboard {
    Terminal(TerminalKeys),
    Detached,
}

impl Keyboard {
    /// Attach to stdin if it is a terminal.
    ///
    /// # Errors
    /// Returns an error if stdin is a terminal but cannot be switched to
    /// unbuffered input.
    pub fn open() -> io::Result<Self> {
        if io::stdin().is_terminal() {
            Ok(Self::Terminal(TerminalKeys::open()?))
        } else {
            Ok(Self::Detached)
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

impl KeyInput for Keyboard {
    fn key_pending(&mut self) -> io::Result<bool> {
        match self {
            Self::Terminal(keys) => keys.key_pending(),
            Self::Detached => Ok(false),
        }
    }

    fn read_key(&mut self) -> io::Result<u8> {
        match self {
            Self::Terminal(keys) => keys.read_key(),
            Self::Detached => Err(io::ErrorKind::NotConnected.into()),
        }
    }
}

#[cfg(unix)]
mod posix {
    use std::fs::File;
    use std::io::{self, Read};
    use std::os::fd::AsFd;

    use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
    use nix::sys::termios::{LocalFlags, SetArg, Termios, tcgetattr, tcsetattr};
    use tracing::{debug, warn};
    use volumelink_core::KeyInput;

    /// Stdin with canonical mode and echo switched off.
    ///
    /// Signals (Ctrl+C) still work. The original attributes are restored on drop.
    pub struct TerminalKeys {
        tty: File,
        original: Termios,
        closed: bool,
    }

    impl TerminalKeys {
        pub fn open() -> io::Result<Self> {
            // Unbuffered handle: std's Stdin would read ahead and hide keys from poll()
            let tty = File::from(io::stdin().as_fd().try_clone_to_owned()?);

            let original = tcgetattr(&tty)?;
            let mut unbuffered = original.clone();
            unbuffered.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
            tcsetattr(&tty, SetArg::TCSAFLUSH, &unbuffered)?;
            debug!("Terminal switched to unbuffered input");

            Ok(Self { tty, original, closed: false })
        }
    }

    impl KeyInput for TerminalKeys {
        fn key_pending(&mut self) -> io::Result<bool> {
            if self.closed {
                return Ok(false);
            }
            let mut fds = [PollFd::new(self.tty.as_fd(), PollFlags::POLLIN)];
            let ready = poll(&mut fds, PollTimeout::ZERO)?;
            Ok(ready > 0
                && fds[0]
                    .revents()
                    .is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP)))
        }

        fn read_key(&mut self) -> io::Result<u8> {
            let mut byte = [0u8; 1];
            if self.tty.read(&mut byte)? == 0 {
                // Terminal hung up; stop polling it
                self.closed = true;
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            Ok(byte[0])
        }
    }

    impl Drop for TerminalKeys {
        fn drop(&mut self) {
            if let Err(e) = tcsetattr(&self.tty, SetArg::TCSAFLUSH, &self.original) {
                warn!(error = %e, "Failed to restore terminal attributes");
            }
        }
    }
}

#[cfg(windows)]
mod console {
    use std::io;
    use std::time::Duration;

    use crossterm::event::{self, Event, KeyCode, KeyEvent};
    use volumelink_core::{ESCAPE, KeyInput};

    /// Console key events. Reading input records needs no console mode change.
    pub struct TerminalKeys {
        buffered: Option<u8>,
    }

    impl TerminalKeys {
        #[allow(clippy::unnecessary_wraps)]
        pub fn open() -> io::Result<Self> {
            Ok(Self { buffered: None })
        }
    }

    impl KeyInput for TerminalKeys {
        fn key_pending(&mut self) -> io::Result<bool> {
            while self.buffered.is_none() && event::poll(Duration::ZERO)? {
                if let Event::Key(KeyEvent { code, .. }) = event::read()? {
                    self.buffered = match code {
                        KeyCode::Esc => Some(ESCAPE),
                        KeyCode::Enter => Some(b'\r'),
                        KeyCode::Char(c) => u8::try_from(c).ok(),
                        _ => None,
                    };
                }
            }
            Ok(self.buffered.is_some())
        }

        fn read_key(&mut self) -> io::Result<u8> {
            if self.buffered.is_none() && !self.key_pending()? {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            self.buffered.take().ok_or_else(|| io::ErrorKind::WouldBlock.into())
        }
    }
}
