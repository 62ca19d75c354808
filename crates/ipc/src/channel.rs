//! A `socketpair(2)`-backed duplex channel carrying [`crate::Command`]
//! values.

use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

/// One end of a bidirectional `socketpair` used for the coordinator's
/// command channel. Implements [`Read`] and [`Write`] so it can be used
/// directly with [`crate::read_command`]/[`crate::write_command`].
#[derive(Debug)]
pub struct Channel(OwnedFd);

/// Create a connected pair of [`Channel`]s. `CLOEXEC` is not set: the whole
/// point of this channel is to survive a `fork`+`exec` into the rotator or
/// syncer binary, which inherits one end across the exec boundary and
/// closes the other explicitly.
pub fn pair() -> io::Result<(Channel, Channel)> {
    let (a, b) = socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::empty(),
    )
    .map_err(io::Error::from)?;
    Ok((Channel(a), Channel(b)))
}

impl Channel {
    /// Wrap an already-open file descriptor as a [`Channel`], taking
    /// ownership of it. Used by a freshly exec'd child to adopt the fd
    /// number its parent arranged for it to inherit.
    pub fn from_owned_fd(fd: OwnedFd) -> Self {
        Self(fd)
    }

    /// Borrow the underlying file descriptor without giving up ownership.
    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl AsRawFd for Channel {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

impl Read for Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        nix::unistd::read(&self.0, buf).map_err(io::Error::from)
    }
}

impl Write for Channel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        nix::unistd::write(&self.0, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{read_command, write_command, Command};

    #[test]
    fn pair_carries_commands_in_both_directions() {
        let (mut a, mut b) = pair().unwrap();
        write_command(&mut a, Command::Ready).unwrap();
        assert_eq!(read_command(&mut b).unwrap(), Command::Ready);

        write_command(&mut b, Command::RotInclude).unwrap();
        assert_eq!(read_command(&mut a).unwrap(), Command::RotInclude);
    }
}
