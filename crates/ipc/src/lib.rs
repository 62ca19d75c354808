#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `ipc` implements the fixed-width command channel the coordinator uses to
//! talk to its rotator and syncer children over a `socketpair(2)`. Unlike
//! most line- or length-prefixed protocols, each message is exactly one
//! native `int` wide: there is no framing to get wrong, at the cost of the
//! protocol only ever carrying a single small integer per message.
//!
//! # Design
//!
//! [`Command`] enumerates the fixed set of values both ends understand.
//! [`write_command`]/[`read_command`] move a `Command` across any
//! `Read`/`Write` pair; [`read_command`] maps a clean EOF to
//! `Command::Closed` rather than an error, since a child closing its end of
//! the socket to signal "I'm done" is the normal shutdown path, not a fault.
//!
//! # Invariants
//!
//! - The wire representation is the target's native-endian `i32`; this
//!   protocol is not meant to cross machine boundaries; it only ever runs
//!   over a local `socketpair`.
//! - A short read (more than zero bytes but fewer than four) is always an
//!   error, never silently padded or truncated.
//!
//! # Errors
//!
//! [`IpcError`] reports I/O failures, a short read, and an unrecognized
//! command value.
//!
//! # Examples
//!
//! ```
//! use ipc::{read_command, write_command, Command};
//! use std::io::Cursor;
//!
//! let mut buf = Vec::new();
//! write_command(&mut buf, Command::Ready).unwrap();
//! let mut cursor = Cursor::new(buf);
//! assert_eq!(read_command(&mut cursor).unwrap(), Command::Ready);
//! ```
//!
//! # See also
//!
//! - the `coordinator` crate, which owns the `socketpair` file descriptors
//!   this protocol runs over.

use std::io::{Read, Write};

/// A single fixed-width command exchanged over the coordinator's IPC
/// channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Command {
    /// The peer closed its end of the channel (mapped from EOF, never sent
    /// on the wire).
    Closed = 0x0000,
    /// Told to begin work.
    Start = 0x0001,
    /// Told to exit without doing any work.
    Stop = 0x0002,
    /// Reports that the rotator has prepared a fresh sync area and is
    /// waiting for permission to proceed.
    Ready = 0x0004,
    /// Tells the rotator to discard the just-synced sync area rather than
    /// moving it in.
    RotCleanup = 0x0008,
    /// Tells the rotator to move the just-synced sync area into the first
    /// interval.
    RotInclude = 0x000c,
    /// A custom command, followed on the wire by one additional `i32`
    /// payload value (not modeled by this enum; callers that send
    /// [`Command::Cust`] must separately write the payload).
    Cust = 0x0010,
}

impl Command {
    fn from_raw(raw: i32) -> Result<Self, IpcError> {
        match raw {
            0x0000 => Ok(Self::Closed),
            0x0001 => Ok(Self::Start),
            0x0002 => Ok(Self::Stop),
            0x0004 => Ok(Self::Ready),
            0x0008 => Ok(Self::RotCleanup),
            0x000c => Ok(Self::RotInclude),
            0x0010 => Ok(Self::Cust),
            other => Err(IpcError::UnknownCommand(other)),
        }
    }
}

/// Errors produced while reading or writing a [`Command`].
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// The underlying channel returned an I/O error.
    #[error("ipc I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A read returned between 1 and 3 bytes: the peer wrote a partial
    /// command, which this protocol never considers valid.
    #[error("short read: expected 4 bytes, got {0}")]
    ShortRead(usize),
    /// The 4 bytes read did not correspond to any known [`Command`] variant.
    #[error("unknown command value: {0:#x}")]
    UnknownCommand(i32),
}

/// Write `command` to `channel` as a single native-endian `i32`.
pub fn write_command<W: Write>(channel: &mut W, command: Command) -> Result<(), IpcError> {
    channel.write_all(&(command as i32).to_ne_bytes())?;
    Ok(())
}

/// Write a [`Command::Cust`] command followed by its `i32` payload.
pub fn write_custom<W: Write>(channel: &mut W, payload: i32) -> Result<(), IpcError> {
    write_command(channel, Command::Cust)?;
    channel.write_all(&payload.to_ne_bytes())?;
    Ok(())
}

/// Read one command from `channel`. A clean EOF (zero bytes read) is
/// reported as [`Command::Closed`] rather than an error.
pub fn read_command<R: Read>(channel: &mut R) -> Result<Command, IpcError> {
    let mut buf = [0u8; 4];
    let mut read_total = 0;
    loop {
        let n = channel.read(&mut buf[read_total..])?;
        if n == 0 {
            break;
        }
        read_total += n;
        if read_total == buf.len() {
            break;
        }
    }

    if read_total == 0 {
        return Ok(Command::Closed);
    }
    if read_total != buf.len() {
        return Err(IpcError::ShortRead(read_total));
    }

    Command::from_raw(i32::from_ne_bytes(buf))
}

/// Read the `i32` payload that follows a [`Command::Cust`] command.
pub fn read_custom_payload<R: Read>(channel: &mut R) -> Result<i32, IpcError> {
    let mut buf = [0u8; 4];
    channel.read_exact(&mut buf)?;
    Ok(i32::from_ne_bytes(buf))
}

#[cfg(unix)]
pub mod channel;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_every_command() {
        for cmd in [
            Command::Start,
            Command::Stop,
            Command::Ready,
            Command::RotCleanup,
            Command::RotInclude,
            Command::Cust,
        ] {
            let mut buf = Vec::new();
            write_command(&mut buf, cmd).unwrap();
            let mut cursor = Cursor::new(buf);
            assert_eq!(read_command(&mut cursor).unwrap(), cmd);
        }
    }

    #[test]
    fn eof_maps_to_closed() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_command(&mut cursor).unwrap(), Command::Closed);
    }

    #[test]
    fn short_read_is_an_error() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        assert!(matches!(
            read_command(&mut cursor),
            Err(IpcError::ShortRead(3))
        ));
    }

    #[test]
    fn unknown_value_is_an_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0x1234_i32.to_ne_bytes());
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            read_command(&mut cursor),
            Err(IpcError::UnknownCommand(0x1234))
        ));
    }

    #[test]
    fn custom_payload_round_trips() {
        let mut buf = Vec::new();
        write_custom(&mut buf, 42).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_command(&mut cursor).unwrap(), Command::Cust);
        assert_eq!(read_custom_payload(&mut cursor).unwrap(), 42);
    }
}
