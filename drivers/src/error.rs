//! Error types shared by the drivers.

use std::fmt;
use std::io;

/// A failed pin or bus access.
#[derive(Debug)]
pub enum BusError {
    /// A GPIO line could not be configured, driven or read.
    Gpio { pin: u8, reason: String },
    /// An I2C transaction was not acknowledged.
    I2c { address: u8, register: u8 },
    /// The serial link refused a read or write.
    Serial(String),
    /// An operating system device node failed.
    Io(io::Error),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio { pin, reason } => write!(f, "GPIO {pin}: {reason}"),
            Self::I2c { address, register } => write!(
                f,
                "I2C transaction with device 0x{address:02X} register 0x{register:02X} failed"
            ),
            Self::Serial(reason) => write!(f, "serial link: {reason}"),
            Self::Io(err) => write!(f, "device I/O: {err}"),
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BusError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Why a controller packet was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// The frame was not exactly [`PACKET_LEN`](crate::packet::PACKET_LEN) bytes.
    Frame { len: usize },
    /// The trailing checksum byte disagreed with the payload.
    Checksum { expected: u8, actual: u8 },
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame { len } => write!(
                f,
                "bad frame: {len} bytes (expected {})",
                crate::packet::PACKET_LEN
            ),
            Self::Checksum { expected, actual } => write!(
                f,
                "bad checksum: 0x{actual:02X} != 0x{expected:02X}"
            ),
        }
    }
}

impl std::error::Error for PacketError {}

/// Top-level driver error.
#[derive(Debug)]
pub enum Error {
    Bus(BusError),
    Packet(PacketError),
    /// A configuration table was inconsistent (duplicate pins, lines, buttons).
    Config(String),
    /// A configuration file could not be read.
    Io(io::Error),
    /// A configuration file could not be parsed.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(err) => write!(f, "bus access failed: {err}"),
            Self::Packet(err) => write!(f, "packet rejected: {err}"),
            Self::Config(reason) => write!(f, "invalid configuration: {reason}"),
            Self::Io(err) => write!(f, "reading configuration: {err}"),
            Self::Json(err) => write!(f, "parsing configuration: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bus(err) => Some(err),
            Self::Packet(err) => Some(err),
            Self::Config(_) => None,
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<BusError> for Error {
    fn from(err: BusError) -> Self {
        Self::Bus(err)
    }
}

impl From<PacketError> for Error {
    fn from(err: PacketError) -> Self {
        Self::Packet(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
