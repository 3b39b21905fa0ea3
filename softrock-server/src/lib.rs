//! # SoftRock Server Library
//!
//! This crate provides everything between a text command and the Si570 hardware:
//! acquiring the device, dispatching commands, serving them over UDP and the
//! keystroke driven tuning loop.
//!
//! ## Architecture
//!
//! - **[`Si570Device`] Trait**: The operations a device backend offers. All frequencies
//!   crossing this trait are raw device frequencies in MHz, i.e. before the local
//!   multiplier is applied.
//! - **[`acquire`]**: Opening the device with a bounded number of retries
//! - **[`dispatch::Dispatcher`]**: Maps commands onto device operations and owns the
//!   session state. Used identically by the command line and the daemon.
//! - **[`server::Server`]**: The UDP daemon
//! - **[`tuning`]**: The interactive tuning state machine
//!
//! ## Basic Usage
//!
//! ```ignore
//! use softrock_server::dispatch::{Dispatcher, SessionConfig};
//! use softrock_server::server::{Config, Server};
//!
//! let dispatcher = Dispatcher::new(my_device, SessionConfig::default());
//! let mut server = Server::new(dispatcher, Config::default());
//! server.listen(("0.0.0.0", 19004))?;
//! ```
//!
//! ## Error Handling
//!
//! Device operations return [`DeviceError`]. The dispatcher never fails: every error is
//! turned into an `error` reply. Only acquiring the device and binding or answering on
//! the UDP socket are fatal.
//!
//! ## Thread Model
//!
//! Everything runs on the calling thread. Requests are processed one at a time, a slow
//! device operation blocks the daemon for all clients. This matches the device, which
//! can only serve one control transfer at a time.
use std::{error::Error, fmt::Display, io};

use softrock_protocol::si570::Registers;

pub mod acquire;
pub mod dispatch;
pub mod server;
pub mod tuning;

/// Errors reported by a device backend.
#[derive(Debug)]
pub enum DeviceError {
    IoError(io::Error),
    /// The device answered with fewer bytes than the request needs
    ShortResponse { expected: usize, got: usize },
    /// The frequency cannot be produced by the oscillator
    InvalidFrequency(f64),
    /// The backend or firmware does not implement this operation
    Unsupported(&'static str),
}

impl From<io::Error> for DeviceError {
    fn from(value: io::Error) -> Self {
        DeviceError::IoError(value)
    }
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::IoError(error) => write!(f, "{}", error),
            DeviceError::ShortResponse { expected, got } => {
                write!(f, "Short response! Expected {} bytes, but got {}", expected, got)
            }
            DeviceError::InvalidFrequency(freq) => {
                write!(f, "Frequency {:.6} MHz is out of range", freq)
            }
            DeviceError::Unsupported(operation) => {
                write!(f, "Operation {} is not supported by this device", operation)
            }
        }
    }
}

impl Error for DeviceError {}

/// Firmware version as reported by the device
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl From<u16> for FirmwareVersion {
    fn from(value: u16) -> Self {
        FirmwareVersion {
            major: (value >> 8) as u8,
            minor: (value & 0xFF) as u8,
        }
    }
}

impl Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Per band LO correction stored in the firmware: `f_lo = (f - subtract) * multiply`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoSettings {
    pub multiply: f64,
    pub subtract: f64,
}

/// Trait that device backends implement.
///
/// The first group of operations is needed by the command dispatcher and must be
/// implemented. The remaining operations back the extended command line surface and
/// default to [`DeviceError::Unsupported`].
///
/// A raw frequency reading of exactly `0.0` signals a failed read.
/// The device is closed when the value is dropped.
pub trait Si570Device {
    /// Read the frequency by reading and decoding the Si570 registers.
    fn frequency(&self) -> Result<f64, DeviceError>;

    /// Set the frequency by computing the Si570 registers on the host.
    fn set_frequency(&self, raw_mhz: f64) -> Result<(), DeviceError>;

    /// Read the frequency the firmware last programmed.
    fn frequency_by_value(&self) -> Result<f64, DeviceError>;

    /// Let the firmware compute the registers for the frequency.
    fn set_frequency_by_value(&self, raw_mhz: f64) -> Result<(), DeviceError>;

    /// Read the PTT state from the hardware port.
    fn ptt(&self) -> Result<bool, DeviceError>;

    fn set_ptt(&self, on: bool) -> Result<(), DeviceError>;

    /// Read the CW paddle state. 0: none, 1: dit, 2: dah, 3: both.
    fn keys(&self) -> Result<u8, DeviceError>;

    /// Enable or disable the automatic band pass filter selection.
    fn set_bpf(&self, enabled: bool) -> Result<(), DeviceError>;

    fn multiply_lo(&self, band: u8) -> Result<LoSettings, DeviceError>;

    fn version(&self) -> Result<FirmwareVersion, DeviceError> {
        Err(DeviceError::Unsupported("version"))
    }

    fn serial_number(&self) -> Option<String> {
        None
    }

    /// Read the raw frequency registers of the Si570.
    fn registers(&self) -> Result<Registers, DeviceError> {
        Err(DeviceError::Unsupported("registers"))
    }

    fn set_multiply_lo(&self, _band: u8, _lo: LoSettings) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_multiply_lo"))
    }

    /// Map a band to one of the band pass filter outputs.
    fn set_bpf_address(&self, _band: u8, _filter: u8) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_bpf_address"))
    }

    fn set_bpf_crossover(&self, _index: u8, _mhz: f64) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_bpf_crossover"))
    }

    fn bpf_crossovers(&self) -> Result<Vec<f64>, DeviceError> {
        Err(DeviceError::Unsupported("bpf_crossovers"))
    }

    fn set_lpf(&self, _enabled: bool) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_lpf"))
    }

    fn set_lpf_address(&self, _band: u8, _filter: u8) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_lpf_address"))
    }

    fn set_lpf_crossover(&self, _index: u8, _mhz: f64) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_lpf_crossover"))
    }

    fn lpf_crossovers(&self) -> Result<Vec<f64>, DeviceError> {
        Err(DeviceError::Unsupported("lpf_crossovers"))
    }

    fn set_si570_address(&self, _address: u8) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_si570_address"))
    }

    fn si570_address(&self) -> Result<u8, DeviceError> {
        Err(DeviceError::Unsupported("si570_address"))
    }

    /// Store a calibrated crystal frequency in the firmware.
    fn set_xtal_frequency(&self, _mhz: f64) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_xtal_frequency"))
    }

    fn xtal_frequency(&self) -> Result<f64, DeviceError> {
        Err(DeviceError::Unsupported("xtal_frequency"))
    }

    /// Store the frequency the firmware programs at power up.
    fn set_startup_frequency(&self, _mhz: f64) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("set_startup_frequency"))
    }

    fn startup_frequency(&self) -> Result<f64, DeviceError> {
        Err(DeviceError::Unsupported("startup_frequency"))
    }

    fn smooth_tune_ppm(&self) -> Result<u16, DeviceError> {
        Err(DeviceError::Unsupported("smooth_tune_ppm"))
    }
}

#[test]
fn firmware_version_from_word() {
    let version = FirmwareVersion::from(0x0F0C);
    assert_eq!(version, FirmwareVersion { major: 15, minor: 12 });
    assert_eq!(version.to_string(), "15.12");
    assert!(FirmwareVersion::from(0x1000) > version);
}
