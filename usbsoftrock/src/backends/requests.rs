//! Vendor control requests understood by the DG8SAQ / PE0FKO / Mobo firmware family.
//!
//! Frequencies are exchanged in 11.21 fixed point MHz, the crystal frequency in 8.24 and
//! filter crossover points in 11.5. Values that address the Si570 carry
//! `SI570_VALUE_BASE + i2c address` in `wValue`.

/// Strings reported by FiFi-SDR boards, which use the shared obdev VID/PID.
pub const FIFI_VENDOR_NAME: &str = "www.ov-lennestadt.de";
pub const FIFI_PRODUCT_NAME: &str = "FiFi-SDR";

pub const SI570_VALUE_BASE: u16 = 0x0700;
/// `wValue` of the version request
pub const VERSION_VALUE: u16 = 0x0E00;
/// `wIndex` selecting the whole filter table in [ControlRequest::Filters]
pub const FILTER_TABLE_INDEX: u16 = 0x00FF;
/// Added to `wIndex` of [ControlRequest::Filters] to address the low pass filters
pub const LPF_INDEX_OFFSET: u16 = 0x0100;
/// `wValue` of [ControlRequest::Filters] that reads without changing the filter state
pub const FILTER_READ_ONLY: u16 = 0xFFFF;

/// Number of crossover points returned in a filter table.
pub const FILTER_CROSSOVERS: usize = 4;

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlRequest {
    ReadVersion = 0x00,
    Filters = 0x17,
    SetBpfAddress = 0x18,
    SetLpfAddress = 0x19,
    SetFrequencyRegisters = 0x30,
    SetMultiplyLo = 0x31,
    SetFrequencyByValue = 0x32,
    SetXtalFrequency = 0x33,
    SetStartupFrequency = 0x34,
    ReadMultiplyLo = 0x39,
    ReadFrequency = 0x3A,
    ReadSmoothTune = 0x3B,
    ReadStartupFrequency = 0x3C,
    ReadXtalFrequency = 0x3D,
    ReadRegisters = 0x3F,
    /// Sets the Si570 address if `wIndex` is non-zero, always returns the current one
    Si570Address = 0x41,
    SetPtt = 0x50,
    ReadKeys = 0x51,
    ReadPtt = 0x52,
}
