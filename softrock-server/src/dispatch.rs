use std::{error::Error, fmt::Display};

use softrock_protocol::{
    Command, Query, Reply,
    error::ParseError,
    si570::{self, DEFAULT_I2C_ADDRESS, DEFAULT_STARTUP_MHZ, NOMINAL_XTAL_MHZ},
    units::Multiplier,
};

use crate::{DeviceError, Si570Device};

/// CW tone reported before any `set tone`.
pub const DEFAULT_CW_TONE: i32 = 700;

/// Configuration of a session, fixed at startup.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub i2c_address: u8,
    pub xtal_mhz: f64,
    pub startup_mhz: f64,
    /// Initial multiplier. It can later be changed with `set local_multiplier`.
    pub multiplier: Multiplier,
    /// Let the firmware compute the Si570 registers.
    pub set_by_value: bool,
    /// Read the PTT state from the hardware instead of reporting the cached state.
    pub firmware_ptt: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            i2c_address: DEFAULT_I2C_ADDRESS,
            xtal_mhz: NOMINAL_XTAL_MHZ,
            startup_mhz: DEFAULT_STARTUP_MHZ,
            multiplier: Multiplier::default(),
            set_by_value: false,
            firmware_ptt: false,
        }
    }
}

/// State that commands change during a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub multiplier: Multiplier,
    pub ptt: bool,
    pub keys: u8,
    pub cw_tone: i32,
}

impl SessionState {
    fn new(config: &SessionConfig) -> SessionState {
        SessionState {
            multiplier: config.multiplier,
            ptt: false,
            keys: 0,
            cw_tone: DEFAULT_CW_TONE,
        }
    }
}

/// Successful result of a command.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Outcome {
    Done,
    Ptt(bool),
    Keys(u8),
    /// Frequency in user units
    Frequency(f64),
    Tone(i32),
    Multiplier(f64),
}

impl From<Outcome> for Reply {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Done => Reply::ok(),
            Outcome::Ptt(on) => Reply::value(on as u8),
            Outcome::Keys(keys) => Reply::value(keys),
            Outcome::Frequency(freq) => Reply::value(format!("{:.6}", freq)),
            Outcome::Tone(tone) => Reply::value(tone),
            Outcome::Multiplier(m) => Reply::value(format!("{:.6}", m)),
        }
    }
}

/// Why a command failed.
#[derive(Debug)]
pub enum DispatchError {
    Parse(ParseError),
    Device(DeviceError),
    /// The device returned the zero sentinel
    ReadFailed,
    InvalidMultiplier(f64),
}

impl From<ParseError> for DispatchError {
    fn from(value: ParseError) -> Self {
        DispatchError::Parse(value)
    }
}

impl From<DeviceError> for DispatchError {
    fn from(value: DeviceError) -> Self {
        DispatchError::Device(value)
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Parse(error) => write!(f, "{}", error),
            DispatchError::Device(error) => write!(f, "{}", error),
            DispatchError::ReadFailed => write!(f, "Failed to read frequency from device"),
            DispatchError::InvalidMultiplier(m) => {
                write!(f, "Multiplier must be positive, got {}", m)
            }
        }
    }
}

impl Error for DispatchError {}

/// Result of a crystal calibration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Calibration {
    pub registers: si570::Registers,
    pub xtal_mhz: f64,
}

/// Maps commands onto device operations.
///
/// The dispatcher owns the device handle and the session state. Both the command line and
/// the daemon go through the same dispatcher, so they share the unit conversion and the
/// cached values.
#[derive(Debug)]
pub struct Dispatcher<D: Si570Device> {
    device: D,
    config: SessionConfig,
    state: SessionState,
}

impl<D: Si570Device> Dispatcher<D> {
    pub fn new(device: D, config: SessionConfig) -> Dispatcher<D> {
        let state = SessionState::new(&config);
        Dispatcher {
            device,
            config,
            state,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Resolve and run a token list. Never fails: errors become [Reply::Error].
    pub fn dispatch<S: AsRef<str>>(&mut self, tokens: &[S]) -> Reply {
        let result = Command::from_tokens(tokens)
            .map_err(DispatchError::from)
            .and_then(|command| self.execute(command));
        match result {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                log::debug!("Command failed: {}", e);
                Reply::Error
            }
        }
    }

    /// Run a single command.
    pub fn execute(&mut self, command: Command) -> Result<Outcome, DispatchError> {
        log::debug!("Executing {}", command);
        match command {
            Command::Get(Query::Ptt) => Ok(Outcome::Ptt(self.ptt()?)),
            Command::Get(Query::Keys) => Ok(Outcome::Keys(self.keys()?)),
            Command::Get(Query::Frequency) => self.read_frequency().map(Outcome::Frequency),
            Command::Get(Query::Tone) => Ok(Outcome::Tone(self.state.cw_tone)),
            Command::Get(Query::Si570Multiplier) => {
                // Only band 0 is reported, per band multipliers are not exposed here
                let lo = self.device.multiply_lo(0)?;
                Ok(Outcome::Multiplier(lo.multiply))
            }
            Command::Get(Query::LocalMultiplier) => {
                Ok(Outcome::Multiplier(self.state.multiplier.factor()))
            }
            Command::SetPtt(on) => {
                self.set_ptt(on)?;
                Ok(Outcome::Done)
            }
            Command::SetBpf(enabled) => {
                self.device.set_bpf(enabled)?;
                Ok(Outcome::Done)
            }
            Command::SetFrequency(freq) => {
                self.write_frequency(freq)?;
                Ok(Outcome::Done)
            }
            Command::SetTone(tone) => {
                self.state.cw_tone = tone;
                Ok(Outcome::Done)
            }
            Command::SetLocalMultiplier(factor) => {
                self.state.multiplier =
                    Multiplier::new(factor).ok_or(DispatchError::InvalidMultiplier(factor))?;
                log::info!("Local multiplier set to {}", self.state.multiplier);
                Ok(Outcome::Done)
            }
        }
    }

    /// Read the current frequency in user units, honoring the by-value setting.
    pub fn read_frequency(&self) -> Result<f64, DispatchError> {
        let raw = if self.config.set_by_value {
            self.device.frequency_by_value()?
        } else {
            self.device.frequency()?
        };
        let freq = self
            .state
            .multiplier
            .to_user_checked(raw)
            .ok_or(DispatchError::ReadFailed)?;
        log::debug!(
            "Frequency   : {:.6} (x {:.2})",
            freq,
            self.state.multiplier.factor()
        );
        Ok(freq)
    }

    /// Program a frequency given in user units, honoring the by-value setting.
    ///
    /// Both paths reject a device frequency outside the range of the 11.21 wire format.
    pub fn write_frequency(&self, freq: f64) -> Result<(), DeviceError> {
        let raw = self.state.multiplier.to_device(freq);
        if !(raw > 0.0 && raw < si570::FIXED_11_21_LIMIT_MHZ) {
            return Err(DeviceError::InvalidFrequency(raw));
        }
        log::debug!("Setting frequency {:.6} (raw {:.6})", freq, raw);
        if self.config.set_by_value {
            self.device.set_frequency_by_value(raw)
        } else {
            self.device.set_frequency(raw)
        }
    }

    /// PTT state, from the hardware if configured, otherwise the last state set.
    pub fn ptt(&mut self) -> Result<bool, DeviceError> {
        if self.config.firmware_ptt {
            self.state.ptt = self.device.ptt()?;
        }
        Ok(self.state.ptt)
    }

    pub fn keys(&mut self) -> Result<u8, DeviceError> {
        self.state.keys = self.device.keys()?;
        Ok(self.state.keys)
    }

    /// Switch PTT and remember the state for later queries.
    pub fn set_ptt(&mut self, on: bool) -> Result<(), DeviceError> {
        self.device.set_ptt(on)?;
        self.state.ptt = on;
        Ok(())
    }

    /// Derive the crystal frequency from the registers, assuming the Si570 still runs at
    /// the configured startup frequency.
    pub fn calibrate(&self) -> Result<Calibration, DispatchError> {
        let registers = self.device.registers()?;
        let xtal_mhz = si570::calibrated_xtal(&registers, self.config.startup_mhz)
            .ok_or(DispatchError::ReadFailed)?;
        log::info!(
            "Calibrated crystal frequency {:.6} MHz from startup frequency {:.6} MHz",
            xtal_mhz,
            self.config.startup_mhz
        );
        Ok(Calibration {
            registers,
            xtal_mhz,
        })
    }
}
