//! Shared fixtures for the integration tests: an in-memory Si570 device, a scripted
//! tuning frontend and a helper that runs the daemon on a loopback socket.
use std::{
    collections::VecDeque,
    io,
    net::{SocketAddr, UdpSocket},
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
};

use softrock_protocol::si570::{NOMINAL_XTAL_MHZ, Registers};
use softrock_server::{
    DeviceError, LoSettings, Si570Device,
    acquire::DeviceSelector,
    dispatch::{Dispatcher, SessionConfig},
    server::{Config, Server, ServerError},
    tuning::{TuningFrontend, TuningSession},
};

/// Observable state of a [MockDevice].
#[derive(Debug, Clone, Default)]
pub struct MockState {
    /// Raw frequency on the register path. 0.0 reads as a failure.
    pub raw_mhz: f64,
    pub by_value_mhz: f64,
    pub hardware_ptt: bool,
    pub ptt_writes: Vec<bool>,
    pub keys: u8,
    pub bpf: Option<bool>,
    pub lo_multiply: f64,
    /// Writes to the frequency fail while set
    pub fail_writes: bool,
    pub frequency_writes: usize,
    /// PTT switching fails while set
    pub fail_ptt: bool,
}

/// In-memory device. Clones share their state, so a test can keep one clone while the
/// daemon owns another.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn with_frequency(raw_mhz: f64) -> MockDevice {
        let device = MockDevice::default();
        device.state().raw_mhz = raw_mhz;
        device
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self, raw_mhz: f64, by_value: bool) -> Result<(), DeviceError> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(DeviceError::IoError(io::Error::other("transfer failed")));
        }
        state.frequency_writes += 1;
        if by_value {
            state.by_value_mhz = raw_mhz;
        } else {
            state.raw_mhz = raw_mhz;
        }
        Ok(())
    }
}

impl Si570Device for MockDevice {
    fn frequency(&self) -> Result<f64, DeviceError> {
        Ok(self.state().raw_mhz)
    }

    fn set_frequency(&self, raw_mhz: f64) -> Result<(), DeviceError> {
        self.write(raw_mhz, false)
    }

    fn frequency_by_value(&self) -> Result<f64, DeviceError> {
        Ok(self.state().by_value_mhz)
    }

    fn set_frequency_by_value(&self, raw_mhz: f64) -> Result<(), DeviceError> {
        self.write(raw_mhz, true)
    }

    fn ptt(&self) -> Result<bool, DeviceError> {
        Ok(self.state().hardware_ptt)
    }

    fn set_ptt(&self, on: bool) -> Result<(), DeviceError> {
        let mut state = self.state();
        if state.fail_ptt {
            return Err(DeviceError::IoError(io::Error::other("transfer failed")));
        }
        state.ptt_writes.push(on);
        Ok(())
    }

    fn keys(&self) -> Result<u8, DeviceError> {
        Ok(self.state().keys)
    }

    fn set_bpf(&self, enabled: bool) -> Result<(), DeviceError> {
        self.state().bpf = Some(enabled);
        Ok(())
    }

    fn multiply_lo(&self, _band: u8) -> Result<LoSettings, DeviceError> {
        Ok(LoSettings {
            multiply: self.state().lo_multiply,
            subtract: 0.0,
        })
    }

    fn registers(&self) -> Result<Registers, DeviceError> {
        let raw_mhz = self.state().raw_mhz;
        Registers::for_frequency(raw_mhz, NOMINAL_XTAL_MHZ)
            .ok_or(DeviceError::InvalidFrequency(raw_mhz))
    }
}

/// Opener for the acquirer that fails `failures` times before handing out `device`.
pub fn flaky_opener(
    failures: u32,
    device: MockDevice,
) -> impl FnMut(&DeviceSelector) -> Result<MockDevice, io::Error> {
    let mut attempts = 0;
    move |_| {
        attempts += 1;
        if attempts <= failures {
            Err(io::Error::new(io::ErrorKind::NotFound, "no device"))
        } else {
            Ok(device.clone())
        }
    }
}

/// Frontend that replays keys and records every rendered frame.
#[derive(Debug, Default)]
pub struct ScriptedFrontend {
    keys: VecDeque<char>,
    pub frames: Vec<TuningSession>,
}

impl ScriptedFrontend {
    pub fn new(keys: &str) -> ScriptedFrontend {
        ScriptedFrontend {
            keys: keys.chars().collect(),
            frames: Vec::new(),
        }
    }

    /// Rendered frequencies with six decimals.
    pub fn displayed(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|frame| format!("{:.6}", frame.frequency()))
            .collect()
    }
}

impl TuningFrontend for ScriptedFrontend {
    fn next_key(&mut self) -> io::Result<Option<char>> {
        Ok(self.keys.pop_front())
    }

    fn render(&mut self, session: &TuningSession) -> io::Result<()> {
        self.frames.push(*session);
        Ok(())
    }
}

/// A daemon serving on a loopback port in its own thread.
pub struct RunningDaemon {
    pub addr: SocketAddr,
    pub handle: JoinHandle<Result<Dispatcher<MockDevice>, ServerError>>,
}

pub fn spawn_daemon(device: MockDevice, session: SessionConfig) -> io::Result<RunningDaemon> {
    let socket = UdpSocket::bind("127.0.0.1:0")?;
    let addr = socket.local_addr()?;
    log::debug!("Test daemon on {}", addr);
    let handle = thread::spawn(move || {
        let mut server = Server::new(Dispatcher::new(device, session), Config::default());
        server.serve(socket)?;
        Ok(server.into_dispatcher())
    });
    Ok(RunningDaemon { addr, handle })
}
