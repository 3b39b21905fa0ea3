//! Device double for the command line tests. It records every call so tests can check
//! which requests a command sends.
use std::cell::RefCell;

use softrock_server::{DeviceError, FirmwareVersion, LoSettings, Si570Device};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Frequency,
    SetFrequency(f64),
    FrequencyByValue,
    SetFrequencyByValue(f64),
    MultiplyLo(u8),
    SetMultiplyLo(u8, LoSettings),
    SetBpfAddress(u8, u8),
    SetBpfCrossover(u8, f64),
    BpfCrossovers,
    SetLpfAddress(u8, u8),
    SetLpfCrossover(u8, f64),
    LpfCrossovers,
    Si570Address,
    SetXtalFrequency(f64),
    XtalFrequency,
    SetStartupFrequency(f64),
    StartupFrequency,
    SmoothTune,
}

pub struct RecordingDevice {
    pub version: FirmwareVersion,
    pub lo: LoSettings,
    pub crossovers: Vec<f64>,
    pub calls: RefCell<Vec<Call>>,
}

impl RecordingDevice {
    pub fn new(version: u16) -> RecordingDevice {
        RecordingDevice {
            version: FirmwareVersion::from(version),
            lo: LoSettings {
                multiply: 1.0,
                subtract: 0.0,
            },
            crossovers: vec![8.0, 16.0, 32.0, 64.0],
            calls: RefCell::new(Vec::new()),
        }
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    pub fn called(&self, call: &Call) -> bool {
        self.calls.borrow().contains(call)
    }
}

impl Si570Device for RecordingDevice {
    fn frequency(&self) -> Result<f64, DeviceError> {
        self.record(Call::Frequency);
        Ok(28.0)
    }

    fn set_frequency(&self, raw_mhz: f64) -> Result<(), DeviceError> {
        self.record(Call::SetFrequency(raw_mhz));
        Ok(())
    }

    fn frequency_by_value(&self) -> Result<f64, DeviceError> {
        self.record(Call::FrequencyByValue);
        Ok(28.0)
    }

    fn set_frequency_by_value(&self, raw_mhz: f64) -> Result<(), DeviceError> {
        self.record(Call::SetFrequencyByValue(raw_mhz));
        Ok(())
    }

    fn ptt(&self) -> Result<bool, DeviceError> {
        Ok(false)
    }

    fn set_ptt(&self, _on: bool) -> Result<(), DeviceError> {
        Ok(())
    }

    fn keys(&self) -> Result<u8, DeviceError> {
        Ok(0)
    }

    fn set_bpf(&self, _enabled: bool) -> Result<(), DeviceError> {
        Ok(())
    }

    fn multiply_lo(&self, band: u8) -> Result<LoSettings, DeviceError> {
        self.record(Call::MultiplyLo(band));
        Ok(self.lo)
    }

    fn version(&self) -> Result<FirmwareVersion, DeviceError> {
        Ok(self.version)
    }

    fn serial_number(&self) -> Option<String> {
        Some("PE0FKO-0".to_string())
    }

    fn set_multiply_lo(&self, band: u8, lo: LoSettings) -> Result<(), DeviceError> {
        self.record(Call::SetMultiplyLo(band, lo));
        Ok(())
    }

    fn set_bpf_address(&self, band: u8, filter: u8) -> Result<(), DeviceError> {
        self.record(Call::SetBpfAddress(band, filter));
        Ok(())
    }

    fn set_bpf_crossover(&self, index: u8, mhz: f64) -> Result<(), DeviceError> {
        self.record(Call::SetBpfCrossover(index, mhz));
        Ok(())
    }

    fn bpf_crossovers(&self) -> Result<Vec<f64>, DeviceError> {
        self.record(Call::BpfCrossovers);
        Ok(self.crossovers.clone())
    }

    fn set_lpf_address(&self, band: u8, filter: u8) -> Result<(), DeviceError> {
        self.record(Call::SetLpfAddress(band, filter));
        Ok(())
    }

    fn set_lpf_crossover(&self, index: u8, mhz: f64) -> Result<(), DeviceError> {
        self.record(Call::SetLpfCrossover(index, mhz));
        Ok(())
    }

    fn lpf_crossovers(&self) -> Result<Vec<f64>, DeviceError> {
        self.record(Call::LpfCrossovers);
        Ok(self.crossovers.clone())
    }

    fn si570_address(&self) -> Result<u8, DeviceError> {
        self.record(Call::Si570Address);
        Ok(0x55)
    }

    fn set_xtal_frequency(&self, mhz: f64) -> Result<(), DeviceError> {
        self.record(Call::SetXtalFrequency(mhz));
        Ok(())
    }

    fn xtal_frequency(&self) -> Result<f64, DeviceError> {
        self.record(Call::XtalFrequency);
        Ok(114.285)
    }

    fn set_startup_frequency(&self, mhz: f64) -> Result<(), DeviceError> {
        self.record(Call::SetStartupFrequency(mhz));
        Ok(())
    }

    fn startup_frequency(&self) -> Result<f64, DeviceError> {
        self.record(Call::StartupFrequency);
        Ok(56.32)
    }

    fn smooth_tune_ppm(&self) -> Result<u16, DeviceError> {
        self.record(Call::SmoothTune);
        Ok(3500)
    }
}
