//! # USB Backend
//!
//! Talks to the AVR firmware that bridges USB control transfers to the Si570 I2C bus.
//!
//! ## Example Usage
//!
//! ```ignore
//! use softrock_server::acquire::{DeviceSelector, acquire_blocking};
//!
//! let settings = Si570Settings::default();
//! let backend = acquire_blocking(&DeviceSelector::default(), |s| UsbBackend::open(s, settings))?;
//! println!("Firmware {}", backend.version()?);
//! ```
use std::{io, time::Duration};

use nusb::{
    MaybeFuture,
    transfer::{ControlIn, ControlOut, ControlType, Recipient},
};
use softrock_protocol::si570::{
    DEFAULT_I2C_ADDRESS, NOMINAL_XTAL_MHZ, Registers, from_fixed_8_24, from_fixed_11_5,
    from_fixed_11_21, from_fixed_i11_21, to_fixed_8_24, to_fixed_11_5, to_fixed_11_21,
    to_fixed_i11_21,
};
use softrock_server::{
    DeviceError, FirmwareVersion, LoSettings, Si570Device, acquire::DeviceSelector,
    dispatch::SessionConfig,
};

use super::requests::{
    ControlRequest, FILTER_CROSSOVERS, FILTER_READ_ONLY, FILTER_TABLE_INDEX, LPF_INDEX_OFFSET,
    SI570_VALUE_BASE, VERSION_VALUE,
};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Si570 parameters the backend needs to compute registers.
#[derive(Copy, Clone, Debug)]
pub struct Si570Settings {
    pub i2c_address: u8,
    pub xtal_mhz: f64,
}

impl Default for Si570Settings {
    fn default() -> Self {
        Self {
            i2c_address: DEFAULT_I2C_ADDRESS,
            xtal_mhz: NOMINAL_XTAL_MHZ,
        }
    }
}

impl From<&SessionConfig> for Si570Settings {
    fn from(session: &SessionConfig) -> Self {
        Self {
            i2c_address: session.i2c_address,
            xtal_mhz: session.xtal_mhz,
        }
    }
}

/// An opened SoftRock compatible USB device.
pub struct UsbBackend {
    device: nusb::Device,
    serial: Option<String>,
    settings: Si570Settings,
}

fn matches(info: &nusb::DeviceInfo, selector: &DeviceSelector) -> bool {
    info.vendor_id() == selector.vendor_id
        && info.product_id() == selector.product_id
        && info.manufacturer_string() == Some(selector.vendor_name.as_str())
        && info.product_string() == Some(selector.product_name.as_str())
        && selector
            .serial
            .as_deref()
            .is_none_or(|serial| info.serial_number() == Some(serial))
}

impl UsbBackend {
    pub fn open(selector: &DeviceSelector, settings: Si570Settings) -> io::Result<UsbBackend> {
        let info = nusb::list_devices()
            .wait()
            .map_err(io::Error::other)?
            .inspect(|info| {
                log::trace!(
                    "Found USB device {:04x}:{:04x} {:?} {:?}",
                    info.vendor_id(),
                    info.product_id(),
                    info.manufacturer_string(),
                    info.product_string()
                )
            })
            .find(|info| matches(info, selector))
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No matching device found"))?;
        let serial = info.serial_number().map(str::to_string);
        log::debug!("Opening device {:?} (serial {:?})", info, serial);
        let device = info.open().wait().map_err(io::Error::other)?;
        Ok(UsbBackend {
            device,
            serial,
            settings,
        })
    }

    fn si570_value(&self) -> u16 {
        SI570_VALUE_BASE + self.settings.i2c_address as u16
    }

    fn read(
        &self,
        request: ControlRequest,
        value: u16,
        index: u16,
        length: u16,
    ) -> Result<Vec<u8>, DeviceError> {
        let data = self
            .device
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request: request as u8,
                    value,
                    index,
                    length,
                },
                TIMEOUT,
            )
            .wait()
            .map_err(io::Error::other)?;
        log::trace!("{:?} in: {:02x?}", request, data);
        Ok(data)
    }

    fn read_exact<const N: usize>(
        &self,
        request: ControlRequest,
        value: u16,
        index: u16,
    ) -> Result<[u8; N], DeviceError> {
        let data = self.read(request, value, index, N as u16)?;
        data.as_slice()
            .try_into()
            .map_err(|_| DeviceError::ShortResponse {
                expected: N,
                got: data.len(),
            })
    }

    fn write(
        &self,
        request: ControlRequest,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<(), DeviceError> {
        log::trace!("{:?} out: {:02x?}", request, data);
        self.device
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request: request as u8,
                    value,
                    index,
                    data,
                },
                TIMEOUT,
            )
            .wait()
            .map_err(io::Error::other)?;
        Ok(())
    }

    fn read_u32(&self, request: ControlRequest) -> Result<u32, DeviceError> {
        Ok(u32::from_le_bytes(self.read_exact::<4>(request, 0, 0)?))
    }

    fn filter_table(&self, index: u16) -> Result<Vec<f64>, DeviceError> {
        let data = self.read(
            ControlRequest::Filters,
            FILTER_READ_ONLY,
            index,
            (2 * FILTER_CROSSOVERS) as u16,
        )?;
        if data.len() < 2 * FILTER_CROSSOVERS {
            return Err(DeviceError::ShortResponse {
                expected: 2 * FILTER_CROSSOVERS,
                got: data.len(),
            });
        }
        Ok(data
            .chunks_exact(2)
            .map(|pair| from_fixed_11_5(u16::from_le_bytes([pair[0], pair[1]])))
            .collect())
    }
}

impl Drop for UsbBackend {
    fn drop(&mut self) {
        log::debug!("Closing USB device");
    }
}

impl Si570Device for UsbBackend {
    fn frequency(&self) -> Result<f64, DeviceError> {
        let registers = self.registers()?;
        Ok(registers.frequency(self.settings.xtal_mhz))
    }

    fn set_frequency(&self, raw_mhz: f64) -> Result<(), DeviceError> {
        let registers = Registers::for_frequency(raw_mhz, self.settings.xtal_mhz)
            .ok_or(DeviceError::InvalidFrequency(raw_mhz))?;
        log::debug!("Setting registers {} for {:.6} MHz", registers, raw_mhz);
        self.write(
            ControlRequest::SetFrequencyRegisters,
            self.si570_value(),
            0,
            &registers.0,
        )
    }

    fn frequency_by_value(&self) -> Result<f64, DeviceError> {
        Ok(from_fixed_11_21(self.read_u32(ControlRequest::ReadFrequency)?))
    }

    fn set_frequency_by_value(&self, raw_mhz: f64) -> Result<(), DeviceError> {
        let word = to_fixed_11_21(raw_mhz).ok_or(DeviceError::InvalidFrequency(raw_mhz))?;
        self.write(
            ControlRequest::SetFrequencyByValue,
            self.si570_value(),
            0,
            &word.to_le_bytes(),
        )
    }

    fn ptt(&self) -> Result<bool, DeviceError> {
        let [ptt] = self.read_exact::<1>(ControlRequest::ReadPtt, 0, 0)?;
        Ok(ptt != 0)
    }

    fn set_ptt(&self, on: bool) -> Result<(), DeviceError> {
        self.read(ControlRequest::SetPtt, on as u16, 0, 3)?;
        Ok(())
    }

    fn keys(&self) -> Result<u8, DeviceError> {
        let [keys] = self.read_exact::<1>(ControlRequest::ReadKeys, 0, 0)?;
        Ok(keys & 0x03)
    }

    fn set_bpf(&self, enabled: bool) -> Result<(), DeviceError> {
        self.read(
            ControlRequest::Filters,
            enabled as u16,
            FILTER_TABLE_INDEX,
            (2 * FILTER_CROSSOVERS) as u16,
        )?;
        Ok(())
    }

    fn multiply_lo(&self, band: u8) -> Result<LoSettings, DeviceError> {
        let data = self.read_exact::<8>(ControlRequest::ReadMultiplyLo, 0, band as u16)?;
        let subtract = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let multiply = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        Ok(LoSettings {
            multiply: from_fixed_11_21(multiply),
            subtract: from_fixed_i11_21(subtract),
        })
    }

    fn version(&self) -> Result<FirmwareVersion, DeviceError> {
        let data = self.read_exact::<2>(ControlRequest::ReadVersion, VERSION_VALUE, 0)?;
        Ok(FirmwareVersion::from(u16::from_le_bytes(data)))
    }

    fn serial_number(&self) -> Option<String> {
        self.serial.clone()
    }

    fn registers(&self) -> Result<Registers, DeviceError> {
        let data = self.read_exact::<6>(
            ControlRequest::ReadRegisters,
            self.settings.i2c_address as u16,
            0,
        )?;
        Ok(Registers(data))
    }

    fn set_multiply_lo(&self, band: u8, lo: LoSettings) -> Result<(), DeviceError> {
        let multiply =
            to_fixed_11_21(lo.multiply).ok_or(DeviceError::InvalidFrequency(lo.multiply))?;
        let mut data = [0u8; 8];
        data[..4].copy_from_slice(&to_fixed_i11_21(lo.subtract).to_le_bytes());
        data[4..].copy_from_slice(&multiply.to_le_bytes());
        self.write(ControlRequest::SetMultiplyLo, 0, band as u16, &data)
    }

    fn set_bpf_address(&self, band: u8, filter: u8) -> Result<(), DeviceError> {
        self.read(ControlRequest::SetBpfAddress, filter as u16, band as u16, 1)?;
        Ok(())
    }

    fn set_bpf_crossover(&self, index: u8, mhz: f64) -> Result<(), DeviceError> {
        self.read(
            ControlRequest::Filters,
            to_fixed_11_5(mhz).ok_or(DeviceError::InvalidFrequency(mhz))?,
            index as u16,
            (2 * FILTER_CROSSOVERS) as u16,
        )?;
        Ok(())
    }

    fn bpf_crossovers(&self) -> Result<Vec<f64>, DeviceError> {
        self.filter_table(FILTER_TABLE_INDEX)
    }

    fn set_lpf(&self, enabled: bool) -> Result<(), DeviceError> {
        self.read(
            ControlRequest::Filters,
            enabled as u16,
            LPF_INDEX_OFFSET + FILTER_TABLE_INDEX,
            (2 * FILTER_CROSSOVERS) as u16,
        )?;
        Ok(())
    }

    fn set_lpf_address(&self, band: u8, filter: u8) -> Result<(), DeviceError> {
        self.read(ControlRequest::SetLpfAddress, filter as u16, band as u16, 1)?;
        Ok(())
    }

    fn set_lpf_crossover(&self, index: u8, mhz: f64) -> Result<(), DeviceError> {
        self.read(
            ControlRequest::Filters,
            to_fixed_11_5(mhz).ok_or(DeviceError::InvalidFrequency(mhz))?,
            LPF_INDEX_OFFSET + index as u16,
            (2 * FILTER_CROSSOVERS) as u16,
        )?;
        Ok(())
    }

    fn lpf_crossovers(&self) -> Result<Vec<f64>, DeviceError> {
        self.filter_table(LPF_INDEX_OFFSET + FILTER_TABLE_INDEX)
    }

    fn set_si570_address(&self, address: u8) -> Result<(), DeviceError> {
        self.read(ControlRequest::Si570Address, address as u16, 1, 1)?;
        Ok(())
    }

    fn si570_address(&self) -> Result<u8, DeviceError> {
        let [address] = self.read_exact::<1>(ControlRequest::Si570Address, 0, 0)?;
        Ok(address)
    }

    fn set_xtal_frequency(&self, mhz: f64) -> Result<(), DeviceError> {
        let word = to_fixed_8_24(mhz).ok_or(DeviceError::InvalidFrequency(mhz))?;
        self.write(
            ControlRequest::SetXtalFrequency,
            self.si570_value(),
            0,
            &word.to_le_bytes(),
        )
    }

    fn xtal_frequency(&self) -> Result<f64, DeviceError> {
        Ok(from_fixed_8_24(self.read_u32(ControlRequest::ReadXtalFrequency)?))
    }

    fn set_startup_frequency(&self, mhz: f64) -> Result<(), DeviceError> {
        let word = to_fixed_11_21(mhz).ok_or(DeviceError::InvalidFrequency(mhz))?;
        self.write(
            ControlRequest::SetStartupFrequency,
            self.si570_value(),
            0,
            &word.to_le_bytes(),
        )
    }

    fn startup_frequency(&self) -> Result<f64, DeviceError> {
        Ok(from_fixed_11_21(
            self.read_u32(ControlRequest::ReadStartupFrequency)?,
        ))
    }

    fn smooth_tune_ppm(&self) -> Result<u16, DeviceError> {
        Ok(u16::from_le_bytes(
            self.read_exact::<2>(ControlRequest::ReadSmoothTune, 0, 0)?,
        ))
    }
}
