//! Human readable dumps of the device state for `status` and `getregisters`.
use softrock_protocol::units::Multiplier;
use softrock_server::{DeviceError, FirmwareVersion, Si570Device, dispatch::Dispatcher};

/// Number of bands with their own LO settings and filter address.
pub const BANDS: u8 = 4;

/// Status details beyond the serial number need firmware 15.x or newer.
const EXTENDED_STATUS_MAJOR: u8 = 15;

fn has_si570_address(version: FirmwareVersion) -> bool {
    version.major >= 16 || version.minor >= 12
}

pub fn print_registers<D: Si570Device>(dispatcher: &Dispatcher<D>) -> Result<(), DeviceError> {
    let registers = dispatcher.device().registers()?;
    let multiplier = dispatcher.state().multiplier;
    let xtal_mhz = dispatcher.config().xtal_mhz;
    println!("Registers   : {}", registers);
    println!("HS_DIV      : {}", registers.hs_div());
    println!("N1          : {}", registers.n1());
    println!("RFREQ       : {:.6}", registers.rfreq());
    println!("fXtall      : {:.6}", xtal_mhz);
    println!(
        "Frequency   : {:.6} (x {:.2})",
        multiplier.to_user(registers.frequency(xtal_mhz)),
        multiplier.factor()
    );
    Ok(())
}

fn print_crossovers(name: &str, crossovers: &[f64], multiplier: Multiplier) {
    for (index, mhz) in crossovers.iter().enumerate() {
        println!("{} crossover {} : {:.6}", name, index, multiplier.to_user(*mhz));
    }
}

pub fn print_bands<D: Si570Device>(dispatcher: &Dispatcher<D>) -> Result<(), DeviceError> {
    let device = dispatcher.device();
    for band in 0..BANDS {
        let lo = device.multiply_lo(band)?;
        println!(
            "Band {}      : multiply {:.6} subtract {:.6}",
            band, lo.multiply, lo.subtract
        );
    }
    print_crossovers("BPF", &device.bpf_crossovers()?, dispatcher.state().multiplier);
    Ok(())
}

pub fn print_lpfs<D: Si570Device>(dispatcher: &Dispatcher<D>) -> Result<(), DeviceError> {
    let crossovers = dispatcher.device().lpf_crossovers()?;
    print_crossovers("LPF", &crossovers, dispatcher.state().multiplier);
    Ok(())
}

pub fn print_status<D: Si570Device>(dispatcher: &Dispatcher<D>) -> Result<(), DeviceError> {
    let device = dispatcher.device();
    println!(
        "USB SerialID: {}",
        device.serial_number().unwrap_or_default()
    );
    let version = device.version()?;
    println!("Version     : {}", version);
    if version.major < EXTENDED_STATUS_MAJOR {
        log::info!("Firmware {} reports no further status", version);
        return Ok(());
    }

    let multiplier = dispatcher.state().multiplier;
    println!(
        "Frequency   : {:.6} (x {:.2})",
        multiplier.to_user(device.frequency_by_value()?),
        multiplier.factor()
    );
    println!("Startup     : {:.6}", device.startup_frequency()?);
    println!("fXtall      : {:.6}", device.xtal_frequency()?);
    println!("Smooth tune : {} ppm", device.smooth_tune_ppm()?);
    if has_si570_address(version) {
        println!("Si570 I2C   : 0x{:02X}", device.si570_address()?);
    }
    print_bands(dispatcher)?;
    print_lpfs(dispatcher)
}
