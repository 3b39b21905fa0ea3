//! # usbsoftrock
//!
//! Command line tool and UDP daemon for SoftRock style Si570 synthesizers.
//!
//! ## Overview
//!
//! Without `-d` a single command is executed against the device and the process exits.
//! With `-d` the device is kept open and commands are read from UDP datagrams, see
//! [`softrock_server::server`]. Frequencies on the command line are in user units,
//! i.e. the Si570 frequency divided by the multiplier given with `-m`.
pub mod backends;
mod interactive;
mod report;
#[cfg(test)]
mod testing;

use std::{error::Error, process};

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_num::maybe_hex;
use env_logger::Env;
use softrock_protocol::{
    error::ParseError,
    si570::{DEFAULT_I2C_ADDRESS, DEFAULT_STARTUP_MHZ, NOMINAL_XTAL_MHZ},
    units::{DEFAULT_MULTIPLIER, Multiplier},
};
use softrock_server::{
    LoSettings, Si570Device,
    acquire::{DeviceSelector, acquire_blocking},
    dispatch::{Dispatcher, SessionConfig},
    server::{Builder, DEFAULT_PORT},
    tuning::run_tuning,
};

use crate::{
    backends::{
        requests::{FIFI_PRODUCT_NAME, FIFI_VENDOR_NAME},
        usb::{Si570Settings, UsbBackend},
    },
    interactive::TerminalFrontend,
};

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum Switch {
    On,
    Off,
}

impl Switch {
    fn is_on(self) -> bool {
        self == Switch::On
    }
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
#[command(rename_all = "snake_case")]
enum Setting {
    /// Enable or disable automatic band pass filter selection (PE0FKO+TF3LJ+Mobo)
    Bpf { state: Switch },
    /// Map a band to a band pass filter (PE0FKO >= 15.12+Mobo)
    BpfAddr { band: u8, filter: u8 },
    /// Set a band pass filter crossover point in MHz (PE0FKO+TF3LJ+Mobo)
    BpfPoint { crossover: u8, mhz: f64 },
    /// Enable or disable automatic low pass filter selection (TF3LJ+Mobo only)
    Lpf { state: Switch },
    /// Map a band to a low pass filter (TF3LJ+Mobo only)
    LpfAddr { band: u8, filter: u8 },
    /// Set a low pass filter crossover point in MHz (TF3LJ+Mobo only)
    LpfPoint { crossover: u8, mhz: f64 },
    /// Set the frequency in MHz
    Freq { mhz: f64 },
    /// Change the I2C address of the Si570
    Si570Addr {
        #[arg(value_parser = maybe_hex::<u8>)]
        address: u8,
    },
    /// Set the LO multiply factor: [band] <factor> (PE0FKO >= 15.12+Mobo)
    Si570Multiplier {
        #[arg(num_args = 1..=2, required = true, allow_negative_numbers = true)]
        values: Vec<String>,
    },
    /// Store the power up frequency of the Si570 in MHz
    Startup { mhz: f64 },
    /// Store the calibrated crystal frequency in MHz
    Xtall { mhz: f64 },
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
#[command(rename_all = "lower")]
enum Cmd {
    /// Derive the crystal frequency (may require -s)
    Calibrate,
    GetFreq,
    GetRegisters,
    /// Tune with the keyboard
    Interactive,
    /// Read the PTT state (-h for Mobo only)
    GetPtt,
    /// Read the CW paddles (PE0FKO+TF3LJ+Mobo)
    GetKeys,
    GetTone,
    Ptt { state: Switch },
    Set {
        #[command(subcommand)]
        setting: Setting,
    },
    Status,
}

#[derive(Parser, Debug)]
#[command(
    name = "usbsoftrock",
    version,
    about = "Control SoftRock Si570 USB synthesizers",
    long_about = None,
    disable_help_flag = true
)]
struct Args {
    #[arg(long, action = ArgAction::Help, help = "Print help")]
    help: Option<bool>,

    /// Advanced firmware present, i.e. let the firmware calculate registers
    #[arg(short = 'a')]
    set_by_value: bool,

    /// Listen for commands via UDP
    #[arg(short = 'd')]
    daemon: bool,

    /// PTT status by reading hardware port (Mobo only)
    #[arg(short = 'h')]
    firmware_ptt: bool,

    /// I2C address of the Si570, decimal or 0x prefixed hex
    #[arg(short = 'i', value_parser = maybe_hex::<u8>, default_value_t = DEFAULT_I2C_ADDRESS)]
    i2c_address: u8,

    /// Multiplication factor for frequency
    #[arg(short = 'm', default_value_t = DEFAULT_MULTIPLIER)]
    multiplier: f64,

    /// Port to listen for UDP datagrams
    #[arg(short = 'p', default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Factory programmed startup frequency in MHz
    #[arg(short = 's', default_value_t = DEFAULT_STARTUP_MHZ)]
    startup: f64,

    /// Serial number of the device
    #[arg(short = 'u')]
    serial: Option<String>,

    /// Verbose output, repeat for debugging output
    #[arg(short = 'v', action = ArgAction::Count)]
    verbose: u8,

    /// Calibrated crystal frequency in MHz, see the calibrate command
    #[arg(short = 'x', default_value_t = NOMINAL_XTAL_MHZ)]
    xtal: f64,

    /// USB manufacturer string to match
    #[arg(long, default_value = FIFI_VENDOR_NAME)]
    vendor_name: String,

    /// USB product string to match
    #[arg(long, default_value = FIFI_PRODUCT_NAME)]
    product_name: String,

    #[command(subcommand)]
    command: Option<Cmd>,
}

impl Args {
    fn selector(&self) -> DeviceSelector {
        DeviceSelector {
            vendor_name: self.vendor_name.clone(),
            product_name: self.product_name.clone(),
            serial: self.serial.clone(),
            ..Default::default()
        }
    }

    fn session(&self, multiplier: Multiplier) -> SessionConfig {
        SessionConfig {
            i2c_address: self.i2c_address,
            xtal_mhz: self.xtal,
            startup_mhz: self.startup,
            multiplier,
            set_by_value: self.set_by_value,
            firmware_ptt: self.firmware_ptt,
        }
    }

    fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// `[band] <factor>` of `set si570_multiplier`. The band defaults to 0.
fn band_and_factor(values: &[String]) -> Result<(u8, f64), ParseError> {
    let factor = |value: &String| {
        value
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber(value.clone()))
    };
    match values {
        [value] => Ok((0, factor(value)?)),
        [band, value] => {
            let band = band
                .parse()
                .map_err(|_| ParseError::InvalidNumber(band.clone()))?;
            Ok((band, factor(value)?))
        }
        _ => Err(ParseError::MissingArgument("factor")),
    }
}

fn apply_setting<D: Si570Device>(
    dispatcher: &Dispatcher<D>,
    setting: Setting,
) -> Result<(), Box<dyn Error>> {
    let device = dispatcher.device();
    let multiplier = dispatcher.state().multiplier;
    match setting {
        Setting::Bpf { state } => device.set_bpf(state.is_on())?,
        Setting::BpfAddr { band, filter } => device.set_bpf_address(band, filter)?,
        Setting::BpfPoint { crossover, mhz } => {
            device.set_bpf_crossover(crossover, multiplier.to_device(mhz))?
        }
        Setting::Lpf { state } => device.set_lpf(state.is_on())?,
        Setting::LpfAddr { band, filter } => {
            device.set_lpf_address(band, filter)?;
            report::print_lpfs(dispatcher)?;
        }
        Setting::LpfPoint { crossover, mhz } => {
            device.set_lpf_crossover(crossover, multiplier.to_device(mhz))?
        }
        Setting::Freq { mhz } => dispatcher.write_frequency(mhz)?,
        Setting::Si570Addr { address } => device.set_si570_address(address)?,
        Setting::Si570Multiplier { values } => {
            let (band, factor) = band_and_factor(&values)?;
            let lo = device.multiply_lo(band)?;
            device.set_multiply_lo(
                band,
                LoSettings {
                    multiply: factor,
                    ..lo
                },
            )?;
            log::info!("Set multiply [{}] to : {:.6}", band, factor);
        }
        Setting::Startup { mhz } => device.set_startup_frequency(mhz)?,
        Setting::Xtall { mhz } => device.set_xtal_frequency(mhz)?,
    }
    Ok(())
}

fn run_command<D: Si570Device>(
    dispatcher: &mut Dispatcher<D>,
    command: Cmd,
) -> Result<(), Box<dyn Error>> {
    match command {
        Cmd::Calibrate => {
            let calibration = dispatcher.calibrate()?;
            println!("Registers   : {}", calibration.registers);
            println!("Startup     : {:.6}", dispatcher.config().startup_mhz);
            println!("fXtall      : {:.6}", calibration.xtal_mhz);
            println!(
                "Use -x {:.6} or set xtall {:.6} to apply the calibration",
                calibration.xtal_mhz, calibration.xtal_mhz
            );
        }
        Cmd::GetFreq => {
            let freq = dispatcher.read_frequency()?;
            println!(
                "Frequency   : {:.6} (x {:.2})",
                freq,
                dispatcher.state().multiplier.factor()
            );
        }
        Cmd::GetRegisters => report::print_registers(dispatcher)?,
        Cmd::Interactive => {
            let mut frontend = TerminalFrontend::new()?;
            run_tuning(dispatcher, &mut frontend)?;
        }
        Cmd::GetPtt => println!("PTT   : {}", dispatcher.ptt()? as u8),
        Cmd::GetKeys => println!("Paddles: {}", dispatcher.keys()?),
        Cmd::GetTone => println!("CW Tone: {}", dispatcher.state().cw_tone),
        Cmd::Ptt { state } => {
            dispatcher.set_ptt(state.is_on())?;
            println!("PTT set to {}", state.is_on() as u8);
        }
        Cmd::Set { setting } => apply_setting(dispatcher, setting)?,
        Cmd::Status => report::print_status(dispatcher)?,
    }
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let multiplier = Multiplier::new(args.multiplier)
        .ok_or_else(|| format!("Multiplier must be positive, got {}", args.multiplier))?;
    log::info!("I2C Address = {:X}", args.i2c_address);
    log::info!("fXtall = {:.6}", args.xtal);
    log::info!("multiplier = {}", multiplier);
    log::info!("startupFreq = {:.6}", args.startup);

    let session = args.session(multiplier);
    let settings = Si570Settings::from(&session);
    let backend = match acquire_blocking(&args.selector(), |selector| {
        UsbBackend::open(selector, settings)
    }) {
        Ok(backend) => backend,
        Err(e) => {
            log::debug!("{}", e);
            eprintln!("Permanent problem opening usb device. Giving up.");
            process::exit(1);
        }
    };
    match backend.version() {
        Ok(version) => log::info!("Firmware version {}", version),
        Err(e) => log::warn!("Could not read firmware version: {}", e),
    }

    let mut dispatcher = Dispatcher::new(backend, session);

    if args.daemon {
        println!("Starting daemon...");
        let mut server = Builder::new().port(args.port).build(dispatcher);
        server.listen_on_port()?;
        return Ok(());
    }

    match args.command {
        Some(command) => run_command(&mut dispatcher, command),
        None => Err("A command is required without -d".into()),
    }
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_filter())).init();

    if args.command.is_none() && !args.daemon {
        let _ = Args::command().print_help();
        process::exit(1);
    }

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        process::exit(1);
    }
}
