use std::time::Duration;

use softrock_server::{
    acquire::{DeviceSelector, MAX_ATTEMPTS, acquire},
    dispatch::{Dispatcher, SessionConfig},
};
use softrock_tests::{MockDevice, flaky_opener};

#[test]
fn retries_until_the_device_appears() {
    let mut sleeps = Vec::new();
    let device = acquire(
        &DeviceSelector::default(),
        flaky_opener(2, MockDevice::with_frequency(56.296)),
        |d| sleeps.push(d),
    )
    .unwrap();
    assert_eq!(sleeps, [Duration::from_secs(2), Duration::from_secs(4)]);

    let mut dispatcher = Dispatcher::new(device, SessionConfig::default());
    assert_eq!(dispatcher.dispatch(&["get", "freq"]).to_string(), "ok 14.074000");
}

#[test]
fn gives_up_after_three_attempts() {
    let mut sleeps = Vec::new();
    let err = acquire(
        &DeviceSelector::default(),
        flaky_opener(MAX_ATTEMPTS, MockDevice::default()),
        |d| sleeps.push(d),
    )
    .unwrap_err();
    assert_eq!(err.attempts, 3);
    assert_eq!(err.last.kind(), std::io::ErrorKind::NotFound);
    assert_eq!(sleeps, [Duration::from_secs(2), Duration::from_secs(4)]);
    assert!(err.to_string().starts_with("Permanent problem opening usb device"));
}

#[test]
fn calibration_from_startup_registers() {
    let device = MockDevice::with_frequency(56.32);
    let dispatcher = Dispatcher::new(device, SessionConfig::default());
    let calibration = dispatcher.calibrate().unwrap();
    // The registers were computed with the nominal crystal, so it is recovered
    assert!((calibration.xtal_mhz - 114.285).abs() < 1e-4);
}
