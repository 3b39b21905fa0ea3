//! Opening the device with a bounded number of attempts.
//!
//! The device is opened once per process. After a failed attempt `n` the acquirer
//! sleeps `2 * n` seconds before the next one; after [MAX_ATTEMPTS] failures it gives up.
//! There is no reconnect once a handle has been obtained.
use std::{error::Error, fmt::Display, thread, time::Duration};

/// Number of attempts to open the device before giving up.
pub const MAX_ATTEMPTS: u32 = 3;

/// Shared VID of obdev (VOTI), used by all firmware variants.
pub const SHARED_VENDOR_ID: u16 = 0x16C0;
/// Shared PID of obdev.
pub const SHARED_PRODUCT_ID: u16 = 0x05DC;
pub const DEFAULT_VENDOR_NAME: &str = "www.obdev.at";
pub const DEFAULT_PRODUCT_NAME: &str = "DG8SAQ-I2C";

/// Describes which USB device to open.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceSelector {
    pub vendor_id: u16,
    pub vendor_name: String,
    pub product_id: u16,
    pub product_name: String,
    /// Only open the device with this serial number
    pub serial: Option<String>,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        Self {
            vendor_id: SHARED_VENDOR_ID,
            vendor_name: DEFAULT_VENDOR_NAME.to_string(),
            product_id: SHARED_PRODUCT_ID,
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            serial: None,
        }
    }
}

impl Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" with vid=0x{:x} pid=0x{:x}",
            self.product_name, self.vendor_id, self.product_id
        )?;
        if let Some(serial) = &self.serial {
            write!(f, " serial={}", serial)?;
        }
        Ok(())
    }
}

/// All attempts to open the device failed.
#[derive(Debug)]
pub struct AcquireError<E> {
    pub attempts: u32,
    /// The error of the last attempt
    pub last: E,
}

impl<E: Display> Display for AcquireError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Permanent problem opening usb device after {} attempts: {}",
            self.attempts, self.last
        )
    }
}

impl<E: Error> Error for AcquireError<E> {}

/// Delay after the failed attempt with the given (1 based) number.
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(2 * attempt as u64)
}

/// Try to open the device with `open`, sleeping with `sleep` between attempts.
///
/// No sleep follows the last attempt.
pub fn acquire<T, E: Display>(
    selector: &DeviceSelector,
    mut open: impl FnMut(&DeviceSelector) -> Result<T, E>,
    mut sleep: impl FnMut(Duration),
) -> Result<T, AcquireError<E>> {
    let mut attempt = 1;
    loop {
        log::debug!("Opening {} (attempt {})", selector, attempt);
        match open(selector) {
            Ok(handle) => {
                log::info!("Opened USB device {}", selector);
                return Ok(handle);
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                log::warn!(
                    "Could not open USB device {}, retrying: {}",
                    selector,
                    e
                );
                sleep(backoff(attempt));
                attempt += 1;
            }
            Err(e) => {
                log::error!("Could not open USB device {}: {}", selector, e);
                return Err(AcquireError {
                    attempts: attempt,
                    last: e,
                });
            }
        }
    }
}

/// [acquire] with real sleeps.
pub fn acquire_blocking<T, E: Display>(
    selector: &DeviceSelector,
    open: impl FnMut(&DeviceSelector) -> Result<T, E>,
) -> Result<T, AcquireError<E>> {
    acquire(selector, open, thread::sleep)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn linear_backoff() {
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn first_attempt_succeeds() {
        let mut sleeps = Vec::new();
        let handle = acquire(
            &DeviceSelector::default(),
            |_| Ok::<_, String>(42),
            |d| sleeps.push(d),
        )
        .unwrap();
        assert_eq!(handle, 42);
        assert!(sleeps.is_empty());
    }

    #[test]
    fn succeeds_on_last_attempt() {
        let mut sleeps = Vec::new();
        let mut attempts = 0;
        let handle = acquire(
            &DeviceSelector::default(),
            |_| {
                attempts += 1;
                if attempts < 3 { Err("busy") } else { Ok("handle") }
            },
            |d| sleeps.push(d),
        )
        .unwrap();
        assert_eq!(handle, "handle");
        assert_eq!(sleeps, [Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[test]
    fn gives_up_without_third_sleep() {
        let mut sleeps = Vec::new();
        let mut attempts = 0;
        let err = acquire(
            &DeviceSelector::default(),
            |_| {
                attempts += 1;
                Err::<(), _>(format!("failure {}", attempts))
            },
            |d| sleeps.push(d),
        )
        .unwrap_err();
        assert_eq!(attempts, 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last, "failure 3");
        assert_eq!(sleeps, [Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[test]
    fn selector_display() {
        let mut selector = DeviceSelector::default();
        assert_eq!(
            selector.to_string(),
            "\"DG8SAQ-I2C\" with vid=0x16c0 pid=0x5dc"
        );
        selector.serial = Some("PE0FKO-0".to_string());
        assert!(selector.to_string().ends_with("serial=PE0FKO-0"));
    }
}
