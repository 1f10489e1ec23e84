use crate::DEFAULT_TIMEOUT;
use std::time::Duration;

/// Number of device list polls [`Context::wait`] performs by default.
///
/// [`Context::wait`]: struct.Context.html#method.wait
pub const DEFAULT_WAIT_ATTEMPTS: u32 = 50;

/// Delay between two device list polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Settings for discovering and talking to a device.
#[derive(Clone, Debug)]
pub struct Config {
    /// Timeout for each USB transfer.
    pub timeout: Duration,

    /// Only connect to the device with this serial number.
    pub serial: Option<String>,

    /// Number of polls before waiting for a device gives up.
    pub wait_attempts: u32,

    /// Delay between polls while waiting for a device.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            serial: None,
            wait_attempts: DEFAULT_WAIT_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    #[must_use]
    pub fn with_wait_attempts(mut self, attempts: u32) -> Self {
        self.wait_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
