use crate::config::{Config, DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_ATTEMPTS};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::transport::{BulkDevice, ClaimableDevice, DeviceDescriptor, Transport};
use crate::usb::UsbTransport;
use log::{debug, trace, warn};
use std::thread;
use std::time::Duration;

/// Entry point for finding fastboot devices and opening sessions to them.
pub struct Context<T: Transport> {
    transport: T,
}

impl Context<UsbTransport<rusb::Context>> {
    /// Creates a context on a fresh libusb context.
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(UsbTransport::new()?))
    }
}

impl<T: Transport> Context<T> {
    pub fn with_transport(transport: T) -> Self {
        Context { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Blocks until a fastboot device is attached, polling every 500 ms for up to 50 times.
    pub fn wait(&self) -> Result<DeviceDescriptor> {
        self.wait_for(DEFAULT_WAIT_ATTEMPTS, DEFAULT_POLL_INTERVAL)
    }

    /// Like [`wait`], with the polling budget taken from a [`Config`].
    ///
    /// [`wait`]: #method.wait
    /// [`Config`]: struct.Config.html
    pub fn wait_with(&self, config: &Config) -> Result<DeviceDescriptor> {
        self.wait_for(config.wait_attempts, config.poll_interval)
    }

    /// Polls the device list up to `attempts` times, sleeping `interval` between two polls, and
    /// returns the first fastboot device seen.
    pub fn wait_for(&self, attempts: u32, interval: Duration) -> Result<DeviceDescriptor> {
        for attempt in 1..=attempts {
            if attempt > 1 {
                thread::sleep(interval);
            }

            if let Some(device) = self
                .transport
                .list_devices()?
                .into_iter()
                .find(DeviceDescriptor::is_fastboot)
            {
                debug!(
                    "Found fastboot device at {:03}:{:03} after {} attempt(s)",
                    device.bus_number, device.address, attempt
                );
                return Ok(device);
            }
            trace!("No fastboot device yet ({}/{})", attempt, attempts);
        }

        Err(Error::DeviceTimeout { attempts })
    }

    /// Lists all attached fastboot devices. If a serial number is given, only the device reporting
    /// exactly that serial is returned; this requires briefly opening every candidate.
    pub fn find_devices(&self, serial: Option<&str>) -> Result<Vec<DeviceDescriptor>> {
        let candidates = self
            .transport
            .list_devices()?
            .into_iter()
            .filter(DeviceDescriptor::is_fastboot);

        let serial = match serial {
            Some(serial) => serial,
            None => return Ok(candidates.collect()),
        };

        Ok(self
            .with_serials(candidates)
            .into_iter()
            .filter(|(_, found)| found == serial)
            .map(|(mut device, found)| {
                device.serial = Some(found);
                device
            })
            .collect())
    }

    /// Returns the serial numbers of all attached fastboot devices.
    pub fn list_devices(&self) -> Result<Vec<String>> {
        let candidates = self
            .transport
            .list_devices()?
            .into_iter()
            .filter(DeviceDescriptor::is_fastboot);

        Ok(self
            .with_serials(candidates)
            .into_iter()
            .map(|(_, serial)| serial)
            .collect())
    }

    /// Pairs each device with its serial number. Devices whose serial cannot be read are skipped.
    fn with_serials<I>(&self, devices: I) -> Vec<(DeviceDescriptor, String)>
    where
        I: IntoIterator<Item = DeviceDescriptor>,
    {
        let mut found = Vec::new();
        for device in devices {
            match self.read_serial(&device) {
                Ok(serial) => found.push((device, serial)),
                Err(error) => warn!(
                    "Cannot read serial of {:03}:{:03}: {}",
                    device.bus_number, device.address, error
                ),
            }
        }
        found
    }

    /// Opens a device just long enough to read its serial number.
    fn read_serial(&self, device: &DeviceDescriptor) -> Result<String> {
        let mut handle = self.transport.open(device)?;
        let serial = handle.serial_number();
        handle.close()?;
        serial
    }

    /// Creates an unconnected session with default settings.
    pub fn session(&self) -> Session<'_, T> {
        self.session_with(&Config::default())
    }

    /// Creates an unconnected session.
    pub fn session_with(&self, config: &Config) -> Session<'_, T> {
        Session::new(self, config.serial.clone(), config.timeout)
    }
}

impl<T> Context<T>
where
    T: Transport,
    T::Handle: ClaimableDevice,
{
    /// Connects a session, hands it to `f` and disconnects again, whether `f` succeeded or not.
    /// An error from `f` takes precedence over one from disconnecting.
    pub fn with_session<R, F>(&self, config: &Config, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session<'_, T>) -> Result<R>,
    {
        let mut session = self.session_with(config);
        session.connect()?;
        let result = f(&mut session);
        let disconnected = session.disconnect();
        let value = result?;
        disconnected?;
        Ok(value)
    }
}
