use crate::context::Context;
use crate::error::{Error, Result};
use crate::operation::{Operation, Upload};
use crate::protocol::{getvar_command, Response, ResponseBuilder, Status};
use crate::transport::{BulkDevice, ClaimableDevice, Transport};
use crate::{CONFIGURATION, INTERFACE, RESPONSE_BUFFER_SIZE};
use log::{debug, trace, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// A command channel to one fastboot device.
///
/// A session starts out unconnected. [`connect`] opens and claims the device, [`disconnect`]
/// releases it and consumes the session. A connected session that is dropped closes its device
/// as well, but only `disconnect` reports a failure to do so. [`Context::with_session`] takes
/// care of connecting and disconnecting around a closure.
///
/// [`connect`]: #method.connect
/// [`disconnect`]: #method.disconnect
/// [`Context::with_session`]: struct.Context.html#method.with_session
pub struct Session<'c, T: Transport> {
    context: &'c Context<T>,

    /// Open device, if connected.
    handle: Option<T::Handle>,

    /// Serial number the session is restricted to.
    serial: Option<String>,

    /// Timeout for every single USB transfer.
    timeout: Duration,
}

impl<'c, T: Transport> Session<'c, T> {
    pub(crate) fn new(context: &'c Context<T>, serial: Option<String>, timeout: Duration) -> Self {
        Session {
            context,
            handle: None,
            serial,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Serial number filter given at construction.
    pub fn serial_filter(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Releases the device. Fails if the session was never connected.
    pub fn disconnect(mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::NotConnected)?;
        debug!("Disconnecting");
        handle.close()
    }

    /// Reads the serial number of the connected device.
    pub fn serial_number(&mut self) -> Result<String> {
        self.handle_mut()?.serial_number()
    }

    /// Sends a command and collects the response. `INFO` frames are gathered until the device
    /// sends any other status.
    ///
    /// A `FAIL` answer is not an error here; see [`Response::into_result`].
    ///
    /// [`Response::into_result`]: struct.Response.html#method.into_result
    pub fn command(&mut self, command: &[u8]) -> Result<Response> {
        trace!("> {}", String::from_utf8_lossy(command));
        self.write_exact(command)?;

        let mut builder = ResponseBuilder::new();
        loop {
            let mut buffer = [0u8; RESPONSE_BUFFER_SIZE];
            let read = self.read_frame(&mut buffer)?;
            let status = builder.push(&buffer[..read]);
            trace!("< {} ({} bytes)", status, read);
            if status != Status::Info {
                break;
            }
        }

        Ok(builder.finish())
    }

    pub fn command_str(&mut self, command: &str) -> Result<Response> {
        self.command(command.as_bytes())
    }

    /// Queries a bootloader variable. The value comes back without the line terminator.
    pub fn getvar(&mut self, name: &str) -> Result<String> {
        let response = self.command_str(&getvar_command(name))?;
        let value = response
            .payload
            .strip_suffix('\n')
            .unwrap_or(response.payload.as_str())
            .to_string();
        match response.status {
            Status::Okay => Ok(value),
            Status::Fail => Err(Error::CommandFailed(value)),
            status => Err(Error::UnexpectedStatus(status)),
        }
    }

    /// Announces an upload of `length` bytes read from `reader`. The returned [`Upload`] sends the
    /// data block by block as it is iterated.
    ///
    /// [`Upload`]: struct.Upload.html
    pub fn upload<R: Read>(&mut self, reader: R, length: u64) -> Result<Upload<'_, 'c, T, R>> {
        Upload::start(self, reader, length)
    }

    /// Uploads a buffer in one go.
    pub fn upload_data(&mut self, data: &[u8]) -> Result<()> {
        self.upload(data, data.len() as u64)?.execute()
    }

    /// Uploads the contents of a file in one go.
    pub fn upload_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path.as_ref())?;
        let length = file.metadata()?.len();
        debug!("Uploading {} ({} bytes)", path.as_ref().display(), length);
        self.upload(file, length)?.execute()
    }

    /// Writes to the bulk OUT endpoint, failing unless every byte was transferred.
    pub(crate) fn write_exact(&mut self, data: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        let written = self.handle_mut()?.write_bulk(data, timeout)?;
        if written != data.len() {
            return Err(Error::ShortWrite {
                written,
                requested: data.len(),
            });
        }
        Ok(())
    }

    /// Reads a single frame from the bulk IN endpoint.
    pub(crate) fn read_frame(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let timeout = self.timeout;
        self.handle_mut()?.read_bulk(buffer, timeout)
    }

    fn handle_mut(&mut self) -> Result<&mut T::Handle> {
        self.handle.as_mut().ok_or(Error::NotConnected)
    }
}

impl<T: Transport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Closing device of dropped session");
            if let Err(error) = handle.close() {
                warn!("Closing device of dropped session: {}", error);
            }
        }
    }
}

impl<'c, T> Session<'c, T>
where
    T: Transport,
    T::Handle: ClaimableDevice,
{
    /// Opens the first matching device, selects its configuration and claims the fastboot
    /// interface.
    pub fn connect(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let device = self
            .context
            .find_devices(self.serial.as_deref())?
            .into_iter()
            .next()
            .ok_or(Error::NoDeviceFound)?;
        debug!(
            "Connecting to {:03}:{:03}",
            device.bus_number, device.address
        );

        let mut handle = self.context.transport().open(&device)?;
        let claimed = handle
            .set_configuration(CONFIGURATION)
            .and_then(|_| handle.claim_interface(INTERFACE));
        if let Err(error) = claimed {
            if let Err(close_error) = handle.close() {
                warn!("Closing device after failed claim: {}", close_error);
            }
            return Err(error);
        }

        self.handle = Some(handle);
        Ok(())
    }
}
