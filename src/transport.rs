//! Interface between the protocol logic and whatever moves bytes over USB.

use crate::error::Result;
use crate::{PRODUCT_ID, VENDOR_ID};
use std::time::Duration;

/// Identifies a USB device before it is opened.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeviceDescriptor {
    /// USB vendor ID.
    pub vendor_id: u16,

    /// USB product ID.
    pub product_id: u16,

    /// Serial number string, if it has been read from the device.
    pub serial: Option<String>,

    /// USB bus ID the device is connected to.
    pub bus_number: u8,

    /// USB device address on its bus.
    pub address: u8,
}

impl DeviceDescriptor {
    /// Whether the vendor and product ID identify a fastboot device.
    pub fn is_fastboot(&self) -> bool {
        self.vendor_id == VENDOR_ID && self.product_id == PRODUCT_ID
    }
}

/// Enumerates and opens devices.
pub trait Transport {
    /// Handle type for an opened device.
    type Handle: BulkDevice;

    /// Lists all devices currently attached, fastboot or not.
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Opens the device the descriptor refers to.
    fn open(&self, device: &DeviceDescriptor) -> Result<Self::Handle>;
}

/// An opened device with a bulk endpoint pair.
pub trait BulkDevice {
    /// Writes to the bulk OUT endpoint and returns the number of bytes actually written.
    fn write_bulk(&mut self, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Reads from the bulk IN endpoint and returns the number of bytes received.
    fn read_bulk(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Reads the serial number string from the device descriptor.
    fn serial_number(&mut self) -> Result<String>;

    /// Releases the device.
    fn close(self) -> Result<()>;
}

/// Devices which support selecting a configuration and claiming an interface. A session can only
/// be connected through handles with this capability.
pub trait ClaimableDevice: BulkDevice {
    /// Selects the active USB configuration.
    fn set_configuration(&mut self, configuration: u8) -> Result<()>;

    /// Claims an interface for exclusive use.
    fn claim_interface(&mut self, interface: u8) -> Result<()>;
}
