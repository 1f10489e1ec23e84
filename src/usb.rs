//! Transport on top of libusb, via rusb.

use crate::error::{Error, Result};
use crate::transport::{BulkDevice, ClaimableDevice, DeviceDescriptor, Transport};
use crate::INTERFACE;
use log::{trace, warn};
use rusb::{Device, DeviceHandle, Direction, TransferType, UsbContext};
use std::time::Duration;

/// Enumerates devices through a libusb context.
pub struct UsbTransport<T: UsbContext> {
    context: T,
}

impl UsbTransport<rusb::Context> {
    /// Creates a transport on a fresh libusb context.
    pub fn new() -> Result<Self> {
        Ok(Self::from_context(rusb::Context::new()?))
    }
}

impl<T: UsbContext> UsbTransport<T> {
    pub fn from_context(context: T) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &T {
        &self.context
    }
}

impl<T: UsbContext> Transport for UsbTransport<T> {
    type Handle = UsbDevice<T>;

    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut devices = Vec::new();

        for device in self.context.devices()?.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    warn!(
                        "Skipping USB device {:03}:{:03}: {}",
                        device.bus_number(),
                        device.address(),
                        error
                    );
                    continue;
                }
            };
            devices.push(DeviceDescriptor {
                vendor_id: descriptor.vendor_id(),
                product_id: descriptor.product_id(),
                serial: None,
                bus_number: device.bus_number(),
                address: device.address(),
            });
        }

        Ok(devices)
    }

    fn open(&self, target: &DeviceDescriptor) -> Result<UsbDevice<T>> {
        for device in self.context.devices()?.iter() {
            if device.bus_number() == target.bus_number && device.address() == target.address {
                let descriptor = device.device_descriptor()?;
                let (endpoint_in, endpoint_out) = bulk_endpoints(&device)?;
                trace!(
                    "Opening {:03}:{:03} (IN 0x{:02x}, OUT 0x{:02x})",
                    target.bus_number,
                    target.address,
                    endpoint_in,
                    endpoint_out
                );
                return Ok(UsbDevice {
                    handle: device.open()?,
                    descriptor,
                    endpoint_in,
                    endpoint_out,
                    claimed: None,
                });
            }
        }
        // The device went away between enumeration and opening
        Err(Error::NoDeviceFound)
    }
}

/// Finds the bulk IN and OUT endpoint addresses of the fastboot interface.
fn bulk_endpoints<T: UsbContext>(device: &Device<T>) -> Result<(u8, u8)> {
    let config = device.config_descriptor(0)?;
    let mut endpoint_in = None;
    let mut endpoint_out = None;

    for interface in config.interfaces().filter(|i| i.number() == INTERFACE) {
        for setting in interface.descriptors() {
            for endpoint in setting.endpoint_descriptors() {
                if endpoint.transfer_type() != TransferType::Bulk {
                    continue;
                }
                match endpoint.direction() {
                    Direction::In => endpoint_in = endpoint_in.or(Some(endpoint.address())),
                    Direction::Out => endpoint_out = endpoint_out.or(Some(endpoint.address())),
                }
            }
        }
    }

    match (endpoint_in, endpoint_out) {
        (Some(endpoint_in), Some(endpoint_out)) => Ok((endpoint_in, endpoint_out)),
        _ => Err(Error::MissingEndpoints),
    }
}

/// An opened USB device.
pub struct UsbDevice<T: UsbContext> {
    handle: DeviceHandle<T>,
    descriptor: rusb::DeviceDescriptor,
    endpoint_in: u8,
    endpoint_out: u8,
    claimed: Option<u8>,
}

impl<T: UsbContext> BulkDevice for UsbDevice<T> {
    fn write_bulk(&mut self, data: &[u8], timeout: Duration) -> Result<usize> {
        Ok(self.handle.write_bulk(self.endpoint_out, data, timeout)?)
    }

    fn read_bulk(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize> {
        Ok(self.handle.read_bulk(self.endpoint_in, buffer, timeout)?)
    }

    fn serial_number(&mut self) -> Result<String> {
        Ok(self
            .handle
            .read_serial_number_string_ascii(&self.descriptor)?)
    }

    fn close(mut self) -> Result<()> {
        if let Some(interface) = self.claimed.take() {
            self.handle.release_interface(interface)?;
        }
        // Dropping the handle closes it
        Ok(())
    }
}

impl<T: UsbContext> ClaimableDevice for UsbDevice<T> {
    fn set_configuration(&mut self, configuration: u8) -> Result<()> {
        Ok(self.handle.set_active_configuration(configuration)?)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<()> {
        self.handle.claim_interface(interface)?;
        self.claimed = Some(interface);
        Ok(())
    }
}
