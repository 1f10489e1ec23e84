//! Scripted transport for unit tests.

use crate::error::{Error, Result};
use crate::transport::{BulkDevice, ClaimableDevice, DeviceDescriptor, Transport};
use crate::{PRODUCT_ID, VENDOR_ID};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
pub(crate) struct MockState {
    /// Attached devices. `serial` is what the device reports once opened.
    pub devices: Vec<DeviceDescriptor>,
    pub list_calls: usize,
    pub opened: usize,
    pub closed: usize,
    pub configuration: Option<u8>,
    pub claimed: Vec<u8>,
    /// Frames handed out by `read_bulk`, in order. Empty means timeout.
    pub reads: VecDeque<Vec<u8>>,
    pub read_calls: usize,
    pub read_sizes: Vec<usize>,
    pub writes: Vec<Vec<u8>>,
    /// Write call index to the byte count reported for it.
    pub short_writes: HashMap<usize, usize>,
    pub timeouts: Vec<Duration>,
    /// Makes every `close` report an I/O error after counting it.
    pub fail_close: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    pub state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport with one fastboot device attached.
    pub fn with_device(serial: &str) -> Self {
        let transport = Self::new();
        transport.attach(VENDOR_ID, PRODUCT_ID, serial);
        transport
    }

    pub fn attach(&self, vendor_id: u16, product_id: u16, serial: &str) {
        self.attach_device(vendor_id, product_id, Some(serial.to_string()));
    }

    /// Attaches a device whose serial number string cannot be read.
    pub fn attach_without_serial(&self, vendor_id: u16, product_id: u16) {
        self.attach_device(vendor_id, product_id, None);
    }

    fn attach_device(&self, vendor_id: u16, product_id: u16, serial: Option<String>) {
        let mut state = self.state.borrow_mut();
        let address = state.devices.len() as u8 + 1;
        state.devices.push(DeviceDescriptor {
            vendor_id,
            product_id,
            serial,
            bus_number: 1,
            address,
        });
    }

    pub fn push_read(&self, frame: &[u8]) {
        self.state.borrow_mut().reads.push_back(frame.to_vec());
    }

    pub fn short_write(&self, call: usize, written: usize) {
        self.state.borrow_mut().short_writes.insert(call, written);
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut state = self.state.borrow_mut();
        state.list_calls += 1;
        // Like a real bus, serial numbers are only known after opening.
        Ok(state
            .devices
            .iter()
            .map(|device| DeviceDescriptor {
                serial: None,
                ..device.clone()
            })
            .collect())
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<MockHandle> {
        let mut state = self.state.borrow_mut();
        let found = state
            .devices
            .iter()
            .find(|d| d.bus_number == device.bus_number && d.address == device.address)
            .cloned()
            .ok_or(Error::NoDeviceFound)?;
        state.opened += 1;
        Ok(MockHandle {
            state: Rc::clone(&self.state),
            device: found,
        })
    }
}

pub(crate) struct MockHandle {
    state: Rc<RefCell<MockState>>,
    device: DeviceDescriptor,
}

impl BulkDevice for MockHandle {
    fn write_bulk(&mut self, data: &[u8], timeout: Duration) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        let call = state.writes.len();
        state.writes.push(data.to_vec());
        state.timeouts.push(timeout);
        Ok(state.short_writes.get(&call).copied().unwrap_or(data.len()))
    }

    fn read_bulk(&mut self, buffer: &mut [u8], timeout: Duration) -> Result<usize> {
        let mut state = self.state.borrow_mut();
        state.read_calls += 1;
        state.read_sizes.push(buffer.len());
        state.timeouts.push(timeout);
        let frame = state
            .reads
            .pop_front()
            .ok_or(Error::Usb(rusb::Error::Timeout))?;
        let length = frame.len().min(buffer.len());
        buffer[..length].copy_from_slice(&frame[..length]);
        Ok(length)
    }

    fn serial_number(&mut self) -> Result<String> {
        self.device.serial.clone().ok_or(Error::Usb(rusb::Error::NotFound))
    }

    fn close(self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.closed += 1;
        if state.fail_close {
            return Err(Error::Usb(rusb::Error::Io));
        }
        Ok(())
    }
}

impl ClaimableDevice for MockHandle {
    fn set_configuration(&mut self, configuration: u8) -> Result<()> {
        self.state.borrow_mut().configuration = Some(configuration);
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<()> {
        self.state.borrow_mut().claimed.push(interface);
        Ok(())
    }
}
