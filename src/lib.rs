//! This crate talks to devices in fastboot mode over USB. It finds them, sends commands, collects
//! their responses and uploads payloads with the `download` handshake.
//!
//! # Example: Uploading an image
//! ```rust, no_run
//! use fastboot_usb::{Config, Context, Status};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Wait for a device to show up on the bus
//! let context = Context::new()?;
//! context.wait()?;
//!
//! context.with_session(&Config::default(), |session| {
//!     println!("Connected to {}", session.serial_number()?);
//!     println!("Bootloader version: {}", session.getvar("version-bootloader")?);
//!
//!     // Send the image to the device's download buffer
//!     session.upload_file("boot.img")?;
//!
//!     let response = session.command_str("boot")?;
//!     if response.status != Status::Okay {
//!         eprintln!("Boot refused: {}", response.payload);
//!     }
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! Uploads can also be driven step by step to report progress. See the [`Operation`] trait for
//! details.
//!
//! [`Operation`]: trait.Operation.html

extern crate log;
extern crate rusb;
extern crate thiserror;

mod config;
mod context;
mod error;
mod operation;
pub mod protocol;
mod session;
pub mod transport;
mod usb;

#[cfg(test)]
mod mock;

pub use config::{Config, DEFAULT_POLL_INTERVAL, DEFAULT_WAIT_ATTEMPTS};
pub use context::Context;
pub use error::{Error, Result};
pub use operation::{Operation, Upload};
pub use protocol::{Response, Status};
pub use rusb::UsbContext;
pub use session::Session;
pub use transport::{BulkDevice, ClaimableDevice, DeviceDescriptor, Transport};
pub use usb::{UsbDevice, UsbTransport};

use std::time::Duration;

/// USB vendor ID of fastboot devices.
pub const VENDOR_ID: u16 = 0x18d1;

/// USB product ID of fastboot devices.
pub const PRODUCT_ID: u16 = 0xd00d;

/// USB configuration selected on connect.
pub const CONFIGURATION: u8 = 1;

/// USB interface carrying the fastboot bulk endpoints.
pub const INTERFACE: u8 = 0;

/// Size of the blocks an upload is split into.
pub const BLOCK_SIZE: usize = 512 * 1024;

/// Size of the buffer a single response frame is read into.
pub const RESPONSE_BUFFER_SIZE: usize = 64;

/// Default timeout for USB transfers.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);
