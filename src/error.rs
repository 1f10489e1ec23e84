use crate::protocol::Status;
use std::result::Result as StdResult;
use thiserror::Error;

/// Errors which can occur during device discovery and communication.
#[derive(Debug, Error)]
pub enum Error {
    /// No fastboot device showed up within the discovery polling budget.
    #[error("no fastboot device appeared after {attempts} attempts")]
    DeviceTimeout {
        /// Number of device list polls performed.
        attempts: u32,
    },

    /// It was attempted to connect, but no matching device exists.
    #[error("no fastboot device found")]
    NoDeviceFound,

    /// The device transferred fewer (or more) bytes than requested.
    #[error("short write: {written} of {requested} bytes transferred")]
    ShortWrite {
        /// Bytes the transport reported as written.
        written: usize,
        /// Bytes that should have been written.
        requested: usize,
    },

    /// The device did not answer a `download` announcement with `DATA`.
    #[error("device refused download of {size} bytes")]
    InvalidDownloadResponse {
        /// Payload size that was announced.
        size: u64,
    },

    /// The device did not acknowledge a completed upload with `OKAY`.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// The device answered a command with `FAIL`.
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// The device answered with a status the caller did not expect.
    #[error("unexpected response status {0}")]
    UnexpectedStatus(Status),

    /// The payload does not fit into the 32 bit size field of a download command.
    #[error("payload of {0} bytes is too large")]
    PayloadTooLarge(u64),

    /// The device has no bulk endpoint pair on the fastboot interface.
    #[error("device has no bulk endpoints")]
    MissingEndpoints,

    /// The session has no open device handle.
    #[error("session is not connected")]
    NotConnected,

    /// The session already holds an open device handle.
    #[error("session is already connected")]
    AlreadyConnected,

    /// An error occurred during the raw USB communication.
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// Reading the upload payload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand for a Result with the crate's own Error type.
pub type Result<T> = StdResult<T, Error>;
