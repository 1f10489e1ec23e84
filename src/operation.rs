use std::io::Read;

use log::{debug, trace};

use super::error::{Error, Result};
use super::protocol::{clean, decode_ascii, download_command, Status};
use super::session::Session;
use super::transport::Transport;
use super::{BLOCK_SIZE, RESPONSE_BUFFER_SIZE};

/// A long-running transfer which reports progress while it runs. Each iteration step yields the
/// number of bytes processed so far.
pub trait Operation: Iterator<Item = Result<usize>> {
    fn total(&self) -> usize;

    fn execute(&mut self) -> Result<()> {
        if let Some(Err(error)) = self.last() {
            Err(error)
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stage {
    Transfer,
    AwaitStatus,
    Done,
}

/// Upload of a payload via the `download` command.
///
/// The device has already accepted the announced size once an `Upload` exists. Iterating sends
/// one block of up to [`BLOCK_SIZE`] bytes per step, and a last step reads the device's verdict.
///
/// [`BLOCK_SIZE`]: constant.BLOCK_SIZE.html
pub struct Upload<'s, 'c, T: Transport, R: Read> {
    session: &'s mut Session<'c, T>,
    reader: R,
    length: usize,
    sent: usize,
    block: Vec<u8>,
    stage: Stage,
}

impl<T: Transport, R: Read> Operation for Upload<'_, '_, T, R> {
    fn total(&self) -> usize {
        self.length
    }
}

impl<T: Transport, R: Read> Iterator for Upload<'_, '_, T, R> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.stage {
            Stage::Done => return None,
            Stage::Transfer if self.sent < self.length => self.send_block(),
            Stage::Transfer | Stage::AwaitStatus => {
                // Nothing left to send, so this is the last step either way
                self.stage = Stage::Done;
                self.read_status()
            }
        };

        if result.is_err() {
            // Ensure that the iterator is fused after an error occurs
            self.stage = Stage::Done;
        } else if self.stage == Stage::Transfer && self.sent == self.length {
            self.stage = Stage::AwaitStatus;
        }
        Some(result)
    }
}

impl<'s, 'c, T: Transport, R: Read> Upload<'s, 'c, T, R> {
    /// Announces the payload size and checks that the device is ready to receive it.
    pub(crate) fn start(session: &'s mut Session<'c, T>, reader: R, length: u64) -> Result<Self> {
        let command = download_command(length)?;
        let response = session.command_str(&command)?;
        if response.status != Status::Data {
            debug!("Download of {} bytes refused: {}", length, response);
            return Err(Error::InvalidDownloadResponse { size: length });
        }
        debug!("Device accepted download of {} bytes", length);

        let length = length as usize;
        Ok(Self {
            session,
            reader,
            length,
            sent: 0,
            block: vec![0u8; BLOCK_SIZE.min(length)],
            stage: Stage::Transfer,
        })
    }

    /// Bytes sent to the device so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    fn send_block(&mut self) -> Result<usize> {
        let size = (self.length - self.sent).min(BLOCK_SIZE);
        let block = &mut self.block[..size];
        self.reader.read_exact(block)?;

        trace!("Sending block at offset {} ({} bytes)", self.sent, size);
        self.session.write_exact(block)?;
        self.sent += size;
        Ok(self.sent)
    }

    fn read_status(&mut self) -> Result<usize> {
        let mut buffer = [0u8; RESPONSE_BUFFER_SIZE];
        let read = self.session.read_frame(&mut buffer)?;
        let frame = &buffer[..read];

        match Status::from_header(frame) {
            Status::Okay => {
                debug!("Upload of {} bytes complete", self.length);
                Ok(self.length)
            }
            _ => Err(Error::UploadFailed(clean(&decode_ascii(frame)))),
        }
    }
}
