//! Framing of fastboot commands and responses.

use crate::error::{Error, Result};
use std::fmt;

/// Length of the status token at the start of every response frame.
pub const HEADER_LENGTH: usize = 4;

/// Status token of a response frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// The device rejected the command. The payload usually says why.
    Fail,

    /// The command completed.
    Okay,

    /// The device is ready to receive the announced amount of data.
    Data,

    /// Informational line. More frames follow.
    Info,

    /// Anything else, including frames too short to carry a header.
    Unknown,
}

impl Status {
    /// Classifies a raw response frame by its first four bytes. Matching is case-sensitive.
    pub fn from_header(frame: &[u8]) -> Self {
        if frame.len() < HEADER_LENGTH {
            return Status::Unknown;
        }
        match &frame[..HEADER_LENGTH] {
            b"INFO" => Status::Info,
            b"OKAY" => Status::Okay,
            b"DATA" => Status::Data,
            b"FAIL" => Status::Fail,
            _ => Status::Unknown,
        }
    }

    fn token(self) -> &'static str {
        match self {
            Status::Fail => "FAIL",
            Status::Okay => "OKAY",
            Status::Data => "DATA",
            Status::Info => "INFO",
            Status::Unknown => "????",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Final answer of the device to a command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    /// Status of the terminal frame.
    pub status: Status,

    /// Text of all frames without their status tokens. Every frame adds one line, terminated by
    /// a newline.
    pub payload: String,

    /// The last frame exactly as received.
    pub raw_data: Vec<u8>,
}

impl Response {
    /// Whether the device answered with `OKAY`.
    pub fn is_okay(&self) -> bool {
        self.status == Status::Okay
    }

    /// Turns a `FAIL` response into [`Error::CommandFailed`] and passes everything else through.
    ///
    /// [`Error::CommandFailed`]: ../enum.Error.html#variant.CommandFailed
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            Status::Fail => Err(Error::CommandFailed(self.payload)),
            _ => Ok(self),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        let payload = self.payload.trim_end_matches('\n');
        if !payload.is_empty() {
            write!(f, " {}", payload)?;
        }
        Ok(())
    }
}

/// Collects the frames of one response until a terminal frame arrives.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    text: String,
    frames: usize,
    status: Option<Status>,
    last_frame: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a received frame and returns its status. Only [`Status::Info`] asks for another frame.
    ///
    /// [`Status::Info`]: enum.Status.html#variant.Info
    pub fn push(&mut self, frame: &[u8]) -> Status {
        let status = Status::from_header(frame);

        if frame.len() > HEADER_LENGTH {
            self.text.push_str(&decode_ascii(&frame[HEADER_LENGTH..]));
        }
        self.text.push('\n');

        self.frames += 1;
        self.status = Some(status);
        self.last_frame = frame.to_vec();
        status
    }

    /// Number of frames pushed so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn finish(self) -> Response {
        Response {
            status: self.status.unwrap_or(Status::Unknown),
            payload: clean(&self.text),
            raw_data: self.last_frame,
        }
    }
}

/// Decodes bytes as ASCII. Bytes above 0x7f become `?`.
pub fn decode_ascii(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
        .collect()
}

/// Strips carriage returns and NUL characters.
pub fn clean(text: &str) -> String {
    text.chars().filter(|&c| c != '\r' && c != '\0').collect()
}

/// Builds the `download` command announcing a payload of `size` bytes.
///
/// # Examples
///
/// ```rust
/// use fastboot_usb::protocol::download_command;
///
/// assert_eq!(download_command(255).unwrap(), "download:000000FF");
/// ```
pub fn download_command(size: u64) -> Result<String> {
    if size > u64::from(u32::MAX) {
        return Err(Error::PayloadTooLarge(size));
    }
    Ok(format!("download:{:08X}", size))
}

/// Builds the `getvar` command for a variable name.
pub fn getvar_command(name: &str) -> String {
    format!("getvar:{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_headers_classify_exactly() {
        assert_eq!(Status::from_header(b"INFOhello"), Status::Info);
        assert_eq!(Status::from_header(b"OKAY"), Status::Okay);
        assert_eq!(Status::from_header(b"DATA00001000"), Status::Data);
        assert_eq!(Status::from_header(b"FAILnope"), Status::Fail);
    }

    #[test]
    fn header_matching_is_case_sensitive() {
        assert_eq!(Status::from_header(b"okay"), Status::Unknown);
        assert_eq!(Status::from_header(b"Info"), Status::Unknown);
        assert_eq!(Status::from_header(b"fail: x"), Status::Unknown);
    }

    #[test]
    fn short_or_garbage_frames_are_unknown() {
        assert_eq!(Status::from_header(b""), Status::Unknown);
        assert_eq!(Status::from_header(b"OKA"), Status::Unknown);
        assert_eq!(Status::from_header(b"XXXXpayload"), Status::Unknown);
    }

    #[test]
    fn status_displays_wire_token() {
        assert_eq!(Status::Data.to_string(), "DATA");
        assert_eq!(Status::Unknown.to_string(), "????");
    }

    #[test]
    fn builder_joins_frames_with_newlines() {
        let mut builder = ResponseBuilder::new();
        assert_eq!(builder.push(b"INFOfirst"), Status::Info);
        assert_eq!(builder.push(b"INFOsecond"), Status::Info);
        assert_eq!(builder.push(b"OKAYdone"), Status::Okay);
        assert_eq!(builder.frames(), 3);

        let response = builder.finish();
        assert_eq!(response.status, Status::Okay);
        assert_eq!(response.payload, "first\nsecond\ndone\n");
        assert_eq!(response.raw_data, b"OKAYdone".to_vec());
    }

    #[test]
    fn cleaning_removes_only_cr_and_nul() {
        let mut builder = ResponseBuilder::new();
        builder.push(b"INFOa\r\0b\tc");
        builder.push(b"OKAY\0\0x y\r");
        let response = builder.finish();
        assert_eq!(response.payload, "ab\tc\nx y\n");
        // The raw frame keeps everything.
        assert_eq!(response.raw_data, b"OKAY\0\0x y\r".to_vec());
    }

    #[test]
    fn header_never_leaks_into_payload() {
        let mut builder = ResponseBuilder::new();
        builder.push(b"FAILunknown command");
        let response = builder.finish();
        assert_eq!(response.status, Status::Fail);
        assert_eq!(response.payload, "unknown command\n");
    }

    #[test]
    fn short_frame_contributes_empty_line() {
        let mut builder = ResponseBuilder::new();
        builder.push(b"INFOa");
        assert_eq!(builder.push(b"OK"), Status::Unknown);
        let response = builder.finish();
        assert_eq!(response.status, Status::Unknown);
        assert_eq!(response.payload, "a\n\n");
        assert_eq!(response.raw_data, b"OK".to_vec());
    }

    #[test]
    fn non_ascii_bytes_decode_as_question_marks() {
        assert_eq!(decode_ascii(&[b'a', 0xff, b'b']), "a?b");
    }

    #[test]
    fn empty_builder_is_unknown() {
        let response = ResponseBuilder::new().finish();
        assert_eq!(response.status, Status::Unknown);
        assert!(response.payload.is_empty());
        assert!(response.raw_data.is_empty());
    }

    #[test]
    fn fail_response_converts_to_error() {
        let response = Response {
            status: Status::Fail,
            payload: "locked".to_string(),
            raw_data: b"FAILlocked".to_vec(),
        };
        match response.into_result() {
            Err(Error::CommandFailed(message)) => assert_eq!(message, "locked"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn frame_without_payload_still_ends_its_line() {
        let mut builder = ResponseBuilder::new();
        builder.push(b"OKAY");
        assert_eq!(builder.finish().payload, "\n");
    }

    #[test]
    fn response_display() {
        let response = Response {
            status: Status::Okay,
            payload: "0.4\n".to_string(),
            raw_data: b"OKAY0.4".to_vec(),
        };
        assert_eq!(response.to_string(), "OKAY 0.4");
    }

    #[test]
    fn download_command_is_zero_padded_uppercase_hex() {
        assert_eq!(download_command(255).unwrap(), "download:000000FF");
        assert_eq!(download_command(0).unwrap(), "download:00000000");
        assert_eq!(download_command(0xABCDEF12).unwrap(), "download:ABCDEF12");
    }

    #[test]
    fn download_command_rejects_oversized_payloads() {
        match download_command(1 << 32) {
            Err(Error::PayloadTooLarge(size)) => assert_eq!(size, 1 << 32),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn getvar_command_text() {
        assert_eq!(getvar_command("version"), "getvar:version");
    }
}
