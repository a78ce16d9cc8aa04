// Request framing for the stdio transport

use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

/// One newline-delimited frame read from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFrame {
    Line(String),
    /// A line that could not be turned into text, with the reason.
    Malformed(String),
}

/// `LinesCodec` with a length cap that yields bad lines as frames.
///
/// Invalid UTF-8 and overlong lines are consumed and reported as
/// [`RequestFrame::Malformed`], so the stream keeps going after them.
#[derive(Debug, Clone)]
pub struct RequestCodec {
    lines: LinesCodec,
    max_length: usize,
}

impl RequestCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    fn recover(
        &self,
        decoded: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<RequestFrame>, LinesCodecError> {
        match decoded {
            Ok(line) => Ok(line.map(RequestFrame::Line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(RequestFrame::Malformed(
                format!("Request line exceeds {} bytes", self.max_length),
            ))),
            Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                Ok(Some(RequestFrame::Malformed(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }
}

impl Decoder for RequestCodec {
    type Item = RequestFrame;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<RequestFrame>, LinesCodecError> {
        let decoded = self.lines.decode(buf);
        self.recover(decoded)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<RequestFrame>, LinesCodecError> {
        let decoded = self.lines.decode_eof(buf);
        self.recover(decoded)
    }
}
