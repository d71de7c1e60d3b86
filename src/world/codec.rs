//! World link codec: newline-delimited JSON.

use std::io::ErrorKind;

use anyhow::Error;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed, LinesCodec, LinesCodecError};
use tracing::warn;

use crate::world::events::{WorldCommand, WorldEvent};

/// Longest line accepted from the world host.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Codec for world link frames.
///
/// Lines that are blank, oversized, not UTF-8 or not a known event are logged and skipped
/// so one bad frame does not drop the link.
pub struct WorldCodec {
    lines: LinesCodec,
}

impl WorldCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        }
    }

    fn parse(line: &str) -> Option<WorldEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str(line) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Ignoring malformed world event ({}): {}", e, line);
                None
            }
        }
    }
}

impl Default for WorldCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WorldCodec {
    type Item = WorldEvent;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.lines.decode(src) {
                Ok(Some(line)) => {
                    if let Some(event) = Self::parse(&line) {
                        return Ok(Some(event));
                    }
                }
                Ok(None) => return Ok(None),
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("Ignoring world event longer than {} bytes", MAX_LINE_LENGTH);
                }
                Err(LinesCodecError::Io(e)) if e.kind() == ErrorKind::InvalidData => {
                    warn!("Ignoring world event that is not UTF-8");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.lines.decode_eof(src) {
                Ok(Some(line)) => {
                    if let Some(event) = Self::parse(&line) {
                        return Ok(Some(event));
                    }
                }
                Ok(None) => return Ok(None),
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("Ignoring world event longer than {} bytes", MAX_LINE_LENGTH);
                }
                Err(LinesCodecError::Io(e)) if e.kind() == ErrorKind::InvalidData => {
                    warn!("Ignoring world event that is not UTF-8");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Encoder<WorldCommand> for WorldCodec {
    type Error = Error;

    fn encode(&mut self, item: WorldCommand, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = serde_json::to_string(&item)?;
        self.lines.encode(line, dst)?;
        Ok(())
    }
}

/// A framed world link connection.
pub type WorldConnection<S> = Framed<S, WorldCodec>;

/// Create a new world connection from a stream.
pub fn new_world_connection<S: AsyncRead + AsyncWrite>(stream: S) -> WorldConnection<S> {
    Framed::new(stream, WorldCodec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::events::{ChatEvent, PresenceEvent};

    #[test]
    fn test_decode_waits_for_full_line() {
        let mut codec = WorldCodec::new();
        let mut buf = BytesMut::from(r#"{"type":"join","player":"St"#);

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"eve\"}\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(WorldEvent::Join(PresenceEvent {
                player: "Steve".to_string()
            }))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_skips_bad_lines() {
        let mut codec = WorldCodec::new();
        let mut buf = BytesMut::from(
            "not json\n\n{\"type\":\"weather\"}\n{\"type\":\"chat\",\"player\":\"Alice\",\"message\":\"hi\"}\n",
        );

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(WorldEvent::Chat(ChatEvent {
                player: "Alice".to_string(),
                message: "hi".to_string(),
            }))
        );
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_skips_oversized_line() {
        let mut codec = WorldCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&vec![b'x'; MAX_LINE_LENGTH + 1]);
        buf.extend_from_slice(b"\n{\"type\":\"quit\",\"player\":\"Steve\"}\n");

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(WorldEvent::Quit(PresenceEvent {
                player: "Steve".to_string()
            }))
        );
    }

    #[test]
    fn test_decode_skips_invalid_utf8_line() {
        let mut codec = WorldCodec::new();
        let mut buf = BytesMut::from(&b"\xff\xfe\n{\"type\":\"quit\",\"player\":\"Steve\"}\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(WorldEvent::Quit(PresenceEvent {
                player: "Steve".to_string()
            }))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_eof_skips_invalid_utf8_tail() {
        let mut codec = WorldCodec::new();
        let mut buf = BytesMut::from(&b"\xc3\x28"[..]);

        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_eof_reads_trailing_line() {
        let mut codec = WorldCodec::new();
        let mut buf = BytesMut::from(r#"{"type":"quit","player":"Steve"}"#);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(codec.decode_eof(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_encode_broadcast() {
        let mut codec = WorldCodec::new();
        let mut buf = BytesMut::new();

        codec
            .encode(
                WorldCommand::Broadcast {
                    message: "hello".to_string(),
                },
                &mut buf,
            )
            .unwrap();

        assert_eq!(&buf[..], b"{\"type\":\"broadcast\",\"message\":\"hello\"}\n");
    }
}
