use bytes::{BufMut, BytesMut};

use crate::Error;

/// BYE: Goodbye RTCP Packet.
///
/// ```text
///        0                   1                   2                   3
///        0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///       +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///       |V=2|P|    SC   |   PT=BYE=203  |             length            |
///       +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///       |                           SSRC/CSRC                           |
///       +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///       :                              ...                              :
///       +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// (opt) |     length    |               reason for leaving            ...
///       +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Indicates that one or more sources are no longer active.  The
/// optional reason is a length-prefixed string padded with null octets
/// to the next 32-bit boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bye {
    pub sources: Vec<u32>,
    pub reason: Option<String>,
}

impl Bye {
    pub(super) fn decode(sc: u8, body: &[u8]) -> Result<Self, Error> {
        let mut offset = sc as usize * 4;
        if body.len() < offset {
            return Err(Error::LengthMismatch);
        }

        let mut sources = Vec::with_capacity(sc as usize);
        for i in 0..sc as usize {
            sources.push(u32::from_be_bytes(body[i * 4..i * 4 + 4].try_into()?));
        }

        let reason = if offset < body.len() {
            let len = body[offset] as usize;
            offset += 1;

            if body.len() < offset + len {
                return Err(Error::LengthMismatch);
            }

            let text = std::str::from_utf8(&body[offset..offset + len])?.to_string();
            offset = (offset + len + 3) & !3;

            Some(text)
        } else {
            None
        };

        if offset != body.len() {
            return Err(Error::LengthMismatch);
        }

        Ok(Self { sources, reason })
    }

    pub(super) fn encode(&self, bytes: &mut BytesMut) {
        debug_assert!(self.sources.len() <= 31);

        for source in &self.sources {
            bytes.put_u32(*source);
        }

        if let Some(reason) = &self.reason {
            debug_assert!(reason.len() <= 255);

            bytes.put_u8(reason.len() as u8);
            bytes.extend_from_slice(reason.as_bytes());

            let pad = (4 - (1 + reason.len()) % 4) % 4;
            bytes.put_bytes(0, pad);
        }
    }
}
