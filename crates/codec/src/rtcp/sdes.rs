use bytes::{BufMut, BytesMut};
use num_enum::TryFromPrimitive;

use crate::Error;

/// Maximum text length for an SDES item.
pub const MAX_SDES_TEXT: usize = 255;

/// SDES item type.
///
/// END (0) is the list terminator and never appears as a stored item;
/// it is consumed and produced by the codec itself.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum ItemKind {
    Cname = 1,
    Name = 2,
    Email = 3,
    Phone = 4,
    Location = 5,
    Tool = 6,
    Note = 7,
    Private = 8,
}

/// One SDES item: an 8-bit type, an 8-bit octet count and the text
/// itself, not null-terminated.  The text can be no longer than 255
/// octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub text: String,
}

/// One SDES chunk: an SSRC/CSRC identifier followed by a list of zero
/// or more items.  Each chunk starts on a 32-bit boundary, and its item
/// list is terminated by one or more null octets up to the next 32-bit
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub ssrc: u32,
    pub items: Vec<Item>,
}

/// SDES: Source Description RTCP Packet.
///
/// ```text
///         0                   1                   2                   3
///         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// header |V=2|P|    SC   |  PT=SDES=202  |             length            |
///        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// chunk  |                          SSRC/CSRC_1                          |
///   1    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |                           SDES items                          |
///        |                              ...                              |
///        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// chunk  |                          SSRC/CSRC_2                          |
///   2    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |                           SDES items                          |
///        |                              ...                              |
///        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sdes {
    pub chunks: Vec<Chunk>,
}

impl Sdes {
    pub(super) fn decode(sc: u8, body: &[u8]) -> Result<Self, Error> {
        let mut chunks = Vec::with_capacity(sc as usize);
        let mut offset = 0;

        for _ in 0..sc {
            if body.len() < offset + 4 {
                return Err(Error::LengthMismatch);
            }

            let ssrc = u32::from_be_bytes(body[offset..offset + 4].try_into()?);
            offset += 4;

            let mut items = Vec::new();
            loop {
                // A chunk may also end at the packet boundary without an
                // explicit terminator.
                if offset == body.len() {
                    break;
                }

                let kind = body[offset];
                if kind == 0 {
                    // Terminator reached: skip it and the null padding
                    // up to the next 32-bit boundary.
                    offset = (offset + 4) & !3;
                    break;
                }

                let kind = ItemKind::try_from(kind).map_err(|_| Error::UnknownKind(kind))?;

                if body.len() < offset + 2 {
                    return Err(Error::LengthMismatch);
                }

                let len = body[offset + 1] as usize;
                offset += 2;

                if body.len() < offset + len {
                    return Err(Error::LengthMismatch);
                }

                items.push(Item {
                    kind,
                    text: std::str::from_utf8(&body[offset..offset + len])?.to_string(),
                });

                offset += len;
            }

            if offset > body.len() {
                return Err(Error::LengthMismatch);
            }

            chunks.push(Chunk { ssrc, items });
        }

        if offset != body.len() {
            return Err(Error::LengthMismatch);
        }

        Ok(Self { chunks })
    }

    pub(super) fn encode(&self, bytes: &mut BytesMut) {
        for chunk in &self.chunks {
            let start = bytes.len();
            bytes.put_u32(chunk.ssrc);

            for item in &chunk.items {
                debug_assert!(item.text.len() <= MAX_SDES_TEXT);

                bytes.put_u8(item.kind as u8);
                bytes.put_u8(item.text.len() as u8);
                bytes.extend_from_slice(item.text.as_bytes());
            }

            // Terminate the item list and pad the chunk with null
            // octets to the next 32-bit boundary.
            let used = bytes.len() - start;
            let pad = 4 - (used % 4);
            bytes.put_bytes(0, pad);
        }
    }
}
