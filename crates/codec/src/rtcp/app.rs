use bytes::{BufMut, BytesMut};

use crate::Error;

/// APP: Application-Defined RTCP Packet.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P| subtype |   PT=APP=204  |             length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           SSRC/CSRC                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          name (ASCII)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                   application-dependent data                ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Intended for experimental use; the name and the data are opaque to
/// this codec.  The data length must be a multiple of 32 bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    /// Subtype, from the 5-bit count field of the common header.
    pub subtype: u8,
    pub ssrc: u32,
    /// Four ASCII octets chosen by the defining application.
    pub name: [u8; 4],
    pub data: Vec<u8>,
}

impl App {
    pub(super) fn decode(subtype: u8, body: &[u8]) -> Result<Self, Error> {
        if body.len() < 8 {
            return Err(Error::LengthMismatch);
        }

        Ok(Self {
            subtype,
            ssrc: u32::from_be_bytes(body[0..4].try_into()?),
            name: body[4..8].try_into()?,
            data: body[8..].to_vec(),
        })
    }

    pub(super) fn encode(&self, bytes: &mut BytesMut) {
        debug_assert!(self.subtype <= 31);
        debug_assert!(self.data.len() % 4 == 0);

        bytes.put_u32(self.ssrc);
        bytes.extend_from_slice(&self.name);
        bytes.extend_from_slice(&self.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtcp::Packet;

    #[test]
    fn app_roundtrip() {
        let app = Packet::App(App {
            subtype: 5,
            ssrc: 0xCAFEBABE,
            name: *b"mjpg",
            data: vec![0, 1, 2, 3, 4, 5, 6, 7],
        });

        let mut bytes = BytesMut::new();
        app.encode(&mut bytes);

        assert_eq!(bytes.len(), 4 + 8 + 8);
        assert_eq!(bytes[0], 0x85);

        let (decoded, _) = Packet::decode(&bytes[..]).unwrap();
        assert_eq!(decoded, app);
    }

    #[test]
    fn app_without_data_roundtrip() {
        let app = Packet::App(App {
            subtype: 0,
            ssrc: 1,
            name: *b"test",
            data: vec![],
        });

        let mut bytes = BytesMut::new();
        app.encode(&mut bytes);

        let (decoded, _) = Packet::decode(&bytes[..]).unwrap();
        assert_eq!(decoded, app);
    }

    #[test]
    fn app_shorter_than_name_rejected() {
        let buffer = [0x80, 0xcc, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01];

        assert!(matches!(
            Packet::decode(&buffer),
            Err(Error::LengthMismatch)
        ));
    }
}
