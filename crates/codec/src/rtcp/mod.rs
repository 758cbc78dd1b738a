pub mod app;
pub mod bye;
pub mod report;
pub mod sdes;

use bytes::{BufMut, BytesMut};
use num_enum::TryFromPrimitive;

use self::{
    app::App,
    bye::Bye,
    report::{Rr, Sr},
    sdes::Sdes,
};
use crate::Error;

/// Size of the RTCP common header word.
pub const RTCP_HEADER_SIZE: usize = 4;

const VERSION_MASK: u8 = 0b1100_0000;
const PADDING_MASK: u8 = 0b0010_0000;
const COUNT_MASK: u8 = 0b0001_1111;

/// RTCP packet type.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
pub enum PacketKind {
    Sr = 200,
    Rr = 201,
    Sdes = 202,
    Bye = 203,
    App = 204,
}

/// RTCP common header word.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|    C    |       PT      |             length            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The 5-bit count field varies by packet type: it is the reception
/// report count for SR/RR, the chunk count for SDES, the source count
/// for BYE and the subtype for APP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub padding: bool,
    pub count: u8,
    pub kind: PacketKind,
}

impl Header {
    /// Total packet size in octets declared by the length field: the
    /// length of the RTCP packet in 32-bit words minus one, including
    /// the header and any padding.  (The offset of one makes zero a
    /// valid length and avoids a possible infinite loop in scanning a
    /// compound RTCP packet.)
    ///
    /// The caller must supply at least one header word.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_session_codec::rtcp::Header;
    ///
    /// let buffer = [
    ///     0x80, 0xc8, 0x00, 0x06, 0x79, 0x26, 0x69, 0x55,
    ///     0xe8, 0xe2, 0xe2, 0x17, 0xd4, 0x2f, 0x05, 0x91,
    ///     0x36, 0x01, 0xb0, 0xaf, 0x34, 0x85, 0x78, 0x5e,
    ///     0x2d, 0xbc, 0x2a, 0x98,
    /// ];
    ///
    /// assert_eq!(Header::peek_len(&buffer), 28);
    /// ```
    pub fn peek_len(buf: &[u8]) -> usize {
        assert!(buf.len() >= RTCP_HEADER_SIZE);

        let words = u16::from_be_bytes([buf[2], buf[3]]) as usize;
        (words + 1) * 4
    }

    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < RTCP_HEADER_SIZE {
            return Err(Error::TooShort);
        }

        if (buf[0] & VERSION_MASK) >> 6 != 2 {
            return Err(Error::BadVersion);
        }

        Ok(Self {
            padding: (buf[0] & PADDING_MASK) >> 5 == 1,
            count: buf[0] & COUNT_MASK,
            kind: PacketKind::try_from(buf[1]).map_err(|_| Error::UnknownKind(buf[1]))?,
        })
    }
}

/// One RTCP packet, keyed on the packet type of its common header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Sr(Sr),
    Rr(Rr),
    Sdes(Sdes),
    Bye(Bye),
    App(App),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Sr(_) => PacketKind::Sr,
            Self::Rr(_) => PacketKind::Rr,
            Self::Sdes(_) => PacketKind::Sdes,
            Self::Bye(_) => PacketKind::Bye,
            Self::App(_) => PacketKind::App,
        }
    }

    fn count(&self) -> u8 {
        match self {
            Self::Sr(sr) => sr.reports.len() as u8,
            Self::Rr(rr) => rr.reports.len() as u8,
            Self::Sdes(sdes) => sdes.chunks.len() as u8,
            Self::Bye(bye) => bye.sources.len() as u8,
            Self::App(app) => app.subtype,
        }
    }

    /// Decode one RTCP packet from the front of `buf`, returning it
    /// together with the number of octets consumed (the declared packet
    /// size, padding included).
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_session_codec::rtcp::{Packet, PacketKind};
    ///
    /// let buffer = [
    ///     0x80, 0xc8, 0x00, 0x06, 0x79, 0x26, 0x69, 0x55,
    ///     0xe8, 0xe2, 0xe2, 0x17, 0xd4, 0x2f, 0x05, 0x91,
    ///     0x36, 0x01, 0xb0, 0xaf, 0x34, 0x85, 0x78, 0x5e,
    ///     0x2d, 0xbc, 0x2a, 0x98,
    /// ];
    ///
    /// let (packet, size) = Packet::decode(&buffer).unwrap();
    ///
    /// assert_eq!(size, 28);
    /// assert_eq!(packet.kind(), PacketKind::Sr);
    /// ```
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), Error> {
        let header = Header::decode(buf)?;

        let size = Header::peek_len(buf);
        if size > buf.len() {
            return Err(Error::LengthMismatch);
        }

        let mut body = &buf[RTCP_HEADER_SIZE..size];
        if header.padding {
            // The last octet of the padding is a count of how many
            // padding octets should be ignored, including itself.
            let pad = body.last().copied().unwrap_or(0) as usize;
            if pad == 0 || pad > body.len() {
                return Err(Error::LengthMismatch);
            }

            body = &body[..body.len() - pad];
        }

        let packet = match header.kind {
            PacketKind::Sr => Self::Sr(Sr::decode(header.count, body)?),
            PacketKind::Rr => Self::Rr(Rr::decode(header.count, body)?),
            PacketKind::Sdes => Self::Sdes(Sdes::decode(header.count, body)?),
            PacketKind::Bye => Self::Bye(Bye::decode(header.count, body)?),
            PacketKind::App => Self::App(App::decode(header.count, body)?),
        };

        Ok((packet, size))
    }

    /// Append the encoded packet to `bytes`.
    ///
    /// Compound packets are produced by encoding several packets into
    /// the same buffer back to back.  The encoder never emits the
    /// padding bit; every body it writes is already 32-bit aligned.
    ///
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_session_codec::rtcp::{bye::Bye, Packet};
    ///
    /// let packet = Packet::Bye(Bye {
    ///     sources: vec![0x79266955],
    ///     reason: None,
    /// });
    ///
    /// let mut bytes = BytesMut::new();
    /// packet.encode(&mut bytes);
    ///
    /// assert_eq!(&bytes[..], &[0x81, 0xcb, 0x00, 0x01, 0x79, 0x26, 0x69, 0x55]);
    /// ```
    pub fn encode(&self, bytes: &mut BytesMut) {
        let start = bytes.len();

        bytes.put_u8((2 << 6) | (self.count() & COUNT_MASK));
        bytes.put_u8(self.kind() as u8);

        // Reserve the length word and backfill it once the body size is
        // known.
        bytes.put_u16(0);

        match self {
            Self::Sr(sr) => sr.encode(bytes),
            Self::Rr(rr) => rr.encode(bytes),
            Self::Sdes(sdes) => sdes.encode(bytes),
            Self::Bye(bye) => bye.encode(bytes),
            Self::App(app) => app.encode(bytes),
        }

        let size = bytes.len() - start;
        debug_assert!(size % 4 == 0);

        let words = ((size / 4) - 1) as u16;
        bytes[start + 2..start + 4].copy_from_slice(&words.to_be_bytes());
    }
}

/// Lazy decoder over a compound RTCP buffer.
///
/// Multiple RTCP packets may be concatenated without any intervening
/// separators to form a compound packet.  The iterator yields each
/// packet in turn, stops cleanly when the buffer is exhausted and
/// yields [`Error::LengthMismatch`] if a trailing fragment is shorter
/// than one common header or than its declared length.
///
/// # Test
///
/// ```
/// use bytes::BytesMut;
/// use rtp_session_codec::rtcp::{bye::Bye, report::Rr, Compound, Packet};
///
/// let mut bytes = BytesMut::new();
///
/// Packet::Rr(Rr { ssrc: 1, reports: vec![] }).encode(&mut bytes);
/// Packet::Bye(Bye { sources: vec![1], reason: None }).encode(&mut bytes);
///
/// let packets = Compound::new(&bytes[..])
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
///
/// assert_eq!(packets.len(), 2);
/// ```
pub struct Compound<'a> {
    buf: &'a [u8],
}

impl<'a> Compound<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }
}

impl Iterator for Compound<'_> {
    type Item = Result<Packet, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }

        if self.buf.len() < RTCP_HEADER_SIZE {
            self.buf = &[];
            return Some(Err(Error::LengthMismatch));
        }

        match Packet::decode(self.buf) {
            Ok((packet, size)) => {
                self.buf = &self.buf[size..];
                Some(Ok(packet))
            }
            Err(err) => {
                self.buf = &[];
                Some(Err(err))
            }
        }
    }
}
