use bytes::{BufMut, BytesMut};

use crate::Error;

/// Current protocol version.
pub const RTP_VERSION: u8 = 2;

/// Size of the fixed portion of the RTP header.
pub const RTP_HEADER_SIZE: usize = 12;

/// RTP header extension.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      defined by profile       |           length              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        header extension                       |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The length field counts 32-bit words, so `data` always holds a
/// multiple of four octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Defined by the profile in use; opaque to this codec.
    pub profile: u16,
    pub data: Vec<u8>,
}

/// RTP Header.
///
/// ### RTP Fixed Header Fields
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |V=2|P|X|  CC   |M|     PT      |       sequence number         |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |                           timestamp                           |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///  |           synchronization source (SSRC) identifier            |
///  +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
///  |            contributing source (CSRC) identifiers             |
///  |                             ....                              |
///  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The CSRC count and the header extension flag are not stored as
/// separate fields: the count is the length of `csrc_list` and the flag
/// is whether `extension` is present, so the wire invariants cannot be
/// violated by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// This field identifies the version of RTP.  The version defined by
    /// this specification is two (2).
    pub version: u8,
    /// If the padding bit is set, the packet contains one or more
    /// additional padding octets at the end which are not part of the
    /// payload.  The last octet of the padding contains a count of how
    /// many padding octets should be ignored, including itself.
    pub padding: bool,
    /// The interpretation of the marker is defined by a profile.  It is
    /// intended to allow significant events such as frame boundaries to
    /// be marked in the packet stream.
    pub marker: bool,
    /// This field identifies the format of the RTP payload and determines
    /// its interpretation by the application.
    pub payload_kind: u8,
    /// The sequence number increments by one for each RTP data packet
    /// sent, and may be used by the receiver to detect packet loss and to
    /// restore packet sequence.
    pub sequence_number: u16,
    /// The timestamp reflects the sampling instant of the first octet in
    /// the RTP data packet.
    pub timestamp: u32,
    /// The SSRC field identifies the synchronization source.  This
    /// identifier SHOULD be chosen randomly, with the intent that no two
    /// synchronization sources within the same RTP session will have the
    /// same SSRC identifier.
    pub ssrc: u32,
    /// The CSRC list identifies the contributing sources for the payload
    /// contained in this packet.  CSRC identifiers are inserted by
    /// mixers, using the SSRC identifiers of contributing sources.  At
    /// most 15 entries fit the 4-bit count field.
    pub csrc_list: Vec<u32>,
    /// If present, the fixed header is followed by exactly one header
    /// extension.
    pub extension: Option<Extension>,
}

impl Header {
    /// Create a header with the given payload type and SSRC, version 2,
    /// all flags clear and zero sequence number/timestamp.
    pub fn new(payload_kind: u8, ssrc: u32) -> Self {
        Self {
            version: RTP_VERSION,
            padding: false,
            marker: false,
            payload_kind,
            sequence_number: 0,
            timestamp: 0,
            ssrc,
            csrc_list: Vec::new(),
            extension: None,
        }
    }

    /// Encoded size of this header in octets.
    pub fn size(&self) -> usize {
        RTP_HEADER_SIZE
            + self.csrc_list.len() * 4
            + self.extension.as_ref().map_or(0, |it| 4 + it.data.len())
    }

    /// # Test
    ///
    /// ```
    /// use rtp_session_codec::rtp::Header;
    ///
    /// let buffer = [
    ///     0x80, 0x72, 0x04, 0xf1, 0xf8, 0x87, 0x3f, 0xad, 0x67, 0xfe,
    ///     0x9d, 0xfc,
    /// ];
    ///
    /// let header = Header::decode(&buffer).unwrap();
    ///
    /// assert_eq!(header.version, 2);
    /// assert_eq!(header.payload_kind, 114);
    /// assert_eq!(header.sequence_number, 1265);
    /// assert_eq!(header.timestamp, 4169613229);
    /// assert_eq!(header.ssrc, 1744739836);
    /// assert!(header.csrc_list.is_empty());
    /// assert!(header.extension.is_none());
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < RTP_HEADER_SIZE {
            return Err(Error::TooShort);
        }

        let version = buf[0] >> 6;
        if version != RTP_VERSION {
            return Err(Error::BadVersion);
        }

        let padding = (buf[0] >> 5) & 1 == 1;
        let has_extension = (buf[0] >> 4) & 1 == 1;
        let csrc_count = (buf[0] & 0x0F) as usize;
        let marker = buf[1] >> 7 == 1;
        let payload_kind = buf[1] & 0x7F;
        let sequence_number = u16::from_be_bytes(buf[2..4].try_into()?);
        let timestamp = u32::from_be_bytes(buf[4..8].try_into()?);
        let ssrc = u32::from_be_bytes(buf[8..12].try_into()?);

        let mut offset = RTP_HEADER_SIZE + csrc_count * 4;
        if buf.len() < offset {
            return Err(Error::TooShort);
        }

        let mut csrc_list = Vec::with_capacity(csrc_count);
        for i in 0..csrc_count {
            let word = RTP_HEADER_SIZE + i * 4;
            csrc_list.push(u32::from_be_bytes(buf[word..word + 4].try_into()?));
        }

        let extension = if has_extension {
            if buf.len() < offset + 4 {
                return Err(Error::TooShort);
            }

            let profile = u16::from_be_bytes(buf[offset..offset + 2].try_into()?);
            let words = u16::from_be_bytes(buf[offset + 2..offset + 4].try_into()?) as usize;
            offset += 4;

            if buf.len() < offset + words * 4 {
                return Err(Error::TooShort);
            }

            Some(Extension {
                profile,
                data: buf[offset..offset + words * 4].to_vec(),
            })
        } else {
            None
        };

        Ok(Self {
            version,
            padding,
            marker,
            payload_kind,
            sequence_number,
            timestamp,
            ssrc,
            csrc_list,
            extension,
        })
    }

    /// Append the encoded header to `bytes`.
    ///
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_session_codec::rtp::Header;
    ///
    /// let buffer = [
    ///     0x80, 0x72, 0x04, 0xf1, 0xf8, 0x87, 0x3f, 0xad, 0x67, 0xfe,
    ///     0x9d, 0xfc,
    /// ];
    ///
    /// let mut header = Header::new(114, 1744739836);
    /// header.sequence_number = 1265;
    /// header.timestamp = 4169613229;
    ///
    /// let mut bytes = BytesMut::new();
    /// header.encode(&mut bytes);
    ///
    /// assert_eq!(&bytes[..], &buffer[..]);
    /// ```
    pub fn encode(&self, bytes: &mut BytesMut) {
        debug_assert!(self.csrc_list.len() <= 15);

        let mut flags = (self.version << 6) | self.csrc_list.len() as u8;
        if self.padding {
            flags |= 1 << 5;
        }

        if self.extension.is_some() {
            flags |= 1 << 4;
        }

        bytes.put_u8(flags);
        bytes.put_u8(((self.marker as u8) << 7) | self.payload_kind);
        bytes.put_u16(self.sequence_number);
        bytes.put_u32(self.timestamp);
        bytes.put_u32(self.ssrc);

        for csrc in &self.csrc_list {
            bytes.put_u32(*csrc);
        }

        if let Some(extension) = &self.extension {
            debug_assert!(extension.data.len() % 4 == 0);

            bytes.put_u16(extension.profile);
            bytes.put_u16((extension.data.len() / 4) as u16);
            bytes.extend_from_slice(&extension.data);
        }
    }
}

/// One RTP data packet: the header followed by the payload octets.
///
/// The payload is carried verbatim, including any padding octets a
/// sender appended; when `header.padding` is set, the last payload
/// octet is the count of padding octets to ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Packet {
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_session_codec::rtp::{Header, Packet};
    ///
    /// let mut header = Header::new(26, 0x12345678);
    /// header.sequence_number = 4095;
    /// header.marker = true;
    ///
    /// let packet = Packet {
    ///     header,
    ///     payload: vec![0xDE, 0xAD, 0xBE, 0xEF],
    /// };
    ///
    /// let mut bytes = BytesMut::new();
    /// packet.encode(&mut bytes);
    ///
    /// let decoded = Packet::decode(&bytes[..]).unwrap();
    ///
    /// assert_eq!(decoded, packet);
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let header = Header::decode(buf)?;
        let payload = buf[header.size()..].to_vec();
        Ok(Self { header, payload })
    }

    /// Append the encoded packet to `bytes`.
    pub fn encode(&self, bytes: &mut BytesMut) {
        self.header.encode(bytes);
        bytes.extend_from_slice(&self.payload);
    }
}
