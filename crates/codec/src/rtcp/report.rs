use bytes::{BufMut, BytesMut};

use crate::Error;

/// Size of one reception report block in octets.
pub const REPORT_BLOCK_SIZE: usize = 24;

/// Size of the SR sender information section in octets.
const SENDER_INFO_SIZE: usize = 20;

/// Reception report block.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                 SSRC_n (SSRC of n-th source)                  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | fraction lost |       cumulative number of packets lost       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           extended highest sequence number received           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      interarrival jitter                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         last SR (LSR)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                   delay since last SR (DLSR)                  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportBlock {
    /// The SSRC identifier of the source to which the information in
    /// this reception report block pertains.
    pub ssrc: u32,
    /// The fraction of RTP data packets from this source lost since the
    /// previous SR or RR packet was sent, expressed as a fixed point
    /// number with the binary point at the left edge of the field.
    pub fraction_lost: u8,
    /// The total number of RTP data packets from this source that have
    /// been lost since the beginning of reception.  A signed 24-bit
    /// value on the wire: late or duplicate packets can make it
    /// negative.
    pub packets_lost: i32,
    /// The low 16 bits contain the highest sequence number received in
    /// an RTP data packet from this source, and the most significant 16
    /// bits extend that sequence number with the corresponding count of
    /// sequence number cycles.
    pub last_sequence: u32,
    /// An estimate of the statistical variance of the RTP data packet
    /// interarrival time, measured in timestamp units and expressed as
    /// an unsigned integer.
    pub jitter: u32,
    /// The middle 32 bits out of 64 in the NTP timestamp received as
    /// part of the most recent RTCP sender report, or zero if none has
    /// been received yet.
    pub last_sr: u32,
    /// The delay, expressed in units of 1/65536 seconds, between
    /// receiving the last SR packet from this source and sending this
    /// reception report block, or zero if no SR has been received yet.
    pub delay_last_sr: u32,
}

impl ReportBlock {
    pub(super) fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < REPORT_BLOCK_SIZE {
            return Err(Error::LengthMismatch);
        }

        // Cumulative lost is a signed 24-bit field: sign-extend the top
        // bit into a full i32.
        let lost = u32::from_be_bytes([0, buf[5], buf[6], buf[7]]);
        let packets_lost = if lost & 0x0080_0000 != 0 {
            (lost | 0xFF00_0000) as i32
        } else {
            lost as i32
        };

        Ok(Self {
            ssrc: u32::from_be_bytes(buf[0..4].try_into()?),
            fraction_lost: buf[4],
            packets_lost,
            last_sequence: u32::from_be_bytes(buf[8..12].try_into()?),
            jitter: u32::from_be_bytes(buf[12..16].try_into()?),
            last_sr: u32::from_be_bytes(buf[16..20].try_into()?),
            delay_last_sr: u32::from_be_bytes(buf[20..24].try_into()?),
        })
    }

    pub(super) fn encode(&self, bytes: &mut BytesMut) {
        bytes.put_u32(self.ssrc);
        bytes.put_u8(self.fraction_lost);
        bytes.put_uint((self.packets_lost as u32 & 0x00FF_FFFF) as u64, 3);
        bytes.put_u32(self.last_sequence);
        bytes.put_u32(self.jitter);
        bytes.put_u32(self.last_sr);
        bytes.put_u32(self.delay_last_sr);
    }
}

/// SR: Sender Report RTCP Packet.
///
/// ```text
///         0                   1                   2                   3
///         0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// header |V=2|P|    RC   |   PT=SR=200   |             length            |
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |                         SSRC of sender                        |
///        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// sender |              NTP timestamp, most significant word             |
/// info   +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |             NTP timestamp, least significant word             |
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |                         RTP timestamp                         |
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |                     sender's packet count                     |
///        +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///        |                      sender's octet count                     |
///        +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// report |                             ...                               |
/// blocks +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sr {
    /// The synchronization source identifier for the originator of this
    /// SR packet.
    pub ssrc: u32,
    /// Indicates the wallclock time when this report was sent so that
    /// it may be used in combination with timestamps returned in
    /// reception reports from other receivers to measure round-trip
    /// propagation to those receivers.
    pub ntp_time: u64,
    /// Corresponds to the same time as the NTP timestamp, but in the
    /// same units and with the same random offset as the RTP timestamps
    /// in data packets.
    pub rtp_time: u32,
    /// The total number of RTP data packets transmitted by the sender
    /// since starting transmission up until the time this SR packet was
    /// generated.
    pub packet_count: u32,
    /// The total number of payload octets transmitted in RTP data
    /// packets by the sender since starting transmission.
    pub octet_count: u32,
    pub reports: Vec<ReportBlock>,
}

impl Sr {
    pub(super) fn decode(rc: u8, body: &[u8]) -> Result<Self, Error> {
        if body.len() != 4 + SENDER_INFO_SIZE + rc as usize * REPORT_BLOCK_SIZE {
            return Err(Error::LengthMismatch);
        }

        Ok(Self {
            ssrc: u32::from_be_bytes(body[0..4].try_into()?),
            ntp_time: u64::from_be_bytes(body[4..12].try_into()?),
            rtp_time: u32::from_be_bytes(body[12..16].try_into()?),
            packet_count: u32::from_be_bytes(body[16..20].try_into()?),
            octet_count: u32::from_be_bytes(body[20..24].try_into()?),
            reports: decode_blocks(&body[24..], rc)?,
        })
    }

    pub(super) fn encode(&self, bytes: &mut BytesMut) {
        bytes.put_u32(self.ssrc);
        bytes.put_u64(self.ntp_time);
        bytes.put_u32(self.rtp_time);
        bytes.put_u32(self.packet_count);
        bytes.put_u32(self.octet_count);

        for report in &self.reports {
            report.encode(bytes);
        }
    }
}

/// RR: Receiver Report RTCP Packet.
///
/// The format of the receiver report packet is the same as that of the
/// SR packet except that the packet type field contains the constant
/// 201 and the five words of sender information are omitted.  An empty
/// RR packet (RC = 0) is put at the head of a compound RTCP packet when
/// there is no data transmission or reception to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rr {
    /// The synchronization source identifier for the originator of this
    /// RR packet.
    pub ssrc: u32,
    pub reports: Vec<ReportBlock>,
}

impl Rr {
    pub(super) fn decode(rc: u8, body: &[u8]) -> Result<Self, Error> {
        if body.len() != 4 + rc as usize * REPORT_BLOCK_SIZE {
            return Err(Error::LengthMismatch);
        }

        Ok(Self {
            ssrc: u32::from_be_bytes(body[0..4].try_into()?),
            reports: decode_blocks(&body[4..], rc)?,
        })
    }

    pub(super) fn encode(&self, bytes: &mut BytesMut) {
        bytes.put_u32(self.ssrc);

        for report in &self.reports {
            report.encode(bytes);
        }
    }
}

fn decode_blocks(buf: &[u8], rc: u8) -> Result<Vec<ReportBlock>, Error> {
    let mut reports = Vec::with_capacity(rc as usize);
    for i in 0..rc as usize {
        reports.push(ReportBlock::decode(&buf[i * REPORT_BLOCK_SIZE..])?);
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtcp::{Packet, PacketKind};

    #[test]
    fn decode_sender_report() {
        let buffer = [
            0x80, 0xc8, 0x00, 0x06, 0x79, 0x26, 0x69, 0x55, 0xe8, 0xe2, 0xe2, 0x17, 0xd4, 0x2f,
            0x05, 0x91, 0x36, 0x01, 0xb0, 0xaf, 0x34, 0x85, 0x78, 0x5e, 0x2d, 0xbc, 0x2a, 0x98,
        ];

        let (packet, size) = Packet::decode(&buffer).unwrap();
        assert_eq!(size, 28);

        let Packet::Sr(sr) = packet else {
            panic!("expected SR, got {:?}", packet);
        };

        assert_eq!(sr.ssrc, 0x79266955);
        assert_eq!(sr.ntp_time, 0xe8e2e217_d42f0591);
        assert_eq!(sr.rtp_time, 0x3601b0af);
        assert_eq!(sr.packet_count, 0x3485785e);
        assert_eq!(sr.octet_count, 0x2dbc2a98);
        assert!(sr.reports.is_empty());
    }

    #[test]
    fn report_block_negative_lost_roundtrip() {
        let block = ReportBlock {
            ssrc: 7,
            fraction_lost: 0,
            packets_lost: -5,
            last_sequence: 0x0001_0000,
            jitter: 3,
            last_sr: 0,
            delay_last_sr: 0,
        };

        let mut bytes = bytes::BytesMut::new();
        block.encode(&mut bytes);

        assert_eq!(bytes.len(), REPORT_BLOCK_SIZE);
        assert_eq!(ReportBlock::decode(&bytes[..]).unwrap(), block);
    }

    #[test]
    fn sr_with_reports_roundtrip() {
        let sr = Packet::Sr(Sr {
            ssrc: 0x11223344,
            ntp_time: 0xAABBCCDD_EEFF0011,
            rtp_time: 90000,
            packet_count: 1000,
            octet_count: 800_000,
            reports: vec![
                ReportBlock {
                    ssrc: 1,
                    fraction_lost: 51,
                    packets_lost: 10,
                    last_sequence: 150,
                    jitter: 2,
                    last_sr: 0x12345678,
                    delay_last_sr: 0x8000,
                },
                ReportBlock::default(),
            ],
        });

        let mut bytes = bytes::BytesMut::new();
        sr.encode(&mut bytes);

        assert_eq!(bytes.len(), 4 + 24 + 2 * REPORT_BLOCK_SIZE);

        let (decoded, size) = Packet::decode(&bytes[..]).unwrap();
        assert_eq!(size, bytes.len());
        assert_eq!(decoded, sr);
        assert_eq!(decoded.kind(), PacketKind::Sr);
    }

    #[test]
    fn rr_rejects_body_shorter_than_count() {
        // RC = 2 but only one block follows the SSRC.
        let mut bytes = bytes::BytesMut::new();
        Packet::Rr(Rr {
            ssrc: 1,
            reports: vec![ReportBlock::default()],
        })
        .encode(&mut bytes);
        bytes[0] = 0x82;

        assert!(matches!(
            Packet::decode(&bytes[..]),
            Err(Error::LengthMismatch)
        ));
    }

    #[test]
    fn empty_rr_roundtrip() {
        let rr = Packet::Rr(Rr {
            ssrc: 0xDEADBEEF,
            reports: vec![],
        });

        let mut bytes = bytes::BytesMut::new();
        rr.encode(&mut bytes);

        assert_eq!(&bytes[..4], &[0x80, 0xc9, 0x00, 0x01]);

        let (decoded, _) = Packet::decode(&bytes[..]).unwrap();
        assert_eq!(decoded, rr);
    }
}
