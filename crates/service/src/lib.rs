//! Receiver-side bookkeeping for an RTP session.
//!
//! [RFC3550]: https://tools.ietf.org/html/rfc3550
//!
//! This crate maintains the per-source state a receiver needs to detect
//! packet loss, reordering, duplicate or restarted sources, and
//! interarrival jitter ([RFC3550] section 6.4 and Appendix A.1), and
//! turns that state into RTCP reception report blocks.
//!
//! The session is synchronous, single-threaded logic with no blocking
//! operations: every entry point is a pure computation over in-memory
//! state and the caller's timestamps.  All mutating operations take
//! `&mut self`, so exclusive ownership per source is the caller's
//! discipline: one writer at a time per SSRC, and report generation
//! serialized with packet arrival for the source being reported, since
//! building a report resets that source's interval snapshots.
//!
//! Socket I/O, RTCP scheduling, SR-reception bookkeeping and source
//! expiry policy all belong to the caller; the session only exposes the
//! state transitions and a removal operation.

pub mod source;

use ahash::{HashMap, HashMapExt};
use codec::rtcp::report::ReportBlock;

use crate::source::{Source, SourceState};

/// Session-level notifications about source lifecycle.
///
/// All methods default to no-ops; implement the ones the application
/// cares about.  This is the hook where BYE handling and inactivity
/// timeouts are attached: the session itself never expires a source.
pub trait Observer {
    /// A packet from an unknown SSRC created a source, on probation.
    #[allow(unused_variables)]
    fn on_source_created(&self, ssrc: u32) {}

    /// A source produced enough in-order packets to be trusted.
    #[allow(unused_variables)]
    fn on_source_validated(&self, ssrc: u32) {}

    /// A source proved it restarted its sequence numbering and was
    /// re-initialized back into probation.
    #[allow(unused_variables)]
    fn on_source_reset(&self, ssrc: u32) {}

    /// A source was removed via [`Session::remove_source`].
    #[allow(unused_variables)]
    fn on_source_removed(&self, ssrc: u32) {}
}

impl Observer for () {}

/// Classification of one arriving RTP packet.
///
/// `Rejected` is not an error: it means the packet must not be counted
/// as validly received yet.  The caller decides what to do with the
/// payload (typically drop it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtpReceived {
    Accepted {
        /// Cycle-extended sequence number of the accepted packet.
        extended_seq: u32,
    },
    Rejected,
}

/// Timing of the last sender report received from a source, supplied by
/// the caller when building a reception report.  Tracking SR arrival is
/// the caller's concern; the session only fills the wire fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastSr {
    /// The middle 32 bits of the NTP timestamp of the last SR.
    pub lsr: u32,
    /// Delay since that SR was received, in 1/65536-second units.
    pub dlsr: u32,
}

/// Accumulated reception counters for one source.
///
/// A read-only snapshot: taking it does not start a new reporting
/// interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceStats {
    pub ssrc: u32,
    /// Whether the source has left probation.
    pub validated: bool,
    /// Packets received from this source, duplicates included.
    pub received: u32,
    /// Extended highest sequence number received.
    pub extended_max_seq: u32,
    /// Cumulative packets lost, clamped to the 24-bit wire range.
    pub cumulative_lost: i32,
    /// Current interarrival jitter estimate, in timestamp units.
    pub jitter: u32,
}

/// Per-source reception state for one RTP session, keyed by SSRC.
///
/// # Test
///
/// ```
/// use rtp_session_service::{RtpReceived, Session};
///
/// let mut session = Session::new();
///
/// // The first packet from an unknown SSRC is accepted and the source
/// // goes on probation; the second in-order packet validates it.
/// assert_eq!(
///     session.on_rtp_received(0x1234, 100, 0, 0),
///     RtpReceived::Accepted { extended_seq: 100 },
/// );
/// assert_eq!(
///     session.on_rtp_received(0x1234, 101, 160, 220),
///     RtpReceived::Accepted { extended_seq: 101 },
/// );
///
/// let report = session.build_reception_report(0x1234, None).unwrap();
///
/// assert_eq!(report.ssrc, 0x1234);
/// assert_eq!(report.last_sequence, 101);
/// assert_eq!(report.packets_lost, 0);
///
/// assert!(session.remove_source(0x1234));
/// assert!(session.build_reception_report(0x1234, None).is_none());
/// ```
pub struct Session<T = ()> {
    sources: HashMap<u32, Source>,
    observer: T,
}

impl Default for Session<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl Session<()> {
    pub fn new() -> Self {
        Self::with_observer(())
    }
}

impl<T> Session<T>
where
    T: Observer,
{
    pub fn with_observer(observer: T) -> Self {
        Self {
            sources: HashMap::with_capacity(16),
            observer,
        }
    }

    /// Number of sources currently tracked, probationary ones included.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The SSRCs of all tracked sources, in no particular order.
    pub fn ssrcs(&self) -> impl Iterator<Item = u32> + '_ {
        self.sources.keys().copied()
    }

    /// Feed one decoded RTP packet into the session.
    ///
    /// `rtp_timestamp` is the packet's media timestamp; `arrival` is
    /// the packet's arrival time sampled by the caller *in the same
    /// clock units*, as required for the jitter estimate.
    pub fn on_rtp_received(
        &mut self,
        ssrc: u32,
        seq: u16,
        rtp_timestamp: u32,
        arrival: u32,
    ) -> RtpReceived {
        let Some(source) = self.sources.get_mut(&ssrc) else {
            log::info!("new source {:08x} at seq {}, on probation", ssrc, seq);

            self.sources
                .insert(ssrc, Source::new(ssrc, seq, rtp_timestamp, arrival));
            self.observer.on_source_created(ssrc);

            return RtpReceived::Accepted {
                extended_seq: seq as u32,
            };
        };

        let before = source.state();
        let accepted = source.update(seq, rtp_timestamp, arrival);

        match (before, source.state()) {
            (SourceState::Probation(_), SourceState::Valid) => {
                log::info!("source {:08x} leaving probation", ssrc);
                self.observer.on_source_validated(ssrc);
            }
            (SourceState::Valid, SourceState::Probation(_)) => {
                log::info!("source {:08x} restarted, resyncing at seq {}", ssrc, seq);
                self.observer.on_source_reset(ssrc);
            }
            _ => {}
        }

        match accepted {
            Some(extended_seq) => RtpReceived::Accepted { extended_seq },
            None => {
                log::debug!("source {:08x} rejected seq {}", ssrc, seq);
                RtpReceived::Rejected
            }
        }
    }

    /// Build the reception report block for one source and start a new
    /// reporting interval for it.
    ///
    /// Returns `None` for an unknown SSRC and for sources still on
    /// probation: a source that has not proven itself is not reported.
    /// `last_sr` carries the LSR/DLSR values from the caller's sender
    /// report bookkeeping; both fields are zero when it is `None`.
    pub fn build_reception_report(
        &mut self,
        ssrc: u32,
        last_sr: Option<LastSr>,
    ) -> Option<ReportBlock> {
        let source = self.sources.get_mut(&ssrc)?;
        if !source.is_valid() {
            return None;
        }

        let mut report = source.build_report();
        if let Some(sr) = last_sr {
            report.last_sr = sr.lsr;
            report.delay_last_sr = sr.dlsr;
        }

        Some(report)
    }

    /// Read the accumulated counters for one source without starting a
    /// new reporting interval.
    pub fn stats(&self, ssrc: u32) -> Option<SourceStats> {
        self.sources.get(&ssrc).map(|source| SourceStats {
            ssrc: source.ssrc(),
            validated: source.is_valid(),
            received: source.received(),
            extended_max_seq: source.extended_max(),
            cumulative_lost: source.cumulative_lost(),
            jitter: source.jitter_estimate(),
        })
    }

    /// Drop all state for one SSRC.
    ///
    /// Called by the session owner on BYE or after an inactivity
    /// timeout.  Returns whether the source existed.
    pub fn remove_source(&mut self, ssrc: u32) -> bool {
        let removed = self.sources.remove(&ssrc).is_some();
        if removed {
            log::info!("source {:08x} removed", ssrc);
            self.observer.on_source_removed(ssrc);
        }

        removed
    }
}
