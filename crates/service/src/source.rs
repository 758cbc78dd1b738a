use codec::rtcp::report::ReportBlock;

/// Sequence numbers live in a 16-bit space; one cycle of that space is
/// shifted into the high bits of the extended sequence number.
pub const RTP_SEQ_MOD: u32 = 1 << 16;

/// Largest forward sequence jump still treated as in-order reception
/// with losses in between.
pub const MAX_DROPOUT: u16 = 3000;

/// How far behind the highest sequence number a packet may arrive and
/// still be treated as a late duplicate rather than a restarted stream.
pub const MAX_MISORDER: u16 = 100;

/// Number of in-order packets required before a source is trusted.
pub const MIN_SEQUENTIAL: u8 = 2;

/// Validation state of a source.
///
/// A source enters `Probation` when first heard and must produce
/// `MIN_SEQUENTIAL` packets with sequential sequence numbers before it
/// is declared `Valid`.  The probation counter prevents a single
/// spurious or spoofed packet from hijacking the loss statistics: a
/// lone stray packet creates a source that never validates and is
/// eventually expired by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// The number of further in-order packets required.
    Probation(u8),
    Valid,
}

/// Per-source reception state.
///
/// One instance exists for each distinct SSRC observed in the session,
/// created on the first packet from that SSRC and mutated by every
/// subsequent one.  It owns everything needed for loss accounting
/// (highest sequence seen, cycle count, restart candidate), the
/// interarrival jitter estimate, and the snapshots of the previous
/// reporting interval.
///
/// The update rules follow RFC 3550 Appendix A.1; the jitter estimate
/// follows section 6.4.1.
#[derive(Debug, Clone)]
pub struct Source {
    ssrc: u32,
    state: SourceState,
    /// Highest sequence number seen.
    max_seq: u16,
    /// Shifted count of sequence number cycles.
    cycles: u32,
    /// Sequence number that established cycle zero.
    base_seq: u32,
    /// Last 'bad' sequence number plus one; a packet matching it proves
    /// the source restarted.
    bad_seq: Option<u32>,
    /// Packets received, duplicates included.
    received: u32,
    /// Packets expected at the last reporting interval.
    expected_prior: u32,
    /// Packets received at the last reporting interval.
    received_prior: u32,
    /// Relative transit time of the previous packet, in timestamp
    /// units.  Absent until the first packet is accepted.
    transit: Option<u32>,
    /// Smoothed interarrival jitter estimate, in timestamp units.
    jitter: i32,
}

impl Source {
    /// State for a source just heard for the first time: the packet is
    /// accepted and probation is armed.
    pub(crate) fn new(ssrc: u32, seq: u16, rtp_timestamp: u32, arrival: u32) -> Self {
        let mut source = Self::with_sequence(ssrc, seq);
        source.update_transit(rtp_timestamp, arrival);
        source
    }

    fn with_sequence(ssrc: u32, seq: u16) -> Self {
        Self {
            ssrc,
            state: SourceState::Probation(MIN_SEQUENTIAL - 1),
            max_seq: seq,
            cycles: 0,
            base_seq: seq as u32,
            bad_seq: None,
            received: 1,
            expected_prior: 0,
            received_prior: 0,
            transit: None,
            jitter: 0,
        }
    }

    pub(crate) fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub(crate) fn state(&self) -> SourceState {
        self.state
    }

    pub(crate) fn is_valid(&self) -> bool {
        matches!(self.state, SourceState::Valid)
    }

    pub(crate) fn received(&self) -> u32 {
        self.received
    }

    /// Extended highest sequence number received: the cycle count in
    /// the high bits, the last sequence number in the low 16.
    pub(crate) fn extended_max(&self) -> u32 {
        self.cycles + self.max_seq as u32
    }

    pub(crate) fn cumulative_lost(&self) -> i32 {
        let expected = self.extended_max().wrapping_sub(self.base_seq).wrapping_add(1);
        (expected as i64 - self.received as i64).clamp(0, 0x007F_FFFF) as i32
    }

    pub(crate) fn jitter_estimate(&self) -> u32 {
        self.jitter as u32
    }

    /// Feed one packet through the validator and, when it is accepted,
    /// the jitter estimator.  Returns the extended sequence number of
    /// an accepted packet.
    pub(crate) fn update(&mut self, seq: u16, rtp_timestamp: u32, arrival: u32) -> Option<u32> {
        let extended = self.update_seq(seq)?;
        self.update_transit(rtp_timestamp, arrival);
        Some(extended)
    }

    fn update_seq(&mut self, seq: u16) -> Option<u32> {
        if let SourceState::Probation(probation) = self.state {
            // The source is not yet trusted: only packets in exact
            // sequence move it toward validity, anything else re-arms
            // the counter.
            return if seq == self.max_seq.wrapping_add(1) {
                self.state = if probation <= 1 {
                    SourceState::Valid
                } else {
                    SourceState::Probation(probation - 1)
                };

                self.max_seq = seq;
                self.received += 1;
                Some(self.cycles + seq as u32)
            } else {
                self.state = SourceState::Probation(MIN_SEQUENTIAL - 1);
                self.max_seq = seq;
                None
            };
        }

        let udelta = seq.wrapping_sub(self.max_seq);
        if udelta < MAX_DROPOUT {
            // In order, with permissible gap.
            if seq < self.max_seq {
                // Sequence number wrapped: count another cycle.
                self.cycles += RTP_SEQ_MOD;
            }

            self.max_seq = seq;
            self.received += 1;
            Some(self.cycles + seq as u32)
        } else if udelta as u32 <= RTP_SEQ_MOD - MAX_MISORDER as u32 {
            // The sequence number made a very large jump.  Two packets
            // in a row at the new position mean the other side restarted
            // without telling us: re-sync and re-prove validity.
            if self.bad_seq == Some(seq as u32) {
                *self = Self::with_sequence(self.ssrc, seq);
                Some(seq as u32)
            } else {
                self.bad_seq = Some((seq as u32 + 1) & (RTP_SEQ_MOD - 1));
                None
            }
        } else {
            // Duplicate or misordered packet from an already-known
            // stream: not accepted, but it still counts toward
            // `received` so the loss fraction reflects it.
            self.received += 1;
            None
        }
    }

    fn update_transit(&mut self, rtp_timestamp: u32, arrival: u32) {
        let transit = arrival.wrapping_sub(rtp_timestamp);

        // No previous transit to difference against on the first
        // accepted packet.
        if let Some(previous) = self.transit.replace(transit) {
            let d = (transit.wrapping_sub(previous) as i32).unsigned_abs() as i64;
            self.jitter += ((d - self.jitter as i64) / 16) as i32;
        }
    }

    /// Produce the reception report block for this source and start a
    /// new reporting interval.
    ///
    /// The fraction lost is computed from the deltas of expected and
    /// received packet counts since the previous report; both snapshots
    /// are reset here, so the caller must serialize report generation
    /// with packet arrival for this source.
    pub(crate) fn build_report(&mut self) -> ReportBlock {
        let extended_max = self.extended_max();
        let expected = extended_max.wrapping_sub(self.base_seq).wrapping_add(1);

        let expected_interval = expected.wrapping_sub(self.expected_prior);
        let received_interval = self.received.wrapping_sub(self.received_prior);
        let lost_interval = expected_interval as i64 - received_interval as i64;

        // Q8 fixed point.  A duplicate-heavy interval can make the lost
        // count negative: clamp to zero rather than report nonsense.
        let fraction_lost = if expected_interval == 0 || lost_interval <= 0 {
            0
        } else {
            ((lost_interval << 8) / expected_interval as i64).min(255) as u8
        };

        self.expected_prior = expected;
        self.received_prior = self.received;

        ReportBlock {
            ssrc: self.ssrc,
            fraction_lost,
            packets_lost: self.cumulative_lost(),
            last_sequence: extended_max,
            jitter: self.jitter as u32,
            last_sr: 0,
            delay_last_sr: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_source(seq: u16) -> Source {
        let mut source = Source::new(1, seq, 0, 0);
        assert!(source.update(seq.wrapping_add(1), 0, 0).is_some());
        assert!(source.is_valid());
        source
    }

    #[test]
    fn bootstrap_enters_probation() {
        let source = Source::new(1, 100, 0, 0);

        assert_eq!(source.state(), SourceState::Probation(MIN_SEQUENTIAL - 1));
        assert_eq!(source.received(), 1);
        assert_eq!(source.extended_max(), 100);
    }

    #[test]
    fn probation_promotes_on_sequential_packet() {
        let mut source = Source::new(1, 100, 0, 0);

        assert_eq!(source.update(101, 0, 0), Some(101));
        assert_eq!(source.state(), SourceState::Valid);
    }

    #[test]
    fn probation_resets_on_gap() {
        let mut source = Source::new(1, 100, 0, 0);

        assert_eq!(source.update(105, 0, 0), None);
        assert_eq!(source.state(), SourceState::Probation(MIN_SEQUENTIAL - 1));

        // The source re-proves itself from the new position.
        assert_eq!(source.update(106, 0, 0), Some(106));
        assert!(source.is_valid());
    }

    #[test]
    fn wraparound_increments_cycles() {
        let mut source = valid_source(65534);

        assert_eq!(source.update(0, 0, 0), Some(65536));
        assert_eq!(source.extended_max(), 65536);
    }

    #[test]
    fn dropout_within_limit_accepted() {
        let mut source = valid_source(100);

        assert_eq!(source.update(101 + 2998, 0, 0), Some(3099));
    }

    #[test]
    fn large_jump_requires_sequential_pair() {
        let mut source = valid_source(99);

        // First packet at the new position is rejected and arms the
        // restart candidate.
        assert_eq!(source.update(4000, 0, 0), None);
        assert!(source.is_valid());

        // An unrelated sequence number re-arms it.
        assert_eq!(source.update(9000, 0, 0), None);

        // A consecutive pair proves the restart: the source re-enters
        // probation at the new base.
        assert_eq!(source.update(9001, 0, 0), Some(9001));
        assert_eq!(source.state(), SourceState::Probation(MIN_SEQUENTIAL - 1));
        assert_eq!(source.received(), 1);
        assert_eq!(source.extended_max(), 9001);
    }

    #[test]
    fn old_duplicate_rejected_but_counted() {
        let mut source = valid_source(200);
        let received = source.received();

        assert_eq!(source.update(195, 0, 0), None);
        assert_eq!(source.received(), received + 1);
        assert_eq!(source.extended_max(), 201);
    }

    #[test]
    fn jitter_converges_per_rfc_gain() {
        let mut source = Source::new(1, 100, 0, 10);
        assert_eq!(source.jitter_estimate(), 0);

        // Transit goes from 10 to 30: jitter += (20 - 0) / 16.
        source.update(101, 0, 30);
        assert_eq!(source.jitter_estimate(), 1);

        // Back to 10: jitter += (20 - 1) / 16.
        source.update(102, 0, 10);
        assert_eq!(source.jitter_estimate(), 2);
    }

    #[test]
    fn jitter_ignores_rejected_packets() {
        let mut source = valid_source(100);
        source.update(102, 0, 500);
        let jitter = source.jitter_estimate();

        // A rejected large jump must not disturb the estimate.
        source.update(50000, 12345, 99999);
        assert_eq!(source.jitter_estimate(), jitter);
    }

    #[test]
    fn fraction_lost_from_interval_deltas() {
        let mut source = valid_source(0);

        // Advance to 149 accepting everything: expected 150, received
        // 150 so far.
        for seq in 2..150 {
            assert!(source.update(seq, 0, 0).is_some());
        }

        let report = source.build_report();
        assert_eq!(report.fraction_lost, 0);
        assert_eq!(report.packets_lost, 0);
        assert_eq!(report.last_sequence, 149);

        // Next interval: 50 expected, 10 of them never arrive.
        for seq in 150..189 {
            assert!(source.update(seq, 0, 0).is_some());
        }
        assert!(source.update(199, 0, 0).is_some());

        let report = source.build_report();
        assert_eq!(report.fraction_lost, ((10 << 8) / 50) as u8);
        assert_eq!(report.packets_lost, 10);
    }

    #[test]
    fn duplicate_interval_clamps_fraction_to_zero() {
        let mut source = valid_source(10);
        source.build_report();

        // Only duplicates arrive this interval: received outruns
        // expected.
        for _ in 0..5 {
            assert_eq!(source.update(5, 0, 0), None);
        }

        let report = source.build_report();
        assert_eq!(report.fraction_lost, 0);
        assert_eq!(report.packets_lost, 0);
    }

    #[test]
    fn report_resets_interval_snapshots() {
        let mut source = valid_source(100);

        source.update(110, 0, 0);
        let first = source.build_report();
        assert!(first.fraction_lost > 0);

        // Nothing new: a second report sees an empty interval.
        let second = source.build_report();
        assert_eq!(second.fraction_lost, 0);
        assert_eq!(second.packets_lost, first.packets_lost);
    }

    #[test]
    fn reset_source_reports_from_new_base() {
        let mut source = valid_source(100);
        source.update(5000, 0, 0);
        source.update(5001, 0, 0);

        // After the resync the old interval snapshots are gone.
        assert_eq!(source.update(5002, 0, 0), Some(5002));
        assert!(source.is_valid());
        assert_eq!(source.cumulative_lost(), 0);
        assert_eq!(source.received(), 2);
    }
}
