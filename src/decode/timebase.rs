/*!
Converts ticks to seconds under the current tempo and time signature.
!*/

use log::warn;

/// The AIL `QUANT_TIME` constant, in microseconds: it binds the effective tick *period* to real
/// time (roughly a 60 Hz quantum -- `2 * QUANT_TIME` microseconds per tick) rather than to a
/// file-declared ticks-per-quarter-note, so `tpqn` is derived from it and the current tempo
/// rather than read from the file. At the 120 BPM default this yields `tpqn = 30`.
const QUANT_TIME: f64 = 8333.0;

/// The default tempo assumed before any Set Tempo meta-event has been seen.
const DEFAULT_BPM: f64 = 120.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TimeBase {
    bpm: f64,
    time_sig_num: u8,
    time_sig_den: u8,
    tpqn: u32,
    seconds_per_tick: f64,
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new(DEFAULT_BPM, 4, 4)
    }
}

impl TimeBase {
    pub(crate) fn new(bpm: f64, time_sig_num: u8, time_sig_den: u8) -> Self {
        let tpqn = Self::compute_tpqn(bpm, time_sig_num, time_sig_den);
        let seconds_per_tick = Self::compute_seconds_per_tick(bpm, tpqn);
        Self {
            bpm,
            time_sig_num,
            time_sig_den,
            tpqn,
            seconds_per_tick,
        }
    }

    fn compute_tpqn(bpm: f64, num: u8, den: u8) -> u32 {
        let ratio = num as f64 / den as f64;
        let microseconds_per_quarter = 60_000_000.0 / bpm;
        let tick_period = 2.0 * QUANT_TIME;
        (microseconds_per_quarter / (tick_period * ratio)).round().max(1.0) as u32
    }

    fn compute_seconds_per_tick(bpm: f64, tpqn: u32) -> f64 {
        (60.0 / bpm) / tpqn as f64
    }

    pub(crate) fn seconds_per_tick(&self) -> f64 {
        self.seconds_per_tick
    }

    pub(crate) fn bpm(&self) -> f64 {
        self.bpm
    }

    pub(crate) fn time_signature(&self) -> (u8, u8) {
        (self.time_sig_num, self.time_sig_den)
    }

    pub(crate) fn tpqn(&self) -> u32 {
        self.tpqn
    }

    /// Applies a Set Tempo meta-event: `microseconds_per_quarter_note` to BPM, recomputing
    /// `seconds_per_tick` at the new tempo. `tpqn` is a resolution fixed by the time signature in
    /// effect, not by tempo, so it is left untouched here. Returns the ratio of new to old
    /// `seconds_per_tick`, for callers that rescale pending note-offs.
    pub(crate) fn set_tempo_uspq(&mut self, uspq: u32) -> f64 {
        self.bpm = 60_000_000.0 / uspq as f64;
        self.recompute_seconds_per_tick()
    }

    /// Applies a Time Signature meta-event, recomputing both `tpqn` and `seconds_per_tick`.
    /// Returns the ratio of new to old `seconds_per_tick`.
    ///
    /// `denominator_power` comes straight from the meta-event payload and is not trustworthy --
    /// any value above 7 would overflow a `u8` shift, so it is clamped rather than allowed to
    /// panic the decode path on malformed data.
    pub(crate) fn set_time_signature(&mut self, numerator: u8, denominator_power: u8) -> f64 {
        self.time_sig_num = numerator;
        let power = if denominator_power > 7 {
            warn!(
                "time signature denominator power {} out of range, clamping to 7",
                denominator_power
            );
            7
        } else {
            denominator_power
        };
        self.time_sig_den = 1u8 << power;
        self.tpqn = Self::compute_tpqn(self.bpm, self.time_sig_num, self.time_sig_den);
        self.recompute_seconds_per_tick()
    }

    fn recompute_seconds_per_tick(&mut self) -> f64 {
        let old_sec_per_tick = self.seconds_per_tick;
        self.seconds_per_tick = Self::compute_seconds_per_tick(self.bpm, self.tpqn);
        self.seconds_per_tick / old_sec_per_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timebase_matches_120_bpm_4_4() {
        let tb = TimeBase::default();
        assert_eq!(tb.bpm(), 120.0);
        assert_eq!(tb.time_signature(), (4, 4));
        assert_eq!(tb.tpqn(), 30);
        let expected_spt = (60.0 / 120.0) / 30.0;
        assert!((tb.seconds_per_tick() - expected_spt).abs() < 1e-12);
    }

    #[test]
    fn tempo_change_idempotence() {
        let mut tb = TimeBase::default();
        tb.set_tempo_uspq(500_000);
        let first = tb.seconds_per_tick();
        tb.set_tempo_uspq(500_000);
        let second = tb.seconds_per_tick();
        assert_eq!(first, second);
    }

    #[test]
    fn tempo_change_halves_rate_when_uspq_doubles() {
        let mut tb = TimeBase::default();
        let ratio = tb.set_tempo_uspq(1_000_000);
        assert!((ratio - 2.0).abs() < 1e-9);
        assert!((tb.bpm() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn time_signature_changes_denominator() {
        let mut tb = TimeBase::default();
        tb.set_time_signature(3, 3); // 3/8
        assert_eq!(tb.time_signature(), (3, 8));
    }
}
