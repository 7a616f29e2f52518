/*!
The entire configuration surface of the crate: a small, owned, `Default`-implementing struct.
There is no file format and no environment variable parsing -- construction is always explicit.
!*/

/// Configuration for a [`crate::Sequencer`](crate::scheduler::Sequencer).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SequencerConfig {
    /// Audio sample rate in Hz, used to convert `advance(samples)` into song time.
    pub sample_rate: u32,
    /// When the stream reaches its end and the pending buffer has drained, start over instead
    /// of unloading.
    pub loop_playback: bool,
    /// Number of slots in the pending Note Off buffer.
    pub pending_capacity: usize,
    /// When a tempo or time-signature meta-event changes the seconds-per-tick ratio, rescale the
    /// remaining time of already-scheduled pending Note Offs instead of leaving them at their
    /// originally computed absolute times. Off by default, since the source material XMI driver
    /// this format was distilled from does not do this.
    pub rescale_pending_on_tempo_change: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            loop_playback: false,
            pending_capacity: 512,
            rescale_pending_on_tempo_change: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SequencerConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert!(!config.loop_playback);
        assert_eq!(config.pending_capacity, 512);
        assert!(!config.rescale_pending_on_tempo_change);
    }
}
