/*!
A fixed-capacity, allocation-free collection of scheduled Note Off events, scanned linearly on
every `advance`. The rationale for linear scan over a heap is bounded worst-case work per call
(capacity is small, typically 512), zero allocation after construction, and safety for a
high-priority producer thread.
!*/

use crate::core::{Channel, XmiCommand, U7};
use log::warn;

#[derive(Clone, Copy, Debug)]
struct Slot {
    due_time: f64,
    channel: u8,
    key: u8,
    active: bool,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            due_time: 0.0,
            channel: 0,
            key: 0,
            active: false,
        }
    }
}

/// Fixed-capacity buffer of pending Note Off events.
pub(crate) struct PendingNoteOffs {
    slots: Vec<Slot>,
}

impl PendingNoteOffs {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::default(); capacity],
        }
    }

    /// Schedules a Note Off at `due_time` seconds. Returns `false` and logs a warning if every
    /// slot is occupied -- the note will not be turned off automatically until a subsequent
    /// All-Notes-Off, which is an accepted degraded mode rather than a crash.
    pub(crate) fn add(&mut self, due_time: f64, channel: Channel, key: U7) -> bool {
        match self.slots.iter_mut().find(|s| !s.active) {
            Some(slot) => {
                *slot = Slot {
                    due_time,
                    channel: channel.get(),
                    key: key.get(),
                    active: true,
                };
                true
            }
            None => {
                warn!(
                    "pending note-off buffer full (capacity {}), dropping ch={} key={}",
                    self.slots.len(),
                    channel.get(),
                    key.get()
                );
                false
            }
        }
    }

    /// Emits a `NoteOff` command for every active slot whose `due_time` has passed, freeing it.
    pub(crate) fn drain_due(&mut self, now: f64, sink: &mut Vec<XmiCommand>) {
        for slot in self.slots.iter_mut() {
            if slot.active && slot.due_time <= now {
                sink.push(XmiCommand::NoteOff {
                    channel: Channel::new(slot.channel),
                    key: U7::new(slot.key),
                });
                slot.active = false;
            }
        }
    }

    /// Rescales the remaining time of every active slot by `ratio`, used when a tempo change and
    /// `SequencerConfig::rescale_pending_on_tempo_change` together call for it.
    pub(crate) fn adjust(&mut self, now: f64, ratio: f64) {
        for slot in self.slots.iter_mut() {
            if slot.active {
                let remaining = slot.due_time - now;
                slot.due_time = now + remaining * ratio;
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.active = false;
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }
}
