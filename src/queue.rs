/*!
The producer side of the cross-thread command channel: a bounded, lock-free SPSC ring buffer.
The `Sequencer` owns the producer half and enqueues from the thread that calls `advance`; the
consumer half is handed to whatever drains commands toward the MIDI output device, on its own
thread.
!*/

use crate::core::XmiCommand;
use rtrb::RingBuffer;

pub(crate) type CommandProducer = rtrb::Producer<XmiCommand>;

/// The consumer half of a [`crate::Sequencer`](crate::scheduler::Sequencer)'s command queue.
pub type CommandConsumer = rtrb::Consumer<XmiCommand>;

pub(crate) fn new_command_queue(capacity: usize) -> (CommandProducer, CommandConsumer) {
    RingBuffer::new(capacity)
}
