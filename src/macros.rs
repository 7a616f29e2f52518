/*!
The `macros` module provides macros for internal use.
!*/

/// Pushes a command onto the producer half of the command queue. If the queue is full the
/// command is dropped and a warning is logged instead of blocking or panicking -- the producer
/// side must never stall the thread that calls `advance`.
macro_rules! enqueue {
    ($queue:expr, $cmd:expr) => {{
        let cmd = $cmd;
        if $queue.push(cmd).is_err() {
            log::warn!("command queue full, dropping {:?}", cmd);
        }
    }};
}
