//! Worker pool lifecycle.
//!
//! N slots means N-1 background threads plus the calling thread, which runs slot 0 itself in
//! between dispatch sweeps. The threads live for the whole run and are reused for every chunk
//! of every file. Waiting is a poll loop; `PollPolicy` decides what a thread does between polls.
use std::io::Write;
use std::panic;
use std::thread;
use std::time::Duration;

use log::{debug, error};

use super::sequencer::Sequencer;
use super::task::TaskSlot;
use crate::error::{PzipError, Result};

/// What a waiting thread does between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPolicy {
    /// Busy spin with a processor hint.
    Spin,
    /// Give the rest of the time slice away.
    Yield,
    /// Sleep for a fixed interval.
    Sleep(Duration),
}

impl PollPolicy {
    /// 0 yields; anything else sleeps that many microseconds.
    pub fn from_micros(us: u64) -> Self {
        if us == 0 {
            PollPolicy::Yield
        } else {
            PollPolicy::Sleep(Duration::from_micros(us))
        }
    }

    pub fn wait(self) {
        match self {
            PollPolicy::Spin => std::hint::spin_loop(),
            PollPolicy::Yield => thread::yield_now(),
            PollPolicy::Sleep(d) => thread::sleep(d),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy::Yield
    }
}

/// Background worker: process whatever the slot is given until told to exit with nothing
/// pending. Exit is only ever observed between chunks.
fn worker_loop<W: Write>(slot: &TaskSlot, sequencer: &Sequencer<W>, poll: PollPolicy) {
    debug!("Worker {} started", slot.id());
    loop {
        match slot.step(sequencer, poll) {
            Ok(true) => continue,
            Ok(false) => {
                // Check exit before idle so an assignment made before the exit request is seen
                if slot.should_exit() && slot.is_idle() {
                    break;
                }
                poll.wait();
            }
            // The dispatcher reports the failure, the slot is already free
            Err(e) => debug!("Worker {} dropped its chunk: {}", slot.id(), e),
        }
    }
    debug!("Worker {} exiting", slot.id());
}

/// Start a background thread for every slot but the first, run `body` on this thread, then
/// shut the workers down and join them. `body` is expected to drive slot 0 itself.
pub fn with_workers<W, T, F>(
    slots: &[TaskSlot],
    sequencer: &Sequencer<W>,
    poll: PollPolicy,
    body: F,
) -> Result<T>
where
    W: Write + Send,
    F: FnOnce() -> Result<T>,
{
    thread::scope(|s| {
        let mut handles = Vec::with_capacity(slots.len().saturating_sub(1));
        let mut spawn_error = None;
        for slot in slots.iter().skip(1) {
            let spawned = thread::Builder::new()
                .name(format!("pzip-worker-{}", slot.id()))
                .spawn_scoped(s, move || worker_loop(slot, sequencer, poll));
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => {
                    error!("Could not start worker {}: {}", slot.id(), e);
                    spawn_error = Some(e);
                    break;
                }
            }
        }

        let result = match spawn_error {
            Some(e) => Err(PzipError::Io(e)),
            None => body(),
        };

        // Shutdown: everyone exits once idle, slot 0 gets one last pass for a pending write
        for slot in slots {
            slot.request_exit();
        }
        if let Some(first) = slots.first() {
            if let Err(e) = first.step(sequencer, poll) {
                debug!("Final pass on slot 0 dropped its chunk: {}", e);
            }
        }
        debug!("Joining {} worker(s)", handles.len());
        for h in handles {
            if let Err(payload) = h.join() {
                panic::resume_unwind(payload);
            }
        }
        result
    })
}
