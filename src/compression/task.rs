//! TaskSlot: the reusable work descriptor each worker owns.
//!
//! The slot's `sequence` is the only handshake between the dispatcher and the worker. Zero
//! means idle. The dispatcher fills in the work and then publishes a nonzero sequence; the
//! worker encodes, writes in turn, and publishes zero again. Each direction has exactly one
//! writer, and the work itself is only touched by whichever side currently owns the slot.
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::trace;

use super::pool::PollPolicy;
use super::region::ChunkRange;
use super::sequencer::{Sequencer, Turn};
use crate::bitstream::record::RecordBuffer;
use crate::error::Result;
use crate::tools::rle::{self, RunState};

/// Work handed to a slot by the dispatcher.
#[derive(Debug)]
pub struct Assignment {
    pub sequence: u64,
    /// None for a task that only flushes the carried run.
    pub range: Option<ChunkRange>,
    pub carry: RunState,
    /// The final chunk of a file keeps its trailing run for the next file.
    pub last_of_file: bool,
}

#[derive(Debug, Default)]
struct SlotWork {
    read_range: Option<ChunkRange>,
    run_state: RunState,
    out: RecordBuffer,
    is_last_chunk_of_file: bool,
    /// Sequence of the file-final chunk this slot completed, for the dispatcher to pick up.
    returned_sequence: Option<u64>,
}

#[derive(Debug)]
pub struct TaskSlot {
    id: usize,
    sequence: AtomicU64,
    should_exit: AtomicBool,
    work: Mutex<SlotWork>,
}

impl TaskSlot {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            sequence: AtomicU64::new(0),
            should_exit: AtomicBool::new(false),
            work: Mutex::new(SlotWork::default()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Sequence currently assigned, 0 when idle.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.sequence() == 0
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit.load(Ordering::Acquire)
    }

    pub fn request_exit(&self) {
        self.should_exit.store(true, Ordering::Release);
    }

    fn lock_work(&self) -> MutexGuard<'_, SlotWork> {
        self.work.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Give an idle slot its next chunk. Publishing the sequence is what starts the worker,
    /// so it happens last.
    pub fn assign(&self, task: Assignment) {
        debug_assert!(self.is_idle(), "slot {} assigned while busy", self.id);
        debug_assert!(task.sequence != 0);
        {
            let mut work = self.lock_work();
            work.read_range = task.range;
            work.run_state = task.carry;
            work.is_last_chunk_of_file = task.last_of_file;
            work.returned_sequence = None;
            work.out.clear();
        }
        self.sequence.store(task.sequence, Ordering::Release);
    }

    /// Collect the run state left behind by a completed file-final chunk, along with that
    /// chunk's sequence. Only meaningful once the slot is idle again.
    pub fn take_carry(&self) -> (RunState, Option<u64>) {
        let mut work = self.lock_work();
        (
            std::mem::take(&mut work.run_state),
            work.returned_sequence.take(),
        )
    }

    /// Run the assigned chunk, if any: encode it, wait for its turn at the sequencer, write,
    /// and free the slot. Returns Ok(false) when there was nothing to do.
    pub fn step<W: Write>(&self, sequencer: &Sequencer<W>, poll: PollPolicy) -> Result<bool> {
        let sequence = self.sequence();
        if sequence == 0 {
            return Ok(false);
        }
        let mut guard = self.lock_work();
        let work = &mut *guard;
        let flush_tail = !work.is_last_chunk_of_file;

        // Encode, then drop our handle on the map before waiting for a turn
        let input = work.read_range.take();
        let bytes = input.as_ref().map(|r| r.bytes()).unwrap_or(&[]);
        work.run_state = rle::encode(bytes, work.run_state, &mut work.out, flush_tail);
        trace!(
            "Slot {} encoded sequence {}: {} bytes in, {} records",
            self.id,
            sequence,
            bytes.len(),
            work.out.record_count()
        );
        drop(input);

        let result = loop {
            match sequencer.try_write(sequence, work.out.as_bytes()) {
                Ok(Turn::Written) => break Ok(()),
                Ok(Turn::NotYet) => poll.wait(),
                Err(e) => break Err(e),
            }
        };
        work.out.clear();
        match result {
            Ok(()) if !flush_tail => work.returned_sequence = Some(sequence),
            Ok(()) => {}
            Err(_) => work.run_state = RunState::default(),
        }
        drop(guard);

        self.sequence.store(0, Ordering::Release);
        result.map(|_| true)
    }
}
