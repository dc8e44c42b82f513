use std::io::Write;
use std::mem;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, trace};

use super::pool::{self, PollPolicy};
use super::region::{ChunkRange, InputRegion};
use super::sequencer::Sequencer;
use super::task::{Assignment, TaskSlot};
use crate::error::{PzipError, Result};
use crate::tools::cli::PzOpts;
use crate::tools::rle::RunState;
use crate::tools::splitter::Chunks;

/// Totals for one compression run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub files: usize,
    pub chunks: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// Hands chunks of each file to idle slots, numbers them, and threads the trailing run of one
/// file into the first chunk of the next. Runs slot 0 itself between sweeps.
struct Dispatcher<'a, W> {
    slots: &'a [TaskSlot],
    sequencer: &'a Sequencer<W>,
    chunk_size: usize,
    poll: PollPolicy,
    /// Last sequence number handed out; the first chunk gets 1.
    next_sequence: u64,
    /// Trailing run of the previous file, waiting for the next file's first chunk.
    pending: RunState,
    stats: RunStats,
}

impl<'a, W: Write> Dispatcher<'a, W> {
    fn new(slots: &'a [TaskSlot], sequencer: &'a Sequencer<W>, opts: &PzOpts) -> Self {
        Self {
            slots,
            sequencer,
            chunk_size: opts.chunk_size.max(1),
            poll: opts.poll,
            next_sequence: 0,
            pending: RunState::default(),
            stats: RunStats::default(),
        }
    }

    fn run(&mut self, files: &[PathBuf]) -> Result<()> {
        for path in files {
            self.process_file(path)?;
        }
        self.flush_pending()?;
        self.check_aborted()
    }

    fn check_aborted(&self) -> Result<()> {
        if self.sequencer.is_aborted() {
            return Err(PzipError::Aborted);
        }
        Ok(())
    }

    /// Run slot 0 once. If it had nothing to do, back off before the next poll.
    fn drive_slot_zero(&self) -> Result<()> {
        if !self.slots[0].step(self.sequencer, self.poll)? {
            self.poll.wait();
        }
        Ok(())
    }

    fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }

    fn process_file(&mut self, path: &Path) -> Result<()> {
        // Open
        let region = InputRegion::map(path)?;
        info!("Compressing {} ({} bytes)", path.display(), region.len());
        self.stats.files += 1;
        self.stats.bytes_in += region.len() as u64;

        // Dispatching. Only the first chunk of the file picks up the carried run.
        let mut carry = Some(mem::take(&mut self.pending));
        let mut final_task: Option<(&TaskSlot, u64)> = None;
        let mut chunks = Chunks::new(region.bytes(), self.chunk_size);
        while !chunks.is_exhausted() {
            for slot in self.slots {
                if !slot.is_idle() {
                    continue;
                }
                let range = match chunks.next() {
                    Some(r) => r,
                    None => break,
                };
                let last_of_file = range.end == region.len();
                let sequence = self.next_sequence();
                trace!(
                    "Sequence {} -> slot {}: bytes {:?}{}",
                    sequence,
                    slot.id(),
                    range,
                    if last_of_file { " (last)" } else { "" }
                );
                let chunk = ChunkRange::new(&region, range);
                debug_assert!(chunk.is_some(), "splitter left the region");
                slot.assign(Assignment {
                    sequence,
                    range: chunk,
                    carry: carry.take().unwrap_or_default(),
                    last_of_file,
                });
                self.stats.chunks += 1;
                if last_of_file {
                    final_task = Some((slot, sequence));
                }
            }
            self.check_aborted()?;
            self.drive_slot_zero()?;
        }

        // Draining: wait for the file-final chunk and collect the run it kept back
        match final_task {
            Some((slot, sequence)) => {
                while !slot.is_idle() {
                    self.check_aborted()?;
                    self.drive_slot_zero()?;
                }
                // A slot that lost its write also ends up idle
                self.check_aborted()?;
                let (state, returned) = slot.take_carry();
                debug_assert_eq!(returned, Some(sequence));
                debug!(
                    "{} ended at sequence {:?}, carrying {:?}",
                    path.display(),
                    returned,
                    state
                );
                self.pending = state;
            }
            // An empty file passes the carry straight through
            None => self.pending = carry.unwrap_or_default(),
        }

        // Closed: our handle on the map goes here, slots already let go of theirs
        drop(chunks);
        drop(region);
        Ok(())
    }

    /// Write the run still open at the true end of input as one last sequenced task.
    fn flush_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let sequence = self.next_sequence();
        debug!("Flushing final carry {:?} as sequence {}", self.pending, sequence);
        let slot = &self.slots[0];
        slot.assign(Assignment {
            sequence,
            range: None,
            carry: mem::take(&mut self.pending),
            last_of_file: false,
        });
        while !slot.is_idle() {
            self.drive_slot_zero()?;
        }
        Ok(())
    }
}

/// Compress every file in `opts.files`, in order, into `sink` using `opts.threads` slots.
/// The output is a single record stream, as if the files had been concatenated first.
pub fn compress<W: Write + Send>(opts: &PzOpts, sink: &mut W) -> Result<RunStats> {
    let now = Instant::now();
    let slots: Vec<TaskSlot> = (0..opts.threads.max(1)).map(TaskSlot::new).collect();
    let sequencer = Sequencer::new(sink);

    let result = pool::with_workers(&slots, &sequencer, opts.poll, || {
        let mut dispatcher = Dispatcher::new(&slots, &sequencer, opts);
        let outcome = dispatcher.run(&opts.files);
        if outcome.is_err() {
            // Release any worker still waiting on a turn that will never come
            sequencer.abort();
        }
        outcome.map(|_| dispatcher.stats)
    });

    let mut stats = match result {
        Ok(stats) => stats,
        Err(PzipError::Aborted) => {
            return Err(sequencer
                .take_failure()
                .map(PzipError::Io)
                .unwrap_or(PzipError::Aborted))
        }
        Err(e) => return Err(e),
    };
    let mut head = sequencer.lock();
    head.flush()?;
    stats.bytes_out = head.bytes_written();
    info!(
        "Compressed {} file(s), {} chunk(s): {} bytes in, {} bytes out, in {:?}",
        stats.files,
        stats.chunks,
        stats.bytes_in,
        stats.bytes_out,
        now.elapsed()
    );
    Ok(stats)
}
