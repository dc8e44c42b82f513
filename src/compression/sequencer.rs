//! Sequencer: the write head that puts chunk output into dispatch order.
//!
//! Every chunk carries a sequence number starting at 1. A chunk may write only when its number
//! equals `next_to_write`; everyone else backs off and asks again. There is no queue of
//! waiters, so the order is correct as long as the dispatcher hands out numbers without gaps
//! or duplicates.
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{error, trace};

use crate::error::{PzipError, Result};

/// Outcome of asking for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// It was our turn and the data is now in the sink.
    Written,
    /// Some earlier sequence has not written yet.
    NotYet,
}

/// State guarded by the sequencer lock.
#[derive(Debug)]
pub struct WriteHead<W> {
    next_to_write: u64,
    sink: W,
    bytes_written: u64,
    failure: Option<io::Error>,
}

impl<W: Write> WriteHead<W> {
    /// Sequence number allowed to write next.
    pub fn current(&self) -> u64 {
        self.next_to_write
    }

    /// Append `data` to the sink and hand the turn to the next sequence. Only the holder of
    /// the current sequence may call this.
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if !data.is_empty() {
            self.sink.write_all(data)?;
        }
        self.bytes_written += data.len() as u64;
        self.next_to_write += 1;
        Ok(())
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

#[derive(Debug)]
pub struct Sequencer<W> {
    head: Mutex<WriteHead<W>>,
    /// Readable without the lock so pollers do not compete with writers.
    aborted: AtomicBool,
}

impl<W: Write> Sequencer<W> {
    pub fn new(sink: W) -> Self {
        Self {
            head: Mutex::new(WriteHead {
                next_to_write: 1,
                sink,
                bytes_written: 0,
                failure: None,
            }),
            aborted: AtomicBool::new(false),
        }
    }

    /// Take the write head. Dropping the guard releases it.
    pub fn lock(&self) -> MutexGuard<'_, WriteHead<W>> {
        // A panicking worker cannot leave the counter half updated
        self.head.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> u64 {
        self.lock().current()
    }

    /// Write `data` if `sequence` holds the turn, otherwise report NotYet so the caller can
    /// back off and retry. A failed write aborts the sequencer and is kept for
    /// `take_failure`; from then on every caller gets `Aborted`.
    pub fn try_write(&self, sequence: u64, data: &[u8]) -> Result<Turn> {
        let mut head = self.lock();
        if self.is_aborted() {
            return Err(PzipError::Aborted);
        }
        debug_assert!(sequence >= head.next_to_write, "sequence {} already written", sequence);
        if sequence != head.next_to_write {
            return Ok(Turn::NotYet);
        }
        match head.write(data) {
            Ok(()) => {
                trace!("Sequence {} wrote {} bytes", sequence, data.len());
                Ok(Turn::Written)
            }
            Err(e) => {
                error!("Write for sequence {} failed: {}", sequence, e);
                head.failure = Some(e);
                self.aborted.store(true, Ordering::Release);
                Err(PzipError::Aborted)
            }
        }
    }

    /// Stop all further writes. Waiting workers give up their turn requests.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// The write error that caused an abort, if there was one.
    pub fn take_failure(&self) -> Option<io::Error> {
        self.lock().failure.take()
    }
}

#[cfg(test)]
mod test {
    use super::{Sequencer, Turn};
    use crate::error::PzipError;
    use std::io::{self, Write};
    use std::thread;

    #[test]
    fn turn_order_test() {
        let seq = Sequencer::new(Vec::new());
        assert_eq!(seq.current(), 1);
        assert_eq!(seq.try_write(2, b"b").unwrap(), Turn::NotYet);
        assert_eq!(seq.try_write(1, b"a").unwrap(), Turn::Written);
        assert_eq!(seq.try_write(3, b"c").unwrap(), Turn::NotYet);
        assert_eq!(seq.try_write(2, b"b").unwrap(), Turn::Written);
        assert_eq!(seq.try_write(3, b"").unwrap(), Turn::Written);
        assert_eq!(seq.current(), 4);
        let head = seq.lock();
        assert_eq!(head.bytes_written(), 2);
        assert_eq!(head.sink, b"ab");
    }

    #[test]
    fn threads_write_in_sequence_test() {
        let seq = Sequencer::new(Vec::new());
        thread::scope(|s| {
            // Start the highest sequence first so most threads have to wait
            for n in (1..=16_u64).rev() {
                let seq = &seq;
                s.spawn(move || {
                    let data = [n as u8];
                    while seq.try_write(n, &data).unwrap() == Turn::NotYet {
                        thread::yield_now();
                    }
                });
            }
        });
        assert_eq!(seq.lock().sink, (1..=16_u8).collect::<Vec<_>>());
    }

    struct BrokenPipe;
    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failure_aborts_test() {
        let seq = Sequencer::new(BrokenPipe);
        assert!(matches!(seq.try_write(1, b"x"), Err(PzipError::Aborted)));
        assert!(seq.is_aborted());
        assert!(matches!(seq.try_write(2, b"y"), Err(PzipError::Aborted)));
        let failure = seq.take_failure().unwrap();
        assert_eq!(failure.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn abort_flag_without_lock_test() {
        let seq = Sequencer::new(Vec::new());
        // Holding the write head must not block abort or the check
        let head = seq.lock();
        assert!(!seq.is_aborted());
        seq.abort();
        assert!(seq.is_aborted());
        drop(head);
        assert!(matches!(seq.try_write(1, b"a"), Err(PzipError::Aborted)));
        assert_eq!(seq.lock().bytes_written(), 0);
        assert!(seq.take_failure().is_none());
    }
}
