// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An owned post-mortem trace log, in the spirit of the teacher's
//! `ringbuf!`/`ringbuf_entry!` macros: a fixed-capacity ring of entries
//! that collapses immediately-repeated entries into a count rather than
//! growing. Unlike `ringbuf!`, this is a plain field on the dispatcher,
//! not a static — the same "own it, don't make it a global" redesign
//! applied to the upload cursor applies here too.

/// One traced event. Logged at `log::trace!`/`debug!` as it happens and
/// also recorded here so the last [`TraceLog::CAPACITY`] events are
/// inspectable without a live logger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trace {
    Dispatch { group: u16, id: u8 },
    Dropped,
    UploadStart { img_num: u8, img_size: u32 },
    UploadChunk { off: u32, len: u16 },
    UploadDuplicate { off: u32 },
    UploadComplete { img_num: u8 },
    Erase { off: u32, len: u32 },
    SetPending { img_num: u8, permanent: bool },
    Reset,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    trace: Trace,
    count: u32,
}

/// A fixed-capacity ring of [`Trace`] entries with repeat collapsing.
pub struct TraceLog<const N: usize> {
    buffer: [Option<Entry>; N],
    next: usize,
}

impl<const N: usize> Default for TraceLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TraceLog<N> {
    pub const fn new() -> Self {
        Self {
            buffer: [None; N],
            next: 0,
        }
    }

    /// Records `trace`. If it's identical to the most recently recorded
    /// entry, bumps that entry's count instead of consuming a new slot.
    pub fn record(&mut self, trace: Trace) {
        if self.next > 0 {
            if let Some(last) = &mut self.buffer[self.next - 1] {
                if last.trace == trace {
                    last.count = last.count.saturating_add(1);
                    return;
                }
            }
        }
        let slot = self.next % N;
        self.buffer[slot] = Some(Entry { trace, count: 1 });
        self.next = slot + 1;
    }

    /// Iterates recorded entries oldest-first, as `(trace, repeat count)`.
    pub fn iter(&self) -> impl Iterator<Item = (Trace, u32)> + '_ {
        let start = if self.next < N { 0 } else { self.next };
        (0..N)
            .map(move |i| self.buffer[(start + i) % N])
            .flatten()
            .map(|e| (e.trace, e.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_immediate_repeats() {
        let mut log: TraceLog<4> = TraceLog::new();
        log.record(Trace::Dropped);
        log.record(Trace::Dropped);
        log.record(Trace::Dropped);
        let entries: std::vec::Vec<(Trace, u32)> = log.iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], (Trace::Dropped, 3));
    }

    #[test]
    fn wraps_when_full() {
        let mut log: TraceLog<2> = TraceLog::new();
        log.record(Trace::Reset);
        log.record(Trace::Dropped);
        log.record(Trace::UploadComplete { img_num: 1 });
        let entries: std::vec::Vec<(Trace, u32)> = log.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, Trace::Dropped);
        assert_eq!(entries[1].0, Trace::UploadComplete { img_num: 1 });
    }
}
