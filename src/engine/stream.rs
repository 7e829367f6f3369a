// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::catalog::StreamKind;
use crate::ports::StreamWriter;
use crate::ringbuffer::MpmcQueue;

/// Engine-side state of one output stream.
pub(crate) struct Stream {
    kind: StreamKind,
    /// Holds the writer while no task is writing. A task takes it for the duration of
    /// one run so that at most one task writes the stream's ports at a time.
    baton: MpmcQueue<StreamWriter>,
    generation: AtomicU64,
    muted: AtomicBool,
}

impl Stream {
    pub(crate) fn new(kind: StreamKind, writer: StreamWriter) -> Self {
        let baton = MpmcQueue::new(1);
        baton.push(writer);
        Self {
            kind,
            baton,
            generation: AtomicU64::new(0),
            muted: AtomicBool::new(false),
        }
    }

    pub(crate) fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Takes the writer, or None if another task holds it. The writer goes back to
    /// the stream when the guard drops, including while unwinding.
    #[inline]
    pub(crate) fn take_writer(&self) -> Option<WriterGuard<'_>> {
        self.baton
            .pop()
            .map(|writer| WriterGuard { stream: self, writer })
    }

    #[inline]
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Supersedes every task created for this stream so far and returns the new generation.
    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    pub(crate) fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub(crate) fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }
}

/// Exclusive access to a stream's writer.
pub(crate) struct WriterGuard<'a> {
    stream: &'a Stream,
    writer: StreamWriter,
}

impl Deref for WriterGuard<'_> {
    type Target = StreamWriter;

    fn deref(&self) -> &StreamWriter {
        &self.writer
    }
}

impl DerefMut for WriterGuard<'_> {
    fn deref_mut(&mut self) -> &mut StreamWriter {
        &mut self.writer
    }
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        // An empty writer holds no ports and does not allocate.
        let writer = mem::replace(&mut self.writer, StreamWriter::new(Vec::new()));
        // Capacity is one and only the holder returns it, so this cannot fail.
        let _ = self.stream.baton.try_push(writer);
    }
}
