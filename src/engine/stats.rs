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
use std::sync::atomic::{AtomicU64, Ordering};

/// Engine counters. Updated with relaxed atomics from any thread.
#[derive(Default)]
pub(crate) struct Counters {
    pub(crate) drains: AtomicU64,
    pub(crate) control_messages: AtomicU64,
    pub(crate) tasks_derived: AtomicU64,
    pub(crate) tasks_run: AtomicU64,
    pub(crate) exhausted: AtomicU64,
    pub(crate) retired: AtomicU64,
    pub(crate) deferred: AtomicU64,
    pub(crate) starved: AtomicU64,
    pub(crate) panics: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, quanta: u64, control_dropped: u64) -> Stats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        Stats {
            quanta,
            drains: load(&self.drains),
            control_messages: load(&self.control_messages),
            control_dropped,
            tasks_derived: load(&self.tasks_derived),
            tasks_run: load(&self.tasks_run),
            exhausted: load(&self.exhausted),
            retired: load(&self.retired),
            deferred: load(&self.deferred),
            starved: load(&self.starved),
            panics: load(&self.panics),
        }
    }
}

/// A point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Quanta signalled by the interface.
    pub quanta: u64,
    /// Times the control input was drained. At most one per quantum.
    pub drains: u64,
    pub control_messages: u64,
    /// Messages the control source could not accept.
    pub control_dropped: u64,
    pub tasks_derived: u64,
    pub tasks_run: u64,
    pub exhausted: u64,
    pub retired: u64,
    pub deferred: u64,
    /// Tasks dropped because a task queue was full.
    pub starved: u64,
    /// Panics caught in worker quanta.
    pub panics: u64,
}
