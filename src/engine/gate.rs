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
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread::{self, Thread};
use std::time::Duration;

/// Upper bound on how long a parked worker goes without re-checking the epoch.
const PARK_TIMEOUT: Duration = Duration::from_millis(5);

/// Releases parked workers once per quantum.
///
/// The epoch counts quanta. Releasing bumps it and unparks every registered worker;
/// it never blocks and never allocates, so the audio callback can call it directly.
pub(crate) struct QuantumGate {
    epoch: AtomicU64,
    workers: OnceLock<Box<[Thread]>>,
}

impl QuantumGate {
    pub(crate) fn new() -> Self {
        Self {
            epoch: AtomicU64::new(0),
            workers: OnceLock::new(),
        }
    }

    /// Registers the worker threads to wake. Only the first registration takes effect.
    pub(crate) fn register(&self, workers: Box<[Thread]>) {
        let _ = self.workers.set(workers);
    }

    #[inline]
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Starts a new quantum and returns its epoch.
    #[inline]
    pub(crate) fn release(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.wake();
        epoch
    }

    /// Unparks every registered worker without starting a quantum.
    pub(crate) fn wake(&self) {
        if let Some(workers) = self.workers.get() {
            for worker in workers.iter() {
                worker.unpark();
            }
        }
    }

    /// Parks the calling worker until the epoch moves past `seen`. Returns the new
    /// epoch, or None once `interrupted` is set.
    pub(crate) fn wait(&self, seen: u64, interrupted: &AtomicBool) -> Option<u64> {
        loop {
            if interrupted.load(Ordering::Acquire) {
                return None;
            }
            let epoch = self.epoch();
            if epoch > seen {
                return Some(epoch);
            }
            thread::park_timeout(PARK_TIMEOUT);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_wait_returns_latest_epoch() {
        let gate = QuantumGate::new();
        let interrupted = AtomicBool::new(false);
        gate.release();
        gate.release();
        assert_eq!(gate.wait(0, &interrupted), Some(2));
    }

    #[test]
    fn test_release_wakes_parked_worker() {
        let gate = Arc::new(QuantumGate::new());
        let interrupted = Arc::new(AtomicBool::new(false));

        let worker = {
            let gate = gate.clone();
            let interrupted = interrupted.clone();
            thread::spawn(move || gate.wait(0, &interrupted))
        };
        gate.register(vec![worker.thread().clone()].into_boxed_slice());
        gate.release();

        assert_eq!(worker.join().unwrap(), Some(1));
    }

    #[test]
    fn test_interrupt_stops_waiting() {
        let gate = Arc::new(QuantumGate::new());
        let interrupted = Arc::new(AtomicBool::new(false));

        let worker = {
            let gate = gate.clone();
            let interrupted = interrupted.clone();
            thread::spawn(move || gate.wait(0, &interrupted))
        };
        interrupted.store(true, Ordering::Release);
        gate.wake();

        assert_eq!(worker.join().unwrap(), None);
    }
}
