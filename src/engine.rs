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

//! The quantum scheduler.
//!
//! The audio interface calls [`QuantumHandle::advance`] once per block. That bumps the
//! gate epoch and unparks the worker pool. The first worker to notice a new epoch
//! drains control input under the control lock, derives tasks from it and re-enters
//! the tasks deferred in earlier quanta. All workers then run tasks from the task
//! queue until it is empty and park again.
//!
//! Each task writes into one stream's port rings. Tasks that hit a full ring are
//! deferred to the next quantum with their reader intact, so playback position is
//! never lost.

mod error;
mod gate;
mod state;
mod stats;
mod stream;
mod task;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, error, info, span, warn, Level};

use crate::catalog::{OutputLayout, Project};
use crate::control::ControlSource;
use crate::interface::thread_priority;
use crate::ports::{self, PortProducer};
use crate::ringbuffer::MpmcQueue;

pub use error::EngineError;
pub use stats::Stats;
pub use task::{Task, TaskResult};

use gate::QuantumGate;
use state::{Context, ControlState};
use stats::Counters;
use stream::Stream;
use task::Scratch;

/// Default task queue capacity.
pub const DEFAULT_TASK_QUEUE_CAPACITY: usize = 16;

/// What a note-off does to a playing one-shot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteOffBehavior {
    /// The one-shot keeps playing until its sample ends.
    #[default]
    PlayToCompletion,
    /// The one-shot is stopped at its next run.
    Stop,
}

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub workers: usize,
    pub task_queue_capacity: usize,
    pub note_off: NoteOffBehavior,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            task_queue_capacity: DEFAULT_TASK_QUEUE_CAPACITY,
            note_off: NoteOffBehavior::default(),
        }
    }
}

/// State shared between the engine, its workers and every quantum handle.
struct Shared {
    project: Arc<Project>,
    layout: OutputLayout,
    streams: Box<[Stream]>,
    gate: QuantumGate,
    /// Epoch whose control input has been drained.
    processed: AtomicU64,
    control: Mutex<ControlState>,
    tasks: MpmcQueue<Task>,
    deferred: MpmcQueue<Task>,
    /// Tasks currently popped by a worker and not yet finished or deferred.
    pending: AtomicUsize,
    interrupted: AtomicBool,
    counters: Counters,
}

/// Decrements the pending count when a worker is done with a task.
struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Shared {
    fn context(&self) -> Context<'_> {
        Context {
            project: &self.project,
            layout: &self.layout,
            streams: &self.streams,
        }
    }

    /// Pushes a task, dropping it if the queue is full.
    fn enqueue(&self, queue: &MpmcQueue<Task>, task: Task, what: &str) {
        if let Err(task) = queue.try_push(task) {
            Counters::bump(&self.counters.starved);
            warn!(task = ?task, queue = what, "Task queue full, dropping task");
        }
    }

    /// Drains control input for `epoch` unless some worker already has.
    fn process_control(&self, epoch: u64) {
        if self.processed.load(Ordering::Acquire) >= epoch {
            return;
        }
        let mut control = self.control.lock();
        let processed = self.processed.load(Ordering::Acquire);
        if processed >= epoch {
            return;
        }

        let messages = control.drain(&self.context());

        // Deferred tasks go first so a full queue can only drop derived ones. Only
        // tasks deferred before this point are re-entered, so tasks deferring
        // concurrently wait for the next quantum.
        for _ in 0..self.deferred.len() {
            let Some(task) = self.deferred.pop() else {
                break;
            };
            if !task.is_current(&self.streams) {
                Counters::bump(&self.counters.retired);
                debug!(task = ?task, "Task retired");
                continue;
            }
            if let Err(task) = self.tasks.try_push(task) {
                self.enqueue(&self.deferred, task, "deferred");
            }
        }

        control.flush(&self.streams, &mut |task| {
            Counters::bump(&self.counters.tasks_derived);
            self.enqueue(&self.tasks, task, "tasks");
        });

        Counters::bump(&self.counters.drains);
        self.counters
            .control_messages
            .fetch_add(messages, Ordering::Relaxed);
        let _ = self
            .processed
            .compare_exchange(processed, epoch, Ordering::AcqRel, Ordering::Acquire);
    }

    fn next_task(&self) -> Option<(Task, PendingGuard<'_>)> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(&self.pending);
        self.tasks.pop().map(|task| (task, guard))
    }

    fn run_tasks(&self, scratch: &mut Scratch) {
        while let Some((mut task, _guard)) = self.next_task() {
            let result = task.run(&self.streams, scratch);
            Counters::bump(&self.counters.tasks_run);
            match result {
                TaskResult::Backpressure | TaskResult::Busy => {
                    Counters::bump(&self.counters.deferred);
                    self.enqueue(&self.deferred, task, "deferred");
                }
                TaskResult::Exhausted => {
                    Counters::bump(&self.counters.exhausted);
                    debug!(task = ?task, "Task exhausted");
                }
                TaskResult::Retired => {
                    Counters::bump(&self.counters.retired);
                    debug!(task = ?task, "Task retired");
                }
            }
        }
    }

    fn run_quantum(&self, epoch: u64, scratch: &mut Scratch) {
        self.process_control(epoch);
        self.run_tasks(scratch);
    }

    fn is_settled(&self) -> bool {
        self.processed.load(Ordering::Acquire) >= self.gate.epoch()
            && self.tasks.is_empty()
            && self.pending.load(Ordering::SeqCst) == 0
    }
}

fn worker_loop(shared: Arc<Shared>, index: usize) {
    let span = span!(Level::INFO, "worker", index);
    let _enter = span.enter();

    if let Some(priority) = thread_priority::worker_thread_priority() {
        thread_priority::configure_thread_priority(priority, false);
    }

    let mut scratch = Scratch::new();
    let mut seen = 0;
    while let Some(epoch) = shared.gate.wait(seen, &shared.interrupted) {
        seen = epoch;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            shared.run_quantum(epoch, &mut scratch)
        }));
        if let Err(payload) = result {
            Counters::bump(&shared.counters.panics);
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(epoch, panic = %message, "Worker quantum panicked");
        }
    }
    debug!("Worker stopped");
}

/// A cheap handle the audio interface uses to signal quanta.
#[derive(Clone)]
pub struct QuantumHandle {
    shared: Arc<Shared>,
}

impl QuantumHandle {
    /// Signals that a quantum has elapsed. Never blocks or allocates.
    #[inline]
    pub fn advance(&self) -> u64 {
        self.shared.gate.release()
    }

    /// True once the current quantum's control input has been drained and no task
    /// is queued or running.
    pub fn is_settled(&self) -> bool {
        self.shared.is_settled()
    }

    /// Waits until the current quantum has settled. Returns false on timeout.
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.shared.is_settled() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_micros(50));
        }
        true
    }
}

/// The sampler engine: streams, control state and the worker pool.
pub struct Engine {
    shared: Arc<Shared>,
    workers: usize,
    handles: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Builds an engine writing into `producers`, which must match the layout's ports.
    /// The first program is activated immediately so its loops play from the first quantum.
    pub fn new(
        project: Arc<Project>,
        layout: OutputLayout,
        producers: Vec<PortProducer>,
        source: Box<dyn ControlSource>,
        config: EngineConfig,
    ) -> Result<Engine, EngineError> {
        let actual = producers.len();
        let writers = ports::group(&layout, producers).ok_or(EngineError::PortCount {
            expected: layout.port_count(),
            actual,
        })?;
        let streams: Box<[Stream]> = layout
            .streams()
            .iter()
            .zip(writers)
            .map(|(stream, writer)| Stream::new(stream.kind, writer))
            .collect();

        // One current task per stream, plus room for as many stale ones.
        let stream_count = streams.len();
        let capacity = config.task_queue_capacity.max(stream_count * 2);
        let shared = Arc::new(Shared {
            project,
            layout,
            streams,
            gate: QuantumGate::new(),
            processed: AtomicU64::new(0),
            control: Mutex::new(ControlState::new(source, config.note_off, stream_count)),
            tasks: MpmcQueue::new(capacity),
            deferred: MpmcQueue::new(capacity),
            pending: AtomicUsize::new(0),
            interrupted: AtomicBool::new(false),
            counters: Counters::default(),
        });

        if !shared.project.is_empty() {
            let mut control = shared.control.lock();
            control.activate_program(0, &shared.context());
            control.flush(&shared.streams, &mut |task| {
                Counters::bump(&shared.counters.tasks_derived);
                shared.enqueue(&shared.tasks, task, "tasks");
            });
        }

        info!(
            programs = shared.project.len(),
            streams = shared.streams.len(),
            ports = shared.layout.port_count(),
            task_queue_capacity = shared.tasks.capacity(),
            workers = config.workers,
            "Engine created"
        );

        Ok(Engine {
            shared,
            workers: config.workers,
            handles: Vec::new(),
        })
    }

    /// Spawns the worker pool. Workers park until the first quantum.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if !self.handles.is_empty() {
            return Err(EngineError::AlreadyStarted);
        }
        if self.workers == 0 {
            return Err(EngineError::NoWorkers);
        }

        for index in 0..self.workers {
            let shared = self.shared.clone();
            let handle = thread::Builder::new()
                .name(format!("mloop-worker-{index}"))
                .spawn(move || worker_loop(shared, index))
                .map_err(|e| {
                    self.shared.interrupted.store(true, Ordering::Release);
                    EngineError::Spawn(e)
                });
            match handle {
                Ok(handle) => self.handles.push(handle),
                Err(e) => {
                    self.join_workers();
                    return Err(e);
                }
            }
        }
        self.shared.gate.register(
            self.handles
                .iter()
                .map(|handle| handle.thread().clone())
                .collect(),
        );

        info!(workers = self.workers, "Engine started");
        Ok(())
    }

    pub fn handle(&self) -> QuantumHandle {
        QuantumHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.shared.is_settled()
    }

    pub fn project(&self) -> &Arc<Project> {
        &self.shared.project
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.shared.layout
    }

    /// Index of the active program.
    pub fn active_program(&self) -> Option<usize> {
        self.shared.control.lock().active_program()
    }

    /// Tasks waiting for the next quantum.
    pub fn deferred_tasks(&self) -> usize {
        self.shared.deferred.len()
    }

    pub fn stats(&self) -> Stats {
        let dropped = self.shared.control.lock().dropped();
        self.shared
            .counters
            .snapshot(self.shared.gate.epoch(), dropped)
    }

    /// Stops and joins every worker. Tasks in flight are dropped.
    pub fn shutdown(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.shared.interrupted.store(true, Ordering::Release);
        self.join_workers();
        info!("Engine stopped");
    }

    fn join_workers(&mut self) {
        self.shared.gate.wake();
        for handle in self.handles.drain(..) {
            handle.thread().unpark();
            if handle.join().is_err() {
                error!("Worker thread panicked outside a quantum");
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::control::{self, ControlMessage};
    use crate::testutil::{program_dir, ramp, write_wav};

    /// Counts how many times the engine drained it: every drain ends with one empty pop.
    struct CountingSource {
        inner: control::ControlReceiver,
        drains: Arc<AtomicUsize>,
    }

    impl ControlSource for CountingSource {
        fn pop(&mut self) -> Option<ControlMessage> {
            let message = self.inner.pop();
            if message.is_none() {
                self.drains.fetch_add(1, Ordering::SeqCst);
            }
            message
        }
    }

    fn project(root: &Path) -> Arc<Project> {
        let program = program_dir(root, "P01");
        write_wav(&program.join("L1.wav"), &[ramp(64, 1.0)], 48000).unwrap();
        write_wav(
            &program.join("S4C-.wav"),
            &[ramp(16, 1.0), ramp(16, 1.0)],
            48000,
        )
        .unwrap();
        Arc::new(Project::load(root, 48000).unwrap())
    }

    fn config(workers: usize) -> EngineConfig {
        EngineConfig {
            workers,
            ..Default::default()
        }
    }

    #[test]
    fn test_port_count_mismatch() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path());
        let layout = OutputLayout::from_project(&project);
        let (producers, _consumers) = ports::create(1, 16);
        let (_sender, receiver) = control::channel(16);

        let result = Engine::new(project, layout, producers, Box::new(receiver), config(1));
        assert!(matches!(
            result,
            Err(EngineError::PortCount {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_start_twice_and_zero_workers() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path());
        let layout = OutputLayout::from_project(&project);

        let (producers, _consumers) = ports::create(layout.port_count(), 16);
        let (_sender, receiver) = control::channel(16);
        let mut engine = Engine::new(
            project.clone(),
            layout.clone(),
            producers,
            Box::new(receiver),
            config(2),
        )
        .unwrap();
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyStarted)));
        engine.shutdown();

        let (producers, _consumers) = ports::create(layout.port_count(), 16);
        let (_sender, receiver) = control::channel(16);
        let mut engine =
            Engine::new(project, layout, producers, Box::new(receiver), config(0)).unwrap();
        assert!(matches!(engine.start(), Err(EngineError::NoWorkers)));
    }

    #[test]
    fn test_first_program_active_on_creation() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path());
        let layout = OutputLayout::from_project(&project);
        let (producers, _consumers) = ports::create(layout.port_count(), 16);
        let (_sender, receiver) = control::channel(16);

        let engine =
            Engine::new(project, layout, producers, Box::new(receiver), config(1)).unwrap();
        assert_eq!(engine.active_program(), Some(0));
        assert_eq!(engine.stats().tasks_derived, 1);
    }

    #[test]
    fn test_two_quanta_before_start_drain_once() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path());
        let layout = OutputLayout::from_project(&project);
        let (producers, _consumers) = ports::create(layout.port_count(), 64);
        let (mut sender, receiver) = control::channel(16);
        let drains = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            inner: receiver,
            drains: drains.clone(),
        };

        let mut engine =
            Engine::new(project, layout, producers, Box::new(source), config(4)).unwrap();
        sender.send(ControlMessage::NoteOn {
            note: 48,
            velocity: 100,
        });

        let handle = engine.handle();
        handle.advance();
        handle.advance();
        assert!(!handle.wait_settled(Duration::from_millis(20)));

        engine.start().unwrap();
        assert!(handle.wait_settled(Duration::from_secs(5)));

        assert_eq!(drains.load(Ordering::SeqCst), 1);
        let stats = engine.stats();
        assert_eq!(stats.quanta, 2);
        assert_eq!(stats.drains, 1);
        assert_eq!(stats.control_messages, 1);
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path());
        let layout = OutputLayout::from_project(&project);
        let (producers, _consumers) = ports::create(layout.port_count(), 16);
        let (_sender, receiver) = control::channel(16);

        let mut engine =
            Engine::new(project, layout, producers, Box::new(receiver), config(3)).unwrap();
        engine.start().unwrap();
        engine.handle().advance();
        engine.shutdown();
        assert!(engine.handles.is_empty());
    }
}
