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
use tracing::{debug, info, warn};

use super::stream::Stream;
use super::task::Task;
use super::NoteOffBehavior;
use crate::catalog::{OutputLayout, Project};
use crate::control::{ControlMessage, ControlSource};
use crate::samples::PlaybackMode;

/// Read-only view of what control processing needs from the engine.
pub(crate) struct Context<'a> {
    pub(crate) project: &'a Project,
    pub(crate) layout: &'a OutputLayout,
    pub(crate) streams: &'a [Stream],
}

/// Control state. Only ever touched under the engine's control lock.
pub(crate) struct ControlState {
    source: Box<dyn ControlSource>,
    active_program: Option<usize>,
    note_off: NoteOffBehavior,
    /// The newest task derived for each stream since the last flush.
    staged: Box<[Option<Task>]>,
}

impl ControlState {
    pub(crate) fn new(
        source: Box<dyn ControlSource>,
        note_off: NoteOffBehavior,
        streams: usize,
    ) -> Self {
        Self {
            source,
            active_program: None,
            note_off,
            staged: (0..streams).map(|_| None).collect(),
        }
    }

    pub(crate) fn active_program(&self) -> Option<usize> {
        self.active_program
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.source.dropped()
    }

    /// Applies every pending control message, staging at most one derived task per
    /// stream. Returns the number of messages processed.
    pub(crate) fn drain(&mut self, context: &Context<'_>) -> u64 {
        let mut processed = 0;
        while let Some(message) = self.source.pop() {
            processed += 1;
            self.apply(message, context);
        }
        processed
    }

    /// Hands the staged tasks to `emit` in stream order. Tasks a later message
    /// retired are dropped here.
    pub(crate) fn flush(&mut self, streams: &[Stream], emit: &mut impl FnMut(Task)) {
        for task in self.staged.iter_mut().filter_map(Option::take) {
            if task.is_current(streams) {
                emit(task);
            } else {
                debug!(task = ?task, "Staged task retired before it ran");
            }
        }
    }

    fn stage(&mut self, task: Task) {
        let Some(slot) = self.staged.get_mut(task.stream()) else {
            return;
        };
        if let Some(superseded) = slot.replace(task) {
            debug!(task = ?superseded, "Staged task superseded");
        }
    }

    pub(crate) fn apply(&mut self, message: ControlMessage, context: &Context<'_>) {
        debug!(message = ?message, "Control message");
        match message {
            ControlMessage::NoteOn { note, .. } => self.trigger(note, context),
            ControlMessage::NoteOff { note } => {
                if self.note_off == NoteOffBehavior::Stop {
                    if let Some(stream) = context.layout.note_stream(note) {
                        context.streams[stream].bump_generation();
                    }
                }
            }
            ControlMessage::ProgramChange { program } => {
                match context.project.program_by_number(program) {
                    Some((index, _)) => self.activate_program(index, context),
                    None => warn!(program, "No program with this number, ignoring"),
                }
            }
            ControlMessage::Mute { track } => set_muted(track, true, context),
            ControlMessage::Unmute { track } => set_muted(track, false, context),
        }
    }

    /// Starts a one-shot for the note, superseding any task already playing it.
    fn trigger(&mut self, note: u8, context: &Context<'_>) {
        let Some(program) = self.active_program.and_then(|i| context.project.program(i)) else {
            debug!(note, "No active program, ignoring note");
            return;
        };
        let Some(one_shot) = program.one_shot(note) else {
            debug!(note, program = program.name(), "No one-shot for note");
            return;
        };
        let Some(stream) = context.layout.note_stream(note) else {
            return;
        };

        let generation = context.streams[stream].bump_generation();
        self.stage(Task::OneShot {
            note,
            stream,
            generation,
            reader: one_shot.sample.reader(PlaybackMode::OneShot),
        });
    }

    /// Retires the active program's loops and starts the given program's loops from
    /// their first frame. One-shots are left alone.
    pub(crate) fn activate_program(&mut self, index: usize, context: &Context<'_>) {
        let Some(program) = context.project.program(index) else {
            return;
        };

        if let Some(previous) = self.active_program.and_then(|i| context.project.program(i)) {
            for loop_sample in previous.loops() {
                if let Some(stream) = context.layout.track_stream(loop_sample.track) {
                    context.streams[stream].bump_generation();
                }
            }
        }

        for loop_sample in program.loops() {
            let Some(stream) = context.layout.track_stream(loop_sample.track) else {
                continue;
            };
            let generation = context.streams[stream].bump_generation();
            self.stage(Task::Loop {
                track: loop_sample.track,
                stream,
                generation,
                reader: loop_sample.sample.reader(PlaybackMode::Loop),
            });
        }

        info!(
            program = program.name(),
            start_number = program.start_number(),
            loops = program.loops().len(),
            "Program activated"
        );
        self.active_program = Some(index);
    }
}

fn set_muted(track: u8, muted: bool, context: &Context<'_>) {
    match context.layout.track_stream(track) {
        Some(stream) => {
            let stream = &context.streams[stream];
            stream.set_muted(muted);
            debug!(stream = %stream.kind(), muted, "Stream mute changed");
        }
        None => debug!(track, muted, "No stream for track"),
    }
}
