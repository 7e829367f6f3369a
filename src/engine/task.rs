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

//! Playback tasks.
//!
//! A task moves frames from one sample reader into one stream's ports. It runs until
//! the ports are full or the reader is exhausted and never creates other tasks.

use std::fmt;

use super::stream::Stream;
use crate::ports::StreamWriter;
use crate::samples::SampleReader;

/// Frames copied per step. Bounds the per-worker scratch buffers.
pub(crate) const SCRATCH_FRAMES: usize = 1024;

/// Channels held by the scratch buffers; every stream has one or two.
const SCRATCH_CHANNELS: usize = 2;

/// Per-worker buffers that frames pass through on their way from reader to ports.
pub(crate) struct Scratch {
    channels: [Vec<f32>; SCRATCH_CHANNELS],
}

impl Scratch {
    pub(crate) fn new() -> Self {
        Self {
            channels: [vec![0.0; SCRATCH_FRAMES], vec![0.0; SCRATCH_FRAMES]],
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    /// The sample has been fully written. The task is discarded.
    Exhausted,
    /// The stream's ports are full. The task is deferred with its reader intact.
    Backpressure,
    /// Another task holds the stream's writer. The task is deferred.
    Busy,
    /// A newer task owns the stream. The task is discarded.
    Retired,
}

/// A unit of playback work bound to one stream.
pub enum Task {
    /// A loop on a track. Runs until retired; mute is read on every run.
    Loop {
        track: u8,
        stream: usize,
        generation: u64,
        reader: SampleReader,
    },
    /// A one-shot for a note. Runs until its sample is exhausted or it is retired.
    OneShot {
        note: u8,
        stream: usize,
        generation: u64,
        reader: SampleReader,
    },
}

impl Task {
    pub fn stream(&self) -> usize {
        match self {
            Task::Loop { stream, .. } | Task::OneShot { stream, .. } => *stream,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Task::Loop { generation, .. } | Task::OneShot { generation, .. } => *generation,
        }
    }

    /// Writes as many frames as the stream's ports accept.
    pub(crate) fn run(&mut self, streams: &[Stream], scratch: &mut Scratch) -> TaskResult {
        if !self.is_current(streams) {
            return TaskResult::Retired;
        }
        let stream = &streams[self.stream()];
        let Some(mut writer) = stream.take_writer() else {
            return TaskResult::Busy;
        };

        match self {
            Task::Loop { reader, .. } => pump(reader, &mut writer, scratch, stream.is_muted()),
            Task::OneShot { reader, .. } => pump(reader, &mut writer, scratch, false),
        }
    }

    /// False once a newer task owns the stream.
    pub(crate) fn is_current(&self, streams: &[Stream]) -> bool {
        streams
            .get(self.stream())
            .is_some_and(|stream| stream.generation() == self.generation())
    }
}

/// Moves frames from the reader to the writer until the writer is full or the reader
/// has nothing more to give. A silenced pump still advances the reader.
fn pump(
    reader: &mut SampleReader,
    writer: &mut StreamWriter,
    scratch: &mut Scratch,
    silenced: bool,
) -> TaskResult {
    loop {
        if reader.is_finished() {
            return TaskResult::Exhausted;
        }
        let vacant = writer.vacant();
        if vacant == 0 {
            return TaskResult::Backpressure;
        }

        let frames = reader.read(&mut scratch.channels, vacant.min(SCRATCH_FRAMES));
        if frames == 0 {
            return TaskResult::Exhausted;
        }
        if silenced {
            writer.write_silence(frames);
        } else {
            let channels = reader.channels().min(SCRATCH_CHANNELS);
            writer.write(&scratch.channels[..channels], frames);
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Loop {
                track,
                stream,
                generation,
                reader,
            } => f
                .debug_struct("Loop")
                .field("track", track)
                .field("stream", stream)
                .field("generation", generation)
                .field("position", &reader.position())
                .finish(),
            Task::OneShot {
                note,
                stream,
                generation,
                reader,
            } => f
                .debug_struct("OneShot")
                .field("note", note)
                .field("stream", stream)
                .field("generation", generation)
                .field("position", &reader.position())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::catalog::StreamKind;
    use crate::ports;
    use crate::samples::{PlaybackMode, Sample, SampleSpec};
    use crate::testutil::ramp;

    fn sample(channels: u16, frames: usize) -> Sample {
        let data: Vec<f32> = ramp(frames * usize::from(channels), 1.0);
        Sample::from_interleaved(
            Path::new("memory"),
            SampleSpec {
                sample_rate: 48000,
                channels,
            },
            &data,
        )
    }

    fn stream(
        kind: StreamKind,
        channels: usize,
        capacity: usize,
    ) -> (Stream, Vec<ports::PortConsumer>) {
        let (producers, consumers) = ports::create(channels, capacity);
        (Stream::new(kind, StreamWriter::new(producers)), consumers)
    }

    #[test]
    fn test_one_shot_backpressure_then_exhausted() {
        let (stream, mut consumers) = stream(StreamKind::Note(60), 2, 8);
        let streams = [stream];
        let sample = sample(2, 12);
        let mut scratch = Scratch::new();
        let mut task = Task::OneShot {
            note: 60,
            stream: 0,
            generation: 0,
            reader: sample.reader(PlaybackMode::OneShot),
        };

        assert_eq!(task.run(&streams, &mut scratch), TaskResult::Backpressure);
        assert_eq!(consumers[0].available(), 8);

        let mut out = [0.0; 8];
        consumers[0].pop_slice(&mut out);
        consumers[1].pop_slice(&mut out);
        assert_eq!(task.run(&streams, &mut scratch), TaskResult::Exhausted);
        assert_eq!(consumers[0].available(), 4);
    }

    #[test]
    fn test_stale_generation_is_retired() {
        let (stream, consumers) = stream(StreamKind::Track(1), 1, 8);
        let streams = [stream];
        let sample = sample(1, 4);
        let mut scratch = Scratch::new();
        let mut task = Task::Loop {
            track: 1,
            stream: 0,
            generation: 0,
            reader: sample.reader(PlaybackMode::Loop),
        };

        streams[0].bump_generation();
        assert_eq!(task.run(&streams, &mut scratch), TaskResult::Retired);
        assert_eq!(consumers[0].available(), 0);
    }

    #[test]
    fn test_held_writer_is_busy() {
        let (stream, _consumers) = stream(StreamKind::Track(1), 1, 8);
        let streams = [stream];
        let sample = sample(1, 4);
        let mut scratch = Scratch::new();
        let mut task = Task::Loop {
            track: 1,
            stream: 0,
            generation: 0,
            reader: sample.reader(PlaybackMode::Loop),
        };

        let writer = streams[0].take_writer().unwrap();
        assert_eq!(task.run(&streams, &mut scratch), TaskResult::Busy);
        drop(writer);
        assert_eq!(task.run(&streams, &mut scratch), TaskResult::Backpressure);
    }

    #[test]
    fn test_muted_loop_writes_silence_and_advances() {
        let (stream, mut consumers) = stream(StreamKind::Track(1), 1, 4);
        let streams = [stream];
        let sample = sample(1, 6);
        let mut scratch = Scratch::new();
        let mut task = Task::Loop {
            track: 1,
            stream: 0,
            generation: 0,
            reader: sample.reader(PlaybackMode::Loop),
        };

        streams[0].set_muted(true);
        assert_eq!(task.run(&streams, &mut scratch), TaskResult::Backpressure);
        let mut out = [9.0; 4];
        consumers[0].pop_slice(&mut out);
        assert_eq!(out, [0.0; 4]);

        streams[0].set_muted(false);
        assert_eq!(task.run(&streams, &mut scratch), TaskResult::Backpressure);
        consumers[0].pop_slice(&mut out);
        assert_eq!(out, [5.0, 6.0, 1.0, 2.0]);
    }
}
