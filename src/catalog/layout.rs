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
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use super::naming::{self, MAX_TRACK, ONE_SHOT_CHANNELS};
use super::Project;

/// What feeds an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Track(u8),
    Note(u8),
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Track(track) => write!(f, "track {track}"),
            StreamKind::Note(note) => write!(f, "note {note}"),
        }
    }
}

/// A group of consecutive physical ports fed by one loop track or one one-shot note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLayout {
    pub kind: StreamKind,
    pub ports: Range<usize>,
}

impl StreamLayout {
    pub fn channels(&self) -> usize {
        self.ports.len()
    }
}

/// The deterministic assignment of streams to physical output ports: every track
/// used by any program in ascending order, then every note in ascending order.
#[derive(Clone)]
pub struct OutputLayout {
    streams: Vec<StreamLayout>,
    tracks: [Option<usize>; MAX_TRACK as usize + 1],
    notes: Box<[Option<usize>; 128]>,
    port_count: usize,
}

impl OutputLayout {
    pub fn from_project(project: &Project) -> OutputLayout {
        let tracks: BTreeSet<u8> = project
            .programs()
            .iter()
            .flat_map(|program| program.loops().iter().map(|l| l.track))
            .collect();
        let notes: BTreeSet<u8> = project
            .programs()
            .iter()
            .flat_map(|program| program.one_shots().keys().copied())
            .collect();

        let kinds = tracks
            .into_iter()
            .map(|track| (StreamKind::Track(track), usize::from(naming::loop_channels(track))))
            .chain(
                notes
                    .into_iter()
                    .map(|note| (StreamKind::Note(note), usize::from(ONE_SHOT_CHANNELS))),
            );

        let mut layout = OutputLayout {
            streams: Vec::new(),
            tracks: [None; MAX_TRACK as usize + 1],
            notes: Box::new([None; 128]),
            port_count: 0,
        };
        for (kind, channels) in kinds {
            let index = layout.streams.len();
            match kind {
                StreamKind::Track(track) => layout.tracks[usize::from(track)] = Some(index),
                StreamKind::Note(note) => layout.notes[usize::from(note & 0x7f)] = Some(index),
            }
            layout.streams.push(StreamLayout {
                kind,
                ports: layout.port_count..layout.port_count + channels,
            });
            layout.port_count += channels;
        }
        layout
    }

    pub fn streams(&self) -> &[StreamLayout] {
        &self.streams
    }

    /// Total number of physical ports.
    pub fn port_count(&self) -> usize {
        self.port_count
    }

    /// Stream index for a loop track.
    pub fn track_stream(&self, track: u8) -> Option<usize> {
        self.tracks.get(usize::from(track)).copied().flatten()
    }

    /// Stream index for a one-shot note.
    pub fn note_stream(&self, note: u8) -> Option<usize> {
        self.notes.get(usize::from(note)).copied().flatten()
    }
}

impl fmt::Debug for OutputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputLayout")
            .field("streams", &self.streams)
            .field("port_count", &self.port_count)
            .finish()
    }
}
