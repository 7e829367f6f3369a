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
use std::sync::Arc;

use super::sample::FrameBuffer;

/// How a reader behaves at the end of its sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Wraps back to the first frame.
    Loop,
    /// Stops and reports finished.
    OneShot,
}

/// A playback cursor over staged frame buffers. Reading never allocates or performs I/O.
pub struct SampleReader {
    buffers: Arc<[FrameBuffer]>,
    channels: usize,
    mode: PlaybackMode,
    /// Index of the current buffer.
    buffer: usize,
    /// Frame offset within the current buffer.
    offset: usize,
    finished: bool,
}

impl SampleReader {
    pub(crate) fn new(buffers: Arc<[FrameBuffer]>, channels: usize, mode: PlaybackMode) -> Self {
        Self {
            buffers,
            channels,
            mode,
            buffer: 0,
            offset: 0,
            finished: false,
        }
    }

    /// Copies up to `count` frames per channel into `output`, one slice per channel,
    /// and returns the number of frames produced.
    ///
    /// Channels beyond the sample's channel count are left untouched. A loop reader
    /// always fills `count` frames unless the sample is empty; a one-shot reader
    /// produces fewer at the end of the sample and is finished afterwards.
    pub fn read<B: AsMut<[f32]>>(&mut self, output: &mut [B], count: usize) -> usize {
        let count = output
            .iter_mut()
            .take(self.channels)
            .map(|channel| channel.as_mut().len())
            .fold(count, usize::min);

        let mut produced = 0;
        while produced < count {
            if self.buffer >= self.buffers.len() {
                match self.mode {
                    PlaybackMode::Loop if !self.buffers.is_empty() => {
                        self.buffer = 0;
                        self.offset = 0;
                    }
                    _ => {
                        self.finished = true;
                        break;
                    }
                }
            }

            let current = &self.buffers[self.buffer];
            let run = (current.frames() - self.offset).min(count - produced);
            for (channel, out) in output.iter_mut().take(self.channels).enumerate() {
                out.as_mut()[produced..produced + run]
                    .copy_from_slice(&current.channel(channel)[self.offset..self.offset + run]);
            }
            produced += run;
            self.offset += run;
            if self.offset >= current.frames() {
                self.buffer += 1;
                self.offset = 0;
            }
        }

        if self.mode == PlaybackMode::OneShot && self.buffer >= self.buffers.len() {
            self.finished = true;
        }
        produced
    }

    /// True once a one-shot reader has produced its last frame.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Current position in frames from the start of the sample.
    pub fn position(&self) -> usize {
        self.buffers[..self.buffer.min(self.buffers.len())]
            .iter()
            .map(FrameBuffer::frames)
            .sum::<usize>()
            + self.offset
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl std::fmt::Debug for SampleReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleReader")
            .field("mode", &self.mode)
            .field("channels", &self.channels)
            .field("position", &self.position())
            .field("finished", &self.finished)
            .finish()
    }
}
