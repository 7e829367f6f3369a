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

//! Physical output ports.
//!
//! Each port is an SPSC ring of `f32` samples. The engine owns every producer and
//! the audio interface owns every consumer.

use crate::catalog::OutputLayout;
use crate::ringbuffer::{spsc, SpscConsumer, SpscProducer};

pub type PortConsumer = SpscConsumer<f32>;

const SILENCE: [f32; 256] = [0.0; 256];

/// Creates `count` output port rings holding at most `capacity` samples each.
pub fn create(count: usize, capacity: usize) -> (Vec<PortProducer>, Vec<PortConsumer>) {
    (0..count)
        .map(|_| {
            let (ring, consumer) = spsc(capacity);
            let producer = PortProducer {
                ring,
                capacity: capacity.max(1),
            };
            (producer, consumer)
        })
        .unzip()
}

/// The writing side of one port.
///
/// The ring underneath is rounded up to a power of two. The producer never fills it
/// past the capacity that was asked for.
pub struct PortProducer {
    ring: SpscProducer<f32>,
    capacity: usize,
}

impl PortProducer {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples that can be pushed without exceeding the capacity.
    #[inline]
    pub fn vacant(&self) -> usize {
        let reserved = self.ring.capacity() - self.capacity;
        self.ring.vacant().saturating_sub(reserved)
    }

    /// Pushes as many samples as fit. Returns the number pushed.
    #[inline]
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        let count = samples.len().min(self.vacant());
        self.ring.push_slice(&samples[..count])
    }
}

/// The writing side of all ports in one stream. Writes keep the ports frame-aligned:
/// every port receives the same number of frames.
pub struct StreamWriter {
    ports: Box<[PortProducer]>,
}

impl StreamWriter {
    pub fn new(ports: Vec<PortProducer>) -> Self {
        Self {
            ports: ports.into_boxed_slice(),
        }
    }

    pub fn channels(&self) -> usize {
        self.ports.len()
    }

    /// Frames that can be written to every port without blocking.
    pub fn vacant(&self) -> usize {
        self.ports
            .iter()
            .map(PortProducer::vacant)
            .min()
            .unwrap_or(0)
    }

    /// Writes up to `frames` frames, one slice per port. Ports without a matching
    /// slice receive silence. Returns the number of frames written.
    pub fn write<B: AsRef<[f32]>>(&mut self, channels: &[B], frames: usize) -> usize {
        let frames = channels
            .iter()
            .map(|channel| channel.as_ref().len())
            .fold(frames.min(self.vacant()), usize::min);

        for (index, port) in self.ports.iter_mut().enumerate() {
            match channels.get(index) {
                Some(channel) => {
                    port.push_slice(&channel.as_ref()[..frames]);
                }
                None => push_silence(port, frames),
            }
        }
        frames
    }

    /// Writes up to `frames` frames of silence. Returns the number of frames written.
    pub fn write_silence(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.vacant());
        for port in self.ports.iter_mut() {
            push_silence(port, frames);
        }
        frames
    }
}

fn push_silence(port: &mut PortProducer, mut frames: usize) {
    while frames > 0 {
        let run = frames.min(SILENCE.len());
        port.push_slice(&SILENCE[..run]);
        frames -= run;
    }
}

/// Splits the port producers into one writer per stream of the layout. Returns None
/// if the number of producers does not match the layout.
pub fn group(layout: &OutputLayout, producers: Vec<PortProducer>) -> Option<Vec<StreamWriter>> {
    if producers.len() != layout.port_count() {
        return None;
    }
    let mut producers = producers.into_iter();
    Some(
        layout
            .streams()
            .iter()
            .map(|stream| StreamWriter::new(producers.by_ref().take(stream.channels()).collect()))
            .collect(),
    )
}
