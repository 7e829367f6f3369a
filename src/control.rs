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

//! Inbound control messages.
//!
//! Control input reaches the engine as typed [`ControlMessage`] values through an
//! SPSC ring. The writing side belongs to the MIDI (or offline) interface and the
//! reading side to the engine, which drains it once per quantum.

mod mapping;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::ringbuffer::{spsc, SpscConsumer, SpscProducer};

pub use mapping::{ControlMapping, DEFAULT_MUTE_CONTROLLER_BASE};

/// A control event the engine acts upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    /// Selects the program whose start number matches.
    ProgramChange { program: u8 },
    Mute { track: u8 },
    Unmute { track: u8 },
}

/// The engine's view of pending control input.
pub trait ControlSource: Send {
    /// Pops the oldest pending message.
    fn pop(&mut self) -> Option<ControlMessage>;

    /// Messages dropped because the source was full.
    fn dropped(&self) -> u64 {
        0
    }
}

/// Creates a bounded control channel.
pub fn channel(capacity: usize) -> (ControlSender, ControlReceiver) {
    let (producer, consumer) = spsc(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        ControlSender {
            producer,
            dropped: dropped.clone(),
        },
        ControlReceiver { consumer, dropped },
    )
}

/// The writing half of a control channel.
pub struct ControlSender {
    producer: SpscProducer<ControlMessage>,
    dropped: Arc<AtomicU64>,
}

impl ControlSender {
    /// Enqueues a message. A full channel drops the message and counts it; this never blocks.
    pub fn send(&mut self, message: ControlMessage) -> bool {
        let sent = self.producer.push(message);
        if !sent {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        sent
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The reading half of a control channel.
pub struct ControlReceiver {
    consumer: SpscConsumer<ControlMessage>,
    dropped: Arc<AtomicU64>,
}

impl ControlSource for ControlReceiver {
    fn pop(&mut self) -> Option<ControlMessage> {
        self.consumer.pop()
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
