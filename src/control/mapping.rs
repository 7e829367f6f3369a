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
use midly::live::LiveEvent;
use midly::MidiMessage;

use super::ControlMessage;
use crate::catalog::naming::MAX_TRACK;

/// Controller number that mutes track 1 unless configured otherwise.
pub const DEFAULT_MUTE_CONTROLLER_BASE: u8 = 102;

/// Controller values at or above this mute; values below unmute.
const MUTE_THRESHOLD: u8 = 64;

/// Translates raw MIDI bytes into control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMapping {
    /// 0-based channel filter.
    channel: Option<u8>,
    mute_controller_base: u8,
}

impl Default for ControlMapping {
    fn default() -> Self {
        Self {
            channel: None,
            mute_controller_base: DEFAULT_MUTE_CONTROLLER_BASE,
        }
    }
}

impl ControlMapping {
    /// `channel` is the 1-16 channel to listen on, or None for all channels.
    pub fn new(channel: Option<u8>, mute_controller_base: u8) -> Self {
        Self {
            channel: channel.map(|channel| channel.saturating_sub(1)),
            mute_controller_base,
        }
    }

    /// Maps a raw MIDI event. Anything unparseable or unmapped yields None.
    pub fn map(&self, raw: &[u8]) -> Option<ControlMessage> {
        let LiveEvent::Midi { channel, message } = LiveEvent::parse(raw).ok()? else {
            return None;
        };
        if self.channel.is_some_and(|wanted| wanted != channel.as_int()) {
            return None;
        }

        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Some(ControlMessage::NoteOn {
                note: key.as_int(),
                velocity: vel.as_int(),
            }),
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                Some(ControlMessage::NoteOff { note: key.as_int() })
            }
            MidiMessage::ProgramChange { program } => Some(ControlMessage::ProgramChange {
                program: program.as_int() + 1,
            }),
            MidiMessage::Controller { controller, value } => {
                let offset = controller.as_int().checked_sub(self.mute_controller_base)?;
                if offset >= MAX_TRACK {
                    return None;
                }
                let track = offset + 1;
                if value.as_int() >= MUTE_THRESHOLD {
                    Some(ControlMessage::Mute { track })
                } else {
                    Some(ControlMessage::Unmute { track })
                }
            }
            _ => None,
        }
    }
}
