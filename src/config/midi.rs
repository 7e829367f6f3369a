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
use serde::Deserialize;

use super::error::ConfigError;
use crate::catalog::naming::MAX_TRACK;
use crate::control::{ControlMapping, DEFAULT_MUTE_CONTROLLER_BASE};

/// A YAML representation of the MIDI input configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Midi {
    /// Substring of the MIDI input port name. No MIDI input when unset.
    device: Option<String>,

    /// Channel (1-16) to listen on. All channels when unset.
    channel: Option<u8>,

    /// Controller number that mutes track 1; track t uses base + t - 1.
    mute_controller_base: Option<u8>,
}

impl Midi {
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn channel(&self) -> Option<u8> {
        self.channel
    }

    pub fn mute_controller_base(&self) -> u8 {
        self.mute_controller_base.unwrap_or(DEFAULT_MUTE_CONTROLLER_BASE)
    }

    /// The raw MIDI mapping described by this configuration.
    pub fn mapping(&self) -> ControlMapping {
        ControlMapping::new(self.channel, self.mute_controller_base())
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(channel) = self.channel {
            if !(1..=16).contains(&channel) {
                return Err(ConfigError::Invalid {
                    field: "midi.channel",
                    reason: format!("{channel} is not between 1 and 16"),
                });
            }
        }
        let base = self.mute_controller_base();
        let last = u16::from(base) + u16::from(MAX_TRACK) - 1;
        if last > 127 {
            return Err(ConfigError::Invalid {
                field: "midi.mute_controller_base",
                reason: format!("controllers {base}..{last} exceed 127"),
            });
        }
        Ok(())
    }
}
