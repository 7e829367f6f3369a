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

const DEFAULT_DEVICE: &str = "default";
const DEFAULT_BLOCK_SIZE: usize = 256;

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// The output device, or "default" for the host default.
    device: Option<String>,

    /// Sample rate in Hz. Defaults to the device's default rate.
    sample_rate: Option<u32>,

    /// Frames per quantum (default: 256).
    block_size: Option<usize>,
}

impl Audio {
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size() == 0 {
            return Err(ConfigError::Invalid {
                field: "audio.block_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sample_rate == Some(0) {
            return Err(ConfigError::Invalid {
                field: "audio.sample_rate",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}
