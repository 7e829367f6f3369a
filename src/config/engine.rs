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
use crate::engine::{EngineConfig, NoteOffBehavior, DEFAULT_TASK_QUEUE_CAPACITY};

const DEFAULT_CONTROL_QUEUE_CAPACITY: usize = 256;
const DEFAULT_PORT_BLOCKS: usize = 1;

/// A YAML representation of the engine configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Engine {
    /// Worker threads. Defaults to the number of CPUs.
    workers: Option<usize>,

    task_queue_capacity: Option<usize>,

    control_queue_capacity: Option<usize>,

    /// Output ring capacity per port, in blocks.
    port_blocks: Option<usize>,

    note_off: Option<NoteOffBehavior>,
}

impl Engine {
    pub fn workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    pub fn task_queue_capacity(&self) -> usize {
        self.task_queue_capacity.unwrap_or(DEFAULT_TASK_QUEUE_CAPACITY)
    }

    pub fn control_queue_capacity(&self) -> usize {
        self.control_queue_capacity.unwrap_or(DEFAULT_CONTROL_QUEUE_CAPACITY)
    }

    pub fn port_blocks(&self) -> usize {
        self.port_blocks.unwrap_or(DEFAULT_PORT_BLOCKS)
    }

    pub fn note_off(&self) -> NoteOffBehavior {
        self.note_off.unwrap_or_default()
    }

    /// The engine tuning described by this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            workers: self.workers(),
            task_queue_capacity: self.task_queue_capacity(),
            note_off: self.note_off(),
        }
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("engine.workers", self.workers()),
            ("engine.task_queue_capacity", self.task_queue_capacity()),
            ("engine.control_queue_capacity", self.control_queue_capacity()),
            ("engine.port_blocks", self.port_blocks()),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}
