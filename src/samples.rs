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

//! Sample store.
//!
//! This module provides:
//! - Format validation of WAV files against the interface rate and channel role
//! - Staging of decoded frames into fixed-size in-memory buffers
//! - Playback cursors that read staged frames without I/O or allocation

mod error;
mod reader;
mod sample;

pub use error::{FormatError, LoadError};
pub use reader::{PlaybackMode, SampleReader};
pub use sample::{Sample, SampleSpec, BUFFER_FRAMES};
