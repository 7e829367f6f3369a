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

//! Audio and MIDI interfaces that drive the engine.
//!
//! An interface signals one quantum per block through a
//! [`QuantumHandle`](crate::engine::QuantumHandle), reads the port rings and feeds
//! the control ring.

pub mod cpal;
mod error;
pub mod midir;
pub mod offline;
pub mod thread_priority;

pub use error::InterfaceError;
