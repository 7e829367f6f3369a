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

//! A MIDI-driven multi-output sampler and looper.
//!
//! A [`catalog::Project`] is loaded once from disk. The [`engine::Engine`] turns
//! control input into playback tasks that write into per-port output rings, one
//! quantum at a time, and an [`interface`] collaborator drives those quanta from
//! either a hardware clock or a deterministic offline loop.

pub mod catalog;
pub mod config;
pub mod control;
pub mod engine;
pub mod interface;
pub mod ports;
pub mod ringbuffer;
pub mod samples;

#[cfg(test)]
mod testutil;
