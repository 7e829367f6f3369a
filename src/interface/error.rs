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
use crate::engine::EngineError;

/// Failures opening or driving an audio or MIDI interface.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no audio output device named {0:?}")]
    NoDevice(String),

    #[error("device {device:?} has no f32 output with {needed} channels at {sample_rate}Hz")]
    UnsupportedConfig {
        device: String,
        needed: usize,
        sample_rate: u32,
    },

    #[error("unable to enumerate audio devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("unable to read device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[error("unable to read device configuration: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unable to read supported configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("unable to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("unable to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unable to initialize MIDI input: {0}")]
    MidiInit(#[from] midir::InitError),

    #[error("no MIDI input port matching {0:?}")]
    NoMidiPort(String),

    #[error("unable to connect to MIDI input {port:?}: {reason}")]
    MidiConnect { port: String, reason: String },

    #[error("engine did not settle within {0:?}")]
    SettleTimeout(std::time::Duration),

    #[error("port {0} does not exist")]
    NoPort(usize),
}
