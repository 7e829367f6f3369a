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
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::thread_priority;
use super::InterfaceError;
use crate::engine::QuantumHandle;
use crate::ports::PortConsumer;

/// Name that selects the host's default output device.
pub const DEFAULT_DEVICE: &str = "default";

/// An output device as reported by the host.
pub struct DeviceInfo {
    pub name: String,
    pub max_channels: u16,
    pub default_sample_rate: Option<u32>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Channels={}", self.name, self.max_channels)?;
        if let Some(rate) = self.default_sample_rate {
            write!(f, ", Default rate={rate}Hz")?;
        }
        write!(f, ")")
    }
}

/// Lists every output device of the default host, sorted by name.
pub fn list_devices() -> Result<Vec<DeviceInfo>, InterfaceError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();
    for device in host.output_devices()? {
        let Ok(configs) = device.supported_output_configs() else {
            continue;
        };
        let max_channels = configs.map(|config| config.channels()).max().unwrap_or(0);
        if max_channels == 0 {
            continue;
        }
        devices.push(DeviceInfo {
            name: device.name()?,
            max_channels,
            default_sample_rate: device
                .default_output_config()
                .ok()
                .map(|config| config.sample_rate().0),
        });
    }
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// Finds an output device by exact (trimmed) name, or the host default for "default".
pub fn find_device(name: &str) -> Result<cpal::Device, InterfaceError> {
    let host = cpal::default_host();
    if name == DEFAULT_DEVICE {
        return host
            .default_output_device()
            .ok_or_else(|| InterfaceError::NoDevice(name.to_string()));
    }
    for device in host.output_devices()? {
        if device.name()?.trim() == name {
            return Ok(device);
        }
    }
    Err(InterfaceError::NoDevice(name.to_string()))
}

/// The device's default output sample rate.
pub fn device_sample_rate(device: &cpal::Device) -> Result<u32, InterfaceError> {
    Ok(device.default_output_config()?.sample_rate().0)
}

/// Picks the smallest channel count that fits `ports` at the sample rate in f32.
fn output_channels(
    device: &cpal::Device,
    ports: usize,
    sample_rate: u32,
) -> Result<u16, InterfaceError> {
    let rate = cpal::SampleRate(sample_rate);
    device
        .supported_output_configs()?
        .filter(|config| config.sample_format() == cpal::SampleFormat::F32)
        .filter(|config| config.min_sample_rate() <= rate && rate <= config.max_sample_rate())
        .map(|config| config.channels())
        .filter(|channels| usize::from(*channels) >= ports.max(1))
        .min()
        .ok_or_else(|| InterfaceError::UnsupportedConfig {
            device: device.name().unwrap_or_default(),
            needed: ports,
            sample_rate,
        })
}

/// A running hardware output. Dropping it stops the stream.
pub struct CpalOutput {
    _stream: cpal::Stream,
    device: String,
    channels: u16,
    underruns: Arc<AtomicU64>,
    panics: Arc<AtomicU64>,
}

impl CpalOutput {
    /// Samples the callback had to zero-fill because a port was empty.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Panics caught inside the callback.
    pub fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Opens an f32 output stream whose callback signals one quantum per block and
/// interleaves the port rings into the device channels. Ports map to channels in
/// order; extra device channels are silent.
pub fn start_output(
    device: &cpal::Device,
    sample_rate: u32,
    block_size: usize,
    handle: QuantumHandle,
    mut consumers: Vec<PortConsumer>,
) -> Result<CpalOutput, InterfaceError> {
    let device_name = device.name()?;
    let channels = output_channels(device, consumers.len(), sample_rate)?;
    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Fixed(block_size as u32),
    };

    let underruns = Arc::new(AtomicU64::new(0));
    let panics = Arc::new(AtomicU64::new(0));
    let callback_underruns = underruns.clone();
    let callback_panics = panics.clone();

    let priority = thread_priority::callback_thread_priority();
    let rt_audio = thread_priority::rt_audio_enabled();
    let mut priority_set = false;
    let width = usize::from(channels);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            if !priority_set {
                if let Some(priority) = priority {
                    thread_priority::configure_thread_priority(priority, rt_audio);
                }
                priority_set = true;
            }

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                handle.advance();
                let frames = data.len() / width;
                let mut missing = 0u64;
                data.fill(0.0);
                for (port, consumer) in consumers.iter_mut().enumerate() {
                    for frame in 0..frames {
                        match consumer.pop() {
                            Some(sample) => data[frame * width + port] = sample,
                            None => missing += 1,
                        }
                    }
                }
                missing
            }));

            match result {
                Ok(missing) if missing > 0 => {
                    callback_underruns.fetch_add(missing, Ordering::Relaxed);
                }
                Ok(_) => {}
                Err(_) => {
                    data.fill(0.0);
                    callback_panics.fetch_add(1, Ordering::Relaxed);
                }
            }
        },
        |err| error!(err = %err, "CPAL output stream error"),
        None,
    )?;
    stream.play()?;

    info!(
        device = %device_name,
        channels,
        sample_rate,
        block_size,
        "Output stream started"
    );

    Ok(CpalOutput {
        _stream: stream,
        device: device_name,
        channels,
        underruns,
        panics,
    })
}
