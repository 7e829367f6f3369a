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

use std::{
    error::Error,
    fs::{self, File},
    path::{Path, PathBuf},
    thread,
    time::{Duration, SystemTime},
};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Returns `frames` consecutive values starting at `start`, so every frame is distinguishable.
pub fn ramp(frames: usize, start: f32) -> Vec<f32> {
    (0..frames).map(|i| start + i as f32).collect()
}

/// Creates (if needed) and returns a program directory under the project root.
pub fn program_dir(root: &Path, name: &str) -> PathBuf {
    let path = root.join(name);
    fs::create_dir_all(&path).expect("unable to create program directory");
    path
}

/// Writes a 32-bit float WAV file. `channels` holds one vector per channel.
pub fn write_wav(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    write_interleaved(path, channels, sample_rate, 32, SampleFormat::Float)
}

/// Writes a 16-bit integer WAV file. `channels` holds one vector per channel.
pub fn write_wav_int(
    path: &Path,
    channels: &[Vec<i16>],
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    write_interleaved(path, channels, sample_rate, 16, SampleFormat::Int)
}

fn write_interleaved<S: hound::Sample + Copy>(
    path: &Path,
    channels: &[Vec<S>],
    sample_rate: u32,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<(), Box<dyn Error>> {
    let num_channels = channels.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);

    let mut writer = WavWriter::new(
        File::create(path)?,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        },
    )?;
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// Wait for the given predicate to return true or fail.
#[inline]
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = SystemTime::now();
    let mut tick = Duration::from_millis(1);
    let timeout = Duration::from_secs(10);
    let max_tick = Duration::from_millis(50);

    loop {
        let elapsed = start.elapsed();
        if elapsed.is_err() {
            panic!("System time error");
        }
        let elapsed = elapsed.unwrap();

        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }

        thread::sleep(tick);
        tick = std::cmp::min(tick * 2, max_tick);
    }
}
