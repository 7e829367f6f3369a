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

//! Sample files staged in memory as fixed-size planar frame buffers.
//!
//! Samples are validated and decoded entirely at load time so that playback never
//! touches the disk.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hound::WavReader;
use tracing::{debug, info};

use super::error::{FormatError, LoadError};
use super::reader::{PlaybackMode, SampleReader};

/// Number of frames held by each staged buffer.
pub const BUFFER_FRAMES: usize = 16 * 1024;

/// The only encoding accepted for project files.
pub const REQUIRED_BITS_PER_SAMPLE: u16 = 32;

/// One staged block of frames, stored planar: all of channel 0, then channel 1, etc.
pub(crate) struct FrameBuffer {
    samples: Box<[f32]>,
    frames: usize,
}

impl FrameBuffer {
    fn from_interleaved(interleaved: &[f32], channels: usize) -> Self {
        let frames = interleaved.len() / channels;
        let mut samples = vec![0.0f32; frames * channels];
        for (frame, chunk) in interleaved.chunks_exact(channels).enumerate() {
            for (channel, sample) in chunk.iter().enumerate() {
                samples[channel * frames + frame] = *sample;
            }
        }
        Self {
            samples: samples.into_boxed_slice(),
            frames,
        }
    }

    #[inline]
    pub(crate) fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub(crate) fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.samples[start..start + self.frames]
    }
}

/// The audio format of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    pub sample_rate: u32,
    pub channels: u16,
}

/// A validated audio file, fully staged in memory.
pub struct Sample {
    path: PathBuf,
    spec: SampleSpec,
    frames: usize,
    buffers: Arc<[FrameBuffer]>,
}

impl Sample {
    /// Opens and stages a WAV file. The file must be 32-bit float, at the required
    /// sample rate, with exactly the expected number of channels.
    pub fn open(
        path: &Path,
        required_rate: u32,
        expected_channels: u16,
    ) -> Result<Sample, LoadError> {
        let file = File::open(path).map_err(|e| LoadError::open(path, e))?;
        let reader =
            WavReader::new(BufReader::new(file)).map_err(|e| LoadError::from_wav(path, e))?;
        let spec = reader.spec();

        debug!(
            path = ?path,
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            bits = spec.bits_per_sample,
            "File open"
        );

        if spec.sample_rate != required_rate {
            return Err(LoadError::format(
                path,
                FormatError::SampleRate {
                    expected: required_rate,
                    actual: spec.sample_rate,
                },
            ));
        }
        if spec.sample_format != hound::SampleFormat::Float
            || spec.bits_per_sample != REQUIRED_BITS_PER_SAMPLE
        {
            return Err(LoadError::format(
                path,
                FormatError::Encoding {
                    bits: spec.bits_per_sample,
                    format: match spec.sample_format {
                        hound::SampleFormat::Float => "float",
                        hound::SampleFormat::Int => "int",
                    },
                },
            ));
        }
        if spec.channels != expected_channels {
            return Err(LoadError::format(
                path,
                FormatError::ChannelCount {
                    expected: expected_channels,
                    actual: spec.channels,
                },
            ));
        }

        let interleaved = reader
            .into_samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>()
            .map_err(|e| LoadError::from_wav(path, e))?;

        let sample = Self::from_interleaved(
            path,
            SampleSpec {
                sample_rate: spec.sample_rate,
                channels: spec.channels,
            },
            &interleaved,
        );

        info!(
            path = ?path,
            channels = sample.spec.channels,
            frames = sample.frames,
            duration_ms = sample.duration().as_millis(),
            buffers = sample.buffers.len(),
            "Sample staged"
        );

        Ok(sample)
    }

    /// Stages already-decoded interleaved samples. Trailing partial frames are dropped.
    pub(crate) fn from_interleaved(path: &Path, spec: SampleSpec, interleaved: &[f32]) -> Sample {
        let channels = usize::from(spec.channels.max(1));
        let buffers: Vec<FrameBuffer> = interleaved
            .chunks(BUFFER_FRAMES * channels)
            .map(|chunk| FrameBuffer::from_interleaved(chunk, channels))
            .filter(|buffer| buffer.frames() > 0)
            .collect();
        let frames = buffers.iter().map(FrameBuffer::frames).sum();

        Sample {
            path: path.to_path_buf(),
            spec,
            frames,
            buffers: buffers.into(),
        }
    }

    /// Creates a new playback cursor positioned at the first frame.
    pub fn reader(&self, mode: PlaybackMode) -> SampleReader {
        SampleReader::new(self.buffers.clone(), usize::from(self.spec.channels), mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn spec(&self) -> SampleSpec {
        self.spec
    }

    pub fn channel_count(&self) -> u16 {
        self.spec.channels
    }

    /// Total frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames as f64 / f64::from(self.spec.sample_rate.max(1)))
    }

    /// Returns the memory used by the staged frames in bytes.
    pub fn memory_size(&self) -> usize {
        self.frames * usize::from(self.spec.channels) * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sample")
            .field("path", &self.path)
            .field("spec", &self.spec)
            .field("frames", &self.frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ramp, write_wav, write_wav_int};

    #[test]
    fn test_open_valid_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let left = ramp(100, 0.0);
        let right = ramp(100, 1000.0);
        write_wav(&path, &[left.clone(), right.clone()], 48000).unwrap();

        let sample = Sample::open(&path, 48000, 2).unwrap();
        assert_eq!(sample.frames(), 100);
        assert_eq!(sample.channel_count(), 2);
        assert_eq!(sample.memory_size(), 100 * 2 * 4);

        let mut out = vec![vec![0.0; 100], vec![0.0; 100]];
        let mut reader = sample.reader(PlaybackMode::OneShot);
        assert_eq!(reader.read(&mut out, 100), 100);
        assert_eq!(out[0], left);
        assert_eq!(out[1], right);
    }

    #[test]
    fn test_open_rejects_wrong_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rate.wav");
        write_wav(&path, &[ramp(10, 0.0)], 44100).unwrap();

        let err = Sample::open(&path, 48000, 1).unwrap_err();
        assert_eq!(
            err.format_error(),
            Some(&FormatError::SampleRate {
                expected: 48000,
                actual: 44100
            })
        );
    }

    #[test]
    fn test_open_rejects_integer_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int.wav");
        write_wav_int(&path, &[vec![0i16, 100, -100]], 48000).unwrap();

        let err = Sample::open(&path, 48000, 1).unwrap_err();
        assert_eq!(
            err.format_error(),
            Some(&FormatError::Encoding {
                bits: 16,
                format: "int"
            })
        );
    }

    #[test]
    fn test_open_rejects_channel_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, &[ramp(10, 0.0)], 48000).unwrap();

        let err = Sample::open(&path, 48000, 2).unwrap_err();
        assert_eq!(
            err.format_error(),
            Some(&FormatError::ChannelCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_open_rejects_non_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"these are not the samples you are looking for").unwrap();

        let err = Sample::open(&path, 48000, 1).unwrap_err();
        assert!(matches!(
            err.format_error(),
            Some(FormatError::Container(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Sample::open(&dir.path().join("missing.wav"), 48000, 1).unwrap_err();
        assert!(matches!(err, LoadError::ResourceOpen { .. }));
    }

    #[test]
    fn test_staging_splits_into_fixed_buffers() {
        let frames = BUFFER_FRAMES * 2 + 10;
        let data: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        let sample = Sample::from_interleaved(
            Path::new("memory"),
            SampleSpec {
                sample_rate: 48000,
                channels: 1,
            },
            &data,
        );

        assert_eq!(sample.frames(), frames);
        assert_eq!(sample.buffers.len(), 3);
        assert_eq!(sample.buffers[2].frames(), 10);
        assert_eq!(sample.buffers[1].channel(0)[0], BUFFER_FRAMES as f32);
    }
}
