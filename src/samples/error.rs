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
use std::path::{Path, PathBuf};

/// A project file that exists but does not satisfy the required format or naming rules.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("not a WAV container: {0}")]
    Container(String),

    #[error("sample rate is {actual}Hz, the interface runs at {expected}Hz")]
    SampleRate { expected: u32, actual: u32 },

    #[error("expected 32-bit float samples, found {bits}-bit {format}")]
    Encoding { bits: u16, format: &'static str },

    #[error("expected {expected} channel(s), found {actual}")]
    ChannelCount { expected: u16, actual: u16 },

    #[error("unknown pitch class {0:?}")]
    PitchClass(String),

    #[error("octave {0} is out of range")]
    Octave(u8),

    #[error("invalid track number in {0:?}")]
    Track(String),

    #[error("invalid one-shot name {0:?}")]
    OneShotName(String),

    #[error("track {0} is defined more than once")]
    DuplicateTrack(u8),

    #[error("note {0} is defined more than once")]
    DuplicateNote(u8),
}

/// Errors that abort loading a project. Loading is all-or-nothing.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("unable to open {}: {source}", .path.display())]
    ResourceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    pub(crate) fn format(path: &Path, source: FormatError) -> Self {
        LoadError::Format {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn open(path: &Path, source: std::io::Error) -> Self {
        LoadError::ResourceOpen {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Maps a hound error for the given file. Anything the decoder reports about the
    /// bytes themselves is a format problem; only genuine I/O failures are open errors.
    pub(crate) fn from_wav(path: &Path, error: hound::Error) -> Self {
        match error {
            hound::Error::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Self::format(path, FormatError::Container("unexpected end of file".into()))
            }
            hound::Error::IoError(e) => Self::open(path, e),
            other => Self::format(path, FormatError::Container(other.to_string())),
        }
    }

    /// Returns the format error, if this is one.
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            LoadError::Format { source, .. } => Some(source),
            LoadError::ResourceOpen { .. } => None,
        }
    }
}
