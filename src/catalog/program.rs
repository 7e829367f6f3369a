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
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::naming::{self, FileRole, ONE_SHOT_CHANNELS};
use crate::samples::{FormatError, LoadError, Sample};

/// A loop sample bound to a track.
#[derive(Debug, Clone)]
pub struct LoopSample {
    pub track: u8,
    pub sample: Arc<Sample>,
}

/// A one-shot sample bound to a MIDI note.
#[derive(Debug, Clone)]
pub struct OneShotSample {
    pub note: u8,
    pub sample: Arc<Sample>,
}

/// A named bank of loops and one-shots.
#[derive(Debug)]
pub struct Program {
    name: String,
    start_number: u8,
    path: PathBuf,
    loops: Vec<LoopSample>,
    one_shots: BTreeMap<u8, OneShotSample>,
}

impl Program {
    /// Loads every recognized sample in a program directory.
    pub(super) fn load(
        path: &Path,
        start_number: u8,
        sample_rate: u32,
    ) -> Result<Program, LoadError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .map_err(|e| LoadError::open(path, e))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<_, _>>()
            .map_err(|e| LoadError::open(path, e))?;
        files.sort();

        let mut loops = BTreeMap::new();
        let mut one_shots = BTreeMap::new();
        for file in files {
            if !file.is_file() {
                continue;
            }
            let role = naming::classify(&file).map_err(|e| LoadError::format(&file, e))?;
            match role {
                Some(FileRole::Loop { track }) => {
                    if loops.contains_key(&track) {
                        return Err(LoadError::format(&file, FormatError::DuplicateTrack(track)));
                    }
                    let sample = Sample::open(&file, sample_rate, naming::loop_channels(track))?;
                    loops.insert(
                        track,
                        LoopSample {
                            track,
                            sample: Arc::new(sample),
                        },
                    );
                }
                Some(FileRole::OneShot { note }) => {
                    if one_shots.contains_key(&note) {
                        return Err(LoadError::format(&file, FormatError::DuplicateNote(note)));
                    }
                    let sample = Sample::open(&file, sample_rate, ONE_SHOT_CHANNELS)?;
                    one_shots.insert(
                        note,
                        OneShotSample {
                            note,
                            sample: Arc::new(sample),
                        },
                    );
                }
                None => debug!(file = ?file, "Ignoring unrecognized file"),
            }
        }

        info!(
            program = %name,
            start_number,
            loops = loops.len(),
            one_shots = one_shots.len(),
            "Program loaded"
        );

        Ok(Program {
            name,
            start_number,
            path: path.to_path_buf(),
            loops: loops.into_values().collect(),
            one_shots,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number from the directory prefix, matched against program change messages.
    pub fn start_number(&self) -> u8 {
        self.start_number
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loops ordered by track.
    pub fn loops(&self) -> &[LoopSample] {
        &self.loops
    }

    pub fn loop_for_track(&self, track: u8) -> Option<&LoopSample> {
        self.loops.iter().find(|l| l.track == track)
    }

    pub fn one_shots(&self) -> &BTreeMap<u8, OneShotSample> {
        &self.one_shots
    }

    pub fn one_shot(&self, note: u8) -> Option<&OneShotSample> {
        self.one_shots.get(&note)
    }
}
