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

//! Project catalog.
//!
//! A project is a directory of program directories, each holding loop and one-shot
//! WAV files. The catalog is resolved once at startup and never changes afterwards.

mod layout;
pub mod naming;
mod program;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::samples::LoadError;

pub use layout::{OutputLayout, StreamKind, StreamLayout};
pub use naming::decode_note;
pub use program::{LoopSample, OneShotSample, Program};

/// An ordered list of programs.
#[derive(Debug)]
pub struct Project {
    path: PathBuf,
    sample_rate: u32,
    programs: Vec<Program>,
}

impl Project {
    /// Loads every program under the given directory. Program order is the
    /// lexicographic order of the directory names. Any invalid file aborts the load.
    pub fn load(path: &Path, sample_rate: u32) -> Result<Project, LoadError> {
        let start = Instant::now();
        info!(path = ?path, sample_rate, "Loading project");

        let mut directories: Vec<(String, PathBuf)> = fs::read_dir(path)
            .map_err(|e| LoadError::open(path, e))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LoadError::open(path, e))?
            .into_iter()
            .filter(|entry| entry.is_dir())
            .filter_map(|entry| {
                let name = entry.file_name()?.to_str()?.to_string();
                Some((name, entry))
            })
            .collect();
        directories.sort_by(|a, b| a.0.cmp(&b.0));

        let mut programs = Vec::new();
        for (name, directory) in directories {
            let Some(start_number) = naming::program_number(&name) else {
                debug!(directory = %name, "Ignoring non-program directory");
                continue;
            };
            programs.push(Program::load(&directory, start_number, sample_rate)?);
        }

        info!(
            path = ?path,
            programs = programs.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Project loaded"
        );

        Ok(Project {
            path: path.to_path_buf(),
            sample_rate,
            programs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The rate every sample was validated against.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn program(&self, index: usize) -> Option<&Program> {
        self.programs.get(index)
    }

    /// Finds the first program whose start number matches.
    pub fn program_by_number(&self, number: u8) -> Option<(usize, &Program)> {
        self.programs
            .iter()
            .enumerate()
            .find(|(_, program)| program.start_number() == number)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Total memory used by all staged samples, in bytes.
    pub fn memory_size(&self) -> usize {
        self.programs
            .iter()
            .map(|program| {
                program
                    .loops()
                    .iter()
                    .map(|l| l.sample.memory_size())
                    .chain(program.one_shots().values().map(|s| s.sample.memory_size()))
                    .sum::<usize>()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::samples::FormatError;
    use crate::testutil::{program_dir, ramp, write_wav};

    fn fixture() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();

        let verse = program_dir(root.path(), "P02 Verse");
        write_wav(&verse.join("L1 drums.wav"), &[ramp(32, 0.0)], 48000).unwrap();
        write_wav(
            &verse.join("L5 pad.wav"),
            &[ramp(32, 0.0), ramp(32, 100.0)],
            48000,
        )
        .unwrap();
        write_wav(
            &verse.join("S4C# hit.wav"),
            &[ramp(8, 0.0), ramp(8, 0.0)],
            48000,
        )
        .unwrap();

        let intro = program_dir(root.path(), "P01 Intro");
        write_wav(&intro.join("L2.wav"), &[ramp(16, 0.0)], 48000).unwrap();
        write_wav(&intro.join("S3A-.wav"), &[ramp(8, 0.0), ramp(8, 0.0)], 48000).unwrap();
        fs::write(intro.join("notes.txt"), "ignored").unwrap();

        program_dir(root.path(), "scratch");
        root
    }

    #[test]
    fn test_load_orders_programs_by_name() {
        let root = fixture();
        let project = Project::load(root.path(), 48000).unwrap();

        let names: Vec<&str> = project.programs().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["P01 Intro", "P02 Verse"]);

        let verse = project.program(1).unwrap();
        assert_eq!(verse.start_number(), 2);
        let tracks: Vec<u8> = verse.loops().iter().map(|l| l.track).collect();
        assert_eq!(tracks, vec![1, 5]);
        assert_eq!(verse.loop_for_track(5).unwrap().sample.channel_count(), 2);
        assert!(verse.one_shot(49).is_some());

        let (index, intro) = project.program_by_number(1).unwrap();
        assert_eq!(index, 0);
        assert!(intro.one_shot(3 * 12 + 9).is_some());
        assert!(project.program_by_number(7).is_none());
    }

    #[test]
    fn test_load_is_deterministic() {
        let root = fixture();
        let summarize = |project: &Project| -> Vec<(String, u8, Vec<u8>, Vec<u8>)> {
            project
                .programs()
                .iter()
                .map(|p| {
                    (
                        p.name().to_string(),
                        p.start_number(),
                        p.loops().iter().map(|l| l.track).collect(),
                        p.one_shots().keys().copied().collect(),
                    )
                })
                .collect()
        };

        let first = Project::load(root.path(), 48000).unwrap();
        let second = Project::load(root.path(), 48000).unwrap();
        assert_eq!(summarize(&first), summarize(&second));
    }

    #[test]
    fn test_load_rejects_loop_channel_mismatch() {
        let root = tempfile::tempdir().unwrap();
        let program = program_dir(root.path(), "P01");
        write_wav(
            &program.join("L3.wav"),
            &[ramp(8, 0.0), ramp(8, 0.0)],
            48000,
        )
        .unwrap();

        let err = Project::load(root.path(), 48000).unwrap_err();
        assert_eq!(
            err.format_error(),
            Some(&FormatError::ChannelCount {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_load_rejects_duplicate_track() {
        let root = tempfile::tempdir().unwrap();
        let program = program_dir(root.path(), "P01");
        write_wav(&program.join("L1 a.wav"), &[ramp(8, 0.0)], 48000).unwrap();
        write_wav(&program.join("L1 b.wav"), &[ramp(8, 0.0)], 48000).unwrap();

        let err = Project::load(root.path(), 48000).unwrap_err();
        assert_eq!(err.format_error(), Some(&FormatError::DuplicateTrack(1)));
    }

    #[test]
    fn test_load_rejects_unknown_pitch_class() {
        let root = tempfile::tempdir().unwrap();
        let program = program_dir(root.path(), "P01");
        write_wav(&program.join("S4H-.wav"), &[ramp(8, 0.0), ramp(8, 0.0)], 48000).unwrap();

        let err = Project::load(root.path(), 48000).unwrap_err();
        assert_eq!(
            err.format_error(),
            Some(&FormatError::PitchClass("H-".to_string()))
        );
    }

    #[test]
    fn test_load_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let err = Project::load(&root.path().join("nope"), 48000).unwrap_err();
        assert!(matches!(err, LoadError::ResourceOpen { .. }));
    }

    #[test]
    fn test_output_layout() {
        let root = fixture();
        let project = Project::load(root.path(), 48000).unwrap();
        let layout = OutputLayout::from_project(&project);

        let streams: Vec<(StreamKind, std::ops::Range<usize>)> = layout
            .streams()
            .iter()
            .map(|s| (s.kind, s.ports.clone()))
            .collect();
        assert_eq!(
            streams,
            vec![
                (StreamKind::Track(1), 0..1),
                (StreamKind::Track(2), 1..2),
                (StreamKind::Track(5), 2..4),
                (StreamKind::Note(45), 4..6),
                (StreamKind::Note(49), 6..8),
            ]
        );
        assert_eq!(layout.port_count(), 8);
        assert_eq!(layout.track_stream(5), Some(2));
        assert_eq!(layout.track_stream(3), None);
        assert_eq!(layout.note_stream(49), Some(4));
        assert_eq!(layout.note_stream(0), None);
    }
}
