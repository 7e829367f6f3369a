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

//! Project naming rules.
//!
//! - Program directories: `P` followed by two digits, e.g. `P01` or `P02 Verse`.
//! - Loop files: `L<track 1-9>*.wav`, e.g. `L1 drums.wav`.
//! - One-shot files: `S<octave 0-9><pitch class>*.wav`, e.g. `S4C#.wav`.

use std::path::Path;

use crate::samples::FormatError;

/// The closed table of pitch classes. The index is the semitone offset within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

pub const MAX_OCTAVE: u8 = 9;
pub const MAX_TRACK: u8 = 9;

/// Channels every one-shot sample must have.
pub const ONE_SHOT_CHANNELS: u16 = 2;

/// Channels a loop sample on the given track must have.
pub fn loop_channels(track: u8) -> u16 {
    if track <= 4 {
        1
    } else {
        2
    }
}

/// Resolves an octave and a two-character pitch class to a MIDI note number.
pub fn decode_note(octave: u8, code: &str) -> Result<u8, FormatError> {
    if octave > MAX_OCTAVE {
        return Err(FormatError::Octave(octave));
    }
    let index = NOTE_NAMES
        .iter()
        .position(|name| *name == code)
        .ok_or_else(|| FormatError::PitchClass(code.to_string()))?;
    Ok(octave * 12 + index as u8)
}

/// Returns the start number if the directory name designates a program.
pub fn program_number(name: &str) -> Option<u8> {
    let mut chars = name.chars();
    if chars.next() != Some('P') {
        return None;
    }
    let tens = chars.next()?.to_digit(10)?;
    let ones = chars.next()?.to_digit(10)?;
    Some((tens * 10 + ones) as u8)
}

/// The role a project file plays in its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Loop { track: u8 },
    OneShot { note: u8 },
}

/// Classifies a file inside a program directory. Files that aren't WAV or don't
/// carry a known prefix yield `Ok(None)`; a known prefix with a bad suffix is an error.
pub fn classify(path: &Path) -> Result<Option<FileRole>, FormatError> {
    let is_wav = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("wav"));
    if !is_wav {
        return Ok(None);
    }
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return Ok(None);
    };

    if let Some(rest) = name.strip_prefix('L') {
        let track = rest
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .filter(|track| (1..=u32::from(MAX_TRACK)).contains(track))
            .ok_or_else(|| FormatError::Track(name.to_string()))?;
        return Ok(Some(FileRole::Loop { track: track as u8 }));
    }

    if let Some(rest) = name.strip_prefix('S') {
        let mut chars = rest.chars();
        let octave = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| FormatError::OneShotName(name.to_string()))?;
        let code: String = chars.by_ref().take(2).collect();
        if code.chars().count() != 2 {
            return Err(FormatError::OneShotName(name.to_string()));
        }
        let note = decode_note(octave as u8, &code)?;
        return Ok(Some(FileRole::OneShot { note }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_decode_note_table() {
        for octave in 0..=MAX_OCTAVE {
            for (index, code) in NOTE_NAMES.iter().enumerate() {
                assert_eq!(
                    decode_note(octave, code).unwrap(),
                    octave * 12 + index as u8,
                    "{octave}{code}"
                );
            }
        }
    }

    #[test]
    fn test_decode_note_rejects_unknown() {
        assert_eq!(
            decode_note(4, "H-"),
            Err(FormatError::PitchClass("H-".to_string()))
        );
        assert_eq!(
            decode_note(4, "Cb"),
            Err(FormatError::PitchClass("Cb".to_string()))
        );
        assert_eq!(
            decode_note(4, "c#"),
            Err(FormatError::PitchClass("c#".to_string()))
        );
        assert_eq!(decode_note(10, "C-"), Err(FormatError::Octave(10)));
    }

    #[test]
    fn test_loop_channels() {
        for track in 1..=4 {
            assert_eq!(loop_channels(track), 1);
        }
        for track in 5..=9 {
            assert_eq!(loop_channels(track), 2);
        }
    }

    #[test]
    fn test_program_number() {
        assert_eq!(program_number("P01"), Some(1));
        assert_eq!(program_number("P12 Chorus"), Some(12));
        assert_eq!(program_number("P1"), None);
        assert_eq!(program_number("Px1"), None);
        assert_eq!(program_number("samples"), None);
    }

    #[test]
    fn test_classify() {
        let role = |name: &str| classify(&PathBuf::from(name));

        assert_eq!(role("L1 drums.wav"), Ok(Some(FileRole::Loop { track: 1 })));
        assert_eq!(role("L9.WAV"), Ok(Some(FileRole::Loop { track: 9 })));
        assert_eq!(role("S4C#.wav"), Ok(Some(FileRole::OneShot { note: 49 })));
        assert_eq!(role("S0C- kick.wav"), Ok(Some(FileRole::OneShot { note: 0 })));
        assert_eq!(role("readme.txt"), Ok(None));
        assert_eq!(role("L1.aiff"), Ok(None));
        assert_eq!(role("click.wav"), Ok(None));

        assert_eq!(
            role("L0.wav"),
            Err(FormatError::Track("L0.wav".to_string()))
        );
        assert_eq!(
            role("Lead.wav"),
            Err(FormatError::Track("Lead.wav".to_string()))
        );
        assert_eq!(
            role("S4.wav"),
            Err(FormatError::PitchClass(".w".to_string()))
        );
        assert_eq!(
            role("Sx.wav"),
            Err(FormatError::OneShotName("Sx.wav".to_string()))
        );
    }
}
