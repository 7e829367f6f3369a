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

use config::{Config as ConfigBuilder, File};
use serde::Deserialize;

mod audio;
mod engine;
mod error;
mod midi;

pub use self::audio::Audio;
pub use self::engine::Engine;
pub use self::error::ConfigError;
pub use self::midi::Midi;

/// The configuration for a live sampler.
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// The project directory. Relative paths are resolved against the config file.
    project: PathBuf,

    #[serde(default)]
    audio: Audio,

    #[serde(default)]
    midi: Midi,

    #[serde(default)]
    engine: Engine,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Config, ConfigError> {
        let mut config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Config>()?;

        if config.project.is_relative() {
            if let Some(parent) = path.parent() {
                config.project = parent.join(&config.project);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.audio.validate()?;
        self.midi.validate()?;
        self.engine.validate()
    }

    pub fn project(&self) -> &Path {
        &self.project
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn midi(&self) -> &Midi {
        &self.midi
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use config::{Config as ConfigBuilder, File, FileFormat};

    use super::*;
    use crate::control::{ControlMapping, ControlMessage};
    use crate::engine::NoteOffBehavior;

    fn parse(yaml: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            project: /srv/looper/project
            audio:
              device: UltraLite-mk5
              sample_rate: 48000
              block_size: 128
            midi:
              device: Launchpad
              channel: 2
              mute_controller_base: 20
            engine:
              workers: 3
              task_queue_capacity: 32
              control_queue_capacity: 64
              port_blocks: 2
              note_off: stop
            "#,
        );

        assert_eq!(config.project(), Path::new("/srv/looper/project"));
        assert_eq!(config.audio().device(), "UltraLite-mk5");
        assert_eq!(config.audio().sample_rate(), Some(48000));
        assert_eq!(config.audio().block_size(), 128);
        assert_eq!(config.midi().device(), Some("Launchpad"));
        assert_eq!(config.midi().channel(), Some(2));
        assert_eq!(config.midi().mapping(), ControlMapping::new(Some(2), 20));
        assert_eq!(config.engine().workers(), 3);
        assert_eq!(config.engine().task_queue_capacity(), 32);
        assert_eq!(config.engine().control_queue_capacity(), 64);
        assert_eq!(config.engine().port_blocks(), 2);
        assert_eq!(config.engine().note_off(), NoteOffBehavior::Stop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = parse("project: songs");

        assert_eq!(config.audio().device(), "default");
        assert_eq!(config.audio().sample_rate(), None);
        assert_eq!(config.audio().block_size(), 256);
        assert_eq!(config.midi().device(), None);
        assert_eq!(
            config.midi().mapping().map(&[0xB0, 102, 127]),
            Some(ControlMessage::Mute { track: 1 })
        );
        assert_eq!(config.engine().workers(), num_cpus::get());
        assert_eq!(config.engine().task_queue_capacity(), 16);
        assert_eq!(config.engine().control_queue_capacity(), 256);
        assert_eq!(config.engine().port_blocks(), 1);
        assert_eq!(
            config.engine().note_off(),
            NoteOffBehavior::PlayToCompletion
        );
    }

    #[test]
    fn test_invalid_values() {
        let config = parse(
            r#"
            project: songs
            midi:
              channel: 17
            "#,
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "midi.channel",
                ..
            })
        ));

        let config = parse(
            r#"
            project: songs
            engine:
              workers: 0
            "#,
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "engine.workers",
                ..
            })
        ));

        let config = parse(
            r#"
            project: songs
            midi:
              mute_controller_base: 120
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_resolves_relative_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mloop.yaml");
        fs::write(&path, "project: project\naudio:\n  block_size: 64\n").unwrap();

        let config = Config::deserialize(&path).unwrap();
        assert_eq!(config.project(), dir.path().join("project"));
        assert_eq!(config.audio().block_size(), 64);
    }

    #[test]
    fn test_deserialize_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::deserialize(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
