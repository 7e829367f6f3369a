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
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mloop::catalog::naming::NOTE_NAMES;
use mloop::catalog::{OutputLayout, Project};
use mloop::config::Config;
use mloop::control::{self, ControlMessage};
use mloop::engine::Engine;
use mloop::interface::offline::{OfflineConfig, OfflineInterface};
use mloop::interface::{cpal, midir};
use mloop::ports;

/// How often the live command reports engine statistics.
const STATS_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A MIDI-driven multi-output sampler and looper."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Loads and verifies every program in the given project directory.
    Programs {
        /// The path to the project on disk.
        path: PathBuf,
        /// The sample rate every sample must match.
        #[arg(short, long, default_value_t = 48000)]
        sample_rate: u32,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Renders a project through the engine into a WAV file with one channel per port.
    Render {
        /// The path to the project on disk.
        path: PathBuf,
        /// The WAV file to write.
        out: PathBuf,
        #[arg(short, long, default_value_t = 48000)]
        sample_rate: u32,
        /// Frames per quantum.
        #[arg(short, long, default_value_t = 256)]
        block_size: usize,
        /// Number of quanta to render.
        #[arg(long, default_value_t = 1000)]
        blocks: usize,
        /// Start number of the program to select before the first block.
        #[arg(short, long)]
        program: Option<u8>,
        /// Notes to trigger, in the form <BLOCK>=<NOTE>,... For example, 0=60,16=62.
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Starts the live sampler.
    Start {
        /// The path to the sampler config.
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Programs { path, sample_rate } => {
            let project = Project::load(&path, sample_rate)?;

            if project.is_empty() {
                println!("No programs found in {}.", path.display());
                return Ok(());
            }

            println!("Programs (count: {}):", project.len());
            for program in project.programs() {
                let tracks: Vec<String> = program
                    .loops()
                    .iter()
                    .map(|l| format!("L{} ({} frames)", l.track, l.sample.frames()))
                    .collect();
                let notes: Vec<String> =
                    program.one_shots().keys().map(|n| note_name(*n)).collect();
                println!(
                    "- {} (P{:02}): loops [{}], one-shots [{}]",
                    program.name(),
                    program.start_number(),
                    tracks.join(", "),
                    notes.join(", ")
                );
            }

            let layout = OutputLayout::from_project(&project);
            println!("\nPorts (count: {}):", layout.port_count());
            for stream in layout.streams() {
                println!("- {}: ports {}..{}", stream.kind, stream.ports.start, stream.ports.end);
            }
            println!("\nMemory: {} bytes", project.memory_size());
        }
        Commands::Devices {} => {
            let devices = cpal::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let ports = midir::list_ports()?;

            if ports.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for port in ports {
                println!("- {}", port);
            }
        }
        Commands::Render {
            path,
            out,
            sample_rate,
            block_size,
            blocks,
            program,
            notes,
        } => {
            let notes = match notes {
                Some(notes) => parse_notes(&notes)?,
                None => Vec::new(),
            };
            let project = Arc::new(Project::load(&path, sample_rate)?);
            let mut interface = OfflineInterface::new(project, OfflineConfig::new(block_size))?;

            interface.render_wav(&out, blocks, |block, sender| {
                if block == 0 {
                    if let Some(program) = program {
                        sender.send(ControlMessage::ProgramChange { program });
                    }
                }
                for (_, note) in notes.iter().filter(|(at, _)| *at == block) {
                    sender.send(ControlMessage::NoteOn {
                        note: *note,
                        velocity: 127,
                    });
                }
            })?;

            println!(
                "Rendered {} blocks of {} frames to {} ({} underrun samples).",
                blocks,
                block_size,
                out.display(),
                interface.underruns()
            );
        }
        Commands::Start { config } => {
            let config = Config::deserialize(&config)?;

            let device = cpal::find_device(config.audio().device())?;
            let sample_rate = match config.audio().sample_rate() {
                Some(sample_rate) => sample_rate,
                None => cpal::device_sample_rate(&device)?,
            };
            let block_size = config.audio().block_size();

            let project = Arc::new(Project::load(config.project(), sample_rate)?);
            let layout = OutputLayout::from_project(&project);
            let (producers, consumers) = ports::create(
                layout.port_count(),
                block_size * config.engine().port_blocks(),
            );
            let (sender, receiver) = control::channel(config.engine().control_queue_capacity());

            let mut engine = Engine::new(
                project,
                layout,
                producers,
                Box::new(receiver),
                config.engine().engine_config(),
            )?;
            engine.start()?;

            let _midi = match config.midi().device() {
                Some(device) => Some(midir::connect(device, config.midi().mapping(), sender)?),
                None => {
                    info!("No MIDI device configured, control input disabled");
                    None
                }
            };
            let output = cpal::start_output(
                &device,
                sample_rate,
                block_size,
                engine.handle(),
                consumers,
            )?;

            loop {
                thread::sleep(STATS_INTERVAL);
                let stats = engine.stats();
                info!(
                    quanta = stats.quanta,
                    control_messages = stats.control_messages,
                    control_dropped = stats.control_dropped,
                    tasks_run = stats.tasks_run,
                    deferred = stats.deferred,
                    underruns = output.underruns(),
                    "Engine stats"
                );
                if stats.starved > 0 || stats.panics > 0 || output.panics() > 0 {
                    warn!(
                        starved = stats.starved,
                        worker_panics = stats.panics,
                        callback_panics = output.panics(),
                        "Engine degraded"
                    );
                }
            }
        }
    }

    Ok(())
}

/// Formats a MIDI note number the way one-shot files name it, e.g. 61 is "5C#".
fn note_name(note: u8) -> String {
    format!("{}{}", note / 12, NOTE_NAMES[usize::from(note % 12)])
}

/// Parses <BLOCK>=<NOTE> pairs separated by commas.
fn parse_notes(notes: &str) -> Result<Vec<(usize, u8)>, Box<dyn Error>> {
    notes
        .split(',')
        .map(|entry| {
            let (block, note) = entry
                .split_once('=')
                .ok_or_else(|| format!("malformed note trigger '{}'", entry))?;
            let note: u8 = note.trim().parse()?;
            if note > 127 {
                return Err(format!("note {} out of range", note).into());
            }
            Ok((block.trim().parse()?, note))
        })
        .collect()
}
