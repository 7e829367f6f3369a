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

//! A deterministic software interface.
//!
//! Instead of a hardware clock, the caller drives quanta explicitly. Each quantum
//! waits for the engine to settle before the ports are read, so the output depends
//! only on the project and the control messages sent.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info};

use super::InterfaceError;
use crate::catalog::{OutputLayout, Project};
use crate::control::{self, ControlMessage, ControlSender};
use crate::engine::{Engine, EngineConfig, QuantumHandle};
use crate::ports::{self, PortConsumer};

/// Default time a quantum may take to settle.
const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Sizing of an offline interface.
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// Frames per quantum.
    pub block_size: usize,
    /// Samples each port ring holds.
    pub port_capacity: usize,
    pub control_capacity: usize,
    pub engine: EngineConfig,
}

impl OfflineConfig {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            port_capacity: block_size,
            control_capacity: 256,
            engine: EngineConfig::default(),
        }
    }
}

/// Owns the port consumers and the control sender of a running engine.
pub struct OfflineInterface {
    engine: Engine,
    handle: QuantumHandle,
    consumers: Vec<PortConsumer>,
    sender: ControlSender,
    block_size: usize,
    settle_timeout: Duration,
    underruns: u64,
}

impl OfflineInterface {
    /// Creates the ports and control channel for the project, then builds and starts an engine.
    pub fn new(project: Arc<Project>, config: OfflineConfig) -> Result<Self, InterfaceError> {
        let layout = OutputLayout::from_project(&project);
        let (producers, consumers) = ports::create(layout.port_count(), config.port_capacity);
        let (sender, receiver) = control::channel(config.control_capacity);

        let mut engine =
            Engine::new(project, layout, producers, Box::new(receiver), config.engine)?;
        engine.start()?;
        let handle = engine.handle();

        info!(
            ports = consumers.len(),
            block_size = config.block_size,
            "Offline interface ready"
        );

        Ok(Self {
            engine,
            handle,
            consumers,
            sender,
            block_size: config.block_size,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
            underruns: 0,
        })
    }

    /// Queues a control message for the next quantum.
    pub fn send(&mut self, message: ControlMessage) -> bool {
        self.sender.send(message)
    }

    /// Signals a quantum and waits for the engine to finish it.
    pub fn advance(&mut self) -> Result<(), InterfaceError> {
        self.handle.advance();
        if self.handle.wait_settled(self.settle_timeout) {
            Ok(())
        } else {
            Err(InterfaceError::SettleTimeout(self.settle_timeout))
        }
    }

    /// Runs one quantum and reads one block from every port. Missing frames are
    /// zero-filled and counted as underruns.
    pub fn process_block(&mut self) -> Result<Vec<Vec<f32>>, InterfaceError> {
        self.advance()?;
        let block_size = self.block_size;
        let mut underrun = 0;
        let blocks = self
            .consumers
            .iter_mut()
            .map(|consumer| {
                let mut block = vec![0.0; block_size];
                let read = consumer.pop_slice(&mut block);
                underrun += block_size - read;
                block
            })
            .collect();
        if underrun > 0 {
            debug!(frames = underrun, "Offline underrun");
        }
        self.underruns += underrun as u64;
        Ok(blocks)
    }

    /// Reads up to `max` samples already written to a port, without advancing.
    pub fn drain_port(&mut self, port: usize, max: usize) -> Result<Vec<f32>, InterfaceError> {
        let consumer = self
            .consumers
            .get_mut(port)
            .ok_or(InterfaceError::NoPort(port))?;
        let mut out = vec![0.0; max.min(consumer.available())];
        let read = consumer.pop_slice(&mut out);
        out.truncate(read);
        Ok(out)
    }

    /// Samples waiting in a port.
    pub fn available(&self, port: usize) -> usize {
        self.consumers
            .get(port)
            .map(PortConsumer::available)
            .unwrap_or(0)
    }

    pub fn port_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Zero-filled port samples across all processed blocks.
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Renders `blocks` quanta into an interleaved 32-bit float WAV file with one
    /// channel per port. `schedule` is called before each block to send control input.
    pub fn render_wav<F>(
        &mut self,
        path: &Path,
        blocks: usize,
        mut schedule: F,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        F: FnMut(usize, &mut ControlSender),
    {
        let channels = u16::try_from(self.port_count().max(1))?;
        let mut writer = WavWriter::create(
            path,
            WavSpec {
                channels,
                sample_rate: self.engine.project().sample_rate(),
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
        )?;

        for block in 0..blocks {
            schedule(block, &mut self.sender);
            let ports = self.process_block()?;
            for frame in 0..self.block_size {
                if ports.is_empty() {
                    writer.write_sample(0.0f32)?;
                }
                for port in &ports {
                    writer.write_sample(port[frame])?;
                }
            }
        }
        writer.finalize()?;

        info!(path = ?path, blocks, channels, underruns = self.underruns, "Render complete");
        Ok(())
    }
}
