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
use midir::{MidiInput, MidiInputConnection};
use tracing::{debug, info, span, warn, Level};

use super::InterfaceError;
use crate::control::{ControlMapping, ControlSender};

/// Lists the names of all MIDI input ports, sorted.
pub fn list_ports() -> Result<Vec<String>, InterfaceError> {
    let input = MidiInput::new("mloop input listing")?;
    let mut names: Vec<String> = input
        .ports()
        .iter()
        .filter_map(|port| input.port_name(port).ok())
        .collect();
    names.sort();
    Ok(names)
}

/// A live MIDI input. Dropping it closes the connection.
pub struct MidiInputHandle {
    _connection: MidiInputConnection<()>,
}

/// Connects to the first input port whose name contains `device` and forwards
/// mapped control messages to `sender`.
pub fn connect(
    device: &str,
    mapping: ControlMapping,
    mut sender: ControlSender,
) -> Result<MidiInputHandle, InterfaceError> {
    let span = span!(Level::INFO, "midi input (midir)");
    let _enter = span.enter();

    let input = MidiInput::new("mloop input")?;
    let (port, name) = input
        .ports()
        .into_iter()
        .find_map(|port| {
            let name = input.port_name(&port).ok()?;
            name.contains(device).then_some((port, name))
        })
        .ok_or_else(|| InterfaceError::NoMidiPort(device.to_string()))?;

    let connection = input
        .connect(
            &port,
            "mloop control input",
            move |_, raw_event, _| match mapping.map(raw_event) {
                Some(message) => {
                    debug!(message = ?message, "Received MIDI event");
                    if !sender.send(message) {
                        warn!(
                            message = ?message,
                            dropped = sender.dropped(),
                            "Control queue full, dropping message"
                        );
                    }
                }
                None => debug!(raw = ?raw_event, "Ignoring MIDI event"),
            },
            (),
        )
        .map_err(|e| InterfaceError::MidiConnect {
            port: name.clone(),
            reason: e.to_string(),
        })?;

    info!(port = %name, "Watching MIDI events");
    Ok(MidiInputHandle {
        _connection: connection,
    })
}
