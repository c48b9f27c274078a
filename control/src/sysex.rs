//! Configuration protocol carried over SysEx.
//!
//! Every message starts with a fixed vendor header, followed by a command
//! byte and its operands:
//!
//! ```text
//! F0 <header> 00                        F7   get version
//! F0 <header> 01 index                  F7   get button data
//! F0 <header> 02 index chan num flags color F7   set button data
//! F0 <header>                           F7   ping
//! ```
//!
//! Bytes are interpreted one at a time as they arrive. Anything unexpected
//! silently resets the parser, the host is supposed to retry.

use crate::button::Field;
use crate::geometry::{Position, BUTTONS};
use crate::led::LedState;
use crate::log;
use crate::midi::{SYSEX_BEGIN, SYSEX_END};
use crate::queue::ByteQueue;
use crate::settings::{ButtonSettings, PersistentStore};

/// Educational/development manufacturer ID followed by "buzzr" and the
/// product number.
pub const HEADER: [u8; 7] = [0x7D, b'b', b'u', b'z', b'z', b'r', 1];

/// Version of the protocol, reported on `GET_VERSION`.
pub const VERSION: u8 = 1;

pub const RET_VERSION: u8 = 0x03;
pub const RET_BUTTON_DATA: u8 = 0x04;

const HEADER_LEN: usize = HEADER.len();
const FIELDS: usize = Field::ALL.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    GetVersion = 0x00,
    GetButtonData = 0x01,
    SetButtonData = 0x02,
}

impl Command {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::GetVersion),
            0x01 => Some(Self::GetButtonData),
            0x02 => Some(Self::SetButtonData),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    #[default]
    Idle,
    MatchingHeader(usize),
    ReadingCommand,
    ReadingOperand(Command, usize),
}

/// Whether the rest of the current packet should still be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Everything a command may touch.
pub struct Target<'a, S, const N: usize> {
    pub settings: &'a mut ButtonSettings,
    pub leds: &'a mut LedState,
    pub store: &'a mut S,
    pub commands: &'a mut ByteQueue<N>,
}

/// Byte-wise parser of incoming SysEx messages.
#[derive(Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SysexEngine {
    phase: Phase,
    target_index: usize,
    ack_pending: bool,
    version_pending: bool,
}

impl SysexEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any message in progress.
    pub fn abort(&mut self) {
        self.phase = Phase::Idle;
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Parse the payload of one USB-MIDI packet.
    ///
    /// The end of a message or an unexpected status byte ends the packet,
    /// remaining bytes are only padding.
    pub fn process<S: PersistentStore, const N: usize>(
        &mut self,
        bytes: [u8; 3],
        target: &mut Target<'_, S, N>,
    ) {
        for byte in bytes {
            if self.feed(byte, target) == Flow::Stop {
                break;
            }
        }
    }

    fn feed<S: PersistentStore, const N: usize>(
        &mut self,
        byte: u8,
        target: &mut Target<'_, S, N>,
    ) -> Flow {
        match byte {
            SYSEX_BEGIN => {
                self.phase = Phase::MatchingHeader(0);
                Flow::Continue
            }
            SYSEX_END => {
                if self.phase == Phase::ReadingCommand {
                    log::debug!("Ping");
                    self.ack_pending = true;
                }
                self.phase = Phase::Idle;
                Flow::Stop
            }
            _ if byte & 0x80 != 0 => {
                self.phase = Phase::Idle;
                Flow::Stop
            }
            _ => {
                self.phase = self.advance(byte, target);
                Flow::Continue
            }
        }
    }

    fn advance<S: PersistentStore, const N: usize>(
        &mut self,
        byte: u8,
        target: &mut Target<'_, S, N>,
    ) -> Phase {
        match self.phase {
            Phase::Idle => Phase::Idle,
            Phase::MatchingHeader(matched) => {
                if byte != HEADER[matched] {
                    Phase::Idle
                } else if matched + 1 == HEADER_LEN {
                    Phase::ReadingCommand
                } else {
                    Phase::MatchingHeader(matched + 1)
                }
            }
            Phase::ReadingCommand => match Command::from_byte(byte) {
                Some(Command::GetVersion) => {
                    self.version_pending = true;
                    Phase::Idle
                }
                Some(command) => Phase::ReadingOperand(command, 0),
                None => Phase::Idle,
            },
            Phase::ReadingOperand(Command::GetButtonData, _) => {
                if usize::from(byte) < BUTTONS {
                    target.commands.push(byte);
                }
                Phase::Idle
            }
            Phase::ReadingOperand(Command::SetButtonData, 0) => {
                if usize::from(byte) < BUTTONS {
                    self.target_index = usize::from(byte);
                    Phase::ReadingOperand(Command::SetButtonData, 1)
                } else {
                    Phase::Idle
                }
            }
            Phase::ReadingOperand(Command::SetButtonData, operand) => {
                self.write_field(Field::ALL[operand - 1], byte, target);
                if operand == FIELDS {
                    self.ack_pending = true;
                    Phase::Idle
                } else {
                    Phase::ReadingOperand(Command::SetButtonData, operand + 1)
                }
            }
            Phase::ReadingOperand(Command::GetVersion, _) => Phase::Idle,
        }
    }

    fn write_field<S: PersistentStore, const N: usize>(
        &mut self,
        field: Field,
        byte: u8,
        target: &mut Target<'_, S, N>,
    ) {
        let index = self.target_index;
        if target
            .settings
            .write(&mut *target.store, index, field, byte)
            .is_err()
        {
            return;
        }
        if field != Field::Color {
            return;
        }
        let (Some(record), Ok(position)) = (target.settings.get(index), Position::from_index(index))
        else {
            return;
        };
        log::info!("Button {=usize} set to {}", index, record);
        if !record.flags.is_led_midi_driven() {
            target.leds.set(position, record.color.up);
        }
    }

    /// Whether an acknowledgement should be sent. Clears the request.
    pub fn take_ack(&mut self) -> bool {
        core::mem::take(&mut self.ack_pending)
    }

    /// Whether the version should be reported. Clears the request.
    pub fn take_version(&mut self) -> bool {
        core::mem::take(&mut self.version_pending)
    }
}

/// Body of the acknowledgement, the bare header.
#[must_use]
pub fn ack_body() -> [u8; HEADER_LEN] {
    HEADER
}

#[must_use]
pub fn version_body() -> [u8; HEADER_LEN + 2] {
    let mut body = [0; HEADER_LEN + 2];
    body[..HEADER_LEN].copy_from_slice(&HEADER);
    body[HEADER_LEN] = RET_VERSION;
    body[HEADER_LEN + 1] = VERSION;
    body
}

/// Reply to `GET_BUTTON_DATA`: index, channel, number, flags and color.
#[must_use]
pub fn button_data_body(index: u8, record_bytes: [u8; FIELDS]) -> [u8; HEADER_LEN + 2 + FIELDS] {
    let mut body = [0; HEADER_LEN + 2 + FIELDS];
    body[..HEADER_LEN].copy_from_slice(&HEADER);
    body[HEADER_LEN] = RET_BUTTON_DATA;
    body[HEADER_LEN + 1] = index;
    body[HEADER_LEN + 2..].copy_from_slice(&record_bytes);
    body
}

/// Body of a `SET_BUTTON_DATA` request.
#[must_use]
pub fn set_button_data_body(index: u8, record_bytes: [u8; FIELDS]) -> [u8; HEADER_LEN + 2 + FIELDS] {
    let mut body = button_data_body(index, record_bytes);
    body[HEADER_LEN] = Command::SetButtonData as u8;
    body
}
