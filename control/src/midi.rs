//! USB-MIDI event packets.
//!
//! Every message on the USB-MIDI wire travels in 4-byte packets. The first
//! byte holds the virtual cable in its high nibble and the Code Index
//! Number (CIN), describing the shape of the payload, in its low nibble.
//! The remaining three bytes carry the MIDI data itself.

pub type Packet = [u8; 4];

pub const SYSEX_BEGIN: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

pub const COMMAND_NOTE_OFF: u8 = 0x80;
pub const COMMAND_NOTE_ON: u8 = 0x90;
pub const COMMAND_CC: u8 = 0xB0;

/// Velocity used for note events, buttons are not pressure sensitive.
pub const STANDARD_VELOCITY: u8 = 64;

/// SysEx starts or continues.
const CIN_SYSEX: u8 = 0x4;
/// SysEx ends with the following single byte.
const CIN_SYSEX_END_1: u8 = 0x5;
/// SysEx ends with the following two bytes.
const CIN_SYSEX_END_2: u8 = 0x6;
/// SysEx ends with the following three bytes.
const CIN_SYSEX_END_3: u8 = 0x7;

/// Connection state, reported to the user through a status LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbStatus {
    NotReady,
    Enumerating,
    Ready,
}

/// The MIDI streaming endpoints of the USB device.
pub trait MidiTransport {
    /// Whether the IN endpoint can accept another packet.
    fn packet_send_ready(&mut self) -> bool;

    fn send_packet(&mut self, packet: Packet);

    /// Whether a packet from the host is waiting on the OUT endpoint.
    fn receive_ready(&mut self) -> bool;

    fn receive_packet(&mut self) -> Packet;

    /// Keep the USB device alive: control requests, enumeration and such.
    fn poll(&mut self);

    fn set_status(&mut self, status: UsbStatus);
}

/// Wrap a channel voice message.
#[must_use]
pub fn channel_voice(cable: u8, status: u8, data_1: u8, data_2: u8) -> Packet {
    [(cable << 4) | (status >> 4), status, data_1, data_2]
}

#[must_use]
pub fn control_change(cable: u8, channel: u8, number: u8, value: u8) -> Packet {
    channel_voice(
        cable,
        COMMAND_CC | (channel & 0x0F),
        number & 0x7F,
        value & 0x7F,
    )
}

#[must_use]
pub fn note_change(cable: u8, channel: u8, pitch: u8, on: bool) -> Packet {
    let command = if on { COMMAND_NOTE_ON } else { COMMAND_NOTE_OFF };
    channel_voice(
        cable,
        command | (channel & 0x0F),
        pitch & 0x7F,
        STANDARD_VELOCITY,
    )
}

/// Split a SysEx body into packets.
///
/// The body must not contain the begin and end bytes, these are added.
#[must_use]
pub fn sysex_packets(cable: u8, body: &[u8]) -> SysexPackets<'_> {
    SysexPackets {
        body,
        header: cable << 4,
        stage: Stage::Start,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Body(usize),
    Done,
}

/// Iterator over packets of a single SysEx message.
#[derive(Debug, Clone)]
pub struct SysexPackets<'a> {
    body: &'a [u8],
    header: u8,
    stage: Stage,
}

impl Iterator for SysexPackets<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        let body = self.body;
        let header = self.header;
        let packet = match self.stage {
            Stage::Done => return None,
            Stage::Start => match body {
                [] => {
                    self.stage = Stage::Done;
                    return None;
                }
                [only] => {
                    self.stage = Stage::Done;
                    [header | CIN_SYSEX_END_3, SYSEX_BEGIN, *only, SYSEX_END]
                }
                [first, second, ..] => {
                    self.stage = Stage::Body(2);
                    [header | CIN_SYSEX, SYSEX_BEGIN, *first, *second]
                }
            },
            Stage::Body(i) if i + 2 < body.len() => {
                self.stage = Stage::Body(i + 3);
                [header | CIN_SYSEX, body[i], body[i + 1], body[i + 2]]
            }
            Stage::Body(i) => {
                self.stage = Stage::Done;
                match body.len() - i {
                    0 => [header | CIN_SYSEX_END_1, SYSEX_END, 0, 0],
                    1 => [header | CIN_SYSEX_END_2, body[i], SYSEX_END, 0],
                    _ => [header | CIN_SYSEX_END_3, body[i], body[i + 1], SYSEX_END],
                }
            }
        };
        Some(packet)
    }
}

/// Send a packet once the endpoint is ready.
///
/// This waits for the hardware inside the calling task. The wait is bound
/// by the bus speed.
pub fn send<T: MidiTransport>(transport: &mut T, packet: Packet) {
    while !transport.packet_send_ready() {
        core::hint::spin_loop();
    }
    transport.send_packet(packet);
}

/// Send a whole SysEx message, packet by packet.
pub fn send_sysex<T: MidiTransport>(transport: &mut T, cable: u8, body: &[u8]) {
    for packet in sysex_packets(cable, body) {
        send(transport, packet);
    }
}

/// Interpretation of a packet received from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Inbound {
    ControlChange { channel: u8, number: u8, value: u8 },
    Bytes([u8; 3]),
}

/// Drop the cable and CIN and classify the payload.
#[must_use]
pub fn decode(packet: Packet) -> Inbound {
    let [_, status, data_1, data_2] = packet;
    if status & 0xF0 == COMMAND_CC {
        Inbound::ControlChange {
            channel: status & 0x0F,
            number: data_1,
            value: data_2,
        }
    } else {
        Inbound::Bytes([status, data_1, data_2])
    }
}
