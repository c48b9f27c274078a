//! The whole runtime state of the controller and the tasks operating on it.
//!
//! All mutable state lives in a single `DeviceState`. The scheduler hands it
//! to one task at a time, which makes the scheduler the only guard needed
//! around it.

use crate::led::LedState;
use crate::midi::{self, Inbound, MidiTransport};
use crate::multiplexer::{LedDriver, LedMultiplexer};
use crate::queue::{ByteQueue, COMMAND_CAPACITY, MIDI_OUT_CAPACITY};
use crate::scanner::{MatrixIo, MatrixScanner};
use crate::settings::{ButtonSettings, PersistentStore};
use crate::sysex::{self, SysexEngine, Target};

/// Virtual cable used for all outgoing messages.
pub const CABLE: u8 = 0;

/// Most packets taken from the host in one pass, one full 64-byte bulk
/// endpoint buffer.
pub const RECEIVE_BUDGET: usize = 16;

/// All hardware capabilities the controller needs.
pub trait Platform: MatrixIo + LedDriver + PersistentStore + MidiTransport {}

impl<T> Platform for T where T: MatrixIo + LedDriver + PersistentStore + MidiTransport {}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    pub settings: ButtonSettings,
    pub leds: LedState,
    pub scanner: MatrixScanner,
    pub multiplexer: LedMultiplexer,
    pub sysex: SysexEngine,
    /// MIDI records produced by button presses.
    pub midi_out: ByteQueue<MIDI_OUT_CAPACITY>,
    /// Indices of buttons whose data was requested by the host.
    pub commands: ByteQueue<COMMAND_CAPACITY>,
}

impl DeviceState {
    /// Load the stored configuration and prepare the matrix for scanning.
    pub fn new<P: Platform>(platform: &mut P) -> Self {
        let settings = ButtonSettings::load(platform);
        let leds = LedState::from_settings(&settings);
        let mut scanner = MatrixScanner::new();
        scanner.start(platform);
        Self {
            settings,
            leds,
            scanner,
            multiplexer: LedMultiplexer::new(),
            sysex: SysexEngine::new(),
            midi_out: ByteQueue::new(),
            commands: ByteQueue::new(),
        }
    }

    /// Scan one row of buttons.
    pub fn buttons_task<M: MatrixIo>(&mut self, matrix: &mut M) {
        self.scanner
            .scan(matrix, &self.settings, &mut self.leds, &mut self.midi_out);
    }

    /// Light the next column of LEDs.
    pub fn leds_task<D: LedDriver>(&mut self, driver: &mut D) {
        self.multiplexer.refresh(&self.leds, driver);
    }

    /// Exchange MIDI with the host.
    ///
    /// Pending replies go out first, followed by at most one event of a
    /// button. Then up to `RECEIVE_BUDGET` packets from the host are
    /// processed, the rest waits for the next pass.
    pub fn midi_task<P: PersistentStore + MidiTransport>(&mut self, platform: &mut P) {
        if platform.packet_send_ready() {
            self.send_replies(platform);
            if let Some((channel, number, value)) = self.midi_out.pop_record() {
                midi::send(platform, midi::control_change(CABLE, channel, number, value));
            }
        }

        for _ in 0..RECEIVE_BUDGET {
            if !platform.receive_ready() {
                break;
            }
            let packet = platform.receive_packet();
            self.receive(packet, platform);
        }
    }

    fn send_replies<T: MidiTransport>(&mut self, transport: &mut T) {
        if self.sysex.take_ack() {
            midi::send_sysex(transport, CABLE, &sysex::ack_body());
        }
        if self.sysex.take_version() {
            midi::send_sysex(transport, CABLE, &sysex::version_body());
        }
        while let Some(index) = self.commands.pop() {
            let Some(record) = self.settings.get(usize::from(index)) else {
                continue;
            };
            let body = sysex::button_data_body(index, record.to_bytes());
            midi::send_sysex(transport, CABLE, &body);
        }
    }

    fn receive<S: PersistentStore>(&mut self, packet: midi::Packet, store: &mut S) {
        match midi::decode(packet) {
            Inbound::ControlChange {
                channel,
                number,
                value,
            } => {
                self.sysex.abort();
                self.leds
                    .apply_control_change(&self.settings, channel, number, value);
            }
            Inbound::Bytes(bytes) => {
                let mut target = Target {
                    settings: &mut self.settings,
                    leds: &mut self.leds,
                    store,
                    commands: &mut self.commands,
                };
                self.sysex.process(bytes, &mut target);
            }
        }
    }

    /// Service the USB device itself.
    pub fn usb_task<T: MidiTransport>(&mut self, transport: &mut T) {
        transport.poll();
    }
}
