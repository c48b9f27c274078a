//! In-memory stand-ins for the hardware, used by tests.

use std::collections::VecDeque;

use crate::button::Field;
use crate::geometry::{Position, BOARDS, BUTTONS, COLUMNS};
use crate::midi::{MidiTransport, Packet, UsbStatus};
use crate::multiplexer::LedDriver;
use crate::save::Flash;
use crate::scanner::MatrixIo;
use crate::settings::PersistentStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: [[u8; 4]; BUTTONS],
    writes: usize,
}

impl MemoryStore {
    pub fn filled(value: u8) -> Self {
        Self {
            records: [[value; 4]; BUTTONS],
            writes: 0,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl PersistentStore for MemoryStore {
    fn read_field(&mut self, index: usize, field: Field) -> u8 {
        self.records[index][field.offset()]
    }

    fn write_field(&mut self, index: usize, field: Field, value: u8) {
        self.records[index][field.offset()] = value;
        self.writes += 1;
    }
}

/// Matrix with buttons held by the test.
#[derive(Debug, Default)]
pub struct FakeMatrix {
    pressed: [u16; BOARDS],
    selected: Option<usize>,
}

impl FakeMatrix {
    pub fn set(&mut self, position: Position, pressed: bool) {
        if pressed {
            self.pressed[position.board] |= position.mask();
        } else {
            self.pressed[position.board] &= !position.mask();
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }
}

impl MatrixIo for FakeMatrix {
    fn select_row(&mut self, row: usize) {
        self.selected = Some(row);
    }

    fn read_row(&mut self, row: usize) -> [u16; BOARDS] {
        let mut levels = [0; BOARDS];
        for (board, level) in levels.iter_mut().enumerate() {
            for column in 0..COLUMNS {
                let position = Position { board, row, column };
                if self.pressed[board] & position.mask() != 0 {
                    *level |= 1 << column;
                }
            }
        }
        levels
    }
}

#[derive(Debug, Default)]
pub struct FakeLedDriver {
    driven: Vec<(usize, usize, u16)>,
}

impl FakeLedDriver {
    pub fn driven(&self) -> &[(usize, usize, u16)] {
        &self.driven
    }
}

impl LedDriver for FakeLedDriver {
    fn drive_column(&mut self, board: usize, column: usize, word: u16) {
        self.driven.push((board, column, word));
    }
}

/// Transport recording everything sent, with inbound packets queued by the
/// test.
#[derive(Debug, Default)]
pub struct FakeTransport {
    sent: Vec<Packet>,
    inbound: VecDeque<Packet>,
    busy: usize,
    status: Option<UsbStatus>,
    polls: usize,
}

impl FakeTransport {
    /// Report the endpoint as busy for the given number of queries.
    pub fn busy_for(&mut self, queries: usize) {
        self.busy = queries;
    }

    pub fn sent(&self) -> &[Packet] {
        &self.sent
    }

    pub fn receive(&mut self, packet: Packet) {
        self.inbound.push_back(packet);
    }

    pub fn status(&self) -> Option<UsbStatus> {
        self.status
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl MidiTransport for FakeTransport {
    fn packet_send_ready(&mut self) -> bool {
        if self.busy > 0 {
            self.busy -= 1;
            false
        } else {
            true
        }
    }

    fn send_packet(&mut self, packet: Packet) {
        self.sent.push(packet);
    }

    fn receive_ready(&mut self) -> bool {
        !self.inbound.is_empty()
    }

    fn receive_packet(&mut self) -> Packet {
        self.inbound.pop_front().unwrap_or_default()
    }

    fn poll(&mut self) {
        self.polls += 1;
    }

    fn set_status(&mut self, status: UsbStatus) {
        self.status = Some(status);
    }
}

#[derive(Debug, Default)]
pub struct FakePlatform {
    pub store: MemoryStore,
    pub matrix: FakeMatrix,
    pub leds: FakeLedDriver,
    pub transport: FakeTransport,
}

impl PersistentStore for FakePlatform {
    fn read_field(&mut self, index: usize, field: Field) -> u8 {
        self.store.read_field(index, field)
    }

    fn write_field(&mut self, index: usize, field: Field, value: u8) {
        self.store.write_field(index, field, value);
    }
}

impl MatrixIo for FakePlatform {
    fn select_row(&mut self, row: usize) {
        self.matrix.select_row(row);
    }

    fn read_row(&mut self, row: usize) -> [u16; BOARDS] {
        self.matrix.read_row(row)
    }
}

impl LedDriver for FakePlatform {
    fn drive_column(&mut self, board: usize, column: usize, word: u16) {
        self.leds.drive_column(board, column, word);
    }
}

impl MidiTransport for FakePlatform {
    fn packet_send_ready(&mut self) -> bool {
        self.transport.packet_send_ready()
    }

    fn send_packet(&mut self, packet: Packet) {
        self.transport.send_packet(packet);
    }

    fn receive_ready(&mut self) -> bool {
        self.transport.receive_ready()
    }

    fn receive_packet(&mut self) -> Packet {
        self.transport.receive_packet()
    }

    fn poll(&mut self) {
        self.transport.poll();
    }

    fn set_status(&mut self, status: UsbStatus) {
        self.transport.set_status(status);
    }
}

const SECTOR_SIZE: usize = 4096;

/// Flash made of sectors of 4 kB.
#[derive(Debug)]
pub struct FakeFlash {
    sectors: Vec<[u8; SECTOR_SIZE]>,
    writes: usize,
}

impl FakeFlash {
    pub fn erased(sectors: usize) -> Self {
        Self {
            sectors: vec![[0xFF; SECTOR_SIZE]; sectors],
            writes: 0,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Flash for FakeFlash {
    fn sectors(&self) -> usize {
        self.sectors.len()
    }

    fn read(&mut self, sector: usize, buffer: &mut [u8]) {
        buffer.copy_from_slice(&self.sectors[sector][..buffer.len()]);
    }

    fn write(&mut self, sector: usize, data: &[u8]) {
        let sector = &mut self.sectors[sector];
        *sector = [0xFF; SECTOR_SIZE];
        sector[..data.len()].copy_from_slice(data);
        self.writes += 1;
    }
}
