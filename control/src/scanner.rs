//! Debounced scanning of the button matrix.
//!
//! A single call samples one row of all boards. It takes `ROWS` calls to
//! scan the whole matrix, which makes one cycle. A button changes its state
//! only after reading the same level for `HISTORY` consecutive cycles.

use crate::button::ButtonRecord;
use crate::geometry::{Position, BOARDS, COLUMNS, HISTORY, ROWS};
use crate::led::LedState;
use crate::queue::ByteQueue;
use crate::settings::ButtonSettings;

/// Velocity-like value sent when a button turns on.
pub const VALUE_ON: u8 = 127;

/// Value sent when a button turns off.
pub const VALUE_OFF: u8 = 0;

/// Access to the switch matrix.
pub trait MatrixIo {
    /// Drive the row select lines shared by all boards.
    fn select_row(&mut self, row: usize);

    /// Sample the currently selected row. Bit `c` of the word of board `b`
    /// is set while the button in column `c` is pressed.
    fn read_row(&mut self, row: usize) -> [u16; BOARDS];
}

/// Raw samples of the last `HISTORY` cycles of one board.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct History {
    snapshots: [u16; HISTORY],
}

impl History {
    fn write(&mut self, slot: usize, mask: u16, pressed: bool) {
        if pressed {
            self.snapshots[slot] |= mask;
        } else {
            self.snapshots[slot] &= !mask;
        }
    }

    /// The level of the button if it was the same in all snapshots.
    fn stable(&self, mask: u16) -> Option<bool> {
        let pressed = self.snapshots[0] & mask != 0;
        self.snapshots[1..]
            .iter()
            .all(|snapshot| (snapshot & mask != 0) == pressed)
            .then_some(pressed)
    }
}

#[derive(Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MatrixScanner {
    history: [History; BOARDS],
    slot: usize,
    row: usize,
    last: [u16; BOARDS],
    toggle: [u16; BOARDS],
}

impl MatrixScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the first row so the lines settle before the first scan.
    pub fn start<M: MatrixIo>(&mut self, matrix: &mut M) {
        matrix.select_row(self.row);
    }

    /// Row that will be sampled by the next call of `scan`.
    #[must_use]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Last accepted level of the button.
    #[must_use]
    pub fn is_pressed(&self, position: Position) -> bool {
        self.last[position.board] & position.mask() != 0
    }

    /// Current on/off state of a toggle button.
    #[must_use]
    pub fn is_toggled(&self, position: Position) -> bool {
        self.toggle[position.board] & position.mask() != 0
    }

    /// Sample the current row, report accepted edges and select the next
    /// row.
    pub fn scan<M: MatrixIo, const N: usize>(
        &mut self,
        matrix: &mut M,
        settings: &ButtonSettings,
        leds: &mut LedState,
        midi_out: &mut ByteQueue<N>,
    ) {
        let row = self.row;
        let levels = matrix.read_row(row);

        for (board, level) in levels.into_iter().enumerate() {
            for column in 0..COLUMNS {
                let position = Position { board, row, column };
                self.history[board].write(self.slot, position.mask(), level & (1 << column) != 0);
            }
        }

        for board in 0..BOARDS {
            for column in 0..COLUMNS {
                let position = Position { board, row, column };
                let Some(pressed) = self.history[board].stable(position.mask()) else {
                    continue;
                };
                if pressed == self.is_pressed(position) {
                    continue;
                }
                let Some(record) = settings.get(position.index()) else {
                    continue;
                };
                if pressed {
                    self.press(position, record, leds, midi_out);
                } else {
                    self.release(position, record, leds, midi_out);
                }
            }
        }

        if row == ROWS - 1 {
            self.slot = (self.slot + 1) % HISTORY;
        }
        self.row = (row + 1) % ROWS;
        matrix.select_row(self.row);
    }

    fn press<const N: usize>(
        &mut self,
        position: Position,
        record: &ButtonRecord,
        leds: &mut LedState,
        midi_out: &mut ByteQueue<N>,
    ) {
        self.last[position.board] |= position.mask();

        let on = if record.flags.is_toggle() {
            self.toggle[position.board] ^= position.mask();
            self.is_toggled(position)
        } else {
            true
        };
        emit(position, record, on, leds, midi_out);
    }

    fn release<const N: usize>(
        &mut self,
        position: Position,
        record: &ButtonRecord,
        leds: &mut LedState,
        midi_out: &mut ByteQueue<N>,
    ) {
        self.last[position.board] &= !position.mask();

        // Toggle buttons change only on press.
        if !record.flags.is_toggle() {
            emit(position, record, false, leds, midi_out);
        }
    }
}

fn emit<const N: usize>(
    position: Position,
    record: &ButtonRecord,
    on: bool,
    leds: &mut LedState,
    midi_out: &mut ByteQueue<N>,
) {
    let value = if on { VALUE_ON } else { VALUE_OFF };
    midi_out.push_record(record.channel, record.controller_number, value);
    if !record.flags.is_led_midi_driven() {
        leds.set(position, record.color.for_state(on));
    }
}
