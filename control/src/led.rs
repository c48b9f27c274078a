//! Desired state of all indicator LEDs.

use crate::button::Rgb;
use crate::geometry::{Position, BOARDS, COLUMNS};
use crate::settings::ButtonSettings;

/// Lamp states of every LED, laid out the way they are driven.
///
/// Each board holds one word per column. A word carries 3 bits per row,
/// row 0 in the lowest bits, so it can be sent to the driver as is.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedState {
    columns: [[u16; COLUMNS]; BOARDS],
}

impl LedState {
    /// Initial state with every button shown as up.
    ///
    /// LEDs of buttons driven by MIDI stay off until the host sets them.
    #[must_use]
    pub fn from_settings(settings: &ButtonSettings) -> Self {
        let mut leds = Self::default();
        for (index, record) in settings.iter().enumerate() {
            if record.flags.is_led_midi_driven() {
                continue;
            }
            if let Ok(position) = Position::from_index(index) {
                leds.set(position, record.color.up);
            }
        }
        leds
    }

    pub fn set(&mut self, position: Position, rgb: Rgb) {
        let shift = 3 * position.row;
        let word = &mut self.columns[position.board][position.column];
        *word &= !(0b111 << shift);
        *word |= u16::from(rgb.bits()) << shift;
    }

    #[must_use]
    pub fn get(&self, position: Position) -> Rgb {
        let word = self.columns[position.board][position.column];
        Rgb::from_bits((word >> (3 * position.row)) as u8)
    }

    /// Show an incoming Control Change on the first MIDI-driven button
    /// mapped to it.
    ///
    /// Returns `false` if no button matched.
    pub fn apply_control_change(
        &mut self,
        settings: &ButtonSettings,
        channel: u8,
        number: u8,
        value: u8,
    ) -> bool {
        let matching = settings.iter().position(|record| {
            record.flags.is_led_midi_driven()
                && record.channel == channel
                && record.controller_number == number
        });
        match matching.map(Position::from_index) {
            Some(Ok(position)) => {
                self.set(position, Rgb::from_bits(value));
                true
            }
            _ => false,
        }
    }

    /// Packed states of all rows in one column of a board.
    #[must_use]
    pub fn column_word(&self, board: usize, column: usize) -> u16 {
        self.columns[board][column]
    }
}
