//! Time-multiplexed driving of the LED matrix.
//!
//! Only one column of one board is lit at a time. Cycling through all of
//! them fast enough makes the whole matrix appear steadily lit.

use crate::geometry::{BOARDS, COLUMNS};
use crate::led::LedState;

/// Output stage of the LED matrix.
pub trait LedDriver {
    /// Turn off all LEDs and light the given column of a board with the
    /// packed word of `LedState::column_word`.
    fn drive_column(&mut self, board: usize, column: usize, word: u16);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedMultiplexer {
    board: usize,
    column: usize,
}

impl LedMultiplexer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Light the column under the cursor and move to the next one.
    pub fn refresh<D: LedDriver>(&mut self, leds: &LedState, driver: &mut D) {
        driver.drive_column(self.board, self.column, leds.column_word(self.board, self.column));

        if self.column == COLUMNS - 1 {
            self.board = (self.board + 1) % BOARDS;
        }
        self.column = (self.column + 1) % COLUMNS;
    }

    /// Board and column to be lit on the next refresh.
    #[must_use]
    pub fn cursor(&self) -> (usize, usize) {
        (self.board, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::Rgb;
    use crate::geometry::Position;
    use crate::mock::FakeLedDriver;

    #[test]
    fn columns_are_driven_board_after_board() {
        let leds = LedState::default();
        let mut driver = FakeLedDriver::default();
        let mut multiplexer = LedMultiplexer::new();

        for _ in 0..BOARDS * COLUMNS + 1 {
            multiplexer.refresh(&leds, &mut driver);
        }

        let order: heapless::Vec<(usize, usize), 16> =
            driver.driven().iter().map(|(b, c, _)| (*b, *c)).collect();
        assert_eq!(
            order.as_slice(),
            &[
                (0, 0),
                (0, 1),
                (0, 2),
                (0, 3),
                (1, 0),
                (1, 1),
                (1, 2),
                (1, 3),
                (0, 0)
            ]
        );
    }

    #[test]
    fn driven_word_matches_led_state() {
        let mut leds = LedState::default();
        leds.set(Position::new(0, 1, 0).unwrap(), Rgb::from_bits(0b101));
        let mut driver = FakeLedDriver::default();
        let mut multiplexer = LedMultiplexer::new();

        multiplexer.refresh(&leds, &mut driver);

        assert_eq!(driver.driven()[0], (0, 0, 0b101_000));
        assert_eq!(multiplexer.cursor(), (0, 1));
    }
}
