//! Fixed layout of the button matrix.
//!
//! Every board carries a grid of `ROWS` x `COLUMNS` buttons. Rows are
//! selected one at a time and shared by all boards, columns are read in
//! parallel. Within a board, buttons are numbered row by row, with columns
//! mirrored to follow the wiring of the PCB.

/// Number of daisy-chained button boards.
pub const BOARDS: usize = 2;

/// Rows of buttons on each board.
pub const ROWS: usize = 4;

/// Columns of buttons on each board.
pub const COLUMNS: usize = 4;

pub const BUTTONS_PER_BOARD: usize = ROWS * COLUMNS;

/// Total number of buttons across all boards.
pub const BUTTONS: usize = BOARDS * BUTTONS_PER_BOARD;

/// Number of full matrix scans a level must stay stable for to be accepted.
pub const HISTORY: usize = 4;

// Per-board state is kept in `u16` bit sets.
const _: () = assert!(BUTTONS_PER_BOARD <= 16);
// Button indices travel as 7-bit SysEx data bytes.
const _: () = assert!(BUTTONS <= 128);
// Each LED column word packs 3 bits per row.
const _: () = assert!(ROWS * 3 <= 16);

/// Returned when an index or coordinate does not fit into the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRange;

/// Physical location of a button and of its indicator LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Position {
    pub board: usize,
    pub row: usize,
    pub column: usize,
}

impl Position {
    /// # Errors
    ///
    /// Fails with `OutOfRange` if any of the coordinates exceeds the matrix.
    pub fn new(board: usize, row: usize, column: usize) -> Result<Self, OutOfRange> {
        if board < BOARDS && row < ROWS && column < COLUMNS {
            Ok(Self { board, row, column })
        } else {
            Err(OutOfRange)
        }
    }

    /// # Errors
    ///
    /// Fails with `OutOfRange` if the index is not lower than `BUTTONS`.
    pub fn from_index(index: usize) -> Result<Self, OutOfRange> {
        if index >= BUTTONS {
            return Err(OutOfRange);
        }
        let board = index / BUTTONS_PER_BOARD;
        let local = index % BUTTONS_PER_BOARD;
        Ok(Self {
            board,
            row: local / COLUMNS,
            column: COLUMNS - 1 - local % COLUMNS,
        })
    }

    /// Index of the button within its board, also its bit in board bit sets.
    #[must_use]
    pub fn local_index(&self) -> usize {
        self.row * COLUMNS + (COLUMNS - 1 - self.column)
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.board * BUTTONS_PER_BOARD + self.local_index()
    }

    pub(crate) fn mask(&self) -> u16 {
        1 << self.local_index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_mirrored_within_a_row() {
        assert_eq!(Position::new(0, 0, 3).unwrap().index(), 0);
        assert_eq!(Position::new(0, 0, 0).unwrap().index(), 3);
        assert_eq!(Position::new(0, 1, 3).unwrap().index(), 4);
    }

    #[test]
    fn second_board_continues_numbering() {
        assert_eq!(Position::new(1, 0, 3).unwrap().index(), BUTTONS_PER_BOARD);
        assert_eq!(Position::new(1, 3, 0).unwrap().index(), BUTTONS - 1);
    }

    #[test]
    fn index_and_position_match_for_every_button() {
        for index in 0..BUTTONS {
            let position = Position::from_index(index).unwrap();
            assert_eq!(position.index(), index);
        }
    }

    #[test]
    fn coordinates_outside_matrix_are_rejected() {
        assert_eq!(Position::from_index(BUTTONS), Err(OutOfRange));
        assert_eq!(Position::new(BOARDS, 0, 0), Err(OutOfRange));
        assert_eq!(Position::new(0, ROWS, 0), Err(OutOfRange));
        assert_eq!(Position::new(0, 0, COLUMNS), Err(OutOfRange));
    }
}
