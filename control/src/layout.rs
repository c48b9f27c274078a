//! Factory layout of the button table.
//!
//! Buttons are numbered consecutively on channel 0 and alternate between
//! two color schemes, so neighbouring buttons are easy to tell apart.

use crate::button::{ButtonRecord, Color, Flags, Rgb};
use crate::geometry::BUTTONS;
use crate::sysex;

const EVEN: Color = Color {
    up: Rgb::from_bits(0b110),
    down: Rgb::from_bits(0b001),
};

const ODD: Color = Color {
    up: Rgb::from_bits(0b100),
    down: Rgb::from_bits(0b010),
};

#[must_use]
pub fn default_record(index: usize) -> ButtonRecord {
    ButtonRecord {
        channel: 0,
        controller_number: (index & 0x7F) as u8,
        flags: Flags::empty(),
        color: if index % 2 == 0 { EVEN } else { ODD },
    }
}

#[must_use]
pub fn default_records() -> [ButtonRecord; BUTTONS] {
    core::array::from_fn(default_record)
}

/// SysEx bodies that configure a device with the default layout, one per
/// button.
pub fn provisioning_messages() -> impl Iterator<Item = [u8; 13]> {
    default_records()
        .into_iter()
        .enumerate()
        .map(|(index, record)| sysex::set_button_data_body(index as u8, record.to_bytes()))
}
