//! Runtime of a USB-MIDI button controller, independent of the hardware.
//!
//! The controller is made of boards, each carrying a matrix of buttons with
//! an RGB LED under every one of them. Presses are sent to the host as
//! MIDI Control Change messages, while the host may drive LEDs with Control
//! Changes of its own and reconfigure every button through SysEx.
//!
//! All of it runs in a single loop of cooperative tasks. Hardware is reached
//! only through the traits of `Platform`, so the firmware provides these and
//! the rest can be exercised in tests:
//!
//! ```text
//!                      [ Scheduler ]
//!                            |
//!         +------------+-----+------+--------------+
//!         |            |            |              |
//!   [ UsbTask ]  [ MidiTask ]  [ ButtonsTask ]  [ LedsTask ]
//!                  A      |         |              A
//!        (packets) |      |         | (records)    |
//!                  |      V         V              |
//!               {Host} {SysEx} <- {MidiOut}     {LedState}
//!                         |
//!                         V
//!              {ButtonSettings} <------> {PersistentStore}
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::missing_panics_doc)]

pub mod button;
pub mod device;
pub mod geometry;
pub mod layout;
pub mod led;
mod log;
pub mod midi;
pub mod multiplexer;
pub mod queue;
pub mod save;
pub mod scanner;
pub mod scheduler;
pub mod settings;
pub mod sysex;

#[cfg(test)]
mod mock;

pub use crate::button::{ButtonRecord, Color, Field, Flags, Rgb};
pub use crate::device::{DeviceState, Platform};
pub use crate::geometry::{OutOfRange, Position};
pub use crate::led::LedState;
pub use crate::midi::{MidiTransport, UsbStatus};
pub use crate::multiplexer::{LedDriver, LedMultiplexer};
pub use crate::queue::ByteQueue;
pub use crate::save::{Flash, InvalidData, PagedStore};
pub use crate::scanner::{MatrixIo, MatrixScanner};
pub use crate::scheduler::{Event, Scheduler, Task};
pub use crate::settings::{ButtonSettings, PersistentStore};
pub use crate::sysex::SysexEngine;
