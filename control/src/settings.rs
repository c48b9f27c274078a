//! Table of button configuration, mirrored to persistent memory.

use crate::button::{ButtonRecord, Field};
use crate::geometry::{OutOfRange, BUTTONS};
use crate::log;

/// Byte-addressable non-volatile memory holding the button table.
///
/// Both calls are expected to block until the memory is ready. A write must
/// be durable by the time it returns.
pub trait PersistentStore {
    fn read_field(&mut self, index: usize, field: Field) -> u8;
    fn write_field(&mut self, index: usize, field: Field, value: u8);
}

/// In-memory copy of all button records.
///
/// The table is loaded once on startup and from then on, every change is
/// written through to the persistent store before it is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonSettings {
    records: [ButtonRecord; BUTTONS],
}

impl Default for ButtonSettings {
    fn default() -> Self {
        Self::from_records([ButtonRecord::default(); BUTTONS])
    }
}

impl ButtonSettings {
    #[must_use]
    pub fn from_records(records: [ButtonRecord; BUTTONS]) -> Self {
        Self { records }
    }

    /// Read the whole table. Stored bytes are masked to the width of their
    /// fields, so erased memory still yields valid records.
    pub fn load<S: PersistentStore>(store: &mut S) -> Self {
        let mut records = [ButtonRecord::default(); BUTTONS];
        for (index, record) in records.iter_mut().enumerate() {
            for field in Field::ALL {
                record.set(field, store.read_field(index, field));
            }
        }
        log::info!("Loaded settings of {=usize} buttons", BUTTONS);
        Self { records }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ButtonRecord> {
        self.records.get(index)
    }

    /// Update a single field and mirror it to the store.
    ///
    /// Returns the masked value that was written.
    ///
    /// # Errors
    ///
    /// Fails with `OutOfRange` if the index does not address a button. The
    /// store is not touched in that case.
    pub fn write<S: PersistentStore>(
        &mut self,
        store: &mut S,
        index: usize,
        field: Field,
        raw: u8,
    ) -> Result<u8, OutOfRange> {
        let record = self.records.get_mut(index).ok_or(OutOfRange)?;
        record.set(field, raw);
        let value = record.get(field);
        store.write_field(index, field, value);
        Ok(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ButtonRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn records(&self) -> &[ButtonRecord; BUTTONS] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::{Color, Flags};
    use crate::mock::MemoryStore;

    #[test]
    fn when_loaded_from_erased_memory_fields_are_masked() {
        let mut store = MemoryStore::filled(0xFF);
        let settings = ButtonSettings::load(&mut store);
        for record in settings.iter() {
            assert_eq!(record.to_bytes(), [0x0F, 0x7F, 0x03, 0x3F]);
        }
    }

    #[test]
    fn when_field_is_written_it_is_mirrored_to_store() {
        let mut store = MemoryStore::filled(0);
        let mut settings = ButtonSettings::load(&mut store);

        settings.write(&mut store, 3, Field::Channel, 5).unwrap();
        settings.write(&mut store, 3, Field::Color, 0b010_101).unwrap();

        assert_eq!(store.read_field(3, Field::Channel), 5);
        assert_eq!(store.read_field(3, Field::Color), 0b010_101);
        let reloaded = ButtonSettings::load(&mut store);
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn when_written_value_exceeds_field_it_is_masked_before_storing() {
        let mut store = MemoryStore::filled(0);
        let mut settings = ButtonSettings::default();

        let written = settings.write(&mut store, 0, Field::Flags, 0x7F).unwrap();

        assert_eq!(written, 0x03);
        assert_eq!(store.read_field(0, Field::Flags), 0x03);
        assert_eq!(
            settings.get(0).unwrap().flags,
            Flags::TOGGLE.union(Flags::LED_MIDI_DRIVEN)
        );
    }

    #[test]
    fn when_index_is_out_of_range_nothing_is_written() {
        let mut store = MemoryStore::filled(0);
        let mut settings = ButtonSettings::default();

        assert_eq!(
            settings.write(&mut store, BUTTONS, Field::Channel, 1),
            Err(OutOfRange)
        );
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn records_are_accessible_by_index() {
        let mut records = [ButtonRecord::default(); BUTTONS];
        records[7].color = Color::from_packed(0b111_000);
        let settings = ButtonSettings::from_records(records);
        assert_eq!(settings.get(7).unwrap().color.up.bits(), 0b111);
        assert!(settings.get(BUTTONS).is_none());
    }
}
