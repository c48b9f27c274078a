//! Persistence of the button table on sector-erasable flash.
//!
//! Microcontrollers without EEPROM cannot rewrite a single byte in place.
//! Here the whole table is kept in RAM and every change writes a complete,
//! checksummed image into the next sector. On startup, the image with the
//! highest version wins. Rotating through sectors spreads the wear.

use crc::{Crc, CRC_16_USB};

use crate::button::Field;
use crate::geometry::BUTTONS;
use crate::layout;
use crate::log;
use crate::settings::PersistentStore;

const RECORD_SIZE: usize = Field::ALL.len();
const SAVE_SIZE: usize = BUTTONS * RECORD_SIZE;

// This constant is used to invalidate data when needed
const TOKEN: u16 = 1;
const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_USB);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidData;

/// Flash memory split into equally sized sectors.
pub trait Flash {
    /// Number of sectors available for saves. Each must fit `Image::SIZE`.
    /// Without any sectors, changes are kept only in RAM.
    fn sectors(&self) -> usize;

    fn read(&mut self, sector: usize, buffer: &mut [u8]);

    /// Erase the sector and program it with the data.
    fn write(&mut self, sector: usize, data: &[u8]);
}

/// Serialized button table with its version and checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Image {
    version: u32,
    save: [u8; SAVE_SIZE],
}

impl Image {
    pub const SIZE: usize = 4 + 2 + SAVE_SIZE + 2;

    #[must_use]
    pub fn new(save: [u8; SAVE_SIZE], version: u32) -> Self {
        Self { version, save }
    }

    /// # Errors
    ///
    /// This fails with `InvalidData` when the token does not match or the
    /// recovered save does not pass CRC check.
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Result<Self, InvalidData> {
        let token = u16::from_le_bytes([bytes[4], bytes[5]]);
        if token != TOKEN {
            return Err(InvalidData);
        }

        let mut save = [0; SAVE_SIZE];
        save.copy_from_slice(&bytes[6..6 + SAVE_SIZE]);
        let crc = u16::from_le_bytes([bytes[Self::SIZE - 2], bytes[Self::SIZE - 1]]);
        if CRC.checksum(&save) != crc {
            return Err(InvalidData);
        }

        let version = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(Self { version, save })
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];
        bytes[..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..6].copy_from_slice(&TOKEN.to_le_bytes());
        bytes[6..6 + SAVE_SIZE].copy_from_slice(&self.save);
        bytes[Self::SIZE - 2..].copy_from_slice(&CRC.checksum(&self.save).to_le_bytes());
        bytes
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[must_use]
    pub fn save(&self) -> &[u8; SAVE_SIZE] {
        &self.save
    }
}

/// `PersistentStore` on top of flash.
pub struct PagedStore<F> {
    flash: F,
    version: u32,
    save: [u8; SAVE_SIZE],
}

impl<F: Flash> PagedStore<F> {
    /// Recover the latest valid save, falling back to the default layout.
    pub fn new(mut flash: F) -> Self {
        let mut latest: Option<Image> = None;

        for sector in 0..flash.sectors() {
            let mut buffer = [0; Image::SIZE];
            flash.read(sector, &mut buffer);

            if let Ok(image) = Image::from_bytes(&buffer) {
                if latest.map_or(true, |latest| image.version() > latest.version()) {
                    latest = Some(image);
                }
            }
        }

        if let Some(latest) = latest {
            log::info!("Loaded save version={=u32}", latest.version());
            Self {
                flash,
                version: latest.version().wrapping_add(1),
                save: *latest.save(),
            }
        } else {
            log::info!("No valid save was found");
            Self {
                flash,
                version: 0,
                save: default_save(),
            }
        }
    }

    fn store(&mut self) {
        let sectors = self.flash.sectors();
        if sectors == 0 {
            log::warning!("No flash sectors, the change is not saved");
            return;
        }
        log::debug!("Saving version={=u32}", self.version);
        let data = Image::new(self.save, self.version).to_bytes();
        self.flash.write(self.version as usize % sectors, &data);
        self.version = self.version.wrapping_add(1);
    }

    pub fn into_flash(self) -> F {
        self.flash
    }
}

impl<F: Flash> PersistentStore for PagedStore<F> {
    fn read_field(&mut self, index: usize, field: Field) -> u8 {
        self.save
            .get(index * RECORD_SIZE + field.offset())
            .copied()
            .unwrap_or(0)
    }

    fn write_field(&mut self, index: usize, field: Field, value: u8) {
        let Some(byte) = self.save.get_mut(index * RECORD_SIZE + field.offset()) else {
            return;
        };
        // Spare the flash when nothing changes.
        if *byte != value {
            *byte = value;
            self.store();
        }
    }
}

fn default_save() -> [u8; SAVE_SIZE] {
    let mut save = [0; SAVE_SIZE];
    for (chunk, record) in save
        .chunks_exact_mut(RECORD_SIZE)
        .zip(layout::default_records())
    {
        chunk.copy_from_slice(&record.to_bytes());
    }
    save
}
