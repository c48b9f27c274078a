//! Per-button MIDI mapping and indicator colors.
//!
//! All of these are stored and transferred as raw bytes. Packing and
//! unpacking happens only on the boundary with persistent storage and the
//! SysEx protocol, everything else works with the typed values.

/// State of a single RGB lamp, one bit per color.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb(u8);

impl Rgb {
    pub const OFF: Self = Self(0);

    /// Build the lamp state from the lowest 3 bits, the rest is ignored.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Colors shown while the button is up and while it is down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub up: Rgb,
    pub down: Rgb,
}

impl Color {
    const MASK: u8 = 0x3F;

    /// Unpack `00 uuu ddd`.
    #[must_use]
    pub const fn from_packed(packed: u8) -> Self {
        Self {
            up: Rgb::from_bits(packed >> 3),
            down: Rgb::from_bits(packed),
        }
    }

    #[must_use]
    pub const fn packed(self) -> u8 {
        (self.up.bits() << 3) | self.down.bits()
    }

    #[must_use]
    pub fn for_state(self, down: bool) -> Rgb {
        if down {
            self.down
        } else {
            self.up
        }
    }
}

/// Behavior options of a button.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Flags(u8);

impl Flags {
    /// The LED is driven by incoming Control Change messages instead of
    /// the button's own state.
    pub const LED_MIDI_DRIVEN: Self = Self(0x1);
    /// Every press flips the button between on and off. Otherwise the
    /// button is momentary.
    pub const TOGGLE: Self = Self(0x2);

    const ALL: u8 = Self::LED_MIDI_DRIVEN.0 | Self::TOGGLE.0;

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Keep only known flags, unknown bits are dropped.
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub fn is_toggle(self) -> bool {
        self.contains(Self::TOGGLE)
    }

    #[must_use]
    pub fn is_led_midi_driven(self) -> bool {
        self.contains(Self::LED_MIDI_DRIVEN)
    }
}

/// Configuration of a single button.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonRecord {
    pub channel: u8,
    pub controller_number: u8,
    pub flags: Flags,
    pub color: Color,
}

/// Individually stored byte of `ButtonRecord`, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Channel,
    ControllerNumber,
    Flags,
    Color,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Channel,
        Field::ControllerNumber,
        Field::Flags,
        Field::Color,
    ];

    /// Bits of the raw byte that carry information for this field.
    #[must_use]
    pub fn mask(self) -> u8 {
        match self {
            Field::Channel => 0x0F,
            Field::ControllerNumber => 0x7F,
            Field::Flags => Flags::ALL,
            Field::Color => Color::MASK,
        }
    }

    /// Position of the field in a serialized record.
    #[must_use]
    pub fn offset(self) -> usize {
        self as usize
    }
}

impl ButtonRecord {
    /// Raw, packed value of the given field.
    #[must_use]
    pub fn get(&self, field: Field) -> u8 {
        match field {
            Field::Channel => self.channel,
            Field::ControllerNumber => self.controller_number,
            Field::Flags => self.flags.bits(),
            Field::Color => self.color.packed(),
        }
    }

    /// Set a field from a raw byte, masking it to the field's width.
    pub fn set(&mut self, field: Field, raw: u8) {
        let value = raw & field.mask();
        match field {
            Field::Channel => self.channel = value,
            Field::ControllerNumber => self.controller_number = value,
            Field::Flags => self.flags = Flags::from_bits_truncate(value),
            Field::Color => self.color = Color::from_packed(value),
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; 4] {
        Field::ALL.map(|field| self.get(field))
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        let mut record = Self::default();
        for field in Field::ALL {
            record.set(field, bytes[field.offset()]);
        }
        record
    }
}
