//! SPI peripheral abstractions
//!
//! Provides the per-channel register view the transfer engine drives, plus
//! the clock polarity/phase vocabulary shared by configuration and framing.

/// Independent SPI peripheral instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    Spi1 = 0,
    Spi2 = 1,
    Spi3 = 2,
    Spi4 = 3,
    Spi5 = 4,
}

impl Channel {
    /// Number of channels on the peripheral
    pub const COUNT: usize = 5;

    /// All channels in index order
    pub const ALL: [Channel; Self::COUNT] = [
        Channel::Spi1,
        Channel::Spi2,
        Channel::Spi3,
        Channel::Spi4,
        Channel::Spi5,
    ];

    /// Index into per-channel tables
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Channel for a table index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// The four registers each channel exposes to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Control A: mode, framing and enable bits (CR1)
    ControlA,
    /// Control B: interrupt-enable bits (CR2)
    ControlB,
    /// Status flags (SR)
    Status,
    /// Data in/out (DR)
    Data,
}

impl Register {
    /// Byte offset from the channel's base address
    pub const fn offset(self) -> u32 {
        match self {
            Register::ControlA => 0x00,
            Register::ControlB => 0x04,
            Register::Status => 0x08,
            Register::Data => 0x0C,
        }
    }
}

/// Register view over every SPI channel
///
/// Implementations own the address table and the raw access primitives.
/// Reads of [`Register::Data`] consume the received word and reads of
/// [`Register::Status`] observe live hardware, so neither is idempotent.
pub trait SpiRegisters {
    /// Read a 16-bit register
    fn read(&mut self, channel: Channel, register: Register) -> u16;

    /// Write a 16-bit register
    fn write(&mut self, channel: Channel, register: Register, value: u16);

    /// Read-modify-write a register
    fn modify<F>(&mut self, channel: Channel, register: Register, f: F)
    where
        F: FnOnce(u16) -> u16,
    {
        let value = self.read(channel, register);
        self.write(channel, register, f(value));
    }
}

impl<T: SpiRegisters + ?Sized> SpiRegisters for &mut T {
    fn read(&mut self, channel: Channel, register: Register) -> u16 {
        (**self).read(channel, register)
    }

    fn write(&mut self, channel: Channel, register: Register, value: u16) {
        (**self).write(channel, register, value)
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    #[default]
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    #[default]
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, Phase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}
