//! SPI register blocks
//!
//! Each channel owns a 1 KiB block on the APB bus. Only the first nine
//! 32-bit registers exist; the engine touches CR1, CR2, SR and DR, whose
//! upper halves are reserved.

use core::ptr;

use spinel_hal::{Channel, Register, SpiRegisters};

/// SPI1 base address (APB2)
pub const SPI1_BASE: usize = 0x4001_3000;
/// SPI2 base address (APB1)
pub const SPI2_BASE: usize = 0x4000_3800;
/// SPI3 base address (APB1)
pub const SPI3_BASE: usize = 0x4000_3C00;
/// SPI4 base address (APB2)
pub const SPI4_BASE: usize = 0x4001_3400;
/// SPI5 base address (APB2)
pub const SPI5_BASE: usize = 0x4001_5000;

/// Size of the register space decoded for one SPI block
pub const REGISTER_SPAN: usize = 0x24;

/// Base address of a channel's register block
pub const fn base(channel: Channel) -> usize {
    match channel {
        Channel::Spi1 => SPI1_BASE,
        Channel::Spi2 => SPI2_BASE,
        Channel::Spi3 => SPI3_BASE,
        Channel::Spi4 => SPI4_BASE,
        Channel::Spi5 => SPI5_BASE,
    }
}

/// Absolute address of `register` on `channel`
pub const fn address(channel: Channel, register: Register) -> usize {
    base(channel) + register.offset() as usize
}

/// True if `address` is a word-aligned register inside some SPI block
pub fn is_spi_register(address: usize) -> bool {
    address % 4 == 0
        && Channel::ALL.iter().any(|ch| {
            let base = base(*ch);
            address >= base && address < base + REGISTER_SPAN
        })
}

/// Read the low half-word of an SPI register
///
/// # Panics
///
/// If `address` is not an SPI register.
pub fn register_read(address: usize) -> u16 {
    assert!(
        is_spi_register(address),
        "SPI register read outside peripheral range"
    );
    // SAFETY: the address was checked against the SPI register map above,
    // and SPI registers tolerate 32-bit volatile access.
    unsafe { ptr::read_volatile(address as *const u32) as u16 }
}

/// Write the low half-word of an SPI register
///
/// # Panics
///
/// If `address` is not an SPI register.
pub fn register_write(address: usize, value: u16) {
    assert!(
        is_spi_register(address),
        "SPI register write outside peripheral range"
    );
    // SAFETY: as in `register_read`; the reserved upper half is written as 0.
    unsafe { ptr::write_volatile(address as *mut u32, value as u32) }
}

/// Register view over the on-chip SPI blocks
///
/// Holding one of these means the engine owns CR1/CR2/DR of every block
/// it is asked about. Blocks still used through embassy-stm32's own SPI
/// transfer methods must not be passed to the engine.
#[derive(Debug)]
pub struct Stm32Spi {
    _private: (),
}

impl Stm32Spi {
    /// Create the register view
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for Stm32Spi {
    fn default() -> Self {
        Self::new()
    }
}

impl SpiRegisters for Stm32Spi {
    fn read(&mut self, channel: Channel, register: Register) -> u16 {
        register_read(address(channel, register))
    }

    fn write(&mut self, channel: Channel, register: Register, value: u16) {
        register_write(address(channel, register), value);
    }
}
