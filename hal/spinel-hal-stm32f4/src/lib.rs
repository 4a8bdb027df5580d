//! STM32F4-specific HAL for the Spinel SPI engine
//!
//! Implements the `spinel-hal` capability traits on top of the STM32F4 SPI
//! register blocks and embassy-stm32 GPIO outputs:
//!
//! - [`Stm32Spi`]: volatile register access to SPI1..SPI5 with address
//!   range checks
//! - [`SelectPin`]: an embassy-stm32 `Output` usable in a `PinBank`
//!
//! # Features
//!
//! - `stm32f411ce` - STM32F411CE (all five SPI blocks)
//! - `stm32f401cc` - STM32F401CC (SPI1..SPI4; SPI5 is not present)
//! - `defmt` - Enable debug formatting support
//!
//! # Usage
//!
//! Let embassy-stm32 bring each block up (clock gate, pin alternate
//! functions) through its SPI driver, keep that driver alive, then hand
//! register control to the engine through [`Stm32Spi`].

#![no_std]

pub mod gpio;
pub mod registers;

pub use gpio::{SelectBank, SelectPin};
pub use registers::Stm32Spi;
