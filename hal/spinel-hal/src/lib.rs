//! Spinel Hardware Abstraction Layer
//!
//! This crate defines the capabilities the SPI transfer engine needs from
//! the chip it runs on. Chip-specific HALs (STM32F4, host simulators, etc.)
//! implement them so the engine in `spinel-core` stays board-agnostic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (spinel-firmware, etc.)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  spinel-core (transfer engine)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  spinel-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  spinel-hal-  │
//!             │    stm32f4    │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`spi::SpiRegisters`] - Per-channel register view (CR1, CR2, SR, DR)
//! - [`gpio::SelectLines`] - Slave-select line capability
//! - [`gpio::OutputPin`] - Single digital output

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use gpio::{Level, OutputPin, PinBank, PinId, SelectLines};
pub use spi::{Channel, Register, SpiRegisters};
