//! Board-agnostic SPI transfer engine
//!
//! This crate contains the transfer logic that does not depend on a
//! specific chip:
//!
//! - Control/status register bit layout
//! - Transfer descriptors and word buffers
//! - Frame configuration and slave-select sequencing
//! - Mode dispatch (single-wire, receive-only, full-duplex master/slave)
//! - Blocking executor (busy-wait on status flags)
//! - Interrupt-driven scheduler (one word per interrupt event)
//! - Per-channel configuration table
//!
//! Register and GPIO access come from the capability traits in `spinel-hal`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This must go first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod blocking;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod frame;
pub mod interrupt;
pub mod regs;
pub mod select;
pub mod shared;
pub mod transfer;

#[cfg(test)]
mod sim;

pub use blocking::{SpinLimit, StatusFlag, TransferError};
pub use config::{ChannelConfig, ConfigError, ConfigTable};
pub use dispatch::Algorithm;
pub use engine::Engine;
pub use interrupt::{ArmRejected, Continuation, InterruptOutcome};
pub use shared::SharedEngine;
pub use transfer::{
    BidirDirection, BitOrder, FrameFormat, RxBuffer, SelectPolarity, SlaveSelect, Transfer,
    TxBuffer, WordWidth,
};

pub use spinel_hal::{Channel, Level, PinId, SelectLines, SpiRegisters};
