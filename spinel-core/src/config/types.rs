//! Channel configuration types
//!
//! One-time startup configuration applied to every channel with the
//! peripheral disabled. Tables can be persisted as postcard binary data.

use spinel_hal::Channel;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::regs::cr1;

/// Current config table format version
pub const CONFIG_VERSION: u8 = 1;

/// Master/slave role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Role {
    Slave,
    #[default]
    Master,
}

/// Slave-select management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SlaveManagement {
    /// NSS pin managed by hardware
    Hardware,
    /// NSS managed in software (the engine drives a GPIO line)
    #[default]
    Software,
}

/// Data line topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Topology {
    /// Two lines, simultaneous transmit and receive
    #[default]
    FullDuplex,
    /// Two lines, transmission suppressed
    ReceiveOnly,
    /// One shared line, direction chosen per transfer
    Bidirectional,
}

/// Peripheral clock divisor for SCK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum BaudRate {
    Div2 = 0,
    Div4 = 1,
    #[default]
    Div8 = 2,
    Div16 = 3,
    Div32 = 4,
    Div64 = 5,
    Div128 = 6,
    Div256 = 7,
}

impl BaudRate {
    /// Value of the BR field
    pub const fn bits(self) -> u16 {
        self as u16
    }

    /// Divisor applied to the peripheral clock
    pub const fn divisor(self) -> u32 {
        2 << (self as u32)
    }

    /// Smallest divisor whose SCK does not exceed `target_hz`
    ///
    /// Falls back to [`BaudRate::Div256`] when even that is too fast.
    pub fn for_frequency(pclk_hz: u32, target_hz: u32) -> Self {
        const ALL: [BaudRate; 8] = [
            BaudRate::Div2,
            BaudRate::Div4,
            BaudRate::Div8,
            BaudRate::Div16,
            BaudRate::Div32,
            BaudRate::Div64,
            BaudRate::Div128,
            BaudRate::Div256,
        ];
        ALL.into_iter()
            .find(|br| pclk_hz / br.divisor() <= target_hz)
            .unwrap_or(BaudRate::Div256)
    }
}

/// Startup configuration of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelConfig {
    /// Channels left disabled keep their reset configuration
    pub enabled: bool,
    pub role: Role,
    pub slave_management: SlaveManagement,
    pub topology: Topology,
    pub baud_rate: BaudRate,
}

impl ChannelConfig {
    /// Disabled channel
    pub const DISABLED: Self = Self {
        enabled: false,
        role: Role::Master,
        slave_management: SlaveManagement::Software,
        topology: Topology::FullDuplex,
        baud_rate: BaudRate::Div8,
    };

    /// Enabled master with software slave management
    pub const fn master(topology: Topology, baud_rate: BaudRate) -> Self {
        Self {
            enabled: true,
            role: Role::Master,
            slave_management: SlaveManagement::Software,
            topology,
            baud_rate,
        }
    }

    /// Enabled slave with hardware slave management
    pub const fn slave(topology: Topology) -> Self {
        Self {
            enabled: true,
            role: Role::Slave,
            slave_management: SlaveManagement::Hardware,
            topology,
            baud_rate: BaudRate::Div2,
        }
    }

    /// CR1 bits this configuration owns
    pub const CONTROL_A_MASK: u16 =
        cr1::MSTR | cr1::SSM | cr1::SSI | cr1::BIDIMODE | cr1::RXONLY | cr1::BR;

    /// CR1 value for the bits in [`Self::CONTROL_A_MASK`]
    pub fn control_a_bits(&self) -> u16 {
        let mut bits = self.baud_rate.bits() << cr1::BR_POS;

        if self.role == Role::Master {
            bits |= cr1::MSTR;
        }

        if self.slave_management == SlaveManagement::Software {
            bits |= cr1::SSM;
            // With SSM, a master must hold its internal NSS high or it
            // faults straight away.
            if self.role == Role::Master {
                bits |= cr1::SSI;
            }
        }

        match self.topology {
            Topology::Bidirectional => bits |= cr1::BIDIMODE,
            Topology::ReceiveOnly => bits |= cr1::RXONLY,
            Topology::FullDuplex => {}
        }

        bits
    }
}

/// Configuration for every channel
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigTable {
    /// Format version, checked when loading persisted tables
    pub version: u8,
    pub channels: [ChannelConfig; Channel::COUNT],
}

impl Default for ConfigTable {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            channels: [ChannelConfig::DISABLED; Channel::COUNT],
        }
    }
}

impl ConfigTable {
    /// Table from per-channel entries in channel order
    pub const fn new(channels: [ChannelConfig; Channel::COUNT]) -> Self {
        Self {
            version: CONFIG_VERSION,
            channels,
        }
    }

    /// Configuration of `channel`
    pub fn get(&self, channel: Channel) -> &ChannelConfig {
        &self.channels[channel.index()]
    }

    /// Replace the configuration of `channel`
    pub fn set(&mut self, channel: Channel, config: ChannelConfig) {
        self.channels[channel.index()] = config;
    }

    /// Builder-style [`ConfigTable::set`]
    pub fn with(mut self, channel: Channel, config: ChannelConfig) -> Self {
        self.set(channel, config);
        self
    }

    /// Enabled channels with their configuration
    pub fn enabled(&self) -> impl Iterator<Item = (Channel, &ChannelConfig)> {
        Channel::ALL
            .into_iter()
            .zip(self.channels.iter())
            .filter(|(_, cfg)| cfg.enabled)
    }
}
