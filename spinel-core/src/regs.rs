//! Register bit layout and per-channel register view
//!
//! The layout matches the STM32F4 SPI block: 16-bit CR1/CR2/SR/DR at
//! offsets 0x00/0x04/0x08/0x0C from each channel's base.

use spinel_hal::{Channel, Register, SpiRegisters};

/// Control A (CR1) bits
pub mod cr1 {
    /// Clock phase
    pub const CPHA: u16 = 1 << 0;
    /// Clock polarity
    pub const CPOL: u16 = 1 << 1;
    /// Master selection
    pub const MSTR: u16 = 1 << 2;
    /// Baud rate divisor field position
    pub const BR_POS: u16 = 3;
    /// Baud rate divisor field (3 bits)
    pub const BR: u16 = 0b111 << BR_POS;
    /// Peripheral enable
    pub const SPE: u16 = 1 << 6;
    /// LSB transmitted first
    pub const LSBFIRST: u16 = 1 << 7;
    /// Internal slave select (software slave management)
    pub const SSI: u16 = 1 << 8;
    /// Software slave management
    pub const SSM: u16 = 1 << 9;
    /// Receive only (two-wire)
    pub const RXONLY: u16 = 1 << 10;
    /// Data frame format (0 = 8-bit, 1 = 16-bit)
    pub const DFF: u16 = 1 << 11;
    /// Output enable in bidirectional mode (1 = transmit)
    pub const BIDIOE: u16 = 1 << 14;
    /// Bidirectional (single-wire) data mode
    pub const BIDIMODE: u16 = 1 << 15;
}

/// Control B (CR2) bits
pub mod cr2 {
    /// SS output enable
    pub const SSOE: u16 = 1 << 2;
    /// Error interrupt enable
    pub const ERRIE: u16 = 1 << 5;
    /// RX buffer not empty interrupt enable
    pub const RXNEIE: u16 = 1 << 6;
    /// TX buffer empty interrupt enable
    pub const TXEIE: u16 = 1 << 7;
}

/// Status (SR) bits
pub mod sr {
    /// Receive buffer not empty
    pub const RXNE: u16 = 1 << 0;
    /// Transmit buffer empty
    pub const TXE: u16 = 1 << 1;
    /// Mode fault
    pub const MODF: u16 = 1 << 5;
    /// Overrun
    pub const OVR: u16 = 1 << 6;
    /// Busy
    pub const BSY: u16 = 1 << 7;
}

/// Register view bound to one channel
pub struct ChannelRegs<'r, R: SpiRegisters> {
    regs: &'r mut R,
    channel: Channel,
}

impl<'r, R: SpiRegisters> ChannelRegs<'r, R> {
    pub fn new(regs: &'r mut R, channel: Channel) -> Self {
        Self { regs, channel }
    }

    /// Channel this view addresses
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Current control A value
    pub fn control_a(&mut self) -> u16 {
        self.regs.read(self.channel, Register::ControlA)
    }

    /// Overwrite control A
    pub fn write_control_a(&mut self, value: u16) {
        self.regs.write(self.channel, Register::ControlA, value);
    }

    /// Set or clear `mask` in control A
    pub fn assign_control_a(&mut self, mask: u16, set: bool) {
        self.regs.modify(self.channel, Register::ControlA, |v| {
            if set {
                v | mask
            } else {
                v & !mask
            }
        });
    }

    /// Replace the bits selected by `mask` in control A with `value`
    pub fn write_control_a_field(&mut self, mask: u16, value: u16) {
        self.regs
            .modify(self.channel, Register::ControlA, |v| (v & !mask) | (value & mask));
    }

    /// Overwrite control B
    pub fn write_control_b(&mut self, value: u16) {
        self.regs.write(self.channel, Register::ControlB, value);
    }

    /// Enable the interrupt sources in `mask`
    pub fn enable_interrupts(&mut self, mask: u16) {
        self.regs
            .modify(self.channel, Register::ControlB, |v| v | mask);
    }

    /// Disable the interrupt sources in `mask`
    pub fn disable_interrupts(&mut self, mask: u16) {
        self.regs
            .modify(self.channel, Register::ControlB, |v| v & !mask);
    }

    /// Sample the status register
    pub fn status(&mut self) -> u16 {
        self.regs.read(self.channel, Register::Status)
    }

    /// Read one word from the data register
    pub fn read_data(&mut self) -> u16 {
        self.regs.read(self.channel, Register::Data)
    }

    /// Write one word to the data register
    pub fn write_data(&mut self, word: u16) {
        self.regs.write(self.channel, Register::Data, word);
    }

    /// Set SPE
    pub fn enable(&mut self) {
        self.assign_control_a(cr1::SPE, true);
    }

    /// Clear SPE
    pub fn disable(&mut self) {
        self.assign_control_a(cr1::SPE, false);
    }
}
