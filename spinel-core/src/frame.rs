//! Frame configurator
//!
//! Writes the per-transfer framing fields into control A before either
//! executor runs. Pure read-modify-write of CPOL, CPHA, DFF and LSBFIRST,
//! plus BIDIOE when the channel is in single-wire topology.

use spinel_hal::spi::{Phase, Polarity};
use spinel_hal::SpiRegisters;

use crate::regs::{cr1, ChannelRegs};
use crate::transfer::{BidirDirection, BitOrder, FrameFormat, Transfer, WordWidth};

/// CR1 bits derived from a frame format
pub fn frame_bits(frame: &FrameFormat) -> u16 {
    let mut bits = 0;

    if frame.polarity == Polarity::IdleHigh {
        bits |= cr1::CPOL;
    }
    if frame.phase == Phase::CaptureOnSecondTransition {
        bits |= cr1::CPHA;
    }
    if frame.width == WordWidth::Bits16 {
        bits |= cr1::DFF;
    }
    if frame.bit_order == BitOrder::LsbFirst {
        bits |= cr1::LSBFIRST;
    }

    bits
}

/// Apply the descriptor's framing to its channel
pub fn configure_frame<R: SpiRegisters>(regs: &mut ChannelRegs<'_, R>, transfer: &Transfer<'_>) {
    const FRAME_MASK: u16 = cr1::CPOL | cr1::CPHA | cr1::DFF | cr1::LSBFIRST;

    regs.write_control_a_field(FRAME_MASK, frame_bits(&transfer.frame));

    if regs.control_a() & cr1::BIDIMODE != 0 {
        regs.assign_control_a(
            cr1::BIDIOE,
            transfer.direction == BidirDirection::Transmit,
        );
    }
}
