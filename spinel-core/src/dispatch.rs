//! Mode dispatcher
//!
//! Selects the transfer algorithm from three independent CR1 fields.
//! Single-wire takes precedence over receive-only when both are set.

use crate::regs::cr1;

/// Transfer algorithm selected for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Algorithm {
    /// Single-wire, output enabled
    BidirTransmit,
    /// Single-wire, output disabled
    BidirReceive,
    /// Two-wire with transmission suppressed
    ReceiveOnly,
    /// Two-wire, this channel drives the clock
    FullDuplexMaster,
    /// Two-wire, clock driven by the peer
    FullDuplexSlave,
}

/// True when the channel generates the clock and owns slave select
pub fn is_master(control_a: u16) -> bool {
    control_a & cr1::MSTR != 0
}

/// Pick the algorithm for the current control A value
pub fn dispatch(control_a: u16) -> Algorithm {
    if control_a & cr1::BIDIMODE != 0 {
        if control_a & cr1::BIDIOE != 0 {
            Algorithm::BidirTransmit
        } else {
            Algorithm::BidirReceive
        }
    } else if control_a & cr1::RXONLY != 0 {
        Algorithm::ReceiveOnly
    } else if is_master(control_a) {
        Algorithm::FullDuplexMaster
    } else {
        Algorithm::FullDuplexSlave
    }
}
