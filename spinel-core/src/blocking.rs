//! Blocking executor
//!
//! Runs a transfer to completion on the calling context by spinning on
//! status flags. The peripheral is enabled before the algorithm starts and
//! disabled after it returns; in master role the slave-select line
//! brackets the whole call.
//!
//! The default [`SpinLimit::Unbounded`] never gives up, so a peer that
//! never answers hangs the caller. A finite limit turns that hang into
//! [`TransferError::Stalled`].

use spinel_hal::{Channel, SelectLines, SpiRegisters};

use crate::dispatch::{dispatch, is_master, Algorithm};
use crate::frame::configure_frame;
use crate::regs::{sr, ChannelRegs};
use crate::select::{assert_slave, release_slave};
use crate::transfer::Transfer;

/// How long a status wait may spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpinLimit {
    /// Spin until the flag is observed
    #[default]
    Unbounded,
    /// Give up after this many status reads
    Polls(u32),
}

/// Status condition a blocking wait spins on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusFlag {
    /// TXE set
    TransmitEmpty,
    /// RXNE set
    ReceiveNotEmpty,
    /// BSY clear
    Idle,
}

impl StatusFlag {
    /// Whether a status register value satisfies this condition
    pub fn satisfied(self, status: u16) -> bool {
        match self {
            StatusFlag::TransmitEmpty => status & sr::TXE != 0,
            StatusFlag::ReceiveNotEmpty => status & sr::RXNE != 0,
            StatusFlag::Idle => status & sr::BSY == 0,
        }
    }
}

/// Transfer execution errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// A status wait exhausted its [`SpinLimit`]
    Stalled { channel: Channel, flag: StatusFlag },
    /// The channel still has an interrupt-driven transfer armed
    Busy { channel: Channel },
}

/// Status-flag waits for one channel
struct Waiter<'r, R: SpiRegisters> {
    regs: ChannelRegs<'r, R>,
    limit: SpinLimit,
}

impl<R: SpiRegisters> Waiter<'_, R> {
    fn wait(&mut self, flag: StatusFlag) -> Result<(), TransferError> {
        let mut polls: u32 = 0;
        loop {
            if flag.satisfied(self.regs.status()) {
                return Ok(());
            }

            if let SpinLimit::Polls(max) = self.limit {
                polls += 1;
                if polls >= max {
                    return Err(TransferError::Stalled {
                        channel: self.regs.channel(),
                        flag,
                    });
                }
            }

            core::hint::spin_loop();
        }
    }

    fn transmit(&mut self, transfer: &mut Transfer<'_>) {
        let word = transfer.next_tx_word();
        self.regs.write_data(word);
    }

    fn receive(&mut self, transfer: &mut Transfer<'_>) {
        let word = self.regs.read_data();
        transfer.store_rx_word(word);
    }

    fn bidir_transmit(&mut self, t: &mut Transfer<'_>) -> Result<(), TransferError> {
        self.transmit(t);
        while t.tx_remaining() > 0 {
            self.wait(StatusFlag::TransmitEmpty)?;
            self.transmit(t);
        }
        self.wait(StatusFlag::TransmitEmpty)?;
        self.wait(StatusFlag::Idle)
    }

    fn receive_all(&mut self, t: &mut Transfer<'_>) -> Result<(), TransferError> {
        while t.rx_remaining() > 0 {
            self.wait(StatusFlag::ReceiveNotEmpty)?;
            self.receive(t);
        }
        Ok(())
    }

    fn receive_only(&mut self, t: &mut Transfer<'_>) -> Result<(), TransferError> {
        self.receive_all(t)?;
        self.wait(StatusFlag::Idle)
    }

    /// Write one word ahead of each read so the data register never
    /// overruns, then drain the last word after the loop.
    fn full_duplex_master(&mut self, t: &mut Transfer<'_>) -> Result<(), TransferError> {
        self.transmit(t);
        while t.rx_remaining() > 1 {
            self.wait(StatusFlag::TransmitEmpty)?;
            self.transmit(t);
            self.wait(StatusFlag::ReceiveNotEmpty)?;
            self.receive(t);
        }
        self.wait(StatusFlag::ReceiveNotEmpty)?;
        self.receive(t);
        self.wait(StatusFlag::TransmitEmpty)?;
        self.wait(StatusFlag::Idle)
    }

    /// The peer drives the clock, so receive before every transmit.
    fn full_duplex_slave(&mut self, t: &mut Transfer<'_>) -> Result<(), TransferError> {
        self.wait(StatusFlag::ReceiveNotEmpty)?;
        self.receive(t);
        while t.tx_remaining() > 1 {
            self.wait(StatusFlag::ReceiveNotEmpty)?;
            self.receive(t);
            self.wait(StatusFlag::TransmitEmpty)?;
            self.transmit(t);
        }
        self.wait(StatusFlag::TransmitEmpty)?;
        self.transmit(t);
        // Trailing clock edge of the final word
        self.wait(StatusFlag::ReceiveNotEmpty)?;
        self.wait(StatusFlag::Idle)
    }
}

/// Run `algorithm` on an already enabled channel
///
/// Missing single-wire or receive-only buffers are a silent no-op.
/// Full-duplex panics unless both buffers are present with equal,
/// non-zero length.
pub fn run_algorithm<R: SpiRegisters>(
    regs: ChannelRegs<'_, R>,
    transfer: &mut Transfer<'_>,
    algorithm: Algorithm,
    limit: SpinLimit,
) -> Result<(), TransferError> {
    let mut waiter = Waiter { regs, limit };

    match algorithm {
        Algorithm::BidirTransmit => {
            if !transfer.has_tx_words() {
                return Ok(());
            }
            waiter.bidir_transmit(transfer)
        }
        Algorithm::BidirReceive => {
            if transfer.rx.is_none() {
                return Ok(());
            }
            waiter.receive_all(transfer)
        }
        Algorithm::ReceiveOnly => {
            if transfer.rx.is_none() {
                return Ok(());
            }
            waiter.receive_only(transfer)
        }
        Algorithm::FullDuplexMaster => {
            transfer.assert_full_duplex();
            waiter.full_duplex_master(transfer)
        }
        Algorithm::FullDuplexSlave => {
            transfer.assert_full_duplex();
            waiter.full_duplex_slave(transfer)
        }
    }
}

/// Frame, select, enable, run, release, disable
///
/// On a stall the slave line is still released and the peripheral
/// disabled before the error is returned.
///
/// # Panics
///
/// Full-duplex transfers without equal, non-zero tx and rx lengths panic
/// before the slave is selected or the peripheral enabled.
pub fn execute<R: SpiRegisters, G: SelectLines>(
    regs: &mut R,
    lines: &mut G,
    transfer: &mut Transfer<'_>,
    limit: SpinLimit,
) -> Result<(), TransferError> {
    let channel = transfer.channel;

    let mut ch = ChannelRegs::new(regs, channel);
    configure_frame(&mut ch, transfer);
    let control_a = ch.control_a();
    let master = is_master(control_a);
    let algorithm = dispatch(control_a);

    trace!("{}: blocking {}", channel, algorithm);

    if matches!(algorithm, Algorithm::FullDuplexMaster | Algorithm::FullDuplexSlave) {
        transfer.assert_full_duplex();
    }

    if master {
        assert_slave(lines, &transfer.slave);
    }
    ch.enable();

    let result = run_algorithm(ChannelRegs::new(regs, channel), transfer, algorithm, limit);

    if master {
        release_slave(lines, &transfer.slave);
    }
    ChannelRegs::new(regs, channel).disable();

    if let Err(TransferError::Stalled { flag, .. }) = result {
        warn!("{}: stalled waiting for {}", channel, flag);
    }

    result
}
