//! Transfer engine
//!
//! Owns the register view, the select lines and one interrupt [`Slot`]
//! per channel. Foreground code calls [`Engine::execute_blocking`] or
//! [`Engine::execute_nonblocking`]; the SPI interrupt handlers call
//! [`Engine::on_interrupt`]. All entry points take `&mut self`; see
//! [`crate::SharedEngine`] for sharing one engine between contexts.

use spinel_hal::{Channel, SelectLines, SpiRegisters};

use crate::blocking::{self, SpinLimit, TransferError};
use crate::config::{ChannelConfig, ConfigTable};
use crate::interrupt::{ArmRejected, Continuation, InterruptOutcome, Slot};
use crate::regs::ChannelRegs;
use crate::transfer::Transfer;

pub struct Engine<'b, R: SpiRegisters, G: SelectLines> {
    regs: R,
    lines: G,
    spin_limit: SpinLimit,
    slots: [Slot<'b>; Channel::COUNT],
}

impl<'b, R: SpiRegisters, G: SelectLines> Engine<'b, R, G> {
    /// Engine with every channel idle and unbounded spin waits
    pub const fn new(regs: R, lines: G) -> Self {
        Self {
            regs,
            lines,
            spin_limit: SpinLimit::Unbounded,
            slots: [Slot::IDLE; Channel::COUNT],
        }
    }

    /// Bound every blocking status wait
    pub fn with_spin_limit(mut self, limit: SpinLimit) -> Self {
        self.spin_limit = limit;
        self
    }

    pub fn set_spin_limit(&mut self, limit: SpinLimit) {
        self.spin_limit = limit;
    }

    pub fn spin_limit(&self) -> SpinLimit {
        self.spin_limit
    }

    fn channel_regs(&mut self, channel: Channel) -> ChannelRegs<'_, R> {
        ChannelRegs::new(&mut self.regs, channel)
    }

    /// Program every channel from `table`
    ///
    /// Each channel is disabled first. Enabled entries then get their
    /// role, slave management, topology and baud rate bits; disabled
    /// entries keep whatever else control A held.
    pub fn apply_channel_configuration(&mut self, table: &ConfigTable) {
        for channel in Channel::ALL {
            let config = table.get(channel);
            let mut regs = self.channel_regs(channel);
            regs.disable();

            if config.enabled {
                regs.write_control_a_field(ChannelConfig::CONTROL_A_MASK, config.control_a_bits());
                debug!(
                    "{}: configured {} {} {}",
                    channel,
                    config.role,
                    config.topology,
                    config.baud_rate
                );
            }
        }
    }

    /// Return a channel to its reset state
    ///
    /// Disables the peripheral, clears both control registers and drops
    /// any armed continuation. A descriptor left in the slot can still be
    /// collected with [`Engine::take_finished`].
    pub fn deinit(&mut self, channel: Channel) {
        let mut regs = self.channel_regs(channel);
        regs.disable();
        regs.write_control_b(0);
        regs.write_control_a(0);

        let slot = &mut self.slots[channel.index()];
        if slot.is_armed() {
            warn!("{}: deinit dropped armed transfer", channel);
        }
        slot.abandon(&mut self.lines);
    }

    /// Run a transfer to completion on the calling context
    ///
    /// The descriptor's cursors advance in place. A channel with an armed
    /// interrupt-driven transfer is refused with [`TransferError::Busy`]
    /// and left untouched; stalls only occur with a finite [`SpinLimit`].
    pub fn execute_blocking(&mut self, transfer: &mut Transfer<'_>) -> Result<(), TransferError> {
        let channel = transfer.channel;
        if self.slots[channel.index()].is_armed() {
            warn!("{}: armed, blocking transfer refused", channel);
            return Err(TransferError::Busy { channel });
        }

        blocking::execute(&mut self.regs, &mut self.lines, transfer, self.spin_limit)
    }

    /// Arm a transfer and return immediately
    ///
    /// Words move in [`Engine::on_interrupt`]. Collect the descriptor
    /// with [`Engine::take_finished`] once the channel is idle.
    pub fn execute_nonblocking(&mut self, transfer: Transfer<'b>) -> Result<(), ArmRejected<'b>> {
        let channel = transfer.channel;
        let regs = ChannelRegs::new(&mut self.regs, channel);

        match self.slots[channel.index()].arm(regs, &mut self.lines, transfer) {
            Ok(continuation) => {
                trace!("{}: armed {}", channel, continuation);
                Ok(())
            }
            Err(rejected) => {
                warn!("{}: already armed, transfer rejected", channel);
                Err(rejected)
            }
        }
    }

    /// Service one interrupt event for `channel`
    pub fn on_interrupt(&mut self, channel: Channel) -> InterruptOutcome {
        let regs = ChannelRegs::new(&mut self.regs, channel);
        let outcome = self.slots[channel.index()].step(regs, &mut self.lines);

        if outcome == InterruptOutcome::Completed {
            trace!("{}: transfer complete", channel);
        }

        outcome
    }

    /// True while a continuation is armed on `channel`
    pub fn is_armed(&self, channel: Channel) -> bool {
        self.slots[channel.index()].is_armed()
    }

    pub fn continuation(&self, channel: Channel) -> Continuation {
        self.slots[channel.index()].continuation()
    }

    /// Take back a non-blocking descriptor once its channel is idle
    pub fn take_finished(&mut self, channel: Channel) -> Option<Transfer<'b>> {
        self.slots[channel.index()].take_finished()
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn lines_mut(&mut self) -> &mut G {
        &mut self.lines
    }

    /// Give back the register view and select lines
    pub fn release(self) -> (R, G) {
        (self.regs, self.lines)
    }
}
