//! Interrupt-driven scheduler
//!
//! Arming a channel stores the descriptor in its [`Slot`], selects a
//! [`Continuation`], enables the matching status interrupts and the
//! peripheral, then returns. Each interrupt event runs the continuation
//! once: one status read, at most one word moved.
//!
//! Per channel the slot goes `IDLE -> ARMED -> IDLE`. The last transition
//! happens inside the continuation, which disables the interrupts and
//! the peripheral and releases the slave line if arming asserted it.
//!
//! Receive continuations complete in the same event that stores the last
//! word, since the receive flag never fires again afterwards. Transmit
//! and full-duplex continuations complete on the event after both counts
//! reach zero. An event whose flag is not set while work remains leaves
//! the transfer armed.

use spinel_hal::{SelectLines, SpiRegisters};

use crate::dispatch::{dispatch, is_master, Algorithm};
use crate::frame::configure_frame;
use crate::regs::{cr2, sr, ChannelRegs};
use crate::select::{assert_slave, release_slave};
use crate::transfer::Transfer;

/// Work scheduled for the next interrupt event on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Continuation {
    /// Nothing armed
    #[default]
    None,
    BidirTransmit,
    BidirReceive,
    ReceiveOnly,
    /// Both roles share one continuation
    FullDuplex,
}

impl From<Algorithm> for Continuation {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::BidirTransmit => Continuation::BidirTransmit,
            Algorithm::BidirReceive => Continuation::BidirReceive,
            Algorithm::ReceiveOnly => Continuation::ReceiveOnly,
            Algorithm::FullDuplexMaster | Algorithm::FullDuplexSlave => Continuation::FullDuplex,
        }
    }
}

impl Continuation {
    /// Status interrupts this continuation is driven by
    pub fn interrupt_mask(self) -> u16 {
        match self {
            Continuation::None => 0,
            Continuation::BidirTransmit => cr2::TXEIE,
            Continuation::BidirReceive | Continuation::ReceiveOnly => cr2::RXNEIE,
            Continuation::FullDuplex => cr2::TXEIE | cr2::RXNEIE,
        }
    }
}

/// Result of one interrupt event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptOutcome {
    /// No transfer armed, nothing touched
    Idle,
    /// The transfer is still armed
    Progressed,
    /// This event completed the transfer
    Completed,
}

/// A channel already had an armed transfer
#[derive(Debug)]
pub struct ArmRejected<'b> {
    /// The descriptor that was not armed
    pub transfer: Transfer<'b>,
}

/// Per-channel interrupt state
#[derive(Debug)]
pub struct Slot<'b> {
    transfer: Option<Transfer<'b>>,
    continuation: Continuation,
    slave_asserted: bool,
}

impl<'b> Slot<'b> {
    pub const IDLE: Self = Self {
        transfer: None,
        continuation: Continuation::None,
        slave_asserted: false,
    };

    pub fn continuation(&self) -> Continuation {
        self.continuation
    }

    pub fn is_armed(&self) -> bool {
        self.continuation != Continuation::None
    }

    /// Saved descriptor, armed or finished
    pub fn transfer(&self) -> Option<&Transfer<'b>> {
        self.transfer.as_ref()
    }

    /// Hand back a finished descriptor
    pub fn take_finished(&mut self) -> Option<Transfer<'b>> {
        if self.is_armed() {
            None
        } else {
            self.transfer.take()
        }
    }

    /// Arm this slot with `transfer`
    ///
    /// A missing or empty buffer for single-wire or receive-only is a
    /// silent no-op: the descriptor is stored as finished and nothing is
    /// enabled. Full-duplex panics unless both buffers are present with
    /// equal, non-zero length.
    pub fn arm<R: SpiRegisters, G: SelectLines>(
        &mut self,
        mut regs: ChannelRegs<'_, R>,
        lines: &mut G,
        transfer: Transfer<'b>,
    ) -> Result<Continuation, ArmRejected<'b>> {
        if self.is_armed() {
            return Err(ArmRejected { transfer });
        }

        configure_frame(&mut regs, &transfer);
        let control_a = regs.control_a();
        let algorithm = dispatch(control_a);

        let runnable = match algorithm {
            Algorithm::BidirTransmit => transfer.has_tx_words(),
            Algorithm::BidirReceive | Algorithm::ReceiveOnly => transfer.has_rx_room(),
            Algorithm::FullDuplexMaster | Algorithm::FullDuplexSlave => {
                transfer.assert_full_duplex();
                true
            }
        };

        self.transfer = Some(transfer);
        self.slave_asserted = false;
        if !runnable {
            self.continuation = Continuation::None;
            return Ok(Continuation::None);
        }

        if is_master(control_a) {
            if let Some(t) = self.transfer.as_ref() {
                assert_slave(lines, &t.slave);
            }
            self.slave_asserted = true;
        }

        let continuation = Continuation::from(algorithm);
        self.continuation = continuation;
        regs.enable_interrupts(continuation.interrupt_mask());
        regs.enable();

        Ok(continuation)
    }

    /// Run the armed continuation once
    ///
    /// Moves at most one word. An event whose flag is clear while words
    /// remain moves nothing and stays armed. Receive continuations
    /// complete on the event that stores the last word; transmit and
    /// full-duplex complete on the first event after both counts reach
    /// zero.
    pub fn step<R: SpiRegisters, G: SelectLines>(
        &mut self,
        mut regs: ChannelRegs<'_, R>,
        lines: &mut G,
    ) -> InterruptOutcome {
        let Some(t) = self.transfer.as_mut() else {
            return InterruptOutcome::Idle;
        };

        match self.continuation {
            Continuation::None => return InterruptOutcome::Idle,
            Continuation::BidirTransmit => {
                if t.has_tx_words() {
                    if regs.status() & sr::TXE != 0 {
                        regs.write_data(t.next_tx_word());
                    }
                    return InterruptOutcome::Progressed;
                }
            }
            Continuation::BidirReceive | Continuation::ReceiveOnly => {
                if t.has_rx_room() {
                    if regs.status() & sr::RXNE == 0 {
                        return InterruptOutcome::Progressed;
                    }
                    let word = regs.read_data();
                    t.store_rx_word(word);
                    if t.has_rx_room() {
                        return InterruptOutcome::Progressed;
                    }
                }
            }
            Continuation::FullDuplex => {
                if t.has_tx_words() || t.has_rx_room() {
                    let status = regs.status();
                    if t.has_tx_words() && status & sr::TXE != 0 {
                        regs.write_data(t.next_tx_word());
                    } else if t.has_rx_room() && status & sr::RXNE != 0 {
                        let word = regs.read_data();
                        t.store_rx_word(word);
                    }
                    return InterruptOutcome::Progressed;
                }
            }
        }

        let slave = t.slave;
        regs.disable_interrupts(self.continuation.interrupt_mask());
        regs.disable();
        if self.slave_asserted {
            release_slave(lines, &slave);
            self.slave_asserted = false;
        }
        self.continuation = Continuation::None;

        InterruptOutcome::Completed
    }

    /// Drop the armed continuation without touching the peripheral,
    /// releasing the slave line if it is still asserted
    pub fn abandon<G: SelectLines>(&mut self, lines: &mut G) {
        if self.slave_asserted {
            if let Some(t) = self.transfer.as_ref() {
                release_slave(lines, &t.slave);
            }
            self.slave_asserted = false;
        }
        self.continuation = Continuation::None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BaudRate, ChannelConfig, Topology};
    use crate::regs::cr1;
    use crate::sim::{RecordingLines, SimBus};
    use crate::transfer::SlaveSelect;
    use spinel_hal::{Channel, Level, PinId, Register};

    const CS: PinId = PinId::new('B', 6);
    const ALL_FLAGS: u16 = sr::TXE | sr::RXNE;

    fn ss() -> SlaveSelect {
        SlaveSelect::active_low(CS)
    }

    fn bus_with(channel: Channel, config: ChannelConfig) -> SimBus {
        let mut bus = SimBus::new();
        bus.write(channel, Register::ControlA, config.control_a_bits());
        bus
    }

    fn master(topology: Topology) -> ChannelConfig {
        ChannelConfig::master(topology, BaudRate::Div16)
    }

    #[test]
    fn test_continuation_from_algorithm() {
        assert_eq!(
            Continuation::from(Algorithm::FullDuplexMaster),
            Continuation::FullDuplex
        );
        assert_eq!(
            Continuation::from(Algorithm::FullDuplexSlave),
            Continuation::FullDuplex
        );
        assert_eq!(
            Continuation::from(Algorithm::ReceiveOnly),
            Continuation::ReceiveOnly
        );
    }

    #[test]
    fn test_idle_slot_is_noop() {
        let ch = Channel::Spi1;
        let mut bus = SimBus::new();
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let outcome = slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);

        assert_eq!(outcome, InterruptOutcome::Idle);
        assert_eq!(bus.channel(ch).status_reads, 0);
        assert!(lines.events.is_empty());
    }

    #[test]
    fn test_arm_full_duplex_enables_both_sources() {
        let ch = Channel::Spi2;
        let mut bus = bus_with(ch, master(Topology::FullDuplex));
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let tx = [1, 2];
        let mut rx = [0u16; 2];
        let armed = slot
            .arm(
                ChannelRegs::new(&mut bus, ch),
                &mut lines,
                Transfer::full_duplex(ch, ss(), &tx, &mut rx),
            )
            .unwrap();

        assert_eq!(armed, Continuation::FullDuplex);
        assert!(slot.is_armed());
        let sim = bus.channel(ch);
        assert_eq!(sim.cr2 & (cr2::TXEIE | cr2::RXNEIE), cr2::TXEIE | cr2::RXNEIE);
        assert_ne!(sim.cr1 & cr1::SPE, 0);
        assert_eq!(sim.data_writes, 0);
        assert_eq!(lines.events.as_slice(), &[(CS, Level::Low)]);
    }

    #[test]
    fn test_full_duplex_drain_count() {
        let ch = Channel::Spi1;
        let mut bus = bus_with(ch, master(Topology::FullDuplex));
        bus.channel_mut(ch).forced_status = Some(ALL_FLAGS);
        bus.channel_mut(ch).peer_sends(&[4, 5, 6]);
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let tx = [1, 2, 3];
        let mut rx = [0u16; 3];
        slot.arm(
            ChannelRegs::new(&mut bus, ch),
            &mut lines,
            Transfer::full_duplex(ch, ss(), &tx, &mut rx),
        )
        .unwrap();

        for _ in 0..6 {
            let outcome = slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);
            assert_eq!(outcome, InterruptOutcome::Progressed);
            assert_ne!(bus.channel(ch).cr1 & cr1::SPE, 0);
        }

        let outcome = slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);
        assert_eq!(outcome, InterruptOutcome::Completed);
        assert!(!slot.is_armed());

        let sim = bus.channel(ch);
        assert_eq!(sim.cr1 & cr1::SPE, 0);
        assert_eq!(sim.cr2 & (cr2::TXEIE | cr2::RXNEIE), 0);
        assert_eq!(sim.data_writes, 3);
        assert_eq!(sim.data_reads, 3);
        assert_eq!(
            lines.events.as_slice(),
            &[(CS, Level::Low), (CS, Level::High)]
        );

        // Completion fires once
        let again = slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);
        assert_eq!(again, InterruptOutcome::Idle);
        assert_eq!(lines.events.len(), 2);

        drop(slot.take_finished());
        assert_eq!(rx, [4, 5, 6]);
    }

    #[test]
    fn test_transmit_has_priority() {
        let ch = Channel::Spi3;
        let mut bus = bus_with(ch, master(Topology::FullDuplex));
        bus.channel_mut(ch).forced_status = Some(ALL_FLAGS);
        bus.channel_mut(ch).peer_sends(&[9, 9]);
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let tx = [1, 2];
        let mut rx = [0u16; 2];
        slot.arm(
            ChannelRegs::new(&mut bus, ch),
            &mut lines,
            Transfer::full_duplex(ch, ss(), &tx, &mut rx),
        )
        .unwrap();

        slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);
        assert_eq!(bus.channel(ch).data_writes, 1);
        assert_eq!(bus.channel(ch).data_reads, 0);

        slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);
        assert_eq!(bus.channel(ch).data_writes, 2);
        assert_eq!(bus.channel(ch).data_reads, 0);

        slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);
        assert_eq!(bus.channel(ch).data_reads, 1);
    }

    #[test]
    fn test_receive_only_three_events() {
        let ch = Channel::Spi4;
        let mut bus = bus_with(ch, master(Topology::ReceiveOnly));
        bus.channel_mut(ch).peer_sends(&[0x31, 0x32, 0x33]);
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let mut rx = [0u16; 3];
        let armed = slot
            .arm(
                ChannelRegs::new(&mut bus, ch),
                &mut lines,
                Transfer::receive(ch, ss(), &mut rx),
            )
            .unwrap();
        assert_eq!(armed, Continuation::ReceiveOnly);
        assert_eq!(bus.channel(ch).cr2 & cr2::RXNEIE, cr2::RXNEIE);
        assert_eq!(bus.channel(ch).cr2 & cr2::TXEIE, 0);

        let outcomes: [InterruptOutcome; 3] =
            core::array::from_fn(|_| slot.step(ChannelRegs::new(&mut bus, ch), &mut lines));
        assert_eq!(
            outcomes,
            [
                InterruptOutcome::Progressed,
                InterruptOutcome::Progressed,
                InterruptOutcome::Completed
            ]
        );

        let sim = bus.channel(ch);
        assert_eq!(sim.cr2 & cr2::RXNEIE, 0);
        assert_eq!(sim.cr1 & cr1::SPE, 0);
        assert_eq!(sim.data_writes, 0);
        let control = (sim.cr1, sim.cr2);

        // Spurious fourth event
        let fourth = slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);
        assert_eq!(fourth, InterruptOutcome::Idle);
        assert_eq!((bus.channel(ch).cr1, bus.channel(ch).cr2), control);
        assert_eq!(lines.level_of(CS), Some(Level::High));

        drop(slot.take_finished());
        assert_eq!(rx, [0x31, 0x32, 0x33]);
    }

    #[test]
    fn test_bidir_transmit_completes_after_last_word() {
        let ch = Channel::Spi5;
        let mut bus = bus_with(ch, master(Topology::Bidirectional));
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let tx = [0x70, 0x71];
        let t = Transfer::transmit(ch, ss(), &tx);
        let armed = slot
            .arm(ChannelRegs::new(&mut bus, ch), &mut lines, t)
            .unwrap();
        assert_eq!(armed, Continuation::BidirTransmit);
        assert_eq!(bus.channel(ch).cr2 & cr2::TXEIE, cr2::TXEIE);

        assert_eq!(
            slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
            InterruptOutcome::Progressed
        );
        assert_eq!(
            slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
            InterruptOutcome::Progressed
        );
        assert_eq!(
            slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
            InterruptOutcome::Completed
        );

        assert_eq!(bus.channel(ch).data_writes, 2);
        assert_eq!(bus.channel(ch).cr2 & cr2::TXEIE, 0);
        assert_eq!(lines.level_of(CS), Some(Level::High));
    }

    #[test]
    fn test_waiting_for_flag_keeps_armed() {
        let ch = Channel::Spi2;
        let mut bus = bus_with(ch, master(Topology::Bidirectional));
        // Peer has not clocked anything yet
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let mut rx = [0u16; 1];
        slot.arm(
            ChannelRegs::new(&mut bus, ch),
            &mut lines,
            Transfer::receive(ch, ss(), &mut rx),
        )
        .unwrap();

        assert_eq!(
            slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
            InterruptOutcome::Progressed
        );
        assert!(slot.is_armed());

        bus.channel_mut(ch).peer_sends(&[0x42]);
        assert_eq!(
            slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
            InterruptOutcome::Completed
        );
        drop(slot.take_finished());
        assert_eq!(rx, [0x42]);
    }

    #[test]
    fn test_full_duplex_waits_for_last_receive() {
        let ch = Channel::Spi1;
        let mut bus = bus_with(ch, master(Topology::FullDuplex));
        bus.channel_mut(ch).forced_status = Some(0);
        bus.channel_mut(ch).peer_sends(&[0x61, 0x62]);
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let tx = [0x51, 0x52];
        let mut rx = [0u16; 2];
        slot.arm(
            ChannelRegs::new(&mut bus, ch),
            &mut lines,
            Transfer::full_duplex(ch, ss(), &tx, &mut rx),
        )
        .unwrap();

        // No flag raised: nothing moves and the channel stays armed
        assert_eq!(
            slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
            InterruptOutcome::Progressed
        );
        assert!(slot.is_armed());
        assert_eq!(bus.channel(ch).data_writes, 0);
        assert_eq!(bus.channel(ch).data_reads, 0);

        // TXE keeps firing after the last write while receives are pending
        bus.channel_mut(ch).forced_status = Some(sr::TXE);
        for _ in 0..4 {
            assert_eq!(
                slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
                InterruptOutcome::Progressed
            );
        }
        assert!(slot.is_armed());
        assert_eq!(bus.channel(ch).data_writes, 2);
        assert_eq!(bus.channel(ch).data_reads, 0);
        assert_ne!(bus.channel(ch).cr1 & cr1::SPE, 0);
        assert_eq!(lines.level_of(CS), Some(Level::Low));

        bus.channel_mut(ch).forced_status = Some(ALL_FLAGS);
        let outcomes: [InterruptOutcome; 3] =
            core::array::from_fn(|_| slot.step(ChannelRegs::new(&mut bus, ch), &mut lines));
        assert_eq!(
            outcomes,
            [
                InterruptOutcome::Progressed,
                InterruptOutcome::Progressed,
                InterruptOutcome::Completed
            ]
        );
        assert_eq!(lines.level_of(CS), Some(Level::High));
        drop(slot.take_finished());
        assert_eq!(rx, [0x61, 0x62]);
    }

    #[test]
    fn test_bidir_transmit_waits_for_empty_buffer() {
        let ch = Channel::Spi3;
        let mut bus = bus_with(ch, master(Topology::Bidirectional));
        bus.channel_mut(ch).forced_status = Some(0);
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let tx = [0x71];
        slot.arm(
            ChannelRegs::new(&mut bus, ch),
            &mut lines,
            Transfer::transmit(ch, ss(), &tx),
        )
        .unwrap();

        for _ in 0..3 {
            assert_eq!(
                slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
                InterruptOutcome::Progressed
            );
        }
        assert!(slot.is_armed());
        assert_eq!(bus.channel(ch).data_writes, 0);

        bus.channel_mut(ch).forced_status = Some(sr::TXE);
        assert_eq!(
            slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
            InterruptOutcome::Progressed
        );
        assert_eq!(
            slot.step(ChannelRegs::new(&mut bus, ch), &mut lines),
            InterruptOutcome::Completed
        );
        assert_eq!(bus.channel(ch).sent.as_slice(), &[0x71]);
        assert_eq!(bus.channel(ch).cr1 & cr1::SPE, 0);
    }

    #[test]
    fn test_missing_receive_buffer_is_noop() {
        let ch = Channel::Spi4;
        let mut bus = bus_with(ch, master(Topology::ReceiveOnly));
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let armed = slot
            .arm(
                ChannelRegs::new(&mut bus, ch),
                &mut lines,
                Transfer::new(ch, ss()),
            )
            .unwrap();

        assert_eq!(armed, Continuation::None);
        assert!(!slot.is_armed());
        assert_eq!(bus.channel(ch).cr1 & cr1::SPE, 0);
        assert_eq!(bus.channel(ch).cr2, 0);
        assert!(lines.events.is_empty());
        assert!(slot.take_finished().is_some());
    }

    #[test]
    fn test_double_arm_rejected() {
        let ch = Channel::Spi1;
        let mut bus = bus_with(ch, master(Topology::ReceiveOnly));
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let mut first = [0u16; 2];
        let mut second = [0u16; 2];
        slot.arm(
            ChannelRegs::new(&mut bus, ch),
            &mut lines,
            Transfer::receive(ch, ss(), &mut first),
        )
        .unwrap();

        let rejected = slot
            .arm(
                ChannelRegs::new(&mut bus, ch),
                &mut lines,
                Transfer::receive(ch, ss(), &mut second),
            )
            .unwrap_err();

        assert_eq!(rejected.transfer.rx_remaining(), 2);
        assert_eq!(slot.transfer().map(Transfer::rx_remaining), Some(2));
        assert_eq!(lines.events.len(), 1);
    }

    #[test]
    fn test_slave_role_never_drives_select() {
        let ch = Channel::Spi3;
        let mut bus = bus_with(ch, ChannelConfig::slave(Topology::FullDuplex));
        bus.channel_mut(ch).forced_status = Some(ALL_FLAGS);
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let tx = [1];
        let mut rx = [0u16; 1];
        slot.arm(
            ChannelRegs::new(&mut bus, ch),
            &mut lines,
            Transfer::full_duplex(ch, ss(), &tx, &mut rx),
        )
        .unwrap();

        let mut outcome = InterruptOutcome::Progressed;
        while outcome == InterruptOutcome::Progressed {
            outcome = slot.step(ChannelRegs::new(&mut bus, ch), &mut lines);
        }

        assert_eq!(outcome, InterruptOutcome::Completed);
        assert!(lines.events.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_full_duplex_unequal_panics() {
        let ch = Channel::Spi1;
        let mut bus = bus_with(ch, master(Topology::FullDuplex));
        let mut lines = RecordingLines::new();
        let mut slot = Slot::IDLE;

        let tx = [1, 2, 3];
        let mut rx = [0u16; 2];
        let _ = slot.arm(
            ChannelRegs::new(&mut bus, ch),
            &mut lines,
            Transfer::full_duplex(ch, ss(), &tx, &mut rx),
        );
    }
}
