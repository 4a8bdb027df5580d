//! Host-side peripheral model for tests
//!
//! A word-level model of five SPI channels. Status reads advance the
//! model by one step, so every poll in an executor lets the shift
//! register make progress. The peer is a queue of words it will clock
//! back; an empty peer never answers in the receive modes.

use heapless::{Deque, Vec};
use spinel_hal::{Channel, Level, PinId, Register, SelectLines, SpiRegisters};

use crate::dispatch::{dispatch, is_master, Algorithm};
use crate::regs::{cr1, sr};

const DEPTH: usize = 64;

pub struct SimChannel {
    pub cr1: u16,
    pub cr2: u16,
    tx_buffer: Option<u16>,
    shift: Option<u16>,
    rx: Option<u16>,
    /// Words the peer will clock in, oldest first
    pub peer: Deque<u16, DEPTH>,
    /// Words that left the shift register
    pub sent: Vec<u16, DEPTH>,
    pub data_writes: usize,
    pub data_reads: usize,
    pub status_reads: usize,
    pub overruns: usize,
    /// Overrides the modelled flags; data reads then pop `peer` directly
    pub forced_status: Option<u16>,
}

impl SimChannel {
    fn new() -> Self {
        Self {
            cr1: 0,
            cr2: 0,
            tx_buffer: None,
            shift: None,
            rx: None,
            peer: Deque::new(),
            sent: Vec::new(),
            data_writes: 0,
            data_reads: 0,
            status_reads: 0,
            overruns: 0,
            forced_status: None,
        }
    }

    pub fn peer_sends(&mut self, words: &[u16]) {
        for w in words {
            self.peer.push_back(*w).unwrap();
        }
    }

    /// Current flags without advancing the model
    pub fn flags(&self) -> u16 {
        if let Some(forced) = self.forced_status {
            return forced;
        }

        let mut status = 0;
        if self.tx_buffer.is_none() {
            status |= sr::TXE;
        }
        if self.rx.is_some() {
            status |= sr::RXNE;
        }
        if is_master(self.cr1) && (self.shift.is_some() || self.tx_buffer.is_some()) {
            status |= sr::BSY;
        }
        status
    }

    fn shift_out(&mut self) {
        if let Some(word) = self.shift.take() {
            self.sent.push(word).unwrap();
        }
        self.shift = self.tx_buffer.take();
    }

    fn tick(&mut self) {
        if self.cr1 & cr1::SPE == 0 {
            return;
        }

        match dispatch(self.cr1) {
            Algorithm::BidirTransmit => self.shift_out(),
            Algorithm::BidirReceive | Algorithm::ReceiveOnly => {
                if self.rx.is_none() {
                    self.rx = self.peer.pop_front();
                }
            }
            Algorithm::FullDuplexMaster => {
                if self.rx.is_none() && self.shift.is_some() {
                    self.rx = Some(self.peer.pop_front().unwrap_or(0));
                    self.shift_out();
                }
            }
            Algorithm::FullDuplexSlave => {
                if self.rx.is_none() && !self.peer.is_empty() {
                    self.rx = self.peer.pop_front();
                    self.shift_out();
                }
            }
        }
    }

    fn read_data(&mut self) -> u16 {
        self.data_reads += 1;
        if self.forced_status.is_some() {
            return self.peer.pop_front().unwrap_or(0);
        }
        self.rx.take().unwrap_or(0)
    }

    fn write_data(&mut self, word: u16) {
        self.data_writes += 1;
        if self.forced_status.is_some() {
            self.sent.push(word).unwrap();
        } else if self.shift.is_none() {
            self.shift = Some(word);
        } else if self.tx_buffer.is_none() {
            self.tx_buffer = Some(word);
        } else {
            self.overruns += 1;
        }
    }
}

pub struct SimBus {
    channels: [SimChannel; Channel::COUNT],
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            channels: core::array::from_fn(|_| SimChannel::new()),
        }
    }

    pub fn channel(&self, channel: Channel) -> &SimChannel {
        &self.channels[channel.index()]
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut SimChannel {
        &mut self.channels[channel.index()]
    }
}

impl SpiRegisters for SimBus {
    fn read(&mut self, channel: Channel, register: Register) -> u16 {
        let ch = self.channel_mut(channel);
        match register {
            Register::ControlA => ch.cr1,
            Register::ControlB => ch.cr2,
            Register::Status => {
                ch.status_reads += 1;
                ch.tick();
                ch.flags()
            }
            Register::Data => ch.read_data(),
        }
    }

    fn write(&mut self, channel: Channel, register: Register, value: u16) {
        let ch = self.channel_mut(channel);
        match register {
            Register::ControlA => ch.cr1 = value,
            Register::ControlB => ch.cr2 = value,
            Register::Status => {}
            Register::Data => ch.write_data(value),
        }
    }
}

/// Select lines that log every level change
pub struct RecordingLines {
    pub events: Vec<(PinId, Level), DEPTH>,
}

impl RecordingLines {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Last level driven on `pin`
    pub fn level_of(&self, pin: PinId) -> Option<Level> {
        self.events
            .iter()
            .rev()
            .find(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
    }
}

impl SelectLines for RecordingLines {
    fn set_line(&mut self, pin: PinId, level: Level) {
        self.events.push((pin, level)).unwrap();
    }
}
