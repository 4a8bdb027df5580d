//! Transfer descriptors
//!
//! A [`Transfer`] is the unit of work handed to the engine. It names the
//! channel and slave-select line, carries the frame format, and borrows
//! the caller's word buffers. The buffers keep a cursor so the executors
//! can advance them in place, and so the caller can see how far a
//! transfer got.

use spinel_hal::spi::{Mode, Phase, Polarity};
use spinel_hal::{Channel, Level, PinId};

/// Width of one data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WordWidth {
    /// 8-bit frames (only the low byte of each word is used)
    #[default]
    Bits8,
    /// 16-bit frames
    Bits16,
}

impl WordWidth {
    /// Mask selecting the bits that travel on the wire
    pub const fn mask(self) -> u16 {
        match self {
            WordWidth::Bits8 => 0x00FF,
            WordWidth::Bits16 => 0xFFFF,
        }
    }
}

/// Bit order within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    #[default]
    MsbFirst,
    LsbFirst,
}

/// Data direction for single-wire (bidirectional) topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BidirDirection {
    #[default]
    Receive,
    Transmit,
}

/// Per-transfer framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameFormat {
    pub width: WordWidth,
    pub bit_order: BitOrder,
    pub polarity: Polarity,
    pub phase: Phase,
}

impl FrameFormat {
    /// Frame format for a standard SPI mode with the given width, MSB first
    pub fn from_mode(mode: Mode, width: WordWidth) -> Self {
        let (polarity, phase) = mode.into();
        Self {
            width,
            bit_order: BitOrder::MsbFirst,
            polarity,
            phase,
        }
    }
}

/// Active level of the slave-select line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SelectPolarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

impl SelectPolarity {
    /// Level that selects the slave
    pub const fn asserted(self) -> Level {
        match self {
            SelectPolarity::ActiveLow => Level::Low,
            SelectPolarity::ActiveHigh => Level::High,
        }
    }

    /// Level that deselects the slave
    pub const fn released(self) -> Level {
        self.asserted().inverted()
    }
}

/// Slave-select line and its polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveSelect {
    pub pin: PinId,
    pub polarity: SelectPolarity,
}

impl SlaveSelect {
    /// Active-low select on `pin`
    pub const fn active_low(pin: PinId) -> Self {
        Self {
            pin,
            polarity: SelectPolarity::ActiveLow,
        }
    }

    /// Active-high select on `pin`
    pub const fn active_high(pin: PinId) -> Self {
        Self {
            pin,
            polarity: SelectPolarity::ActiveHigh,
        }
    }

    /// Parse a select line from config
    ///
    /// `"PA4"` is active-high, `"!PA4"` is active-low.
    pub fn parse(s: &str) -> Option<Self> {
        let (pin, inverted) = PinId::parse(s)?;
        Some(if inverted {
            Self::active_low(pin)
        } else {
            Self::active_high(pin)
        })
    }
}

/// Words to transmit, with a send cursor
#[derive(Debug)]
pub struct TxBuffer<'a> {
    words: &'a [u16],
    sent: usize,
}

impl<'a> TxBuffer<'a> {
    pub fn new(words: &'a [u16]) -> Self {
        Self { words, sent: 0 }
    }

    /// Words not yet written to the data register
    pub fn remaining(&self) -> usize {
        self.words.len() - self.sent
    }

    /// Words already written
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Total length of the buffer
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Take the next word and advance the cursor
    pub fn next_word(&mut self) -> Option<u16> {
        let word = *self.words.get(self.sent)?;
        self.sent += 1;
        Some(word)
    }

    /// Underlying words
    pub fn words(&self) -> &'a [u16] {
        self.words
    }
}

/// Destination for received words, with a fill cursor
#[derive(Debug)]
pub struct RxBuffer<'a> {
    words: &'a mut [u16],
    received: usize,
}

impl<'a> RxBuffer<'a> {
    pub fn new(words: &'a mut [u16]) -> Self {
        Self { words, received: 0 }
    }

    /// Words still expected
    pub fn remaining(&self) -> usize {
        self.words.len() - self.received
    }

    /// Words stored so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// Total length of the buffer
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Store a word and advance the cursor
    ///
    /// Returns `false` if the buffer is already full.
    pub fn push(&mut self, word: u16) -> bool {
        match self.words.get_mut(self.received) {
            Some(slot) => {
                *slot = word;
                self.received += 1;
                true
            }
            None => false,
        }
    }

    /// Received words so far
    pub fn filled(&self) -> &[u16] {
        &self.words[..self.received]
    }

    /// Give the buffer back to the caller
    pub fn into_inner(self) -> &'a mut [u16] {
        self.words
    }
}

/// Transfer descriptor
#[derive(Debug)]
pub struct Transfer<'a> {
    pub channel: Channel,
    pub slave: SlaveSelect,
    pub frame: FrameFormat,
    /// Only consulted in single-wire topology
    pub direction: BidirDirection,
    pub tx: Option<TxBuffer<'a>>,
    pub rx: Option<RxBuffer<'a>>,
}

impl<'a> Transfer<'a> {
    /// Descriptor with no buffers and the default frame format
    pub fn new(channel: Channel, slave: SlaveSelect) -> Self {
        Self {
            channel,
            slave,
            frame: FrameFormat::default(),
            direction: BidirDirection::default(),
            tx: None,
            rx: None,
        }
    }

    /// Full-duplex exchange of `tx` for `rx`
    pub fn full_duplex(
        channel: Channel,
        slave: SlaveSelect,
        tx: &'a [u16],
        rx: &'a mut [u16],
    ) -> Self {
        Self::new(channel, slave).with_tx(tx).with_rx(rx)
    }

    /// Single-wire transmit of `tx`
    pub fn transmit(channel: Channel, slave: SlaveSelect, tx: &'a [u16]) -> Self {
        Self::new(channel, slave)
            .with_tx(tx)
            .with_direction(BidirDirection::Transmit)
    }

    /// Receive into `rx` (single-wire receive or receive-only topology)
    pub fn receive(channel: Channel, slave: SlaveSelect, rx: &'a mut [u16]) -> Self {
        Self::new(channel, slave)
            .with_rx(rx)
            .with_direction(BidirDirection::Receive)
    }

    pub fn with_tx(mut self, words: &'a [u16]) -> Self {
        self.tx = Some(TxBuffer::new(words));
        self
    }

    pub fn with_rx(mut self, words: &'a mut [u16]) -> Self {
        self.rx = Some(RxBuffer::new(words));
        self
    }

    pub fn with_frame(mut self, frame: FrameFormat) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_direction(mut self, direction: BidirDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Words left to transmit (0 without a transmit buffer)
    pub fn tx_remaining(&self) -> usize {
        self.tx.as_ref().map_or(0, TxBuffer::remaining)
    }

    /// Words left to receive (0 without a receive buffer)
    pub fn rx_remaining(&self) -> usize {
        self.rx.as_ref().map_or(0, RxBuffer::remaining)
    }

    /// True when a transmit buffer with words left is attached
    pub(crate) fn has_tx_words(&self) -> bool {
        self.tx_remaining() > 0
    }

    /// True when a receive buffer with room left is attached
    pub(crate) fn has_rx_room(&self) -> bool {
        self.rx_remaining() > 0
    }

    /// Next outgoing word, masked to the frame width
    pub(crate) fn next_tx_word(&mut self) -> u16 {
        let mask = self.frame.width.mask();
        self.tx
            .as_mut()
            .and_then(TxBuffer::next_word)
            .map_or(0, |w| w & mask)
    }

    /// Store an incoming word, masked to the frame width
    pub(crate) fn store_rx_word(&mut self, word: u16) {
        let mask = self.frame.width.mask();
        if let Some(rx) = self.rx.as_mut() {
            rx.push(word & mask);
        }
    }

    /// Full-duplex needs both buffers, equal and non-zero in length
    pub(crate) fn assert_full_duplex(&self) {
        let tx = self.tx.as_ref().map_or(0, TxBuffer::remaining);
        let rx = self.rx.as_ref().map_or(0, RxBuffer::remaining);
        assert!(
            self.tx.is_some() && self.rx.is_some(),
            "full-duplex transfer needs transmit and receive buffers"
        );
        assert!(tx > 0, "full-duplex transfer with empty buffers");
        assert_eq!(tx, rx, "full-duplex buffers differ in length");
    }
}
