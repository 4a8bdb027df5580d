//! GPIO abstractions for slave-select lines
//!
//! The engine never owns pins directly. It names them with a [`PinId`] and
//! asks a [`SelectLines`] implementation to drive them.

/// Logic level of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// The opposite level
    pub const fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// GPIO pin identifier (port letter + pin number, e.g. PA4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId {
    /// Port letter ('A'..='K')
    pub port: char,
    /// Pin number within the port (0-15)
    pub number: u8,
}

impl PinId {
    /// Create a new pin identifier
    pub const fn new(port: char, number: u8) -> Self {
        Self { port, number }
    }

    /// Parse a pin string from config
    ///
    /// Supports formats:
    /// - "PA4" -> (PA4, false)
    /// - "!PB12" -> (PB12, true/inverted)
    pub fn parse(s: &str) -> Option<(Self, bool)> {
        let s = s.trim();

        let (s, inverted) = match s.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (s, false),
        };

        let mut chars = s.chars();
        if chars.next()? != 'P' {
            return None;
        }

        let port = chars.next()?;
        if !('A'..='K').contains(&port) {
            return None;
        }

        let number: u8 = chars.as_str().parse().ok()?;
        if number > 15 {
            return None;
        }

        Some((Self::new(port, number), inverted))
    }
}

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific level
    fn set_level(&mut self, level: Level) {
        match level {
            Level::High => self.set_high(),
            Level::Low => self.set_low(),
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently set low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Slave-select line capability
///
/// Drives the line named by `pin` to `level`. Naming a pin the
/// implementation does not control is a wiring defect.
pub trait SelectLines {
    fn set_line(&mut self, pin: PinId, level: Level);
}

impl<T: SelectLines + ?Sized> SelectLines for &mut T {
    fn set_line(&mut self, pin: PinId, level: Level) {
        (**self).set_line(pin, level)
    }
}

/// Fixed set of output pins addressed by [`PinId`]
pub struct PinBank<P, const N: usize> {
    pins: [(PinId, P); N],
}

impl<P: OutputPin, const N: usize> PinBank<P, N> {
    /// Create a bank from (identifier, pin) pairs
    pub fn new(pins: [(PinId, P); N]) -> Self {
        Self { pins }
    }

    /// Whether a pin is registered under `id`
    pub fn contains(&self, id: PinId) -> bool {
        self.pins.iter().any(|(pin, _)| *pin == id)
    }

    /// Borrow the pin registered under `id`
    pub fn get(&self, id: PinId) -> Option<&P> {
        self.pins.iter().find(|(pin, _)| *pin == id).map(|(_, p)| p)
    }

    /// Borrow the pin registered under `id` mutably
    pub fn get_mut(&mut self, id: PinId) -> Option<&mut P> {
        self.pins
            .iter_mut()
            .find(|(pin, _)| *pin == id)
            .map(|(_, p)| p)
    }
}

/// # Panics
///
/// `set_line` panics when `pin` is not in the bank. Callers that drive the
/// bank from interrupt context should check every select pin with
/// [`PinBank::contains`] at startup.
impl<P: OutputPin, const N: usize> SelectLines for PinBank<P, N> {
    fn set_line(&mut self, pin: PinId, level: Level) {
        match self.get_mut(pin) {
            Some(output) => output.set_level(level),
            None => panic!("slave-select pin not in bank"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePin {
        high: bool,
    }

    impl OutputPin for FakePin {
        fn set_high(&mut self) {
            self.high = true;
        }

        fn set_low(&mut self) {
            self.high = false;
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    #[test]
    fn test_parse_pin_string() {
        assert_eq!(PinId::parse("PA4"), Some((PinId::new('A', 4), false)));
        assert_eq!(PinId::parse("!PB12"), Some((PinId::new('B', 12), true)));
        assert_eq!(PinId::parse(" PC0 "), Some((PinId::new('C', 0), false)));

        assert_eq!(PinId::parse("PA16"), None);
        assert_eq!(PinId::parse("PZ1"), None);
        assert_eq!(PinId::parse("A4"), None);
        assert_eq!(PinId::parse("P"), None);
        assert_eq!(PinId::parse("PA"), None);
    }

    #[test]
    fn test_level_inverted() {
        assert_eq!(Level::Low.inverted(), Level::High);
        assert_eq!(Level::High.inverted(), Level::Low);
    }

    #[test]
    fn test_pin_bank_routes_by_id() {
        let mut bank = PinBank::new([
            (PinId::new('A', 4), FakePin { high: true }),
            (PinId::new('B', 12), FakePin { high: true }),
        ]);

        bank.set_line(PinId::new('B', 12), Level::Low);

        assert!(bank.get(PinId::new('A', 4)).unwrap().is_set_high());
        assert!(bank.get(PinId::new('B', 12)).unwrap().is_set_low());
    }

    #[test]
    fn test_pin_bank_contains() {
        let bank = PinBank::new([(PinId::new('A', 4), FakePin { high: true })]);

        assert!(bank.contains(PinId::new('A', 4)));
        assert!(!bank.contains(PinId::new('A', 5)));
        assert!(!bank.contains(PinId::new('B', 4)));
    }

    #[test]
    #[should_panic(expected = "slave-select pin not in bank")]
    fn test_pin_bank_unknown_pin() {
        let mut bank = PinBank::new([(PinId::new('A', 4), FakePin { high: true })]);
        bank.set_line(PinId::new('A', 5), Level::Low);
    }
}
