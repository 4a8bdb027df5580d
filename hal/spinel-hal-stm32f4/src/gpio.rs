//! Slave-select outputs for STM32F4
//!
//! Select lines are ordinary push-pull outputs driven from software.

use embassy_stm32::gpio::Output;
use spinel_hal::gpio::{OutputPin, PinBank};

/// Push-pull output used as a slave-select line
pub struct SelectPin<'d>(Output<'d>);

impl<'d> SelectPin<'d> {
    pub fn new(output: Output<'d>) -> Self {
        Self(output)
    }

    pub fn into_inner(self) -> Output<'d> {
        self.0
    }
}

impl OutputPin for SelectPin<'_> {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

/// Select lines addressed by [`spinel_hal::PinId`]
pub type SelectBank<'d, const N: usize> = PinBank<SelectPin<'d>, N>;
