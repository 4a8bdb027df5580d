//! Engine shared between thread mode and interrupt handlers
//!
//! The engine lives in a critical-section mutex so foreground code and the
//! SPI interrupt handlers never observe a slot mid-update. It starts empty
//! so it can sit in a `static` and be installed once the peripherals are
//! up.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use spinel_hal::{Channel, SelectLines, SpiRegisters};

use crate::engine::Engine;
use crate::interrupt::InterruptOutcome;

pub struct SharedEngine<'b, R: SpiRegisters, G: SelectLines> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Option<Engine<'b, R, G>>>>,
}

impl<'b, R: SpiRegisters, G: SelectLines> SharedEngine<'b, R, G> {
    /// Empty slot, usable in a `static`
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install `engine`, returning the one it replaces
    pub fn install(&self, engine: Engine<'b, R, G>) -> Option<Engine<'b, R, G>> {
        self.inner.lock(|cell| cell.borrow_mut().replace(engine))
    }

    /// Remove the engine
    pub fn take(&self) -> Option<Engine<'b, R, G>> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }

    pub fn is_installed(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().is_some())
    }

    /// Run `f` on the engine inside a critical section
    ///
    /// Returns `None` if no engine is installed. Blocking transfers run
    /// with interrupts masked for their whole duration when called here.
    pub fn with<F, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&mut Engine<'b, R, G>) -> T,
    {
        self.inner.lock(|cell| cell.borrow_mut().as_mut().map(f))
    }

    /// Interrupt handler entry point
    pub fn on_interrupt(&self, channel: Channel) -> InterruptOutcome {
        self.with(|engine| engine.on_interrupt(channel))
            .unwrap_or(InterruptOutcome::Idle)
    }
}

impl<R: SpiRegisters, G: SelectLines> Default for SharedEngine<'_, R, G> {
    fn default() -> Self {
        Self::new()
    }
}
