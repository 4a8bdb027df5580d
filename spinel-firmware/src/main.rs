//! Spinel reference firmware
//!
//! Drives the SPI engine on an STM32F411 board (WeAct "Black Pill"):
//!
//! - SPI1: full-duplex master loopback, blocking (jumper PA7 to PA6)
//! - SPI2: receive-only master, interrupt-driven
//!
//! Channel roles, topologies and baud rates come from channels.toml,
//! validated and compiled in by build.rs.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::spi::{self, Spi};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use spinel_core::{Channel, Engine, InterruptOutcome, PinId, SharedEngine, Transfer};
use spinel_hal_stm32f4::{SelectBank, SelectPin, Stm32Spi};

mod channels {
    include!(concat!(env!("OUT_DIR"), "/channels.rs"));
}

use channels::{CHANNEL_TABLE, SLAVE_SELECTS};

/// Select lines wired on this board
type Lines = SelectBank<'static, 2>;

/// Engine shared with the SPI interrupt handlers
static ENGINE: SharedEngine<'static, Stm32Spi, Lines> = SharedEngine::new();

/// Raised by an interrupt handler when its transfer completes
static SPI2_DONE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Receive buffer for interrupt-driven transfers (must live forever)
static SPI2_RX: StaticCell<[u16; 8]> = StaticCell::new();

const LOOPBACK_PERIOD_MS: u64 = 1000;
const SAMPLE_PERIOD_MS: u64 = 250;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Spinel firmware starting...");

    let p = embassy_stm32::init(Default::default());

    // embassy-stm32 gates the clocks and muxes the pins; the drivers are
    // kept alive so the pins stay in their alternate function.
    let spi1 = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi::Config::default());
    let spi2 = Spi::new_blocking(p.SPI2, p.PB13, p.PB15, p.PB14, spi::Config::default());

    let lines = SelectBank::new([
        (
            PinId::new('A', 4),
            SelectPin::new(Output::new(p.PA4, Level::High, Speed::VeryHigh)),
        ),
        (
            PinId::new('B', 12),
            SelectPin::new(Output::new(p.PB12, Level::High, Speed::VeryHigh)),
        ),
    ]);

    // set_line panics on unknown pins, so catch wiring mismatches here
    // rather than inside an interrupt handler
    for select in SLAVE_SELECTS.iter().flatten() {
        if !lines.contains(select.pin) {
            defmt::panic!("select pin {} from channels.toml is not wired", select.pin);
        }
    }

    let mut engine = Engine::new(Stm32Spi::new(), lines);
    engine.apply_channel_configuration(&CHANNEL_TABLE);
    for (channel, config) in CHANNEL_TABLE.enabled() {
        info!(
            "{}: {} {} /{}",
            channel,
            config.role,
            config.topology,
            config.baud_rate.divisor()
        );
    }
    ENGINE.install(engine);

    interrupt::SPI2.set_priority(Priority::P6);
    // SAFETY: the handler only touches ENGINE through its critical section.
    unsafe { interrupt::SPI2.enable() };

    let Some(spi1_select) = SLAVE_SELECTS[Channel::Spi1.index()] else {
        defmt::panic!("channels.toml must give spi1 a select pin");
    };
    let Some(spi2_select) = SLAVE_SELECTS[Channel::Spi2.index()] else {
        defmt::panic!("channels.toml must give spi2 a select pin");
    };

    spawner.must_spawn(loopback_task(spi1_select));
    spawner.must_spawn(sample_task(spi2_select));

    info!("Spinel running");

    // Hold the embassy drivers for the lifetime of the program
    let _drivers = (spi1, spi2);
    core::future::pending::<()>().await;
}

/// Blocking full-duplex loopback on SPI1
#[embassy_executor::task]
async fn loopback_task(select: spinel_core::SlaveSelect) {
    let mut ticker = Ticker::every(Duration::from_millis(LOOPBACK_PERIOD_MS));
    let mut seed: u16 = 0;

    loop {
        ticker.next().await;

        let tx = [seed, seed.wrapping_add(1), seed.wrapping_add(2), seed.wrapping_add(3)];
        let mut rx = [0u16; 4];
        let mut transfer = Transfer::full_duplex(Channel::Spi1, select, &tx, &mut rx);

        match ENGINE.with(|engine| engine.execute_blocking(&mut transfer)) {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                warn!("SPI1 loopback failed: {}", e);
                continue;
            }
            None => continue,
        }
        drop(transfer);

        let masked = tx.map(|w| w & 0xFF);
        if rx == masked {
            debug!("SPI1 loopback ok: {:x}", rx);
        } else {
            warn!("SPI1 loopback mismatch: sent {:x}, got {:x}", masked, rx);
        }

        seed = seed.wrapping_add(4);
    }
}

/// Interrupt-driven receive-only sampling on SPI2
#[embassy_executor::task]
async fn sample_task(select: spinel_core::SlaveSelect) {
    let mut ticker = Ticker::every(Duration::from_millis(SAMPLE_PERIOD_MS));
    let mut buffer: &'static mut [u16] = SPI2_RX.init([0; 8]);

    loop {
        ticker.next().await;

        SPI2_DONE.reset();
        let armed = ENGINE.with(|engine| {
            engine.execute_nonblocking(Transfer::receive(Channel::Spi2, select, buffer))
        });

        match armed {
            Some(Ok(())) => {}
            Some(Err(rejected)) => {
                warn!("SPI2 still busy");
                buffer = match rejected.transfer.rx {
                    Some(rx) => rx.into_inner(),
                    None => defmt::unreachable!(),
                };
                continue;
            }
            None => defmt::unreachable!(),
        }

        SPI2_DONE.wait().await;

        let finished = ENGINE.with(|engine| engine.take_finished(Channel::Spi2)).flatten();
        let Some(rx) = finished.and_then(|t| t.rx) else {
            defmt::panic!("SPI2 transfer lost");
        };
        buffer = rx.into_inner();
        debug!("SPI2 sample: {:x}", &buffer[..]);
    }
}

#[interrupt]
fn SPI2() {
    if ENGINE.on_interrupt(Channel::Spi2) == InterruptOutcome::Completed {
        SPI2_DONE.signal(());
    }
}
