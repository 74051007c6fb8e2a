//! OpenHandy - Linear Actuator Firmware
//!
//! Main firmware binary for Raspberry Pi Pico W based actuator boards.
//! Homes the stroke on boot, then follows TCode position commands and
//! stroke patterns received over UDP, with local buttons as a fallback.
//!
//! Pin map:
//!
//! | Function            | GPIO          |
//! |---------------------|---------------|
//! | Motor PWM           | 16            |
//! | Motor DIR / BRAKEZ  | 17 / 18       |
//! | Motor enable        | 19            |
//! | Endstop lower/upper | 20 / 21       |
//! | Hall HA / HB / HC   | 10 / 11 / 12  |
//! | Buttons             | 2-7           |
//! | Thermal sensor      | 26 (ADC0)     |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel as AdcChannel, Config as AdcConfig};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::InterruptHandler as PioInterruptHandler;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_time::Timer;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use openhandy_core::config::{NetworkConfig, Tunables};
use openhandy_core::ui::Button;
use openhandy_drivers::{ActuatorBoard, HBridgeConfig, HBridgeMotor};
use openhandy_hal_rp2040::{Rp2040AnalogInput, Rp2040FlashStorage};

use crate::channels::{POSITION, STATUS};
use crate::config::ConfigPersistence;
use crate::network::WifiResources;

mod channels;
mod config;
mod network;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

/// PWM wrap value: 20 kHz at the default 125 MHz system clock
const PWM_TOP: u16 = 6249;

/// Reverse the hall count direction (motor wired phase-swapped)
const HALL_INVERTED: bool = false;

// Configuration lives for the whole program; tasks hold 'static references
static TUNABLES: StaticCell<Tunables> = StaticCell::new();
static NETWORK: StaticCell<NetworkConfig> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("OpenHandy firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let loaded = {
        let storage = Rp2040FlashStorage::new(p.FLASH, p.DMA_CH1);
        ConfigPersistence::new(storage).load().await
    };
    let tunables: &'static Tunables = TUNABLES.init(loaded.tunables);
    let network_config: &'static NetworkConfig = NETWORK.init(loaded.network);
    info!("Configuration loaded");

    // Motor driver
    let mut pwm_config = PwmConfig::default();
    pwm_config.top = PWM_TOP;
    let pwm = Pwm::new_output_a(p.PWM_SLICE0, p.PIN_16, pwm_config);
    let motor = HBridgeMotor::new(
        pwm,
        Output::new(p.PIN_17, Level::Low),
        Output::new(p.PIN_18, Level::Low),
        Output::new(p.PIN_19, Level::Low),
        HBridgeConfig::default(),
    );

    // Optical endstops idle high through the pull-ups
    let lower = Input::new(p.PIN_20, Pull::Up);
    let upper = Input::new(p.PIN_21, Pull::Up);

    let adc = Adc::new_blocking(p.ADC, AdcConfig::default());
    let thermal = Rp2040AnalogInput::new(adc, AdcChannel::new_pin(p.PIN_26, Pull::None));

    let board = ActuatorBoard::new(motor, lower, upper, thermal, &POSITION);
    info!("Actuator board initialized");

    let ha = Input::new(p.PIN_10, Pull::Up);
    let hb = Input::new(p.PIN_11, Pull::Up);
    let hc = Input::new(p.PIN_12, Pull::Up);

    spawner.spawn(tasks::encoder_task(ha, hb, hc, HALL_INVERTED).unwrap());
    spawner.spawn(tasks::control_task(tunables, board).unwrap());

    let buttons = [
        (Input::new(p.PIN_2, Pull::Up), Button::Power),
        (Input::new(p.PIN_3, Pull::Up), Button::Up),
        (Input::new(p.PIN_4, Pull::Up), Button::Down),
        (Input::new(p.PIN_5, Pull::Up), Button::Left),
        (Input::new(p.PIN_6, Pull::Up), Button::Right),
        (Input::new(p.PIN_7, Pull::Up), Button::Wifi),
    ];
    for (pin, button) in buttons {
        spawner.spawn(tasks::button_task(pin, button).unwrap());
    }

    let wifi = WifiResources {
        pwr: p.PIN_23,
        dio: p.PIN_24,
        cs: p.PIN_25,
        clk: p.PIN_29,
        pio: p.PIO0,
        dma: p.DMA_CH0,
    };
    match network::initialize_wifi(spawner, network_config, wifi).await {
        Ok((stack, control)) => {
            spawner.spawn(tasks::udp_task(stack, control, network_config).unwrap());
        }
        Err(e) => warn!("Running without network: {:?}", e),
    }

    info!("All tasks spawned, firmware running");

    loop {
        Timer::after_secs(60).await;
        match STATUS.try_take() {
            Some(status) => info!("Heartbeat: {:?}", status),
            None => warn!("Heartbeat: no status from control task"),
        }
    }
}
