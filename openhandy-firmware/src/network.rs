//! WiFi bring-up
//!
//! Starts the CYW43439 driver and the embassy-net stack on a Pico W, then
//! joins the configured network.
//!
//! ```text
//! 1. Load CYW43439 firmware blobs
//! 2. Start the PIO SPI link and the driver (wifi_task)
//! 3. Create the network stack (net_task), DHCP or static IPv4
//! 4. Join WPA2, retrying with exponential backoff
//! 5. Wait for an IPv4 address
//! ```

use cyw43::{Control, JoinOptions};
use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::*;
use embassy_executor::Spawner;
use embassy_net::{
    Config as NetConfig, DhcpConfig, Ipv4Address, Ipv4Cidr, Stack, StackResources, StaticConfigV4,
};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIN_23, PIN_24, PIN_25, PIN_29, PIO0};
use embassy_rp::pio::Pio;
use embassy_rp::Peri;
use embassy_time::{Duration, Instant, Timer};
use static_cell::StaticCell;

use openhandy_core::config::NetworkConfig;

use crate::Irqs;

/// Initial join retry delay
const INITIAL_RETRY_DELAY_MS: u64 = 1000;

/// Longest pause between join attempts
const MAX_RETRY_DELAY_MS: u64 = 16_000;

/// Time allowed for DHCP before the join is retried
const DHCP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sockets the stack can hold (UDP command socket plus DHCP)
const STACK_SOCKETS: usize = 4;

/// WiFi bring-up errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiError {
    /// No SSID provisioned
    NotConfigured,
    /// Joined, but no address was assigned in time
    DhcpTimeout,
}

/// Pins and peripherals wired to the CYW43439
pub struct WifiResources {
    pub pwr: Peri<'static, PIN_23>,
    pub dio: Peri<'static, PIN_24>,
    pub cs: Peri<'static, PIN_25>,
    pub clk: Peri<'static, PIN_29>,
    pub pio: Peri<'static, PIO0>,
    pub dma: Peri<'static, DMA_CH0>,
}

/// Start the WiFi driver and network stack
///
/// The stack is returned before the network is joined; see [`join`].
pub async fn initialize_wifi(
    spawner: Spawner,
    config: &NetworkConfig,
    r: WifiResources,
) -> Result<(Stack<'static>, Control<'static>), WifiError> {
    if !config.is_provisioned() {
        info!("WiFi not provisioned (empty SSID), network disabled");
        return Err(WifiError::NotConfigured);
    }

    let fw = include_bytes!("../cyw43-firmware/43439A0.bin");
    let clm = include_bytes!("../cyw43-firmware/43439A0_clm.bin");

    let pwr = Output::new(r.pwr, Level::Low);
    let cs = Output::new(r.cs, Level::High);
    let mut pio = Pio::new(r.pio, Irqs);
    let spi = PioSpi::new(
        &mut pio.common,
        pio.sm0,
        DEFAULT_CLOCK_DIVIDER,
        pio.irq0,
        cs,
        r.dio,
        r.clk,
        r.dma,
    );

    static STATE: StaticCell<cyw43::State> = StaticCell::new();
    let state = STATE.init(cyw43::State::new());
    let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
    spawner.spawn(wifi_task(runner).unwrap());

    control.init(clm).await;
    control
        .set_power_management(cyw43::PowerManagementMode::PowerSave)
        .await;

    let net_config = if config.use_dhcp {
        info!("Configuring DHCP as {}", config.hostname.as_str());
        let mut dhcp = DhcpConfig::default();
        dhcp.hostname = Some(config.hostname.clone());
        NetConfig::dhcpv4(dhcp)
    } else {
        let [a, b, c, d] = config.ip;
        info!("Configuring static IP {}.{}.{}.{}", a, b, c, d);
        NetConfig::ipv4_static(static_config(config))
    };

    // No hardware RNG on the RP2040; boot time varies with flash and WiFi init
    let seed = 0x4f48_5f6e_6574_0000 ^ Instant::now().as_ticks();

    static RESOURCES: StaticCell<StackResources<STACK_SOCKETS>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        net_device,
        net_config,
        RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(net_task(runner).unwrap());

    Ok((stack, control))
}

/// Join the configured network and wait for an address
///
/// Join failures are retried forever; the actuator keeps working locally
/// in the meantime.
pub async fn join(
    stack: Stack<'static>,
    control: &mut Control<'static>,
    config: &NetworkConfig,
) -> Result<[u8; 4], WifiError> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        info!("Joining '{}' (attempt {})", config.ssid.as_str(), attempt);

        let options = JoinOptions::new(config.password.as_bytes());
        match control.join(config.ssid.as_str(), options).await {
            Ok(()) => break,
            Err(_) => {
                let delay = retry_delay(attempt);
                warn!("WiFi join failed, retrying in {} ms", delay.as_millis());
                Timer::after(delay).await;
            }
        }
    }
    info!("WiFi joined");

    let start = Instant::now();
    while !stack.is_config_up() {
        if start.elapsed() > DHCP_TIMEOUT {
            error!("No IPv4 address after {} s", DHCP_TIMEOUT.as_secs());
            return Err(WifiError::DhcpTimeout);
        }
        Timer::after_millis(100).await;
    }

    let ip = stack
        .config_v4()
        .map(|cfg| cfg.address.address().octets())
        .unwrap_or(config.ip);
    info!("Network up at {}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]);
    Ok(ip)
}

/// Static IPv4 configuration from the stored settings
fn static_config(config: &NetworkConfig) -> StaticConfigV4 {
    let [a, b, c, d] = config.ip;
    let [ga, gb, gc, gd] = config.gateway;
    let prefix = config.prefix_len().unwrap_or(24);

    let mut dns_servers = heapless::Vec::new();
    if config.dns != [0, 0, 0, 0] {
        let [da, db, dc, dd] = config.dns;
        let _ = dns_servers.push(Ipv4Address::new(da, db, dc, dd));
    }

    StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::new(a, b, c, d), prefix),
        gateway: Some(Ipv4Address::new(ga, gb, gc, gd)),
        dns_servers,
    }
}

/// Exponential backoff: 1 s, 2 s, 4 s ... capped at 16 s
fn retry_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(4);
    Duration::from_millis((INITIAL_RETRY_DELAY_MS << shift).min(MAX_RETRY_DELAY_MS))
}

/// CYW43439 driver event loop
#[embassy_executor::task]
async fn wifi_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

/// Network stack event loop
#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}
