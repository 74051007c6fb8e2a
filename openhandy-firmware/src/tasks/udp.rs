//! UDP command and discovery task
//!
//! Joins the network, then serves the command port: datagrams go to the
//! control task's inbox unparsed, and discovery announcements queued by the
//! control task go out as broadcasts.

use cyw43::Control;
use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{Ipv4Address, Stack};
use portable_atomic::Ordering;

use openhandy_core::config::NetworkConfig;
use openhandy_protocol::{Announcement, DISCOVERY_PORT, MAX_DATAGRAM_LEN};

use crate::channels::{
    Datagram, DISCOVERY_OUT, DISCOVERY_REQUEST, INBOX, INBOX_OVERFLOW, INBOX_TRUNCATED,
};
use crate::network;

/// Socket metadata slots per direction
const PACKET_SLOTS: usize = 8;

/// Socket buffer size per direction
const SOCKET_BUFFER_LEN: usize = 2048;

/// UDP task - network join, command intake and discovery broadcast
#[embassy_executor::task]
pub async fn udp_task(
    stack: Stack<'static>,
    mut control: Control<'static>,
    config: &'static NetworkConfig,
) {
    info!("UDP task started");

    let ip = loop {
        match network::join(stack, &mut control, config).await {
            Ok(ip) => break ip,
            Err(e) => warn!("Network bring-up failed: {:?}, retrying", e),
        }
    };

    let mut rx_meta = [PacketMetadata::EMPTY; PACKET_SLOTS];
    let mut rx_buffer = [0u8; SOCKET_BUFFER_LEN];
    let mut tx_meta = [PacketMetadata::EMPTY; PACKET_SLOTS];
    let mut tx_buffer = [0u8; SOCKET_BUFFER_LEN];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );

    if let Err(e) = socket.bind(config.udp_port) {
        error!("Failed to bind UDP port {}: {:?}", config.udp_port, e);
        return;
    }
    info!("Listening for commands on UDP port {}", config.udp_port);

    let announcement = Announcement {
        ip,
        hostname: config.hostname.as_str(),
        command_port: config.udp_port,
    }
    .encode();
    DISCOVERY_REQUEST.signal(());

    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    loop {
        let event = select(socket.recv_from(&mut buf), DISCOVERY_OUT.receive()).await;
        match event {
            Either::First(Ok((len, meta))) => {
                trace!("{} bytes from {:?}", len, meta.endpoint);
                forward(&buf[..len]);
            }
            Either::First(Err(e)) => {
                // Truncation is the only receive error
                debug!("Datagram over {} bytes: {:?}", MAX_DATAGRAM_LEN, e);
                INBOX_TRUNCATED.fetch_add(1, Ordering::Relaxed);
            }
            Either::Second(()) => {
                let dest = (Ipv4Address::BROADCAST, DISCOVERY_PORT);
                match socket.send_to(announcement.as_bytes(), dest).await {
                    Ok(()) => debug!("Discovery announcement sent"),
                    Err(e) => warn!("Discovery send failed: {:?}", e),
                }
            }
        }
    }
}

/// Hand a payload to the control task; a full inbox drops it
fn forward(payload: &[u8]) {
    let Ok(datagram) = Datagram::from_slice(payload) else {
        INBOX_TRUNCATED.fetch_add(1, Ordering::Relaxed);
        return;
    };
    if INBOX.try_send(datagram).is_err() {
        INBOX_OVERFLOW.fetch_add(1, Ordering::Relaxed);
    }
}
