//! UDP intake for sACN telemetry.
//!
//! The listener binds one socket per instance, joins the universe's
//! multicast group when it can, and forwards every datagram to a shared
//! [`TelemetryDecoder`]. Unicast and broadcast packets sent straight to
//! the port are accepted too, since the game can be configured either way.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::decoder::TelemetryDecoder;
use crate::error::TelemetryError;
use crate::packet::{E131_PORT, multicast_group};

/// Largest datagram read in one call. Data packets top out at 638 bytes.
const RECV_BUFFER: usize = 1500;

/// Where and what to listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Local address to bind.
    pub bind_addr: IpAddr,
    /// Local UDP port.
    pub port: u16,
    /// Universe whose multicast group is joined.
    pub universe: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: E131_PORT,
            universe: 2,
        }
    }
}

/// A bound telemetry socket that has not started receiving yet.
#[derive(Debug)]
pub struct TelemetryListener {
    socket: UdpSocket,
    config: ListenerConfig,
}

impl TelemetryListener {
    /// Bind the socket and try to join the universe's multicast group.
    ///
    /// Failure to join the group is logged and tolerated; unicast delivery
    /// still works.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidUniverse`] for a universe outside
    /// `1..=63999` and [`TelemetryError::Bind`] if the socket cannot be
    /// bound.
    pub async fn bind(config: ListenerConfig) -> Result<Self, TelemetryError> {
        if config.universe == 0 || config.universe > 63_999 {
            return Err(TelemetryError::InvalidUniverse(config.universe));
        }

        let addr = SocketAddr::new(config.bind_addr, config.port);
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TelemetryError::Bind { addr, source })?;

        let group = multicast_group(config.universe);
        let interface = match config.bind_addr {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
        };
        if let Err(e) = socket.join_multicast_v4(group, interface) {
            debug!(%group, error = %e, "multicast join failed, unicast only");
        }

        Ok(Self { socket, config })
    }

    /// The address the socket actually bound to.
    ///
    /// # Errors
    ///
    /// Propagates the OS error from `getsockname`.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the receive loop on the Tokio runtime.
    ///
    /// The loop runs until the returned handle is aborted. Receive errors
    /// are logged and the loop keeps going.
    pub fn spawn(self, decoder: Arc<TelemetryDecoder>) -> JoinHandle<()> {
        let Self { socket, config } = self;
        tokio::spawn(async move {
            info!(
                port = config.port,
                universe = config.universe,
                "telemetry listener started"
            );
            let mut buf = vec![0_u8; RECV_BUFFER];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, _peer)) => {
                        if let Some(datagram) = buf.get(..len) {
                            decoder.ingest(datagram);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "telemetry receive failed");
                    }
                }
            }
        })
    }
}
