//! Art-Net protocol implementation (Art-Net 4)
//!
//! Art-Net is a UDP-based protocol for transmitting DMX512 over Ethernet.

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, UdpSocket};

use super::addressing::{check_universe, UniverseAddress};
use super::sender::{check_index, check_span, DmxSender, MemorySender, DMX_CHANNELS};
use crate::{error::ControlError, Result};

/// Default Art-Net UDP port
pub const ARTNET_PORT: u16 = 6454;

/// Art-Net output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtNetConfig {
    /// Local address the sockets bind to
    pub bind_address: String,
    /// Destination port on every node
    pub port: u16,
    /// Keep frames in memory instead of sending them
    pub dry_run: bool,
    pub nodes: Vec<ArtNetNode>,
}

impl Default for ArtNetConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: ARTNET_PORT,
            dry_run: false,
            nodes: Vec::new(),
        }
    }
}

/// An Art-Net node and the universes it receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtNetNode {
    #[serde(default)]
    pub name: String,
    pub ip: String,
    pub universes: Vec<u16>,
}

impl ArtNetConfig {
    /// Create one sender per configured universe
    pub fn build_senders(&self) -> Result<Vec<(u16, Box<dyn DmxSender>)>> {
        let mut senders: Vec<(u16, Box<dyn DmxSender>)> = Vec::new();

        for node in &self.nodes {
            let target = format!("{}:{}", node.ip, self.port);
            for &universe in &node.universes {
                check_universe(universe)?;
                let address = UniverseAddress::from_linear(universe);
                let sender: Box<dyn DmxSender> = if self.dry_run {
                    tracing::info!("Universe {} ({}) output kept in memory", universe, address);
                    Box::new(MemorySender::new(universe))
                } else {
                    let local = format!("{}:0", self.bind_address);
                    Box::new(ArtNetSender::bind(address, &local, &target)?)
                };
                senders.push((universe, sender));
            }
        }

        Ok(senders)
    }
}

/// Art-Net sender for outputting DMX data
pub struct ArtNetSender {
    socket: UdpSocket,
    target: SocketAddr,
    address: UniverseAddress,
    sequence: u8,
    data: [u8; DMX_CHANNELS],
}

impl ArtNetSender {
    /// Create a new Art-Net sender
    ///
    /// # Arguments
    /// * `address` - Art-Net universe address
    /// * `target` - Node address (e.g. "10.0.0.20:6454" or a broadcast address)
    pub fn new(address: UniverseAddress, target: &str) -> Result<Self> {
        Self::bind(address, "0.0.0.0:0", target)
    }

    /// Create a sender whose socket binds to `local`
    pub fn bind(address: UniverseAddress, local: &str, target: &str) -> Result<Self> {
        let target: SocketAddr = target.parse().map_err(|e| {
            ControlError::DmxError(format!("Invalid Art-Net target address {}: {}", target, e))
        })?;

        let socket = UdpSocket::bind(local)?;
        socket.set_broadcast(true)?;

        tracing::info!("Art-Net sender created for universe {} -> {}", address, target);

        Ok(Self {
            socket,
            target,
            address,
            sequence: 0,
            data: [0; DMX_CHANNELS],
        })
    }

    /// Send the current frame
    fn send(&mut self) -> Result<()> {
        // Sequence 0 disables reordering on the receiver
        self.sequence = self.sequence.checked_add(1).unwrap_or(1);
        let packet = self.build_artnet_packet();

        self.socket.send_to(&packet, self.target)?;

        tracing::trace!("Sent Art-Net DMX packet for universe {}", self.address);

        Ok(())
    }

    /// Build an Art-Net DMX packet (OpDmx)
    fn build_artnet_packet(&self) -> Vec<u8> {
        let mut packet = vec![0u8; 18 + DMX_CHANNELS];

        // Header: "Art-Net\0"
        packet[0..8].copy_from_slice(b"Art-Net\0");

        // OpCode: OpDmx (0x5000)
        packet[8..10].copy_from_slice(&0x5000u16.to_le_bytes());

        // Protocol version (14)
        packet[10..12].copy_from_slice(&14u16.to_be_bytes());

        packet[12] = self.sequence;

        // Physical (0)
        packet[13] = 0;

        // SubUni then Net
        packet[14..16].copy_from_slice(&self.address.port_address().to_le_bytes());

        // Length (512 channels, big-endian)
        packet[16..18].copy_from_slice(&(DMX_CHANNELS as u16).to_be_bytes());

        packet[18..].copy_from_slice(&self.data);

        packet
    }

    pub fn address(&self) -> UniverseAddress {
        self.address
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl DmxSender for ArtNetSender {
    fn set_channel(&mut self, index: usize, value: u8) -> Result<()> {
        check_index(index)?;
        self.data[index] = value;
        self.send()
    }

    fn fill_channels(&mut self, start: usize, stop: usize, value: u8) -> Result<()> {
        check_span(start, stop)?;
        self.data[start..stop].fill(value);
        self.send()
    }

    fn reset(&mut self) -> Result<()> {
        self.data.fill(0);
        self.send()
    }

    fn prep_channel(&mut self, index: usize, value: u8) -> Result<()> {
        check_index(index)?;
        self.data[index] = value;
        Ok(())
    }

    fn transmit(&mut self) -> Result<()> {
        self.send()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn receiver() -> (UdpSocket, String) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let target = socket.local_addr().unwrap().to_string();
        (socket, target)
    }

    fn recv_packet(socket: &UdpSocket) -> Vec<u8> {
        let mut buf = [0u8; 1024];
        let (len, _) = socket.recv_from(&mut buf).unwrap();
        buf[..len].to_vec()
    }

    #[test]
    fn test_artnet_packet_structure() {
        let sender = ArtNetSender::new(UniverseAddress::from_linear(0x21), "127.0.0.1:6454").unwrap();
        let packet = sender.build_artnet_packet();

        // Check header
        assert_eq!(&packet[0..8], b"Art-Net\0");

        // Check OpCode (little-endian)
        assert_eq!(packet[8], 0x00);
        assert_eq!(packet[9], 0x50);

        // Check protocol version (big-endian)
        assert_eq!(packet[10], 0);
        assert_eq!(packet[11], 14);

        // SubUni, Net
        assert_eq!(packet[14], 0x21);
        assert_eq!(packet[15], 0x00);

        // Check length (big-endian)
        assert_eq!(packet[16], 0x02);
        assert_eq!(packet[17], 0x00);

        assert_eq!(packet.len(), 18 + 512);
    }

    #[test]
    fn test_invalid_target() {
        let sender = ArtNetSender::new(UniverseAddress::from_linear(0), "invalid:address");
        assert!(matches!(sender, Err(ControlError::DmxError(_))));
    }

    #[test]
    fn test_set_channel_sends_frame() {
        let (socket, target) = receiver();
        let mut sender = ArtNetSender::new(UniverseAddress::from_linear(0), &target).unwrap();

        sender.set_channel(0, 255).unwrap();
        let packet = recv_packet(&socket);
        assert_eq!(packet[12], 1);
        assert_eq!(packet[18], 255);

        sender.set_channel(2, 7).unwrap();
        let packet = recv_packet(&socket);
        assert_eq!(packet[12], 2);
        assert_eq!(&packet[18..21], &[255, 0, 7]);
    }

    #[test]
    fn test_prep_then_transmit() {
        let (socket, target) = receiver();
        let mut sender = ArtNetSender::new(UniverseAddress::from_linear(3), &target).unwrap();

        sender.prep_channel(4, 200).unwrap();
        sender.transmit().unwrap();

        let packet = recv_packet(&socket);
        assert_eq!(packet[14], 3);
        assert_eq!(packet[18 + 4], 200);
    }

    #[test]
    fn test_build_senders_dry_run() {
        let config = ArtNetConfig {
            dry_run: true,
            nodes: vec![ArtNetNode {
                name: "stage".to_string(),
                ip: "10.0.0.20".to_string(),
                universes: vec![0, 1],
            }],
            ..Default::default()
        };

        let senders = config.build_senders().unwrap();
        let universes: Vec<u16> = senders.iter().map(|(u, _)| *u).collect();
        assert_eq!(universes, vec![0, 1]);
    }

    #[test]
    fn test_build_senders_rejects_large_universe() {
        let config = ArtNetConfig {
            dry_run: true,
            nodes: vec![ArtNetNode {
                name: String::new(),
                ip: "10.0.0.20".to_string(),
                universes: vec![4096],
            }],
            ..Default::default()
        };
        assert!(config.build_senders().is_err());
    }
}
