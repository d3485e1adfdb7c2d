//! Wake-on-LAN magic packet sender.

use std::net::UdpSocket;

use crate::error::{CircoError, Result};

const WOL_PORT: u16 = 9;

/// A parsed 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Parses `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`.
    pub fn parse(input: &str) -> Result<Self> {
        let separator = if input.contains(':') { ':' } else { '-' };
        let octets: Vec<&str> = input.split(separator).collect();
        if octets.len() != 6 {
            return Err(CircoError::invalid_request(format!(
                "invalid MAC address: {input}"
            )));
        }

        let mut mac = [0u8; 6];
        for (slot, octet) in mac.iter_mut().zip(octets) {
            *slot = u8::from_str_radix(octet, 16).map_err(|_| {
                CircoError::invalid_request(format!("invalid MAC address: {input}"))
            })?;
        }
        Ok(Self(mac))
    }

    /// The magic packet: six 0xFF bytes followed by the address repeated
    /// sixteen times.
    pub fn magic_packet(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(102);
        packet.extend_from_slice(&[0xFF; 6]);
        for _ in 0..16 {
            packet.extend_from_slice(&self.0);
        }
        packet
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Broadcasts a magic packet for `mac` on the local network.
pub fn wake(mac: &MacAddress) -> Result<()> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_broadcast(true)?;
    socket.send_to(&mac.magic_packet(), ("255.255.255.255", WOL_PORT))?;
    Ok(())
}
