//! OSC transport
//!
//! Fire-and-forget UDP sender. Each dispatch encodes one OSC message with a
//! single integer argument and sends it to the configured destination; UDP
//! gives no delivery confirmation and none is expected.

use std::net::UdpSocket;

use rosc::{encoder, OscMessage, OscPacket, OscType};
use tracing::debug;

use crate::{Error, Result};

/// Outbound message dispatch contract
pub trait OscDispatch {
    fn send(&self, address: &str, value: i32) -> Result<()>;
}

/// UDP-backed OSC sender
pub struct OscSender {
    socket: UdpSocket,
}

impl OscSender {
    /// Bind an ephemeral local socket and aim it at `host:port`
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect((host, port))?;
        debug!("OSC sender targeting {host}:{port}");
        Ok(OscSender { socket })
    }
}

impl OscDispatch for OscSender {
    fn send(&self, address: &str, value: i32) -> Result<()> {
        let packet = OscPacket::Message(OscMessage {
            addr: address.to_string(),
            args: vec![OscType::Int(value)],
        });
        let buf = encoder::encode(&packet)
            .map_err(|e| Error::Osc(format!("failed to encode {address}: {e:?}")))?;
        self.socket.send(&buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_one_int_message_over_udp() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();

        let sender = OscSender::new("127.0.0.1", port).unwrap();
        sender.send("/light", 1).unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, "/light");
                assert_eq!(msg.args, vec![OscType::Int(1)]);
            }
            other => panic!("expected a message packet, got {other:?}"),
        }
    }
}
