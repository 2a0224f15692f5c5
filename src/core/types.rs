use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result, CRTP_MAX_DATA_SIZE, CRTP_NBR_OF_PORTS};
use super::{CRTP_RX_QUEUE_SIZE, CRTP_TX_QUEUE_SIZE, STATS_INTERVAL};

/// Well-known port assignments used by the rest of the firmware
///
/// The stack itself treats every port the same; these are only the
/// conventional numbers the higher layers register their queues on.
pub mod ports {
    pub const CONSOLE: u8 = 0x00;
    pub const PARAM: u8 = 0x02;
    pub const COMMANDER: u8 = 0x03;
    pub const MEM: u8 = 0x04;
    pub const LOG: u8 = 0x05;
    pub const LOCALIZATION: u8 = 0x06;
    pub const SETPOINT_GENERIC: u8 = 0x07;
    pub const PLATFORM: u8 = 0x0D;
    pub const LINK_CTRL: u8 = 0x0F;
}

/// A single CRTP packet
///
/// Packets are small value types, copied between tasks rather than shared,
/// so producers and consumers never alias each other's buffers. The payload
/// is bounded by [`CRTP_MAX_DATA_SIZE`]; exceeding it is a caller bug and
/// asserts rather than returning an error.
///
/// On the wire the packet starts with a single header byte: port in the
/// high nibble, two reserved bits (always set), channel in the low two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrtpPacket {
    port: u8,
    channel: u8,
    size: u8,
    data: [u8; CRTP_MAX_DATA_SIZE],
}

impl CrtpPacket {
    /// Creates a packet addressed to `port`/`channel` carrying `payload`
    ///
    /// # Panics
    ///
    /// Panics if `port` is not 0..=15, `channel` is not 0..=3, or the
    /// payload exceeds [`CRTP_MAX_DATA_SIZE`].
    pub fn new(port: u8, channel: u8, payload: &[u8]) -> Self {
        assert!(
            (port as usize) < CRTP_NBR_OF_PORTS,
            "port {} out of range",
            port
        );
        assert!(channel <= 0x03, "channel {} out of range", channel);
        assert!(
            payload.len() <= CRTP_MAX_DATA_SIZE,
            "payload of {} bytes exceeds CRTP_MAX_DATA_SIZE",
            payload.len()
        );

        let mut data = [0u8; CRTP_MAX_DATA_SIZE];
        data[..payload.len()].copy_from_slice(payload);

        CrtpPacket {
            port,
            channel,
            size: payload.len() as u8,
            data,
        }
    }

    /// Reassembles a packet from a wire header byte and payload
    ///
    /// Unlike [`CrtpPacket::new`] this is fed with bytes from a link, so an
    /// oversized payload is a recoverable protocol error, not a caller bug.
    pub fn from_header(header: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > CRTP_MAX_DATA_SIZE {
            return Err(Error::packet(format!(
                "payload of {} bytes exceeds maximum",
                payload.len()
            )));
        }

        let mut data = [0u8; CRTP_MAX_DATA_SIZE];
        data[..payload.len()].copy_from_slice(payload);

        Ok(CrtpPacket {
            port: (header >> 4) & 0x0F,
            channel: header & 0x03,
            size: payload.len() as u8,
            data,
        })
    }

    /// Returns the destination port (0..=15)
    pub fn port(&self) -> u8 {
        self.port
    }

    /// Returns the channel within the port (0..=3)
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Returns the payload length in bytes
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Returns the payload bytes
    pub fn data(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }

    /// Returns the wire header byte: port, reserved bits, channel
    pub fn header(&self) -> u8 {
        (self.port << 4) | (0x03 << 2) | (self.channel & 0x03)
    }

    /// Returns true for the 0xFF-header keep-alive packet some links emit
    pub fn is_null(&self) -> bool {
        self.header() == 0xFF
    }
}

/// Tunable parameters of a stack instance
///
/// The defaults match the firmware the protocol originates from; tests
/// shrink the queues and the sampling interval to keep runtimes short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrtpConfig {
    /// Capacity of the shared outbound queue
    pub tx_queue_size: usize,
    /// Capacity of each port's inbound queue
    pub port_queue_size: usize,
    /// Interval between throughput rate samples
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub stats_interval: Duration,
    /// Upper bound on how long a pump idles before re-checking the link
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub link_idle_delay: Duration,
    /// Backoff between retries when the link refuses an outbound packet
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub send_retry_delay: Duration,
    /// Poll delay when the link has no inbound packet ready
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub receive_poll_delay: Duration,
}

impl Default for CrtpConfig {
    fn default() -> Self {
        CrtpConfig {
            tx_queue_size: CRTP_TX_QUEUE_SIZE,
            port_queue_size: CRTP_RX_QUEUE_SIZE,
            stats_interval: STATS_INTERVAL,
            link_idle_delay: Duration::from_millis(10),
            send_retry_delay: Duration::from_millis(10),
            receive_poll_delay: Duration::from_millis(1),
        }
    }
}
