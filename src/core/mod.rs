//! Core types and constants for the CRTP stack
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod serde;
pub mod types;

pub use self::error::{Error, Result};
pub use self::types::{ports, CrtpConfig, CrtpPacket};

use std::time::Duration;

/// Maximum payload size of a single packet in bytes
pub const CRTP_MAX_DATA_SIZE: usize = 30;

/// Number of addressable ports
pub const CRTP_NBR_OF_PORTS: usize = 16;

/// Capacity of the shared outbound queue in packets
pub const CRTP_TX_QUEUE_SIZE: usize = 120;

/// Capacity of each port's inbound queue in packets
pub const CRTP_RX_QUEUE_SIZE: usize = 16;

/// Interval between throughput rate samples
pub const STATS_INTERVAL: Duration = Duration::from_millis(500);
