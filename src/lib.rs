//! CRTP: fixed-size, port-multiplexed real-time packet transport
//!
//! This library implements the packet-transport core of a flight-controller
//! firmware: small packets routed by port and channel over whichever link
//! (radio, wired) is currently attached, with bounded queues on both
//! directions and a pair of pump tasks moving packets at flight-control
//! rates.

pub mod core;
pub mod link;
pub mod protocol;
pub mod stack;

// Re-export commonly used items
pub use self::core::{ports, CrtpConfig, CrtpPacket, Error, Result};
pub use self::link::{CrtpLink, LinkCell, NopLink};
pub use self::protocol::CrtpCodec;
pub use self::stack::{CrtpCallback, CrtpStack, LinkStats, RateSample};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
