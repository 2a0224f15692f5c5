//! Wire-adjacent protocol helpers
//!
//! The stack routes opaque payloads and does not define any transport's air
//! interface, but every transport must agree on the packet header layout.
//! This module provides the shared framing used by byte-stream links.

pub mod codec;

pub use self::codec::CrtpCodec;
