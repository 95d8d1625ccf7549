//! # PicoClient Core
//!
//! Pure `no_std` MQTT 3.1.1 client core library.
//!
//! This library contains the wire codec, the packet engines and the client
//! session logic. It is platform-agnostic and has no async runtime
//! dependency; runtime crates supply the transport, time source and delay.
//!
//! ## Features
//!
//! - **no_std** compatible - no standard library, no heap by default
//! - **MQTT 3.1.1** framing for every control packet
//! - **Non-allocating decode** - strings are views into a caller buffer
//! - **Streamed payloads** - PUBLISH bodies never pass through a copy
//! - **Generic networking** - works with any ordered byte stream
//! - **Configurable** - compile-time capacities via const generics
//!
//! ## Limitations
//!
//! - QoS 0 publishing only (QoS 1/2 are framed but not tracked)
//! - No TLS, no reconnect policy, no persistence
//! - One in-flight SUBSCRIBE and one in-flight PINGREQ at a time

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod client;
pub mod decoder;
pub mod error;
pub mod network;
pub mod protocol;
pub mod rx;
pub mod session;
pub mod time;
pub mod topics;
pub mod tx;

#[cfg(test)]
pub(crate) mod testutil;

// Convenience re-exports
pub use client::{Client, IgnorePublishes, PublishHandler};
#[cfg(feature = "alloc")]
pub use decoder::AllocDecoder;
pub use decoder::{Decode, NoAllocDecoder};
pub use error::{Error, NetworkError, ProtocolError, Result};
pub use network::Transport;
pub use rx::{PacketHandler, PayloadReader, Rx};
pub use session::{Session, Subscription};
pub use time::{Delay, DummyTimeSource, NoopDelay, TimeSource};
pub use tx::Tx;

// Protocol re-exports
pub use protocol::packets::{
    ConnAck, Connect, ConnectFlags, ConnectReturnCode, Publish, PublishFlags, SubAck,
    Subscribe, SubscribeFilter, Unsubscribe,
};
pub use protocol::{FixedHeader, PacketType, QoS, SubackReturnCode};
