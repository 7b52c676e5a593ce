//! Transport adapters for the mira swarm gateway.
//!
//! The host reaches the radio swarm either through a serial-attached gateway
//! board or through an MQTT broker. Both transports expose the same
//! capability set (initialize with a payload callback, send a payload, close)
//! behind the [`GatewayAdapter`] trait, so callers never depend on a concrete
//! transport.
//!
//! The serial transport frames payloads with [`mira_hdlc`] and rebuilds them
//! from the raw byte stream; the MQTT transport relies on the broker's
//! message boundaries and carries payloads base64 encoded.

mod adapter;
mod config;
mod mqtt;
mod serial;

pub use adapter::*;
pub use config::*;
pub use mqtt::*;
pub use serial::*;
