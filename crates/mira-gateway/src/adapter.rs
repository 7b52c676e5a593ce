//! Gateway transport abstraction.

use thiserror::Error;

/// Callback invoked with each payload received from the swarm.
///
/// Callbacks fire in frame-completion order, on the transport's reader
/// thread; a slow callback backpressures that transport's receive path.
pub type PayloadCallback = Box<dyn FnMut(Vec<u8>) + Send + 'static>;

/// Errors surfaced by the transport adapters.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Failure opening or configuring the serial port.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Read or write failure on an open port.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The MQTT client rejected a request.
    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Operation requires `init` to have been called first.
    #[error("adapter is not initialized")]
    NotInitialized,

    /// `init` was called twice without an intervening `close`.
    #[error("adapter is already initialized")]
    AlreadyInitialized,
}

/// Common capability set of every gateway transport.
///
/// One implementation drives a serial link, framing outgoing payloads and
/// rebuilding incoming ones byte by byte; another talks to an MQTT broker,
/// which already preserves message boundaries. Callers hold a
/// `Box<dyn GatewayAdapter>` and interact only through this trait.
pub trait GatewayAdapter: Send {
    /// Connect the transport and start delivering received payloads to
    /// `on_payload`.
    fn init(&mut self, on_payload: PayloadCallback) -> Result<(), AdapterError>;

    /// Stop the transport and release its resources. Idempotent.
    fn close(&mut self) -> Result<(), AdapterError>;

    /// Deliver one payload to the swarm.
    fn send_data(&mut self, payload: &[u8]) -> Result<(), AdapterError>;
}
