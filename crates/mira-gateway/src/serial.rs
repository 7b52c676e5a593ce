//! Serial transport: HDLC-framed payloads over a gateway board's UART.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use mira_hdlc::{encode_frame, DecoderState, FrameDecoder};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterError, GatewayAdapter, PayloadCallback};

/// Read timeout on the port; keeps the reader thread responsive to `close`.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

// ============================================================================
// Configuration
// ============================================================================

/// Serial port configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path of the gateway board.
    pub port: String,
    /// Baud rate of the gateway UART.
    pub baudrate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: "/dev/ttyACM0".to_string(),
            baudrate: 1_000_000,
        }
    }
}

// ============================================================================
// Serial Adapter
// ============================================================================

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Serial-backed gateway transport.
///
/// Outgoing payloads are framed with [`encode_frame`] before hitting the
/// wire. A dedicated reader thread drives every incoming byte through a
/// single [`FrameDecoder`] and hands each completed frame to the payload
/// callback; per-frame decode errors are logged and decoding continues with
/// the next flag on the stream.
pub struct SerialAdapter {
    config: SerialConfig,
    port: Option<SharedPort>,
    reader: Option<JoinHandle<()>>,
    cancel_flag: Arc<AtomicBool>,
}

impl SerialAdapter {
    /// Create an adapter for the given port. No I/O happens until `init`.
    pub fn new(config: SerialConfig) -> Self {
        SerialAdapter {
            config,
            port: None,
            reader: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configuration this adapter was created with.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl GatewayAdapter for SerialAdapter {
    fn init(&mut self, on_payload: PayloadCallback) -> Result<(), AdapterError> {
        if self.port.is_some() {
            return Err(AdapterError::AlreadyInitialized);
        }
        self.cancel_flag.store(false, Ordering::Relaxed);

        let port = serialport::new(&self.config.port, self.config.baudrate)
            .timeout(READ_TIMEOUT)
            .open()?;
        info!(
            "connected to gateway on {} at {} baud",
            self.config.port, self.config.baudrate
        );

        let port: SharedPort = Arc::new(Mutex::new(port));
        let reader = spawn_reader(port.clone(), self.cancel_flag.clone(), on_payload);
        self.port = Some(port);
        self.reader = Some(reader);
        Ok(())
    }

    fn close(&mut self) -> Result<(), AdapterError> {
        self.cancel_flag.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
        if self.port.take().is_some() {
            info!("disconnected from gateway on {}", self.config.port);
        }
        Ok(())
    }

    fn send_data(&mut self, payload: &[u8]) -> Result<(), AdapterError> {
        let port = self.port.as_ref().ok_or(AdapterError::NotInitialized)?;
        let wire = encode_frame(payload);
        // A poisoned lock only means the reader thread panicked; the port
        // handle itself is still usable.
        let mut guard = match port.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.write_all(&wire)?;
        guard.flush()?;
        debug!("sent payload ({} bytes on the wire)", wire.len());
        Ok(())
    }
}

impl Drop for SerialAdapter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ============================================================================
// Reader Thread
// ============================================================================

fn spawn_reader(
    port: SharedPort,
    cancel_flag: Arc<AtomicBool>,
    mut on_payload: PayloadCallback,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 256];

        loop {
            if cancel_flag.load(Ordering::Relaxed) {
                break;
            }

            let read_result = {
                let mut guard = match port.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                guard.read(&mut buf)
            };

            match read_result {
                Ok(0) => {
                    warn!("serial port closed by the other end");
                    break;
                }
                Ok(n) => pump_bytes(&mut decoder, &buf[..n], &mut on_payload),
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    // Expected between frames; loop to re-check the cancel flag.
                }
                Err(e) => {
                    warn!("serial read error: {}", e);
                    break;
                }
            }
        }
    })
}

/// Drive a chunk of wire bytes through the decoder, invoking `on_payload`
/// for every completed frame.
///
/// A malformed sequence drops only the frame in progress: the error is
/// logged and decoding resumes with the next flag on the stream.
fn pump_bytes(
    decoder: &mut FrameDecoder,
    bytes: &[u8],
    on_payload: &mut dyn FnMut(Vec<u8>),
) {
    for &byte in bytes {
        match decoder.handle_byte(byte) {
            Ok(()) => {
                if decoder.state() == DecoderState::Ready {
                    if let Some(payload) = decoder.take_frame() {
                        debug!("received payload ({} bytes)", payload.len());
                        on_payload(payload);
                    }
                }
            }
            Err(e) => warn!("dropping frame: {}", e),
        }
    }
}
