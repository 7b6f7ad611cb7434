//! Broadcaster-side streaming session
//!
//! Owns the capture-and-transmit loop: one dedicated worker pops capture
//! chunks, conditions them, and writes them to the encrypted relay
//! connection. A single I/O failure is terminal for the session; the
//! surrounding application observes the dead session and restarts.

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::create_shared_queue;
use crate::audio::capture::CaptureStream;
use crate::audio::noise::NoiseReducer;
use crate::config::StreamConfig;
use crate::constants::{CHUNK_QUEUE_CAPACITY, STOP_JOIN_TIMEOUT};
use crate::error::Result;
use crate::net::tls::TlsClient;

/// Live stream sender for the broadcaster role
pub struct StreamSender {
    config: StreamConfig,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    /// Socket clone kept so `stop()` can force a blocked write to return
    socket: Option<TcpStream>,
}

impl StreamSender {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            socket: None,
        }
    }

    /// Start the capture-and-transmit loop
    ///
    /// No-op when already running. Device-open and connection failures
    /// (unreachable host, certificate or hostname mismatch) surface here;
    /// once the worker is spawned, mid-stream I/O errors end the loop
    /// without retry.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let tls = TlsClient::new(&self.config)?.connect()?;

        let queue = create_shared_queue(CHUNK_QUEUE_CAPACITY);
        let mut capture = CaptureStream::new(self.config.clone(), queue.clone())?;
        capture.start()?;

        self.socket = Some(tls.socket);
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let mut reducer = NoiseReducer::new(self.config.gate_threshold);
        let mut stream = tls.stream;

        let handle = thread::Builder::new()
            .name("azaan-sender".to_string())
            .spawn(move || {
                tracing::info!("Broadcast stream started");

                while running.load(Ordering::Relaxed) {
                    if let Some(err) = capture.check_errors() {
                        tracing::warn!("Capture error, ending broadcast: {}", err);
                        break;
                    }

                    match queue.try_pop() {
                        Some(chunk) => {
                            let conditioned = reducer.condition(&chunk.bytes);
                            if let Err(e) = stream.write_all(&conditioned) {
                                tracing::warn!("Relay write failed, ending broadcast: {}", e);
                                break;
                            }
                        }
                        None => thread::sleep(Duration::from_millis(2)),
                    }
                }

                // Release the device and close the connection on every exit
                // path; dropping the TLS stream sends close_notify.
                capture.stop();
                running.store(false, Ordering::SeqCst);
                tracing::info!("Broadcast stream ended");
            })
            .map_err(|e| crate::error::AudioError::StreamError(e.to_string()))?;

        self.worker = Some(handle);
        Ok(())
    }

    /// Signal the loop to end and wait up to a bounded timeout
    ///
    /// Safe to call when never started. Shuts the socket down so a blocked
    /// write returns promptly, then joins best-effort: the worker may still
    /// be finishing a blocking call when this returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(socket) = self.socket.take() {
            let _ = socket.shutdown(Shutdown::Both);
        }

        if let Some(handle) = self.worker.take() {
            super::bounded_join(handle, STOP_JOIN_TIMEOUT);
        }
    }

    /// Whether the session worker is active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The configuration this session was started with
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl Drop for StreamSender {
    fn drop(&mut self) {
        self.stop();
    }
}
