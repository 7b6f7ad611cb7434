//! Listener-side streaming session
//!
//! Symmetric counterpart of the sender: one dedicated worker reads chunk
//! sized slices from the encrypted connection, conditions them with its own
//! noise reducer, and hands them to the playback sink. Connection
//! establishment failures are reported synchronously from `start()` so the
//! failover decision can be made immediately.

use std::io::Read;
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::buffer::{create_shared_queue, AudioChunk};
use crate::audio::noise::NoiseReducer;
use crate::audio::playback::PlaybackStream;
use crate::config::StreamConfig;
use crate::constants::{CHUNK_QUEUE_CAPACITY, STOP_JOIN_TIMEOUT};
use crate::error::Result;
use crate::net::tls::TlsClient;

/// Live stream receiver for the listener role
pub struct StreamReceiver {
    config: StreamConfig,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    /// Socket clone kept so `stop()` can force a blocked read to return
    socket: Option<TcpStream>,
}

impl StreamReceiver {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            socket: None,
        }
    }

    /// Start the receive-and-playback loop
    ///
    /// No-op when already running. Refused or timed-out connections and
    /// certificate failures surface here rather than in the worker; after a
    /// successful start the loop runs until stopped, the peer closes, or an
    /// I/O error ends it.
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let tls = TlsClient::new(&self.config)?.connect()?;

        let queue = create_shared_queue(CHUNK_QUEUE_CAPACITY);
        let mut playback = PlaybackStream::new(self.config.clone(), queue.clone())?;
        playback.start()?;

        self.socket = Some(tls.socket);
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let mut reducer = NoiseReducer::new(self.config.gate_threshold);
        let chunk_bytes = self.config.chunk_bytes();
        let mut stream = tls.stream;

        let handle = thread::Builder::new()
            .name("azaan-receiver".to_string())
            .spawn(move || {
                tracing::info!("Live feed started");
                let mut buf = vec![0u8; chunk_bytes];

                while running.load(Ordering::Relaxed) {
                    // Partial reads are fine; the conditioner handles any
                    // length and playback consumes bytes, not chunks.
                    match stream.read(&mut buf) {
                        Ok(0) => {
                            tracing::info!("Live feed closed by relay");
                            break;
                        }
                        Ok(n) => {
                            let conditioned = reducer.condition(&buf[..n]);
                            let _ = queue.push(AudioChunk::new(conditioned));
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            tracing::warn!("Live feed read failed: {}", e);
                            break;
                        }
                    }
                }

                playback.stop();
                running.store(false, Ordering::SeqCst);
                tracing::info!("Live feed ended");
            })
            .map_err(|e| crate::error::AudioError::StreamError(e.to_string()))?;

        self.worker = Some(handle);
        Ok(())
    }

    /// Signal the loop to end and wait up to a bounded timeout
    ///
    /// Safe to call when never started. Shuts the socket down so a blocked
    /// read returns promptly, then joins best-effort.
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

impl Drop for StreamReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

impl crate::failover::LiveFeed for StreamReceiver {
    fn start(&mut self) -> Result<()> {
        StreamReceiver::start(self)
    }

    fn stop(&mut self) {
        StreamReceiver::stop(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_without_start_is_a_noop() {
        let mut receiver = StreamReceiver::new(StreamConfig::default());
        assert!(!receiver.is_running());
        receiver.stop();
        receiver.stop();
        assert!(!receiver.is_running());
    }

    #[test]
    fn start_against_refused_port_fails_synchronously() {
        // Bind a listener and drop it so the port actively refuses
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut receiver = StreamReceiver::new(StreamConfig::new("127.0.0.1", port));
        assert!(receiver.start().is_err());
        assert!(!receiver.is_running());
    }
}
