//! Microphone capture for the broadcaster role
//!
//! The cpal stream lives on a dedicated thread; its callback converts f32
//! samples to i16 little-endian bytes and assembles fixed-size capture
//! chunks into a shared queue consumed by the sending worker.

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::{AudioChunk, SharedChunkQueue};
use crate::audio::device::{default_input_device, stream_config};
use crate::config::StreamConfig;
use crate::error::AudioError;

/// Capture stream for the default input device
pub struct CaptureStream {
    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Output queue for captured chunks
    output: SharedChunkQueue,

    /// Feed parameters
    config: StreamConfig,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,
}

impl CaptureStream {
    /// Create a capture stream against the default input device
    ///
    /// Device lookup happens here so a missing device surfaces to the caller
    /// before any worker is spawned.
    pub fn new(config: StreamConfig, output: SharedChunkQueue) -> Result<Self, AudioError> {
        let (_, name) = default_input_device()?;
        tracing::debug!("Capture device: {}", name);

        Ok(Self {
            running: Arc::new(AtomicBool::new(false)),
            output,
            config,
            thread_handle: None,
            error_rx: None,
        })
    }

    /// Start capturing audio
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (device, _) = default_input_device()?;
        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let output = self.output.clone();
        let cpal_config = stream_config(self.config.channels, self.config.sample_rate);
        let chunk_bytes = self.config.chunk_bytes();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("azaan-capture".to_string())
            .spawn(move || {
                let mut pending: Vec<u8> = Vec::with_capacity(chunk_bytes * 2);

                let stream = device.build_input_stream(
                    &cpal_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }

                        for &sample in data {
                            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                            pending.extend_from_slice(&value.to_le_bytes());
                        }

                        // Emit complete capture chunks only; the remainder
                        // waits for the next callback.
                        while pending.len() >= chunk_bytes {
                            let rest = pending.split_off(chunk_bytes);
                            let chunk = AudioChunk::new(std::mem::replace(&mut pending, rest));
                            let _ = output.push(chunk);
                        }
                    },
                    move |err| {
                        let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            tracing::error!("Failed to start capture stream: {}", e);
                            return;
                        }

                        // Keep thread alive while running; the stream drops
                        // on exit, releasing the device.
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to build capture stream: {}", e);
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Check for stream errors reported by the capture callback
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for CaptureStream {
    fn drop(&mut self) {
        self.stop();
    }
}
