//! Live feed playback for the listener role
//!
//! Mirror of the capture side: the cpal output stream lives on a dedicated
//! thread and its callback drains received chunks from a shared queue,
//! converting i16 little-endian bytes back to f32 samples. Underruns play
//! silence.

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::buffer::SharedChunkQueue;
use crate::audio::device::{default_output_device, stream_config};
use crate::config::StreamConfig;
use crate::error::AudioError;

/// Playback stream for the default output device
pub struct PlaybackStream {
    /// Whether playback is running
    running: Arc<AtomicBool>,

    /// Input queue of received chunks
    input: SharedChunkQueue,

    /// Feed parameters
    config: StreamConfig,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,
}

impl PlaybackStream {
    /// Create a playback stream against the default output device
    pub fn new(config: StreamConfig, input: SharedChunkQueue) -> Result<Self, AudioError> {
        let (_, name) = default_output_device()?;
        tracing::debug!("Playback device: {}", name);

        Ok(Self {
            running: Arc::new(AtomicBool::new(false)),
            input,
            config,
            thread_handle: None,
            error_rx: None,
        })
    }

    /// Start playback
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (device, _) = default_output_device()?;
        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let input = self.input.clone();
        let cpal_config = stream_config(self.config.channels, self.config.sample_rate);

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("azaan-playback".to_string())
            .spawn(move || {
                // Bytes popped from the queue but not yet written out
                let mut leftover: Vec<u8> = Vec::new();

                let stream = device.build_output_stream(
                    &cpal_config,
                    move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        for slot in out.iter_mut() {
                            while leftover.len() < 2 {
                                match input.try_pop() {
                                    Some(chunk) => leftover.extend_from_slice(&chunk.bytes),
                                    None => break,
                                }
                            }

                            *slot = if leftover.len() >= 2 {
                                let value = i16::from_le_bytes([leftover[0], leftover[1]]);
                                leftover.drain(..2);
                                value as f32 / i16::MAX as f32
                            } else {
                                0.0
                            };
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
                            tracing::error!("Failed to start playback stream: {}", e);
                            return;
                        }

                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to build playback stream: {}", e);
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if playback is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Check for stream errors reported by the output callback
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for PlaybackStream {
    fn drop(&mut self) {
        self.stop();
    }
}
