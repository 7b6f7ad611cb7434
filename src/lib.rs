//! # Azaan Streamer
//!
//! Live call-to-prayer audio broadcasting over an untrusted network, with
//! priority-ranked feed selection on the listener side and graceful fallback
//! to locally stored recordings.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │             BROADCASTER              │
//! │  ┌────────────┐    ┌──────────────┐  │
//! │  │ Microphone │───▶│ NoiseReducer │  │
//! │  │ (capture)  │    └──────┬───────┘  │
//! │  └────────────┘           ▼          │
//! │               ┌─────────────────────┐│
//! │               │ StreamSender        ││
//! │               │ (TLS to relay)      ││
//! │               └──────────┬──────────┘│
//! └──────────────────────────┼───────────┘
//!                            │ raw PCM over TLS
//!                  ┌─────────▼─────────┐
//!                  │ relay (fan-out,   │
//!                  │ external)         │
//!                  └─────────┬─────────┘
//! ┌──────────────────────────┼────────────────────┐
//! │         LISTENER         ▼                    │
//! │  ┌─────────────────────┐   ┌───────────────┐  │
//! │  │ FailoverCoordinator │──▶│ StreamReceiver│  │
//! │  │  PriorityRegistry   │   │ NoiseReducer  │  │
//! │  │  + live-status set  │   │ + playback    │  │
//! │  └──────────┬──────────┘   └───────────────┘  │
//! │             │ no live feed / connect failure  │
//! │             ▼                                 │
//! │  ┌─────────────────────┐                      │
//! │  │ OfflineAzaanPlayer  │                      │
//! │  └─────────────────────┘                      │
//! └───────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod auth;
pub mod config;
pub mod error;
pub mod failover;
pub mod net;
pub mod notify;
pub mod offline;
pub mod priority;
pub mod registry;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    use std::time::Duration;

    /// Default sample rate for the azaan feed (speech-band audio)
    pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

    /// Default channel count (mono voice feed)
    pub const DEFAULT_CHANNELS: u16 = 1;

    /// Capture chunk size in samples per channel
    pub const DEFAULT_CHUNK_SAMPLES: usize = 1024;

    /// Bytes per PCM sample (signed 16-bit little-endian)
    pub const SAMPLE_WIDTH: usize = 2;

    /// Frame size of the neural suppressor in samples
    pub const NEURAL_FRAME_SAMPLES: usize = 480;

    /// Default RMS threshold for the energy-gate fallback
    pub const DEFAULT_GATE_THRESHOLD: u32 = 350;

    /// Timeout for establishing the relay connection
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// How long `stop()` waits for a session worker to exit
    pub const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

    /// Chunk queue capacity between capture/receive and the consuming side
    pub const CHUNK_QUEUE_CAPACITY: usize = 256;

    /// Timeout for requests against the HTTP collaborators
    pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
}
