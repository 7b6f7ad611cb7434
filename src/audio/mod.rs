//! Audio subsystem module

pub mod buffer;
pub mod capture;
pub mod device;
pub mod noise;
pub mod playback;

pub use buffer::{create_shared_queue, AudioChunk, ChunkQueue};
pub use capture::CaptureStream;
pub use device::{default_input_device, default_output_device};
pub use noise::NoiseReducer;
pub use playback::PlaybackStream;
