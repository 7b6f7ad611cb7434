//! Noise conditioning for the live feed
//!
//! Every chunk passes through a [`NoiseReducer`] before it is sent and after
//! it is received. Two backends exist behind the [`NoiseSuppressor`] seam: a
//! neural suppressor operating on fixed 480-sample frames, and a whole-chunk
//! energy gate used when the neural backend is unavailable. The backend is
//! chosen once at construction.

use crate::constants::{NEURAL_FRAME_SAMPLES, SAMPLE_WIDTH};

/// Backend interface for noise conditioning
///
/// `process` must return a buffer of the same length as its input, never
/// fail, and cost no more than the bytes it is given.
pub trait NoiseSuppressor: Send {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8>;
}

/// Neural frame-level suppressor (RNNoise-class model)
///
/// Operates on fixed frames of 480 samples × 2 bytes. A trailing frame
/// shorter than that is copied through unmodified rather than buffered
/// across calls, so partial frames retain raw audio.
pub struct NeuralSuppressor {
    #[cfg(feature = "rnnoise")]
    state: Box<nnnoiseless::DenoiseState<'static>>,
}

impl NeuralSuppressor {
    /// Frame size in bytes
    pub const FRAME_BYTES: usize = NEURAL_FRAME_SAMPLES * SAMPLE_WIDTH;

    /// Probe for the neural backend; `None` when it is not compiled in
    #[cfg(feature = "rnnoise")]
    pub fn try_new() -> Option<Self> {
        Some(Self {
            state: nnnoiseless::DenoiseState::new(),
        })
    }

    /// Probe for the neural backend; `None` when it is not compiled in
    #[cfg(not(feature = "rnnoise"))]
    pub fn try_new() -> Option<Self> {
        None
    }

    #[cfg(feature = "rnnoise")]
    fn process_frame(&mut self, frame: &[u8], out: &mut Vec<u8>) {
        debug_assert_eq!(frame.len(), Self::FRAME_BYTES);

        // The model works on f32 samples in i16 range.
        let mut input = [0.0f32; NEURAL_FRAME_SAMPLES];
        for (sample, pair) in input.iter_mut().zip(frame.chunks_exact(SAMPLE_WIDTH)) {
            *sample = i16::from_le_bytes([pair[0], pair[1]]) as f32;
        }

        let mut cleaned = [0.0f32; NEURAL_FRAME_SAMPLES];
        self.state.process_frame(&mut cleaned, &input);

        for sample in &cleaned {
            let value = sample.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

#[cfg(feature = "rnnoise")]
impl NoiseSuppressor for NeuralSuppressor {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut cleaned = Vec::with_capacity(chunk.len());
        for frame in chunk.chunks(Self::FRAME_BYTES) {
            if frame.len() < Self::FRAME_BYTES {
                cleaned.extend_from_slice(frame);
            } else {
                self.process_frame(frame, &mut cleaned);
            }
        }
        cleaned
    }
}

#[cfg(not(feature = "rnnoise"))]
impl NoiseSuppressor for NeuralSuppressor {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        chunk.to_vec()
    }
}

/// Whole-chunk energy gate
///
/// Computes one RMS loudness value over the entire chunk; below the
/// threshold the whole chunk is replaced with silence of the same length,
/// at or above it the chunk passes byte-for-byte. A coarse mute/pass
/// binary with no smoothing or hysteresis between chunks.
pub struct EnergyGate {
    threshold: u32,
}

impl EnergyGate {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Integer RMS over i16 little-endian samples
    fn rms(chunk: &[u8]) -> u32 {
        let mut sum: u64 = 0;
        let mut count: u64 = 0;
        for pair in chunk.chunks_exact(SAMPLE_WIDTH) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]) as i64;
            sum += (sample * sample) as u64;
            count += 1;
        }
        if count == 0 {
            return 0;
        }
        (sum as f64 / count as f64).sqrt() as u32
    }
}

impl NoiseSuppressor for EnergyGate {
    fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        if Self::rms(chunk) < self.threshold {
            vec![0; chunk.len()]
        } else {
            chunk.to_vec()
        }
    }
}

/// Chunk conditioner used by both stream directions
///
/// Each session owns its own independently configured instance.
pub struct NoiseReducer {
    backend: Box<dyn NoiseSuppressor>,
    neural: bool,
}

impl NoiseReducer {
    /// Select a backend: neural when available, energy gate otherwise
    pub fn new(gate_threshold: u32) -> Self {
        match NeuralSuppressor::try_new() {
            Some(neural) => {
                tracing::debug!("Noise conditioning: neural suppressor");
                Self {
                    backend: Box::new(neural),
                    neural: true,
                }
            }
            None => {
                tracing::debug!(
                    "Noise conditioning: energy gate (threshold {})",
                    gate_threshold
                );
                Self {
                    backend: Box::new(EnergyGate::new(gate_threshold)),
                    neural: false,
                }
            }
        }
    }

    /// Whether the neural backend was selected
    pub fn is_neural(&self) -> bool {
        self.neural
    }

    /// Condition one chunk; output has the same length as the input
    pub fn condition(&mut self, chunk: &[u8]) -> Vec<u8> {
        if chunk.is_empty() {
            return Vec::new();
        }
        self.backend.process(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// i16 LE chunk with every sample at the given amplitude
    fn constant_chunk(amplitude: i16, samples: usize) -> Vec<u8> {
        amplitude
            .to_le_bytes()
            .iter()
            .copied()
            .cycle()
            .take(samples * SAMPLE_WIDTH)
            .collect()
    }

    #[test]
    fn gate_threshold_is_exclusive_lower_bound() {
        let mut gate = EnergyGate::new(350);

        // One unit below: muted to silence of equal length
        let below = constant_chunk(349, 64);
        let out = gate.process(&below);
        assert_eq!(out.len(), below.len());
        assert!(out.iter().all(|&b| b == 0));

        // Exactly at threshold: passes unchanged
        let at = constant_chunk(350, 64);
        assert_eq!(gate.process(&at), at);

        // One unit above: passes byte-for-byte
        let above = constant_chunk(351, 64);
        assert_eq!(gate.process(&above), above);
    }

    #[test]
    fn gate_mutes_whole_chunk_not_per_sample() {
        let mut gate = EnergyGate::new(350);

        // Mostly quiet with a few loud samples; RMS decides for the chunk
        let mut chunk = constant_chunk(10, 100);
        chunk.extend_from_slice(&constant_chunk(i16::MAX, 4));
        let rms = EnergyGate::rms(&chunk);
        let out = gate.process(&chunk);
        if rms < 350 {
            assert!(out.iter().all(|&b| b == 0));
        } else {
            assert_eq!(out, chunk);
        }
    }

    #[test]
    fn empty_input_is_empty_output() {
        let mut reducer = NoiseReducer::new(350);
        assert!(reducer.condition(&[]).is_empty());

        let mut gate = EnergyGate::new(350);
        assert!(gate.process(&[]).is_empty());
    }

    #[test]
    fn reducer_without_neural_backend_uses_gate() {
        if NeuralSuppressor::try_new().is_none() {
            let mut reducer = NoiseReducer::new(350);
            assert!(!reducer.is_neural());
            let quiet = constant_chunk(5, 64);
            assert!(reducer.condition(&quiet).iter().all(|&b| b == 0));
        }
    }

    #[cfg(feature = "rnnoise")]
    #[test]
    fn neural_partial_frame_passes_through() {
        let mut neural = NeuralSuppressor::try_new().unwrap();

        // One full frame plus a 100-byte tail
        let full = NeuralSuppressor::FRAME_BYTES;
        let chunk: Vec<u8> = (0..full + 100).map(|i| (i % 251) as u8).collect();
        let out = neural.process(&chunk);

        assert_eq!(out.len(), chunk.len());
        // Trailing partial frame is byte-identical to the input
        assert_eq!(&out[full..], &chunk[full..]);
    }

    proptest! {
        #[test]
        fn conditioned_length_always_matches_input(bytes in proptest::collection::vec(any::<u8>(), 0..4096)) {
            // Even-length PCM buffers only
            let bytes = if bytes.len() % 2 == 1 { bytes[..bytes.len() - 1].to_vec() } else { bytes };
            let mut reducer = NoiseReducer::new(350);
            prop_assert_eq!(reducer.condition(&bytes).len(), bytes.len());
        }

        #[test]
        fn gate_output_is_silence_or_identity(amplitude in 0i16..2000, samples in 1usize..256) {
            let chunk = constant_chunk(amplitude, samples);
            let mut gate = EnergyGate::new(350);
            let out = gate.process(&chunk);
            let silence = out.iter().all(|&b| b == 0);
            prop_assert!(silence || out == chunk);
        }
    }
}
