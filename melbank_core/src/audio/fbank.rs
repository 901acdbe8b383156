use anyhow::{Context, Result};
use mel_spec::prelude::*;
use ndarray::Array2;

/// Fixed front-end parameters for fbank extraction.
///
/// `Default` is the speech configuration used everywhere in this workspace:
/// 16 kHz input, 25 ms windows (400 samples, also the FFT size), 10 ms shift
/// (160 samples), 80 mel bins. Frames are only emitted for windows that lie
/// fully inside the waveform; the tail remainder is never zero-padded.
#[derive(Debug, Clone)]
pub struct FbankConfig {
    /// Input sample rate in Hz.
    pub sample_rate: u32,
    /// Window length in samples; doubles as the FFT size.
    pub frame_length: usize,
    /// Hop between successive windows, in samples.
    pub frame_shift: usize,
    /// Number of mel bins per output frame.
    pub num_bins: usize,
}

impl Default for FbankConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_length: 400, // 25 ms
            frame_shift: 160,  // 10 ms
            num_bins: 80,
        }
    }
}

/// Per-frame mel-filterbank energies as one flat buffer.
///
/// Layout is row-major: frame `i` occupies
/// `frames[i * num_bins .. (i + 1) * num_bins]`.
/// Invariant: `frames.len() == num_frames * num_bins`.
#[derive(Debug, Clone, PartialEq)]
pub struct FbankFeatures {
    pub frames: Vec<f32>,
    pub num_frames: usize,
    pub num_bins: usize,
}

impl FbankFeatures {
    /// View the flat buffer as a `(num_frames, num_bins)` matrix.
    pub fn to_array(&self) -> Result<Array2<f32>> {
        let array = Array2::from_shape_vec((self.num_frames, self.num_bins), self.frames.clone())
            .context("fbank buffer does not match its stated dimensions")?;
        Ok(array)
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }
}

/// Compute fbank features with the default 16 kHz / 80-bin configuration.
///
/// Input must be mono f32 samples normalized to roughly ±1.0 (see
/// [`pcm_i16_to_f32`] for 16-bit PCM). An empty or too-short waveform yields
/// `num_frames == 0`; that is a legitimate result, not an error.
pub fn compute_fbank(samples: &[f32]) -> FbankFeatures {
    compute_fbank_with(&FbankConfig::default(), samples)
}

/// Compute fbank features with an explicit configuration.
///
/// A fresh STFT and mel projector are built per call, so concurrent calls
/// from independent threads share no state. Deterministic: identical input
/// produces identical output.
pub fn compute_fbank_with(config: &FbankConfig, samples: &[f32]) -> FbankFeatures {
    let mut stft = Spectrogram::new(config.frame_length, config.frame_shift);
    let mut mel = MelSpectrogram::new(
        config.frame_length,
        f64::from(config.sample_rate),
        config.num_bins,
    );

    let mut frames: Vec<f32> = Vec::new();
    let mut num_frames = 0usize;

    // One hop per add() call; each completed window yields one frame. The
    // final chunk may be shorter than a hop and is fed as-is, so windows
    // extending past the end of the waveform are dropped rather than padded.
    for chunk in samples.chunks(config.frame_shift) {
        if let Some(fft_frame) = stft.add(chunk) {
            let mel_frame = mel.add(&fft_frame);
            frames.extend(mel_frame.iter().map(|&v| v as f32));
            num_frames += 1;
        }
    }

    FbankFeatures {
        frames,
        num_frames,
        num_bins: config.num_bins,
    }
}

/// Subtract the per-bin mean across all frames.
///
/// The embedding front-end expects mean-normalized features; fails if there
/// are no frames to take a mean over.
pub fn mean_normalized(features: &FbankFeatures) -> Result<Array2<f32>> {
    let array = features.to_array()?;
    let mean = array
        .mean_axis(ndarray::Axis(0))
        .context("cannot mean-normalize an empty feature matrix")?;
    Ok(array - mean)
}

/// Convert 16-bit PCM to the normalized f32 convention the extractor expects.
pub fn pcm_i16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| f32::from(s) / 32768.0).collect()
}
