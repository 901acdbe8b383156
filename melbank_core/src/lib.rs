//! Mel-filterbank ("fbank") feature extraction for 16 kHz speech.
//!
//! The DSP itself (windowing, FFT, mel projection) comes from the `mel_spec`
//! crate; this crate wires a fixed speech configuration around it and adds
//! the audio-file ingest path. The C-linkage surface lives in `melbank_ffi`.

pub mod audio;

pub use audio::decoder::decode_to_f32_mono_16k;
pub use audio::fbank::{
    FbankConfig, FbankFeatures, compute_fbank, compute_fbank_with, mean_normalized, pcm_i16_to_f32,
};
