use anyhow::{Context, Result, anyhow};
use std::path::Path;

use symphonia::core::{
    audio::{AudioBufferRef, SampleBuffer},
    codecs::{CODEC_TYPE_NULL, DecoderOptions},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Target rate of the feature front-end.
const TARGET_SAMPLE_RATE: usize = 16_000;

/// Decode an audio file to mono f32 samples at 16 kHz.
///
/// Any symphonia-supported container/codec works (mp3, wav, flac, vorbis).
/// Multi-channel audio is downmixed by channel average; non-16 kHz sources
/// are resampled with rubato's FFT resampler.
pub fn decode_to_f32_mono_16k<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let (interleaved, sample_rate, channels) = decode_interleaved(path.as_ref())?;
    let mono = downmix_to_mono(interleaved, channels);
    resample_to_target(mono, sample_rate)
}

/// Decode the first audio track to interleaved f32, returning the source
/// sample rate and channel count alongside the samples.
fn decode_interleaved(path: &Path) -> Result<(Vec<f32>, u32, usize)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open audio file: {}", path.display()))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("unsupported format or failed to probe container")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("no supported audio tracks found"))?;

    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("failed to create decoder for selected track")?;

    // Prefer rate/channels from codec params, fall back to the first decoded
    // buffer's spec.
    let mut sample_rate: Option<u32> = track.codec_params.sample_rate;
    let mut channels: Option<usize> = None;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(_)) => break, // end of stream
            Err(SymphoniaError::ResetRequired) => {
                return Err(anyhow!("decoder reset required (chained streams)"));
            }
            Err(e) => return Err(e).context("error reading next packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded: AudioBufferRef = match decoder.decode(&packet) {
            Ok(d) => d,
            // Recoverable per-packet problems: skip the packet.
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(SymphoniaError::ResetRequired) => {
                return Err(anyhow!("decoder reset required mid-stream"));
            }
            Err(e) => return Err(e).context("unrecoverable decode error"),
        };

        sample_rate.get_or_insert(decoded.spec().rate);
        channels.get_or_insert(decoded.spec().channels.count());

        let mut sbuf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        sbuf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sbuf.samples());
    }

    if interleaved.is_empty() {
        return Err(anyhow!("decoded audio was empty"));
    }

    let sample_rate = sample_rate.ok_or_else(|| anyhow!("could not determine sample rate"))?;
    let channels = channels.ok_or_else(|| anyhow!("could not determine channel count"))?;

    Ok((interleaved, sample_rate, channels))
}

fn downmix_to_mono(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }

    let num_frames = interleaved.len() / channels;
    let mut mono = Vec::with_capacity(num_frames);
    for frame in interleaved.chunks_exact(channels) {
        mono.push(frame.iter().sum::<f32>() / channels as f32);
    }
    mono
}

fn resample_to_target(mono: Vec<f32>, source_rate: u32) -> Result<Vec<f32>> {
    if source_rate as usize == TARGET_SAMPLE_RATE {
        return Ok(mono);
    }

    // Fixed-input chunking; output length varies with the rate ratio.
    let chunk_size = 1024;
    let sub_chunks = 1;

    let mut resampler = Fft::<f32>::new(
        source_rate as usize,
        TARGET_SAMPLE_RATE,
        chunk_size,
        sub_chunks,
        1, // mono
        FixedSync::Input,
    )
    .context("failed to construct FFT resampler")?;

    let input_frames = mono.len();
    let output_frames = resampler.process_all_needed_output_len(input_frames);

    let mut out = vec![0.0f32; output_frames];

    // One channel, so the interleaved adapters are just plain slices.
    let input_adapter =
        InterleavedSlice::new(&mono, 1, input_frames).context("bad input adapter")?;
    let mut output_adapter =
        InterleavedSlice::new_mut(&mut out, 1, output_frames).context("bad output adapter")?;

    let (_frames_read, frames_written) =
        resampler.process_all_into_buffer(&input_adapter, &mut output_adapter, input_frames, None)?;

    out.truncate(frames_written);
    Ok(out)
}
