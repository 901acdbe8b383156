use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use melbank_core::{compute_fbank, decode_to_f32_mono_16k};

#[derive(Debug, Serialize)]
struct ManifestLine {
    audio_path: String,
    num_frames: usize,
    num_bins: usize,
    duration_ms: u64,
}

fn main() -> Result<()> {
    let mut manifest_path: Option<PathBuf> = None;
    let mut inputs: Vec<PathBuf> = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--manifest" => {
                let path = args.next().context("--manifest requires a path")?;
                manifest_path = Some(PathBuf::from(path));
            }
            _ => inputs.push(PathBuf::from(arg)),
        }
    }

    if inputs.is_empty() {
        bail!("usage: melbank_cli [--manifest out.jsonl] <audio-file>...");
    }

    let mut writer = match &manifest_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = File::create(path)
                .with_context(|| format!("failed to create manifest: {}", path.display()))?;
            Some(BufWriter::new(file))
        }
        None => None,
    };

    for path in &inputs {
        let pcm = decode_to_f32_mono_16k(path)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        let duration_ms = pcm.len() as u64 * 1000 / 16_000;

        let features = compute_fbank(&pcm);

        let min = features.frames.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = features
            .frames
            .iter()
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max);
        let nan_count = features.frames.iter().filter(|x| x.is_nan()).count();

        println!(
            "{}: frames={} bins={} duration_ms={} min={min} max={max} nan_count={nan_count}",
            path.display(),
            features.num_frames,
            features.num_bins,
            duration_ms,
        );

        if let Some(writer) = writer.as_mut() {
            let line = ManifestLine {
                audio_path: path.to_string_lossy().to_string(),
                num_frames: features.num_frames,
                num_bins: features.num_bins,
                duration_ms,
            };
            serde_json::to_writer(&mut *writer, &line)?;
            writer.write_all(b"\n")?;
        }
    }

    if let Some(mut writer) = writer {
        writer.flush()?;
        if let Some(path) = &manifest_path {
            println!("Wrote: {}", path.display());
        }
    }

    Ok(())
}
