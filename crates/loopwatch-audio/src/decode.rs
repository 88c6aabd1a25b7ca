//! Whole-file audio decoding using symphonia.

use std::fs::File;
use std::path::Path;

use loopwatch_core::{Error, Result};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::{debug, warn};

use crate::buffer::AudioBuffer;

/// Capability to turn a file into a fully decoded [`AudioBuffer`].
///
/// Implementations return `Err` for anything unplayable, including a file
/// that decodes to zero frames.
pub trait Decode {
    fn decode(&self, path: &Path) -> Result<AudioBuffer>;
}

impl<F> Decode for F
where
    F: Fn(&Path) -> Result<AudioBuffer>,
{
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        self(path)
    }
}

/// Decoder backed by symphonia's default codec and format registries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub const fn new() -> Self {
        Self
    }
}

impl Decode for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        let file = File::open(path)
            .map_err(|e| Error::AudioDecode(format!("Failed to open {}: {e}", path.display())))?;
        let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::AudioDecode(format!("Failed to probe format: {e}")))?;

        let mut format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::AudioDecode("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut channels = track.codec_params.channels.map_or(0, |c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::AudioDecode(format!("Failed to create decoder: {e}")))?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break; // End of stream
                }
                Err(SymphoniaError::ResetRequired) => {
                    // Track list changed mid-stream; keep what we have
                    break;
                }
                Err(e) => {
                    return Err(Error::AudioDecode(format!("Failed to read packet: {e}")));
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    channels = spec.channels.count();
                    sample_rate = spec.rate;

                    let mut interleaved = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    interleaved.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(interleaved.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Log and skip corrupt frames
                    warn!("Decode error (skipping): {e}");
                }
                Err(e) => {
                    return Err(Error::AudioDecode(format!("Decode failed: {e}")));
                }
            }
        }

        let channel_count = u16::try_from(channels)
            .map_err(|_| Error::AudioDecode(format!("Too many channels: {channels}")))?;
        let buffer = AudioBuffer::from_interleaved(channel_count, sample_rate, samples);
        if buffer.is_empty() {
            return Err(Error::AudioDecode(format!(
                "No audio frames in {}",
                path.display()
            )));
        }

        debug!(
            "Decoded {}: {} frames, {} Hz, {} channels",
            path.display(),
            buffer.frame_count(),
            buffer.sample_rate(),
            buffer.channel_count()
        );

        Ok(buffer)
    }
}

/// Write a 32-bit IEEE float WAV file.
#[cfg(test)]
pub(crate) fn write_f32_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[f32]) {
    let data_len = (samples.len() * 4) as u32;
    let block_align = channels * 4;

    let mut bytes = Vec::with_capacity(44 + samples.len() * 4);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&3u16.to_le_bytes()); // WAVE_FORMAT_IEEE_FLOAT
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&32u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }

    #[allow(clippy::unwrap_used)]
    std::fs::write(path, bytes).unwrap();
}
