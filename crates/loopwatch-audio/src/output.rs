//! Audio output using cpal.

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig, SupportedStreamConfigRange,
};
use loopwatch_core::{Error, OutputSettings, Result};
use tracing::{debug, error, info, warn};

use crate::engine::PlaybackEngine;

/// Frames rendered per pass when the device does not take f32 samples.
const SCRATCH_FRAMES: usize = 1024;

/// Sample types the output stream can be built for.
///
/// f32 devices get the engine's output directly. Other formats are rendered
/// into a scratch buffer sized once at stream build and converted from there.
trait OutputSample: SizedSample + FromSample<f32> {
    const NEEDS_SCRATCH: bool = true;

    fn render_into(
        engine: &mut PlaybackEngine,
        data: &mut [Self],
        scratch: &mut [f32],
        channels: usize,
    ) {
        render_converted(engine, data, scratch, channels);
    }
}

impl OutputSample for f32 {
    const NEEDS_SCRATCH: bool = false;

    fn render_into(
        engine: &mut PlaybackEngine,
        data: &mut [Self],
        _scratch: &mut [f32],
        channels: usize,
    ) {
        engine.render(data, channels);
    }
}

impl OutputSample for i16 {}
impl OutputSample for u16 {}

/// Render into `data` through `scratch`, one whole-frame chunk at a time.
///
/// `scratch` is never resized. The chunk length is the largest multiple of
/// `channels` that fits in it, so frames never straddle two passes.
fn render_converted<T: Sample + FromSample<f32>>(
    engine: &mut PlaybackEngine,
    data: &mut [T],
    scratch: &mut [f32],
    channels: usize,
) {
    let chunk_len = match channels {
        0 => scratch.len(),
        channels => scratch.len() - scratch.len() % channels,
    };
    if chunk_len == 0 {
        data.fill(T::EQUILIBRIUM);
        return;
    }

    for chunk in data.chunks_mut(chunk_len) {
        let rendered = &mut scratch[..chunk.len()];
        engine.render(rendered, channels);

        for (sample, &value) in chunk.iter_mut().zip(rendered.iter()) {
            *sample = T::from_sample(value);
        }
    }
}

/// Audio output stream wrapper.
///
/// Owns the stream, and through its callback the [`PlaybackEngine`]. Dropping
/// it stops playback and releases the active buffer.
pub struct AudioOutput {
    _stream: Stream,
    settings: OutputSettings,
    device_name: String,
}

impl AudioOutput {
    /// Open the default output device and start rendering `engine` into it.
    pub fn new(engine: PlaybackEngine, requested: OutputSettings) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No output device found".to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio output device: {device_name}");

        Self::with_device(device, engine, requested)
    }

    /// Open a specific device and start rendering `engine` into it.
    pub fn with_device(
        device: Device,
        engine: PlaybackEngine,
        requested: OutputSettings,
    ) -> Result<Self> {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported_config = select_config(&device, requested)?;
        debug!("Selected output config: {:?}", supported_config);

        let sample_format = supported_config.sample_format();
        let config: StreamConfig = supported_config.into();

        let settings = OutputSettings {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        };

        debug!(
            "Output config: {}Hz, {} channels, {:?}",
            settings.sample_rate, settings.channels, sample_format
        );

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, engine)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, engine)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, engine)?,
            _ => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {sample_format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {e}")))?;

        Ok(Self {
            _stream: stream,
            settings,
            device_name,
        })
    }

    fn build_stream<T: OutputSample>(
        device: &Device,
        config: &StreamConfig,
        mut engine: PlaybackEngine,
    ) -> Result<Stream> {
        let channels = usize::from(config.channels);
        let mut scratch = if T::NEEDS_SCRATCH {
            vec![0.0f32; SCRATCH_FRAMES * channels.max(1)]
        } else {
            Vec::new()
        };

        let err_fn = |err| {
            error!("Audio stream error: {err}");
        };

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    T::render_into(&mut engine, data, &mut scratch, channels);
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {e}")))?;

        Ok(stream)
    }

    /// Get the device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Get the sample rate.
    pub const fn sample_rate(&self) -> u32 {
        self.settings.sample_rate
    }

    /// Get the number of channels.
    pub const fn channels(&self) -> u16 {
        self.settings.channels
    }
}

/// Pick a device config matching `requested`, preferring f32 samples.
///
/// Falls back to the device default when nothing matches; no resampling is
/// done, so audio at another rate plays pitched.
fn select_config(device: &Device, requested: OutputSettings) -> Result<SupportedStreamConfig> {
    let ranges = device
        .supported_output_configs()
        .map_err(|e| Error::AudioOutput(format!("Failed to query output configs: {e}")))?;

    if let Some(config) = matching_config(ranges, requested) {
        return Ok(config);
    }

    let fallback = device
        .default_output_config()
        .map_err(|e| Error::AudioOutput(format!("Failed to get output config: {e}")))?;
    warn!(
        "Device does not support {} Hz / {} channels, using {} Hz / {} channels",
        requested.sample_rate,
        requested.channels,
        fallback.sample_rate().0,
        fallback.channels()
    );
    Ok(fallback)
}

/// The supported range that covers `requested` exactly, f32 first.
fn matching_config(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    requested: OutputSettings,
) -> Option<SupportedStreamConfig> {
    let wanted_rate = SampleRate(requested.sample_rate);

    ranges
        .into_iter()
        .filter(|range| range.channels() == requested.channels)
        .filter(|range| range.min_sample_rate() <= wanted_rate && wanted_rate <= range.max_sample_rate())
        .max_by_key(|range| range.sample_format() == SampleFormat::F32)
        .map(|range| range.with_sample_rate(wanted_rate))
}

/// List available output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
        .filter_map(|d| d.name().ok())
        .collect();

    Ok(devices)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::buffer::{shared_pending_slot, AudioBuffer};
    use cpal::SupportedBufferSize;

    const REQUESTED: OutputSettings = OutputSettings {
        sample_rate: 44_100,
        channels: 2,
    };

    fn range(channels: u16, min: u32, max: u32, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    fn loaded_engine() -> PlaybackEngine {
        let slot = shared_pending_slot();
        slot.publish(AudioBuffer::from_interleaved(
            1,
            48_000,
            vec![0.5, -0.5, 0.25, 1.0, -1.0],
        ))
        .unwrap();
        PlaybackEngine::new(slot)
    }

    fn reference(samples: usize, channels: usize) -> Vec<f32> {
        let mut output = vec![f32::NAN; samples];
        loaded_engine().render(&mut output, channels);
        output
    }

    #[test]
    fn test_matching_prefers_f32() {
        let ranges = [
            range(2, 8_000, 96_000, SampleFormat::I16),
            range(2, 44_100, 48_000, SampleFormat::F32),
            range(2, 8_000, 192_000, SampleFormat::U16),
        ];

        let config = matching_config(ranges, REQUESTED).unwrap();
        assert_eq!(config.sample_format(), SampleFormat::F32);
        assert_eq!(config.sample_rate(), SampleRate(44_100));
        assert_eq!(config.channels(), 2);
    }

    #[test]
    fn test_matching_takes_other_format_when_alone() {
        let ranges = [
            range(1, 44_100, 44_100, SampleFormat::F32),
            range(2, 8_000, 96_000, SampleFormat::I16),
        ];

        let config = matching_config(ranges, REQUESTED).unwrap();
        assert_eq!(config.sample_format(), SampleFormat::I16);
        assert_eq!(config.sample_rate(), SampleRate(44_100));
    }

    #[test]
    fn test_matching_rejects_channels_and_rate() {
        let wrong_channels = [range(6, 8_000, 96_000, SampleFormat::F32)];
        assert!(matching_config(wrong_channels, REQUESTED).is_none());

        let wrong_rate = [range(2, 48_000, 96_000, SampleFormat::F32)];
        assert!(matching_config(wrong_rate, REQUESTED).is_none());

        assert!(matching_config(Vec::new(), REQUESTED).is_none());
    }

    #[test]
    fn test_f32_renders_in_place() {
        let mut engine = loaded_engine();
        let mut data = [f32::NAN; 8];
        f32::render_into(&mut engine, &mut data, &mut [], 2);

        assert_eq!(data.to_vec(), reference(8, 2));
    }

    #[test]
    fn test_converted_render_matches_f32() {
        // 12 frames through 3-frame passes, so the loop wraps mid-chunk
        let expected: Vec<i16> = reference(24, 2).into_iter().map(f32::to_sample).collect();

        let mut engine = loaded_engine();
        let mut data = [0i16; 24];
        let mut scratch = vec![0.0f32; 6];
        render_converted(&mut engine, &mut data, &mut scratch, 2);

        assert_eq!(data.to_vec(), expected);
        assert_eq!(scratch.len(), 6);
        assert_eq!(engine.frame_cursor(), 12);
    }

    #[test]
    fn test_converted_chunks_hold_whole_frames() {
        // Scratch of 5 samples holds two stereo frames; the odd one stays unused
        let expected: Vec<u16> = reference(11, 2).into_iter().map(f32::to_sample).collect();

        let mut engine = loaded_engine();
        let mut data = [0u16; 11];
        let mut scratch = vec![0.0f32; 5];
        render_converted(&mut engine, &mut data, &mut scratch, 2);

        assert_eq!(data.to_vec(), expected);
        assert_eq!(data[10], u16::EQUILIBRIUM);
        assert_eq!(engine.frame_cursor(), 5);
    }

    #[test]
    fn test_converted_without_room_is_silent() {
        let mut engine = loaded_engine();
        let mut data = [7i16; 6];
        render_converted(&mut engine, &mut data, &mut [0.0; 1], 2);

        assert_eq!(data, [i16::EQUILIBRIUM; 6]);
        assert_eq!(engine.frame_cursor(), 0);
    }
}
