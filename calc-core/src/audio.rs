//! # Audio Capture Module
//!
//! Microphone capture for voice input using CPAL (Cross-Platform Audio
//! Library). Frames are downmixed to mono and streamed over a channel to the
//! voice worker.
//!
//! ## Features
//! - Default input device selection
//! - Sample rate chosen as close to 16 kHz as the device allows
//! - Any channel count, downmixed to mono in the callback

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

/// Number of mono samples per frame sent to the worker.
pub const FRAME_SIZE: usize = 1024;

/// Preferred capture rate. Speech recognisers work at 16 kHz.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Starts capture from the default input device.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Running stream handle and its sample rate.
///   Dropping the stream stops capture.
/// * `Err(e)` - No device, or no usable f32 input format
pub fn start_audio_capture(sender: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    tracing::info!(target: "calc::audio", "Using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("Failed to query input configurations")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let channels = config.channels().max(1) as usize;
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    tracing::debug!(
        target: "calc::audio",
        "Selected {} Hz with {} channel(s)", sample_rate, channels
    );

    let err_fn = |err| tracing::error!(target: "calc::audio", "Audio stream error: {}", err);

    let mut pending = Vec::with_capacity(FRAME_SIZE * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend(downmix(data, channels));

            while pending.len() >= FRAME_SIZE {
                let frame: Vec<f32> = pending.drain(..FRAME_SIZE).collect();
                // A full channel means the worker has stopped listening.
                let _ = sender.try_send(frame);
            }
        },
        err_fn,
        None,
    )?;

    stream.play().context("Failed to start the input stream")?;

    Ok((stream, sample_rate))
}

/// Averages interleaved samples into one mono sample per frame.
fn downmix(data: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
}

/// Picks the f32 configuration with the fewest channels whose rate range
/// lies closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let (min, max) = (c.min_sample_rate().0, c.max_sample_rate().0);
            let distance = if target_rate < min {
                min - target_rate
            } else {
                target_rate.saturating_sub(max)
            };
            (distance, c.channels())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::{SampleFormat, SampleRate, SupportedBufferSize};

    fn range(channels: u16, min: u32, max: u32, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn downmixes_interleaved_stereo() {
        let mono: Vec<f32> = downmix(&[0.2, 0.4, -1.0, 1.0], 2).collect();
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert_eq!(mono[1], 0.0);
    }

    #[test]
    fn prefers_rate_covering_target_then_fewer_channels() {
        let configs = vec![
            range(2, 8_000, 48_000, SampleFormat::F32),
            range(1, 44_100, 48_000, SampleFormat::F32),
            range(1, 8_000, 48_000, SampleFormat::F32),
            range(1, 8_000, 48_000, SampleFormat::I16),
        ];
        let chosen = find_supported_config(configs, TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.min_sample_rate().0, 8_000);
        assert_eq!(chosen.sample_format(), SampleFormat::F32);
    }

    #[test]
    fn rejects_devices_without_f32() {
        let configs = vec![range(1, 8_000, 48_000, SampleFormat::I16)];
        assert!(find_supported_config(configs, TARGET_SAMPLE_RATE).is_none());
    }
}
