//! # Speech Module
//!
//! Speech detection on captured audio and the speech-to-text service client.
//!
//! Detection is a cheap gate run before any network call: a frame counts as
//! voiced when it is loud enough and most of its spectral energy falls in
//! the telephone speech band (300-3400 Hz). Recognition itself is delegated
//! to an external service behind the [`Transcriber`] trait.

use std::io::Cursor;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, multipart};
use rustfft::{FftPlanner, num_complex::Complex};
use serde::Deserialize;

use crate::voice::VoiceError;

/// Minimum RMS level for a frame to be considered voiced.
pub const SPEECH_RMS_THRESHOLD: f32 = 0.01;
/// Minimum share of spectral energy inside the speech band.
pub const SPEECH_BAND_RATIO: f32 = 0.5;
/// Speech band limits in Hz.
pub const SPEECH_BAND: (f32, f32) = (300.0, 3400.0);
/// Voiced frames required before a capture is worth transcribing.
pub const MIN_VOICED_FRAMES: usize = 3;

/// Analysis window for [`contains_speech`].
const ANALYSIS_WINDOW: usize = 1024;

/// Removes the mean so a DC offset does not count as energy.
fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    for sample in signal.iter_mut() {
        *sample -= avg;
    }
}

/// Hann window to reduce spectral leakage across the band edges.
fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

/// Share of the frame's spectral power that lies inside [`SPEECH_BAND`].
pub fn speech_band_ratio(frame: &[f32], sample_rate: u32) -> f32 {
    let n = frame.len();
    if n < 2 || sample_rate == 0 {
        return 0.0;
    }

    let mut signal = frame.to_vec();
    remove_dc_offset(&mut signal);
    apply_hann_window(&mut signal);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex<f32>> = signal
        .into_iter()
        .map(|sample| Complex { re: sample, im: 0.0 })
        .collect();
    fft.process(&mut buffer);

    let bin_width = sample_rate as f32 / n as f32;
    let (band_power, total_power) = buffer
        .iter()
        .take(n / 2)
        .enumerate()
        .skip(1)
        .fold((0.0f32, 0.0f32), |(band, total), (i, c)| {
            let power = c.norm_sqr();
            let freq = i as f32 * bin_width;
            let in_band = freq >= SPEECH_BAND.0 && freq <= SPEECH_BAND.1;
            (if in_band { band + power } else { band }, total + power)
        });

    if total_power <= f32::EPSILON {
        0.0
    } else {
        band_power / total_power
    }
}

/// True when a single frame looks like speech.
pub fn frame_is_voiced(frame: &[f32], sample_rate: u32) -> bool {
    rms(frame) >= SPEECH_RMS_THRESHOLD && speech_band_ratio(frame, sample_rate) >= SPEECH_BAND_RATIO
}

/// True when a recording has at least [`MIN_VOICED_FRAMES`] voiced windows.
pub fn contains_speech(samples: &[f32], sample_rate: u32) -> bool {
    samples
        .chunks_exact(ANALYSIS_WINDOW)
        .filter(|frame| frame_is_voiced(frame, sample_rate))
        .take(MIN_VOICED_FRAMES)
        .count()
        >= MIN_VOICED_FRAMES
}

/// Turns captured audio into text.
pub trait Transcriber: Send {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, VoiceError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Client for a whisper.cpp-style HTTP server: the recording is posted as a
/// multipart WAV file and the reply is JSON with a `text` field.
#[derive(Debug, Clone)]
pub struct HttpTranscriber {
    client: Client,
    endpoint: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, wav: Vec<u8>) -> Result<TranscriptionResponse> {
        let file = multipart::Part::bytes(wav)
            .file_name("speech.wav")
            .mime_str("audio/wav")?;
        let form = multipart::Form::new()
            .part("file", file)
            .text("response_format", "json");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .with_context(|| format!("Request to {} failed", self.endpoint))?
            .error_for_status()?;

        response
            .json::<TranscriptionResponse>()
            .context("Malformed transcription response")
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<String, VoiceError> {
        let wav = encode_wav(samples, sample_rate).map_err(|e| VoiceError::ServiceUnavailable {
            detail: format!("{e:#}"),
        })?;
        tracing::debug!(
            target: "calc::speech",
            "Posting {} bytes of audio to {}", wav.len(), self.endpoint
        );

        let response = self
            .request(wav)
            .map_err(|e| VoiceError::ServiceUnavailable {
                detail: format!("{e:#}"),
            })?;
        clean_transcript(&response.text)
    }
}

/// Encodes mono f32 samples as a 16-bit PCM WAV file in memory.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).context("Failed to start WAV")?;
        for &sample in samples {
            let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(scaled)?;
        }
        writer.finalize().context("Failed to finish WAV")?;
    }
    Ok(cursor.into_inner())
}

/// Trims the service reply. Empty text and bracketed markers such as
/// `[BLANK_AUDIO]` mean nothing was understood.
pub fn clean_transcript(raw: &str) -> Result<String, VoiceError> {
    let text = raw.trim();
    let is_marker = text.starts_with('[') && text.ends_with(']');
    if text.is_empty() || is_marker {
        Err(VoiceError::Unintelligible)
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn tone(freq: f32, amplitude: f32, seconds: f32) -> Vec<f32> {
        let count = (RATE as f32 * seconds) as usize;
        (0..count)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin())
            .collect()
    }

    #[test]
    fn silence_is_not_speech() {
        let silence = vec![0.0; RATE as usize];
        assert!(!frame_is_voiced(&silence[..1024], RATE));
        assert!(!contains_speech(&silence, RATE));
    }

    #[test]
    fn speech_band_tone_is_voiced() {
        let signal = tone(440.0, 0.5, 1.0);
        assert!(speech_band_ratio(&signal[..1024], RATE) > 0.9);
        assert!(contains_speech(&signal, RATE));
    }

    #[test]
    fn quiet_or_out_of_band_tones_are_not_voiced() {
        let quiet = tone(440.0, 0.001, 1.0);
        assert!(!contains_speech(&quiet, RATE));

        let rumble = tone(60.0, 0.5, 1.0);
        assert!(speech_band_ratio(&rumble[..1024], RATE) < SPEECH_BAND_RATIO);
        assert!(!contains_speech(&rumble, RATE));
    }

    #[test]
    fn short_recordings_are_not_speech() {
        let blip = tone(440.0, 0.5, 0.1);
        assert!(!contains_speech(&blip, RATE));
    }

    #[test]
    fn encodes_readable_wav() {
        let samples = tone(440.0, 0.5, 0.25);
        let bytes = encode_wav(&samples, RATE).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len() as usize, samples.len());
    }

    #[test]
    fn cleans_service_replies() {
        assert_eq!(clean_transcript("  2 + 2\n"), Ok("2 + 2".to_string()));
        assert_eq!(clean_transcript(""), Err(VoiceError::Unintelligible));
        assert_eq!(clean_transcript(" [BLANK_AUDIO] "), Err(VoiceError::Unintelligible));
    }

    #[test]
    fn unreachable_service_is_reported() {
        // Port 9 (discard) is closed on test hosts; the request fails fast.
        let transcriber =
            HttpTranscriber::new("http://127.0.0.1:9/inference", Duration::from_secs(2)).unwrap();
        let result = transcriber.transcribe(&tone(440.0, 0.5, 0.1), RATE);
        assert!(matches!(result, Err(VoiceError::ServiceUnavailable { .. })));
    }
}
