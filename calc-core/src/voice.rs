//! # Voice Capture Module
//!
//! Runs one voice capture on a dedicated thread so the interface never
//! blocks on the microphone or the network.
//!
//! ## Lifecycle
//! 1. [`VoiceWorker::spawn`] starts the thread and opens the input stream
//! 2. Frames are recorded until trailing silence follows speech, or the
//!    maximum capture time elapses
//! 3. The recording is checked for speech, then handed to a [`Transcriber`]
//! 4. Progress and the outcome arrive as [`VoiceEvent`]s on the caller's
//!    channel
//!
//! [`VoiceWorker::cancel`] stops a capture that is still recording.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::audio;
use crate::speech::{self, Transcriber};

/// Reasons a voice capture produced no text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("Could not understand the audio.")]
    Unintelligible,
    #[error("Could not request results; check your network connection.")]
    ServiceUnavailable { detail: String },
    #[error("No microphone is available: {0}")]
    Device(String),
}

/// Messages sent from the worker thread to the interface.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    /// The microphone is open.
    Listening,
    /// Recording finished; waiting on the speech service.
    Transcribing,
    Transcribed(String),
    Failed(VoiceError),
    /// Stopped by [`VoiceWorker::cancel`] before transcription.
    Cancelled,
}

impl VoiceEvent {
    /// True for the last event a worker sends.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            VoiceEvent::Transcribed(_) | VoiceEvent::Failed(_) | VoiceEvent::Cancelled
        )
    }
}

/// Limits applied to a single capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    /// Hard limit on recording time.
    pub max_capture: Duration,
    /// Silence after speech that ends the recording.
    pub trailing_silence: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_capture: Duration::from_secs(8),
            trailing_silence: Duration::from_millis(1200),
        }
    }
}

/// Handle to a running capture thread.
#[derive(Debug)]
pub struct VoiceWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl VoiceWorker {
    /// Starts a capture.
    ///
    /// The transcriber is built on the worker thread so that blocking
    /// clients never touch the caller's async runtime.
    pub fn spawn<T, F>(make_transcriber: F, settings: CaptureSettings, events: Sender<VoiceEvent>) -> Self
    where
        T: Transcriber + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let thread_handle = thread::spawn(move || {
            tracing::debug!(target: "calc::voice", "Voice thread started");
            let outcome = run_capture(make_transcriber, settings, &shutdown_rx, &events);
            let final_event = match outcome {
                Ok(Some(text)) => VoiceEvent::Transcribed(text),
                Ok(None) => VoiceEvent::Cancelled,
                Err(e) => VoiceEvent::Failed(e),
            };
            tracing::info!(target: "calc::voice", "Voice capture finished: {:?}", final_event);
            // The receiver is gone if the window already closed.
            let _ = events.send(final_event);
        });

        Self {
            shutdown_tx,
            thread_handle: Some(thread_handle),
        }
    }

    /// Asks the worker to stop. A capture still recording ends with
    /// [`VoiceEvent::Cancelled`]; a pending service request runs out on its
    /// own timeout. The thread is not joined.
    pub fn cancel(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            tracing::debug!(target: "calc::voice", "Detaching voice thread {:?}", handle.thread().id());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread_handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

fn run_capture<T, F>(
    make_transcriber: F,
    settings: CaptureSettings,
    shutdown_rx: &Receiver<()>,
    events: &Sender<VoiceEvent>,
) -> Result<Option<String>, VoiceError>
where
    T: Transcriber,
    F: FnOnce() -> Result<T>,
{
    let transcriber = make_transcriber().map_err(|e| VoiceError::ServiceUnavailable {
        detail: format!("{e:#}"),
    })?;

    let Some((recording, sample_rate)) = record_utterance(settings, shutdown_rx, events)? else {
        return Ok(None);
    };

    if !speech::contains_speech(&recording, sample_rate) {
        return Err(VoiceError::Unintelligible);
    }

    let _ = events.send(VoiceEvent::Transcribing);
    transcriber.transcribe(&recording, sample_rate).map(Some)
}

/// Records from the default input until the utterance ends.
/// Returns `None` when cancelled.
fn record_utterance(
    settings: CaptureSettings,
    shutdown_rx: &Receiver<()>,
    events: &Sender<VoiceEvent>,
) -> Result<Option<(Vec<f32>, u32)>, VoiceError> {
    let (raw_audio_tx, raw_audio_rx) = crossbeam_channel::bounded::<Vec<f32>>(64);
    let (stream, sample_rate) = audio::start_audio_capture(raw_audio_tx)
        .map_err(|e| VoiceError::Device(format!("{e:#}")))?;
    let _ = events.send(VoiceEvent::Listening);

    let mut tracker = UtteranceTracker::new(settings.trailing_silence, sample_rate);
    let deadline = crossbeam_channel::after(settings.max_capture);
    let mut cancelled = false;

    loop {
        crossbeam_channel::select! {
            recv(raw_audio_rx) -> msg => match msg {
                Ok(frame) => {
                    if tracker.push(frame) {
                        tracing::debug!(target: "calc::voice", "Trailing silence reached");
                        break;
                    }
                }
                Err(_) => {
                    tracing::warn!(target: "calc::voice", "Audio channel closed");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                tracing::debug!(target: "calc::voice", "Received shutdown signal");
                cancelled = true;
                break;
            },
            recv(deadline) -> _ => {
                tracing::debug!(target: "calc::voice", "Maximum capture time reached");
                break;
            },
        }
    }

    if let Err(e) = stream.pause() {
        tracing::warn!(target: "calc::voice", "Error pausing stream: {}", e);
    }
    drop(stream);

    if cancelled {
        return Ok(None);
    }
    Ok(Some((tracker.into_recording(), sample_rate)))
}

/// Accumulates frames and decides when an utterance has ended.
#[derive(Debug)]
struct UtteranceTracker {
    recording: Vec<f32>,
    sample_rate: u32,
    heard_speech: bool,
    silent_samples: usize,
    silence_limit: usize,
}

impl UtteranceTracker {
    fn new(trailing_silence: Duration, sample_rate: u32) -> Self {
        Self {
            recording: Vec::new(),
            sample_rate,
            heard_speech: false,
            silent_samples: 0,
            silence_limit: (trailing_silence.as_secs_f32() * sample_rate as f32) as usize,
        }
    }

    /// Adds a frame. Returns true once speech has been followed by enough
    /// silence.
    fn push(&mut self, frame: Vec<f32>) -> bool {
        if speech::frame_is_voiced(&frame, self.sample_rate) {
            self.heard_speech = true;
            self.silent_samples = 0;
        } else if self.heard_speech {
            self.silent_samples += frame.len();
        }
        self.recording.extend(frame);
        self.heard_speech && self.silent_samples >= self.silence_limit
    }

    fn into_recording(self) -> Vec<f32> {
        self.recording
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn voiced_frame() -> Vec<f32> {
        (0..audio::FRAME_SIZE)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / RATE as f32).sin())
            .collect()
    }

    fn silent_frame() -> Vec<f32> {
        vec![0.0; audio::FRAME_SIZE]
    }

    #[test]
    fn silence_before_speech_does_not_end_capture() {
        let mut tracker = UtteranceTracker::new(Duration::from_millis(100), RATE);
        for _ in 0..10 {
            assert!(!tracker.push(silent_frame()));
        }
    }

    #[test]
    fn trailing_silence_ends_capture() {
        // 100 ms at 16 kHz is 1600 samples: two silent frames.
        let mut tracker = UtteranceTracker::new(Duration::from_millis(100), RATE);
        assert!(!tracker.push(voiced_frame()));
        assert!(!tracker.push(silent_frame()));
        assert!(!tracker.push(voiced_frame()));
        assert!(!tracker.push(silent_frame()));
        assert!(tracker.push(silent_frame()));
        assert_eq!(tracker.into_recording().len(), 5 * audio::FRAME_SIZE);
    }

    #[test]
    fn worker_without_thread_counts_as_finished() {
        let (shutdown_tx, _shutdown_rx) = crossbeam_channel::bounded(1);
        let mut worker = VoiceWorker {
            shutdown_tx,
            thread_handle: Some(thread::spawn(|| {})),
        };
        while !worker.is_finished() {
            thread::yield_now();
        }
        worker.cancel();
        assert!(worker.thread_handle.is_none());
        assert!(worker.is_finished());
    }

    #[test]
    fn final_events_are_marked() {
        assert!(VoiceEvent::Transcribed("1".into()).is_final());
        assert!(VoiceEvent::Failed(VoiceError::Unintelligible).is_final());
        assert!(VoiceEvent::Cancelled.is_final());
        assert!(!VoiceEvent::Listening.is_final());
        assert!(!VoiceEvent::Transcribing.is_final());
    }

    #[test]
    fn error_messages_match_dialog_text() {
        assert_eq!(
            VoiceError::Unintelligible.to_string(),
            "Could not understand the audio."
        );
        let unavailable = VoiceError::ServiceUnavailable {
            detail: "connection refused".into(),
        };
        assert_eq!(
            unavailable.to_string(),
            "Could not request results; check your network connection."
        );
    }
}
