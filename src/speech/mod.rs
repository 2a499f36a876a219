//! Speech capture and playback
//!
//! This module provides:
//! - The `SpeechBridge` capability the orchestrator drives
//! - `NativeSpeechBridge`, the Idle/Capturing/Speaking state machine
//! - `SpeechEngine`, the seam to the platform's recognizer and synthesizer

pub mod bridge;
pub mod engine;

// Re-export commonly used types
pub use bridge::{
    CaptureErrorCallback, DoneCallback, NativeSpeechBridge, RecognitionHandle, SpeechBridge,
    SpeechCapabilities, SpeechEvent, SpeechPhase, TranscriptCallback, UtteranceHandle,
    CAPTURE_ABORTED, RECOGNITION_UNSUPPORTED,
};
pub use engine::{CommandSpeechEngine, SpeechConfig, SpeechEngine, TextOnlyEngine, Utterance};
