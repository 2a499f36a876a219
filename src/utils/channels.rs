use crate::integration::orchestrator::OrchestratorEvent;
use crate::speech::SpeechEvent;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Channels shared by the orchestrator, the speech bridge and the renderer.
///
/// Both are unbounded: speech callbacks fire on engine threads and must never
/// block on a slow terminal.
pub struct SessionChannels {
    pub event_tx: Sender<OrchestratorEvent>,
    pub event_rx: Receiver<OrchestratorEvent>,
    pub speech_tx: Sender<SpeechEvent>,
    pub speech_rx: Receiver<SpeechEvent>,
}

impl SessionChannels {
    pub fn new() -> Self {
        let (event_tx, event_rx) = unbounded();
        let (speech_tx, speech_rx) = unbounded();

        Self {
            event_tx,
            event_rx,
            speech_tx,
            speech_rx,
        }
    }
}

impl Default for SessionChannels {
    fn default() -> Self {
        Self::new()
    }
}
