//! The recording toggle state machine.
//!
//! Legal cycle: Idle → Recording → Transcribing → Idle, plus
//! Recording → Idle as a cancel. A press during Transcribing is
//! ignored; the capture in progress cannot be re-toggled until the
//! transcript resolves. A recording left running beyond the configured
//! maximum is stopped through the same path as a manual press.

use std::time::{Duration, Instant};

use haven_types::event::ChatEvent;
use haven_types::Result;

use crate::event_bus::EventBus;
use crate::ports::SpeechPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording { started_at: Instant },
    Transcribing,
}

impl RecordingState {
    pub fn label(&self) -> &'static str {
        match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording { .. } => "recording",
            RecordingState::Transcribing => "transcribing",
        }
    }
}

pub struct Recorder {
    pub(crate) state: RecordingState,
    timeout: Duration,
    event_bus: EventBus,
}

impl Recorder {
    pub fn new(timeout: Duration, event_bus: EventBus) -> Self {
        Self {
            state: RecordingState::Idle,
            timeout,
            event_bus,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecordingState::Recording { .. })
    }

    /// The toggle button. In Idle this starts capture; in Recording it
    /// stops capture and resolves the transcript (returned for the
    /// composer); in Transcribing it is a no-op returning `None`.
    pub async fn press(&mut self, speech: &dyn SpeechPort) -> Result<Option<String>> {
        match self.state {
            RecordingState::Idle => {
                speech.start_capture().await?;
                self.transition(RecordingState::Recording {
                    started_at: Instant::now(),
                });
                Ok(None)
            }
            RecordingState::Recording { .. } => self.stop_and_transcribe(speech).await,
            RecordingState::Transcribing => {
                log::debug!("recording press ignored while transcribing");
                Ok(None)
            }
        }
    }

    /// Abandon an in-progress recording without transcribing.
    pub async fn cancel(&mut self, speech: &dyn SpeechPort) {
        if self.is_recording() {
            if let Err(e) = speech.stop_capture().await {
                log::warn!("cancel: stop_capture failed: {}", e);
            }
            self.transition(RecordingState::Idle);
        }
    }

    /// Fail-safe stop: called from the app's timer tick. Only a Recording
    /// older than the timeout transitions; in any other state a late tick
    /// is a no-op, which is what prevents a manual stop followed by the
    /// stale timer from double-transitioning.
    pub async fn poll_timeout(
        &mut self,
        now: Instant,
        speech: &dyn SpeechPort,
    ) -> Result<Option<String>> {
        match self.state {
            RecordingState::Recording { started_at }
                if now.duration_since(started_at) >= self.timeout =>
            {
                log::info!("recording hit {}s timeout, auto-stopping", self.timeout.as_secs());
                self.stop_and_transcribe(speech).await
            }
            _ => Ok(None),
        }
    }

    async fn stop_and_transcribe(&mut self, speech: &dyn SpeechPort) -> Result<Option<String>> {
        self.transition(RecordingState::Transcribing);
        let result = speech.stop_capture().await;
        self.transition(RecordingState::Idle);
        result.map(Some)
    }

    fn transition(&mut self, next: RecordingState) {
        self.state = next;
        self.event_bus.emit(ChatEvent::RecordingChanged {
            state: next.label().to_string(),
        });
    }
}
