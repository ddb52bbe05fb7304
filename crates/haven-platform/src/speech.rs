//! Speech-to-text fake fed from a queue of scripted transcripts.
//! The production client wires a device speech recogniser in behind the
//! same trait; state-machine behaviour is identical either way.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use async_trait::async_trait;
use haven_core::ports::SpeechPort;
use haven_types::{ChatError, Result};

pub struct ScriptedSpeech {
    transcripts: RefCell<VecDeque<String>>,
    capturing: Cell<bool>,
    captures_started: Cell<u32>,
    captures_stopped: Cell<u32>,
}

impl ScriptedSpeech {
    pub fn new() -> Self {
        Self {
            transcripts: RefCell::new(VecDeque::new()),
            capturing: Cell::new(false),
            captures_started: Cell::new(0),
            captures_stopped: Cell::new(0),
        }
    }

    /// Queue the transcript the next capture will resolve to.
    pub fn queue_transcript(&self, transcript: impl Into<String>) {
        self.transcripts.borrow_mut().push_back(transcript.into());
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.get()
    }

    pub fn captures_started(&self) -> u32 {
        self.captures_started.get()
    }

    pub fn captures_stopped(&self) -> u32 {
        self.captures_stopped.get()
    }
}

impl Default for ScriptedSpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl SpeechPort for ScriptedSpeech {
    async fn start_capture(&self) -> Result<()> {
        if self.capturing.get() {
            return Err(ChatError::Speech("capture already active".to_string()));
        }
        self.capturing.set(true);
        self.captures_started.set(self.captures_started.get() + 1);
        Ok(())
    }

    async fn stop_capture(&self) -> Result<String> {
        if !self.capturing.get() {
            return Err(ChatError::Speech("capture not active".to_string()));
        }
        self.capturing.set(false);
        self.captures_stopped.set(self.captures_stopped.get() + 1);
        // An empty transcript stands in for "no speech detected".
        Ok(self.transcripts.borrow_mut().pop_front().unwrap_or_default())
    }
}
