//! Recording event sink and listener

use placer_core::state::JobState;
use placer_core::traits::{EventSink, JobEvent, JobListener};
use placer_core::HookFault;

/// Records every job event; optionally fails one hook
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<JobEvent>,
    fail_on: Option<&'static str>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every event with the given dotted hook name
    pub fn failing_on(hook: &'static str) -> Self {
        Self {
            events: Vec::new(),
            fail_on: Some(hook),
        }
    }

    pub fn events(&self) -> &[JobEvent] {
        &self.events
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.iter().map(JobEvent::name).collect()
    }

    pub fn count(&self, hook: &str) -> usize {
        self.events.iter().filter(|e| e.name() == hook).count()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&mut self, event: &JobEvent) -> Result<(), HookFault> {
        self.events.push(event.clone());
        if self.fail_on == Some(event.name()) {
            return Err(HookFault::new("script raised an error"));
        }
        Ok(())
    }
}

/// Records state changes and status text
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    pub states: Vec<JobState>,
    pub texts: Vec<String>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_state(&self) -> Option<JobState> {
        self.states.last().copied()
    }

    pub fn saw_text(&self, text: &str) -> bool {
        self.texts.iter().any(|t| t == text)
    }
}

impl JobListener for RecordingListener {
    fn job_state_changed(&mut self, state: JobState) {
        self.states.push(state);
    }

    fn text_status(&mut self, text: &str) {
        self.texts.push(text.to_owned());
    }
}
