//! Job progress listener

use crate::state::JobState;

/// Observer of job state changes and status text
///
/// Both callbacks are fire-and-forget.
pub trait JobListener {
    fn job_state_changed(&mut self, _state: JobState) {}

    fn text_status(&mut self, _text: &str) {}
}

impl JobListener for () {}
