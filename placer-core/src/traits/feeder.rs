//! Feeder traits

use crate::error::MachineResult;
use crate::model::Location;

/// Snapshot of a feeder
#[derive(Debug, Clone, PartialEq)]
pub struct FeederInfo {
    pub id: String,
    /// Part stocked in the feeder
    pub part: Option<String>,
    pub enabled: bool,
    /// Extra feed attempts before the feeder is disabled
    pub feed_retry_count: u32,
    /// Extra pick attempts per feed
    pub pick_retry_count: u32,
    pub pick_location: Location,
    /// Where the feeder wants a visit before the job starts
    pub preparation_location: Option<Location>,
}

impl FeederInfo {
    pub fn supplies(&self, part: &str) -> bool {
        self.enabled && self.part.as_deref() == Some(part)
    }
}

/// Trait for the machine's feeder bank
pub trait Feeders {
    /// Feeders in machine order
    fn feeders(&self) -> Vec<FeederInfo>;

    /// First enabled feeder stocking `part`
    fn find_feeder(&self, part: &str) -> Option<FeederInfo> {
        self.feeders().into_iter().find(|f| f.supplies(part))
    }

    /// Present a part at the pick location for `nozzle`
    fn feed(&mut self, feeder: &str, nozzle: &str) -> MachineResult<()>;

    fn post_pick(&mut self, feeder: &str, nozzle: &str) -> MachineResult<()>;

    /// Get ready for a job; `visited` is set when the head is over the
    /// feeder's preparation location
    fn prepare_for_job(&mut self, feeder: &str, visited: bool) -> MachineResult<()>;

    fn set_enabled(&mut self, feeder: &str, enabled: bool);
}
